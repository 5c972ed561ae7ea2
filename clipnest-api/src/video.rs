use crate::{Time, UserProfile, VideoId};

/// A video as returned by read queries, owner already projected.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Video {
    pub id: VideoId,
    pub owner: UserProfile,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration_secs: i32,
    pub views: i32,
    pub is_published: bool,
    pub created_at: Time,
    pub updated_at: Time,
}
