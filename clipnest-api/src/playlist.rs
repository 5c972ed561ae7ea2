use crate::{Error, PlaylistId, Time, UserId, UserProfile, VideoId};

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    pub description: String,
    pub owner: UserId,
    /// Member videos. Membership is a set (adding twice is a no-op)
    /// but the order is kept for display.
    pub videos: Vec<VideoId>,
    pub created_at: Time,
    pub updated_at: Time,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewPlaylist {
    pub name: String,
    pub description: String,
}

impl NewPlaylist {
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_input("playlist name must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(Error::invalid_input(
                "playlist description must not be empty",
            ));
        }
        Ok(())
    }
}

/// A playlist member as projected into [`EnrichedPlaylist`].
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlaylistVideo {
    pub id: VideoId,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration_secs: i32,
    pub views: i32,
    pub created_at: Time,
    pub updated_at: Time,
}

/// A playlist joined to its member videos. Only published members are
/// included, and both totals are computed after that filter.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct EnrichedPlaylist {
    pub id: PlaylistId,
    pub name: String,
    pub description: String,
    pub owner: UserProfile,
    pub videos: Vec<PlaylistVideo>,
    pub total_videos: i64,
    pub total_views: i64,
    pub created_at: Time,
    pub updated_at: Time,
}

/// Listing form used when a user browses their own playlists; totals
/// here include unpublished members.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlaylistSummary {
    pub id: PlaylistId,
    pub name: String,
    pub description: String,
    pub total_videos: i64,
    pub total_views: i64,
    pub updated_at: Time,
}
