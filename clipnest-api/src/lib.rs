pub use uuid::Uuid;
pub type Time = chrono::DateTime<chrono::Utc>;

mod comment;
mod error;
mod like;
mod page;
mod playlist;
mod video;

pub use comment::{Comment, EnrichedComment, EnrichedReply, NewComment};
pub use error::Error;
pub use like::{LikeTarget, LikeToggled};
pub use page::{PageOf, Pagination, SortOrder};
pub use playlist::{EnrichedPlaylist, NewPlaylist, Playlist, PlaylistSummary, PlaylistVideo};
pub use video::Video;

#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AuthToken(pub Uuid);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct UserId(pub Uuid);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct VideoId(pub Uuid);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct TweetId(pub Uuid);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct CommentId(pub Uuid);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct PlaylistId(pub Uuid);

/// The entity a comment or like is attached to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentTarget {
    Video(VideoId),
    Tweet(TweetId),
}

/// The profile fields exposed whenever a user appears as the owner of
/// some other entity.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Subscription {
    pub subscriber: UserId,
    pub channel: UserId,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ChannelStats {
    pub channel: UserId,
    pub subscribers: i64,
    pub is_subscribed: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SubscriptionToggled {
    pub subscribed: bool,
}

/// Every endpoint answers with this envelope, errors included (see
/// `Error::contents` for the error rendition).
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
    pub success: bool,
    pub error: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> ApiResponse<T> {
        ApiResponse {
            message: message.into(),
            data,
            success: true,
            error: false,
        }
    }
}
