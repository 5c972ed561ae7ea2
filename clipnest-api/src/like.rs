use crate::{CommentId, TweetId, VideoId};

/// The entity a like points at. At most one like may exist per
/// (liker, target) pair.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeTarget {
    Video(VideoId),
    Comment(CommentId),
    Tweet(TweetId),
}

/// Result of a like toggle: true when the call created the like,
/// false when it removed an existing one.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LikeToggled {
    pub liked: bool,
}
