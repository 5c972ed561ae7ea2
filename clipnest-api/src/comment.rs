use crate::{CommentId, Error, Time, TweetId, UserId, UserProfile, VideoId};

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub content: String,

    /// Exactly one of `video`/`tweet` is set; a reply carries its
    /// parent's target for display purposes.
    pub video: Option<VideoId>,
    pub tweet: Option<TweetId>,

    pub owner: UserId,

    /// Set iff this comment is a reply.
    pub parent: Option<CommentId>,
    /// Ids of direct replies, in the order they were added. Every id
    /// listed here names a comment whose `parent` is this comment.
    pub replies: Vec<CommentId>,

    pub created_at: Time,
    pub updated_at: Time,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub content: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        if self.content.trim().is_empty() {
            return Err(Error::invalid_input("comment content must not be empty"));
        }
        Ok(())
    }
}

/// A reply as it appears nested inside an [`EnrichedComment`].
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct EnrichedReply {
    pub id: CommentId,
    pub content: String,
    pub owner: UserProfile,
    pub likes_on_comment: i64,
    /// Whether the requesting viewer liked this reply; always false
    /// for anonymous viewers.
    pub is_liked: bool,
    pub created_at: Time,
    pub updated_at: Time,
}

/// A top-level comment as assembled by the comment listing query:
/// owner projection, like count, viewer-liked flag and its replies,
/// each enriched the same way.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct EnrichedComment {
    pub id: CommentId,
    pub content: String,
    pub owner: UserProfile,
    pub likes_on_comment: i64,
    pub is_liked: bool,
    pub replies: Vec<EnrichedReply>,
    pub created_at: Time,
    pub updated_at: Time,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_content_is_rejected() {
        for content in ["", " ", "\t\n  "] {
            let res = NewComment {
                content: String::from(content),
            }
            .validate();
            assert!(matches!(res, Err(Error::InvalidInput(_))), "{content:?}");
        }
        assert!(NewComment {
            content: String::from("  ok  ")
        }
        .validate()
        .is_ok());
    }
}
