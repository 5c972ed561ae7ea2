//! In-memory implementation of the clipnest operations, used by the
//! test suite to check observable behavior without a database. It
//! mirrors the server's semantics: same validation, same error
//! taxonomy, same enrichment and pagination rules.

use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};
use clipnest_api::{
    ChannelStats, Comment, CommentId, CommentTarget, EnrichedComment, EnrichedPlaylist,
    EnrichedReply, Error, LikeTarget, LikeToggled, NewComment, NewPlaylist, PageOf, Pagination,
    Playlist, PlaylistId, PlaylistSummary, PlaylistVideo, SortOrder, Subscription,
    SubscriptionToggled, Time, TweetId, UserId, UserProfile, Uuid, Video, VideoId,
};

#[derive(Clone, Debug)]
struct MockVideo {
    owner: UserId,
    title: String,
    description: String,
    video_url: String,
    thumbnail_url: String,
    duration_secs: i32,
    views: i32,
    is_published: bool,
    created_at: Time,
    updated_at: Time,
}

#[derive(Clone, Debug)]
struct MockLike {
    liked_by: UserId,
    target: LikeTarget,
}

pub struct MockServer {
    users: BTreeMap<UserId, UserProfile>,
    videos: BTreeMap<VideoId, MockVideo>,
    tweets: BTreeMap<TweetId, UserId>,
    comments: BTreeMap<CommentId, Comment>,
    likes: Vec<MockLike>,
    playlists: BTreeMap<PlaylistId, Playlist>,
    subscriptions: Vec<Subscription>,
    clock: i64,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            users: BTreeMap::new(),
            videos: BTreeMap::new(),
            tweets: BTreeMap::new(),
            comments: BTreeMap::new(),
            likes: Vec::new(),
            playlists: BTreeMap::new(),
            subscriptions: Vec::new(),
            clock: 0,
        }
    }

    /// Each call returns a strictly later timestamp, so creation
    /// order and `created_at` order always agree.
    fn now(&mut self) -> Time {
        self.clock += 1;
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(self.clock)
    }

    // Fixture helpers.

    pub fn add_user(&mut self, username: &str) -> UserId {
        let id = UserId(Uuid::new_v4());
        self.users.insert(
            id,
            UserProfile {
                id,
                username: String::from(username),
                full_name: format!("{username} mock"),
                avatar_url: None,
            },
        );
        id
    }

    pub fn add_video(&mut self, owner: UserId, title: &str, is_published: bool) -> VideoId {
        let id = VideoId(Uuid::new_v4());
        let now = self.now();
        self.videos.insert(
            id,
            MockVideo {
                owner,
                title: String::from(title),
                description: format!("{title} description"),
                video_url: format!("https://cdn.example/{}.mp4", id.0),
                thumbnail_url: format!("https://cdn.example/{}.jpg", id.0),
                duration_secs: 60,
                views: 0,
                is_published,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn set_video_views(&mut self, video: VideoId, views: i32) {
        self.videos.get_mut(&video).expect("unknown video").views = views;
    }

    pub fn add_tweet(&mut self, owner: UserId) -> TweetId {
        let id = TweetId(Uuid::new_v4());
        self.tweets.insert(id, owner);
        id
    }

    pub fn comment(&self, id: CommentId) -> Result<&Comment, Error> {
        self.comments.get(&id).ok_or(Error::not_found("comment"))
    }

    fn profile(&self, user: UserId) -> UserProfile {
        self.users.get(&user).expect("unknown user").clone()
    }

    fn like_count(&self, comment: CommentId) -> i64 {
        self.likes
            .iter()
            .filter(|l| l.target == LikeTarget::Comment(comment))
            .count() as i64
    }

    fn is_liked(&self, comment: CommentId, viewer: Option<UserId>) -> bool {
        match viewer {
            None => false,
            Some(viewer) => self.likes.iter().any(|l| {
                l.liked_by == viewer && l.target == LikeTarget::Comment(comment)
            }),
        }
    }

    // Comment tree operations.

    pub fn add_top_level_comment(
        &mut self,
        target: CommentTarget,
        owner: UserId,
        content: &str,
    ) -> Result<Comment, Error> {
        NewComment {
            content: String::from(content),
        }
        .validate()?;
        let (video, tweet) = match target {
            CommentTarget::Video(v) => {
                if !self.videos.contains_key(&v) {
                    return Err(Error::invalid_reference("video", v.0));
                }
                (Some(v), None)
            }
            CommentTarget::Tweet(t) => {
                if !self.tweets.contains_key(&t) {
                    return Err(Error::invalid_reference("tweet", t.0));
                }
                (None, Some(t))
            }
        };
        let now = self.now();
        let comment = Comment {
            id: CommentId(Uuid::new_v4()),
            content: String::from(content),
            video,
            tweet,
            owner,
            parent: None,
            replies: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    pub fn add_reply(
        &mut self,
        parent: CommentId,
        owner: UserId,
        content: &str,
    ) -> Result<Comment, Error> {
        NewComment {
            content: String::from(content),
        }
        .validate()?;
        let (video, tweet) = match self.comments.get(&parent) {
            None => return Err(Error::not_found("comment")),
            Some(p) => (p.video, p.tweet),
        };
        let now = self.now();
        let reply = Comment {
            id: CommentId(Uuid::new_v4()),
            content: String::from(content),
            video,
            tweet,
            owner,
            parent: Some(parent),
            replies: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.comments.insert(reply.id, reply.clone());
        self.comments
            .get_mut(&parent)
            .expect("parent vanished")
            .replies
            .push(reply.id);
        Ok(reply)
    }

    pub fn update_comment(
        &mut self,
        comment: CommentId,
        caller: UserId,
        content: &str,
    ) -> Result<Comment, Error> {
        NewComment {
            content: String::from(content),
        }
        .validate()?;
        let now = self.now();
        let c = self
            .comments
            .get_mut(&comment)
            .ok_or(Error::not_found("comment"))?;
        if c.owner != caller {
            return Err(Error::Forbidden);
        }
        c.content = String::from(content);
        c.updated_at = now;
        Ok(c.clone())
    }

    pub fn delete_comment(&mut self, comment: CommentId, caller: UserId) -> Result<(), Error> {
        let (parent, mut frontier) = match self.comments.get(&comment) {
            None => return Err(Error::not_found("comment")),
            Some(c) if c.owner != caller => return Err(Error::Forbidden),
            Some(c) => (c.parent, c.replies.clone()),
        };

        if let Some(parent) = parent {
            if let Some(p) = self.comments.get_mut(&parent) {
                p.replies.retain(|r| *r != comment);
            }
        }

        let mut doomed = vec![comment];
        while !frontier.is_empty() {
            doomed.extend(frontier.iter().copied());
            frontier = frontier
                .iter()
                .filter_map(|id| self.comments.get(id))
                .flat_map(|c| c.replies.iter().copied())
                .collect();
        }

        for id in &doomed {
            self.comments.remove(id);
        }
        self.likes.retain(|l| match l.target {
            LikeTarget::Comment(c) => !doomed.contains(&c),
            _ => true,
        });
        Ok(())
    }

    // Aggregation queries.

    pub fn get_video_comments(
        &self,
        video: VideoId,
        viewer: Option<UserId>,
        pagination: Pagination,
        sort: SortOrder,
    ) -> Result<PageOf<EnrichedComment>, Error> {
        if !self.videos.contains_key(&video) {
            return Err(Error::invalid_reference("video", video.0));
        }

        let mut top_level: Vec<&Comment> = self
            .comments
            .values()
            .filter(|c| c.video == Some(video) && c.parent.is_none())
            .collect();
        top_level.sort_by_key(|c| c.created_at);
        if sort == SortOrder::Dsc {
            top_level.reverse();
        }

        let total = top_level.len() as u64;
        let page: Vec<EnrichedComment> = top_level
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit as usize)
            .map(|c| EnrichedComment {
                id: c.id,
                content: c.content.clone(),
                owner: self.profile(c.owner),
                likes_on_comment: self.like_count(c.id),
                is_liked: self.is_liked(c.id, viewer),
                replies: c
                    .replies
                    .iter()
                    .filter_map(|r| self.comments.get(r))
                    .map(|r| EnrichedReply {
                        id: r.id,
                        content: r.content.clone(),
                        owner: self.profile(r.owner),
                        likes_on_comment: self.like_count(r.id),
                        is_liked: self.is_liked(r.id, viewer),
                        created_at: r.created_at,
                        updated_at: r.updated_at,
                    })
                    .collect(),
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
            .collect();
        Ok(PageOf::new(page, total, pagination))
    }

    pub fn toggle_like(
        &mut self,
        liker: UserId,
        target: LikeTarget,
    ) -> Result<LikeToggled, Error> {
        let exists = match target {
            LikeTarget::Video(v) => self.videos.contains_key(&v),
            LikeTarget::Comment(c) => self.comments.contains_key(&c),
            LikeTarget::Tweet(t) => self.tweets.contains_key(&t),
        };
        if !exists {
            let id = match target {
                LikeTarget::Video(v) => v.0,
                LikeTarget::Comment(c) => c.0,
                LikeTarget::Tweet(t) => t.0,
            };
            return Err(Error::invalid_reference("like target", id));
        }

        let before = self.likes.len();
        self.likes
            .retain(|l| !(l.liked_by == liker && l.target == target));
        if self.likes.len() < before {
            return Ok(LikeToggled { liked: false });
        }
        self.likes.push(MockLike {
            liked_by: liker,
            target,
        });
        Ok(LikeToggled { liked: true })
    }

    pub fn get_liked_videos(
        &self,
        viewer: UserId,
        pagination: Pagination,
        sort: SortOrder,
    ) -> Result<PageOf<Video>, Error> {
        let mut videos: Vec<(VideoId, &MockVideo)> = self
            .likes
            .iter()
            .filter(|l| l.liked_by == viewer)
            .filter_map(|l| match l.target {
                LikeTarget::Video(v) => self.videos.get(&v).map(|mv| (v, mv)),
                _ => None,
            })
            .collect();
        videos.sort_by_key(|(_, v)| v.created_at);
        if sort == SortOrder::Dsc {
            videos.reverse();
        }

        let total = videos.len() as u64;
        let page: Vec<Video> = videos
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit as usize)
            .map(|(id, v)| Video {
                id,
                owner: self.profile(v.owner),
                title: v.title.clone(),
                description: v.description.clone(),
                video_url: v.video_url.clone(),
                thumbnail_url: v.thumbnail_url.clone(),
                duration_secs: v.duration_secs,
                views: v.views,
                is_published: v.is_published,
                created_at: v.created_at,
                updated_at: v.updated_at,
            })
            .collect();
        Ok(PageOf::new(page, total, pagination))
    }

    // Playlists.

    pub fn create_playlist(
        &mut self,
        owner: UserId,
        name: &str,
        description: &str,
    ) -> Result<Playlist, Error> {
        NewPlaylist {
            name: String::from(name),
            description: String::from(description),
        }
        .validate()?;
        let now = self.now();
        let playlist = Playlist {
            id: PlaylistId(Uuid::new_v4()),
            name: String::from(name),
            description: String::from(description),
            owner,
            videos: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.playlists.insert(playlist.id, playlist.clone());
        Ok(playlist)
    }

    fn playlist_owned_by(&self, playlist: PlaylistId, caller: UserId) -> Result<(), Error> {
        let p = self
            .playlists
            .get(&playlist)
            .ok_or(Error::not_found("playlist"))?;
        if p.owner != caller {
            return Err(Error::Forbidden);
        }
        Ok(())
    }

    pub fn update_playlist(
        &mut self,
        playlist: PlaylistId,
        caller: UserId,
        name: &str,
        description: &str,
    ) -> Result<Playlist, Error> {
        NewPlaylist {
            name: String::from(name),
            description: String::from(description),
        }
        .validate()?;
        self.playlist_owned_by(playlist, caller)?;
        let now = self.now();
        let p = self.playlists.get_mut(&playlist).expect("playlist vanished");
        p.name = String::from(name);
        p.description = String::from(description);
        p.updated_at = now;
        Ok(p.clone())
    }

    pub fn delete_playlist(&mut self, playlist: PlaylistId, caller: UserId) -> Result<(), Error> {
        self.playlist_owned_by(playlist, caller)?;
        self.playlists.remove(&playlist);
        Ok(())
    }

    pub fn add_video_to_playlist(
        &mut self,
        playlist: PlaylistId,
        video: VideoId,
        caller: UserId,
    ) -> Result<Playlist, Error> {
        self.playlist_owned_by(playlist, caller)?;
        if !self.videos.contains_key(&video) {
            return Err(Error::invalid_reference("video", video.0));
        }
        let now = self.now();
        let p = self.playlists.get_mut(&playlist).expect("playlist vanished");
        if !p.videos.contains(&video) {
            p.videos.push(video);
        }
        p.updated_at = now;
        Ok(p.clone())
    }

    pub fn remove_video_from_playlist(
        &mut self,
        playlist: PlaylistId,
        video: VideoId,
        caller: UserId,
    ) -> Result<Playlist, Error> {
        self.playlist_owned_by(playlist, caller)?;
        let now = self.now();
        let p = self.playlists.get_mut(&playlist).expect("playlist vanished");
        p.videos.retain(|v| *v != video);
        p.updated_at = now;
        Ok(p.clone())
    }

    pub fn get_playlist_by_id(&self, playlist: PlaylistId) -> Result<EnrichedPlaylist, Error> {
        let p = self
            .playlists
            .get(&playlist)
            .ok_or(Error::not_found("playlist"))?;
        let videos: Vec<PlaylistVideo> = p
            .videos
            .iter()
            .filter_map(|v| self.videos.get(v).map(|mv| (*v, mv)))
            .filter(|(_, mv)| mv.is_published)
            .map(|(id, mv)| PlaylistVideo {
                id,
                title: mv.title.clone(),
                description: mv.description.clone(),
                video_url: mv.video_url.clone(),
                thumbnail_url: mv.thumbnail_url.clone(),
                duration_secs: mv.duration_secs,
                views: mv.views,
                created_at: mv.created_at,
                updated_at: mv.updated_at,
            })
            .collect();
        let total_videos = videos.len() as i64;
        let total_views = videos.iter().map(|v| v.views as i64).sum();
        Ok(EnrichedPlaylist {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
            owner: self.profile(p.owner),
            videos,
            total_videos,
            total_views,
            created_at: p.created_at,
            updated_at: p.updated_at,
        })
    }

    pub fn get_user_playlists(&self, user: UserId) -> Vec<PlaylistSummary> {
        let mut playlists: Vec<&Playlist> = self
            .playlists
            .values()
            .filter(|p| p.owner == user)
            .collect();
        playlists.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        playlists
            .into_iter()
            .map(|p| {
                let members: Vec<&MockVideo> = p
                    .videos
                    .iter()
                    .filter_map(|v| self.videos.get(v))
                    .collect();
                PlaylistSummary {
                    id: p.id,
                    name: p.name.clone(),
                    description: p.description.clone(),
                    total_videos: members.len() as i64,
                    total_views: members.iter().map(|v| v.views as i64).sum(),
                    updated_at: p.updated_at,
                }
            })
            .collect()
    }

    // Subscriptions.

    pub fn toggle_subscription(
        &mut self,
        subscriber: UserId,
        channel: UserId,
    ) -> Result<SubscriptionToggled, Error> {
        if subscriber == channel {
            return Err(Error::Forbidden);
        }
        if !self.users.contains_key(&channel) {
            return Err(Error::invalid_reference("channel", channel.0));
        }
        let before = self.subscriptions.len();
        self.subscriptions
            .retain(|s| !(s.subscriber == subscriber && s.channel == channel));
        if self.subscriptions.len() < before {
            return Ok(SubscriptionToggled { subscribed: false });
        }
        self.subscriptions.push(Subscription {
            subscriber,
            channel,
        });
        Ok(SubscriptionToggled { subscribed: true })
    }

    pub fn get_channel_stats(
        &self,
        channel: UserId,
        viewer: Option<UserId>,
    ) -> Result<ChannelStats, Error> {
        if !self.users.contains_key(&channel) {
            return Err(Error::not_found("channel"));
        }
        Ok(ChannelStats {
            channel,
            subscribers: self
                .subscriptions
                .iter()
                .filter(|s| s.channel == channel)
                .count() as i64,
            is_subscribed: match viewer {
                None => false,
                Some(v) => self
                    .subscriptions
                    .iter()
                    .any(|s| s.channel == channel && s.subscriber == v),
            },
        })
    }
}
