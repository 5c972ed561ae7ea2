use clipnest_api::{
    CommentTarget, Error, LikeTarget, Pagination, SortOrder,
};
use clipnest_mock_server::MockServer;

fn default_page() -> Pagination {
    Pagination::new(None, None).unwrap()
}

#[test]
fn reply_appears_nested_under_its_parent() {
    let mut s = MockServer::new();
    let author = s.add_user("author");
    let replier = s.add_user("replier");
    let video = s.add_video(author, "a video", true);

    let parent = s
        .add_top_level_comment(CommentTarget::Video(video), author, "first")
        .unwrap();
    let reply = s.add_reply(parent.id, replier, "reply one").unwrap();

    let page = s
        .get_video_comments(video, None, default_page(), SortOrder::Asc)
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.items.len(), 1);
    let top = &page.items[0];
    assert_eq!(top.id, parent.id);
    assert_eq!(top.replies.len(), 1);
    assert_eq!(top.replies[0].id, reply.id);
    assert_eq!(top.replies[0].content, "reply one");
    // anonymous viewer: every viewer-liked flag is false
    assert!(!top.is_liked);
    assert!(!top.replies[0].is_liked);
}

#[test]
fn deleting_a_comment_cascades_to_replies_and_likes() {
    let mut s = MockServer::new();
    let author = s.add_user("author");
    let fan = s.add_user("fan");
    let video = s.add_video(author, "a video", true);

    let top = s
        .add_top_level_comment(CommentTarget::Video(video), author, "root")
        .unwrap();
    let r1 = s.add_reply(top.id, fan, "reply 1").unwrap();
    let r2 = s.add_reply(top.id, fan, "reply 2").unwrap();
    let r3 = s.add_reply(top.id, author, "reply 3").unwrap();
    s.toggle_like(fan, LikeTarget::Comment(top.id)).unwrap();
    s.toggle_like(fan, LikeTarget::Comment(r2.id)).unwrap();
    s.toggle_like(author, LikeTarget::Comment(r3.id)).unwrap();

    s.delete_comment(top.id, author).unwrap();

    for id in [top.id, r1.id, r2.id, r3.id] {
        assert_eq!(s.comment(id).unwrap_err(), Error::not_found("comment"));
        // the likes on every deleted id are gone too: re-liking a
        // deleted comment is an invalid reference, not a toggle-off
        assert_eq!(
            s.toggle_like(fan, LikeTarget::Comment(id)).unwrap_err(),
            Error::invalid_reference("like target", id.0)
        );
    }
    let page = s
        .get_video_comments(video, None, default_page(), SortOrder::Asc)
        .unwrap();
    assert_eq!(page.total_count, 0);
    assert!(page.items.is_empty());
}

#[test]
fn only_the_owner_may_update_or_delete() {
    let mut s = MockServer::new();
    let author = s.add_user("author");
    let other = s.add_user("other");
    let video = s.add_video(author, "a video", true);
    let c = s
        .add_top_level_comment(CommentTarget::Video(video), author, "mine")
        .unwrap();

    assert_eq!(
        s.update_comment(c.id, other, "stolen").unwrap_err(),
        Error::Forbidden
    );
    assert_eq!(s.delete_comment(c.id, other).unwrap_err(), Error::Forbidden);
    let updated = s.update_comment(c.id, author, "edited").unwrap();
    assert_eq!(updated.content, "edited");
}

#[test]
fn updating_a_deleted_comment_is_not_found() {
    let mut s = MockServer::new();
    let author = s.add_user("author");
    let video = s.add_video(author, "a video", true);
    let c = s
        .add_top_level_comment(CommentTarget::Video(video), author, "soon gone")
        .unwrap();

    s.delete_comment(c.id, author).unwrap();

    // an update that loses the race with a delete is a not-found,
    // never an internal error
    assert_eq!(
        s.update_comment(c.id, author, "too late").unwrap_err(),
        Error::not_found("comment")
    );
}

#[test]
fn like_toggle_cycles() {
    let mut s = MockServer::new();
    let owner = s.add_user("owner");
    let fan = s.add_user("fan");
    let video = s.add_video(owner, "a video", true);

    let t = LikeTarget::Video(video);
    assert!(s.toggle_like(fan, t).unwrap().liked);
    assert!(!s.toggle_like(fan, t).unwrap().liked);
    assert!(s.toggle_like(fan, t).unwrap().liked);
}

#[test]
fn comment_listing_respects_sort_order() {
    let mut s = MockServer::new();
    let author = s.add_user("author");
    let video = s.add_video(author, "a video", true);
    for content in ["one", "two", "three"] {
        s.add_top_level_comment(CommentTarget::Video(video), author, content)
            .unwrap();
    }

    let asc = s
        .get_video_comments(video, None, default_page(), SortOrder::Asc)
        .unwrap();
    assert!(asc
        .items
        .windows(2)
        .all(|w| w[0].created_at <= w[1].created_at));
    assert_eq!(
        asc.items.iter().map(|c| &c.content).collect::<Vec<_>>(),
        ["one", "two", "three"]
    );

    let dsc = s
        .get_video_comments(video, None, default_page(), SortOrder::Dsc)
        .unwrap();
    assert!(dsc
        .items
        .windows(2)
        .all(|w| w[0].created_at >= w[1].created_at));

    // the sort parameter itself only admits "asc" and "dsc"
    assert!(matches!(
        "newest".parse::<SortOrder>(),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn empty_page_is_distinct_from_missing_video() {
    let mut s = MockServer::new();
    let author = s.add_user("author");
    let video = s.add_video(author, "no comments yet", true);

    let page = s
        .get_video_comments(video, None, default_page(), SortOrder::Asc)
        .unwrap();
    assert_eq!(page.total_count, 0);
    assert_eq!(page.total_pages, 0);
    assert!(page.items.is_empty());

    let missing = clipnest_api::VideoId(clipnest_api::Uuid::new_v4());
    assert_eq!(
        s.get_video_comments(missing, None, default_page(), SortOrder::Asc)
            .unwrap_err(),
        Error::invalid_reference("video", missing.0)
    );
}

#[test]
fn enrichment_reports_counts_and_viewer_flags() {
    let mut s = MockServer::new();
    let u1 = s.add_user("u1");
    let u2 = s.add_user("u2");
    let video = s.add_video(u1, "v", true);

    let c1 = s
        .add_top_level_comment(CommentTarget::Video(video), u1, "first")
        .unwrap();
    let r1 = s.add_reply(c1.id, u2, "reply one").unwrap();
    s.toggle_like(u2, LikeTarget::Comment(c1.id)).unwrap();

    let page = s
        .get_video_comments(video, Some(u2), default_page(), SortOrder::Asc)
        .unwrap();
    assert_eq!(page.items.len(), 1);
    let top = &page.items[0];
    assert_eq!(top.content, "first");
    assert_eq!(top.likes_on_comment, 1);
    assert!(top.is_liked);
    assert_eq!(top.owner.id, u1);
    assert_eq!(top.replies.len(), 1);
    assert_eq!(top.replies[0].id, r1.id);
    assert_eq!(top.replies[0].likes_on_comment, 0);
    assert!(!top.replies[0].is_liked);

    // u1 did not like anything, so the same listing seen by u1 has
    // is_liked false with the count unchanged
    let page = s
        .get_video_comments(video, Some(u1), default_page(), SortOrder::Asc)
        .unwrap();
    assert_eq!(page.items[0].likes_on_comment, 1);
    assert!(!page.items[0].is_liked);
}

#[test]
fn pagination_total_counts_only_top_level() {
    let mut s = MockServer::new();
    let author = s.add_user("author");
    let video = s.add_video(author, "v", true);

    for i in 0..3 {
        let c = s
            .add_top_level_comment(CommentTarget::Video(video), author, &format!("c{i}"))
            .unwrap();
        s.add_reply(c.id, author, "r").unwrap();
    }

    let page = s
        .get_video_comments(
            video,
            None,
            Pagination::new(Some(1), Some(2)).unwrap(),
            SortOrder::Asc,
        )
        .unwrap();
    // 6 comment rows exist but only the 3 top-level ones count
    assert_eq!(page.total_count, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 2);

    let page2 = s
        .get_video_comments(
            video,
            None,
            Pagination::new(Some(2), Some(2)).unwrap(),
            SortOrder::Asc,
        )
        .unwrap();
    assert_eq!(page2.items.len(), 1);
}

#[test]
fn liked_videos_total_survives_truncation() {
    let mut s = MockServer::new();
    let owner = s.add_user("owner");
    let fan = s.add_user("fan");
    let v1 = s.add_video(owner, "v1", true);
    let v2 = s.add_video(owner, "v2", true);
    s.toggle_like(fan, LikeTarget::Video(v1)).unwrap();
    s.toggle_like(fan, LikeTarget::Video(v2)).unwrap();

    let page = s
        .get_liked_videos(fan, Pagination::new(Some(1), Some(1)).unwrap(), SortOrder::Asc)
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_count, 2);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items[0].id, v1);

    let dsc = s
        .get_liked_videos(fan, Pagination::new(Some(1), Some(1)).unwrap(), SortOrder::Dsc)
        .unwrap();
    assert_eq!(dsc.items[0].id, v2);
}

#[test]
fn playlist_view_filters_unpublished_members() {
    let mut s = MockServer::new();
    let owner = s.add_user("owner");
    let published = s.add_video(owner, "published", true);
    let unpublished = s.add_video(owner, "unpublished", false);
    s.set_video_views(published, 7);
    s.set_video_views(unpublished, 100);

    let playlist = s.create_playlist(owner, "mix", "both kinds").unwrap();
    s.add_video_to_playlist(playlist.id, published, owner).unwrap();
    s.add_video_to_playlist(playlist.id, unpublished, owner)
        .unwrap();

    let enriched = s.get_playlist_by_id(playlist.id).unwrap();
    assert_eq!(enriched.total_videos, 1);
    assert_eq!(enriched.videos.len(), 1);
    assert_eq!(enriched.videos[0].id, published);
    assert_eq!(enriched.total_views, 7);

    // the owner's own listing counts unpublished members too
    let summaries = s.get_user_playlists(owner);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_videos, 2);
    assert_eq!(summaries[0].total_views, 107);
}

#[test]
fn playlist_membership_is_a_set() {
    let mut s = MockServer::new();
    let owner = s.add_user("owner");
    let video = s.add_video(owner, "v", true);
    let playlist = s.create_playlist(owner, "p", "d").unwrap();

    s.add_video_to_playlist(playlist.id, video, owner).unwrap();
    let p = s.add_video_to_playlist(playlist.id, video, owner).unwrap();
    assert_eq!(p.videos, vec![video]);

    let other = s.add_user("other");
    assert_eq!(
        s.add_video_to_playlist(playlist.id, video, other)
            .unwrap_err(),
        Error::Forbidden
    );
}

#[test]
fn playlist_lifecycle_is_owner_only() {
    let mut s = MockServer::new();
    let owner = s.add_user("owner");
    let other = s.add_user("other");
    let video = s.add_video(owner, "v", true);
    let playlist = s.create_playlist(owner, "old name", "old desc").unwrap();
    s.add_video_to_playlist(playlist.id, video, owner).unwrap();

    assert_eq!(
        s.update_playlist(playlist.id, other, "nope", "nope")
            .unwrap_err(),
        Error::Forbidden
    );
    let updated = s
        .update_playlist(playlist.id, owner, "new name", "new desc")
        .unwrap();
    assert_eq!(updated.name, "new name");

    let p = s
        .remove_video_from_playlist(playlist.id, video, owner)
        .unwrap();
    assert!(p.videos.is_empty());

    assert_eq!(
        s.delete_playlist(playlist.id, other).unwrap_err(),
        Error::Forbidden
    );
    s.delete_playlist(playlist.id, owner).unwrap();
    assert_eq!(
        s.get_playlist_by_id(playlist.id).unwrap_err(),
        Error::not_found("playlist")
    );
}

#[test]
fn subscription_toggle_and_stats() {
    let mut s = MockServer::new();
    let channel = s.add_user("channel");
    let viewer = s.add_user("viewer");

    assert_eq!(
        s.toggle_subscription(channel, channel).unwrap_err(),
        Error::Forbidden
    );

    assert!(s.toggle_subscription(viewer, channel).unwrap().subscribed);
    let stats = s.get_channel_stats(channel, Some(viewer)).unwrap();
    assert_eq!(stats.subscribers, 1);
    assert!(stats.is_subscribed);

    // anonymous stats never report a membership
    let anon = s.get_channel_stats(channel, None).unwrap();
    assert_eq!(anon.subscribers, 1);
    assert!(!anon.is_subscribed);

    assert!(!s.toggle_subscription(viewer, channel).unwrap().subscribed);
    let stats = s.get_channel_stats(channel, Some(viewer)).unwrap();
    assert_eq!(stats.subscribers, 0);
    assert!(!stats.is_subscribed);
}
