use axum::{extract::Path, extract::Query, Json};
use clipnest_api::{
    ApiResponse, ChannelStats, Comment, CommentId, CommentTarget, EnrichedComment,
    EnrichedPlaylist, LikeTarget, LikeToggled, NewComment, NewPlaylist, PageOf, Pagination,
    Playlist, PlaylistId, PlaylistSummary, SortOrder, SubscriptionToggled, TweetId, UserId, Uuid,
    Video, VideoId,
};

use crate::{db, extractors::*, Error};

/// Listing parameters as they arrive on the query string. Sort order
/// is kept as a raw string so that bad values surface as our own
/// invalid-input error rather than a deserialization rejection.
#[derive(serde::Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_order: Option<String>,
}

impl ListQuery {
    fn parse(&self) -> Result<(Pagination, SortOrder), Error> {
        let pagination = Pagination::new(self.page, self.limit).map_err(Error::Api)?;
        let sort = match &self.sort_order {
            None => SortOrder::default(),
            Some(s) => s.parse().map_err(Error::Api)?,
        };
        Ok((pagination, sort))
    }
}

pub async fn add_video_comment(
    Path(video_id): Path<Uuid>,
    Auth(user): Auth,
    mut conn: PgConn,
    Json(data): Json<NewComment>,
) -> Result<Json<ApiResponse<Comment>>, Error> {
    data.validate()?;
    let comment = db::add_top_level_comment(
        &mut *conn,
        CommentTarget::Video(VideoId(video_id)),
        user,
        &data.content,
    )
    .await?;
    Ok(Json(ApiResponse::ok("comment added successfully", comment)))
}

pub async fn add_tweet_comment(
    Path(tweet_id): Path<Uuid>,
    Auth(user): Auth,
    mut conn: PgConn,
    Json(data): Json<NewComment>,
) -> Result<Json<ApiResponse<Comment>>, Error> {
    data.validate()?;
    let comment = db::add_top_level_comment(
        &mut *conn,
        CommentTarget::Tweet(TweetId(tweet_id)),
        user,
        &data.content,
    )
    .await?;
    Ok(Json(ApiResponse::ok("comment added successfully", comment)))
}

pub async fn add_reply(
    Path(parent_id): Path<Uuid>,
    Auth(user): Auth,
    mut conn: PgConn,
    Json(data): Json<NewComment>,
) -> Result<Json<ApiResponse<Comment>>, Error> {
    data.validate()?;
    let reply = db::add_reply(&mut *conn, CommentId(parent_id), user, &data.content).await?;
    Ok(Json(ApiResponse::ok("reply added successfully", reply)))
}

pub async fn update_comment(
    Path(comment_id): Path<Uuid>,
    Auth(user): Auth,
    mut conn: PgConn,
    Json(data): Json<NewComment>,
) -> Result<Json<ApiResponse<Comment>>, Error> {
    data.validate()?;
    let comment =
        db::update_comment_content(&mut *conn, CommentId(comment_id), user, &data.content).await?;
    Ok(Json(ApiResponse::ok("comment updated successfully", comment)))
}

pub async fn delete_comment(
    Path(comment_id): Path<Uuid>,
    Auth(user): Auth,
    mut conn: PgConn,
) -> Result<Json<ApiResponse<()>>, Error> {
    db::delete_comment_cascade(&mut *conn, CommentId(comment_id), user).await?;
    Ok(Json(ApiResponse::ok("comment deleted successfully", ())))
}

pub async fn get_video_comments(
    Path(video_id): Path<Uuid>,
    MaybeAuth(viewer): MaybeAuth,
    Query(q): Query<ListQuery>,
    mut conn: PgConn,
) -> Result<Json<ApiResponse<PageOf<EnrichedComment>>>, Error> {
    let (pagination, sort) = q.parse()?;
    let page =
        db::get_video_comments(&mut *conn, VideoId(video_id), viewer, pagination, sort).await?;
    Ok(Json(ApiResponse::ok("comments fetched successfully", page)))
}

pub async fn toggle_video_like(
    Path(video_id): Path<Uuid>,
    Auth(user): Auth,
    mut conn: PgConn,
) -> Result<Json<ApiResponse<LikeToggled>>, Error> {
    let liked = db::toggle_like(&mut *conn, user, LikeTarget::Video(VideoId(video_id))).await?;
    Ok(Json(ApiResponse::ok(
        "video like toggled successfully",
        LikeToggled { liked },
    )))
}

pub async fn toggle_comment_like(
    Path(comment_id): Path<Uuid>,
    Auth(user): Auth,
    mut conn: PgConn,
) -> Result<Json<ApiResponse<LikeToggled>>, Error> {
    let liked =
        db::toggle_like(&mut *conn, user, LikeTarget::Comment(CommentId(comment_id))).await?;
    Ok(Json(ApiResponse::ok(
        "comment like toggled successfully",
        LikeToggled { liked },
    )))
}

pub async fn toggle_tweet_like(
    Path(tweet_id): Path<Uuid>,
    Auth(user): Auth,
    mut conn: PgConn,
) -> Result<Json<ApiResponse<LikeToggled>>, Error> {
    let liked = db::toggle_like(&mut *conn, user, LikeTarget::Tweet(TweetId(tweet_id))).await?;
    Ok(Json(ApiResponse::ok(
        "tweet like toggled successfully",
        LikeToggled { liked },
    )))
}

pub async fn get_liked_videos(
    Auth(user): Auth,
    Query(q): Query<ListQuery>,
    mut conn: PgConn,
) -> Result<Json<ApiResponse<PageOf<Video>>>, Error> {
    let (pagination, sort) = q.parse()?;
    let page = db::get_liked_videos(&mut *conn, user, pagination, sort).await?;
    Ok(Json(ApiResponse::ok(
        "liked videos fetched successfully",
        page,
    )))
}

pub async fn create_playlist(
    Auth(user): Auth,
    mut conn: PgConn,
    Json(data): Json<NewPlaylist>,
) -> Result<Json<ApiResponse<Playlist>>, Error> {
    data.validate()?;
    let playlist = db::create_playlist(&mut *conn, user, &data.name, &data.description).await?;
    Ok(Json(ApiResponse::ok(
        "playlist created successfully",
        playlist,
    )))
}

pub async fn get_playlist(
    Path(playlist_id): Path<Uuid>,
    mut conn: PgConn,
) -> Result<Json<ApiResponse<EnrichedPlaylist>>, Error> {
    let playlist = db::get_playlist_enriched(&mut *conn, PlaylistId(playlist_id)).await?;
    Ok(Json(ApiResponse::ok(
        "playlist fetched successfully",
        playlist,
    )))
}

pub async fn update_playlist(
    Path(playlist_id): Path<Uuid>,
    Auth(user): Auth,
    mut conn: PgConn,
    Json(data): Json<NewPlaylist>,
) -> Result<Json<ApiResponse<Playlist>>, Error> {
    data.validate()?;
    let playlist = db::update_playlist(
        &mut *conn,
        PlaylistId(playlist_id),
        user,
        &data.name,
        &data.description,
    )
    .await?;
    Ok(Json(ApiResponse::ok(
        "playlist updated successfully",
        playlist,
    )))
}

pub async fn delete_playlist(
    Path(playlist_id): Path<Uuid>,
    Auth(user): Auth,
    mut conn: PgConn,
) -> Result<Json<ApiResponse<()>>, Error> {
    db::delete_playlist(&mut *conn, PlaylistId(playlist_id), user).await?;
    Ok(Json(ApiResponse::ok("playlist deleted successfully", ())))
}

pub async fn add_video_to_playlist(
    Path((playlist_id, video_id)): Path<(Uuid, Uuid)>,
    Auth(user): Auth,
    mut conn: PgConn,
) -> Result<Json<ApiResponse<Playlist>>, Error> {
    let playlist = db::add_video_to_playlist(
        &mut *conn,
        PlaylistId(playlist_id),
        VideoId(video_id),
        user,
    )
    .await?;
    Ok(Json(ApiResponse::ok(
        "video added to playlist successfully",
        playlist,
    )))
}

pub async fn remove_video_from_playlist(
    Path((playlist_id, video_id)): Path<(Uuid, Uuid)>,
    Auth(user): Auth,
    mut conn: PgConn,
) -> Result<Json<ApiResponse<Playlist>>, Error> {
    let playlist = db::remove_video_from_playlist(
        &mut *conn,
        PlaylistId(playlist_id),
        VideoId(video_id),
        user,
    )
    .await?;
    Ok(Json(ApiResponse::ok(
        "video removed from playlist successfully",
        playlist,
    )))
}

pub async fn get_user_playlists(
    Path(user_id): Path<Uuid>,
    mut conn: PgConn,
) -> Result<Json<ApiResponse<Vec<PlaylistSummary>>>, Error> {
    let playlists = db::get_user_playlists(&mut *conn, UserId(user_id)).await?;
    Ok(Json(ApiResponse::ok(
        "playlists fetched successfully",
        playlists,
    )))
}

pub async fn toggle_subscription(
    Path(channel_id): Path<Uuid>,
    Auth(user): Auth,
    mut conn: PgConn,
) -> Result<Json<ApiResponse<SubscriptionToggled>>, Error> {
    let subscribed = db::toggle_subscription(&mut *conn, user, UserId(channel_id)).await?;
    Ok(Json(ApiResponse::ok(
        "subscription toggled successfully",
        SubscriptionToggled { subscribed },
    )))
}

pub async fn get_channel_stats(
    Path(channel_id): Path<Uuid>,
    MaybeAuth(viewer): MaybeAuth,
    mut conn: PgConn,
) -> Result<Json<ApiResponse<ChannelStats>>, Error> {
    let stats = db::get_channel_stats(&mut *conn, UserId(channel_id), viewer).await?;
    Ok(Json(ApiResponse::ok(
        "channel stats fetched successfully",
        stats,
    )))
}
