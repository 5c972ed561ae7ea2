use anyhow::Context;
use futures::TryStreamExt;
use sqlx::{Connection, Row};
use std::collections::HashMap;

use clipnest_api::{
    AuthToken, ChannelStats, Comment, CommentId, CommentTarget, EnrichedComment, EnrichedReply,
    LikeTarget, PageOf, Pagination, Playlist, PlaylistId, PlaylistSummary, PlaylistVideo,
    SortOrder, TweetId, UserId, UserProfile, Uuid, Video, VideoId,
};

use crate::Error;

fn order_keyword(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Asc => "ASC",
        SortOrder::Dsc => "DESC",
    }
}

pub async fn recover_session(
    conn: &mut sqlx::PgConnection,
    token: AuthToken,
) -> Result<UserId, Error> {
    let row = sqlx::query("SELECT user_id FROM sessions WHERE token = $1")
        .bind(token.0)
        .fetch_optional(&mut *conn)
        .await
        .context("recovering session")?;
    match row {
        Some(r) => Ok(UserId(
            r.try_get("user_id").context("retrieving the user_id field")?,
        )),
        None => Err(Error::unauthorized()),
    }
}

async fn video_exists(conn: &mut sqlx::PgConnection, video: VideoId) -> anyhow::Result<bool> {
    Ok(sqlx::query("SELECT 1 FROM videos WHERE id = $1")
        .bind(video.0)
        .fetch_optional(conn)
        .await
        .context("checking video existence")?
        .is_some())
}

async fn tweet_exists(conn: &mut sqlx::PgConnection, tweet: TweetId) -> anyhow::Result<bool> {
    Ok(sqlx::query("SELECT 1 FROM tweets WHERE id = $1")
        .bind(tweet.0)
        .fetch_optional(conn)
        .await
        .context("checking tweet existence")?
        .is_some())
}

async fn comment_exists(conn: &mut sqlx::PgConnection, comment: CommentId) -> anyhow::Result<bool> {
    Ok(sqlx::query("SELECT 1 FROM comments WHERE id = $1")
        .bind(comment.0)
        .fetch_optional(conn)
        .await
        .context("checking comment existence")?
        .is_some())
}

async fn user_exists(conn: &mut sqlx::PgConnection, user: UserId) -> anyhow::Result<bool> {
    Ok(sqlx::query("SELECT 1 FROM users WHERE id = $1")
        .bind(user.0)
        .fetch_optional(conn)
        .await
        .context("checking user existence")?
        .is_some())
}

const COMMENT_FIELDS: &str =
    "id, content, video_id, tweet_id, owner_id, parent_id, reply_ids, created_at, updated_at";

fn comment_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<Comment> {
    Ok(Comment {
        id: CommentId(row.try_get("id").context("retrieving the id field")?),
        content: row
            .try_get("content")
            .context("retrieving the content field")?,
        video: row
            .try_get::<Option<Uuid>, _>("video_id")
            .context("retrieving the video_id field")?
            .map(VideoId),
        tweet: row
            .try_get::<Option<Uuid>, _>("tweet_id")
            .context("retrieving the tweet_id field")?
            .map(TweetId),
        owner: UserId(
            row.try_get("owner_id")
                .context("retrieving the owner_id field")?,
        ),
        parent: row
            .try_get::<Option<Uuid>, _>("parent_id")
            .context("retrieving the parent_id field")?
            .map(CommentId),
        replies: row
            .try_get::<Vec<Uuid>, _>("reply_ids")
            .context("retrieving the reply_ids field")?
            .into_iter()
            .map(CommentId)
            .collect(),
        created_at: row
            .try_get("created_at")
            .context("retrieving the created_at field")?,
        updated_at: row
            .try_get("updated_at")
            .context("retrieving the updated_at field")?,
    })
}

fn profile_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<UserProfile> {
    Ok(UserProfile {
        id: UserId(
            row.try_get("owner_id")
                .context("retrieving the owner_id field")?,
        ),
        username: row
            .try_get("username")
            .context("retrieving the username field")?,
        full_name: row
            .try_get("full_name")
            .context("retrieving the full_name field")?,
        avatar_url: row
            .try_get("avatar_url")
            .context("retrieving the avatar_url field")?,
    })
}

pub async fn add_top_level_comment(
    conn: &mut sqlx::PgConnection,
    target: CommentTarget,
    owner: UserId,
    content: &str,
) -> Result<Comment, Error> {
    let (video, tweet) = match target {
        CommentTarget::Video(v) => {
            if !video_exists(&mut *conn, v).await? {
                return Err(Error::invalid_reference("video", v.0));
            }
            (Some(v.0), None)
        }
        CommentTarget::Tweet(t) => {
            if !tweet_exists(&mut *conn, t).await? {
                return Err(Error::invalid_reference("tweet", t.0));
            }
            (None, Some(t.0))
        }
    };
    let row = sqlx::query(&format!(
        "
            INSERT INTO comments (id, content, video_id, tweet_id, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COMMENT_FIELDS}
        "
    ))
    .bind(Uuid::new_v4())
    .bind(content)
    .bind(video)
    .bind(tweet)
    .bind(owner.0)
    .fetch_one(&mut *conn)
    .await
    .context("inserting top-level comment")?;
    Ok(comment_from_row(&row)?)
}

/// Creates the reply row and appends its id to the parent's reply
/// list in one transaction, so a reply is never visible without its
/// backlink.
pub async fn add_reply(
    conn: &mut sqlx::PgConnection,
    parent: CommentId,
    owner: UserId,
    content: &str,
) -> Result<Comment, Error> {
    let mut tx = conn.begin().await.context("beginning transaction")?;

    let parent_row = sqlx::query(&format!(
        "SELECT {COMMENT_FIELDS} FROM comments WHERE id = $1 FOR UPDATE"
    ))
    .bind(parent.0)
    .fetch_optional(&mut *tx)
    .await
    .context("fetching parent comment")?;
    let parent_comment = match parent_row {
        Some(r) => comment_from_row(&r)?,
        None => return Err(Error::not_found("comment")),
    };

    let row = sqlx::query(&format!(
        "
            INSERT INTO comments (id, content, video_id, tweet_id, owner_id, parent_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COMMENT_FIELDS}
        "
    ))
    .bind(Uuid::new_v4())
    .bind(content)
    .bind(parent_comment.video.map(|v| v.0))
    .bind(parent_comment.tweet.map(|t| t.0))
    .bind(owner.0)
    .bind(parent.0)
    .fetch_one(&mut *tx)
    .await
    .context("inserting reply")?;
    let reply = comment_from_row(&row)?;

    let res = sqlx::query(
        "
            UPDATE comments
               SET reply_ids = array_append(reply_ids, $2),
                   updated_at = now()
             WHERE id = $1
        ",
    )
    .bind(parent.0)
    .bind(reply.id.0)
    .execute(&mut *tx)
    .await
    .context("appending reply to parent")?;
    if res.rows_affected() != 1 {
        return Err(Error::Anyhow(anyhow::anyhow!(
            "appending reply {:?} to parent {:?} affected {} rows",
            reply.id,
            parent,
            res.rows_affected()
        )));
    }

    tx.commit().await.context("committing reply transaction")?;
    Ok(reply)
}

pub async fn update_comment_content(
    conn: &mut sqlx::PgConnection,
    comment: CommentId,
    caller: UserId,
    content: &str,
) -> Result<Comment, Error> {
    let mut tx = conn.begin().await.context("beginning transaction")?;

    // Locked so a concurrent cascade delete cannot remove the row
    // between the owner check and the update.
    let row = sqlx::query("SELECT owner_id FROM comments WHERE id = $1 FOR UPDATE")
        .bind(comment.0)
        .fetch_optional(&mut *tx)
        .await
        .context("fetching comment owner")?
        .ok_or(Error::not_found("comment"))?;
    let owner = UserId(
        row.try_get("owner_id")
            .context("retrieving the owner_id field")?,
    );
    if owner != caller {
        return Err(Error::forbidden());
    }

    let row = sqlx::query(&format!(
        "
            UPDATE comments
               SET content = $2, updated_at = now()
             WHERE id = $1
            RETURNING {COMMENT_FIELDS}
        "
    ))
    .bind(comment.0)
    .bind(content)
    .fetch_one(&mut *tx)
    .await
    .context("updating comment content")?;
    let updated = comment_from_row(&row)?;

    tx.commit().await.context("committing comment update")?;
    Ok(updated)
}

/// Cascade delete: detach from the parent's reply list, delete the
/// comment and every descendant, then delete the likes on all deleted
/// ids. The whole cascade is one transaction; the write order means a
/// crash can at worst leave orphaned likes, never a dangling reply
/// reference.
pub async fn delete_comment_cascade(
    conn: &mut sqlx::PgConnection,
    comment: CommentId,
    caller: UserId,
) -> Result<(), Error> {
    let mut tx = conn.begin().await.context("beginning transaction")?;

    let row = sqlx::query("SELECT owner_id, parent_id, reply_ids FROM comments WHERE id = $1 FOR UPDATE")
        .bind(comment.0)
        .fetch_optional(&mut *tx)
        .await
        .context("fetching comment to delete")?
        .ok_or(Error::not_found("comment"))?;
    let owner = UserId(
        row.try_get("owner_id")
            .context("retrieving the owner_id field")?,
    );
    if owner != caller {
        return Err(Error::forbidden());
    }
    let parent: Option<Uuid> = row
        .try_get("parent_id")
        .context("retrieving the parent_id field")?;
    let mut frontier: Vec<Uuid> = row
        .try_get("reply_ids")
        .context("retrieving the reply_ids field")?;

    if let Some(parent) = parent {
        sqlx::query(
            "
                UPDATE comments
                   SET reply_ids = array_remove(reply_ids, $2),
                       updated_at = now()
                 WHERE id = $1
            ",
        )
        .bind(parent)
        .bind(comment.0)
        .execute(&mut *tx)
        .await
        .context("detaching comment from parent")?;
    }

    // Frontier walk rather than recursion; observed trees are two
    // levels deep but the cascade must not rely on that.
    let mut doomed = vec![comment.0];
    while !frontier.is_empty() {
        doomed.extend(frontier.iter().copied());
        let rows = sqlx::query("SELECT reply_ids FROM comments WHERE id = ANY($1)")
            .bind(&frontier)
            .fetch_all(&mut *tx)
            .await
            .context("walking reply tree")?;
        frontier = rows
            .iter()
            .map(|r| {
                r.try_get::<Vec<Uuid>, _>("reply_ids")
                    .context("retrieving the reply_ids field")
            })
            .collect::<anyhow::Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();
    }

    sqlx::query("DELETE FROM comments WHERE id = ANY($1)")
        .bind(&doomed)
        .execute(&mut *tx)
        .await
        .context("deleting comment tree")?;
    sqlx::query("DELETE FROM likes WHERE comment_id = ANY($1)")
        .bind(&doomed)
        .execute(&mut *tx)
        .await
        .context("deleting likes on deleted comments")?;

    tx.commit().await.context("committing cascade delete")?;
    Ok(())
}

/// The comment listing aggregation: one page of top-level comments
/// for a video, each enriched with its owner projection, like count,
/// viewer-liked flag and nested enriched replies. The total counts
/// top-level comments only.
pub async fn get_video_comments(
    conn: &mut sqlx::PgConnection,
    video: VideoId,
    viewer: Option<UserId>,
    pagination: Pagination,
    sort: SortOrder,
) -> Result<PageOf<EnrichedComment>, Error> {
    if !video_exists(&mut *conn, video).await? {
        return Err(Error::invalid_reference("video", video.0));
    }

    let total: i64 = sqlx::query(
        "SELECT COUNT(*) AS total FROM comments WHERE video_id = $1 AND parent_id IS NULL",
    )
    .bind(video.0)
    .fetch_one(&mut *conn)
    .await
    .context("counting top-level comments")?
    .try_get("total")
    .context("retrieving the total field")?;

    let rows = sqlx::query(&format!(
        "
            SELECT c.id, c.content, c.created_at, c.updated_at,
                   u.id AS owner_id, u.username, u.full_name, u.avatar_url,
                   (SELECT COUNT(*) FROM likes l WHERE l.comment_id = c.id) AS likes_on_comment,
                   EXISTS(
                       SELECT 1 FROM likes l
                        WHERE l.comment_id = c.id AND l.liked_by = $2
                   ) AS is_liked
              FROM comments c
             INNER JOIN users u ON u.id = c.owner_id
             WHERE c.video_id = $1
               AND c.parent_id IS NULL
             ORDER BY c.created_at {}
             LIMIT $3 OFFSET $4
        ",
        order_keyword(sort)
    ))
    .bind(video.0)
    .bind(viewer.map(|u| u.0))
    .bind(pagination.limit as i64)
    .bind(pagination.offset() as i64)
    .fetch_all(&mut *conn)
    .await
    .context("querying top-level comments")?;

    let mut comments = Vec::with_capacity(rows.len());
    for row in &rows {
        comments.push(EnrichedComment {
            id: CommentId(row.try_get("id").context("retrieving the id field")?),
            content: row
                .try_get("content")
                .context("retrieving the content field")?,
            owner: profile_from_row(row)?,
            likes_on_comment: row
                .try_get("likes_on_comment")
                .context("retrieving the likes_on_comment field")?,
            is_liked: row
                .try_get("is_liked")
                .context("retrieving the is_liked field")?,
            replies: Vec::new(),
            created_at: row
                .try_get("created_at")
                .context("retrieving the created_at field")?,
            updated_at: row
                .try_get("updated_at")
                .context("retrieving the updated_at field")?,
        });
    }

    let page_ids: Vec<Uuid> = comments.iter().map(|c| c.id.0).collect();
    let mut replies: HashMap<CommentId, Vec<EnrichedReply>> = HashMap::new();
    if !page_ids.is_empty() {
        let rows = sqlx::query(
            "
                SELECT c.id, c.parent_id, c.content, c.created_at, c.updated_at,
                       u.id AS owner_id, u.username, u.full_name, u.avatar_url,
                       (SELECT COUNT(*) FROM likes l WHERE l.comment_id = c.id) AS likes_on_comment,
                       EXISTS(
                           SELECT 1 FROM likes l
                            WHERE l.comment_id = c.id AND l.liked_by = $2
                       ) AS is_liked
                  FROM comments c
                 INNER JOIN users u ON u.id = c.owner_id
                 WHERE c.parent_id = ANY($1)
                 ORDER BY c.created_at ASC
            ",
        )
        .bind(&page_ids)
        .bind(viewer.map(|u| u.0))
        .fetch_all(&mut *conn)
        .await
        .context("querying replies")?;
        for row in &rows {
            let parent = CommentId(
                row.try_get("parent_id")
                    .context("retrieving the parent_id field")?,
            );
            replies.entry(parent).or_insert_with(Vec::new).push(EnrichedReply {
                id: CommentId(row.try_get("id").context("retrieving the id field")?),
                content: row
                    .try_get("content")
                    .context("retrieving the content field")?,
                owner: profile_from_row(row)?,
                likes_on_comment: row
                    .try_get("likes_on_comment")
                    .context("retrieving the likes_on_comment field")?,
                is_liked: row
                    .try_get("is_liked")
                    .context("retrieving the is_liked field")?,
                created_at: row
                    .try_get("created_at")
                    .context("retrieving the created_at field")?,
                updated_at: row
                    .try_get("updated_at")
                    .context("retrieving the updated_at field")?,
            });
        }
    }
    for comment in &mut comments {
        if let Some(r) = replies.remove(&comment.id) {
            comment.replies = r;
        }
    }

    Ok(PageOf::new(comments, total as u64, pagination))
}

/// Toggles a like: delete-by-filter on (liker, target) when present,
/// create otherwise. The partial unique indexes make a concurrent
/// double-create resolve to a single surviving like.
pub async fn toggle_like(
    conn: &mut sqlx::PgConnection,
    liker: UserId,
    target: LikeTarget,
) -> Result<bool, Error> {
    let (column, id) = match target {
        LikeTarget::Video(v) => {
            if !video_exists(&mut *conn, v).await? {
                return Err(Error::invalid_reference("video", v.0));
            }
            ("video_id", v.0)
        }
        LikeTarget::Comment(c) => {
            if !comment_exists(&mut *conn, c).await? {
                return Err(Error::invalid_reference("comment", c.0));
            }
            ("comment_id", c.0)
        }
        LikeTarget::Tweet(t) => {
            if !tweet_exists(&mut *conn, t).await? {
                return Err(Error::invalid_reference("tweet", t.0));
            }
            ("tweet_id", t.0)
        }
    };

    let res = sqlx::query(&format!(
        "DELETE FROM likes WHERE liked_by = $1 AND {column} = $2"
    ))
    .bind(liker.0)
    .bind(id)
    .execute(&mut *conn)
    .await
    .context("deleting existing like")?;
    if res.rows_affected() > 0 {
        return Ok(false);
    }

    sqlx::query(&format!(
        "
            INSERT INTO likes (id, liked_by, {column})
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
        "
    ))
    .bind(Uuid::new_v4())
    .bind(liker.0)
    .bind(id)
    .execute(&mut *conn)
    .await
    .context("inserting like")?;
    Ok(true)
}

pub async fn get_liked_videos(
    conn: &mut sqlx::PgConnection,
    viewer: UserId,
    pagination: Pagination,
    sort: SortOrder,
) -> Result<PageOf<Video>, Error> {
    // Counted with the same join as the page query, so likes whose
    // video has disappeared never inflate the total.
    let total: i64 = sqlx::query(
        "
            SELECT COUNT(*) AS total
              FROM likes l
             INNER JOIN videos v ON v.id = l.video_id
             WHERE l.liked_by = $1
        ",
    )
    .bind(viewer.0)
    .fetch_one(&mut *conn)
    .await
    .context("counting liked videos")?
    .try_get("total")
    .context("retrieving the total field")?;

    let rows = sqlx::query(&format!(
        "
            SELECT v.id, v.title, v.description, v.video_url, v.thumbnail_url,
                   v.duration_secs, v.views, v.is_published, v.created_at, v.updated_at,
                   u.id AS owner_id, u.username, u.full_name, u.avatar_url
              FROM likes l
             INNER JOIN videos v ON v.id = l.video_id
             INNER JOIN users u ON u.id = v.owner_id
             WHERE l.liked_by = $1
             ORDER BY v.created_at {}
             LIMIT $2 OFFSET $3
        ",
        order_keyword(sort)
    ))
    .bind(viewer.0)
    .bind(pagination.limit as i64)
    .bind(pagination.offset() as i64)
    .fetch_all(&mut *conn)
    .await
    .context("querying liked videos")?;

    let mut videos = Vec::with_capacity(rows.len());
    for row in &rows {
        videos.push(video_from_row(row)?);
    }
    Ok(PageOf::new(videos, total as u64, pagination))
}

fn video_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<Video> {
    Ok(Video {
        id: VideoId(row.try_get("id").context("retrieving the id field")?),
        owner: profile_from_row(row)?,
        title: row.try_get("title").context("retrieving the title field")?,
        description: row
            .try_get("description")
            .context("retrieving the description field")?,
        video_url: row
            .try_get("video_url")
            .context("retrieving the video_url field")?,
        thumbnail_url: row
            .try_get("thumbnail_url")
            .context("retrieving the thumbnail_url field")?,
        duration_secs: row
            .try_get("duration_secs")
            .context("retrieving the duration_secs field")?,
        views: row.try_get("views").context("retrieving the views field")?,
        is_published: row
            .try_get("is_published")
            .context("retrieving the is_published field")?,
        created_at: row
            .try_get("created_at")
            .context("retrieving the created_at field")?,
        updated_at: row
            .try_get("updated_at")
            .context("retrieving the updated_at field")?,
    })
}

const PLAYLIST_FIELDS: &str = "id, name, description, owner_id, video_ids, created_at, updated_at";

fn playlist_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<Playlist> {
    Ok(Playlist {
        id: PlaylistId(row.try_get("id").context("retrieving the id field")?),
        name: row.try_get("name").context("retrieving the name field")?,
        description: row
            .try_get("description")
            .context("retrieving the description field")?,
        owner: UserId(
            row.try_get("owner_id")
                .context("retrieving the owner_id field")?,
        ),
        videos: row
            .try_get::<Vec<Uuid>, _>("video_ids")
            .context("retrieving the video_ids field")?
            .into_iter()
            .map(VideoId)
            .collect(),
        created_at: row
            .try_get("created_at")
            .context("retrieving the created_at field")?,
        updated_at: row
            .try_get("updated_at")
            .context("retrieving the updated_at field")?,
    })
}

pub async fn create_playlist(
    conn: &mut sqlx::PgConnection,
    owner: UserId,
    name: &str,
    description: &str,
) -> Result<Playlist, Error> {
    let row = sqlx::query(&format!(
        "
            INSERT INTO playlists (id, name, description, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {PLAYLIST_FIELDS}
        "
    ))
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(description)
    .bind(owner.0)
    .fetch_one(&mut *conn)
    .await
    .context("inserting playlist")?;
    Ok(playlist_from_row(&row)?)
}

async fn playlist_owned_by(
    conn: &mut sqlx::PgConnection,
    playlist: PlaylistId,
    caller: UserId,
) -> Result<(), Error> {
    let row = sqlx::query("SELECT owner_id FROM playlists WHERE id = $1")
        .bind(playlist.0)
        .fetch_optional(&mut *conn)
        .await
        .context("fetching playlist owner")?
        .ok_or(Error::not_found("playlist"))?;
    let owner = UserId(
        row.try_get("owner_id")
            .context("retrieving the owner_id field")?,
    );
    if owner != caller {
        return Err(Error::forbidden());
    }
    Ok(())
}

pub async fn update_playlist(
    conn: &mut sqlx::PgConnection,
    playlist: PlaylistId,
    caller: UserId,
    name: &str,
    description: &str,
) -> Result<Playlist, Error> {
    playlist_owned_by(&mut *conn, playlist, caller).await?;
    let row = sqlx::query(&format!(
        "
            UPDATE playlists
               SET name = $2, description = $3, updated_at = now()
             WHERE id = $1
            RETURNING {PLAYLIST_FIELDS}
        "
    ))
    .bind(playlist.0)
    .bind(name)
    .bind(description)
    .fetch_one(&mut *conn)
    .await
    .context("updating playlist")?;
    Ok(playlist_from_row(&row)?)
}

pub async fn delete_playlist(
    conn: &mut sqlx::PgConnection,
    playlist: PlaylistId,
    caller: UserId,
) -> Result<(), Error> {
    playlist_owned_by(&mut *conn, playlist, caller).await?;
    sqlx::query("DELETE FROM playlists WHERE id = $1")
        .bind(playlist.0)
        .execute(&mut *conn)
        .await
        .context("deleting playlist")?;
    Ok(())
}

pub async fn add_video_to_playlist(
    conn: &mut sqlx::PgConnection,
    playlist: PlaylistId,
    video: VideoId,
    caller: UserId,
) -> Result<Playlist, Error> {
    playlist_owned_by(&mut *conn, playlist, caller).await?;
    if !video_exists(&mut *conn, video).await? {
        return Err(Error::invalid_reference("video", video.0));
    }
    // Membership is a set: appending an already-present id is a no-op.
    let row = sqlx::query(&format!(
        "
            UPDATE playlists
               SET video_ids = CASE
                       WHEN $2 = ANY(video_ids) THEN video_ids
                       ELSE array_append(video_ids, $2)
                   END,
                   updated_at = now()
             WHERE id = $1
            RETURNING {PLAYLIST_FIELDS}
        "
    ))
    .bind(playlist.0)
    .bind(video.0)
    .fetch_one(&mut *conn)
    .await
    .context("adding video to playlist")?;
    Ok(playlist_from_row(&row)?)
}

pub async fn remove_video_from_playlist(
    conn: &mut sqlx::PgConnection,
    playlist: PlaylistId,
    video: VideoId,
    caller: UserId,
) -> Result<Playlist, Error> {
    playlist_owned_by(&mut *conn, playlist, caller).await?;
    let row = sqlx::query(&format!(
        "
            UPDATE playlists
               SET video_ids = array_remove(video_ids, $2),
                   updated_at = now()
             WHERE id = $1
            RETURNING {PLAYLIST_FIELDS}
        "
    ))
    .bind(playlist.0)
    .bind(video.0)
    .fetch_one(&mut *conn)
    .await
    .context("removing video from playlist")?;
    Ok(playlist_from_row(&row)?)
}

/// Joins a playlist to its member videos, keeping only published ones;
/// both totals are computed after that filter.
pub async fn get_playlist_enriched(
    conn: &mut sqlx::PgConnection,
    playlist: PlaylistId,
) -> Result<clipnest_api::EnrichedPlaylist, Error> {
    let row = sqlx::query(
        "
            SELECT p.id, p.name, p.description, p.video_ids, p.created_at, p.updated_at,
                   u.id AS owner_id, u.username, u.full_name, u.avatar_url
              FROM playlists p
             INNER JOIN users u ON u.id = p.owner_id
             WHERE p.id = $1
        ",
    )
    .bind(playlist.0)
    .fetch_optional(&mut *conn)
    .await
    .context("fetching playlist")?
    .ok_or(Error::not_found("playlist"))?;
    let video_ids: Vec<Uuid> = row
        .try_get("video_ids")
        .context("retrieving the video_ids field")?;
    let owner = profile_from_row(&row)?;

    let video_rows = sqlx::query(
        "
            SELECT id, title, description, video_url, thumbnail_url,
                   duration_secs, views, created_at, updated_at
              FROM videos
             WHERE id = ANY($1)
               AND is_published
             ORDER BY array_position($1, id)
        ",
    )
    .bind(&video_ids)
    .fetch_all(&mut *conn)
    .await
    .context("fetching playlist videos")?;

    let mut videos = Vec::with_capacity(video_rows.len());
    for v in &video_rows {
        videos.push(PlaylistVideo {
            id: VideoId(v.try_get("id").context("retrieving the id field")?),
            title: v.try_get("title").context("retrieving the title field")?,
            description: v
                .try_get("description")
                .context("retrieving the description field")?,
            video_url: v
                .try_get("video_url")
                .context("retrieving the video_url field")?,
            thumbnail_url: v
                .try_get("thumbnail_url")
                .context("retrieving the thumbnail_url field")?,
            duration_secs: v
                .try_get("duration_secs")
                .context("retrieving the duration_secs field")?,
            views: v.try_get("views").context("retrieving the views field")?,
            created_at: v
                .try_get("created_at")
                .context("retrieving the created_at field")?,
            updated_at: v
                .try_get("updated_at")
                .context("retrieving the updated_at field")?,
        });
    }

    let total_videos = videos.len() as i64;
    let total_views = videos.iter().map(|v| v.views as i64).sum();
    Ok(clipnest_api::EnrichedPlaylist {
        id: PlaylistId(row.try_get("id").context("retrieving the id field")?),
        name: row.try_get("name").context("retrieving the name field")?,
        description: row
            .try_get("description")
            .context("retrieving the description field")?,
        owner,
        videos,
        total_videos,
        total_views,
        created_at: row
            .try_get("created_at")
            .context("retrieving the created_at field")?,
        updated_at: row
            .try_get("updated_at")
            .context("retrieving the updated_at field")?,
    })
}

/// Playlist summaries for a user's own listing: totals here include
/// unpublished members, unlike the single-playlist view.
pub async fn get_user_playlists(
    conn: &mut sqlx::PgConnection,
    user: UserId,
) -> Result<Vec<PlaylistSummary>, Error> {
    Ok(sqlx::query(
        "
            SELECT p.id, p.name, p.description, p.updated_at,
                   COUNT(v.id) AS total_videos,
                   COALESCE(SUM(v.views), 0)::BIGINT AS total_views
              FROM playlists p
              LEFT JOIN videos v ON v.id = ANY(p.video_ids)
             WHERE p.owner_id = $1
             GROUP BY p.id
             ORDER BY p.updated_at DESC
        ",
    )
    .bind(user.0)
    .fetch(&mut *conn)
    .map_err(anyhow::Error::from)
    .and_then(|row| async move {
        Ok(PlaylistSummary {
            id: PlaylistId(row.try_get("id").context("retrieving the id field")?),
            name: row.try_get("name").context("retrieving the name field")?,
            description: row
                .try_get("description")
                .context("retrieving the description field")?,
            total_videos: row
                .try_get("total_videos")
                .context("retrieving the total_videos field")?,
            total_views: row
                .try_get("total_views")
                .context("retrieving the total_views field")?,
            updated_at: row
                .try_get("updated_at")
                .context("retrieving the updated_at field")?,
        })
    })
    .try_collect::<Vec<_>>()
    .await
    .context("querying user playlists")?)
}

pub async fn toggle_subscription(
    conn: &mut sqlx::PgConnection,
    subscriber: UserId,
    channel: UserId,
) -> Result<bool, Error> {
    if subscriber == channel {
        return Err(Error::forbidden());
    }
    if !user_exists(&mut *conn, channel).await? {
        return Err(Error::invalid_reference("channel", channel.0));
    }

    let res = sqlx::query(
        "DELETE FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2",
    )
    .bind(subscriber.0)
    .bind(channel.0)
    .execute(&mut *conn)
    .await
    .context("deleting existing subscription")?;
    if res.rows_affected() > 0 {
        return Ok(false);
    }

    sqlx::query(
        "
            INSERT INTO subscriptions (id, subscriber_id, channel_id)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
        ",
    )
    .bind(Uuid::new_v4())
    .bind(subscriber.0)
    .bind(channel.0)
    .execute(&mut *conn)
    .await
    .context("inserting subscription")?;
    Ok(true)
}

pub async fn get_channel_stats(
    conn: &mut sqlx::PgConnection,
    channel: UserId,
    viewer: Option<UserId>,
) -> Result<ChannelStats, Error> {
    if !user_exists(&mut *conn, channel).await? {
        return Err(Error::not_found("channel"));
    }
    let row = sqlx::query(
        "
            SELECT COUNT(*) AS subscribers,
                   EXISTS(
                       SELECT 1 FROM subscriptions
                        WHERE channel_id = $1 AND subscriber_id = $2
                   ) AS is_subscribed
              FROM subscriptions
             WHERE channel_id = $1
        ",
    )
    .bind(channel.0)
    .bind(viewer.map(|u| u.0))
    .fetch_one(&mut *conn)
    .await
    .context("querying channel stats")?;
    Ok(ChannelStats {
        channel,
        subscribers: row
            .try_get("subscribers")
            .context("retrieving the subscribers field")?,
        is_subscribed: row
            .try_get("is_subscribed")
            .context("retrieving the is_subscribed field")?,
    })
}
