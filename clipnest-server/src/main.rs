use anyhow::Context;
use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use structopt::StructOpt;

mod db;
mod error;
mod extractors;
mod handlers;

pub use error::Error;
use extractors::AppState;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "clipnest-server",
    about = "Comment-tree and social-graph backend for the clipnest platform"
)]
struct Opt {
    /// Address to listen on
    #[structopt(long, default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Maximum number of database connections
    #[structopt(long, default_value = "8")]
    db_connections: u32,

    /// Deadline for a single request, in seconds
    #[structopt(long, default_value = "30")]
    request_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let opt = Opt::from_args();

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = sqlx::postgres::PgPoolOptions::new()
        .max_connections(opt.db_connections)
        .connect(&db_url)
        .await
        .with_context(|| format!("opening database {:?}", db_url))?;

    let app = app(db, std::time::Duration::from_secs(opt.request_timeout_secs));

    tracing::info!("listening on {}", opt.bind);
    axum::Server::bind(&opt.bind)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}

async fn handle_middleware_error(err: tower::BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            String::from("request timed out"),
        )
    } else {
        tracing::error!(?err, "middleware error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Internal server error, see logs for details"),
        )
    }
}

fn app(db: sqlx::PgPool, request_timeout: std::time::Duration) -> Router {
    Router::new()
        .route(
            "/videos/:video_id/comments",
            get(handlers::get_video_comments).post(handlers::add_video_comment),
        )
        .route("/tweets/:tweet_id/comments", post(handlers::add_tweet_comment))
        .route(
            "/comments/:comment_id",
            axum::routing::patch(handlers::update_comment).delete(handlers::delete_comment),
        )
        .route("/comments/:comment_id/replies", post(handlers::add_reply))
        .route("/likes/videos", get(handlers::get_liked_videos))
        .route("/likes/videos/:video_id", post(handlers::toggle_video_like))
        .route(
            "/likes/comments/:comment_id",
            post(handlers::toggle_comment_like),
        )
        .route("/likes/tweets/:tweet_id", post(handlers::toggle_tweet_like))
        .route("/playlists", post(handlers::create_playlist))
        .route(
            "/playlists/:playlist_id",
            get(handlers::get_playlist)
                .patch(handlers::update_playlist)
                .delete(handlers::delete_playlist),
        )
        .route(
            "/playlists/:playlist_id/videos/:video_id",
            post(handlers::add_video_to_playlist).delete(handlers::remove_video_from_playlist),
        )
        .route("/users/:user_id/playlists", get(handlers::get_user_playlists))
        .route(
            "/channels/:channel_id/subscription",
            post(handlers::toggle_subscription),
        )
        .route("/channels/:channel_id/stats", get(handlers::get_channel_stats))
        .layer(
            tower::ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(tower::timeout::TimeoutLayer::new(request_timeout)),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(AppState {
            db: extractors::PgPool::new(db),
        })
}
