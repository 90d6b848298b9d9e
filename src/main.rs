use std::{net::SocketAddr, process, sync::Arc, time::Duration};

use blogwire::{
    application::{
        catalog::BlogCatalog,
        directory::Directory,
        error::AppError,
        likes::LikeAggregator,
        replies::ReplyTreeSerializer,
        repos::{BlogsRepo, CommentsRepo, HealthCheck, LikesRepo, RepliesRepo, UsersRepo},
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, RouteGuards},
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_api_state(repositories);
    let guards = RouteGuards::from_settings(&settings);

    info!(
        addr = %settings.server.addr,
        search_max_requests = settings.rate_limit.search.max_requests.get(),
        listings_max_requests = settings.rate_limit.listings.max_requests.get(),
        query_cache_enabled = settings.query_cache.enabled,
        query_cache_threshold = settings.query_cache.threshold.get(),
        "starting blogwire"
    );

    serve_http(&settings, state, guards).await
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_api_state(repositories: Arc<PostgresRepositories>) -> ApiState {
    let likes_repo: Arc<dyn LikesRepo> = repositories.clone();
    let replies_repo: Arc<dyn RepliesRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let blogs_repo: Arc<dyn BlogsRepo> = repositories.clone();
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let health: Arc<dyn HealthCheck> = repositories;

    let likes = LikeAggregator::new(likes_repo);
    let threads = ReplyTreeSerializer::new(replies_repo.clone(), likes.clone());

    ApiState {
        catalog: Arc::new(BlogCatalog::new(
            blogs_repo,
            comments_repo.clone(),
            replies_repo.clone(),
            likes,
        )),
        directory: Arc::new(Directory::new(
            users_repo,
            comments_repo,
            replies_repo,
            threads,
        )),
        health,
    }
}

async fn serve_http(
    settings: &config::Settings,
    state: ApiState,
    guards: RouteGuards,
) -> Result<(), AppError> {
    let router = http::build_router(state, guards);
    let addr = settings.server.addr;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::from(InfraError::bind(addr, err)))?;

    let draining = Arc::new(Notify::new());
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(draining.clone()));

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => result.map_err(|err| AppError::from(InfraError::from(err)))?,
        _ = drain_deadline(draining, grace) => {
            warn!(
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!("blogwire stopped");
    Ok(())
}

async fn shutdown_signal(draining: Arc<Notify>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested; draining connections");
    draining.notify_one();
}

async fn drain_deadline(draining: Arc<Notify>, grace: Duration) {
    draining.notified().await;
    tokio::time::sleep(grace).await;
}
