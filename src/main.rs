use std::{process, sync::Arc, time::Duration};

use blogroll::{
    application::{
        admin::{AdminService, CreateGroupCommand},
        auth::AuthService,
        error::AppError,
    },
    cache::{PageCache, PageCacheConfig},
    config,
    infra::{
        db::SqliteRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState, ServiceOptions},
        telemetry,
        uploads::UploadStorage,
    },
};
use tokio::try_join;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

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
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::CreateGroup(args) => run_create_group(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let (http_state, admin_state) = build_application_context(repositories, &settings)?;

    let purge_handle = spawn_session_purger(http_state.auth.clone());
    let result = serve_http(&settings, http_state, admin_state).await;

    purge_handle.abort();
    let _ = purge_handle.await;

    result
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = SqliteRepositories::connect(&settings.database.url, 1)
        .await
        .map_err(InfraError::from)?;
    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;
    info!(
        target = "blogroll::migrate",
        database = %settings.database.url,
        "migrations applied"
    );
    Ok(())
}

async fn run_create_group(
    settings: config::Settings,
    args: config::CreateGroupArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let uploads = init_upload_storage(&settings)?;
    let cache = PageCache::new(PageCacheConfig::from(&settings.cache));
    let admin = AdminService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        repositories,
        uploads,
        cache,
    );

    let group = admin
        .create_group(CreateGroupCommand {
            title: args.title,
            slug: args.slug,
            description: args.description,
        })
        .await?;
    info!(
        target = "blogroll::create_group",
        id = group.id,
        slug = %group.slug,
        "group created"
    );
    Ok(())
}

async fn init_repositories(settings: &config::Settings) -> Result<Arc<SqliteRepositories>, AppError> {
    let pool = SqliteRepositories::connect(
        &settings.database.url,
        settings.database.max_connections.get(),
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    Ok(Arc::new(SqliteRepositories::new(pool)))
}

fn init_upload_storage(settings: &config::Settings) -> Result<Arc<UploadStorage>, AppError> {
    let storage = UploadStorage::new(settings.uploads.directory.clone())
        .map_err(|err| AppError::from(InfraError::Io(err)))?;
    Ok(Arc::new(storage))
}

fn build_application_context(
    repositories: Arc<SqliteRepositories>,
    settings: &config::Settings,
) -> Result<(HttpState, AdminState), AppError> {
    let upload_storage = init_upload_storage(settings)?;
    let cache = PageCache::new(PageCacheConfig::from(&settings.cache));
    let session_ttl = time::Duration::try_from(settings.auth.session_ttl).map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "session lifetime out of range: {err}"
        )))
    })?;
    let upload_limit_bytes =
        usize::try_from(settings.uploads.max_request_bytes.get()).unwrap_or(usize::MAX);

    Ok(http::build_states(
        repositories,
        upload_storage,
        cache,
        ServiceOptions {
            session_ttl,
            cookie_secure: settings.auth.cookie_secure,
            upload_limit_bytes,
        },
    ))
}

fn spawn_session_purger(auth: Arc<AuthService>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(err) = auth.purge_expired_sessions().await {
                warn!(
                    target = "blogroll::sessions",
                    error = %err,
                    "failed to purge expired sessions"
                );
            }
        }
    })
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::bind(settings.server.public_addr, err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::bind(settings.server.admin_addr, err)))?;

    info!(
        target = "blogroll::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listening"
    );

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target = "blogroll::serve",
            error = %err,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    info!(target = "blogroll::serve", "shutdown requested");
}
