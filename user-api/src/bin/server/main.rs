use std::net::SocketAddr;
use std::sync::Arc;

use auth::Authenticator;
use clap::Parser;
use clap::Subcommand;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::net::TcpListener;
use user_api::config::Config;
use user_api::domain::cache::ports::Cache;
use user_api::domain::cache::service::CacheService;
use user_api::domain::user::service::AuthService;
use user_api::inbound::http::router::create_router;
use user_api::inbound::http::router::AppState;
use user_api::logging;
use user_api::outbound::cache::MemoryCache;
use user_api::outbound::cache::RedisCache;
use user_api::outbound::repositories::schema;
use user_api::outbound::repositories::PostgresUserRepository;

/// User management API server
#[derive(Parser, Debug)]
#[command(name = "user-api")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Run migrations and serve the HTTP API (default)
    Serve,

    /// Run database migrations and exit
    Migrate,

    /// Drop all tables and re-run migrations
    #[command(name = "migrate:fresh")]
    MigrateFresh,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let config = Config::load()?;
    logging::init(&config.logging)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            let pg_pool = connect_database(&config).await?;
            schema::migrate(&pg_pool).await?;
            Ok(())
        }
        Command::MigrateFresh => {
            let pg_pool = connect_database(&config).await?;
            tracing::warn!("Dropping all tables before migrating");
            schema::migrate_fresh(&pg_pool).await?;
            Ok(())
        }
    }
}

async fn connect_database(config: &Config) -> Result<PgPool, anyhow::Error> {
    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    Ok(pg_pool)
}

async fn serve(config: Config) -> Result<(), anyhow::Error> {
    tracing::info!(
        service = "user-api",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    tracing::info!(
        http_port = config.server.http_port,
        redis_enabled = config.redis.enabled,
        cors_enabled = config.cors.enabled,
        jwt_expiration_hours = config.jwt.expiration_hours,
        "Configuration loaded"
    );

    let pg_pool = connect_database(&config).await?;
    schema::migrate(&pg_pool).await?;

    let authenticator = Arc::new(Authenticator::new(
        config.jwt.secret.as_bytes(),
        config.jwt.token_validity(),
    ));
    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool));

    let state = if config.redis.enabled {
        let cache = Arc::new(RedisCache::connect(&config.redis).await?);
        build_state(&config, user_repository, cache, authenticator)
    } else {
        tracing::warn!("Redis disabled, using in-process cache");
        build_state(&config, user_repository, Arc::new(MemoryCache::new()), authenticator)
    };

    let http_application = create_router(state, &config.cors);

    let listener = bind(&config.server.host, config.server.http_port).await?;
    let local_address = listener.local_addr()?;
    tracing::info!(
        address = %local_address,
        port = local_address.port(),
        protocol = "http",
        "Http server listening"
    );

    axum::serve(listener, http_application)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server exited successfully");

    Ok(())
}

fn build_state<C: Cache>(
    config: &Config,
    user_repository: Arc<PostgresUserRepository>,
    cache: Arc<C>,
    authenticator: Arc<Authenticator>,
) -> AppState {
    let auth_service = AuthService::new(
        user_repository,
        Arc::clone(&cache),
        Arc::clone(&authenticator),
        config.redis.timeout(),
    );

    AppState {
        auth_service: Arc::new(auth_service),
        cache_service: Arc::new(CacheService::new(cache)),
        authenticator,
    }
}

/// Bind the configured port, or an ephemeral one if it is taken.
async fn bind(host: &str, port: u16) -> Result<TcpListener, anyhow::Error> {
    let address: SocketAddr = format!("{host}:{port}").parse()?;

    match TcpListener::bind(address).await {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            tracing::warn!(port, "Port in use, falling back to an ephemeral port");
            Ok(TcpListener::bind(SocketAddr::new(address.ip(), 0)).await?)
        }
        Err(e) => Err(e.into()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
