//! Thera chat API server binary.
//!
//! Configuration comes from the environment (and `.env`); a few values can
//! be overridden on the command line.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use thera_api::config::ApiConfig;
use thera_core::assistant::openai::OpenAiAssistant;
use thera_core::cache::{MemorySessionCache, RedisSessionCache, SessionCache};
use thera_core::identity::IdentityProvider;
use thera_core::identity::firebase::FirebaseIdentity;
use thera_core::store::PgUserStore;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "thera_api_server", about = "Thera chat API server")]
struct Args {
    /// Address to listen on; overrides `BIND_ADDR`.
    #[arg(long)]
    bind: Option<String>,

    /// PostgreSQL connection URL; overrides `DATABASE_URL`.
    #[arg(long)]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// Maximum number of pooled Redis connections.
    #[arg(long, env = "REDIS_MAX_CONNECTIONS", default_value_t = 16)]
    redis_max_connections: u32,

    /// Keep sessions in process memory even when `REDIS_URL` is set.
    #[arg(long, default_value_t = false)]
    memory_cache: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,thera_api=debug,thera_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    config.secrets.validate()?;

    info!(bind = %config.bind_addr, "starting thera_api_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    let users = PgUserStore::new(pool);
    info!("running database migrations");
    users.migrate().await?;

    let cache: Arc<dyn SessionCache> = match config.redis_url.as_deref() {
        Some(url) if !args.memory_cache => {
            info!("using redis session cache");
            Arc::new(RedisSessionCache::connect(url, args.redis_max_connections).await?)
        }
        _ => {
            warn!("using in-memory session cache; sessions are lost on restart");
            let cache = Arc::new(MemorySessionCache::new());
            cache.spawn_cleanup_task();
            cache
        }
    };

    let assistant = OpenAiAssistant::connect(config.openai()).await?;
    info!(assistant_id = %config.openai_assistant_id, "assistant verified");

    let identity: Option<Arc<dyn IdentityProvider>> = match config.firebase_api_key.as_deref() {
        Some(key) => Some(Arc::new(FirebaseIdentity::new(key)?)),
        None => {
            info!("FIREBASE_API_KEY not set, federated login disabled");
            None
        }
    };

    let bind_addr = config.bind_addr.clone();
    let state = thera_api::AppState::new(
        cache,
        Arc::new(users),
        Arc::new(assistant),
        identity,
        config,
    );
    let shutdown = state.shutdown.clone();
    let app = thera_api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                return;
            }
            info!("shutdown requested");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
