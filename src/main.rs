// Query-Forge: natural-language questions over MySQL and MongoDB
//
// This is the main entry point for the HTTP service.

use anyhow::{Context, Result};
use clap::Parser;
use query_forge::api::{create_router, ApiState};
use query_forge::config::{storage, Config};
use query_forge::database::cache::{RedisStore, ResultCache, SharedStore};
use query_forge::database::mongo::MongoBackend;
use query_forge::database::mysql::MySqlBackend;
use query_forge::llm::client::LLMHttpClient;
use query_forge::llm::providers::openai::OpenAIProvider;
use query_forge::llm::{LLMProvider, QueryTranslator};
use query_forge::service::QueryService;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "query-forge", version, about = "Ask MySQL or MongoDB questions in plain language")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "QUERY_FORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("query_forge=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if args.print_config {
        println!("{}", storage::to_toml(&config)?);
        return Ok(());
    }

    info!("Query-Forge v{}", env!("CARGO_PKG_VERSION"));

    let service = build_service(&config).await?;
    let app = create_router(ApiState {
        service: Arc::new(service),
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn build_service(config: &Config) -> Result<QueryService> {
    let client = LLMHttpClient::with_timeout(config.llm.timeout_secs)?
        .with_max_retries(config.llm.max_retries);
    let provider = OpenAIProvider::new(config.llm.api_key.clone(), Some(config.llm.model.clone()))?
        .with_endpoint(config.llm.base_url.clone())
        .with_client(client);
    if !provider.has_api_key() {
        warn!("OPENAI_API_KEY is not set; every translation will fail until it is configured");
    }
    info!(model = provider.model(), "LLM provider ready");

    let translator =
        QueryTranslator::new(Arc::new(provider)).with_temperature(config.llm.temperature);

    let remote = if config.redis.enabled {
        match RedisStore::connect(&config.redis.url()).await {
            Ok(store) => Some(Arc::new(store) as Arc<dyn SharedStore>),
            Err(e) => {
                warn!(error = %e, "Redis unavailable, using in-process cache only");
                None
            }
        }
    } else {
        None
    };
    let cache = ResultCache::new(config.cache.capacity, remote);

    let mut service = QueryService::new(translator, cache);

    if config.mysql.enabled {
        let backend =
            MySqlBackend::connect_lazy(config.mysql.connect_options()?, config.mysql.max_connections);
        service = service.with_backend(Arc::new(backend));
    }

    if config.mongodb.enabled {
        match MongoBackend::connect(&config.mongodb.uri, &config.mongodb.database).await {
            Ok(backend) => service = service.with_backend(Arc::new(backend)),
            Err(e) => warn!(error = %e, "MongoDB backend disabled"),
        }
    }

    let backends: Vec<&str> = service
        .configured_backends()
        .iter()
        .map(|kind| kind.name())
        .collect();
    info!(?backends, "backends registered");

    Ok(service)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}
