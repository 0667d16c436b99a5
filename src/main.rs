use scenemcp::{
    auth::{ApiKeyResolver, IdentityResolver, IntrospectionResolver},
    build_router,
    config::AppConfig,
    mcp::{CapabilityRegistry, InstanceFactory, McpInstanceRegistry, RequestDispatcher},
    services::{ChatCompletionsGenerator, Collaborators, FsAssetLoader},
    AppState,
};

use clap::Parser;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const INTROSPECTION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "scenemcp")]
#[command(about = "MCP server generating animated p5.js scenes", long_about = None)]
struct Args {
    /// Address to listen on (overrides BIND_ADDR)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Maximum number of cached MCP instances (overrides INSTANCE_CACHE_CAPACITY)
    #[arg(short, long)]
    capacity: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();
    let config = AppConfig::from_env()?.with_overrides(args.bind, args.capacity)?;

    // Collaborators
    let mut generator = ChatCompletionsGenerator::new(
        &config.generator.base_url,
        &config.generator.model,
        config.generator.timeout,
    )?;
    if let Some(api_key) = &config.generator.api_key {
        generator = generator.with_api_key(api_key);
    } else {
        tracing::warn!("GENERATOR_API_KEY not set; generation requests are unauthenticated");
    }
    let collaborators = Collaborators::new(
        Arc::new(generator),
        Arc::new(FsAssetLoader::new(&config.assets_dir)),
    );

    // Identity resolvers
    let api_keys = ApiKeyResolver::from_list(&config.api_keys)?;
    if api_keys.is_empty() {
        tracing::warn!("API_KEYS is empty; every request to /mcp will be rejected");
    }

    let oauth: Option<Arc<dyn IdentityResolver>> = match &config.oauth {
        Some(oauth) => {
            let mut resolver =
                IntrospectionResolver::new(&oauth.introspection_url, INTROSPECTION_TIMEOUT)?;
            if let (Some(id), Some(secret)) = (&oauth.client_id, &oauth.client_secret) {
                resolver = resolver.with_client_credentials(id, secret);
            }
            tracing::info!(endpoint = %oauth.introspection_url, "OAuth route enabled");
            Some(Arc::new(resolver))
        }
        None => {
            tracing::info!("OAUTH_INTROSPECTION_URL not set; OAuth route disabled");
            None
        }
    };

    // Instance registry
    let factory = InstanceFactory::new(Arc::new(CapabilityRegistry::builtin()), collaborators);
    let registry = Arc::new(McpInstanceRegistry::new(config.cache_capacity, factory)?);
    tracing::info!(capacity = config.cache_capacity, "Instance cache ready");

    let state = AppState {
        dispatcher: RequestDispatcher::new(registry),
        api_keys: Arc::new(api_keys),
        oauth,
        authorization_server: config.oauth.as_ref().and_then(|o| o.issuer.clone()),
        base_url: config.base_url.clone(),
    };

    let app = build_router(state).layer(TraceLayer::new_for_http());

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    tracing::info!("Server running on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scenemcp=debug,tower_http=debug,axum::rejection=trace".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
