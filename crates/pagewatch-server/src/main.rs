mod api;
mod middleware;

use std::sync::Arc;
use std::time::Duration;

use pagewatch_check::{ChangeSummarizer, CheckPipeline, CheckSettings, NoopSummarizer};
use pagewatch_core::AppConfig;
use pagewatch_scraper::PageClient;
use pagewatch_summarizer::SummarizerClient;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::RateLimitState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pagewatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pagewatch_db::PoolConfig::from_app_config(&config);
    let pool = pagewatch_db::connect_pool(&config.database_url, pool_config).await?;
    pagewatch_db::run_migrations(&pool).await?;

    let checker = build_checker(&config, &pool)?;
    let rate_limit = RateLimitState::new(
        config.check_rate_limit,
        Duration::from_secs(config.check_rate_window_secs),
    );
    let state = AppState {
        pool,
        checker: Arc::new(checker),
        max_resources: config.max_resources,
    };
    let app = build_app(state, rate_limit);

    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "pagewatch server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_checker(config: &AppConfig, pool: &PgPool) -> anyhow::Result<CheckPipeline> {
    let fetcher = PageClient::new(config.fetch_timeout_secs, &config.user_agent)?;

    let summarizer: Arc<dyn ChangeSummarizer> = match config.summarizer_api_key.as_deref() {
        Some(key) => Arc::new(SummarizerClient::new(
            key,
            &config.summarizer_base_url,
            &config.summarizer_model,
            config.summarizer_timeout_secs,
            config.summarizer_max_retries,
        )?),
        None => {
            tracing::warn!("PAGEWATCH_SUMMARIZER_API_KEY not set; change summaries disabled");
            Arc::new(NoopSummarizer)
        }
    };

    Ok(CheckPipeline::new(
        Arc::new(fetcher),
        Arc::new(pool.clone()),
        summarizer,
        CheckSettings {
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            // Whatever the fetch leaves of the check budget, retries included.
            summarizer_timeout: Duration::from_secs(
                config
                    .check_budget_secs
                    .saturating_sub(config.fetch_timeout_secs),
            ),
            ..CheckSettings::default()
        },
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
