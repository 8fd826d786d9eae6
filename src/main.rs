use interview_orchestrator::config::ServerConfig;
use interview_orchestrator::interview::{SessionStore, interview_routes, spawn_idle_sweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    let addr = config.socket_addr();

    eprintln!("🧭 Interview Orchestrator v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Mode: {}",
        if config.mock_responses { "mock" } else { "live" }
    );
    eprintln!("   API: http://{}/interview/start", addr);
    eprintln!(
        "   Sessions: idle timeout {}s, sweep every {}s\n",
        config.session_idle_timeout.as_secs(),
        config.sweep_interval.as_secs(),
    );

    // ── Sessions ────────────────────────────────────────────────────────
    let store = SessionStore::new(config.mock_responses)?;
    let _sweeper = spawn_idle_sweeper(
        store.clone(),
        config.sweep_interval,
        config.session_idle_delta(),
    );

    // ── HTTP ────────────────────────────────────────────────────────────
    let app = interview_routes(store);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Interview server started");
    axum::serve(listener, app).await?;

    Ok(())
}
