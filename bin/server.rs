// LoanOfficerAI - Web Server
// REST API, function-calling endpoint and chat over the JSON data files

use anyhow::{Context, Result};
use loan_officer_ai::config::AppConfig;
use loan_officer_ai::http::{router, AppState};
use loan_officer_ai::{check_integrity, logging, VERSION};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    logging::init_tracing(config.server.log_format);

    println!("🌾 LoanOfficerAI server v{}", VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let data_dir = &config.server.data_dir;
    if !data_dir.exists() {
        warn!(path = %data_dir.display(), "data directory missing, every dataset will be empty");
    }

    // Broken references are reported, not fatal
    match check_integrity(&loan_officer_ai::DataStore::new(data_dir)) {
        Ok(report) if report.is_clean() => info!("{}", report.summary()),
        Ok(report) => warn!(critical = report.critical_count(), "{}", report.summary()),
        Err(e) => error!(error = %e, "integrity check could not load the data"),
    }

    match config.auth.jwt_secret() {
        Some(_) => info!(users = config.auth.users.len(), "login enabled"),
        None if config.auth.api_tokens.is_empty() => {
            warn!("no JWT_SECRET or API tokens configured, only internal calls will authenticate")
        }
        None => info!("JWT_SECRET not set, /api/auth/login disabled"),
    }

    let state = AppState::from_config(&config).context("failed to build chat client")?;
    let chat_enabled = state.chat.is_some();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;

    println!("\n🚀 Server running on http://{}", config.server.bind);
    println!("   API:  http://{}/api/borrowers", config.server.bind);
    println!("   Chat: {}", if chat_enabled { "enabled" } else { "disabled (no OPENAI_API_KEY)" });
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
