use anyhow::{Context, Result};
use axum::serve;
use rollcall::core::config::Config;
use rollcall::core::routes::build_router;
use rollcall::core::startup::build_state;
use rollcall::core::tracing_init::init_tracing;
use rollcall::jobs::scheduler::spawn_scheduler;
use rollcall::transport::polling::run_polling;
use rollcall::transport::telegram::TelegramClient;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let config_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("config.toml")
    };

    // Load and validate configuration
    let config = Config::from_file(&config_path)
        .context(format!(
            "Failed to load configuration from '{}'. \
            On first run, copy config.example.toml to config.toml and fill in the bot token and course.",
            config_path.display()
        ))?;

    init_tracing(&config.logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.num_threads)
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(async_main(config, config_path))
}

async fn async_main(config: Config, config_path: PathBuf) -> Result<()> {
    info!(
        config_path = %config_path.display(),
        db_path = %config.storage.db_path.display(),
        timezone = %config.course.timezone.name(),
        groups = config.course.groups.len(),
        scheduled_jobs = config.schedule.len(),
        http_port = ?config.server.port,
        num_threads = config.server.num_threads,
        log_level = %config.logging.level,
        "Attendance bot starting"
    );

    let client = Arc::new(TelegramClient::new(&config.bot)?);
    let state = Arc::new(build_state(config.clone(), client.clone())?);

    spawn_scheduler(state.clone());

    if let Some(port) = config.server.port {
        let addr: SocketAddr = format!("{}:{}", config.server.bind_address, port)
            .parse()
            .context("Invalid server bind address")?;

        let app = build_router(state.clone()).layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            ),
        );

        let listener = TcpListener::bind(addr)
            .await
            .context(format!("Failed to bind TCP listener to {}", addr))?;

        info!(address = %addr, "Monitoring endpoint listening");

        tokio::spawn(async move {
            if let Err(e) = serve(listener, app).await {
                error!(error = %e, "Monitoring server failed");
            }
        });
    }

    tokio::select! {
        _ = run_polling(state.clone(), client) => {
            error!("Polling loop exited unexpectedly");
        }
        _ = shutdown_signal() => {}
    }

    info!("Shutting down gracefully");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutdown signal received, stopping event processing");
}
