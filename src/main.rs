//! herakles-sysmon - version 0.1.0
//!
//! Host metrics monitor with tracing logging.
//! This is the main entry point that starts background monitoring, serves the
//! status endpoints and handles subcommands.

mod commands;
mod handlers;
mod metrics;
mod state;

use anyhow::Context;
use axum::{routing::get, Router};
use clap::Parser;
use prometheus::Registry;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::{net::TcpListener, signal};
use tracing::{debug, error, info, info_span, Level};

use commands::{command_alerts, command_config, command_snapshot};
use handlers::{history_handler, health_handler, metrics_handler, root_handler, snapshot_handler};
use herakles_sysmon::cli::{Args, Commands};
use herakles_sysmon::config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR,
    DEFAULT_PORT,
};
use herakles_sysmon::Monitor;
use metrics::MonitorMetrics;
use state::AppState;

/// Maps a configured level name to a tracing level; `None` turns logging off.
fn parse_level(name: &str) -> Option<Level> {
    match name.trim().to_ascii_lowercase().as_str() {
        "off" => None,
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => Some(Level::INFO),
    }
}

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config) -> anyhow::Result<()> {
    let level_name = config.log_level.as_deref().unwrap_or("info");
    let Some(log_level) = parse_level(level_name) else {
        return Ok(());
    };

    let builder = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            let subscriber = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            tracing::subscriber::set_global_default(builder.finish())?;
        }
    }

    info!("Logging initialized with level: {}", level_name);
    Ok(())
}

/// Resolves once SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Background monitoring plus the optional HTTP status surface.
async fn run_server(config: Config) -> anyhow::Result<()> {
    let monitor = Arc::new(
        Monitor::builder_from_config(&config)?
            .span(info_span!("monitor"))
            .build()?,
    );

    info!(
        "Monitoring every {:.1}s (cpu > {:.0}%, ram > {:.0}%, disk > {:.0}%)",
        monitor.interval().as_secs_f64(),
        monitor.thresholds().cpu_limit(),
        monitor.thresholds().ram_limit(),
        monitor.thresholds().disk_limit()
    );

    if !config.enable_http.unwrap_or(true) {
        debug!("HTTP endpoints disabled");
        monitor.run_until(shutdown_signal()).await;
        info!("herakles-sysmon stopped gracefully");
        return Ok(());
    }

    // Initialize Prometheus metrics registry
    let registry = Registry::new();
    let metrics = MonitorMetrics::new(&registry)?;
    debug!("Prometheus registry initialized");

    let state = Arc::new(AppState {
        monitor: Arc::clone(&monitor),
        registry,
        metrics,
        start_time: Instant::now(),
    });

    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", bind_ip_str, port))?;

    // Configure HTTP server routes
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/snapshot", get(snapshot_handler))
        .route("/history", get(history_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    info!(
        "herakles-sysmon listening on http://{}:{}",
        bind_ip_str, port
    );

    monitor.start().await;

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(e) = server.await {
        error!("Server error: {}", e);
        monitor.stop().await;
        return Err(e.into());
    }

    monitor.stop().await;
    info!("herakles-sysmon stopped gracefully");
    Ok(())
}

/// Main application entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, &args.config_format);
    }

    // Config generation needs no effective configuration
    if let Some(Commands::Config {
        output,
        format,
        commented,
    }) = &args.command
    {
        return command_config(output.clone(), format.clone(), *commented);
    }

    let config = resolve_config(&args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    setup_logging(&config)?;

    match &args.command {
        Some(Commands::Snapshot { format, pretty }) => command_snapshot(&config, *format, *pretty),
        Some(Commands::Alerts) => command_alerts(&config).await,
        Some(Commands::Config { .. }) => unreachable!("Config handled above"),
        Some(Commands::Run) | None => {
            info!("Starting herakles-sysmon");
            run_server(config).await
        }
    }
}
