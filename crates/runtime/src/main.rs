//! Turn orchestrator entry point
//!
//! Events in on stdin, commands out on stdout, one JSON object per line.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::LinesStream, StreamExt};

use voice_orchestrator_config::{load_settings, Settings};
use voice_orchestrator_pipeline::{
    ChannelSink, SessionCommand, SessionManager, SessionSinks, SinkFactory,
};
use voice_orchestrator_runtime::{decode_line, encode_command, init_metrics, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env} > config/default > defaults
    let env = std::env::var("VOICE_ORCH_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&settings);

    tracing::info!("Starting voice orchestrator v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?settings.environment,
        language = %settings.segmenter.language,
        max_sessions = settings.session.max_sessions,
        "Configuration loaded"
    );

    match init_metrics(&settings) {
        Ok(Some(addr)) => tracing::info!(%addr, "Prometheus exporter listening"),
        Ok(None) => tracing::debug!("Metrics exporter disabled"),
        Err(e) => tracing::warn!(error = %e, "Failed to start metrics exporter"),
    }

    let (tx, rx) = mpsc::unbounded_channel::<SessionCommand>();
    let writer = tokio::spawn(write_commands(rx));

    let factory: SinkFactory = Arc::new(move |key: &str| {
        let sink = Arc::new(ChannelSink::new(key, tx.clone()));
        SessionSinks {
            commands: sink.clone(),
            model: sink,
        }
    });
    let sessions = SessionManager::new(&settings, factory)?;
    let default_session = settings.orchestrator.default_session_id.clone();

    tokio::select! {
        result = read_events(&sessions, &default_session) => {
            result?;
            tracing::info!("Input closed, shutting down");
        }
        _ = shutdown_signal() => {}
    }

    let summaries = sessions.shutdown().await;
    for summary in &summaries {
        tracing::info!(
            session = %summary.key,
            session_id = %summary.session_id,
            turns = summary.turns,
            interrupts = summary.interrupts,
            stale_events = summary.stale_events,
            sink_errors = summary.sink_errors,
            final_state = ?summary.final_state,
            latency_records = summary.latency_records_total,
            "Session summary"
        );
    }

    // Last command sender lives in the factory
    drop(sessions);
    writer.await??;

    tracing::info!(sessions = summaries.len(), "Shutdown complete");
    Ok(())
}

/// Route stdin lines to sessions until EOF
async fn read_events(sessions: &SessionManager, default_session: &str) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = LinesStream::new(stdin.lines());

    while let Some(line) = lines.next().await {
        let line = line?;
        let envelope = match decode_line(&line) {
            Ok(Some(envelope)) => envelope,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping input line");
                continue;
            }
        };

        let key = envelope.session_key(default_session).to_string();
        if let Err(e) = sessions.dispatch(&key, envelope.event).await {
            tracing::warn!(session = %key, error = %e, "Event dropped");
        }
    }

    Ok(())
}

/// Write every command to stdout until all senders are gone
async fn write_commands(mut rx: mpsc::UnboundedReceiver<SessionCommand>) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();

    while let Some(command) = rx.recv().await {
        match encode_command(&command) {
            Ok(mut line) => {
                line.push('\n');
                stdout.write_all(line.as_bytes()).await?;
                stdout.flush().await?;
            }
            Err(e) => tracing::error!(
                session = %command.session,
                command = command.command.name(),
                error = %e,
                "Failed to encode command"
            ),
        }
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
