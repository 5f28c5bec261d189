#[path = "daemon/config.rs"]
mod config;

use config::DaemonConfig;
use dc_engine::application::{HostComponents, HostController};
use dc_engine::domain::ports::InstallationManager;
use dc_engine::domain::{
    DomainError, ExitDisposition, ProcessStateMachine, ReloadHostCommand, ShutdownHostCommand,
};
use dc_engine::infrastructure::{
    load_servers_from_dir, AdmissionController, Config, DaemonActionPerformer,
    FileInstallationManager, InMemoryServerRepository, LoopbackTransport, ReloadRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

enum Signal {
    Reload,
    Shutdown,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = DaemonConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    config.validate()?;

    let host_config = match &config.host_config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    info!(
        host = %host_config.name,
        reload_capable = host_config.reload_capable,
        servers_dir = ?config.servers_dir,
        "Starting host daemon"
    );

    let host = Arc::new(ProcessStateMachine::new(
        host_config.name.clone(),
        host_config.reload_capable,
    ));
    let (performer, reload_requests) = DaemonActionPerformer::new();
    let performer = Arc::new(performer);
    let shutdown_requested = performer.shutdown_token();

    let installation = host_config.installation.as_ref().map(|installation| {
        Arc::new(FileInstallationManager::new(&installation.dir)) as Arc<dyn InstallationManager>
    });

    let controller = Arc::new(HostController::new(HostComponents {
        host: host.clone(),
        suspend: Arc::new(AdmissionController::new()),
        performer: performer.clone(),
        repository: Arc::new(InMemoryServerRepository::new()),
        installation,
        installation_lock_timeout: host_config
            .installation
            .as_ref()
            .map(|installation| installation.lock_timeout()),
    }));

    if let Some(dir) = &config.servers_dir {
        sync_servers(&controller, dir).await?;
    }

    tokio::spawn(handle_reloads(
        controller.clone(),
        config.servers_dir.clone(),
        reload_requests,
    ));

    host.set_running();
    info!(host = %host_config.name, "Host running");

    loop {
        tokio::select! {
            signal = next_signal() => match signal? {
                Signal::Reload => {
                    let command = ReloadHostCommand {
                        suspend_timeout_sec: config.suspend_timeout_sec,
                        ..ReloadHostCommand::default()
                    };
                    let response = controller.reload(command).await?;
                    info!(outcome = ?response.outcome, "Reload finished");
                }
                Signal::Shutdown => break,
            },
            _ = shutdown_requested.cancelled() => break,
        }
    }

    if performer.disposition().is_none() {
        let command =
            ShutdownHostCommand::shutdown().with_suspend_timeout(config.suspend_timeout_sec);
        let response = controller.shutdown(command).await?;
        info!(outcome = ?response.outcome, "Shutdown finished");
    }

    let disposition = performer.disposition().unwrap_or(ExitDisposition::Normal);
    info!(
        disposition = %disposition,
        exit_code = disposition.exit_code(),
        "Host daemon exiting"
    );
    std::process::exit(disposition.exit_code());
}

/// Register and connect servers found in the servers directory
///
/// Servers that are already registered are left untouched.
async fn sync_servers(controller: &HostController, dir: &str) -> Result<usize, String> {
    let mut added = 0;
    for (name, server_config) in load_servers_from_dir(dir)? {
        if controller.server(&name).await.is_ok() {
            continue;
        }

        let server = controller
            .register_server(&name, server_config.reload_capable)
            .await
            .map_err(|e| e.to_string())?;
        added += 1;

        if server_config.auto_start {
            let transport = LoopbackTransport::new(server.mirror().clone())
                .with_latency(Duration::from_millis(server_config.latency_ms));
            controller
                .connect_server(&name, Arc::new(transport))
                .await
                .map_err(|e| e.to_string())?;
            server.mirror().set_running();
        }
    }

    info!(added, "Server configuration loaded");
    Ok(added)
}

async fn handle_reloads(
    controller: Arc<HostController>,
    servers_dir: Option<String>,
    mut requests: mpsc::UnboundedReceiver<ReloadRequest>,
) {
    while let Some(request) = requests.recv().await {
        let result = match (&servers_dir, request.options.use_current_config) {
            (Some(dir), false) => sync_servers(&controller, dir)
                .await
                .map(|_| ())
                .map_err(DomainError::ReloadFailed),
            _ => Ok(()),
        };

        if let Err(e) = &result {
            error!(error = %e, "Reload failed");
        }
        if request.reply.send(result).is_err() {
            warn!("Reload requester went away");
        }
    }
}

#[cfg(unix)]
async fn next_signal() -> std::io::Result<Signal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT, initiating graceful shutdown");
            Ok(Signal::Shutdown)
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, initiating graceful shutdown");
            Ok(Signal::Shutdown)
        }
        _ = sighup.recv() => {
            info!("Received SIGHUP, reloading");
            Ok(Signal::Reload)
        }
    }
}

#[cfg(not(unix))]
async fn next_signal() -> std::io::Result<Signal> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, initiating graceful shutdown");
    Ok(Signal::Shutdown)
}
