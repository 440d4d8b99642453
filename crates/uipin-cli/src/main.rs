//! UIPin CLI - local control plane for pinned UI change requests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use uipin_bridge::{AppState, EventBus, TaskRunner};
use uipin_core::ProviderName;
use uipin_providers::create_provider_registry;
use uipin_proxy::{ProxyConfig, ProxyState};
use uipin_store::{
    ensure_config_file, resolve_config, ArtifactStore, ConfigOverrides, JsonlLogger, LogContext,
    PruneOptions,
};

/// UIPin - pin an element in the browser, describe the change, and hand it
/// to a coding agent running against your working tree.
#[derive(Parser)]
#[command(name = "uipin")]
#[command(about = "Local control plane for pinned UI change requests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge and reverse proxy in front of your dev server
    Dev {
        /// Provider adapter handling submissions (codex, claude)
        #[arg(long)]
        provider: Option<ProviderName>,

        /// Model passed to the provider CLI
        #[arg(long)]
        model: Option<String>,

        /// Port of the target application the proxy forwards to
        #[arg(long)]
        target: Option<u16>,

        /// Persist debug-level log events
        #[arg(long)]
        debug: bool,

        /// Port the bridge server listens on
        #[arg(long)]
        bridge_port: Option<u16>,

        /// Port the reverse proxy listens on
        #[arg(long)]
        proxy_port: Option<u16>,

        /// Path to a built overlay bundle served at /overlay.js
        #[arg(long)]
        overlay_bundle: Option<PathBuf>,
    },

    /// Write a .uipin/config.json with the resolved defaults
    Init,

    /// List stored tasks
    Tasks {
        /// Remove stale logs and orphaned sessions first
        #[arg(long)]
        prune: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("uipin=info".parse()?))
        .init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Dev {
            provider,
            model,
            target,
            debug,
            bridge_port,
            proxy_port,
            overlay_bundle,
        } => {
            let overrides = ConfigOverrides {
                provider,
                model,
                target,
                debug: debug.then_some(true),
                bridge_port,
                proxy_port,
            };
            dev(cwd, overrides, overlay_bundle).await?;
        }
        Commands::Init => {
            let config = ensure_config_file(&cwd).await?;
            println!(".uipin/config.json ready:");
            println!("  provider:    {}", config.provider);
            println!("  model:       {}", config.model);
            println!("  target:      {}", config.target);
            println!("  bridgePort:  {}", config.bridge_port);
            println!("  proxyPort:   {}", config.proxy_port);
        }
        Commands::Tasks { prune } => {
            tasks(cwd, prune).await?;
        }
    }

    Ok(())
}

async fn dev(
    cwd: PathBuf,
    overrides: ConfigOverrides,
    overlay_bundle: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&cwd, &overrides).await;

    let store = Arc::new(ArtifactStore::new(&cwd));
    store.ensure_structure().await?;
    store.ensure_gitignore_entry().await?;

    let logger = JsonlLogger::new(store.logs_dir(), "bridge", config.debug);
    let proxy_logger = JsonlLogger::new(store.logs_dir(), "proxy", config.debug);

    let registry = Arc::new(create_provider_registry());
    let bus = EventBus::new();
    let runner = Arc::new(TaskRunner::new(
        &cwd,
        store.clone(),
        logger.clone(),
        bus.clone(),
        registry,
    ));

    let overlay_script_path = overlay_bundle.or_else(|| {
        std::env::var_os("UIPIN_OVERLAY_BUNDLE").map(PathBuf::from)
    });

    let bridge_state = Arc::new(AppState {
        store,
        logger: logger.clone(),
        bus,
        runner,
        overlay_script_path,
    });

    let proxy_state = Arc::new(ProxyState::new(
        ProxyConfig {
            target_port: config.target,
            proxy_port: config.proxy_port,
            bridge_port: config.bridge_port,
            provider: config.provider,
            model: config.model.clone(),
        },
        proxy_logger,
    ));

    if !target_reachable(config.target).await {
        warn!(port = config.target, "target app is not responding yet");
        logger.warn(
            &format!("Target app on port {} is not responding yet", config.target),
            LogContext::event("cli.target.unreachable"),
        );
    }

    println!("UIPin dev");
    println!("  provider:  {} ({})", config.provider, config.model);
    println!("  bridge:    http://localhost:{}", config.bridge_port);
    println!(
        "  proxy:     http://localhost:{} -> http://localhost:{}",
        config.proxy_port, config.target
    );

    let bridge_port = config.bridge_port;
    let bridge = tokio::spawn(async move { uipin_bridge::serve(bridge_state, bridge_port).await });
    let proxy = tokio::spawn(async move { uipin_proxy::serve(proxy_state).await });

    tokio::select! {
        result = bridge => result??,
        result = proxy => result??,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    Ok(())
}

async fn target_reachable(port: u16) -> bool {
    tokio::time::timeout(
        Duration::from_secs(1),
        tokio::net::TcpStream::connect(("127.0.0.1", port)),
    )
    .await
    .is_ok_and(|result| result.is_ok())
}

async fn tasks(cwd: PathBuf, prune: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = ArtifactStore::new(&cwd);

    if prune {
        let result = store.prune(PruneOptions::default()).await?;
        println!(
            "Pruned {} log file(s), {} orphaned session(s)",
            result.removed_logs, result.removed_sessions
        );
    }

    let mut tasks = store.list_tasks().await?;
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    println!("Tasks ({}):", tasks.len());
    println!(
        "{:<20}  {:<10}  {:<8}  {:<20}  {}",
        "ID", "STATUS", "PROVIDER", "CREATED", "REQUEST"
    );
    println!("{}", "-".repeat(90));

    for task in tasks {
        let provider = task
            .provider
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let created = task.created_at.format("%Y-%m-%d %H:%M:%S");
        let request = truncate(task.comment.body.trim(), 40);
        println!(
            "{:<20}  {:<10}  {:<8}  {:<20}  {}",
            task.task_id.as_str(),
            task.status.to_string(),
            provider,
            created,
            request
        );
    }

    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("make it blue", 40), "make it blue");
    }

    #[test]
    fn test_truncate_cuts_long_text() {
        let long = "x".repeat(50);
        let short = truncate(&long, 10);
        assert_eq!(short.chars().count(), 10);
        assert!(short.ends_with("..."));
    }
}
