// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Haukka - Attack Surface Reconnaissance Engine
 * CLI for driving auto-scan sessions against a scope target
 *
 * (c) 2026 Bountyy Oy
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use haukka::config::{AppConfig, EngineConfig};
use haukka::consolidate::ConsolidationEngine;
use haukka::engine::AutoScanEngine;
use haukka::store::{EndpointStore, MemoryStore, PgStore, ScanStore, SessionStore};
use haukka::store::postgres::PgStoreConfig;
use haukka::tools::{HttpToolService, ToolService};
use haukka::types::{AutoScanConfig, ConsolidatedKind, ScopeTarget, TargetKind};

/// Haukka - Attack Surface Reconnaissance Engine
#[derive(Parser)]
#[command(name = "haukka")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version = "0.3.0")]
#[command(about = "Auto-scan orchestration for attack-surface reconnaissance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new auto-scan session and drive it to completion
    Run {
        /// Scope target id
        #[arg(long)]
        target_id: String,

        /// Wildcard domain of the target, e.g. "*.example.com"
        #[arg(long)]
        domain: String,

        /// Comma-separated stage toggles to disable, e.g. "cewl,gospider"
        #[arg(long)]
        skip: Option<String>,

        /// Stop the run early past this many consolidated subdomains
        #[arg(long, default_value = "2500")]
        max_subdomains: u64,

        /// Stop the run early past this many live web servers
        #[arg(long, default_value = "500")]
        max_live: u64,
    },

    /// Re-attach to an interrupted session and continue it
    Resume {
        #[arg(long)]
        target_id: String,

        #[arg(long)]
        domain: String,
    },

    /// Pause the active session after the in-flight stage finishes
    Pause {
        #[arg(long)]
        target_id: String,
    },

    /// Cancel the active session after the in-flight stage finishes
    Cancel {
        #[arg(long)]
        target_id: String,
    },

    /// Print the ranked endpoint report (recomputes ROI scores)
    Report {
        #[arg(long)]
        target_id: String,
    },

    /// Recompute one consolidated set and print it
    Consolidate {
        #[arg(long)]
        target_id: String,

        #[arg(long)]
        domain: String,

        /// One of: subdomains, company_domains, network_ranges
        #[arg(long, default_value = "subdomains")]
        kind: String,
    },

    /// Print attack-surface asset counts
    Surface {
        #[arg(long)]
        target_id: String,

        #[arg(long)]
        domain: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    println!("Haukka - Attack Surface Reconnaissance Engine");
    println!("v0.3.0 - (c) 2026 Bountyy Oy");
    println!();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("haukka-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

struct Stores {
    sessions: Arc<dyn SessionStore>,
    scans: Arc<dyn ScanStore>,
    endpoints: Arc<dyn EndpointStore>,
}

async fn connect_stores(config: &AppConfig) -> Result<Stores> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::new(PgStoreConfig {
                database_url: url.clone(),
                pool_size: config.pool_size,
            })
            .await
            .context("Failed to connect to PostgreSQL")?;
            store.init_schema().await?;
            let store = Arc::new(store);
            Ok(Stores {
                sessions: store.clone(),
                scans: store.clone(),
                endpoints: store,
            })
        }
        None => {
            warn!("DATABASE_URL not set - using in-memory store, runs will not survive a restart");
            let store = Arc::new(MemoryStore::new());
            Ok(Stores {
                sessions: store.clone(),
                scans: store.clone(),
                endpoints: store,
            })
        }
    }
}

fn wildcard_target(target_id: &str, domain: &str) -> ScopeTarget {
    ScopeTarget {
        id: target_id.to_string(),
        kind: TargetKind::Wildcard,
        value: domain.to_string(),
        active: true,
    }
}

fn scan_config(skip: Option<&str>, max_subdomains: u64, max_live: u64) -> AutoScanConfig {
    let mut config = AutoScanConfig {
        max_consolidated_subdomains: max_subdomains,
        max_live_web_servers: max_live,
        ..AutoScanConfig::default()
    };
    let Some(skip) = skip else {
        return config;
    };
    for toggle in skip.split(',').map(str::trim) {
        match toggle {
            "amass" => config.amass = false,
            "sublist3r" => config.sublist3r = false,
            "assetfinder" => config.assetfinder = false,
            "gau" => config.gau = false,
            "ctl" => config.ctl = false,
            "subfinder" => config.subfinder = false,
            "consolidate_httpx_round1" => config.consolidate_httpx_round1 = false,
            "shuffledns" => config.shuffledns = false,
            "cewl" => config.cewl = false,
            "consolidate_httpx_round2" => config.consolidate_httpx_round2 = false,
            "gospider" => config.gospider = false,
            "subdomainizer" => config.subdomainizer = false,
            "consolidate_httpx_round3" => config.consolidate_httpx_round3 = false,
            "nuclei_screenshot" => config.nuclei_screenshot = false,
            "metadata" => config.metadata = false,
            "" => {}
            other => warn!("Ignoring unknown stage toggle: {}", other),
        }
    }
    config
}

async fn async_main(cli: Cli) -> Result<()> {
    let app_config = AppConfig::from_env()?;
    let stores = connect_stores(&app_config).await?;

    let tools: Arc<dyn ToolService> = Arc::new(HttpToolService::new(
        &app_config.tool_service_url,
        Duration::from_secs(app_config.tool_timeout_secs),
    )?);

    let engine = AutoScanEngine::new(
        tools,
        stores.sessions.clone(),
        stores.scans.clone(),
        stores.endpoints.clone(),
        EngineConfig::default(),
    );

    match cli.command {
        Commands::Run {
            target_id,
            domain,
            skip,
            max_subdomains,
            max_live,
        } => {
            let target = wildcard_target(&target_id, &domain);
            let config = scan_config(skip.as_deref(), max_subdomains, max_live);
            let state = engine.start(&target, config).await?;
            info!("Session {} started", state.session_id);
            engine.run(state).await?;
        }
        Commands::Resume { target_id, domain } => {
            let target = wildcard_target(&target_id, &domain);
            match engine.attach(&target).await? {
                Some(state) => engine.run(state).await?,
                None => info!("No interrupted auto scan found for {}", target_id),
            }
        }
        Commands::Pause { target_id } => {
            engine.pause(&target_id).await?;
        }
        Commands::Cancel { target_id } => {
            engine.cancel(&target_id).await?;
        }
        Commands::Report { target_id } => {
            let report = engine.report(&target_id).await?;
            println!("{:>5}  {:>6}  URL", "ROI", "STATUS");
            for endpoint in report {
                println!(
                    "{:>5}  {:>6}  {}",
                    endpoint.roi_score,
                    endpoint
                        .status_code
                        .map(|code| code.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    endpoint.url
                );
            }
        }
        Commands::Consolidate {
            target_id,
            domain,
            kind,
        } => {
            let target = wildcard_target(&target_id, &domain);
            let kind = match kind.as_str() {
                "subdomains" => ConsolidatedKind::Subdomains,
                "company_domains" => ConsolidatedKind::CompanyDomains,
                "network_ranges" => ConsolidatedKind::NetworkRanges,
                other => anyhow::bail!("unknown consolidated set kind: {other}"),
            };
            let consolidator = ConsolidationEngine::new(stores.scans.clone());
            let set = consolidator.recompute(&target, kind).await?;
            println!("{} ({} items)", set.kind, set.count);
            for item in set.items {
                println!("{item}");
            }
        }
        Commands::Surface { target_id, domain } => {
            let target = wildcard_target(&target_id, &domain);
            let consolidator = ConsolidationEngine::new(stores.scans.clone());
            let counts = consolidator.consolidate_attack_surface(&target).await?;
            println!("ASNs:             {}", counts.asns);
            println!("Network ranges:   {}", counts.network_ranges);
            println!("IP addresses:     {}", counts.ip_addresses);
            println!("FQDNs:            {}", counts.fqdns);
            println!("Cloud assets:     {}", counts.cloud_assets);
            println!("Live web servers: {}", counts.live_web_servers);
        }
    }

    Ok(())
}
