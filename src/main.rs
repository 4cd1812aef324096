// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Krishi main entry point - CLI over the provider gateways.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;

use krishi::config::{self, CliOptions, Credentials};
use krishi::failover::HealthStatus;
use krishi::services::Services;
use krishi::telemetry::{init_telemetry, TelemetryConfig};
use krishi::types::AttemptRecord;
use krishi::VERSION;

/// Krishi - resilient provider access for agricultural advice.
#[derive(Parser)]
#[command(name = "krishi")]
#[command(author, version, about = "Weather, LLM and embedding access with failover", long_about = None)]
struct Cli {
    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Base backoff delay between failover attempts
    #[arg(long, env = "KRISHI_BACKOFF_BASE_MS", global = true)]
    backoff_base_ms: Option<u64>,

    /// Weather health probe timeout
    #[arg(long, env = "KRISHI_PROBE_TIMEOUT_MS", global = true)]
    probe_timeout_ms: Option<u64>,

    /// SQLite cache file
    #[arg(long, env = "KRISHI_CACHE_PATH", global = true)]
    cache_path: Option<PathBuf>,

    /// Keep the cache in memory only
    #[arg(long, global = true)]
    no_durable_cache: bool,

    /// Print collected provider and cache metrics to stderr on exit
    #[cfg(feature = "telemetry")]
    #[arg(long, global = true)]
    metrics: bool,

    /// Disable a provider for this run (repeatable)
    #[arg(long = "disable", value_name = "PROVIDER", global = true)]
    disable: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for krishi.
#[derive(Subcommand)]
enum Commands {
    /// Ask the language models a question
    Ask {
        prompt: String,
        /// System prompt override
        #[arg(short, long)]
        system: Option<String>,
    },

    /// Current weather and crop advisory for a location
    Weather { location: String },

    /// Embed one or more texts
    Embed {
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// List registered providers in priority order
    Providers,

    /// Show provider health
    Health {
        /// Send a live request to every configured provider
        #[arg(long)]
        live: bool,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Inspect or maintain the result caches
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show version information
    Version,
}

/// Config subcommand actions.
#[derive(Subcommand)]
enum ConfigAction {
    /// Show the merged configuration
    Show,
    /// Write an example .krishi.json in the current directory
    Init,
}

/// Cache subcommand actions.
#[derive(Subcommand)]
enum CacheAction {
    /// Entry counts and hit rates
    Stats,
    /// Drop expired entries
    Prune,
    /// Drop every entry
    Clear,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderRow {
    name: String,
    capability: String,
    priority: u32,
    available: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::for_verbosity(cli.verbose);
    if cli.json {
        telemetry = telemetry.with_ansi(false);
    }
    let _guard = init_telemetry(&telemetry)?;

    let workspace_root = std::env::current_dir()?;
    let cli_options = CliOptions {
        backoff_base_ms: cli.backoff_base_ms,
        probe_timeout_ms: cli.probe_timeout_ms,
        cache_path: cli.cache_path.clone(),
        no_durable_cache: cli.no_durable_cache.then_some(true),
        disable: cli.disable.clone(),
        system_prompt: None,
    };

    match &cli.command {
        Commands::Version => {
            println!("krishi {}", VERSION);
            return Ok(());
        }
        Commands::Config { action } => {
            match action {
                Some(ConfigAction::Show) | None => {
                    let config = config::load_config(&workspace_root, cli_options.clone())?;
                    println!("{}", serde_json::to_string_pretty(&config)?);
                }
                Some(ConfigAction::Init) => {
                    let path = config::init_config(&workspace_root, None)?;
                    println!("Created config file: {}", path.display());
                }
            }
            return Ok(());
        }
        _ => {}
    }

    let config = config::load_config(&workspace_root, cli_options)?;
    let services = Services::from_config(&config, &Credentials::from_env())?;

    match cli.command {
        Commands::Ask { prompt, system } => {
            match services.generation.generate(&prompt, system.as_deref()).await {
                Ok(generation) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&generation)?);
                    } else {
                        println!("{}", generation.text);
                        eprintln!(
                            "{}",
                            format!(
                                "via {} ({} attempt{})",
                                generation.provider_name,
                                generation.attempts,
                                if generation.attempts == 1 { "" } else { "s" }
                            )
                            .dimmed()
                        );
                    }
                }
                Err(e) => return report_failure(cli.json, &e),
            }
        }
        Commands::Weather { location } => match services.weather.get_weather_detailed(&location).await {
            Ok(lookup) => {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&lookup)?);
                } else {
                    let r = &lookup.reading;
                    println!("{}", r.location.bright_white().bold());
                    println!("  {} {:.1}°C, humidity {:.0}%", r.condition, r.temperature, r.humidity);
                    println!("  rain {:.1} mm, wind {:.1} km/h", r.rainfall_mm, r.wind_kmh);
                    println!("  {}", r.forecast_text);
                    println!("  {}", r.advisory_text.green());
                    let origin = if lookup.cached { " (cached)" } else { "" };
                    println!("{}", format!("source: {}{}", r.source, origin).dimmed());
                    print_attempts(&lookup.attempts);
                }
            }
            Err(e) => return report_failure(cli.json, &e),
        },
        Commands::Embed { texts } => match services.embedding.embed(&texts).await {
            Ok(embeddings) => {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&embeddings)?);
                } else {
                    println!(
                        "{} vectors from {} ({} cached)",
                        embeddings.vectors.len(),
                        embeddings.model.bright_white(),
                        embeddings.cache_hits
                    );
                    for (text, vector) in texts.iter().zip(&embeddings.vectors) {
                        println!("  [{}] {}", vector.dimensions, text);
                    }
                    if let Some(provider) = &embeddings.provider_name {
                        println!("{}", format!("provider: {}", provider).dimmed());
                    }
                }
            }
            Err(e) => return report_failure(cli.json, &e),
        },
        Commands::Providers => {
            let rows: Vec<ProviderRow> = krishi::types::Capability::ALL
                .iter()
                .flat_map(|cap| services.registry.all(*cap))
                .map(|p| ProviderRow {
                    name: p.name().to_string(),
                    capability: p.capability().to_string(),
                    priority: p.priority(),
                    available: p.is_available(),
                })
                .collect();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in rows {
                    let mark = if row.available { "✓".green() } else { "✗".red() };
                    println!(
                        "{} {:<10} {:<2} {}",
                        mark,
                        row.capability.cyan(),
                        row.priority,
                        row.name
                    );
                }
            }
        }
        Commands::Health { live } => {
            let mut statuses: Vec<HealthStatus> = Vec::new();
            for capability in krishi::types::Capability::ALL {
                for provider in services.registry.all(capability) {
                    if live {
                        statuses.push(services.health.diagnose(&provider).await);
                    } else {
                        services.health.check(&provider).await;
                    }
                }
            }
            if !live {
                statuses = services.health.statuses();
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else {
                for status in statuses {
                    let mark = if status.healthy { "healthy".green() } else { "unhealthy".red() };
                    let kind = if status.live { "live" } else { "credentials" };
                    print!("{:<20} {:<10} {} ({})", status.provider, status.capability.to_string().cyan(), mark, kind);
                    match status.detail {
                        Some(detail) => println!(" - {}", detail.dimmed()),
                        None => println!(),
                    }
                }
            }
        }
        Commands::Cache { action } => {
            let weather = services.weather.cache();
            let embeddings = services.embedding.cache();
            match action {
                CacheAction::Stats => {
                    let stats = vec![weather.stats(), embeddings.stats()];
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&stats)?);
                    } else {
                        for s in stats {
                            let durable = s
                                .durable_entries
                                .map(|n| n.to_string())
                                .unwrap_or_else(|| "-".to_string());
                            println!(
                                "{:<10} memory {}/{}  durable {}  ttl {}s",
                                s.namespace.bright_white(),
                                s.memory_entries,
                                s.capacity,
                                durable,
                                s.ttl_ms / 1000
                            );
                        }
                    }
                }
                CacheAction::Prune => {
                    let removed = weather.prune() + embeddings.prune();
                    if cli.json {
                        println!("{}", serde_json::json!({ "removed": removed }));
                    } else {
                        println!("Removed {} expired entries", removed);
                    }
                }
                CacheAction::Clear => {
                    weather.clear();
                    embeddings.clear();
                    if cli.json {
                        println!("{}", serde_json::json!({ "cleared": true }));
                    } else {
                        println!("Cache cleared");
                    }
                }
            }
        }
        Commands::Config { .. } | Commands::Version => {}
    }

    #[cfg(feature = "telemetry")]
    if cli.metrics {
        eprintln!("{}", krishi::telemetry::GLOBAL_METRICS.snapshot().format_report());
    }

    Ok(())
}

fn print_attempts(attempts: &[AttemptRecord]) {
    for attempt in attempts.iter().filter(|a| !a.succeeded()) {
        eprintln!(
            "{}",
            format!(
                "  skipped {}: {}",
                attempt.provider_name,
                attempt.error_message.as_deref().unwrap_or("no detail")
            )
            .dimmed()
        );
    }
}

fn report_failure(json: bool, error: &krishi::GatewayError) -> anyhow::Result<()> {
    if json {
        let response = serde_json::json!({
            "success": false,
            "error": error.to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        eprintln!("{}", error.to_string().red());
    }
    std::process::exit(1);
}
