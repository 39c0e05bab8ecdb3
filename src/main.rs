use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use stampede::config::ConfigLoader;
use stampede::driver::chrome::ChromeDriver;
use stampede::harness::HarnessEngine;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "stampede")]
#[command(version = "0.1.0")]
#[command(about = "Multi-target browser load-generation harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a load test from a config file
    Run {
        /// Path to the configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Override the configured run duration (seconds)
        #[arg(short, long)]
        duration: Option<u64>,

        /// Show a live progress line (stderr)
        #[arg(short, long, default_value_t = true)]
        progress: bool,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let multi = indicatif::MultiProgress::new();

    match cli.command {
        Commands::Run {
            config,
            duration,
            progress,
        } => {
            if progress {
                indicatif_log_bridge::LogWrapper::new(multi.clone(), logger).try_init()?;
            } else {
                log::set_boxed_logger(Box::new(logger))?;
                log::set_max_level(log::LevelFilter::Info);
            }

            log::info!("Loading config from {:?}", config);
            let mut config_data = ConfigLoader::load(&config)?;
            if let Some(secs) = duration {
                config_data.duration_secs = secs;
            }
            log::info!(
                "Loaded {} targets, running for {}s",
                config_data.targets.len(),
                config_data.duration_secs
            );

            let duration_secs = config_data.duration_secs;
            let engine = Arc::new(HarnessEngine::new(config_data));

            // ctrl-c maps to a cooperative shutdown request
            let engine_signal = Arc::clone(&engine);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Interrupt received, shutting down...");
                    engine_signal.shutdown();
                }
            });

            let mut progress_bar: Option<ProgressBar> = None;
            let mut _progress_task = None;
            if progress {
                let pb = multi.add(ProgressBar::new(duration_secs));
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}s {msg}",
                        )?
                        .progress_chars("#>-"),
                );

                let mut stats_rx = engine.watch_stats();
                let pb_clone = pb.clone();
                progress_bar = Some(pb);
                _progress_task = Some(tokio::spawn(async move {
                    while stats_rx.changed().await.is_ok() {
                        let snapshot = stats_rx.borrow().clone();
                        pb_clone.set_position(snapshot.elapsed_seconds as u64);
                        pb_clone.set_message(format!(
                            "Total: {} | Success: {:.1}% | RPS: {:.2}",
                            snapshot.total, snapshot.success_rate, snapshot.throughput_rps
                        ));
                    }
                }));
            }

            let report = engine.run(Arc::new(ChromeDriver::new())).await?;

            if let Some(task) = _progress_task {
                task.abort();
            }
            if let Some(pb) = progress_bar {
                pb.finish_and_clear();
            }

            println!("{report}");
        }
        Commands::Check { config } => match ConfigLoader::load(&config) {
            Ok(cfg) => {
                println!("✅ Config is valid:");
                println!("   Targets: {}", cfg.targets.len());
                for target in &cfg.targets {
                    println!(
                        "   - {} → {} (every {}s × {}, {} actions)",
                        target.name,
                        target.url,
                        target.interval_secs,
                        target.batch_count,
                        target.actions.len()
                    );
                }
                println!(
                    "   Pool: {} | Gate: {} | Duration: {}s",
                    cfg.pool_size, cfg.max_concurrency, cfg.duration_secs
                );
            }
            Err(e) => {
                eprintln!("❌ Config error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
