use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jobwatch_app::cli::{Cli, Command};
use jobwatch_app::config::{AppConfig, DEFAULT_CONFIG_FILENAME};
use jobwatch_app::logging::{self, LogDestination};
use jobwatch_app::runner::{download_artifact, run_job};
use jobwatch_app::sink::RunOutcome;
use jobwatch_engine::{JobService, ReqwestJobService};
use jobwatch_logging::{watch_debug, watch_error, watch_info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = AppConfig::resolve_path(cli.global.config.as_deref());
    let loaded = match &config_path {
        Some(path) => AppConfig::from_file(path),
        None => Ok(AppConfig::default()),
    };
    let config = match loaded {
        Ok(mut config) => {
            config.apply_overrides(&cli.global);
            config
        }
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    logging::initialize(LogDestination::from_flag(config.log_to_file));
    match &config_path {
        Some(path) => watch_info!("Loaded config from {:?}", path),
        None => watch_debug!("No {} found, using defaults", DEFAULT_CONFIG_FILENAME),
    }

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            watch_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: AppConfig) -> Result<()> {
    let service: Arc<dyn JobService> = Arc::new(
        ReqwestJobService::new(config.service_settings()).context("configuring service client")?,
    );

    match command {
        Command::Run(args) => {
            let request = args.to_request()?;
            let interrupt = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    // Without a signal handler, only the job itself can end the run.
                    std::future::pending::<()>().await;
                }
            };
            let outcome = run_job(
                service.clone(),
                config.session_settings(),
                request,
                io::stdout(),
                interrupt,
            )
            .await?;

            match outcome {
                RunOutcome::Succeeded {
                    artifact_handle, ..
                } if !args.no_download => {
                    let path =
                        download_artifact(service.as_ref(), &config.output_dir, &artifact_handle)
                            .await?;
                    println!("Saved {}", path.display());
                    Ok(())
                }
                RunOutcome::Succeeded { .. } => Ok(()),
                RunOutcome::Failed { message } => anyhow::bail!("job failed: {message}"),
            }
        }
        Command::Download { handle } => {
            let path = download_artifact(service.as_ref(), &config.output_dir, &handle).await?;
            println!("Saved {}", path.display());
            Ok(())
        }
    }
}
