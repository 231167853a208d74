//! VoiceCapture CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use voice_capture::application::CallSite;
use voice_capture::cli::{
    app::{load_merged_config, run_convert, run_recorder, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    presenter::Presenter,
    OutputOptions,
};
use voice_capture::domain::config::AppConfig;
use voice_capture::domain::recording::Duration;
use voice_capture::infrastructure::XdgConfigStore;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Reject a malformed duration flag before anything touches the microphone
fn check_duration(flag: &str, value: Option<&String>) -> Result<(), String> {
    match value {
        Some(v) => v
            .parse::<Duration>()
            .map(|_| ())
            .map_err(|e| format!("Invalid {}: {}", flag, e)),
        None => Ok(()),
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let presenter = Presenter::new();

    // Build CLI config from args
    let mut cli_config = AppConfig {
        output_dir: cli
            .output
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
        preview: if cli.preview { Some(true) } else { None },
        ..Default::default()
    };

    let call_site = match cli.command {
        Commands::Config { action } => {
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            return ExitCode::SUCCESS;
        }
        Commands::Convert(args) => {
            let config = load_merged_config(cli_config).await;
            let output = output_options(&config, cli.json);
            return run_convert(args, config, output).await;
        }
        Commands::Enroll { min_duration } => {
            if let Err(e) = check_duration("min-duration", min_duration.as_ref()) {
                presenter.error(&e);
                return ExitCode::from(EXIT_USAGE_ERROR);
            }
            cli_config.enroll_min_duration = min_duration;
            CallSite::Enrollment
        }
        Commands::Verify { max_duration } => {
            if let Err(e) = check_duration("max-duration", max_duration.as_ref()) {
                presenter.error(&e);
                return ExitCode::from(EXIT_USAGE_ERROR);
            }
            cli_config.verify_max_duration = max_duration;
            CallSite::Verification
        }
        Commands::Talk { max_duration } => {
            if let Err(e) = check_duration("max-duration", max_duration.as_ref()) {
                presenter.error(&e);
                return ExitCode::from(EXIT_USAGE_ERROR);
            }
            cli_config.chat_max_duration = max_duration;
            CallSite::VoiceChat
        }
    };

    let config = load_merged_config(cli_config).await;
    let output = output_options(&config, cli.json);
    run_recorder(call_site, config, output).await
}

fn output_options(config: &AppConfig, json: bool) -> OutputOptions {
    OutputOptions {
        output_dir: config.output_dir_or_default(),
        preview: config.preview_or_default(),
        json,
    }
}
