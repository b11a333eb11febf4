//! Audio Studio CLI entry point

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use audio_studio::application::ports::SettingsStore;
use audio_studio::cli::{
    app::{load_merged_config, run_session, EXIT_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    presenter::Presenter,
};
use audio_studio::domain::config::AppConfig;
use audio_studio::infrastructure::logging::{default_logs_dir, init_logging};
use audio_studio::infrastructure::XdgSettingsStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let presenter = Presenter::new();
    let store = XdgSettingsStore::new();

    // Handle subcommands
    if let Some(Commands::Config { action }) = cli.command {
        if let Err(e) = handle_config_command(action, &store, &presenter).await {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
        return ExitCode::SUCCESS;
    }

    let cli_config = cli.to_config();
    let config = match load_merged_config(&store, cli_config.clone()).await {
        Ok(config) => config,
        Err(e) => {
            presenter.warn(&format!(
                "Ignoring {}: {}",
                store.path().display(),
                e
            ));
            AppConfig::defaults().merge(cli_config)
        }
    };

    // Keep the guard alive until exit so buffered log lines are flushed
    let _log_guard = match init_logging(&default_logs_dir(), config.log_level_or_default()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            presenter.warn(&format!("File logging disabled: {}", e));
            None
        }
    };

    run_session(config, Arc::new(store)).await
}
