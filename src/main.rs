//! Deckhand - a command-line management layer around Ansible.
//!
//! This is the main entry point for the Deckhand CLI.

use std::fs::File;
use std::sync::Mutex;

use clap::CommandFactory;
use deckhand::cli::commands::CommandContext;
use deckhand::cli::{Cli, Commands};
use deckhand::config::Config;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // A broken configuration is fatal; nothing below can trust its settings
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.exit_code());
        }
    };

    // Initialize logging based on verbosity and configuration
    init_logging(cli.verbosity(), &config);

    // Create command context
    let ctx = CommandContext::new(&cli, config);

    // Execute the appropriate command
    let result = match &cli.command {
        Commands::Run(args) => args.execute(&ctx, cli.verbosity()).await,
        Commands::Lint(args) => args.execute(&ctx, cli.verbosity()).await,
        Commands::Report(args) => args.execute(&ctx).await,
        Commands::Facts(command) => command.execute(&ctx).await,
        Commands::Inventory(command) => command.execute(&ctx).await,
        Commands::Cron(command) => command.execute(&ctx).await,
        Commands::Completions(args) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(args.shell, &mut cmd, name, &mut std::io::stdout());
            Ok(0)
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            ctx.output.error(&err.to_string());
            std::process::exit(err.exit_code());
        }
    }
}

/// Initialize logging: a console layer driven by verbosity flags and a
/// file layer under `<projects_dir>/logs/` driven by the configuration.
fn init_logging(verbosity: u8, config: &Config) {
    let console_level = match verbosity {
        0 => config.console_log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_env("DECKHAND_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(console_level));

    let console_layer = fmt::layer()
        .with_target(verbosity >= 3)
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let file_layer = open_log_file(config).map(|file| {
        let level = config
            .file_log_level
            .parse::<LevelFilter>()
            .unwrap_or(LevelFilter::INFO);
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_filter(level)
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

/// Open the log file in append mode, creating the log directory if needed.
/// Returns `None` when the directory or file cannot be created; the CLI
/// stays usable with console logging only.
fn open_log_file(config: &Config) -> Option<File> {
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir).ok()?;
    File::options()
        .create(true)
        .append(true)
        .open(log_dir.join("deckhand.log"))
        .ok()
}
