// Relink - Remote Link Monitor
// Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use relink::app::App;
use relink::config::Config;
use relink::events::{spawn_input_handler, spawn_ticker, AppEvent};
use relink::server::{self, ServeOptions};
use relink::services::{
    reconnect_report, reconnect_view, status_report, Capabilities, Registry, ServiceId,
};
use relink::version::build_info;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "relink")]
#[command(author, about, long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show version information
    #[arg(short = 'V', long)]
    version: bool,

    /// Show detailed build information
    #[arg(long)]
    build_info: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the web dashboard and JSON API (default)
    Serve {
        /// Port to bind; 0 lets the OS pick
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not open the dashboard in a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Interactive terminal dashboard
    Tui,

    /// Check every service once and print the result as JSON
    Status,

    /// Reconnect a service (barrier, ssh_tunnel, smb) or `all`
    Reconnect {
        /// Service id or `all`
        service: String,
    },
}

/// Where log output goes
enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
}

fn init_logging(debug: bool, target: LogTarget<'_>) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    match target {
        LogTarget::Stderr => {
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::File(path) => {
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::sync::Mutex::new(log_file))
                .with_ansi(false) // Disable ANSI colors in log file
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Handle version flag
    if cli.version {
        println!("{}", build_info().format_detailed());
        return Ok(ExitCode::SUCCESS);
    }

    // Handle build info flag
    if cli.build_info {
        println!("{}", build_info().format_display());
        println!("\n{}", build_info().format_build_info());
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::resolve(cli.config.clone())?;
    let command = cli.command.unwrap_or(Command::Serve {
        port: None,
        no_browser: false,
    });

    match command {
        Command::Serve { port, no_browser } => {
            init_logging(cli.debug, LogTarget::Stderr)?;

            let mut options = ServeOptions::from_config(&config);
            if let Some(port) = port {
                options.port = port;
            }
            if no_browser {
                options.open_browser = false;
            }

            let caps = Capabilities::system(&config);
            let registry = Arc::new(Registry::from_config(&config, &caps));
            server::serve(&config, registry, caps.processes.clone(), options).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Tui => {
            let log_path = config
                .log_file
                .clone()
                .unwrap_or_else(|| std::env::temp_dir().join("relink.log"));
            init_logging(cli.debug, LogTarget::File(&log_path))?;
            tracing::info!("Relink starting, logging to {}", log_path.display());

            run_tui(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            init_logging(cli.debug, LogTarget::Stderr)?;

            let registry = Registry::system(&config);
            let report = status_report(registry.status_all().await, |id| registry.is_busy(id));
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Reconnect { service } => {
            // Reject unknown ids before touching anything
            let target = if service.eq_ignore_ascii_case("all") {
                None
            } else {
                Some(service.parse::<ServiceId>()?)
            };

            init_logging(cli.debug, LogTarget::Stderr)?;
            let registry = Registry::system(&config);

            let ok = match target {
                Some(id) => {
                    let result = registry.reconnect(id).await?;
                    println!("{}", serde_json::to_string_pretty(&reconnect_view(&result))?);
                    result.is_success()
                }
                None => {
                    let results = registry.reconnect_all().await;
                    println!("{}", serde_json::to_string_pretty(&reconnect_report(&results))?);
                    results.values().all(|r| r.is_success())
                }
            };

            Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

async fn run_tui(config: &Config) -> Result<()> {
    let registry = Arc::new(Registry::system(config));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create event channel
    let (tx, mut rx) = mpsc::channel::<AppEvent>(100);

    spawn_input_handler(tx.clone());
    spawn_ticker(tx.clone(), config.refresh_interval());

    let mut app = App::new(registry, config.remote_host.clone(), tx.clone());
    app.request_refresh();

    // Main event loop
    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|f| app.render(f)) {
            break Err(e.into());
        }

        match rx.recv().await {
            Some(event) => {
                app.handle_event(event);
                if app.should_quit {
                    break Ok(());
                }
            }
            None => break Ok(()),
        }
    };

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    println!("Relink exited. Goodbye!");

    result
}
