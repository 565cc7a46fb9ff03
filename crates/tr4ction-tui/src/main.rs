use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use tr4ction_core::api::ApiClient;
use tr4ction_core::store::KeyValueStore;
use tr4ction_core::{Config, SessionContext, UserRole};

mod app;
mod cli;
mod handler;
mod logging;
mod tui;
mod ui;

use app::{App, Screen};
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "tr4ction")]
#[command(about = "Terminal client for the TR4CTION Agent", version)]
struct Cli {
    /// Backend base URL (overrides TR4CTION_BACKEND_URL and the config file)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent (founder session, default)
    Chat,
    /// Admin panel: upload decks, reload and inspect the knowledge base
    Admin,
    /// Log in and store the session
    Login {
        #[command(subcommand)]
        role: LoginCommand,
    },
    /// Clear the stored session
    Logout,
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
        /// Startup identifier (defaults to the saved one)
        #[arg(short, long)]
        startup: Option<String>,
        /// Trail step key, e.g. icp or persona
        #[arg(long)]
        step: Option<String>,
    },
    /// Show knowledge base statistics
    Stats,
    /// Upload PPTX decks into the knowledge base (admin)
    Upload {
        /// Step the decks belong to
        #[arg(long, default_value = "diagnostico")]
        step: String,
        /// .pptx files
        files: Vec<PathBuf>,
    },
    /// Re-index the knowledge base (admin)
    Reload,
    /// Check that the backend answers
    Ping,
    /// Show or change the saved configuration
    Config {
        /// Save this backend URL to the config file
        #[arg(long)]
        set_backend_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum LoginCommand {
    /// Founder login with startup and founder names
    Founder {
        #[arg(long)]
        startup: String,
        #[arg(long)]
        founder: String,
    },
    /// Admin login; the password is prompted
    Admin {
        #[arg(long)]
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);

    let config = Config::load()?;
    let backend_url = config.resolve_backend_url(cli.backend_url.as_deref());
    let client = ApiClient::new(&backend_url).with_production(config.is_production(&backend_url));

    let screen = match command {
        Commands::Chat => Some(Screen::Chat),
        Commands::Admin => Some(Screen::Admin),
        _ => None,
    };
    if let Some(screen) = screen {
        return run_interactive(screen, &client).await;
    }

    logging::init_stderr();
    let mut ctx = SessionContext::load(KeyValueStore::open_default()?);

    let result = match command {
        Commands::Login { role } => match role {
            LoginCommand::Founder { startup, founder } => {
                cli::login_founder(&client, &mut ctx, &startup, &founder).await
            }
            LoginCommand::Admin { username } => cli::login_admin(&client, &mut ctx, &username).await,
        },
        Commands::Logout => cli::logout(&mut ctx),
        Commands::Ask { question, startup, step } => {
            cli::ask(&client, &ctx, &question, startup, step).await
        }
        Commands::Stats => {
            if ctx.require(UserRole::Founder).is_some() {
                cli::founder_stats(&client, &ctx).await
            } else {
                cli::stats(&client, &mut ctx).await
            }
        }
        Commands::Upload { step, files } => cli::upload(&client, &mut ctx, &step, &files).await,
        Commands::Reload => cli::reload(&client, &mut ctx).await,
        Commands::Ping => cli::ping(&client).await,
        Commands::Config { set_backend_url } => {
            if let Some(url) = set_backend_url {
                Config::save_backend_url(&url)?;
                println!("{} {}", "✓ Backend saved:".green(), url.bold());
                let config = Config::load()?;
                let backend_url = config.resolve_backend_url(cli.backend_url.as_deref());
                cli::show_config(&config, &backend_url)
            } else {
                cli::show_config(&config, &backend_url)
            }
        }
        Commands::Chat | Commands::Admin => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run_interactive(screen: Screen, client: &ApiClient) -> Result<()> {
    let ctx = SessionContext::load(KeyValueStore::open_default()?);
    let mut app = App::new(screen, ctx, client);

    // Screens are gated on an exact role match
    let role = app.required_role();
    if app.ctx.require(role).is_none() {
        cli::redirect_to_login(role);
        return Ok(());
    }

    let _guard = logging::init_file()?;
    tracing::info!(backend = %client.base_url(), ?screen, "starting interactive session");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    app.load_initial();

    let result = run_loop(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;
    result?;

    if app.logged_out {
        println!("{}", "Session closed. Log in again to continue.".yellow());
        cli::redirect_to_login(role);
    }
    Ok(())
}

async fn run_loop(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(app, frame))?;

        if app.should_quit {
            break;
        }

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }

        app.poll_tasks().await;
    }
    Ok(())
}
