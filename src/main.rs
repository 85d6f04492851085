use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

use ticket_chat::api::{ApiClient, ChatRequest};
use ticket_chat::app::App;
use ticket_chat::config::Config;
use ticket_chat::markup::Markup;
use ticket_chat::tickets::{self, TicketPanel};
use ticket_chat::{handler, tui, ui};

#[derive(Parser, Debug)]
#[command(name = "ticket-chat", version)]
#[command(about = "Chat with the ticketing assistant and watch your tickets")]
struct Cli {
    /// Backend base URL (overrides config and TICKET_CHAT_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// User id sent with every chat message
    #[arg(long, global = true)]
    user_id: Option<String>,
    /// Organisation sent with every chat message
    #[arg(long, global = true)]
    org: Option<String>,
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one message and print the reply
    Send {
        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Print the current ticket list
    Tickets,
    /// Show the effective settings
    Config {
        /// Write --base-url/--user-id/--org into the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        None => run_tui(&config).await,
        Some(Commands::Send { message }) => {
            init_tracing(LogTarget::Stderr)?;
            send_once(&config, &message.join(" ")).await
        }
        Some(Commands::Tickets) => {
            init_tracing(LogTarget::Stderr)?;
            print_tickets(&config).await
        }
        Some(Commands::Config { save }) => {
            init_tracing(LogTarget::Stderr)?;
            show_config(&cli, &config, *save)
        }
    }
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Config::get_config_path(),
    }
}

/// File, then environment, then command line.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_from(&config_path(cli)?)?;
    config.apply_env();
    apply_flags(cli, &mut config);
    Ok(config)
}

fn apply_flags(cli: &Cli, config: &mut Config) {
    if let Some(base_url) = &cli.base_url {
        config.base_url = Some(base_url.clone());
    }
    if let Some(user_id) = &cli.user_id {
        config.user_id = Some(user_id.clone());
    }
    if let Some(org) = &cli.org {
        config.org = Some(org.clone());
    }
}

fn show_config(cli: &Cli, config: &Config, save: bool) -> Result<()> {
    let path = config_path(cli)?;

    if save {
        // Only the file and the flags are persisted, never the environment
        let mut stored = Config::load_from(&path)?;
        apply_flags(cli, &mut stored);
        stored.save_to(&path)?;
        info!(path = %path.display(), "config saved");
        println!("{} {}", "Saved".green().bold(), path.display());
    }

    println!("{} {}", "Config file:".bold(), path.display());
    println!("  {} {}", "base_url:".dimmed(), config.base_url());
    println!("  {} {}", "user_id:".dimmed(), config.user_id());
    println!("  {} {}", "org:".dimmed(), config.org());
    println!("  {} {}ms", "refresh_delay:".dimmed(), config.refresh_delay().as_millis());
    match config.request_timeout() {
        Some(timeout) => println!("  {} {}s", "request_timeout:".dimmed(), timeout.as_secs()),
        None => println!("  {} none", "request_timeout:".dimmed()),
    }
    Ok(())
}

enum LogTarget {
    Stderr,
    File(PathBuf),
}

fn init_tracing(target: LogTarget) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false).with_level(true);

    match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
    }
    .map_err(|e| anyhow!("Failed to initialise logging: {}", e))
}

async fn run_tui(config: &Config) -> Result<()> {
    // The terminal owns stderr while the TUI runs, so logs go to a file
    init_tracing(LogTarget::File(Config::get_log_path()?))?;
    info!(base_url = %config.base_url(), "starting ticket-chat");

    let mut events = tui::EventHandler::new();
    let mut app = App::new(config, events.sender())?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    app.load_tickets();
    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!("ticket-chat stopped");
    result
}

async fn run_loop(terminal: &mut tui::Tui, app: &mut App, events: &mut tui::EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

async fn send_once(config: &Config, message: &str) -> Result<()> {
    let message = message.trim();
    if message.is_empty() {
        return Err(anyhow!("Message is empty"));
    }

    let client = ApiClient::from_config(config)?;
    let request = ChatRequest {
        message: message.to_string(),
        user_id: config.user_id().to_string(),
        org: config.org().to_string(),
    };

    debug!(base_url = %client.base_url(), "sending one-shot message");
    match client.chat(&request).await {
        Ok(reply) => {
            println!("{} {}", "You:".bold().cyan(), message);
            println!("{} {}", "Assistant:".bold().yellow(), styled_markup(&Markup::parse(&reply.response)));
            if let Some(ticket_id) = reply.ticket_id {
                println!("\n{} {}", "Ticket created:".bold().green(), ticket_id.bold());
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: {}", "Sorry, there was an error".red(), e);
            Err(e.into())
        }
    }
}

fn styled_markup(markup: &Markup) -> String {
    markup
        .lines()
        .iter()
        .map(|runs| {
            runs.iter()
                .map(|run| {
                    let mut text = run.text.normal();
                    if run.strong {
                        text = text.bold();
                    }
                    if run.emphasis {
                        text = text.italic();
                    }
                    text.to_string()
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn print_tickets(config: &Config) -> Result<()> {
    let client = ApiClient::from_config(config)?;
    let panel = TicketPanel::from_result(client.list_tickets().await);

    match panel {
        TicketPanel::Loading => {}
        TicketPanel::Empty => println!("{}", tickets::EMPTY_MESSAGE.dimmed()),
        TicketPanel::Failed(detail) => {
            eprintln!("{}: {}", "Error loading tickets".red(), detail);
            return Err(anyhow!("Error loading tickets: {}", detail));
        }
        TicketPanel::Loaded { tickets: list, total } => {
            println!("\n{}", format!("🎫 Tickets ({})", total).bold().blue());
            println!("{}", "=".repeat(40).dimmed());
            for ticket in &list {
                println!(
                    "\n{} {}",
                    ticket.id.bold().cyan(),
                    format!("[{}]", ticket.priority).bold().yellow()
                );
                println!("{}", ticket.summary);
                for field in tickets::card_fields(ticket) {
                    println!("  {} {}", format!("{}:", field.label).dimmed(), field.value);
                }
            }
        }
    }

    Ok(())
}
