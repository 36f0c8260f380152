use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cosint::auth::KeyringCredentials;
use cosint::client::ApiClient;
use cosint::config::Settings;
use cosint::events::EventBus;
use tracing::Level;

mod commands;
mod prompt;
mod session;

use commands::chat::ChatOptions;
use commands::{auth, bills, chat, conversations, dashboard, notes};

#[derive(Parser)]
#[command(author, version, about = "Congressional research assistant", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend URL, overriding the config file and COSINT_API__HOST
    #[arg(long, global = true)]
    host: Option<String>,

    /// Config file to use instead of ~/.config/cosint/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chat with the research assistant
    Chat {
        /// Resume a conversation by id
        #[arg(short, long, conflicts_with = "member")]
        conversation: Option<String>,

        /// Open the briefing conversation for a member (Bioguide id)
        #[arg(short, long)]
        member: Option<String>,

        /// Member name used when the briefing conversation is created
        #[arg(long, requires = "member")]
        name: Option<String>,

        /// Extra context sent with every message
        #[arg(long)]
        context: Option<String>,

        /// Send one message, print the reply and exit
        #[arg(short = 'M', long)]
        message: Option<String>,
    },

    /// Manage the access token
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// List and manage conversations
    #[command(alias = "c")]
    Conversations {
        #[command(subcommand)]
        command: ConversationCommand,
    },

    /// Research notes saved for a member
    Notes {
        #[command(subcommand)]
        command: NoteCommand,
    },

    /// Tracked bills
    Bills {
        #[command(subcommand)]
        command: BillCommand,
    },

    /// Save the sidebar order, e.g. `bill:118-hr-815 conversation:<id>`
    Order {
        #[arg(required = true)]
        entries: Vec<String>,
    },

    /// Show a member dashboard
    Member { bioguide_id: String },

    /// Show a bill dashboard
    Bill {
        congress: u32,
        bill_type: String,
        bill_number: String,
    },
}

#[derive(Subcommand)]
enum AuthCommand {
    /// Store an access token in the system keyring
    Login {
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove the stored access token
    Logout,
    /// Show whether a token is available
    Status,
}

#[derive(Subcommand)]
enum ConversationCommand {
    List,
    New,
    Show { id: String },
    Rename { id: String, title: String },
    Delete {
        id: String,
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum NoteCommand {
    List {
        bioguide_id: String,
    },
    Add {
        bioguide_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum BillCommand {
    List,
    Track {
        congress: u32,
        bill_type: String,
        bill_number: String,
        #[arg(long)]
        title: String,
    },
    Rename {
        bill_id: String,
        title: String,
    },
    Untrack {
        bill_id: String,
    },
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(Some(path.as_path()))
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Settings::new().context("Failed to load configuration")?,
    };
    if let Some(host) = &cli.host {
        settings.api.host = host.clone();
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let settings = load_settings(&cli)?;
    let strategy = settings.auth.strategy;

    let command = match cli.command {
        Command::Auth {
            command: AuthCommand::Login { token },
        } => return auth::handle_login(strategy, token),
        Command::Auth {
            command: AuthCommand::Logout,
        } => return auth::handle_logout(strategy),
        command => command,
    };

    let credentials = Arc::new(KeyringCredentials::system(strategy)?);
    let events = EventBus::new();
    let client = Arc::new(ApiClient::new(&settings.api, credentials)?.with_events(events.clone()));

    match command {
        Command::Chat {
            conversation,
            member,
            name,
            context,
            message,
        } => {
            chat::handle_chat(
                client,
                events,
                ChatOptions {
                    conversation,
                    member,
                    name,
                    context,
                    message,
                },
            )
            .await
        }
        Command::Auth { .. } => auth::handle_status(&client).await,
        Command::Conversations { command } => match command {
            ConversationCommand::List => conversations::handle_list(&client).await,
            ConversationCommand::New => conversations::handle_new(&client).await,
            ConversationCommand::Show { id } => conversations::handle_show(&client, &id).await,
            ConversationCommand::Rename { id, title } => {
                conversations::handle_rename(&client, &id, &title).await
            }
            ConversationCommand::Delete { id, yes } => {
                conversations::handle_delete(&client, &id, yes).await
            }
        },
        Command::Notes { command } => match command {
            NoteCommand::List { bioguide_id } => notes::handle_list(&client, &bioguide_id).await,
            NoteCommand::Add {
                bioguide_id,
                title,
                content,
            } => notes::handle_add(&client, &bioguide_id, title, content).await,
            NoteCommand::Edit { id, title, content } => {
                notes::handle_edit(&client, &id, title, content).await
            }
            NoteCommand::Delete { id } => notes::handle_delete(&client, &id).await,
        },
        Command::Bills { command } => match command {
            BillCommand::List => bills::handle_list(&client).await,
            BillCommand::Track {
                congress,
                bill_type,
                bill_number,
                title,
            } => bills::handle_track(&client, congress, &bill_type, &bill_number, &title).await,
            BillCommand::Rename { bill_id, title } => {
                bills::handle_rename(&client, &bill_id, &title).await
            }
            BillCommand::Untrack { bill_id } => bills::handle_untrack(&client, &bill_id).await,
        },
        Command::Order { entries } => bills::handle_reorder(&client, &entries).await,
        Command::Member { bioguide_id } => dashboard::handle_member(&client, &bioguide_id).await,
        Command::Bill {
            congress,
            bill_type,
            bill_number,
        } => dashboard::handle_bill(&client, congress, &bill_type, &bill_number).await,
    }
}
