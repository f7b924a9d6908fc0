use anyhow::{Context, Result};
use callcoach::call_models::{CallOutcome, CreateCallRequest};
use callcoach::client::{ApiClient, DEFAULT_API_URL};
use callcoach::dashboard::{self, display_score, format_duration, LOADING_MESSAGE};
use callcoach::models::{parse_tag_field, Document, DocumentKind, Location, UpdateDocumentRequest};
use clap::{Parser, Subcommand, ValueEnum};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const SESSION_FILE: &str = ".session";

#[derive(Parser)]
#[command(name = "callcoach")]
#[command(about = "Sales-call coaching: documents and call dashboard", long_about = None)]
struct Cli {
    #[arg(long, global = true, default_value = DEFAULT_API_URL, help = "Base URL of the coaching API")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a new account")]
    Signup {
        #[arg(short, long, help = "Username")]
        username: String,

        #[arg(short, long, help = "Password")]
        password: String,
    },

    #[command(about = "Log in to your account")]
    Login {
        #[arg(short, long, help = "Username")]
        username: String,

        #[arg(short, long, help = "Password")]
        password: String,
    },

    #[command(about = "Log out of your account")]
    Logout,

    #[command(about = "Show current user")]
    Whoami,

    #[command(about = "Show call analytics and recent calls")]
    Dashboard,

    #[command(about = "Record a finished call")]
    LogCall {
        #[arg(short, long, help = "Call title")]
        title: String,

        #[arg(short, long, help = "Duration in seconds")]
        duration: u64,

        #[arg(short, long, value_enum, default_value = "pending", help = "Call outcome")]
        outcome: OutcomeArg,

        #[arg(short, long, help = "Score from 0 to 100")]
        score: Option<f64>,

        #[arg(short, long, help = "Contact name")]
        contact: Option<String>,

        #[arg(long, help = "AI suggestions were used during the call")]
        ai: bool,
    },

    #[command(subcommand, about = "Manage your documents")]
    Docs(DocsCommand),
}

#[derive(Subcommand)]
enum DocsCommand {
    #[command(about = "List your documents")]
    List,

    #[command(about = "Show one document")]
    Show {
        #[arg(help = "Document ID")]
        id: String,
    },

    #[command(about = "Upload a file")]
    Upload {
        #[arg(short, long, help = "Path to the file")]
        file: PathBuf,

        #[arg(short, long, help = "Display name (defaults to the file name)")]
        name: Option<String>,

        #[arg(short, long, help = "Tags (comma-separated)")]
        tags: Option<String>,
    },

    #[command(about = "Save a link as a document")]
    AddUrl {
        #[arg(short, long, help = "Display name")]
        name: String,

        #[arg(short, long, help = "URL to save")]
        url: String,

        #[arg(short, long, help = "Tags (comma-separated)")]
        tags: Option<String>,
    },

    #[command(about = "Rename a document or replace its tags")]
    Update {
        #[arg(help = "Document ID")]
        id: String,

        #[arg(short, long, help = "New name")]
        name: Option<String>,

        #[arg(short, long, help = "Replacement tags (comma-separated, empty to clear)")]
        tags: Option<String>,
    },

    #[command(about = "Delete a document")]
    Delete {
        #[arg(help = "Document ID")]
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutcomeArg {
    Success,
    Failed,
    Pending,
}

impl From<OutcomeArg> for CallOutcome {
    fn from(arg: OutcomeArg) -> Self {
        match arg {
            OutcomeArg::Success => CallOutcome::Success,
            OutcomeArg::Failed => CallOutcome::Failed,
            OutcomeArg::Pending => CallOutcome::Pending,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Session {
    token: String,
    user_id: String,
    username: String,
}

impl Session {
    fn save(&self) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(SESSION_FILE, json)?;
        Ok(())
    }

    fn load() -> Option<Self> {
        if Path::new(SESSION_FILE).exists() {
            let data = fs::read_to_string(SESSION_FILE).ok()?;
            serde_json::from_str(&data).ok()
        } else {
            None
        }
    }

    fn clear() -> Result<()> {
        if Path::new(SESSION_FILE).exists() {
            fs::remove_file(SESSION_FILE)?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run_command(ApiClient::new(cli.api_url), cli.command).await {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_command(client: ApiClient, command: Commands) -> Result<()> {
    match command {
        Commands::Signup { username, password } => {
            let user = client.signup(&username, &password).await?;
            println!("✅ Account created successfully!");
            println!("👤 Username: {}", user.username);
            println!("🆔 User ID: {}", user.id);
            println!("\n💡 You can now log in using: callcoach login -u {} -p <password>", user.username);
        }
        Commands::Login { username, password } => {
            let login = client.login(&username, &password).await?;
            Session {
                token: login.token,
                user_id: login.user.id,
                username: login.user.username.clone(),
            }
            .save()?;
            println!("✅ Login successful!");
            println!("👤 Welcome back, {}!", login.user.username);
        }
        Commands::Logout => {
            if let Some(session) = Session::load() {
                if let Err(e) = client.with_token(session.token).logout().await {
                    tracing::warn!(error = %format!("{e:#}"), "server-side logout failed");
                }
            }
            Session::clear()?;
            println!("✅ Logged out successfully!");
        }
        Commands::Whoami => match Session::load() {
            Some(session) => println!("👤 {} ({})", session.username, session.user_id),
            None => println!("Not logged in."),
        },
        Commands::Dashboard => {
            let client = logged_in(client)?;
            println!("{LOADING_MESSAGE}");
            let dashboard = dashboard::load(&client).await;
            dashboard::print(&dashboard);
        }
        Commands::LogCall {
            title,
            duration,
            outcome,
            score,
            contact,
            ai,
        } => {
            let client = logged_in(client)?;
            let call = client
                .log_call(&CreateCallRequest {
                    title: Some(title),
                    contact_name: contact,
                    duration,
                    outcome: outcome.into(),
                    score,
                    performance_data: None,
                    ai_suggestions_used: ai,
                })
                .await?;
            println!("✅ Call logged!");
            println!("   Title: {}", call.title);
            println!("   Duration: {}", format_duration(call.duration));
            let score = display_score(&call);
            println!("   Score: {} ({})", score, score.severity().label());
            println!("   ID: {}", call.id);
        }
        Commands::Docs(docs) => run_docs(logged_in(client)?, docs).await?,
    }

    Ok(())
}

async fn run_docs(client: ApiClient, command: DocsCommand) -> Result<()> {
    match command {
        DocsCommand::List => {
            let documents = client.list_documents().await?;
            if documents.is_empty() {
                println!("📭 No documents yet.");
                return Ok(());
            }
            println!("\n📚 Your Documents ({})\n", documents.len());
            documents_table(&documents).printstd();
            println!();
        }
        DocsCommand::Show { id } => {
            let document = client.get_document(&id).await?;
            print_document(&document);
        }
        DocsCommand::Upload { file, name, tags } => {
            let tags = tags.as_deref().map(parse_tag_field).unwrap_or_default();
            let document = client.upload_document(&file, name, &tags).await?;
            println!("✅ Document uploaded!");
            print_document(&document);
        }
        DocsCommand::AddUrl { name, url, tags } => {
            let tags = tags.as_deref().map(parse_tag_field).unwrap_or_default();
            let document = client.create_url_document(&name, &url, tags).await?;
            println!("✅ Link saved!");
            print_document(&document);
        }
        DocsCommand::Update { id, name, tags } => {
            if name.is_none() && tags.is_none() {
                anyhow::bail!("Nothing to update. Pass --name and/or --tags");
            }
            let update = UpdateDocumentRequest {
                name,
                tags: tags.as_deref().map(parse_tag_field),
            };
            let document = client.update_document(&id, &update).await?;
            println!("✅ Document updated!");
            print_document(&document);
        }
        DocsCommand::Delete { id } => {
            let deleted = client.delete_document(&id).await?;
            println!("🗑️  {} ({})", deleted.message, deleted.id);
        }
    }

    Ok(())
}

fn logged_in(client: ApiClient) -> Result<ApiClient> {
    let session = Session::load()
        .context("You must be logged in. Use: callcoach login -u <username> -p <password>")?;
    Ok(client.with_token(session.token))
}

fn kind_label(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Text => "text",
        DocumentKind::Pdf => "pdf",
        DocumentKind::Image => "image",
        DocumentKind::Doc => "doc",
        DocumentKind::Url => "url",
    }
}

fn documents_table(documents: &[Document]) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Name"),
        Cell::new("Type"),
        Cell::new("Tags"),
        Cell::new("Created"),
    ]));

    for document in documents {
        let tags = if document.tags.is_empty() {
            "-".to_string()
        } else {
            document.tags.join(", ")
        };
        table.add_row(Row::new(vec![
            Cell::new(&document.id),
            Cell::new(&document.name),
            Cell::new(kind_label(document.kind)),
            Cell::new(&tags),
            Cell::new(&document.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]));
    }
    table
}

fn print_document(document: &Document) {
    println!("   Name: {}", document.name);
    println!("   Type: {}", kind_label(document.kind));
    match &document.location {
        Location::File {
            file_size,
            mime_type,
            ..
        } => println!("   File: {} ({:.2} KB)", mime_type, *file_size as f64 / 1024.0),
        Location::Link { url } => println!("   URL: {}", url),
    }
    if !document.tags.is_empty() {
        println!("   Tags: {}", document.tags.join(", "));
    }
    println!("   Processed: {}", if document.processed { "yes" } else { "no" });
    println!("   ID: {}", document.id);
}
