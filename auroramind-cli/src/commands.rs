//! Subcommands for the AuroraMind CLI.
//!
//! Defines the [`Commands`] tree parsed by `clap` and the
//! [`handle_command`] dispatcher for account, goal, document and summary
//! operations. `ask` streams and is driven from `main`.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::Subcommand;
use uuid::Uuid;

use auroramind_core::{
    ApiClient, AuthService, Config, GoalService, KnowledgeService, StaticCredentials,
    SummaryKind, SummaryService, TokenFile,
};

/// Top-level subcommands for the `aurora` binary.
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Log in and store the access token
    Login {
        username: String,
        /// Password (read from stdin if not provided)
        #[arg(long)]
        password: Option<String>,
    },
    /// Remove the stored access token
    Logout,
    /// Ask the knowledge base a question (reads from stdin if not provided)
    Ask {
        question: Option<String>,
        /// Restrict retrieval to this document (repeatable)
        #[arg(long)]
        doc: Vec<Uuid>,
        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<String>,
    },
    /// Goal commands
    Goals {
        #[command(subcommand)]
        action: GoalAction,
    },
    /// Knowledge-base document commands
    Docs {
        #[command(subcommand)]
        action: DocAction,
    },
    /// Weekly and monthly summaries
    Summaries {
        #[command(subcommand)]
        action: SummaryAction,
    },
}

/// Goal actions.
#[derive(Subcommand)]
pub(crate) enum GoalAction {
    /// List goals with their progress
    List,
    /// Create a goal
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Delete a goal
    Delete { id: Uuid },
    /// Break a goal down into steps with AI
    Breakdown {
        id: Uuid,
        text: String,
        /// Model to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,
    },
}

/// Document actions.
#[derive(Subcommand)]
pub(crate) enum DocAction {
    /// List uploaded documents
    List {
        /// Only documents attached to this goal
        #[arg(long, conflicts_with = "unassigned")]
        goal: Option<Uuid>,
        /// Only documents not attached to any goal
        #[arg(long)]
        unassigned: bool,
    },
    /// Upload a file to the knowledge base
    Upload {
        path: PathBuf,
        /// Attach the document to this goal
        #[arg(long)]
        goal: Option<Uuid>,
    },
}

/// Summary actions.
#[derive(Subcommand)]
pub(crate) enum SummaryAction {
    /// List weekly summaries
    Weekly,
    /// List monthly summaries
    Monthly,
    /// Generate a summary whose period starts and ends on a date
    Generate {
        kind: SummaryKind,
        /// Period start and end date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

/// Handle every subcommand except `ask`.
pub(crate) async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password().context("Failed to read password")?,
            };
            let client = ApiClient::new(&config.api_base, Arc::new(StaticCredentials::anonymous()));
            let token = AuthService::new(client)
                .login(&username, &password)
                .await
                .context("Login failed")?;

            let file = TokenFile::default_location().context("Failed to locate token file")?;
            file.save(&token.access_token)
                .await
                .context("Failed to save token")?;
            println!("Logged in as {username}. Token saved to {}.", file.path().display());
        }
        Commands::Logout => {
            let file = TokenFile::default_location().context("Failed to locate token file")?;
            file.clear().await.context("Failed to remove token")?;
            println!("Logged out.");
        }
        Commands::Ask { .. } => bail!("ask is handled by the streaming loop"),
        Commands::Goals { action } => handle_goals(action, config).await?,
        Commands::Docs { action } => handle_docs(action, config).await?,
        Commands::Summaries { action } => handle_summaries(action, config).await?,
    }

    Ok(())
}

async fn handle_goals(action: GoalAction, config: &Config) -> Result<()> {
    let goals = GoalService::new(authenticated_client(config));

    match action {
        GoalAction::List => {
            let views = goals.list_goals().await.context("Failed to list goals")?;

            if views.is_empty() {
                println!("No goals found.");
                return Ok(());
            }

            println!("{:<36}  {:<8}  {:<6}  TITLE", "ID", "PROGRESS", "PHASES");
            println!("{:-<90}", "");

            for view in views {
                println!(
                    "{:<36}  {:<8}  {:<6}  {}",
                    view.id,
                    format!("{}%", view.progress),
                    view.phases.len(),
                    truncate(&view.title, 40)
                );
            }
        }
        GoalAction::Create { name, description } => {
            let view = goals
                .create_goal(&name, &description)
                .await
                .context("Failed to create goal")?;
            println!("Goal {} created.", view.id);
        }
        GoalAction::Delete { id } => {
            goals.delete_goal(id).await.context("Failed to delete goal")?;
            println!("Goal {id} deleted.");
        }
        GoalAction::Breakdown { id, text, model } => {
            let model = model.unwrap_or_else(|| config.breakdown_model());
            let items = goals
                .breakdown(id, &text, &model)
                .await
                .context("Failed to break down goal")?;

            if items.is_empty() {
                println!("No steps suggested.");
                return Ok(());
            }
            for item in items {
                println!("{:>3}. {}", item.order, item.text);
            }
        }
    }

    Ok(())
}

async fn handle_docs(action: DocAction, config: &Config) -> Result<()> {
    let knowledge = KnowledgeService::new(authenticated_client(config));

    match action {
        DocAction::List { goal, unassigned } => {
            let documents = match (goal, unassigned) {
                (Some(goal_id), _) => knowledge.list_documents_for_goal(goal_id).await,
                (None, true) => knowledge.list_unassigned_documents().await,
                (None, false) => knowledge.list_documents().await,
            }
            .context("Failed to list documents")?;

            if documents.is_empty() {
                println!("No documents found.");
                return Ok(());
            }

            println!("{:<36}  {:<10}  {:>8}  FILENAME", "ID", "STATUS", "CHUNKS");
            println!("{:-<90}", "");

            for doc in documents {
                println!(
                    "{:<36}  {:<10}  {:>8}  {}",
                    doc.id,
                    truncate(&doc.status, 10),
                    doc.chunk_count,
                    truncate(&doc.original_filename, 40)
                );
            }
        }
        DocAction::Upload { path, goal } => {
            let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
                bail!("Not a file path: {}", path.display());
            };
            let contents = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let doc = knowledge
                .upload_document(filename, contents, goal)
                .await
                .context("Failed to upload document")?;
            println!("Document {} uploaded ({}).", doc.id, doc.status);
        }
    }

    Ok(())
}

async fn handle_summaries(action: SummaryAction, config: &Config) -> Result<()> {
    let summaries = SummaryService::new(authenticated_client(config));

    let list = match action {
        SummaryAction::Weekly => summaries.weekly().await,
        SummaryAction::Monthly => summaries.monthly().await,
        SummaryAction::Generate { kind, date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let summary = summaries
                .generate(kind, date)
                .await
                .context("Failed to generate summary")?;
            println!("{} {} ({})", summary.summary_type, summary.period_label, summary.status);
            if let Some(content) = summary.content {
                println!();
                println!("{content}");
            }
            return Ok(());
        }
    }
    .context("Failed to list summaries")?;

    if list.is_empty() {
        println!("No summaries found.");
        return Ok(());
    }

    for summary in list {
        let preview = summary.content.as_deref().unwrap_or("-").replace('\n', " ");
        println!(
            "{:<10}  {} - {}  {:<10}  {}",
            summary.period_label,
            summary.period_start,
            summary.period_end,
            summary.status,
            truncate(&preview, 50)
        );
    }

    Ok(())
}

fn authenticated_client(config: &Config) -> ApiClient {
    ApiClient::from_config(config)
}

fn read_password() -> io::Result<String> {
    if io::stdin().is_terminal() {
        eprint!("Password: ");
    }
    let mut buffer = String::new();
    if io::stdin().is_terminal() {
        io::stdin().read_line(&mut buffer)?;
    } else {
        io::stdin().read_to_string(&mut buffer)?;
    }
    Ok(buffer.trim_end_matches(['\r', '\n']).to_string())
}

/// Truncate a string to at most `max_chars` characters, adding "..." if
/// truncated.
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars <= 3 {
        ".".repeat(max_chars)
    } else {
        let kept: String = s.chars().take(max_chars - 3).collect();
        format!("{kept}...")
    }
}
