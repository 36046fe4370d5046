//! AuroraMind CLI - goals, knowledge-base chat and summaries from the terminal.

mod commands;

use std::io::{self, IsTerminal, Read, Write};

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use uuid::Uuid;

use auroramind_core::{ApiClient, Config, ConversationRequest, KnowledgeService, StreamEvent};
use commands::{Commands, handle_command};

/// AuroraMind CLI
#[derive(Parser)]
#[command(name = "aurora")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Override the backend base URL from config
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = Config::load().unwrap_or_default();

    if let Some(api_base) = args.api_base {
        config.api_base = api_base;
    }

    match args.command {
        Commands::Ask {
            question,
            doc,
            conversation,
        } => {
            let question = get_question(question).context("No question provided")?;
            ask(&config, question, doc, conversation).await
        }
        command => handle_command(command, &config).await,
    }
}

/// Stream an answer from the knowledge base to stdout.
async fn ask(
    config: &Config,
    question: String,
    documents: Vec<Uuid>,
    conversation: Option<String>,
) -> Result<()> {
    let knowledge = KnowledgeService::new(ApiClient::from_config(config));

    let mut request = ConversationRequest::new(question, config.top_k()).with_documents(documents);
    if let Some(id) = conversation {
        request = request.with_conversation(id);
    }

    let mut events = knowledge
        .conversation_stream(&request)
        .await
        .context("Failed to start conversation")?;

    let mut stdout = io::stdout();
    let mut conversation_id = request.conversation_id.clone();

    loop {
        tokio::select! {
            event = events.next() => {
                match event {
                    Some(Ok(StreamEvent::Delta(text))) => {
                        print!("{text}");
                        stdout.flush().context("Failed to flush stdout")?;
                    }
                    Some(Ok(StreamEvent::Meta(id))) => {
                        conversation_id = Some(id);
                    }
                    Some(Ok(StreamEvent::Context(context))) => {
                        tracing::debug!(keys = context.len(), "cli: context received");
                    }
                    Some(Ok(StreamEvent::Error(message))) => {
                        eprintln!("\n[Server error] {message}");
                    }
                    Some(Ok(StreamEvent::Done)) | None => {
                        println!();
                        break;
                    }
                    Some(Err(e)) => {
                        println!();
                        return Err(e).context("Conversation stream failed");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n[Interrupted]");
                break;
            }
        }
    }

    if let Some(id) = conversation_id {
        eprintln!("conversation: {id}");
    }

    Ok(())
}

/// Retrieves the question from arguments or stdin.
///
/// Priority: positional argument > piped stdin > error (if TTY)
fn get_question(question: Option<String>) -> io::Result<String> {
    if let Some(question) = question {
        return Ok(question);
    }

    if io::stdin().is_terminal() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "No question provided",
        ));
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    let question = buffer.trim_end();
    if question.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "Empty question"));
    }
    Ok(question.to_string())
}
