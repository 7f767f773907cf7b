//! Folio CLI: the main entry point.
//!
//! Commands:
//! - `init`    Write a default config file
//! - `chat`    Interactive or single-message chat
//! - `seed`    Load the demo authors, records, and FAQ passages
//! - `faq`     Manage the FAQ index (index, search, delete, count, clear)
//! - `status`  Show configuration and component health

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "folio",
    about = "Folio: a conversational assistant for authors",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file to ~/.folio/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Who is asking; omit to chat anonymously
        #[arg(short, long, env = "FOLIO_USER")]
        user: Option<String>,

        /// Print the tools the assistant called and what they returned
        #[arg(long)]
        verbose_trace: bool,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load demo authors, book and award records, and FAQ passages
    Seed {
        /// Only load records; skip FAQ passages (no embedding calls)
        #[arg(long)]
        skip_faqs: bool,
    },

    /// Manage the FAQ index
    Faq {
        #[command(subcommand)]
        action: FaqAction,
    },

    /// Show configuration and component health
    Status,
}

#[derive(Subcommand)]
enum FaqAction {
    /// Add or replace a passage
    Index {
        /// Passage text
        text: String,

        /// Passage id (generated when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Topic tag stored with the passage
        #[arg(long)]
        topic: Option<String>,
    },

    /// Run a thresholded similarity search
    Search {
        query: String,

        #[arg(long)]
        top_k: Option<usize>,

        #[arg(long)]
        min_similarity: Option<f32>,
    },

    /// Remove a passage by id
    Delete { id: String },

    /// Number of passages in the FAQ partition
    Count,

    /// Remove every passage in the FAQ partition (before re-indexing with a
    /// new embedding model)
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    match cli.command {
        Commands::Init { force } => commands::init::run(force).await?,
        Commands::Chat {
            message,
            user,
            verbose_trace,
            json,
        } => {
            let options = commands::chat::ChatOptions {
                user,
                verbose_trace,
                json,
            };
            commands::chat::run(message, options).await?
        }
        Commands::Seed { skip_faqs } => commands::seed::run(skip_faqs).await?,
        Commands::Faq { action } => match action {
            FaqAction::Index { text, id, topic } => commands::faq::index(&text, id, topic).await?,
            FaqAction::Search {
                query,
                top_k,
                min_similarity,
            } => commands::faq::search(&query, top_k, min_similarity).await?,
            FaqAction::Delete { id } => commands::faq::delete(&id).await?,
            FaqAction::Count => commands::faq::count().await?,
            FaqAction::Clear => commands::faq::clear().await?,
        },
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
