use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use study_rag::commands::{
    ask, delete_knowledge, feedback, ingest_file, list_knowledge, search, show_prompt,
};
use study_rag::config::{Config, get_config_dir, show_config};
use study_rag::prompt::ModelFlavor;

#[derive(Parser)]
#[command(name = "study-rag")]
#[command(about = "A personal knowledge base and study assistant with retrieval-augmented answers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Flavor {
    Gpt,
    Llama,
}

impl From<Flavor> for ModelFlavor {
    fn from(flavor: Flavor) -> Self {
        match flavor {
            Flavor::Gpt => Self::Gpt,
            Flavor::Llama => Self::Llama,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Chunk, embed and store a plain-text document
    Ingest {
        /// Path to the document
        path: PathBuf,
        /// Owner of the knowledge
        #[arg(long)]
        user: i64,
        /// Title for the stored records, defaults to the file name
        #[arg(long)]
        title: Option<String>,
        /// Source label, defaults to "manual"
        #[arg(long)]
        source: Option<String>,
    },
    /// List stored knowledge
    List {
        #[arg(long)]
        user: i64,
    },
    /// Delete a knowledge record
    Delete {
        /// Knowledge record ID
        id: i64,
        #[arg(long)]
        user: i64,
    },
    /// Rank stored knowledge against a query
    Search {
        query: String,
        #[arg(long)]
        user: i64,
        /// Number of results, defaults to the configured top_k
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Rate an answer; helpful answers are saved as knowledge
    Feedback {
        question: String,
        answer: String,
        #[arg(long)]
        user: i64,
        /// Mark the answer as not helpful
        #[arg(long)]
        negative: bool,
    },
    /// Print the prompt that would be sent for a message
    Prompt {
        message: String,
        /// Ask as a signed-in user; omitted means guest
        #[arg(long)]
        user: Option<i64>,
        #[arg(long, value_enum, default_value_t = Flavor::Gpt)]
        flavor: Flavor,
    },
    /// Ask the assistant a question
    Ask {
        message: String,
        /// Ask as a signed-in user; omitted means guest
        #[arg(long)]
        user: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(get_config_dir()?)?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config)?;
            } else {
                config.save()?;
                println!(
                    "Configuration written to {}",
                    config.config_file_path().display()
                );
            }
        }
        Commands::Ingest {
            path,
            user,
            title,
            source,
        } => {
            ingest_file(&config, user, &path, title.as_deref(), source.as_deref()).await?;
        }
        Commands::List { user } => {
            list_knowledge(&config, user).await?;
        }
        Commands::Delete { id, user } => {
            delete_knowledge(&config, user, id).await?;
        }
        Commands::Search { query, user, top_k } => {
            search(&config, user, &query, top_k).await?;
        }
        Commands::Feedback {
            question,
            answer,
            user,
            negative,
        } => {
            feedback(&config, user, &question, &answer, !negative).await?;
        }
        Commands::Prompt {
            message,
            user,
            flavor,
        } => {
            show_prompt(&config, user, &message, flavor.into()).await?;
        }
        Commands::Ask { message, user } => {
            ask(&config, user, &message).await?;
        }
    }

    Ok(())
}
