use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "hitl")]
#[command(version, about = "Ask a human: questions in the terminal, artifact reviews in the browser")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory that accepted/rejected files are written relative to
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// TOML file with review settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Do not try to open a browser; just log the preview URL
    #[arg(long, global = true)]
    pub no_open: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Preview a file and wait for an accept/reject decision
    Review {
        /// File whose content is reviewed
        file: PathBuf,

        /// Where to save the content if accepted (defaults to FILE)
        #[arg(short, long)]
        target: Option<String>,

        /// plain-text, markdown, html, json or component-source (inferred from FILE)
        #[arg(short, long)]
        kind: Option<String>,
    },
    /// Bundle a React component, preview it and wait for a decision
    Component {
        /// Component source; its default export is rendered
        file: PathBuf,

        /// Where to save the source if accepted
        #[arg(short, long)]
        target: String,
    },
    /// Ask a question in the terminal
    Ask {
        /// Question text
        #[arg(short, long)]
        question: String,

        /// Answer options (repeat for several); none means free text
        #[arg(short, long = "option")]
        options: Vec<String>,

        /// Allow picking several options
        #[arg(long)]
        multi: bool,

        /// Key for the answer in the JSON output
        #[arg(long, default_value = "answer")]
        id: String,

        /// Return "use your judgement" as null instead of asking again
        #[arg(long)]
        allow_defer: bool,
    },
    /// View configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration as TOML
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    hitl::logging::init(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let mut config = hitl::config::ReviewConfig::load_or_default(cli.config.as_deref())?;
    if cli.no_open {
        config.open_browser = false;
    }

    match &cli.command {
        Commands::Review { file, target, kind } => {
            cmd::cmd_review(&project_dir, config, file, target.clone(), kind.clone()).await?;
        }
        Commands::Component { file, target } => {
            cmd::cmd_component(&project_dir, config, file, target).await?;
        }
        Commands::Ask {
            question,
            options,
            multi,
            id,
            allow_defer,
        } => {
            cmd::cmd_ask(id, question, options, *multi, *allow_defer).await?;
        }
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
