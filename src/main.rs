use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use promanis::cli;

#[derive(Parser)]
#[command(name = "promanis", version)]
#[command(about = "Refine rough prompts into clear, structured ones with a rotating pool of API keys", long_about = None)]
struct Cli {
    /// Path to config file (defaults to ./promanis.toml or ~/.config/promanis/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory holding the keys and state files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refine a prompt and print the result
    Refine {
        /// Prompt text (reads --file or stdin when omitted)
        prompt: Option<String>,

        /// Read the prompt from a file
        #[arg(short, long, conflicts_with = "prompt")]
        file: Option<PathBuf>,

        /// Extra background for the refinement
        #[arg(short, long)]
        context: Option<String>,

        /// Read the extra background from a file
        #[arg(long, conflicts_with = "context")]
        context_file: Option<PathBuf>,

        /// Target language (English, Bahasa Indonesia)
        #[arg(short, long, default_value = "English")]
        language: String,

        /// Domain scope (e.g. General, Programming, Marketing)
        #[arg(short, long, default_value = "General")]
        scope: String,

        /// Output type (text, image, audio, video, video+audio, Novel, Explanation, Other)
        #[arg(short = 't', long = "type", default_value = "Text Generation")]
        output_type: String,

        /// Detail level (Simple, Detailed, Complex, Template)
        #[arg(short, long, default_value = "Detailed")]
        detail: String,

        /// Render bullets and emphasis for the terminal
        #[arg(long)]
        decorate: bool,

        /// Use mock LLM client for testing
        #[arg(long)]
        dry_run: bool,

        /// Override LLM model (e.g., "gemini-2.0-flash", "gpt-4o-mini")
        #[arg(long)]
        model: Option<String>,

        /// Override max attempts per request (default: from config)
        #[arg(long)]
        max_attempts: Option<u32>,
    },

    /// Manage the API key pool
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Manage AI platform shortcuts
    Platforms {
        #[command(subcommand)]
        action: PlatformsAction,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum KeysAction {
    /// Show the key pool and the next key in rotation
    Status,
    /// Restart rotation from the first key
    Reset,
    /// Replace the keys file (use - for stdin)
    Set { source: String },
    /// Send a test request with each of the first keys
    Test {
        /// Use mock LLM client for testing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum PlatformsAction {
    /// List platform shortcuts
    List,
    /// Add or replace a shortcut
    Set { name: String, url: String },
    /// Remove a shortcut
    Remove { name: String },
    /// Restore the built-in shortcuts
    Reset,
    /// Open a platform in the browser
    Open { name: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate config, keys and state files
    Check,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "promanis=debug" } else { "promanis=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Cli {
        config,
        data_dir,
        command,
        ..
    } = cli;

    match command {
        Commands::Refine {
            prompt,
            file,
            context,
            context_file,
            language,
            scope,
            output_type,
            detail,
            decorate,
            dry_run,
            model,
            max_attempts,
        } => {
            let settings = cli::load_settings(config, data_dir)?;
            cli::refine::run(
                settings,
                prompt,
                file,
                context,
                context_file,
                language,
                scope,
                output_type,
                detail,
                decorate,
                dry_run,
                model,
                max_attempts,
            )
            .await?;
        }
        Commands::Keys { action } => {
            let settings = cli::load_settings(config, data_dir)?;
            match action {
                KeysAction::Status => cli::keys::status(&settings)?,
                KeysAction::Reset => cli::keys::reset(&settings)?,
                KeysAction::Set { source } => cli::keys::set(&settings, &source)?,
                KeysAction::Test { dry_run } => cli::keys::probe(&settings, dry_run).await?,
            }
        }
        Commands::Platforms { action } => {
            let settings = cli::load_settings(config, data_dir)?;
            match action {
                PlatformsAction::List => cli::platforms::list(&settings)?,
                PlatformsAction::Set { name, url } => cli::platforms::set(&settings, &name, &url)?,
                PlatformsAction::Remove { name } => cli::platforms::remove(&settings, &name)?,
                PlatformsAction::Reset => cli::platforms::reset(&settings)?,
                PlatformsAction::Open { name } => cli::platforms::open(&settings, &name)?,
            }
        }
        Commands::Config {
            action: ConfigAction::Check,
        } => {
            cli::config_check::run(config, data_dir)?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "promanis",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}
