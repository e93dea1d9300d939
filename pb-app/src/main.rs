//! PromptBoost command-line binary.

mod commands;
mod config;
mod enhance;
mod output;
mod validation;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Parser)]
#[command(
    name = "promptboost",
    version,
    about = "CLI tool that enhances prompts using AI providers",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    enhance: EnhanceArgs,

    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file location (default: ~/.promptboost/config.toml).
    #[arg(long, global = true, env = "PROMPTBOOST_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct EnhanceArgs {
    /// The prompt to enhance.
    pub prompt: Option<String>,
    /// Provider to use instead of the configured default.
    #[arg(short, long)]
    pub provider: Option<String>,
    /// Read the prompt from a file.
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Also write the enhanced prompt to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
    /// Print the enhanced prompt as it arrives.
    #[arg(short, long)]
    pub stream: bool,
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,
    #[arg(long)]
    pub max_tokens: Option<u32>,
    #[arg(long)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Plain,
    Markdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    #[value(alias = "sm")]
    Small,
    #[value(alias = "md")]
    Medium,
    #[value(alias = "lg")]
    Large,
}

impl From<FormatArg> for pb_llm::OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Plain => Self::Plain,
            FormatArg::Markdown => Self::Markdown,
        }
    }
}

impl From<ModeArg> for pb_llm::Mode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Small => Self::Small,
            ModeArg::Medium => Self::Medium,
            ModeArg::Large => Self::Large,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Test provider connectivity.
    Test {
        /// Test only this provider.
        #[arg(short, long)]
        provider: Option<String>,
    },
    /// List available providers.
    Providers,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show the current configuration.
    Show,
    /// Print the config file location.
    Path,
    /// Restore defaults.
    Reset,
    /// Update a provider or the default provider.
    Set(SetArgs),
    /// Clear a provider's key and disable it.
    Remove {
        #[arg(short, long)]
        provider: String,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct SetArgs {
    #[arg(short, long)]
    pub provider: Option<String>,
    #[arg(short, long)]
    pub key: Option<String>,
    #[arg(short, long)]
    pub model: Option<String>,
    #[arg(long)]
    pub base_url: Option<String>,
    /// Make this provider the default.
    #[arg(long = "default", value_name = "PROVIDER")]
    pub default_provider: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    install_panic_hook();

    let path = cli.config;
    match cli.command {
        None => enhance::run(cli.enhance, path).await,
        Some(Command::Config { action }) => commands::config(action, path).await,
        Some(Command::Test { provider }) => commands::test(provider, path).await,
        Some(Command::Providers) => {
            commands::providers();
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(v) => v,
        Err(_) if verbose => EnvFilter::new("warn,pb_app=debug,pb_llm=debug"),
        Err(_) => EnvFilter::new("warn"),
    };
    let log_format = std::env::var("PROMPTBOOST_LOG_FORMAT")
        .unwrap_or_else(|_| "compact".to_string())
        .to_ascii_lowercase();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match log_format.as_str() {
        "json" => {
            builder
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                .with_file(true)
                .with_line_number(true)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true)
                .init();
        }
        "pretty" => {
            builder
                .with_span_events(FmtSpan::CLOSE)
                .with_file(true)
                .with_line_number(true)
                .pretty()
                .init();
        }
        "compact" => {
            builder.compact().init();
        }
        other => {
            return Err(anyhow::anyhow!(
                "unsupported PROMPTBOOST_LOG_FORMAT={other:?}; expected one of: json, pretty, compact"
            ));
        }
    }

    tracing::debug!(log_format = %log_format, verbose, "tracing initialized");
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::error!(panic_location = %location, panic_payload = %payload, "panic captured");
        default_hook(panic_info);
    }));
}
