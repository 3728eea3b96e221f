use clap::{Parser, Subcommand};
use cleandesk::app::{App, Outcome};
use cleandesk::commands::{parse_body, ShellCommand};
use cleandesk::config::Config;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "cleandesk")]
#[command(about = "Talk to the cleandesk back-office API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/cleandesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// API base URL, overrides config and CLEANDESK_API_URL
  #[arg(long)]
  base_url: Option<String>,

  #[command(subcommand)]
  command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
  /// Fetch an endpoint
  Get {
    endpoint: String,
    /// Cache lifetime in seconds for this response
    #[arg(long)]
    ttl: Option<u64>,
    /// Skip the cache entirely
    #[arg(long)]
    no_cache: bool,
  },
  /// Create a resource
  Post {
    endpoint: String,
    /// JSON request body
    #[arg(short, long)]
    data: Option<String>,
  },
  /// Replace a resource
  Put {
    endpoint: String,
    /// JSON request body
    #[arg(short, long)]
    data: Option<String>,
  },
  /// Delete a resource
  Delete { endpoint: String },
  /// Interactive shell sharing one cache across commands (default)
  Shell,
}

impl Cmd {
  fn into_command(self) -> Result<Option<ShellCommand>> {
    let command = match self {
      Cmd::Get {
        endpoint,
        ttl,
        no_cache,
      } => ShellCommand::Get {
        endpoint,
        cache: !no_cache,
        ttl_secs: ttl,
      },
      Cmd::Post { endpoint, data } => ShellCommand::Post {
        endpoint,
        body: parse_body(data.as_deref().unwrap_or(""))?,
      },
      Cmd::Put { endpoint, data } => ShellCommand::Put {
        endpoint,
        body: parse_body(data.as_deref().unwrap_or(""))?,
      },
      Cmd::Delete { endpoint } => ShellCommand::Delete { endpoint },
      Cmd::Shell => return Ok(None),
    };
    Ok(Some(command))
  }
}

/// Log to a file so stdout stays reserved for API output.
fn init_logging() -> Result<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("cleandesk");

  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::never(&log_dir, "cleandesk.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cleandesk=info")))
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false),
    )
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_logging()?;

  // Load configuration, command line base URL wins
  let config = Config::load(args.config.as_deref(), args.base_url)?;

  let app = App::new(&config)?;

  let command = match args.command {
    Some(cmd) => cmd.into_command()?,
    None => None,
  };

  match command {
    Some(command) => {
      let outcome = app.execute(command).await?;
      if outcome != Outcome::Quit {
        println!("{}", outcome.render()?);
      }
    }
    None => app.run_shell().await?,
  }

  Ok(())
}
