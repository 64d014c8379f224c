use anyhow::Result;
use bunny_cli::app::{App, AppConfig};
use bunny_cli::docs;
use bunny_cli::models::{CdnConfig, StorageConfig, UploadOptions, DEFAULT_ZONE_HOST};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "bunny-cli")]
#[command(about = "A CLI tool to interact with Bunny.net")]
#[command(
    long_about = "A CLI tool to perform tasks such as uploading files, purging cache, and more using Bunny.net APIs."
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload a folder concurrently
    #[command(
        long_about = "Upload all files in a folder concurrently using a worker pool with configurable concurrency and timeout and retry logic."
    )]
    UploadFolder {
        /// Path to the folder to upload
        #[arg(short, long)]
        folder: PathBuf,

        /// Number of concurrent workers
        #[arg(short, long, default_value_t = 10)]
        concurrency: usize,

        /// Timeout for each upload attempt (e.g. 500ms, 10s, 2m)
        #[arg(short, long, default_value = "10s", value_parser = parse_duration_arg)]
        timeout: Duration,

        /// Cancel all remaining uploads after the first failed file
        #[arg(
            short = 'F',
            long,
            default_value_t = true,
            num_args = 0..=1,
            default_missing_value = "true",
            action = ArgAction::Set
        )]
        fail_fast: bool,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Upload a single file
    #[command(long_about = "Upload a single file to a Bunny.net storage zone.")]
    UploadFile {
        /// Path to the file to upload
        #[arg(short, long)]
        file: PathBuf,

        /// Destination path inside the storage zone (defaults to the file name)
        #[arg(short, long)]
        dest: Option<String>,

        /// Timeout for each upload attempt (e.g. 500ms, 10s, 2m)
        #[arg(short, long, default_value = "10s", value_parser = parse_duration_arg)]
        timeout: Duration,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Purge the full pull zone cache
    #[command(long_about = "Purge the full cache for a specified pull zone in Bunny.net.")]
    PurgeCacheFull {
        /// ID of the pull zone to purge
        #[arg(short, long)]
        pull_zone: String,

        /// Account API key (defaults to env BUNNYCDN_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Purge cache for URLs listed in a file
    #[command(
        long_about = "Purge cache for specific URLs listed in a file for a Bunny.net pull zone."
    )]
    PurgeCacheUrl {
        /// Path to the file containing URLs to purge, one per line
        #[arg(short, long)]
        file: PathBuf,

        /// Account API key (defaults to env BUNNYCDN_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Generate CLI documentation
    #[command(long_about = "Generate documentation for the CLI tool in Markdown format.")]
    GenDocs {
        /// Directory to write the Markdown pages into
        #[arg(short, long, default_value = "./docs")]
        output: PathBuf,
    },
}

#[derive(Debug, Args)]
struct StorageArgs {
    /// Storage access key
    #[arg(short = 'a', long)]
    access_key: String,

    /// Storage zone name
    #[arg(short = 'z', long)]
    zone_name: String,

    /// Storage zone host
    #[arg(short = 'H', long, default_value = DEFAULT_ZONE_HOST)]
    zone_host: String,
}

impl From<StorageArgs> for StorageConfig {
    fn from(args: StorageArgs) -> Self {
        StorageConfig::new(args.access_key, args.zone_name).with_zone_host(args.zone_host)
    }
}

/// Parse durations such as `250ms`, `10s`, `2m` or `1h 30m`; a bare number means seconds.
fn parse_duration_arg(input: &str) -> std::result::Result<Duration, String> {
    let input = input.trim();
    let duration = match input.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(input)
            .map_err(|e| format!("Invalid duration '{}': {}", input, e))?,
    };
    if duration.is_zero() {
        return Err("Duration must be greater than zero".to_string());
    }
    Ok(duration)
}

async fn run(command: Commands) -> bunny_cli::Result<()> {
    match command {
        Commands::UploadFolder {
            folder,
            concurrency,
            timeout,
            fail_fast,
            storage,
        } => {
            info!(
                folder = %folder.display(),
                concurrency,
                timeout = ?timeout,
                fail_fast,
                "Uploading folder"
            );
            let app = App::new(AppConfig {
                storage: Some(storage.into()),
                cdn: None,
            })?;
            cancel_on_ctrl_c(&app);

            let options = UploadOptions::new(concurrency, timeout, fail_fast);
            let report = app.upload_folder(&folder, &options).await?;
            info!(
                files = report.files_uploaded,
                elapsed = ?report.elapsed,
                "Upload completed successfully"
            );
        }
        Commands::UploadFile {
            file,
            dest,
            timeout,
            storage,
        } => {
            let app = App::new(AppConfig {
                storage: Some(storage.into()),
                cdn: None,
            })?;
            cancel_on_ctrl_c(&app);

            let options = UploadOptions::new(1, timeout, true);
            app.upload_file(&file, dest.as_deref(), &options).await?;
            info!(file = %file.display(), "Upload completed successfully");
        }
        Commands::PurgeCacheFull { pull_zone, api_key } => {
            let app = App::new(AppConfig {
                storage: None,
                cdn: Some(CdnConfig::resolve(api_key)?),
            })?;
            app.purge_pull_zone(&pull_zone).await?;
            info!(pull_zone = %pull_zone, "Cache purged successfully");
        }
        Commands::PurgeCacheUrl { file, api_key } => {
            let app = App::new(AppConfig {
                storage: None,
                cdn: Some(CdnConfig::resolve(api_key)?),
            })?;
            let purged = app.purge_urls_from_file(&file).await?;
            info!(urls = purged, "Cache purged successfully");
        }
        Commands::GenDocs { output } => {
            info!(dir = %output.display(), "Generating documentation");
            let written = docs::generate_markdown_tree(&Cli::command(), &output)?;
            info!(
                pages = written.len(),
                dir = %output.display(),
                "Documentation generated"
            );
        }
    }
    Ok(())
}

fn cancel_on_ctrl_c(app: &App) {
    let shutdown = app.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, canceling uploads");
            shutdown.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "bunny_cli=debug"
    } else {
        "bunny_cli=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(cli.command).await {
        error!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
