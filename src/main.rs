//! `media-sorter` command-line entry point.

use anyhow::{Context, Result};
use bridge_desktop::{
    CascadeFaceDetector, ReqwestHttpClient, TokioFileSystem, DEFAULT_SCORE_THRESHOLD,
};
use bridge_traits::log::LogLevel;
use clap::{Args, Parser, Subcommand};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::{config, SorterConfig};
use core_sync::{SyncError, SyncOrchestrator};
use provider_google_drive::GoogleDriveConnector;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "media-sorter",
    version,
    about = "Sort Google Drive photos and videos into category folders"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    settings: Settings,

    /// Log output format: pretty, json or compact
    #[arg(long, global = true, env = "MEDIA_SORTER_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level for the sorter crates
    #[arg(long, global = true, env = "MEDIA_SORTER_LOG_LEVEL", default_value = "info")]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Download, classify and upload; stage large files for later
    Sync,
    /// Upload files staged in the large area by an earlier sync
    UploadLarge,
}

#[derive(Args, Debug)]
struct Settings {
    /// OAuth access token with Drive scope.
    /// Prefer the MEDIA_SORTER_ACCESS_TOKEN environment variable; flags are
    /// visible in process listings.
    #[arg(long, global = true, env = "MEDIA_SORTER_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Source folder id (sync only)
    #[arg(long, global = true, env = "MEDIA_SORTER_SOURCE_FOLDER")]
    source_folder: Option<String>,

    /// Destination root folder id
    #[arg(long, global = true, env = "MEDIA_SORTER_DESTINATION_FOLDER")]
    destination_folder: Option<String>,

    /// Staging directory for normal-sized files
    #[arg(long, global = true, env = "MEDIA_SORTER_NORMAL_DIR", default_value = config::DEFAULT_NORMAL_STAGING_DIR)]
    normal_dir: PathBuf,

    /// Staging directory for large files
    #[arg(long, global = true, env = "MEDIA_SORTER_LARGE_DIR", default_value = config::DEFAULT_LARGE_STAGING_DIR)]
    large_dir: PathBuf,

    /// Files above this many bytes go to the large area
    #[arg(long, global = true, env = "MEDIA_SORTER_SIZE_THRESHOLD")]
    size_threshold: Option<u64>,

    /// Images with more faces than this are group photos
    #[arg(long, global = true, env = "MEDIA_SORTER_GROUP_THRESHOLD")]
    group_threshold: Option<usize>,

    /// Keep the normal area after uploading
    #[arg(long, global = true, env = "MEDIA_SORTER_KEEP_NORMAL")]
    keep_normal: bool,

    /// Keep the large area after uploading
    #[arg(long, global = true, env = "MEDIA_SORTER_KEEP_LARGE")]
    keep_large: bool,

    /// Leave large files on the remote instead of staging them
    #[arg(long, global = true, env = "MEDIA_SORTER_SKIP_LARGE")]
    skip_large: bool,

    /// SeetaFace frontal model used for face counting
    #[arg(
        long,
        global = true,
        env = "MEDIA_SORTER_FACE_MODEL",
        default_value = "seeta_fd_frontal_v1.0.bin"
    )]
    face_model: PathBuf,

    /// Cascade score a detection needs to count as a face
    #[arg(
        long,
        global = true,
        env = "MEDIA_SORTER_FACE_SCORE",
        default_value_t = DEFAULT_SCORE_THRESHOLD
    )]
    face_score: f64,
}

impl Settings {
    fn sorter_config(&self) -> Result<SorterConfig> {
        let mut builder = SorterConfig::builder()
            .normal_staging_dir(self.normal_dir.clone())
            .large_staging_dir(self.large_dir.clone())
            .sweep_normal_after_upload(!self.keep_normal)
            .sweep_large_after_upload(!self.keep_large)
            .stage_large_files(!self.skip_large);

        if let Some(id) = &self.source_folder {
            builder = builder.source_folder_id(id);
        }
        if let Some(id) = &self.destination_folder {
            builder = builder.destination_folder_id(id);
        }
        if let Some(bytes) = self.size_threshold {
            builder = builder.size_threshold_bytes(bytes);
        }
        if let Some(faces) = self.group_threshold {
            builder = builder.group_photo_threshold(faces);
        }

        builder.build().context("Invalid configuration")
    }
}

fn build_orchestrator(settings: &Settings, config: SorterConfig) -> Result<SyncOrchestrator> {
    let access_token = settings
        .access_token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .context("An access token is required (--access-token or MEDIA_SORTER_ACCESS_TOKEN)")?;

    let http_client = Arc::new(ReqwestHttpClient::new().context("Failed to build HTTP client")?);
    let store = Arc::new(GoogleDriveConnector::new(http_client, access_token));
    let detector = Arc::new(
        CascadeFaceDetector::new(settings.face_model.clone())
            .context("Failed to load face model")?
            .with_score_threshold(settings.face_score),
    );

    Ok(SyncOrchestrator::new(
        config,
        store,
        Arc::new(TokioFileSystem::new()),
        detector,
    ))
}

async fn run(cli: &Cli) -> Result<()> {
    let config = cli.settings.sorter_config()?;
    if let Command::Sync = cli.command {
        config
            .require_source()
            .context("The sync command needs --source-folder or MEDIA_SORTER_SOURCE_FOLDER")?;
    }
    let orchestrator = build_orchestrator(&cli.settings, config)?;

    let report = match cli.command {
        Command::Sync => orchestrator.run_sync().await,
        Command::UploadLarge => orchestrator.upload_large().await,
    };

    match report {
        Ok(report) => {
            info!(clean = report.is_clean(), "Run complete");
            println!("{}", report);
            Ok(())
        }
        Err(e) => {
            if let SyncError::PhaseFailed { phase, .. } = &e {
                eprintln!("Aborted during {}", phase);
            }
            Err(e.into())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::default().with_level(cli.log_level);
    if let Some(format) = cli.log_format {
        logging = logging.with_format(format);
    }
    if let Err(e) = init_logging(logging) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
