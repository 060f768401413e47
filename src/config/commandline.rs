use crate::{
    config::primitives::{LogFormat, Targets},
    serde_str::Serde,
};
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf};
use url::Url;
use uuid::Uuid;

impl Args {
    pub(super) fn into_output(self) -> Output {
        let Args {
            config_file,
            log_format,
            log_targets,
            log_spans,
            opentelemetry_url,
            opentelemetry_service_name,
            opentelemetry_targets,
            metrics_prometheus_address,
            media_max_file_size,
            media_process_timeout,
            media_upload_timeout,
            temporary_directory,
            repo_path,
            save_to,
            command,
        } = self;

        let tracing = Tracing {
            logging: Logging {
                format: log_format,
                targets: log_targets.map(Serde::new),
                log_spans,
            },
            opentelemetry: OpenTelemetry {
                url: opentelemetry_url,
                service_name: opentelemetry_service_name,
                targets: opentelemetry_targets.map(Serde::new),
            },
        };

        let metrics = Metrics {
            prometheus_address: metrics_prometheus_address,
        };

        let media = Media {
            max_file_size: media_max_file_size,
            process_timeout: media_process_timeout,
            upload_timeout: media_upload_timeout,
            temporary_directory,
        };

        let repo = repo_path.map(|path| Repo::Sled(Sled { path: Some(path) }));

        let operation = match command {
            Command::CreateVideo(CreateVideo {
                token,
                title,
                description,
            }) => Operation::CreateVideo {
                token,
                title,
                description,
            },
            Command::UploadVideo(UploadVideo {
                token,
                video_id,
                content_type,
                file,
            }) => Operation::UploadVideo {
                token,
                video_id,
                content_type,
                file,
            },
            Command::Video(Video { video_id }) => Operation::Video { video_id },
        };

        Output {
            config_format: ConfigFormat {
                tracing,
                metrics,
                media,
                repo,
            },
            operation,
            save_to,
            config_file,
        }
    }
}

pub(super) struct Output {
    pub(super) config_format: ConfigFormat,
    pub(super) operation: Operation,
    pub(super) save_to: Option<PathBuf>,
    pub(super) config_file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub(crate) enum Operation {
    CreateVideo {
        token: String,
        title: String,
        description: String,
    },
    UploadVideo {
        token: String,
        video_id: Uuid,
        content_type: String,
        file: PathBuf,
    },
    Video {
        video_id: Uuid,
    },
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(super) struct ConfigFormat {
    tracing: Tracing,
    metrics: Metrics,
    media: Media,
    #[serde(skip_serializing_if = "Option::is_none")]
    repo: Option<Repo>,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Tracing {
    logging: Logging,
    opentelemetry: OpenTelemetry,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Logging {
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<LogFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    targets: Option<Serde<Targets>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    log_spans: bool,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct OpenTelemetry {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    targets: Option<Serde<Targets>>,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Metrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    prometheus_address: Option<SocketAddr>,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Media {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_file_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    process_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upload_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temporary_directory: Option<PathBuf>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
enum Repo {
    Sled(Sled),
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Sled {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
}

/// Manage videos and their uploads
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(super) struct Args {
    /// Path to the tubely configuration file
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    /// Format of logs printed to stdout
    #[arg(long)]
    log_format: Option<LogFormat>,
    /// Log levels to print to stdout, respects RUST_LOG formatting
    #[arg(long)]
    log_targets: Option<Targets>,
    /// Whether to log openning and closing of tracing spans to stdout
    #[arg(long)]
    log_spans: bool,

    /// URL to send OpenTelemetry traces
    #[arg(long)]
    opentelemetry_url: Option<Url>,
    /// Service Name to use for OpenTelemetry
    #[arg(long)]
    opentelemetry_service_name: Option<String>,
    /// Log levels to use for OpenTelemetry, respects RUST_LOG formatting
    #[arg(long)]
    opentelemetry_targets: Option<Targets>,

    /// Whether to enable the prometheus scrape endpoint
    #[arg(long)]
    metrics_prometheus_address: Option<SocketAddr>,

    /// The maximum size, in megabytes, of an uploaded video
    ///
    /// This number defaults to 1024
    #[arg(long)]
    media_max_file_size: Option<usize>,
    /// How long, in seconds, to wait for ffprobe or ffmpeg before giving up
    ///
    /// This number defaults to 120
    #[arg(long)]
    media_process_timeout: Option<u64>,
    /// How long, in seconds, an accepted upload may take from staging to the final record update
    #[arg(long)]
    media_upload_timeout: Option<u64>,

    /// The temporary directory tubely should use when processing media
    #[arg(long)]
    temporary_directory: Option<PathBuf>,

    /// The path to the sled database holding video records
    #[arg(long)]
    repo_path: Option<PathBuf>,

    /// File to save the current configuration for reproducible runs
    #[arg(long)]
    save_to: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new video record owned by the authenticated user
    CreateVideo(CreateVideo),

    /// Upload the video file for an existing record
    UploadVideo(UploadVideo),

    /// Print a stored video record
    Video(Video),
}

#[derive(Debug, Parser)]
struct CreateVideo {
    /// Bearer token identifying the uploader
    #[arg(long)]
    token: String,

    #[arg(long)]
    title: String,

    #[arg(long, default_value = "")]
    description: String,
}

#[derive(Debug, Parser)]
struct UploadVideo {
    /// Bearer token identifying the uploader
    #[arg(long)]
    token: String,

    /// The record the uploaded video belongs to
    #[arg(long)]
    video_id: Uuid,

    /// Declared media type of the file
    #[arg(long, default_value = "video/mp4")]
    content_type: String,

    /// The video file to upload
    file: PathBuf,
}

#[derive(Debug, Parser)]
struct Video {
    #[arg(long)]
    video_id: Uuid,
}
