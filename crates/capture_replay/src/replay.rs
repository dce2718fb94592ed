use std::{
    fs, io,
    path::{Path, PathBuf},
};

use clap::Parser;
use reply_capture::{reconstruct_async_read, CaptureConfig, CaptureError, OutboundRequest};
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_METHOD: &str = "POST";

#[derive(Debug, Parser)]
pub struct Args {
    /// Captured response body (raw `text/event-stream` bytes).
    #[arg(long)]
    pub body: PathBuf,

    /// JSON body of the outbound request that produced the response.
    #[arg(long)]
    pub request: Option<PathBuf>,

    /// TOML capture config; missing keys keep their defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// URL the request was sent to. When given, it must match the intercept target.
    #[arg(long)]
    pub url: Option<String>,

    /// Bytes read from the body per chunk.
    #[arg(long, default_value_t = 8192, value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: u64,

    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("invalid --chunk-size: {0}")]
    ChunkSize(u64),
}

#[derive(Debug, Eq, PartialEq)]
pub enum Output {
    /// The record as JSON, or `null` when nothing was reconstructed.
    Json(String),
    NotIntercepted { url: String },
}

pub async fn run(args: Args) -> Result<Output, Error> {
    let config = match &args.config {
        Some(path) => CaptureConfig::from_toml_str(&read_to_string(path)?)?,
        None => CaptureConfig::default(),
    };

    if let Some(url) = &args.url {
        if !config.target.matches(url, DEFAULT_METHOD) {
            info!("url is not an intercepted endpoint");
            return Ok(Output::NotIntercepted { url: url.clone() });
        }
    }

    let mut request = match &args.request {
        Some(path) => OutboundRequest::from_json_str(&read_to_string(path)?)?,
        None => OutboundRequest::default(),
    };
    if let Some(url) = args.url {
        request = request.with_url(url);
    }

    let chunk_size =
        usize::try_from(args.chunk_size).map_err(|_| Error::ChunkSize(args.chunk_size))?;
    let body = tokio::fs::File::open(&args.body)
        .await
        .map_err(|source| Error::Read {
            path: args.body.clone(),
            source,
        })?;

    let reconstruction =
        reconstruct_async_read(body, config, request.conversation_id.clone(), chunk_size).await;
    if let reply_capture::CompletionStatus::Partial { reason } = &reconstruction.status {
        warn!(%reason, "body ended with a read error; emitting partial result");
    }

    let record = reconstruction.finalize(&request);
    let encoded = if args.pretty {
        serde_json::to_string_pretty(&record)
    } else {
        serde_json::to_string(&record)
    };
    let json = encoded.map_err(|source| CaptureError::RecordEncode { source })?;
    Ok(Output::Json(json))
}

fn read_to_string(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}
