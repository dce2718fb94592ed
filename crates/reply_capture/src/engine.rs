use std::fmt::Display;
use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::stream::Stream;
use tracing::{debug, warn};

use crate::config::CaptureConfig;
use crate::entity::extract_products;
use crate::error::{DiagnosticCode, LineRecord, LineRecordError};
use crate::ingest::{FrameEvent, FrameIngestor};
use crate::reader::{ChunkStreamReader, DecodedLine, SyncLineReader};
use crate::record::{CapturedExchange, ExchangeDebug, UNEXTRACTED_USER_MESSAGE, UNKNOWN};
use crate::request::OutboundRequest;
use crate::sanitize::sanitize;
use crate::state::ReconstructionState;

/// How a run ended. None of these is an error.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CompletionStatus {
    /// The stream ended normally.
    Complete,
    /// The stream failed mid-read; the state holds everything read before.
    Partial { reason: String },
    /// The body produced no lines at all.
    Empty,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct RunStats {
    pub lines: usize,
    pub operations: usize,
    pub unclassified: usize,
    pub skipped: usize,
    pub saw_done_marker: bool,
}

/// Drives one reconstruction run, line by line.
///
/// Owns its state exclusively; independent runs share nothing.
pub struct Reconstructor {
    ingestor: FrameIngestor,
    state: ReconstructionState,
    stats: RunStats,
    stream_error: Option<String>,
}

impl Reconstructor {
    /// `conversation_id` is the id carried by the originating request, if any.
    pub fn new(config: CaptureConfig, conversation_id: Option<String>) -> Self {
        Self {
            ingestor: FrameIngestor::new(config),
            state: ReconstructionState::with_conversation_id(conversation_id),
            stats: RunStats::default(),
            stream_error: None,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        self.ingestor.config()
    }

    pub fn state(&self) -> &ReconstructionState {
        &self.state
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn push_line(&mut self, line: DecodedLine) {
        if !matches!(line, DecodedLine::StreamError { .. }) {
            self.stats.lines += 1;
        }
        if let Some(record) = self.ingestor.ingest(line) {
            self.apply_record(record);
        }
    }

    fn apply_record(&mut self, record: LineRecord<FrameEvent>) {
        let line_number = record.line_number;
        match record.outcome {
            Ok(FrameEvent::Done) => self.stats.saw_done_marker = true,
            Ok(FrameEvent::Payload(payload)) => {
                self.state.observe_conversation_id(payload.conversation_id);
                self.state.observe_message_id(payload.message_id);
                match payload.operation {
                    Some(operation) => {
                        self.stats.operations += 1;
                        self.state.apply(operation, self.ingestor.config());
                    }
                    None => {
                        self.stats.unclassified += 1;
                        debug!(
                            line_number,
                            code = ?DiagnosticCode::Unclassified,
                            "payload matches no known operation shape"
                        );
                    }
                }
            }
            Err(LineRecordError::Io { message }) => self.stream_error = Some(message),
            Err(_) => self.stats.skipped += 1,
        }
    }

    pub fn finish(self) -> Reconstruction {
        let status = match self.stream_error {
            Some(reason) => {
                warn!(
                    lines = self.stats.lines,
                    chars = self.state.accumulated_text().chars().count(),
                    "reconstruction finished with partial data"
                );
                CompletionStatus::Partial { reason }
            }
            None if self.stats.lines == 0 => CompletionStatus::Empty,
            None => CompletionStatus::Complete,
        };
        debug!(
            lines = self.stats.lines,
            operations = self.stats.operations,
            unclassified = self.stats.unclassified,
            skipped = self.stats.skipped,
            saw_done_marker = self.stats.saw_done_marker,
            ?status,
            "reconstruction finished"
        );
        Reconstruction {
            state: self.state,
            status,
            stats: self.stats,
        }
    }
}

/// Result of a finished run, before it is turned into a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub state: ReconstructionState,
    pub status: CompletionStatus,
    pub stats: RunStats,
}

impl Reconstruction {
    /// Builds the record stamped with the current time. `None` when nothing
    /// was reconstructed.
    pub fn finalize(self, request: &OutboundRequest) -> Option<CapturedExchange> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or_default();
        self.finalize_at(request, timestamp)
    }

    pub fn finalize_at(self, request: &OutboundRequest, timestamp: i64) -> Option<CapturedExchange> {
        let text = self.state.accumulated_text();
        if text.is_empty() {
            return None;
        }
        let products = extract_products(text);
        let assistant_response = sanitize(text);

        let conversation_id = self
            .state
            .conversation_id()
            .or(request.conversation_id.as_deref())
            .unwrap_or(UNKNOWN)
            .to_string();
        let message_id = self.state.message_id().map(str::to_string);

        Some(CapturedExchange {
            conversation_id,
            message_id,
            model: request.model.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            user_message: request
                .user_message
                .clone()
                .unwrap_or_else(|| UNEXTRACTED_USER_MESSAGE.to_string()),
            assistant_response,
            products,
            raw_operations: self.state.into_raw_operation_log(),
            timestamp,
            debug: Some(ExchangeDebug {
                url: request.url.clone(),
                request_action: request.action.clone(),
                parent_message_id: request.parent_message_id.clone(),
            }),
        })
    }
}

/// Reconstructs from a blocking reader.
pub fn reconstruct_reader<R: Read>(
    reader: R,
    config: CaptureConfig,
    conversation_id: Option<String>,
) -> Reconstruction {
    let lines = SyncLineReader::new(reader, config.limits.max_line_bytes);
    let mut reconstructor = Reconstructor::new(config, conversation_id);
    for line in lines {
        reconstructor.push_line(line);
    }
    reconstructor.finish()
}

/// Reconstructs from an asynchronous stream of byte chunks, such as a
/// duplicated response body. Never fails: a stream error ends the run with
/// [`CompletionStatus::Partial`].
pub async fn reconstruct_stream<S, B, E>(
    stream: S,
    config: CaptureConfig,
    conversation_id: Option<String>,
) -> Reconstruction
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut lines = ChunkStreamReader::new(stream, config.limits.max_line_bytes);
    let mut reconstructor = Reconstructor::new(config, conversation_id);
    while let Some(line) = lines.next_line().await {
        reconstructor.push_line(line);
    }
    reconstructor.finish()
}

#[cfg(feature = "tokio")]
mod tokio_engine {
    use std::fmt::Display;

    use futures_util::stream::Stream;
    use tokio::io::AsyncRead;
    use tokio::task::JoinHandle;

    use super::{reconstruct_stream, Reconstruction, Reconstructor};
    use crate::config::CaptureConfig;
    use crate::reader::AsyncLineReader;

    /// Reconstructs from a tokio reader, pulling `chunk_size` bytes at a time.
    pub async fn reconstruct_async_read<R: AsyncRead + Unpin>(
        reader: R,
        config: CaptureConfig,
        conversation_id: Option<String>,
        chunk_size: usize,
    ) -> Reconstruction {
        let mut lines =
            AsyncLineReader::with_chunk_size(reader, config.limits.max_line_bytes, chunk_size);
        let mut reconstructor = Reconstructor::new(config, conversation_id);
        while let Some(line) = lines.next_line().await {
            reconstructor.push_line(line);
        }
        reconstructor.finish()
    }

    /// Runs [`reconstruct_stream`] on its own task so the caller's primary
    /// response path is never blocked by it.
    pub fn spawn_reconstruction<S, B, E>(
        stream: S,
        config: CaptureConfig,
        conversation_id: Option<String>,
    ) -> JoinHandle<Reconstruction>
    where
        S: Stream<Item = Result<B, E>> + Unpin + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: Display + Send + 'static,
    {
        tokio::spawn(reconstruct_stream(stream, config, conversation_id))
    }
}

#[cfg(feature = "tokio")]
pub use tokio_engine::{reconstruct_async_read, spawn_reconstruction};
