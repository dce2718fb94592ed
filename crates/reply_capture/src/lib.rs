#![forbid(unsafe_code)]
//! Reconstruction of streamed assistant replies from intercepted
//! server-sent event bodies.
//!
//! A run reads a duplicated response body and turns it into one
//! [`CapturedExchange`]:
//! - Bounded-memory, chunk-boundary-safe line decoding (push API, blocking
//!   reader, byte-chunk stream, and tokio reader behind the `tokio` feature).
//! - SSE framing and interpretation of the known delta encodings.
//! - Reconciliation of incremental appends with full-message snapshots.
//! - Product/entity extraction and cleanup of protocol residue.
//!
//! Malformed input never fails a run; skipped lines are reported with
//! redacted summaries, and full details only reach an opt-in
//! [`DiagnosticSink`].

mod config;
mod engine;
mod entity;
mod error;
mod framer;
mod ingest;
mod operation;
mod reader;
mod record;
mod request;
mod sanitize;
mod state;

pub use config::{CaptureConfig, CaptureLimits, DiagnosticCapture, InterceptTarget};
pub use engine::{
    reconstruct_reader, reconstruct_stream, CompletionStatus, Reconstruction, Reconstructor,
    RunStats,
};
pub use entity::{extract_products, Product};
pub use error::{
    CaptureError, Diagnostic, DiagnosticCode, DiagnosticSink, LineRecord, LineRecordError,
};
pub use framer::{classify_line, Frame};
pub use ingest::{FrameEvent, FrameIngestor};
pub use operation::{classify, interpret_payload, InterpretedPayload, Operation, PayloadError, SubOp};
pub use reader::{ChunkStreamReader, DecodedLine, LineDecoder, SyncLineReader};
pub use record::{CapturedExchange, ExchangeDebug, UNEXTRACTED_USER_MESSAGE, UNKNOWN};
pub use request::{extract_user_message, OutboundRequest};
pub use sanitize::{passes, sanitize, SanitizePass};
pub use state::{Applied, RawOperation, ReconstructionState};

#[cfg(feature = "tokio")]
pub use engine::{reconstruct_async_read, spawn_reconstruction};
#[cfg(feature = "tokio")]
pub use reader::AsyncLineReader;
