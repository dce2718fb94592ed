use thiserror::Error;

/// Failures surfaced by fallible entry points (configuration, I/O owned by the
/// caller). A reconstruction run itself never fails; see [`CompletionStatus`].
///
/// [`CompletionStatus`]: crate::CompletionStatus
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to parse capture config TOML: {source}")]
    ConfigParse {
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to parse request body JSON: {source}")]
    RequestParse {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode captured exchange: {source}")]
    RecordEncode {
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DiagnosticCode {
    JsonParse,
    LineTooLong,
    StreamRead,
    Unclassified,
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum LineRecordError {
    #[error("response stream read failed: {message}")]
    Io { message: String },
    #[error("line too long (observed_bytes={observed_bytes}, max_line_bytes={max_line_bytes})")]
    LineTooLong {
        observed_bytes: usize,
        max_line_bytes: usize,
    },
    #[error("payload skipped ({code:?}): {summary}")]
    Payload {
        code: DiagnosticCode,
        summary: String,
    },
}

impl LineRecordError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            LineRecordError::Io { .. } => DiagnosticCode::StreamRead,
            LineRecordError::LineTooLong { .. } => DiagnosticCode::LineTooLong,
            LineRecordError::Payload { code, .. } => *code,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineRecord<T> {
    pub line_number: usize,
    pub outcome: Result<T, LineRecordError>,
}

/// Full, unredacted description of a skipped line. Only delivered to a
/// [`DiagnosticSink`] when [`DiagnosticCapture::FullDetails`] is configured.
///
/// [`DiagnosticCapture::FullDetails`]: crate::DiagnosticCapture::FullDetails
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub line_number: usize,
    pub code: DiagnosticCode,
    pub details: String,
}

pub trait DiagnosticSink: Send + 'static {
    fn on_diagnostic(&mut self, diagnostic: Diagnostic);
}

impl<F> DiagnosticSink for F
where
    F: FnMut(Diagnostic) + Send + 'static,
{
    fn on_diagnostic(&mut self, diagnostic: Diagnostic) {
        self(diagnostic)
    }
}
