use tracing::debug;

use crate::config::{CaptureConfig, DiagnosticCapture};
use crate::error::{Diagnostic, LineRecord, LineRecordError};
use crate::framer::{classify_line, Frame};
use crate::operation::{interpret_payload, InterpretedPayload};
use crate::reader::DecodedLine;

/// What a data-bearing line carried.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    Payload(InterpretedPayload),
    /// End-of-stream sentinel. Later lines are still ingested.
    Done,
}

/// Turns decoded lines into records: frames lines, parses payloads, and
/// reports skipped lines with redacted summaries.
///
/// Blank, comment, and non-data lines yield no record.
pub struct FrameIngestor {
    config: CaptureConfig,
}

impl FrameIngestor {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn ingest(&mut self, line: DecodedLine) -> Option<LineRecord<FrameEvent>> {
        match line {
            DecodedLine::Line { line_number, text } => self.ingest_text(line_number, &text),
            DecodedLine::LineTooLong {
                line_number,
                observed_bytes,
                max_line_bytes,
            } => Some(self.error_record(
                line_number,
                LineRecordError::LineTooLong {
                    observed_bytes,
                    max_line_bytes,
                },
                format!("line of {observed_bytes} bytes exceeds {max_line_bytes}"),
            )),
            DecodedLine::StreamError {
                line_number,
                message,
            } => Some(self.error_record(
                line_number,
                LineRecordError::Io {
                    message: message.clone(),
                },
                message,
            )),
        }
    }

    fn ingest_text(&mut self, line_number: usize, text: &str) -> Option<LineRecord<FrameEvent>> {
        let payload = match classify_line(text, &self.config) {
            Frame::Data(payload) => payload,
            Frame::Done => {
                debug!(line_number, "end-of-stream marker");
                return Some(LineRecord {
                    line_number,
                    outcome: Ok(FrameEvent::Done),
                });
            }
            Frame::Comment | Frame::Blank | Frame::Ignored => return None,
        };

        match interpret_payload(payload, &self.config) {
            Ok(interpreted) => Some(LineRecord {
                line_number,
                outcome: Ok(FrameEvent::Payload(interpreted)),
            }),
            Err(err) => {
                debug!(line_number, code = ?err.code(), "skipping unparseable payload");
                Some(self.error_record(
                    line_number,
                    LineRecordError::Payload {
                        code: err.code(),
                        summary: err.redacted_summary(),
                    },
                    err.full_details(),
                ))
            }
        }
    }

    fn error_record<T>(
        &mut self,
        line_number: usize,
        err: LineRecordError,
        full_details: String,
    ) -> LineRecord<T> {
        if self.config.diagnostic_capture == DiagnosticCapture::FullDetails {
            if let Some(sink) = self.config.diagnostic_sink.as_mut() {
                sink.on_diagnostic(Diagnostic {
                    line_number,
                    code: err.code(),
                    details: full_details,
                });
            }
        }
        LineRecord {
            line_number,
            outcome: Err(err),
        }
    }
}
