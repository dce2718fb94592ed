use tracing::{debug, warn};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DecodedLine {
    Line {
        line_number: usize,
        text: String,
    },
    LineTooLong {
        line_number: usize,
        observed_bytes: usize,
        max_line_bytes: usize,
    },
    /// The underlying stream failed; no further lines follow.
    StreamError {
        line_number: usize,
        message: String,
    },
}

impl DecodedLine {
    pub fn line_number(&self) -> usize {
        match self {
            DecodedLine::Line { line_number, .. }
            | DecodedLine::LineTooLong { line_number, .. }
            | DecodedLine::StreamError { line_number, .. } => *line_number,
        }
    }
}

/// Incremental byte-to-line decoder.
///
/// Chunks may split lines and UTF-8 sequences anywhere. Lines are split on raw
/// `\n` bytes, which never occur inside a multi-byte sequence, so each
/// completed line holds whole characters and is decoded on its own. Invalid
/// UTF-8 is replaced rather than rejected. The trailing partial line stays
/// buffered until more bytes arrive or [`LineDecoder::finish`] is called.
#[derive(Debug)]
pub struct LineDecoder {
    max_line_bytes: usize,
    current_line: Vec<u8>,
    observed_bytes: usize,
    discard_mode: bool,
    line_number: usize,
}

impl LineDecoder {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            max_line_bytes,
            current_line: Vec::new(),
            observed_bytes: 0,
            discard_mode: false,
            line_number: 0,
        }
    }

    /// Number the next emitted line will carry.
    pub fn next_line_number(&self) -> usize {
        self.line_number + 1
    }

    /// Bytes of the incomplete trailing line currently held back.
    pub fn buffered_bytes(&self) -> usize {
        self.observed_bytes
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<DecodedLine> {
        let mut out = Vec::new();
        let mut rest = chunk;
        while let Some(newline_idx) = rest.iter().position(|b| *b == b'\n') {
            self.extend_line(&rest[..newline_idx]);
            out.push(self.finish_line());
            rest = &rest[newline_idx + 1..];
        }
        self.extend_line(rest);
        out
    }

    /// Flushes the buffered partial line, if any, as a final line.
    pub fn finish(&mut self) -> Option<DecodedLine> {
        if self.observed_bytes == 0 && !self.discard_mode {
            return None;
        }
        Some(self.finish_line())
    }

    fn extend_line(&mut self, segment: &[u8]) {
        self.observed_bytes = self.observed_bytes.saturating_add(segment.len());
        if self.discard_mode {
            return;
        }
        if self.observed_bytes > self.max_line_bytes {
            self.discard_mode = true;
            self.current_line = Vec::new();
            return;
        }
        self.current_line.extend_from_slice(segment);
    }

    fn finish_line(&mut self) -> DecodedLine {
        self.line_number += 1;
        let line_number = self.line_number;
        let observed_bytes = std::mem::take(&mut self.observed_bytes);

        if std::mem::take(&mut self.discard_mode) {
            warn!(
                line_number,
                observed_bytes,
                max_line_bytes = self.max_line_bytes,
                "discarding oversized line"
            );
            return DecodedLine::LineTooLong {
                line_number,
                observed_bytes,
                max_line_bytes: self.max_line_bytes,
            };
        }

        let bytes = std::mem::take(&mut self.current_line);
        let mut text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => {
                debug!(line_number, "replacing invalid UTF-8 in line");
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };
        if text.ends_with('\r') {
            text.pop();
        }
        DecodedLine::Line { line_number, text }
    }
}
