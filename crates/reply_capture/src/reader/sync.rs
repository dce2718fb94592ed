use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use tracing::warn;

use super::decoder::{DecodedLine, LineDecoder};

const CHUNK_SIZE_BYTES: usize = 8192;

/// Blocking line reader over any [`Read`] source.
pub struct SyncLineReader<R: Read> {
    reader: R,
    decoder: LineDecoder,
    buffer: [u8; CHUNK_SIZE_BYTES],
    pending: VecDeque<DecodedLine>,
    done: bool,
}

impl<R: Read> SyncLineReader<R> {
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            decoder: LineDecoder::new(max_line_bytes),
            buffer: [0u8; CHUNK_SIZE_BYTES],
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn fill_pending(&mut self) {
        match self.reader.read(&mut self.buffer) {
            Ok(0) => {
                self.done = true;
                self.pending.extend(self.decoder.finish());
            }
            Ok(n) => {
                let lines = self.decoder.push(&self.buffer[..n]);
                self.pending.extend(lines);
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => {
                self.done = true;
                let line_number = self.decoder.next_line_number();
                warn!(line_number, error = %err, "response stream read failed");
                self.pending.push_back(DecodedLine::StreamError {
                    line_number,
                    message: err.to_string(),
                });
            }
        }
    }
}

impl<R: Read> Iterator for SyncLineReader<R> {
    type Item = DecodedLine;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(line);
            }
            if self.done {
                return None;
            }
            self.fill_pending();
        }
    }
}
