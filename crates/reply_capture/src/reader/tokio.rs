use std::collections::VecDeque;
use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::warn;

use super::decoder::{DecodedLine, LineDecoder};

const CHUNK_SIZE_BYTES: usize = 8192;

/// Line reader over a tokio [`AsyncRead`] body.
pub struct AsyncLineReader<R: AsyncRead + Unpin> {
    reader: R,
    decoder: LineDecoder,
    buffer: Vec<u8>,
    pending: VecDeque<DecodedLine>,
    done: bool,
}

impl<R: AsyncRead + Unpin> AsyncLineReader<R> {
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self::with_chunk_size(reader, max_line_bytes, CHUNK_SIZE_BYTES)
    }

    pub fn with_chunk_size(reader: R, max_line_bytes: usize, chunk_size: usize) -> Self {
        Self {
            reader,
            decoder: LineDecoder::new(max_line_bytes),
            buffer: vec![0u8; chunk_size.max(1)],
            pending: VecDeque::new(),
            done: false,
        }
    }

    pub async fn next_line(&mut self) -> Option<DecodedLine> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(line);
            }
            if self.done {
                return None;
            }
            match self.reader.read(&mut self.buffer).await {
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
                    return Some(DecodedLine::StreamError {
                        line_number,
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}
