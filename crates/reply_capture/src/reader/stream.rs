use std::collections::VecDeque;
use std::fmt::Display;

use futures_util::stream::{Stream, StreamExt};
use tracing::warn;

use super::decoder::{DecodedLine, LineDecoder};

/// Pull-based line reader over an asynchronous stream of byte chunks.
///
/// One chunk is fully decoded before the next is requested, so the partial
/// line buffer is never touched by more than one in-flight read.
pub struct ChunkStreamReader<S> {
    stream: S,
    decoder: LineDecoder,
    pending: VecDeque<DecodedLine>,
    done: bool,
}

impl<S, B, E> ChunkStreamReader<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    pub fn new(stream: S, max_line_bytes: usize) -> Self {
        Self {
            stream,
            decoder: LineDecoder::new(max_line_bytes),
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
            match self.stream.next().await {
                Some(Ok(chunk)) => {
                    let lines = self.decoder.push(chunk.as_ref());
                    self.pending.extend(lines);
                }
                Some(Err(err)) => {
                    self.done = true;
                    let line_number = self.decoder.next_line_number();
                    warn!(line_number, error = %err, "response stream read failed");
                    return Some(DecodedLine::StreamError {
                        line_number,
                        message: err.to_string(),
                    });
                }
                None => {
                    self.done = true;
                    self.pending.extend(self.decoder.finish());
                }
            }
        }
    }
}
