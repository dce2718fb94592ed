use crate::config::CaptureConfig;

/// Classification of one decoded line of the event protocol.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Frame<'a> {
    /// Payload of a data line, prefix stripped.
    Data(&'a str),
    /// The end-of-stream sentinel payload.
    Done,
    Comment,
    Blank,
    /// Anything else: other fields (`event:`, `id:`, `retry:`) or noise.
    Ignored,
}

impl<'a> Frame<'a> {
    pub fn payload(&self) -> Option<&'a str> {
        match self {
            Frame::Data(payload) => Some(payload),
            _ => None,
        }
    }
}

pub fn classify_line<'a>(line: &'a str, config: &CaptureConfig) -> Frame<'a> {
    if line.chars().all(|ch| ch.is_whitespace()) {
        return Frame::Blank;
    }
    if line.starts_with(config.comment_prefix.as_str()) {
        return Frame::Comment;
    }
    let Some(payload) = line.strip_prefix(config.data_prefix.as_str()) else {
        return Frame::Ignored;
    };
    if payload == config.done_sentinel {
        return Frame::Done;
    }
    Frame::Data(payload)
}
