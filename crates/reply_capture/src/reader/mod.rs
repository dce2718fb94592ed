mod decoder;
mod stream;
mod sync;

#[cfg(feature = "tokio")]
mod tokio;

pub use decoder::{DecodedLine, LineDecoder};
pub use stream::ChunkStreamReader;
pub use sync::SyncLineReader;

#[cfg(feature = "tokio")]
pub use self::tokio::AsyncLineReader;
