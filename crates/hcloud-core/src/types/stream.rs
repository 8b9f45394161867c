//! Streaming byte payloads.

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

/// A byte stream used for uploading and reading file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;
