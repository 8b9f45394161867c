//! Core type definitions used across the H-Cloud workspace.

pub mod id;
pub mod stream;

pub use id::*;
pub use stream::ByteStream;
