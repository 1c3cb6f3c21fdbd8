//! Per-message token codec (component C3): RFC 4121 Wrap and MIC tokens.

pub mod header;
pub mod mic;
pub mod wrap;

pub use header::TokenFlags;
pub use mic::MicToken;
pub use wrap::WrapToken;
