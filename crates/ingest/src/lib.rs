//! SourceIngestor: dispatches input refs to per-kind adapters, each a pure
//! `bytes → plain text` function (§4.4).

pub mod html;
pub mod ingestor;
pub mod pdf;
pub mod types;
pub mod url;
pub mod youtube;

pub use ingestor::SourceIngestor;
pub use types::SourceRef;
