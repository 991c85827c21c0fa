//! pcaflow core: domain models, error taxonomy, provider traits and the
//! configuration transcoder shared by every pcaflow crate.

pub mod error;
pub mod models;
pub mod provider;
pub mod transcode;

pub use error::{PcaError, PcaResult};
