//! Library error type.

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("fetch failed: {0}")]
	Fetch(#[from] crate::catalog::fetch::FetchError),
	#[error("{0}")]
	Resolution(#[from] crate::relationship_resolver::ResolutionError),
	#[error("{0}")]
	Install(#[from] crate::installation::InstallError),
	#[error("plugin \"{0}\" not found")]
	NotFound(String),
}
