//! Retrieval of remote documents and archives.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
	#[error("reqwest error: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("{url} responded with status {status}")]
	Status {
		url: String,
		status: u16,
	},
	#[error("{url} did not respond within {after:?}")]
	Timeout {
		url: String,
		after: std::time::Duration,
	},
	#[error("nothing available at {0}")]
	NotFound(String),
}

/// Something able to retrieve the bytes behind an address.
///
/// Every channel, repository and archive request goes through this so sources can be swapped out.
#[async_trait::async_trait]
pub trait Fetch: Send + Sync {
	async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
	client: reqwest::Client,
}

impl HttpFetcher {
	pub fn new(config: &crate::Config) -> Result<Self, FetchError> {
		let client = reqwest::Client::builder()
			.https_only(config.https_only())
			.timeout(config.fetch_timeout())
			.build()?;
		Ok(Self { client })
	}
}

#[async_trait::async_trait]
impl Fetch for HttpFetcher {
	async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
		log::debug!("GET {}", url);
		let response = self.client
			.get(url)
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
		}

		Ok(response.bytes().await?.to_vec())
	}
}

/// Runs `fetcher` bounded by `timeout`.
pub async fn fetch_with_timeout(fetcher: &dyn Fetch, url: &str, timeout: std::time::Duration) -> Result<Vec<u8>, FetchError> {
	match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
		Ok(result) => result,
		Err(_) => Err(FetchError::Timeout { url: url.to_string(), after: timeout }),
	}
}
