//! Various helpers for testing
//!
//! functions in this module should use results and not use any panics to avoid confusion in callers

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use plugin_rs::catalog::fetch::{Fetch, FetchError};

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("zip error: {0}")]
	Zip(#[from] zip::result::ZipError),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
}

/// Serves documents from memory instead of the network.
///
/// Addresses without a document fail with [`FetchError::NotFound`].
/// Every request is recorded when it starts and again if it runs to the end.
#[derive(Debug, Default)]
pub struct StaticFetcher {
	documents: HashMap<String, Vec<u8>>,
	delays: HashMap<String, Duration>,
	requests: std::sync::Mutex<Vec<String>>,
	completed: std::sync::Mutex<Vec<String>>,
}

fn record(log: &std::sync::Mutex<Vec<String>>, url: &str) {
	match log.lock() {
		Ok(mut log) => log.push(url.to_string()),
		Err(poisoned) => poisoned.into_inner().push(url.to_string()),
	}
}

impl StaticFetcher {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_document(mut self, url: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
		self.documents.insert(url.into(), data.into());
		self
	}

	/// Makes requests for `url` take `delay` before answering.
	pub fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
		self.delays.insert(url.into(), delay);
		self
	}

	/// Every address requested so far, in request order.
	pub fn requests(&self) -> Vec<String> {
		match self.requests.lock() {
			Ok(requests) => requests.clone(),
			Err(poisoned) => poisoned.into_inner().clone(),
		}
	}

	pub fn request_count(&self, url: &str) -> usize {
		self.requests().iter().filter(|r| *r == url).count()
	}

	/// Requests for `url` that weren't dropped before answering.
	pub fn completed_count(&self, url: &str) -> usize {
		let completed = match self.completed.lock() {
			Ok(completed) => completed.clone(),
			Err(poisoned) => poisoned.into_inner().clone(),
		};
		completed.iter().filter(|r| *r == url).count()
	}
}

#[async_trait::async_trait]
impl Fetch for StaticFetcher {
	async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
		record(&self.requests, url);
		if let Some(delay) = self.delays.get(url) {
			tokio::time::sleep(*delay).await;
		}
		record(&self.completed, url);
		self.documents.get(url)
			.cloned()
			.ok_or_else(|| FetchError::NotFound(url.to_string()))
	}
}

/// A host whose installed plugins are a fixed list.
#[derive(Debug, Clone)]
pub struct StaticOracle {
	host_name: String,
	host_version: String,
	installed: Vec<(String, Option<String>)>,
}

impl StaticOracle {
	pub fn new(host_name: impl Into<String>, host_version: impl Into<String>) -> Self {
		Self {
			host_name: host_name.into(),
			host_version: host_version.into(),
			installed: Vec::new(),
		}
	}

	pub fn with_installed(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
		self.installed.push((name.into(), Some(version.into())));
		self
	}

	/// A loaded extension that doesn't report any version.
	pub fn with_unversioned(mut self, name: impl Into<String>) -> Self {
		self.installed.push((name.into(), None));
		self
	}
}

impl plugin_rs::VersionOracle for StaticOracle {
	fn host_name(&self) -> &str {
		&self.host_name
	}

	fn host_version(&self) -> String {
		self.host_version.clone()
	}

	fn loaded_extensions(&self) -> Vec<String> {
		self.installed.iter().map(|(name, _)| name.clone()).collect()
	}

	fn installed_version(&self, name: &str) -> Option<String> {
		self.installed.iter()
			.find(|(n, _)| n == name)
			.and_then(|(_, version)| version.clone())
	}
}

/// Builds a zip archive holding `files` as (path, content) pairs.
///
/// Paths are stored exactly as given so unsafe ones can be tested.
pub fn zip_archive(files: &[(&str, &[u8])]) -> Result<Vec<u8>, FixtureError> {
	let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::<u8>::new()));
	let options = zip::write::FileOptions::default();
	for (path, content) in files {
		zip.start_file(*path, options)?;
		zip.write_all(content)?;
	}
	Ok(zip.finish()?.into_inner())
}

/// Builds a gzip compressed tar archive holding `files` as (path, content) pairs.
pub fn tar_gz_archive(files: &[(&str, &[u8])]) -> Result<Vec<u8>, FixtureError> {
	let gz = flate2::write::GzEncoder::new(Vec::<u8>::new(), flate2::Compression::default());
	let mut tar = tar::Builder::new(gz);
	for (path, content) in files {
		let mut header = tar::Header::new_gnu();
		header.set_size(content.len() as u64);
		header.set_mode(0o644);
		header.set_entry_type(tar::EntryType::Regular);
		tar.append_data(&mut header, path, *content)?;
	}
	Ok(tar.into_inner()?.finish()?)
}

/// A channel document listing `repositories`.
pub fn channel_document(repositories: &[&str]) -> Result<Vec<u8>, FixtureError> {
	Ok(serde_json::to_vec(repositories)?)
}

/// A version entry of a repository document.
pub fn version_entry(version: &str, url: &str, require: &[(&str, &str)]) -> serde_json::Value {
	let require: serde_json::Map<String, serde_json::Value> = require.iter()
		.map(|(name, range)| (name.to_string(), serde_json::Value::from(*range)))
		.collect();
	serde_json::json!({
		"Version": version,
		"Url": url,
		"Require": require,
	})
}

/// A package entry of a repository document.
pub fn package_entry(name: &str, versions: Vec<serde_json::Value>) -> serde_json::Value {
	serde_json::json!({
		"Name": name,
		"Description": format!("The {} plugin", name),
		"Author": "plugin-rs tests",
		"Tags": [],
		"Versions": versions,
	})
}

/// A repository document holding `packages`.
pub fn repository_document(packages: Vec<serde_json::Value>) -> Result<Vec<u8>, FixtureError> {
	Ok(serde_json::to_vec(&packages)?)
}

/// Config keeping every directory under `dir`, reading `channels` and allowing plain HTTP.
pub fn test_config(dir: &Path, channels: &[&str]) -> plugin_rs::Config {
	let mut config = plugin_rs::Config::default();
	config.set_channels(channels.iter().map(|c| c.to_string()).collect());
	config.set_plugin_dir(dir.join("plugins"));
	config.set_download_dir(dir.join("downloads"));
	config.set_https_only(false);
	config.set_fetch_timeout(Duration::from_secs(5));
	config
}
