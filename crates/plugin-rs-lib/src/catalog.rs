//! # Plugin catalog
//!
//! Packages are published by repositories, repositories are listed by channels.
//! The catalog is the merged view of every package reachable from the configured channels.
//!
//! Fetching is done once and cached by [`CatalogCache`] for as long as it lives.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

pub mod package;
use package::*;

pub mod fetch;
pub use fetch::Fetch;
pub use fetch::HttpFetcher;

pub mod decode;

mod aggregate;
pub use aggregate::fetch_all_sources;

/// Address of a document listing repositories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(pub String);

/// Address of a document listing packages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Repository(pub String);

impl std::fmt::Display for Channel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::fmt::Display for Repository {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Every known package keyed by name.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
	packages: HashMap<String, Package>,
}

impl Catalog {
	/// Merges packages into a catalog.
	///
	/// Packages sharing a name replace the one seen before them.
	pub fn from_packages(packages: impl IntoIterator<Item = Package>) -> Self {
		let mut map = HashMap::<String, Package>::new();
		for package in packages {
			if let Some(previous) = map.insert(package.name.clone(), package) {
				log::debug!("Package {} published by more than one repository, using the last fetched.", previous.name);
			}
		}
		Self { packages: map }
	}

	pub fn get(&self, name: &str) -> Option<&Package> {
		self.packages.get(name)
	}

	pub fn packages(&self) -> impl Iterator<Item = &Package> {
		self.packages.values()
	}

	pub fn len(&self) -> usize {
		self.packages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.packages.is_empty()
	}

	/// All versions of `name` newest first, empty when the package is unknown.
	pub fn versions_of(&self, name: &str) -> Vec<&PackageVersion> {
		self.get(name)
			.map(|p| p.versions_newest_first())
			.unwrap_or_default()
	}

	/// Packages whose name matches `text`, a case-insensitive regular expression.
	///
	/// Text that isn't a valid expression is matched literally instead. Results are sorted by name.
	pub fn search(&self, text: &str) -> Vec<&Package> {
		let Some(matcher) = name_matcher(text) else {
			return Vec::new();
		};
		let mut found: Vec<_> = self.packages()
			.filter(|p| matcher.is_match(&p.name))
			.collect();
		found.sort_by(|a, b| a.name.cmp(&b.name));
		found
	}
}

fn name_matcher(text: &str) -> Option<regex::Regex> {
	regex::Regex::new(&format!("(?i){}", text))
		.or_else(|_| regex::Regex::new(&format!("(?i){}", regex::escape(text))))
		.ok()
}

/// Lazily fetched catalog shared by everything needing package information.
///
/// The first call to [`fetch_catalog()`](CatalogCache::fetch_catalog) fetches every source,
/// callers arriving while that is in progress wait for it instead of fetching again.
pub struct CatalogCache {
	fetcher: Arc<dyn Fetch>,
	channels: Vec<Channel>,
	timeout: std::time::Duration,
	catalog: tokio::sync::Mutex<Option<Arc<Catalog>>>,
}

impl CatalogCache {
	pub fn new(fetcher: Arc<dyn Fetch>, channels: Vec<Channel>, timeout: std::time::Duration) -> Self {
		Self {
			fetcher,
			channels,
			timeout,
			catalog: tokio::sync::Mutex::new(None),
		}
	}

	pub fn from_config(config: &crate::Config, fetcher: Arc<dyn Fetch>) -> Self {
		let channels = config.channels().iter().cloned().map(Channel).collect();
		Self::new(fetcher, channels, config.fetch_timeout())
	}

	/// Returns the cached catalog, fetching it first if needed.
	///
	/// Dropping the returned future before it completes cancels any fetches still running.
	pub async fn fetch_catalog(&self) -> Arc<Catalog> {
		let mut guard = self.catalog.lock().await;
		if let Some(catalog) = guard.as_ref() {
			return catalog.clone();
		}

		log::info!("Fetching plugin catalog from {} channel(s)", self.channels.len());
		let packages = fetch_all_sources(self.fetcher.clone(), &self.channels, self.timeout).await;
		let catalog = Arc::new(Catalog::from_packages(packages));
		log::info!("Plugin catalog contains {} package(s)", catalog.len());

		*guard = Some(catalog.clone());
		catalog
	}

	/// Drops the cached catalog so the next call fetches again.
	pub async fn invalidate(&self) {
		*self.catalog.lock().await = None;
	}

	pub async fn is_populated(&self) -> bool {
		self.catalog.lock().await.is_some()
	}
}
