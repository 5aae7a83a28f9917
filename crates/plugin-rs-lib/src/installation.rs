//! Making the plugin directory match a resolution.
//!
//! # Process
//! For every version the resolver chose that isn't the host and isn't already installed:
//! 1. Download the archive of the chosen version.
//! 1. Remove whatever is installed for the package.
//! 1. Extract the archive into the package directory and record the installed version.
//!
//! Versions that were committed before resolving, such as loaded extensions, are never touched.
//!
//! The first package failing stops the whole batch. Packages installed before it stay installed.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::catalog::Fetch;
use crate::catalog::package::*;
use crate::relationship_resolver::Resolution;

pub mod download;
pub use download::DownloadError;

pub mod content;
pub use content::ContentError;

pub mod storage;
pub use storage::LocalStorage;
pub use storage::DirectoryOracle;

/// A failure installing or removing a single package.
#[derive(Debug, Error)]
pub enum InstallError {
	#[error("failed to download \"{name}\": {source}")]
	Download {
		name: String,
		#[source]
		source: DownloadError,
	},
	#[error("failed to extract \"{name}\": {source}")]
	Content {
		name: String,
		#[source]
		source: ContentError,
	},
	#[error("failed to update files of \"{name}\": {source}")]
	IO {
		name: String,
		#[source]
		source: std::io::Error,
	},
}

impl InstallError {
	/// Name of the package that failed.
	pub fn package(&self) -> &str {
		match self {
			InstallError::Download { name, .. }
			| InstallError::Content { name, .. }
			| InstallError::IO { name, .. } => name,
		}
	}
}

/// What an install did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
	/// These packages were installed, the host has to restart to load them.
	RestartRequired(Vec<String>),
	/// Everything already matched, nothing was touched.
	UpToDate,
}

impl std::fmt::Display for InstallOutcome {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			InstallOutcome::RestartRequired(names) => write!(f, "Installed {}. Please restart to load the changes.", names.join(", ")),
			InstallOutcome::UpToDate => write!(f, "All plugins are up to date."),
		}
	}
}

/// Applies resolutions to a [`LocalStorage`].
///
/// Work on any one package directory is serialised, two installs touching the same package run one after the other.
pub struct Installer {
	storage: LocalStorage,
	fetcher: Arc<dyn Fetch>,
	download: download::DownloadOptions,
	locks: LockMap,
}

type LockMap = std::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Exclusive access to one package directory.
///
/// The lock entry is dropped from the map once nobody holds or waits on it.
struct PackageGuard<'i> {
	locks: &'i LockMap,
	name: String,
	guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for PackageGuard<'_> {
	fn drop(&mut self) {
		self.guard.take();
		let mut locks = match self.locks.lock() {
			Ok(locks) => locks,
			Err(poisoned) => poisoned.into_inner(),
		};
		if locks.get(&self.name).map_or(false, |lock| Arc::strong_count(lock) == 1) {
			locks.remove(&self.name);
		}
	}
}

impl Installer {
	pub fn new(config: &crate::Config, fetcher: Arc<dyn Fetch>) -> Self {
		Self {
			storage: LocalStorage::new(config.plugin_dir()),
			fetcher,
			download: download::DownloadOptions {
				download_dir: config.download_dir().to_path_buf(),
				do_checksums: config.get_do_checksums(),
				timeout: config.fetch_timeout(),
			},
			locks: Default::default(),
		}
	}

	pub fn storage(&self) -> &LocalStorage {
		&self.storage
	}

	async fn lock_package(&self, name: &str) -> PackageGuard<'_> {
		let lock = {
			let mut locks = match self.locks.lock() {
				Ok(locks) => locks,
				Err(poisoned) => poisoned.into_inner(),
			};
			locks.entry(name.to_string()).or_default().clone()
		};
		PackageGuard {
			locks: &self.locks,
			name: name.to_string(),
			guard: Some(lock.lock_owned().await),
		}
	}

	/// Number of packages currently locked or waited on.
	pub fn lock_count(&self) -> usize {
		match self.locks.lock() {
			Ok(locks) => locks.len(),
			Err(poisoned) => poisoned.into_inner().len(),
		}
	}

	/// Installs every version the resolver chose that differs from what `oracle` reports as installed.
	///
	/// The host and versions committed before resolving are skipped.
	///
	/// # Errors
	/// The [`InstallError`] of the first package that failed. Nothing after it is attempted.
	pub async fn install(&self, resolution: &Resolution, oracle: &dyn crate::VersionOracle) -> Result<InstallOutcome, InstallError> {
		let mut installed = Vec::<String>::new();

		for version in resolution.chosen() {
			if version.package == oracle.host_name() {
				continue;
			}

			if let Some(current) = oracle.installed_version(&version.package) {
				if same_version(&installed_version(&current), &version.version) {
					log::debug!("{} already installed", version);
					continue;
				}
				log::info!("Replacing {} {} with {}", version.package, current, version.version);
			}

			self.install_version(version).await?;
			installed.push(version.package.clone());
		}

		Ok(if installed.is_empty() {
			InstallOutcome::UpToDate
		} else {
			InstallOutcome::RestartRequired(installed)
		})
	}

	/// Installs a single version, replacing whatever is installed for the package.
	///
	/// The previous installation is only removed once the new archive is downloaded.
	/// A package directory left half written by a failure is removed before returning the error.
	pub async fn install_version(&self, version: &PackageVersion) -> Result<(), InstallError> {
		let name = version.package.as_str();
		let io_err = |source| InstallError::IO { name: name.to_string(), source };

		let _guard = self.lock_package(name).await;

		let package_dir = self.storage.package_dir(name).map_err(io_err)?;

		let archive = download::download_package(&self.download, self.fetcher.as_ref(), version)
			.await
			.map_err(|source| InstallError::Download { name: name.to_string(), source })?;

		self.storage.remove(name).map_err(io_err)?;

		log::info!("Extracting {} to {}", version, package_dir.display());
		let extracted = content::extract_archive(&archive, &package_dir)
			.map_err(|source| InstallError::Content { name: name.to_string(), source })
			.and_then(|_| self.storage.write_version(name, &version.version).map_err(io_err));

		if let Err(e) = extracted {
			if let Err(cleanup) = self.storage.remove(name) {
				log::warn!("Failed to clean up {} after failed install: {}", package_dir.display(), cleanup);
			}
			return Err(e);
		}

		log::info!("Installed {}", version);
		Ok(())
	}

	/// Removes a package directory, doing nothing if it isn't installed.
	pub async fn uninstall(&self, name: &str) -> Result<(), InstallError> {
		let _guard = self.lock_package(name).await;
		self.storage.remove(name)
			.map_err(|source| InstallError::IO { name: name.to_string(), source })
	}
}
