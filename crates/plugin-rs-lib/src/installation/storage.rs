//! Layout of installed plugins on disk.
//!
//! Every plugin lives in its own directory directly under the plugin root, named after the package.
//! The installed version is recorded in a marker file inside that directory.

use std::path::{Path, PathBuf};

/// Name of the file recording which version of a plugin is installed.
pub const VERSION_MARKER: &str = ".plugin-version";

#[derive(Debug, Clone)]
pub struct LocalStorage {
	root: PathBuf,
}

impl LocalStorage {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Directory a plugin is installed to.
	///
	/// # Errors
	/// [`InvalidInput`](std::io::ErrorKind::InvalidInput) when the name isn't usable as a single directory name.
	pub fn package_dir(&self, name: &str) -> std::io::Result<PathBuf> {
		let mut components = Path::new(name).components();
		match (components.next(), components.next()) {
			(Some(std::path::Component::Normal(part)), None) if part == name => Ok(self.root.join(name)),
			_ => Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("\"{}\" is not a valid plugin name", name))),
		}
	}

	/// Removes a plugin directory and everything in it.
	///
	/// Removing a plugin that isn't installed is not an error.
	pub fn remove(&self, name: &str) -> std::io::Result<()> {
		let dir = self.package_dir(name)?;
		match std::fs::remove_dir_all(&dir) {
			Ok(()) => {
				log::info!("Removed {}", dir.display());
				Ok(())
			},
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e),
		}
	}

	pub fn write_version(&self, name: &str, version: &semver::Version) -> std::io::Result<()> {
		std::fs::write(self.package_dir(name)?.join(VERSION_MARKER), version.to_string())
	}

	/// Version recorded for a plugin, `None` when it isn't installed or has no marker.
	pub fn read_version(&self, name: &str) -> Option<String> {
		let dir = self.package_dir(name).ok()?;
		std::fs::read_to_string(dir.join(VERSION_MARKER))
			.ok()
			.map(|v| v.trim().to_string())
	}

	/// Names of every plugin directory under the root, sorted.
	pub fn installed_packages(&self) -> Vec<String> {
		let entries = match std::fs::read_dir(&self.root) {
			Ok(entries) => entries,
			Err(e) => {
				if e.kind() != std::io::ErrorKind::NotFound {
					log::warn!("Failed to read plugin directory {}: {}", self.root.display(), e);
				}
				return Vec::new();
			},
		};

		let mut names: Vec<String> = entries
			.filter_map(|e| e.ok())
			.filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
			.filter_map(|e| e.file_name().into_string().ok())
			.collect();
		names.sort();
		names
	}
}

/// Host stand-in reading installed plugins from a [`LocalStorage`].
///
/// Every plugin directory counts as a loaded extension. Plugins without a version marker report `"unknown"`.
#[derive(Debug, Clone)]
pub struct DirectoryOracle {
	storage: LocalStorage,
	host_name: String,
	host_version: String,
}

impl DirectoryOracle {
	pub fn new(storage: LocalStorage, host_name: impl Into<String>, host_version: impl Into<String>) -> Self {
		Self {
			storage,
			host_name: host_name.into(),
			host_version: host_version.into(),
		}
	}
}

impl crate::VersionOracle for DirectoryOracle {
	fn host_name(&self) -> &str {
		&self.host_name
	}

	fn host_version(&self) -> String {
		self.host_version.clone()
	}

	fn loaded_extensions(&self) -> Vec<String> {
		self.storage.installed_packages()
	}

	fn installed_version(&self, name: &str) -> Option<String> {
		if !self.storage.package_dir(name).map(|d| d.is_dir()).unwrap_or(false) {
			return None;
		}
		Some(self.storage.read_version(name).unwrap_or_else(|| "unknown".to_string()))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::VersionOracle;

	#[test]
	fn package_dir_rejects_paths() {
		let storage = LocalStorage::new("/plugins");
		assert_eq!(storage.package_dir("linter").unwrap(), PathBuf::from("/plugins/linter"));
		assert!(storage.package_dir("../linter").is_err());
		assert!(storage.package_dir("a/b").is_err());
		assert!(storage.package_dir("").is_err());
		assert!(storage.package_dir(".").is_err());
	}

	#[test]
	fn remove_missing_is_ok() {
		let dir = tempfile::tempdir().unwrap();
		assert!(LocalStorage::new(dir.path()).remove("linter").is_ok());
	}

	#[test]
	fn oracle_reads_markers() {
		let dir = tempfile::tempdir().unwrap();
		let storage = LocalStorage::new(dir.path());
		std::fs::create_dir_all(dir.path().join("linter")).unwrap();
		std::fs::create_dir_all(dir.path().join("fmt-tool")).unwrap();
		storage.write_version("linter", &semver::Version::new(1, 2, 0)).unwrap();

		let oracle = DirectoryOracle::new(storage, "host", "2.1.0");
		assert_eq!(oracle.loaded_extensions(), ["fmt-tool", "linter"]);
		assert_eq!(oracle.installed_version("linter").as_deref(), Some("1.2.0"));
		assert_eq!(oracle.installed_version("fmt-tool").as_deref(), Some("unknown"));
		assert_eq!(oracle.installed_version("missing"), None);
		assert_eq!(oracle.host_version(), "2.1.0");
	}
}
