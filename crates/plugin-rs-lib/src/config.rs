//! Library configuration.
//!
//! The configuration is stored as JSON in the plugin-rs config directory.
//! Channels are read once at startup and never change for the life of the process.

use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

/// Channel queried when no channels are configured.
pub const DEFAULT_CHANNEL: &str = "https://plugins.example.org/channel.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	channels: Vec<String>,
	plugin_dir: PathBuf,
	download_dir: PathBuf,
	https_only: bool,
	do_checksums: bool,
	fetch_timeout_secs: u64,
}

#[cfg(target_os = "windows")]
fn base_dir(_xdg_var: &str, _home_fallback: &str) -> PathBuf {
	std::env::var("APPDATA")
		.map(PathBuf::from)
		.unwrap_or_else(|_| PathBuf::from("."))
		.join("plugin-rs")
}

#[cfg(not(target_os = "windows"))]
fn base_dir(xdg_var: &str, home_fallback: &str) -> PathBuf {
	let path = if let Ok(e) = std::env::var(xdg_var) {
		PathBuf::from(e)
	} else if let Ok(home) = std::env::var("HOME") {
		PathBuf::from(home).join(home_fallback)
	} else {
		PathBuf::from(".")
	};
	path.join("plugin-rs")
}

impl Default for Config {
	fn default() -> Self {
		Self {
			channels: vec![DEFAULT_CHANNEL.to_string()],
			plugin_dir: base_dir("XDG_DATA_HOME", ".local/share").join("plugins"),
			download_dir: base_dir("XDG_CACHE_HOME", ".cache").join("downloads"),
			https_only: true,
			do_checksums: true,
			fetch_timeout_secs: 30,
		}
	}
}

impl Config {
	/// Path of the config file on disk.
	pub fn config_path() -> PathBuf {
		base_dir("XDG_CONFIG_HOME", ".config").join("config.json")
	}

	/// Loads the config from the default location.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when the file is missing or unreadable.
	/// - [`SerdeJSON`](crate::Error::SerdeJSON) when the file is not a valid config.
	pub fn load_from_disk() -> crate::Result<Self> {
		Self::load_from_file(Self::config_path())
	}

	pub fn load_from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
		let file = std::fs::File::open(path)?;
		Ok(serde_json::from_reader(file)?)
	}

	pub fn save_to_disk(&self) -> crate::Result<()> {
		self.save_to_file(Self::config_path())
	}

	pub fn save_to_file(&self, path: impl AsRef<Path>) -> crate::Result<()> {
		let path = path.as_ref();
		std::fs::create_dir_all(path.with_file_name(""))?;
		let file = std::fs::File::create(path)?;
		serde_json::to_writer_pretty(file, self)?;
		Ok(())
	}

	pub fn channels(&self) -> &[String] {
		&self.channels
	}
	pub fn set_channels(&mut self, channels: Vec<String>) {
		self.channels = channels;
	}

	/// Root directory holding one directory per installed plugin.
	pub fn plugin_dir(&self) -> &Path {
		&self.plugin_dir
	}
	pub fn set_plugin_dir(&mut self, plugin_dir: PathBuf) {
		self.plugin_dir = plugin_dir;
	}

	pub fn download_dir(&self) -> &Path {
		&self.download_dir
	}
	pub fn set_download_dir(&mut self, download_dir: PathBuf) {
		self.download_dir = download_dir;
	}

	pub fn https_only(&self) -> bool {
		self.https_only
	}
	pub fn set_https_only(&mut self, https_only: bool) {
		self.https_only = https_only;
	}

	pub fn get_do_checksums(&self) -> bool {
		self.do_checksums
	}
	pub fn set_do_checksums(&mut self, do_checksums: bool) {
		self.do_checksums = do_checksums;
	}

	/// Upper bound for a single channel, repository or archive fetch.
	pub fn fetch_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.fetch_timeout_secs)
	}
	pub fn set_fetch_timeout(&mut self, timeout: std::time::Duration) {
		self.fetch_timeout_secs = timeout.as_secs();
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn config_round_trips_through_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("config.json");

		let mut config = Config::default();
		config.set_channels(vec!["https://a.example/channel.json".to_string()]);
		config.set_fetch_timeout(std::time::Duration::from_secs(5));
		config.save_to_file(&path).unwrap();

		let loaded = Config::load_from_file(&path).unwrap();
		assert_eq!(loaded.channels(), config.channels());
		assert_eq!(loaded.fetch_timeout(), std::time::Duration::from_secs(5));
		assert_eq!(loaded.plugin_dir(), config.plugin_dir());
	}

	#[test]
	fn missing_fields_use_defaults() {
		let config: Config = serde_json::from_str(r#"{ "https_only": false }"#).unwrap();
		assert!(!config.https_only());
		assert_eq!(config.channels(), &[DEFAULT_CHANNEL.to_string()]);
		assert_eq!(config.fetch_timeout(), std::time::Duration::from_secs(30));
	}
}
