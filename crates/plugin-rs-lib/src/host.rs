//! The view of the host application needed to plan installs and updates.

/// Default name of the synthetic package standing in for the host application.
pub const DEFAULT_HOST_NAME: &str = "host";

/// Queries the running host application about itself and its loaded extensions.
///
/// Nothing returned from here is cached, every resolve asks again as local state may have changed.
pub trait VersionOracle: Send + Sync {
	/// Name plugins use to place a requirement on the host itself.
	fn host_name(&self) -> &str;
	/// Version string of the running host.
	fn host_version(&self) -> String;
	/// Names of the extensions currently loaded.
	fn loaded_extensions(&self) -> Vec<String>;
	/// Version string a loaded extension reports, `None` when not installed.
	fn installed_version(&self, name: &str) -> Option<String>;
}
