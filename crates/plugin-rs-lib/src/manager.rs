//! The operations a host exposes to its users: install, update, uninstall and search.
//!
//! Every operation asks the [`VersionOracle`] afresh for what is installed,
//! the catalog is fetched on first use and reused afterwards.

use std::sync::Arc;

use crate::catalog::{CatalogCache, Catalog, Fetch};
use crate::catalog::package::*;
use crate::installation::{Installer, InstallOutcome};
use crate::relationship_resolver::{Resolution, Resolver};
use crate::VersionOracle;

/// Committed versions for installing a single package: the host and every loaded extension as installed.
pub fn installed_selection(oracle: &dyn VersionOracle) -> Resolution {
	let mut selection = host_selection(oracle);
	for name in oracle.loaded_extensions() {
		let version = oracle.installed_version(&name).unwrap_or_default();
		selection.insert(PackageVersion::installed(name, &version));
	}
	selection
}

/// Committed versions for updating: only the host.
pub fn host_selection(oracle: &dyn VersionOracle) -> Resolution {
	Resolution::from_iter([PackageVersion::installed(oracle.host_name(), &oracle.host_version())])
}

/// One requirement per loaded extension asking for its installed version or anything newer.
///
/// Extensions the catalog doesn't publish and extensions reporting an unreadable version are left alone.
pub fn update_requirements(oracle: &dyn VersionOracle, catalog: &Catalog) -> Vec<Dependency> {
	let mut requirements = Vec::<Dependency>::new();
	for name in oracle.loaded_extensions() {
		if catalog.get(&name).is_none() {
			log::info!("{} is not published by any repository, not updating it", name);
			continue;
		}
		let installed = oracle.installed_version(&name).unwrap_or_default();
		match parse_tolerant(&installed) {
			Ok(version) => requirements.push(Dependency::new(name, Range::at_least(version))),
			Err(e) => log::warn!("Not updating {}: {}", name, e),
		}
	}
	requirements
}

pub struct PluginManager {
	catalog: CatalogCache,
	installer: Installer,
	oracle: Arc<dyn VersionOracle>,
}

impl PluginManager {
	/// # Parameters
	/// - `config` - Channels, plugin directory and download options.
	/// - `fetcher` - Used for catalog documents and archives alike.
	/// - `oracle` - The host's view of itself and its loaded extensions.
	pub fn new(config: &crate::Config, fetcher: Arc<dyn Fetch>, oracle: Arc<dyn VersionOracle>) -> Self {
		Self {
			catalog: CatalogCache::from_config(config, fetcher.clone()),
			installer: Installer::new(config, fetcher),
			oracle,
		}
	}

	/// Installs the newest version of `name` compatible with the host and everything already installed.
	///
	/// # Errors
	/// - [`Resolution`](crate::Error::Resolution) when no compatible version exists, nothing is installed.
	/// - [`Install`](crate::Error::Install) naming the package that failed to install.
	pub async fn install(&self, name: &str) -> crate::Result<InstallOutcome> {
		let catalog = self.catalog.fetch_catalog().await;
		let selected = installed_selection(self.oracle.as_ref());
		let resolution = Resolver::new(&catalog).resolve(selected, [Dependency::any(name)])?;
		log::info!("Installing {} as {}", name, resolution);
		Ok(self.installer.install(&resolution, self.oracle.as_ref()).await?)
	}

	/// Moves every loaded extension to the newest version compatible with the host and each other.
	pub async fn update_all(&self) -> crate::Result<InstallOutcome> {
		let catalog = self.catalog.fetch_catalog().await;
		let selected = host_selection(self.oracle.as_ref());
		let requirements = update_requirements(self.oracle.as_ref(), &catalog);
		let resolution = Resolver::new(&catalog).resolve(selected, requirements)?;
		log::info!("Updating to {}", resolution);
		Ok(self.installer.install(&resolution, self.oracle.as_ref()).await?)
	}

	/// Removes an installed plugin.
	///
	/// # Errors
	/// [`NotFound`](crate::Error::NotFound) when the host doesn't report the plugin as installed.
	pub async fn uninstall(&self, name: &str) -> crate::Result<()> {
		if self.oracle.installed_version(name).is_none() {
			return Err(crate::Error::NotFound(name.to_string()));
		}
		self.installer.uninstall(name).await?;
		Ok(())
	}

	/// Packages matching `text` that could be installed right now without a conflict.
	pub async fn search(&self, text: &str) -> Vec<Package> {
		let catalog = self.catalog.fetch_catalog().await;
		let selected = installed_selection(self.oracle.as_ref());
		let resolver = Resolver::new(&catalog);
		catalog.search(text)
			.into_iter()
			.filter(|p| resolver.resolve(selected.clone(), [Dependency::any(&p.name)]).is_ok())
			.cloned()
			.collect()
	}

	/// Loaded extensions and the version each reports, sorted by name.
	pub fn installed(&self) -> Vec<(String, Option<String>)> {
		let mut names = self.oracle.loaded_extensions();
		names.sort();
		names.into_iter()
			.map(|name| {
				let version = self.oracle.installed_version(&name);
				(name, version)
			})
			.collect()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	struct Host {
		installed: Vec<(&'static str, &'static str)>,
	}

	impl VersionOracle for Host {
		fn host_name(&self) -> &str { "host" }
		fn host_version(&self) -> String { "2.1.0".to_string() }
		fn loaded_extensions(&self) -> Vec<String> { self.installed.iter().map(|(n, _)| n.to_string()).collect() }
		fn installed_version(&self, name: &str) -> Option<String> {
			self.installed.iter().find(|(n, _)| *n == name).map(|(_, v)| v.to_string())
		}
	}

	fn v(s: &str) -> semver::Version { semver::Version::parse(s).unwrap() }

	fn catalog(names: &[&str]) -> Catalog {
		Catalog::from_packages(names.iter().map(|n| Package {
			name: n.to_string(),
			versions: vec![PackageVersion::fixed(*n, v("1.0.0"))],
			..Default::default()
		}))
	}

	#[test]
	fn installed_selection_includes_host_and_plugins() {
		let host = Host { installed: vec![("linter", "1.2"), ("fmt-tool", "dev-build")] };
		let selection = installed_selection(&host);
		assert_eq!(selection.len(), 3);
		assert_eq!(selection.get("host").unwrap().version, v("2.1.0"));
		assert_eq!(selection.get("linter").unwrap().version, v("1.2.0"));
		assert_eq!(selection.get("fmt-tool").unwrap().version, v("0.0.0-dev-build"));
	}

	#[test]
	fn host_selection_is_host_only() {
		let host = Host { installed: vec![("linter", "1.2.0")] };
		let selection = host_selection(&host);
		assert_eq!(selection.len(), 1);
		assert!(selection.contains("host"));
	}

	#[test]
	fn update_requirements_ask_for_newer() {
		let host = Host { installed: vec![("linter", "1.2.0"), ("fmt-tool", "not-a-version"), ("local-only", "1.0.0")] };
		let requirements = update_requirements(&host, &catalog(&["linter", "fmt-tool"]));
		assert_eq!(requirements.len(), 1);
		assert_eq!(requirements[0].name, "linter");
		assert!(requirements[0].is_satisfied_by(&v("1.2.0")));
		assert!(requirements[0].is_satisfied_by(&v("1.3.0")));
		assert!(!requirements[0].is_satisfied_by(&v("1.1.0")));
	}
}
