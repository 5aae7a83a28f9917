//! Various types associated with packages.

use serde::{Serialize, Deserialize};

mod plugin_version;
pub use plugin_version::VersionError;
pub use plugin_version::parse_tolerant;
pub use plugin_version::installed_version;
pub use plugin_version::same_version;

mod version_range;
pub use version_range::Range;
pub use version_range::RangeError;
pub use version_range::Comparator;

mod dependency;
pub use dependency::Dependency;

/// A named plugin and every version published for it.
///
/// Identity is the name alone, a catalog holds at most one package per name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Package {
	pub name: String,
	pub description: String,
	pub author: String,
	pub tags: Vec<String>,
	pub versions: Vec<PackageVersion>,
}

impl std::hash::Hash for Package {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.name.hash(state);
	}
}

impl std::cmp::PartialEq for Package {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name
	}
}

impl std::cmp::Eq for Package {}

impl Package {
	/// All versions sorted newest first.
	pub fn versions_newest_first(&self) -> Vec<&PackageVersion> {
		let mut versions: Vec<_> = self.versions.iter().collect();
		versions.sort_by(|a, b| b.version.cmp_precedence(&a.version));
		versions
	}

	pub fn latest(&self) -> Option<&PackageVersion> {
		self.versions.iter().max_by(|a, b| a.version.cmp_precedence(&b.version))
	}
}

impl std::fmt::Display for Package {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		writeln!(f, "Plugin: {}", self.name)?;
		if !self.author.is_empty() {
			writeln!(f, "Author: {}", self.author)?;
		}
		if !self.description.is_empty() {
			write!(f, "{}", self.description)?;
		}
		Ok(())
	}
}

/// A single published release of a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageVersion {
	/// Name of the package this version belongs to.
	pub package: String,
	pub version: semver::Version,
	/// Where the archive for this version is downloaded from.
	pub url: String,
	pub require: Vec<Dependency>,
	/// Hex encoded SHA-256 of the archive when the repository publishes one.
	pub sha256: Option<String>,
}

impl PackageVersion {
	/// A version with no download and no requirements.
	///
	/// Used for things that are already present, such as the host itself or plugins already loaded.
	pub fn fixed(package: impl Into<String>, version: semver::Version) -> Self {
		Self {
			package: package.into(),
			version,
			url: String::new(),
			require: Vec::new(),
			sha256: None,
		}
	}

	/// Same as [`fixed`](PackageVersion::fixed) but from whatever version text the plugin reports.
	pub fn installed(package: impl Into<String>, version: &str) -> Self {
		Self::fixed(package, installed_version(version))
	}
}

impl std::cmp::PartialEq for PackageVersion {
	fn eq(&self, other: &Self) -> bool {
		self.package == other.package && same_version(&self.version, &other.version)
	}
}

impl std::fmt::Display for PackageVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.package, self.version)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn v(s: &str) -> semver::Version { semver::Version::parse(s).unwrap() }

	fn package(versions: &[&str]) -> Package {
		Package {
			name: "fmt-tool".to_string(),
			versions: versions.iter().map(|s| PackageVersion::fixed("fmt-tool", v(s))).collect(),
			..Default::default()
		}
	}

	#[test]
	fn versions_sorted_newest_first() {
		let p = package(&["1.0.0", "2.0.0", "1.2.0", "2.0.0-rc.1"]);
		let order: Vec<String> = p.versions_newest_first().iter().map(|v| v.version.to_string()).collect();
		assert_eq!(order, ["2.0.0", "2.0.0-rc.1", "1.2.0", "1.0.0"]);
	}

	#[test]
	fn latest_version() {
		assert_eq!(package(&["1.0.0", "1.10.0", "1.9.0"]).latest().unwrap().version, v("1.10.0"));
		assert!(package(&[]).latest().is_none());
	}

	#[test]
	fn display_skips_empty_fields() {
		let mut p = package(&[]);
		assert_eq!(p.to_string(), "Plugin: fmt-tool\n");
		p.author = "someone".to_string();
		p.description = "Formats things.".to_string();
		assert_eq!(p.to_string(), "Plugin: fmt-tool\nAuthor: someone\nFormats things.");
	}
}
