//! Decoding of channel and repository documents.
//!
//! Documents are JSON5 so comments and trailing commas are fine.
//! Field names follow the repository format (`Name`, `Versions`, ...) with lower case accepted too.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use super::package::*;
use super::Repository;

#[derive(Debug, Error)]
pub enum DecodeError {
	#[error("document is not valid UTF-8: {0}")]
	Utf8(#[from] std::str::Utf8Error),
	#[error("JSON5 error: {0}")]
	Json5(#[from] json5::Error),
}

#[derive(Debug, Deserialize)]
struct RawPackage {
	#[serde(rename = "Name", alias = "name")]
	name: String,
	#[serde(rename = "Description", alias = "description", default)]
	description: Option<String>,
	#[serde(rename = "Author", alias = "author", default)]
	author: Option<String>,
	#[serde(rename = "Tags", alias = "tags", default)]
	tags: Option<Vec<String>>,
	#[serde(rename = "Versions", alias = "versions", default)]
	versions: Option<Vec<RawVersion>>,
}

#[derive(Debug, Deserialize)]
struct RawVersion {
	#[serde(rename = "Version", alias = "version")]
	version: String,
	#[serde(rename = "Url", alias = "url", alias = "URL", default)]
	url: Option<String>,
	#[serde(rename = "Require", alias = "require", default)]
	require: Option<BTreeMap<String, String>>,
	#[serde(rename = "Sha256", alias = "sha256", default)]
	sha256: Option<String>,
}

/// Decodes a channel document, a list of repository addresses.
pub fn decode_channel(data: &[u8]) -> Result<Vec<Repository>, DecodeError> {
	let text = std::str::from_utf8(data)?;
	Ok(json5::from_str::<Vec<Repository>>(text)?)
}

/// Decodes a repository document, a list of packages.
///
/// Individual entries that don't make sense are skipped with a warning rather than failing the whole document:
/// - versions whose version number can't be parsed.
/// - versions repeating a version number already seen for the package.
/// - requirements whose range can't be parsed.
pub fn decode_repository(data: &[u8]) -> Result<Vec<Package>, DecodeError> {
	let text = std::str::from_utf8(data)?;
	let raw = json5::from_str::<Vec<RawPackage>>(text)?;
	Ok(raw.into_iter().map(convert_package).collect())
}

fn convert_package(raw: RawPackage) -> Package {
	let mut versions = Vec::<PackageVersion>::new();

	for raw_version in raw.versions.unwrap_or_default() {
		let version = match parse_tolerant(&raw_version.version) {
			Ok(v) => v,
			Err(e) => {
				log::warn!("Skipping version of package {}: {}", raw.name, e);
				continue;
			},
		};

		if versions.iter().any(|v| same_version(&v.version, &version)) {
			log::warn!("Package {} lists version {} more than once, keeping the first.", raw.name, version);
			continue;
		}

		let mut require = Vec::<Dependency>::new();
		for (name, range) in raw_version.require.unwrap_or_default() {
			match Range::parse(&range) {
				Ok(range) => require.push(Dependency::new(name, range)),
				Err(e) => log::warn!("Ignoring requirement on {} by {} {}: {}", name, raw.name, version, e),
			}
		}

		versions.push(PackageVersion {
			package: raw.name.clone(),
			version,
			url: raw_version.url.unwrap_or_default(),
			require,
			sha256: raw_version.sha256,
		});
	}

	Package {
		name: raw.name,
		description: raw.description.unwrap_or_default(),
		author: raw.author.unwrap_or_default(),
		tags: raw.tags.unwrap_or_default(),
		versions,
	}
}
