//! Parsing of version numbers as they appear in repositories and as reported by loaded plugins.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid version \"{text}\": {reason}")]
pub struct VersionError {
	pub text: String,
	pub reason: String,
}

/// Parses a version the way repositories publish them.
///
/// A leading `v` is ignored and a short version is padded with zeros, `1.2` becomes `1.2.0`.
/// A short version can't carry prerelease or build metadata.
pub fn parse_tolerant(text: &str) -> Result<semver::Version, VersionError> {
	let trimmed = text.trim();
	let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

	let err = |reason: String| VersionError { text: text.to_string(), reason };

	let mut parts: Vec<&str> = trimmed.splitn(3, '.').collect();
	let padded;
	let full = if parts.len() < 3 {
		let last = parts.last().copied().unwrap_or_default();
		if !last.chars().all(|c| c.is_ascii_digit()) {
			return Err(err("short version cannot contain prerelease or build metadata".to_string()));
		}
		while parts.len() < 3 {
			parts.push("0");
		}
		padded = parts.join(".");
		padded.as_str()
	} else {
		trimmed
	};

	semver::Version::parse(full).map_err(|e| err(e.to_string()))
}

/// Converts whatever a loaded plugin reports as its version into something comparable.
///
/// Falls back to using the text as a prerelease of `0.0.0`, then to `0.0.0-unknown`,
/// so an unreadable version always sorts below any real release.
pub fn installed_version(text: &str) -> semver::Version {
	if let Ok(v) = parse_tolerant(text) {
		return v;
	}
	if let Ok(v) = semver::Version::parse(&format!("0.0.0-{}", text)) {
		return v;
	}
	let mut unknown = semver::Version::new(0, 0, 0);
	unknown.pre = semver::Prerelease::new("unknown").unwrap_or(semver::Prerelease::EMPTY);
	unknown
}

/// Version comparison ignoring build metadata.
pub fn same_version(lhs: &semver::Version, rhs: &semver::Version) -> bool {
	lhs.cmp_precedence(rhs) == std::cmp::Ordering::Equal
}

#[cfg(test)]
mod test {
	use super::*;

	fn v(s: &str) -> semver::Version { semver::Version::parse(s).unwrap() }

	#[test] fn tolerant_full_version() { assert_eq!(parse_tolerant("1.2.3").unwrap(), v("1.2.3")) }
	#[test] fn tolerant_strips_prefix() { assert_eq!(parse_tolerant("v1.2.3").unwrap(), v("1.2.3")) }
	#[test] fn tolerant_pads_short_version() { assert_eq!(parse_tolerant("1.2").unwrap(), v("1.2.0")) }
	#[test] fn tolerant_pads_major_only() { assert_eq!(parse_tolerant(" 4 ").unwrap(), v("4.0.0")) }
	#[test] fn tolerant_keeps_prerelease() { assert_eq!(parse_tolerant("1.0.0-beta.1").unwrap(), v("1.0.0-beta.1")) }
	#[test] fn tolerant_rejects_short_prerelease() { assert!(parse_tolerant("1.0-beta").is_err()) }
	#[test] fn tolerant_rejects_garbage() { assert!(parse_tolerant("latest").is_err()) }
	#[test] fn installed_falls_back_to_prerelease() { assert_eq!(installed_version("nightly"), v("0.0.0-nightly")) }
	#[test] fn installed_empty_is_unknown() { assert_eq!(installed_version(""), v("0.0.0-unknown")) }
	#[test] fn installed_invalid_is_unknown() { assert_eq!(installed_version("what ever"), v("0.0.0-unknown")) }
	#[test] fn installed_sorts_below_releases() { assert!(installed_version("nightly") < v("0.0.1")) }
	#[test] fn same_version_ignores_build() { assert!(same_version(&v("1.0.0+a"), &v("1.0.0+b"))) }
}
