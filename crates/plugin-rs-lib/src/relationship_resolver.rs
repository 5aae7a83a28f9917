//! Picking one version per package so every requirement is met.
//!
//! # Usage
//! 1. Build the already committed versions as a [`Resolution`], usually the host and whatever is installed.
//! 1. Build the open requirements as a list of [`Dependency`].
//! 1. [`Resolver::resolve()`] to get the complete [`Resolution`] or the [`ResolutionError`] naming the package that couldn't be satisfied.
//!
//! Versions already in the starting resolution are never replaced, a requirement they don't meet fails outright.
//! Every other package is tried newest version first, backtracking only through that package's own versions.

use std::collections::VecDeque;

use thiserror::Error;

use crate::catalog::package::*;

mod resolver;
pub use resolver::Resolver;

/// No version of the named package fits the requirements placed on it.
///
/// `name` is the innermost requirement that couldn't be met, such as the host being too old.
/// `required_by` lists the packages whose newest candidates led to it, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to find a matching version for \"{name}\"")]
pub struct ResolutionError {
	pub name: String,
	pub required_by: Vec<String>,
}

impl ResolutionError {
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into(), required_by: Vec::new() }
	}

	/// Records that the failure ruled out the newest candidate of `package`.
	pub(crate) fn required_by(mut self, package: impl Into<String>) -> Self {
		let package = package.into();
		if package != self.name && self.required_by.first() != Some(&package) {
			self.required_by.insert(0, package);
		}
		self
	}

	/// Package names from the outermost requirement down to the one that failed.
	pub fn chain(&self) -> Vec<&str> {
		self.required_by.iter()
			.map(String::as_str)
			.chain(std::iter::once(self.name.as_str()))
			.collect()
	}
}

/// Chosen versions, at most one per package name, in the order they were chosen.
///
/// Versions present before resolving are committed, the resolver checks them but never replaces them
/// and the installer leaves them alone.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
	versions: Vec<PackageVersion>,
	committed: usize,
}

impl Resolution {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `version`, replacing any version already chosen for the same package.
	///
	/// # Returns
	/// The replaced version if there was one.
	pub fn insert(&mut self, version: PackageVersion) -> Option<PackageVersion> {
		match self.versions.iter_mut().find(|v| v.package == version.package) {
			Some(existing) => Some(std::mem::replace(existing, version)),
			None => {
				self.versions.push(version);
				None
			},
		}
	}

	pub fn get(&self, name: &str) -> Option<&PackageVersion> {
		self.versions.iter().find(|v| v.package == name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	pub fn iter(&self) -> impl Iterator<Item = &PackageVersion> {
		self.versions.iter()
	}

	/// Versions picked by the resolver, everything but the committed ones.
	pub fn chosen(&self) -> impl Iterator<Item = &PackageVersion> {
		self.versions[self.committed..].iter()
	}

	pub fn is_committed(&self, name: &str) -> bool {
		self.versions[..self.committed].iter().any(|v| v.package == name)
	}

	pub fn len(&self) -> usize {
		self.versions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.versions.is_empty()
	}

	/// Marks every version present as committed.
	fn commit(&mut self) {
		self.committed = self.versions.len();
	}

	/* Only the resolver pushes without checking names, it never pushes a name already present. */
	fn push_unchecked(&mut self, version: PackageVersion) {
		self.versions.push(version);
	}

	fn truncate(&mut self, len: usize) {
		self.versions.truncate(len.max(self.committed));
	}
}

/// Equal when the same versions are chosen in the same order.
impl PartialEq for Resolution {
	fn eq(&self, other: &Self) -> bool {
		self.versions == other.versions
	}
}

impl FromIterator<PackageVersion> for Resolution {
	fn from_iter<T: IntoIterator<Item = PackageVersion>>(iter: T) -> Self {
		let mut resolution = Resolution::new();
		for version in iter {
			resolution.insert(version);
		}
		resolution
	}
}

impl IntoIterator for Resolution {
	type Item = PackageVersion;
	type IntoIter = std::vec::IntoIter<PackageVersion>;
	fn into_iter(self) -> Self::IntoIter {
		self.versions.into_iter()
	}
}

impl std::fmt::Display for Resolution {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let names: Vec<String> = self.versions.iter().map(|v| v.to_string()).collect();
		write!(f, "{{{}}}", names.join(", "))
	}
}

/// Merges `additions` into the open requirements.
///
/// A requirement on a package already pending is combined with the pending one so a single version has to meet both,
/// anything else is queued at the back.
pub fn join(open: &mut VecDeque<Dependency>, additions: &[Dependency]) {
	for addition in additions {
		match open.iter_mut().find(|pending| pending.name == addition.name) {
			Some(pending) => pending.range = std::mem::take(&mut pending.range).and(addition.range.clone()),
			None => open.push_back(addition.clone()),
		}
	}
}
