use serde::{Serialize, Deserialize};

use super::Range;

/// A requirement on another package, or on the host itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
	pub name: String,
	pub range: Range,
}

impl Dependency {
	pub fn new(name: impl Into<String>, range: Range) -> Self {
		Self { name: name.into(), range }
	}

	/// Accepts every version of `name`.
	pub fn any(name: impl Into<String>) -> Self {
		Self::new(name, Range::Any)
	}

	pub fn is_satisfied_by(&self, version: &semver::Version) -> bool {
		self.range.accepts(version)
	}

	/// Combines two requirements on the same package into one both must satisfy.
	///
	/// Returns `None` when the requirements target different packages.
	pub fn intersect(&self, other: &Dependency) -> Option<Dependency> {
		if self.name != other.name {
			return None
		}
		Some(Dependency::new(self.name.clone(), self.range.clone().and(other.range.clone())))
	}
}

impl std::fmt::Display for Dependency {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}", self.name, self.range)
	}
}
