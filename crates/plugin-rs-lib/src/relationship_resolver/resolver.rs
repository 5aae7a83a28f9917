use std::collections::VecDeque;

use super::*;
use crate::catalog::Catalog;

/// A package being chosen and the versions of it not yet tried.
struct Choice<'c> {
	name: String,
	candidates: std::vec::IntoIter<&'c PackageVersion>,
	/// Requirements still open once this package is chosen, before adding the chosen version's own.
	open: VecDeque<Dependency>,
	/// Length of the resolution before a candidate was added.
	checkpoint: usize,
	/// Why the first candidate tried was rejected.
	cause: Option<ResolutionError>,
}

/// Resolves requirements against a catalog.
///
/// The search is depth first, every choice point is kept on an explicit stack so deep dependency chains don't grow the call stack.
pub struct Resolver<'c> {
	catalog: &'c Catalog,
}

impl<'c> Resolver<'c> {
	pub fn new(catalog: &'c Catalog) -> Self {
		Self { catalog }
	}

	/// Extends `selected` until every requirement in `open` is met.
	///
	/// Requirements are handled in queue order. A requirement on a package already in `selected` is only checked.
	/// Otherwise each version of the package meeting the requirement is tried newest first,
	/// its own requirements joined into the queue, until the rest of the queue can be resolved.
	///
	/// An empty `open` returns `selected` as is.
	///
	/// # Errors
	/// [`ResolutionError`] naming the innermost requirement that ruled out the newest candidate of the outermost choice,
	/// with the packages that led to it in [`required_by`](ResolutionError::required_by).
	pub fn resolve(&self, selected: Resolution, open: impl IntoIterator<Item = Dependency>) -> Result<Resolution, ResolutionError> {
		let mut selected = selected;
		selected.commit();
		let mut queue = VecDeque::<Dependency>::new();
		join(&mut queue, &open.into_iter().collect::<Vec<_>>());

		let mut stack = Vec::<Choice<'c>>::new();

		loop {
			let Some(requirement) = queue.pop_front() else {
				log::debug!("Resolved {}", selected);
				return Ok(selected);
			};

			if let Some(chosen) = selected.get(&requirement.name) {
				if requirement.is_satisfied_by(&chosen.version) {
					continue;
				}
				log::trace!("{} does not satisfy {}", chosen, requirement);
				let failure = ResolutionError::new(&requirement.name);
				queue = Self::backtrack(&mut stack, &mut selected, failure)?;
				continue;
			}

			let candidates: Vec<&'c PackageVersion> = self.catalog
				.versions_of(&requirement.name)
				.into_iter()
				.filter(|candidate| requirement.is_satisfied_by(&candidate.version))
				.collect();
			log::trace!("{} has {} candidate(s) for {}", requirement.name, candidates.len(), requirement.range);

			let mut choice = Choice {
				name: requirement.name,
				candidates: candidates.into_iter(),
				open: queue,
				checkpoint: selected.len(),
				cause: None,
			};
			queue = match Self::advance(&mut choice, &mut selected) {
				Some(open) => {
					stack.push(choice);
					open
				},
				None => {
					log::debug!("No version of {} fits", choice.name);
					Self::backtrack(&mut stack, &mut selected, ResolutionError::new(choice.name))?
				},
			};
		}
	}

	/// Reports `failure` to the innermost choice and moves on to its next candidate.
	///
	/// Choices running out of candidates are popped and reported as failures to the choice beneath them.
	/// Returns the open queue for the candidate committed, or the failure of the outermost choice.
	fn backtrack(stack: &mut Vec<Choice<'c>>, selected: &mut Resolution, failure: ResolutionError) -> Result<VecDeque<Dependency>, ResolutionError> {
		let mut failure = failure;
		while let Some(mut choice) = stack.pop() {
			choice.cause.get_or_insert(failure);
			if let Some(open) = Self::advance(&mut choice, selected) {
				stack.push(choice);
				return Ok(open);
			}
			log::debug!("No version of {} fits", choice.name);
			failure = match choice.cause {
				Some(cause) => cause.required_by(choice.name),
				None => ResolutionError::new(choice.name),
			};
		}
		Err(failure)
	}

	/// Commits the next untried candidate of `choice`, undoing anything committed since the choice was made.
	fn advance(choice: &mut Choice<'c>, selected: &mut Resolution) -> Option<VecDeque<Dependency>> {
		selected.truncate(choice.checkpoint);
		let candidate = choice.candidates.next()?;
		log::trace!("Trying {}", candidate);
		selected.push_unchecked(candidate.clone());

		let mut open = choice.open.clone();
		join(&mut open, &candidate.require);
		Some(open)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::catalog::Catalog;

	fn v(s: &str) -> semver::Version { semver::Version::parse(s).unwrap() }
	fn dep(name: &str, range: &str) -> Dependency { Dependency::new(name, Range::parse(range).unwrap()) }

	fn version(name: &str, version: &str, require: &[(&str, &str)]) -> PackageVersion {
		PackageVersion {
			require: require.iter().map(|(n, r)| dep(n, r)).collect(),
			..PackageVersion::fixed(name, v(version))
		}
	}

	fn catalog(versions: Vec<PackageVersion>) -> Catalog {
		let mut packages = Vec::<Package>::new();
		for version in versions {
			match packages.iter_mut().find(|p| p.name == version.package) {
				Some(p) => p.versions.push(version),
				None => packages.push(Package { name: version.package.clone(), versions: vec![version], ..Default::default() }),
			}
		}
		Catalog::from_packages(packages)
	}

	fn host(version: &str) -> Resolution {
		Resolution::from_iter([PackageVersion::fixed("host", v(version))])
	}

	#[test]
	fn empty_open_is_identity() {
		let c = catalog(vec![version("a", "1.0.0", &[])]);
		let selected = host("2.1.0");
		assert_eq!(Resolver::new(&c).resolve(selected.clone(), []).unwrap(), selected);
	}

	#[test]
	fn newest_version_preferred() {
		let c = catalog(vec![version("a", "1.0.0", &[]), version("a", "2.0.0", &[]), version("a", "1.2.0", &[])]);
		let resolved = Resolver::new(&c).resolve(Resolution::new(), [dep("a", "*")]).unwrap();
		assert_eq!(resolved.get("a").unwrap().version, v("2.0.0"));
	}

	#[test]
	fn transitive_requirement() {
		let c = catalog(vec![
			version("fmt-tool", "1.0.0", &[]),
			version("fmt-tool", "1.1.0", &[]),
			version("linter", "1.0.0", &[("fmt-tool", ">=1.1.0")]),
		]);
		let resolved = Resolver::new(&c).resolve(Resolution::new(), [Dependency::any("linter")]).unwrap();
		assert_eq!(resolved.len(), 2);
		assert_eq!(resolved.get("linter").unwrap().version, v("1.0.0"));
		assert_eq!(resolved.get("fmt-tool").unwrap().version, v("1.1.0"));
	}

	#[test]
	fn committed_version_is_not_replaced() {
		let c = catalog(vec![version("fmt-tool", "1.0.0", &[]), version("fmt-tool", "1.1.0", &[])]);
		let selected = Resolution::from_iter([PackageVersion::fixed("fmt-tool", v("1.0.0"))]);
		let error = Resolver::new(&c).resolve(selected, [dep("fmt-tool", ">=1.1.0")]).unwrap_err();
		assert_eq!(error.name, "fmt-tool");
		assert!(error.required_by.is_empty());
	}

	#[test]
	fn host_requirement_fails_naming_host() {
		let c = catalog(vec![version("linter", "1.0.0", &[("host", ">=3.0.0")])]);
		let error = Resolver::new(&c).resolve(host("2.1.0"), [Dependency::any("linter")]).unwrap_err();
		assert_eq!(error.name, "host");
		assert_eq!(error.required_by, ["linter"]);
		assert_eq!(error.to_string(), "unable to find a matching version for \"host\"");
	}

	#[test]
	fn nested_failure_names_innermost_requirement() {
		let c = catalog(vec![
			version("linter", "1.0.0", &[("fmt-tool", "*")]),
			version("fmt-tool", "1.0.0", &[("host", ">=3.0.0")]),
		]);
		let error = Resolver::new(&c).resolve(host("2.1.0"), [Dependency::any("linter")]).unwrap_err();
		assert_eq!(error.name, "host");
		assert_eq!(error.chain(), ["linter", "fmt-tool", "host"]);
	}

	#[test]
	fn only_resolved_versions_are_chosen() {
		let c = catalog(vec![version("linter", "1.0.0", &[])]);
		let selected = Resolution::from_iter([PackageVersion::fixed("host", v("2.1.0")), PackageVersion::fixed("legacy", v("0.0.0"))]);
		let resolved = Resolver::new(&c).resolve(selected, [Dependency::any("linter")]).unwrap();
		assert_eq!(resolved.len(), 3);
		assert_eq!(resolved.chosen().map(|v| v.package.as_str()).collect::<Vec<_>>(), ["linter"]);
		assert!(resolved.is_committed("legacy"));
	}

	#[test]
	fn falls_back_to_older_version() {
		let c = catalog(vec![
			version("linter", "1.0.0", &[("host", ">=2.0.0")]),
			version("linter", "2.0.0", &[("host", ">=3.0.0")]),
		]);
		let resolved = Resolver::new(&c).resolve(host("2.1.0"), [Dependency::any("linter")]).unwrap();
		assert_eq!(resolved.get("linter").unwrap().version, v("1.0.0"));
		assert_eq!(resolved.get("host").unwrap().version, v("2.1.0"));
	}

	#[test]
	fn backtracks_through_nested_choices() {
		/* linter 2.0.0 pulls fmt-tool 2.x which needs a newer host, so only linter 1.0.0 works. */
		let c = catalog(vec![
			version("linter", "1.0.0", &[("fmt-tool", "1.x")]),
			version("linter", "2.0.0", &[("fmt-tool", ">=2.0.0")]),
			version("fmt-tool", "1.0.0", &[("host", ">=2.0.0")]),
			version("fmt-tool", "2.0.0", &[("host", ">=3.0.0")]),
			version("fmt-tool", "2.1.0", &[("host", ">=3.0.0")]),
		]);
		let resolved = Resolver::new(&c).resolve(host("2.1.0"), [Dependency::any("linter")]).unwrap();
		assert_eq!(resolved.get("linter").unwrap().version, v("1.0.0"));
		assert_eq!(resolved.get("fmt-tool").unwrap().version, v("1.0.0"));
		assert_eq!(resolved.len(), 3);
	}

	#[test]
	fn failed_branch_leaves_no_trace() {
		let c = catalog(vec![
			version("linter", "1.0.0", &[]),
			version("linter", "2.0.0", &[("fmt-tool", "*"), ("host", ">=3.0.0")]),
			version("fmt-tool", "1.0.0", &[]),
		]);
		let resolved = Resolver::new(&c).resolve(host("2.1.0"), [Dependency::any("linter")]).unwrap();
		assert!(!resolved.contains("fmt-tool"));
		assert_eq!(resolved.get("linter").unwrap().version, v("1.0.0"));
	}

	#[test]
	fn disjoint_ranges_fail() {
		let c = catalog(vec![
			version("fmt-tool", "1.0.0", &[]),
			version("fmt-tool", "2.0.0", &[]),
			version("a", "1.0.0", &[("fmt-tool", "<1.5.0")]),
			version("b", "1.0.0", &[("fmt-tool", ">=1.5.0")]),
		]);
		let error = Resolver::new(&c).resolve(Resolution::new(), [dep("fmt-tool", "<1.5.0"), dep("fmt-tool", ">=1.5.0")]).unwrap_err();
		assert_eq!(error.name, "fmt-tool");

		let error = Resolver::new(&c).resolve(Resolution::new(), [Dependency::any("a"), Dependency::any("b")]).unwrap_err();
		assert_eq!(error.name, "fmt-tool");
		assert_eq!(error.required_by, ["a", "b"]);
		assert_eq!(error.to_string(), "unable to find a matching version for \"fmt-tool\"");
	}

	#[test]
	fn unknown_package_fails() {
		let error = Resolver::new(&Catalog::default()).resolve(Resolution::new(), [Dependency::any("missing")]).unwrap_err();
		assert_eq!(error.name, "missing");
		assert!(error.required_by.is_empty());
	}

	#[test]
	fn every_requirement_satisfied() {
		let c = catalog(vec![
			version("a", "1.0.0", &[("b", ">=1.0.0"), ("c", "<2.0.0")]),
			version("b", "1.0.0", &[("c", ">=1.1.0")]),
			version("b", "1.1.0", &[("c", ">=1.5.0")]),
			version("c", "1.0.0", &[]),
			version("c", "1.2.0", &[]),
			version("c", "2.0.0", &[]),
		]);
		let resolved = Resolver::new(&c).resolve(Resolution::new(), [Dependency::any("a")]).unwrap();

		for chosen in resolved.iter() {
			for requirement in &chosen.require {
				let target = resolved.get(&requirement.name).unwrap();
				assert!(requirement.is_satisfied_by(&target.version), "{} does not satisfy {} from {}", target, requirement, chosen);
			}
		}
		assert_eq!(resolved.get("b").unwrap().version, v("1.0.0"));
		assert_eq!(resolved.get("c").unwrap().version, v("1.2.0"));
	}
}
