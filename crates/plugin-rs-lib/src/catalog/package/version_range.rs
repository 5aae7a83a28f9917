//! Version ranges placed on dependencies.
//!
//! # Format
//! - A comparator is an operator followed by a version, `>=1.2.0`. Supported operators are
//! `>`, `>=`, `<`, `<=`, `=`, `==`, `!=` and `!`. A version without an operator must match exactly.
//! - Comparators separated by whitespace must all match, `>=1.2.0 <2.0.0`.
//! - Alternatives are separated by `||`, `<1.0.0 || >=2.0.0`.
//! - `x`, `X` or `*` in place of a version component matches any value, `1.2.x`.
//! - An empty range or `*` matches every version.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use super::plugin_version::parse_tolerant;

#[derive(Debug, Error)]
#[error("invalid version range \"{text}\": {reason}")]
pub struct RangeError {
	pub text: String,
	pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
	Eq,
	Ne,
	Gt,
	Ge,
	Lt,
	Le,
}

impl Comparator {
	fn matches(self, ord: std::cmp::Ordering) -> bool {
		use std::cmp::Ordering::*;
		match self {
			Comparator::Eq => ord == Equal,
			Comparator::Ne => ord != Equal,
			Comparator::Gt => ord == Greater,
			Comparator::Ge => ord != Less,
			Comparator::Lt => ord == Less,
			Comparator::Le => ord != Greater,
		}
	}

	fn as_str(self) -> &'static str {
		match self {
			Comparator::Eq => "=",
			Comparator::Ne => "!=",
			Comparator::Gt => ">",
			Comparator::Ge => ">=",
			Comparator::Lt => "<",
			Comparator::Le => "<=",
		}
	}

	/// Longest operators first so `>=` isn't read as `>`.
	const OPERATORS: [(&'static str, Comparator); 8] = [
		(">=", Comparator::Ge),
		("<=", Comparator::Le),
		("!=", Comparator::Ne),
		("==", Comparator::Eq),
		(">", Comparator::Gt),
		("<", Comparator::Lt),
		("=", Comparator::Eq),
		("!", Comparator::Ne),
	];

	fn split_prefix(s: &str) -> (Option<Comparator>, &str) {
		for (op, comparator) in Self::OPERATORS {
			if let Some(rest) = s.strip_prefix(op) {
				return (Some(comparator), rest)
			}
		}
		(None, s)
	}
}

/// A predicate over versions kept as an inspectable expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Range {
	#[default] Any,
	Compare(Comparator, semver::Version),
	/// Every term must accept the version. Empty accepts everything.
	And(Vec<Range>),
	/// At least one term must accept the version. Empty accepts nothing.
	Or(Vec<Range>),
}

impl Range {
	pub fn compare(comparator: Comparator, version: semver::Version) -> Self {
		Range::Compare(comparator, version)
	}

	/// Accepts `version` and anything newer.
	pub fn at_least(version: semver::Version) -> Self {
		Range::Compare(Comparator::Ge, version)
	}

	pub fn exactly(version: semver::Version) -> Self {
		Range::Compare(Comparator::Eq, version)
	}

	/// Build metadata is ignored when comparing.
	pub fn accepts(&self, version: &semver::Version) -> bool {
		match self {
			Range::Any => true,
			Range::Compare(comparator, bound) => comparator.matches(version.cmp_precedence(bound)),
			Range::And(terms) => terms.iter().all(|t| t.accepts(version)),
			Range::Or(terms) => terms.iter().any(|t| t.accepts(version)),
		}
	}

	/// Conjunction of both ranges.
	pub fn and(self, other: Range) -> Range {
		match (self, other) {
			(Range::Any, r) | (r, Range::Any) => r,
			(lhs, rhs) => {
				let mut terms = lhs.into_and_terms();
				terms.extend(rhs.into_and_terms());
				Range::And(terms)
			}
		}
	}

	/// Disjunction of both ranges.
	pub fn or(self, other: Range) -> Range {
		match (self, other) {
			(Range::Any, _) | (_, Range::Any) => Range::Any,
			(Range::Or(mut lhs), Range::Or(rhs)) => {
				lhs.extend(rhs);
				Range::Or(lhs)
			},
			(Range::Or(mut lhs), rhs) => {
				lhs.push(rhs);
				Range::Or(lhs)
			},
			(lhs, rhs) => Range::Or(vec![lhs, rhs]),
		}
	}

	fn into_and_terms(self) -> Vec<Range> {
		match self {
			Range::And(terms) => terms,
			r => vec![r],
		}
	}

	pub fn parse(text: &str) -> Result<Range, RangeError> {
		let err = |reason: &str| RangeError { text: text.to_string(), reason: reason.to_string() };

		let trimmed = text.trim();
		if trimmed.is_empty() || trimmed == "*" {
			return Ok(Range::Any)
		}

		let mut alternatives = Vec::<Range>::new();
		for alternative in trimmed.split("||") {
			let tokens = join_operator_tokens(alternative.split_whitespace());
			if tokens.is_empty() {
				return Err(err("empty alternative"))
			}

			let mut terms = Vec::<Range>::new();
			for token in tokens {
				terms.push(parse_comparator(&token).map_err(|reason| err(&reason))?);
			}
			let range = terms.into_iter().fold(Range::Any, Range::and);
			alternatives.push(range);
		}

		alternatives.into_iter()
			.reduce(Range::or)
			.ok_or_else(|| err("empty range"))
	}
}

/// Glues a lone operator to the version after it so `>= 1.2.0` reads as `>=1.2.0`.
fn join_operator_tokens<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<String> {
	let mut joined = Vec::<String>::new();
	let mut pending = String::new();
	for token in tokens {
		pending.push_str(token);
		if let (Some(_), "") = Comparator::split_prefix(&pending) {
			continue;
		}
		joined.push(std::mem::take(&mut pending));
	}
	if !pending.is_empty() {
		joined.push(pending);
	}
	joined
}

fn parse_comparator(token: &str) -> Result<Range, String> {
	let (comparator, version) = Comparator::split_prefix(token);
	let version = version.trim();
	if version.is_empty() {
		return Err(format!("operator \"{}\" is missing a version", token))
	}

	let comparator = comparator.unwrap_or(Comparator::Eq);
	if version == "*" {
		return wildcard_range(comparator, None)
	}

	let version = version.strip_prefix('v').unwrap_or(version);
	let components: Vec<&str> = version.split('.').collect();
	if let Some(wildcard) = components.iter().position(|c| matches!(*c, "x" | "X" | "*")) {
		let mut fixed = Vec::<u64>::new();
		for c in &components[..wildcard] {
			fixed.push(c.parse::<u64>().map_err(|_| format!("\"{}\" is not a number in \"{}\"", c, version))?);
		}
		return wildcard_range(comparator, Some(fixed))
	}

	let version = parse_tolerant(version).map_err(|e| e.reason)?;
	Ok(Range::compare(comparator, version))
}

/// Expands `1.2.x` style versions, `fixed` holding the components before the wildcard.
fn wildcard_range(comparator: Comparator, fixed: Option<Vec<u64>>) -> Result<Range, String> {
	let fixed = match fixed {
		Some(f) if !f.is_empty() => f,
		_ => return Ok(match comparator {
			Comparator::Ne | Comparator::Gt | Comparator::Lt => Range::Or(vec![]),
			_ => Range::Any,
		}),
	};

	let next = |n: u64| n.checked_add(1).ok_or_else(|| format!("{} is too large to take a wildcard after it", n));
	let major = fixed[0];
	let (lower, upper) = if fixed.len() == 1 {
		(semver::Version::new(major, 0, 0), semver::Version::new(next(major)?, 0, 0))
	} else {
		let minor = fixed[1];
		(semver::Version::new(major, minor, 0), semver::Version::new(major, next(minor)?, 0))
	};

	Ok(match comparator {
		Comparator::Eq => Range::And(vec![Range::at_least(lower), Range::Compare(Comparator::Lt, upper)]),
		Comparator::Ne => Range::Or(vec![Range::Compare(Comparator::Lt, lower), Range::at_least(upper)]),
		Comparator::Ge => Range::at_least(lower),
		Comparator::Gt => Range::at_least(upper),
		Comparator::Lt => Range::Compare(Comparator::Lt, lower),
		Comparator::Le => Range::Compare(Comparator::Lt, upper),
	})
}

impl std::str::FromStr for Range {
	type Err = RangeError;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Range::parse(s) }
}

impl std::fmt::Display for Range {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Range::Any => write!(f, "*"),
			Range::Compare(comparator, version) => write!(f, "{}{}", comparator.as_str(), version),
			Range::And(terms) => {
				for (i, term) in terms.iter().enumerate() {
					if i > 0 { write!(f, " ")?; }
					match term {
						Range::Or(_) => write!(f, "({})", term)?,
						_ => write!(f, "{}", term)?,
					}
				}
				Ok(())
			},
			Range::Or(terms) => {
				for (i, term) in terms.iter().enumerate() {
					if i > 0 { write!(f, " || ")?; }
					write!(f, "{}", term)?;
				}
				Ok(())
			},
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn v(s: &str) -> semver::Version { semver::Version::parse(s).unwrap() }
	fn r(s: &str) -> Range { Range::parse(s).unwrap() }

	#[test] fn empty_is_any() { assert_eq!(r(""), Range::Any) }
	#[test] fn star_is_any() { assert_eq!(r(" * "), Range::Any) }
	#[test] fn bare_version_is_exact() { assert_eq!(r("1.2.3"), Range::exactly(v("1.2.3"))) }
	#[test] fn operator_with_space() { assert_eq!(r(">= 1.2.0"), Range::at_least(v("1.2.0"))) }
	#[test] fn short_version_is_padded() { assert_eq!(r(">=1.2"), Range::at_least(v("1.2.0"))) }
	#[test] fn missing_version_is_error() { assert!(Range::parse(">=").is_err()) }
	#[test] fn empty_alternative_is_error() { assert!(Range::parse(">=1.0.0 ||").is_err()) }
	#[test] fn garbage_is_error() { assert!(Range::parse(">=banana").is_err()) }
	#[test] fn huge_major_wildcard_is_error() { assert!(Range::parse("18446744073709551615.x").is_err()) }
	#[test] fn huge_minor_wildcard_is_error() { assert!(Range::parse(">=1.18446744073709551615.x").is_err()) }

	#[test]
	fn or_flattens_alternatives() {
		let range = r("<1.0.0 || =2.0.0 || >=3.0.0");
		assert!(matches!(&range, Range::Or(terms) if terms.len() == 3));
		assert_eq!(r("<1.0.0").or(Range::Any), Range::Any);
		assert_eq!(r("* || 1.0.0"), Range::Any);
	}

	#[test]
	fn and_range_accepts_inside_only() {
		let range = r(">=1.2.0 <2.0.0");
		assert!(!range.accepts(&v("1.1.9")));
		assert!(range.accepts(&v("1.2.0")));
		assert!(range.accepts(&v("1.9.9")));
		assert!(!range.accepts(&v("2.0.0")));
	}

	#[test]
	fn or_range_accepts_either_side() {
		let range = r("<1.0.0 || >=2.0.0");
		assert!(range.accepts(&v("0.9.0")));
		assert!(!range.accepts(&v("1.5.0")));
		assert!(range.accepts(&v("2.0.0")));
	}

	#[test]
	fn not_equal_excludes_one_version() {
		let range = r("!1.0.0");
		assert!(!range.accepts(&v("1.0.0")));
		assert!(range.accepts(&v("1.0.1")));
	}

	#[test]
	fn minor_wildcard() {
		let range = r("1.2.x");
		assert!(!range.accepts(&v("1.1.9")));
		assert!(range.accepts(&v("1.2.7")));
		assert!(!range.accepts(&v("1.3.0")));
	}

	#[test]
	fn major_wildcard_with_operators() {
		assert!(r(">1.x").accepts(&v("2.0.0")));
		assert!(!r(">1.x").accepts(&v("1.9.0")));
		assert!(r("<=1.x").accepts(&v("1.9.0")));
		assert!(!r("<=1.x").accepts(&v("2.0.0")));
		assert!(!r("!=1.x").accepts(&v("1.4.0")));
		assert!(r("!=1.x").accepts(&v("0.4.0")));
	}

	#[test]
	fn build_metadata_is_ignored() {
		assert!(r("=1.0.0").accepts(&v("1.0.0+build.5")));
	}

	#[test]
	fn and_with_any_is_identity() {
		let range = r(">=1.0.0");
		assert_eq!(range.clone().and(Range::Any), range);
		assert_eq!(Range::Any.and(range.clone()), range);
	}

	#[test]
	fn and_flattens() {
		let range = r(">=1.0.0 <3.0.0").and(r("!=2.0.0"));
		assert!(matches!(&range, Range::And(terms) if terms.len() == 3));
	}

	#[test]
	fn display_renders_grammar() {
		assert_eq!(r(">=1.2.0 <2.0.0").to_string(), ">=1.2.0 <2.0.0");
		assert_eq!(r("<1.0.0 || =2.0.0").to_string(), "<1.0.0 || =2.0.0");
		assert_eq!(Range::Any.to_string(), "*");
	}
}
