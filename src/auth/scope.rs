//! Scope modeling for the client-credentials grant.

// std
use std::collections::HashSet;
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace or commas.
	#[error("Scope contains a delimiter character: {scope}.")]
	ContainsDelimiter {
		/// The offending scope string.
		scope: String,
	},
}

/// Deduplicated set of OAuth scopes that keeps the caller's order.
///
/// The grant sends scopes as a single comma-joined form value, so entries may contain
/// neither whitespace nor commas.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ScopeSet {
	scopes: Arc<[String]>,
}
impl ScopeSet {
	/// Creates a scope set from any iterator, dropping repeated entries.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self { scopes: normalize(scopes)? })
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Returns true if the set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.scopes.iter().any(|candidate| candidate == scope)
	}

	/// Iterator over scopes in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.scopes.iter().map(|s| s.as_str())
	}

	/// Joins the scopes with `delimiter`.
	pub fn joined(&self, delimiter: char) -> String {
		let mut buf = String::new();

		for (idx, value) in self.scopes.iter().enumerate() {
			if idx > 0 {
				buf.push(delimiter);
			}

			buf.push_str(value);
		}

		buf
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.scopes).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.joined(','))
	}
}

impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	/// Parses comma- or whitespace-separated scopes (`public,projects` or `public projects`).
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}

		let parts = s
			.split(|c: char| c == ',' || c.is_whitespace())
			.filter(|part| !part.is_empty())
			.collect::<Vec<_>>();

		if parts.is_empty() {
			return Err(ScopeValidationError::Empty);
		}

		Self::new(parts)
	}
}

fn normalize<I, S>(scopes: I) -> Result<Arc<[String]>, ScopeValidationError>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let mut seen = HashSet::new();
	let mut ordered = Vec::new();

	for scope in scopes {
		let owned: String = scope.into();

		if owned.is_empty() {
			return Err(ScopeValidationError::Empty);
		}
		if owned.chars().any(|c| c == ',' || c.is_whitespace()) {
			return Err(ScopeValidationError::ContainsDelimiter { scope: owned });
		}
		if seen.insert(owned.clone()) {
			ordered.push(owned);
		}
	}

	Ok(Arc::from(ordered))
}
