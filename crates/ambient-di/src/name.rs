//! Dependency names

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Identifier of a dependency, unique within a single scope layer.
///
/// Lookup is by exact string equality; there is no case folding or prefix
/// matching.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyName(Arc<str>);

impl DependencyName {
	pub fn new(name: impl AsRef<str>) -> Self {
		Self(Arc::from(name.as_ref()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Borrow<str> for DependencyName {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for DependencyName {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl From<&str> for DependencyName {
	fn from(name: &str) -> Self {
		Self(Arc::from(name))
	}
}

impl From<String> for DependencyName {
	fn from(name: String) -> Self {
		Self(Arc::from(name))
	}
}

impl From<&DependencyName> for DependencyName {
	fn from(name: &DependencyName) -> Self {
		name.clone()
	}
}

impl PartialEq<str> for DependencyName {
	fn eq(&self, other: &str) -> bool {
		&*self.0 == other
	}
}

impl PartialEq<&str> for DependencyName {
	fn eq(&self, other: &&str) -> bool {
		&*self.0 == *other
	}
}

impl fmt::Display for DependencyName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl fmt::Debug for DependencyName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}
