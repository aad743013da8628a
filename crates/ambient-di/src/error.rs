//! Error types for scope resolution

use crate::name::DependencyName;
use std::collections::BTreeSet;
use std::fmt;

/// Result alias used throughout the crate.
pub type DiResult<T> = Result<T, DiError>;

/// A required dependency was absent from the effective context at call time.
///
/// Constructed at the failure point and never mutated afterwards.
///
/// # Examples
///
/// ```
/// use ambient_di::{DependencyName, DependencyNotFoundError};
///
/// let err = DependencyNotFoundError::new(
/// 	"logger",
/// 	"greet",
/// 	[DependencyName::from("db")],
/// );
/// assert_eq!(err.name().as_str(), "logger");
/// assert_eq!(
/// 	err.to_string(),
/// 	"Dependency `logger` of `greet` was not found in context. Context contained: [db]"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNotFoundError {
	name: DependencyName,
	target: String,
	available: BTreeSet<DependencyName>,
}

impl DependencyNotFoundError {
	pub fn new(
		name: impl Into<DependencyName>,
		target: impl Into<String>,
		available: impl IntoIterator<Item = DependencyName>,
	) -> Self {
		Self {
			name: name.into(),
			target: target.into(),
			available: available.into_iter().collect(),
		}
	}

	/// Name of the missing dependency.
	pub fn name(&self) -> &DependencyName {
		&self.name
	}

	/// Declared name of the callable whose call failed.
	pub fn target(&self) -> &str {
		&self.target
	}

	/// Names that were visible in the effective context when resolution failed.
	pub fn available(&self) -> &BTreeSet<DependencyName> {
		&self.available
	}
}

impl fmt::Display for DependencyNotFoundError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"Dependency `{}` of `{}` was not found in context. Context contained: [",
			self.name, self.target
		)?;
		for (i, name) in self.available.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{}", name)?;
		}
		f.write_str("]")
	}
}

impl std::error::Error for DependencyNotFoundError {}

/// Errors surfaced by scope operations and injected calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
	/// A declared dependency is not bound in any open scope
	#[error(transparent)]
	NotFound(#[from] DependencyNotFoundError),

	/// A dependency resolved by name, but its value is not of the requested type
	#[error(
		"Dependency `{name}` of `{target}` is bound to a value that is not a `{expected}`"
	)]
	TypeMismatch {
		/// Dependency name
		name: DependencyName,
		/// Declared name of the callable
		target: String,
		/// Requested Rust type
		expected: &'static str,
	},

	/// The scope stack of the current execution thread cannot be accessed
	#[error(
		"Scope stack is unavailable on this execution thread (thread-local storage is being torn down)"
	)]
	ContextUnavailable,
}

impl DiError {
	/// Returns `true` for [`DiError::NotFound`].
	pub fn is_not_found(&self) -> bool {
		matches!(self, DiError::NotFound(_))
	}

	/// Returns the not-found details, if this is a resolution failure.
	pub fn as_not_found(&self) -> Option<&DependencyNotFoundError> {
		match self {
			DiError::NotFound(err) => Some(err),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_not_found_display_with_empty_context() {
		// Arrange
		let err = DependencyNotFoundError::new("logger", "greet", Vec::new());

		// Act
		let rendered = err.to_string();

		// Assert
		assert_eq!(
			rendered,
			"Dependency `logger` of `greet` was not found in context. Context contained: []"
		);
	}

	#[rstest]
	fn test_not_found_available_is_sorted() {
		// Arrange
		let available = ["zeta", "alpha", "mid"].map(DependencyName::from);

		// Act
		let err = DependencyNotFoundError::new("missing", "handler", available);

		// Assert
		assert!(err.to_string().ends_with("Context contained: [alpha, mid, zeta]"));
		assert_eq!(err.available().len(), 3);
	}

	#[rstest]
	fn test_di_error_wraps_not_found_transparently() {
		// Arrange
		let inner = DependencyNotFoundError::new("db", "list_users", Vec::new());

		// Act
		let err = DiError::from(inner.clone());

		// Assert
		assert!(err.is_not_found());
		assert_eq!(err.as_not_found(), Some(&inner));
		assert_eq!(err.to_string(), inner.to_string());
	}

	#[rstest]
	fn test_type_mismatch_is_not_a_not_found() {
		// Arrange
		let err = DiError::TypeMismatch {
			name: DependencyName::from("port"),
			target: "serve".to_string(),
			expected: "u16",
		};

		// Act & Assert
		assert!(!err.is_not_found());
		assert!(err.as_not_found().is_none());
		assert!(err.to_string().contains("`port`"));
		assert!(err.to_string().contains("`u16`"));
	}
}
