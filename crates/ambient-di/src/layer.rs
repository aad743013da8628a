//! Scope layers and the bindings they are built from

use crate::name::DependencyName;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Opaque value bound to a dependency name.
pub type Binding = Arc<dyn Any + Send + Sync>;

/// Caller-supplied name → value bindings for one scope activation.
///
/// Names are unique: binding the same name twice keeps the last value.
///
/// # Examples
///
/// ```
/// use ambient_di::Bindings;
///
/// let bindings = Bindings::new()
/// 	.bind("retries", 3u32)
/// 	.bind("region", "eu-west-1".to_string());
///
/// assert_eq!(bindings.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct Bindings {
	entries: HashMap<DependencyName, Binding>,
}

impl Bindings {
	pub fn new() -> Self {
		Self::default()
	}

	/// Binds `value` under `name`, replacing any earlier binding of that name.
	pub fn bind<T: Any + Send + Sync>(mut self, name: impl Into<DependencyName>, value: T) -> Self {
		self.insert(name, value);
		self
	}

	/// Binds a pre-wrapped `Arc<T>` without re-wrapping it.
	///
	/// The stored value is still `T`, so it is extracted as `T`, not `Arc<T>`.
	pub fn bind_arc<T: Any + Send + Sync>(
		mut self,
		name: impl Into<DependencyName>,
		value: Arc<T>,
	) -> Self {
		self.entries.insert(name.into(), value);
		self
	}

	/// In-place variant of [`Bindings::bind`].
	pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<DependencyName>, value: T) {
		self.entries.insert(name.into(), Arc::new(value));
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Bound names in sorted order.
	pub fn names(&self) -> Vec<DependencyName> {
		sorted_names(&self.entries)
	}
}

impl fmt::Debug for Bindings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Bindings")
			.field("names", &self.names())
			.finish()
	}
}

impl From<ScopeLayer> for Bindings {
	/// Re-opens a captured context, e.g. on a freshly spawned thread.
	fn from(layer: ScopeLayer) -> Self {
		let entries = Arc::try_unwrap(layer.entries).unwrap_or_else(|shared| (*shared).clone());
		Self { entries }
	}
}

/// Builds [`Bindings`] from `name => value` pairs.
///
/// # Examples
///
/// ```
/// use ambient_di::bindings;
///
/// let bindings = bindings! {
/// 	"a" => 1i32,
/// 	"b" => "two".to_string(),
/// };
/// assert_eq!(bindings.len(), 2);
/// ```
#[macro_export]
macro_rules! bindings {
	() => {
		$crate::Bindings::new()
	};
	($($name:expr => $value:expr),+ $(,)?) => {
		$crate::Bindings::new()$(.bind($name, $value))+
	};
}

/// One immutable, fully merged view of the bindings visible inside a scope.
///
/// A layer already contains everything inherited from the scopes enclosing
/// it, so the effective context is just the top layer of the stack.
#[derive(Clone, Default)]
pub struct ScopeLayer {
	entries: Arc<HashMap<DependencyName, Binding>>,
}

impl ScopeLayer {
	pub fn empty() -> Self {
		Self::default()
	}

	/// Produces a new layer with `bindings` taking precedence over `self`.
	///
	/// `self` is left untouched.
	///
	/// # Examples
	///
	/// ```
	/// use ambient_di::{Bindings, ScopeLayer};
	///
	/// let outer = ScopeLayer::empty().merge(Bindings::new().bind("a", 1i32));
	/// let inner = outer.merge(Bindings::new().bind("a", 2i32).bind("b", 3i32));
	///
	/// assert_eq!(outer.get_as::<i32>("a"), Some(&1));
	/// assert_eq!(inner.get_as::<i32>("a"), Some(&2));
	/// assert_eq!(inner.get_as::<i32>("b"), Some(&3));
	/// ```
	pub fn merge(&self, bindings: Bindings) -> ScopeLayer {
		if bindings.is_empty() {
			return self.clone();
		}
		if self.entries.is_empty() {
			return ScopeLayer {
				entries: Arc::new(bindings.entries),
			};
		}
		let mut entries = (*self.entries).clone();
		entries.extend(bindings.entries);
		ScopeLayer {
			entries: Arc::new(entries),
		}
	}

	pub fn get(&self, name: &str) -> Option<&Binding> {
		self.entries.get(name)
	}

	/// Looks up `name` and downcasts it to `T`.
	///
	/// Returns `None` if the name is unbound or bound to another type.
	pub fn get_as<T: Any>(&self, name: &str) -> Option<&T> {
		self.entries.get(name).and_then(|value| value.downcast_ref::<T>())
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	/// Visible names in sorted order.
	pub fn names(&self) -> Vec<DependencyName> {
		sorted_names(&self.entries)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Returns `true` when both layers share the same underlying storage.
	pub fn ptr_eq(&self, other: &ScopeLayer) -> bool {
		Arc::ptr_eq(&self.entries, &other.entries)
	}
}

impl fmt::Debug for ScopeLayer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScopeLayer")
			.field("names", &self.names())
			.finish()
	}
}

fn sorted_names(entries: &HashMap<DependencyName, Binding>) -> Vec<DependencyName> {
	let mut names: Vec<DependencyName> = entries.keys().cloned().collect();
	names.sort();
	names
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_bind_same_name_keeps_last_value() {
		// Arrange & Act
		let bindings = Bindings::new().bind("a", 1i32).bind("a", 2i32);
		let layer = ScopeLayer::empty().merge(bindings);

		// Assert
		assert_eq!(layer.len(), 1);
		assert_eq!(layer.get_as::<i32>("a"), Some(&2));
	}

	#[rstest]
	fn test_merge_inner_wins_and_outer_is_unchanged() {
		// Arrange
		let outer = ScopeLayer::empty().merge(bindings! { "a" => 1i32, "c" => 10i32 });

		// Act
		let inner = outer.merge(bindings! { "a" => 2i32, "b" => 3i32 });

		// Assert
		assert_eq!(inner.get_as::<i32>("a"), Some(&2));
		assert_eq!(inner.get_as::<i32>("b"), Some(&3));
		assert_eq!(inner.get_as::<i32>("c"), Some(&10));
		assert_eq!(outer.get_as::<i32>("a"), Some(&1));
		assert!(!outer.contains("b"));
	}

	#[rstest]
	fn test_merge_with_empty_bindings_shares_storage() {
		// Arrange
		let outer = ScopeLayer::empty().merge(bindings! { "a" => 1i32 });

		// Act
		let inner = outer.merge(Bindings::new());

		// Assert
		assert!(inner.ptr_eq(&outer));
	}

	#[rstest]
	fn test_get_as_wrong_type_is_none() {
		// Arrange
		let layer = ScopeLayer::empty().merge(bindings! { "port" => 8080u16 });

		// Act & Assert
		assert!(layer.get_as::<u32>("port").is_none());
		assert_eq!(layer.get_as::<u16>("port"), Some(&8080));
	}

	#[rstest]
	fn test_lookup_is_exact_name_match() {
		// Arrange
		let layer = ScopeLayer::empty().merge(bindings! { "Logger" => 1i32 });

		// Act & Assert
		assert!(!layer.contains("logger"));
		assert!(!layer.contains("Log"));
		assert!(layer.contains("Logger"));
	}

	#[rstest]
	fn test_bind_arc_stores_inner_type() {
		// Arrange
		let shared = Arc::new("value".to_string());

		// Act
		let layer = ScopeLayer::empty().merge(Bindings::new().bind_arc("s", shared.clone()));

		// Assert
		assert_eq!(layer.get_as::<String>("s"), Some(&"value".to_string()));
		assert_eq!(Arc::strong_count(&shared), 2);
	}

	#[rstest]
	fn test_layer_round_trips_into_bindings() {
		// Arrange
		let layer = ScopeLayer::empty().merge(bindings! { "x" => 1u8, "y" => 2u8 });

		// Act
		let bindings = Bindings::from(layer.clone());

		// Assert
		assert_eq!(bindings.names(), layer.names());
	}
}
