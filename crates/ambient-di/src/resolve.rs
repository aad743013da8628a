//! Name-based resolution of a target's dependencies

use crate::error::{DependencyNotFoundError, DiError, DiResult};
use crate::layer::{Binding, ScopeLayer};
use crate::name::DependencyName;
use crate::stack::current_context;
use crate::target::Target;
use std::any::Any;
use std::sync::Arc;

/// Values resolved for one call of a target.
///
/// Keeps the context the values were resolved from, so a failed lookup
/// reports the names that context contained.
#[derive(Clone)]
pub struct ResolvedDependencies {
	target: String,
	context: ScopeLayer,
	values: Vec<(DependencyName, Binding)>,
}

impl ResolvedDependencies {
	fn empty(target: &Target, context: ScopeLayer) -> Self {
		Self {
			target: target.name().to_string(),
			context,
			values: Vec::new(),
		}
	}

	fn lookup(&self, name: &str) -> Option<&Binding> {
		self.values
			.iter()
			.find(|(bound, _)| bound.as_str() == name)
			.map(|(_, value)| value)
	}

	fn not_found(&self, name: &str) -> DiError {
		DependencyNotFoundError::new(name, self.target.clone(), self.context.names()).into()
	}

	/// Extracts a clone of the value resolved for `name`.
	///
	/// A name the target did not declare fails with [`DiError::NotFound`],
	/// listing the names of the context the target was resolved from (empty
	/// for a target without dependencies, whose resolution reads no scope).
	/// Fails with [`DiError::TypeMismatch`] when the bound value is not a `T`.
	pub fn get<T: Any + Clone>(&self, name: &str) -> DiResult<T> {
		let value = self.lookup(name).ok_or_else(|| self.not_found(name))?;
		value
			.downcast_ref::<T>()
			.cloned()
			.ok_or_else(|| DiError::TypeMismatch {
				name: DependencyName::from(name),
				target: self.target.clone(),
				expected: std::any::type_name::<T>(),
			})
	}

	/// Extracts the shared value resolved for `name` without cloning it.
	pub fn get_arc<T: Any + Send + Sync>(&self, name: &str) -> DiResult<Arc<T>> {
		let value = self.lookup(name).ok_or_else(|| self.not_found(name))?;
		value
			.clone()
			.downcast::<T>()
			.map_err(|_| DiError::TypeMismatch {
				name: DependencyName::from(name),
				target: self.target.clone(),
				expected: std::any::type_name::<T>(),
			})
	}

	/// Resolved names in declaration order.
	pub fn names(&self) -> impl Iterator<Item = &DependencyName> {
		self.values.iter().map(|(name, _)| name)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

impl std::fmt::Debug for ResolvedDependencies {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ResolvedDependencies")
			.field("target", &self.target)
			.field("names", &self.names().collect::<Vec<_>>())
			.finish()
	}
}

/// Resolves every dependency `target` declares against `context`.
///
/// Lookup is by exact name, in declaration order. The first missing name
/// fails the whole resolution and no later name is looked up.
///
/// # Examples
///
/// ```
/// use ambient_di::{Bindings, ScopeLayer, Target, resolve};
///
/// let context = ScopeLayer::empty().merge(Bindings::new().bind("db", "sqlite://"));
///
/// let ok = resolve(&context, &Target::new("query").depends_on("db")).unwrap();
/// assert_eq!(ok.get::<&str>("db").unwrap(), "sqlite://");
///
/// let err = resolve(&context, &Target::new("query").depends_on("cache")).unwrap_err();
/// assert_eq!(err.as_not_found().unwrap().name().as_str(), "cache");
/// ```
pub fn resolve(context: &ScopeLayer, target: &Target) -> DiResult<ResolvedDependencies> {
	let mut resolved = ResolvedDependencies::empty(target, context.clone());
	for name in target.dependencies() {
		match context.get(name.as_str()) {
			Some(value) => resolved.values.push((name.clone(), value.clone())),
			None => {
				tracing::debug!(
					target_fn = %target.qualified_name(),
					dependency = %name,
					"dependency resolution failed"
				);
				return Err(DependencyNotFoundError::new(
					name,
					target.name(),
					context.names(),
				)
				.into());
			}
		}
	}
	Ok(resolved)
}

/// Resolves `target` against the calling thread's or task's effective
/// context.
///
/// A target with no dependencies resolves without reading any scope.
pub fn resolve_current(target: &Target) -> DiResult<ResolvedDependencies> {
	if !target.has_dependencies() {
		return Ok(ResolvedDependencies::empty(target, ScopeLayer::empty()));
	}
	let context = current_context()?;
	resolve(&context, target)
}
