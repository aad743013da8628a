//! Declarations of which parameters a callable expects from its scope

use crate::name::DependencyName;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Dependency metadata of one callable.
///
/// A `Target` is built once per callable and cached with it: the
/// `#[with_context]` macro keeps it in a `LazyLock` static, [`wrap`]
/// shares it behind an `Arc`.
///
/// [`wrap`]: crate::wrap
///
/// # Examples
///
/// ```
/// use ambient_di::Target;
///
/// let target = Target::new("greet")
/// 	.in_module("app::handlers")
/// 	.depends_on("logger")
/// 	.depends_on("clock");
///
/// assert_eq!(target.to_string(), "greet");
/// assert_eq!(target.qualified_name(), "app::handlers::greet");
/// assert_eq!(target.dependencies().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
	name: String,
	module_path: Option<String>,
	dependencies: Vec<DependencyName>,
}

impl Target {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			module_path: None,
			dependencies: Vec::new(),
		}
	}

	/// Records the module the callable is declared in, for diagnostics.
	pub fn in_module(mut self, module_path: impl Into<String>) -> Self {
		self.module_path = Some(module_path.into());
		self
	}

	/// Declares a scope-supplied parameter.
	///
	/// Declaring the same name twice keeps its first position.
	pub fn depends_on(mut self, name: impl Into<DependencyName>) -> Self {
		let name = name.into();
		if !self.dependencies.contains(&name) {
			self.dependencies.push(name);
		}
		self
	}

	/// Declared name of the callable.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn module_path(&self) -> Option<&str> {
		self.module_path.as_deref()
	}

	/// `module::name`, or just the name when no module was recorded.
	pub fn qualified_name(&self) -> String {
		match &self.module_path {
			Some(module) => format!("{}::{}", module, self.name),
			None => self.name.clone(),
		}
	}

	/// Scope-supplied parameter names in declaration order.
	pub fn dependencies(&self) -> &[DependencyName] {
		&self.dependencies
	}

	pub fn has_dependencies(&self) -> bool {
		!self.dependencies.is_empty()
	}
}

impl fmt::Display for Target {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}

/// Marks a parameter as supplied by the enclosing scope rather than by the
/// caller.
///
/// Used as a parameter type in `#[with_context]` functions; the parameter
/// disappears from the public signature and is resolved by its name at
/// call time. Derefs to the injected value.
///
/// # Examples
///
/// ```
/// use ambient_di::Depends;
///
/// let depends = Depends::new(String::from("stdout"));
/// assert_eq!(depends.len(), 6);
/// assert_eq!(depends.into_inner(), "stdout");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Depends<T>(T);

impl<T> Depends<T> {
	pub fn new(value: T) -> Self {
		Self(value)
	}

	pub fn into_inner(self) -> T {
		self.0
	}
}

impl<T> Deref for Depends<T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.0
	}
}

impl<T> DerefMut for Depends<T> {
	fn deref_mut(&mut self) -> &mut T {
		&mut self.0
	}
}

impl<T> From<T> for Depends<T> {
	fn from(value: T) -> Self {
		Self(value)
	}
}
