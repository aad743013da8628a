//! Runtime injection wrapper
//!
//! [`wrap`] is the non-macro counterpart of `#[with_context]`: it pairs a
//! [`Target`] declaration with a closure and resolves the declared names
//! on every call.

use crate::error::DiResult;
use crate::resolve::{ResolvedDependencies, resolve_current};
use crate::target::Target;
use std::fmt;
use std::sync::Arc;

/// A callable whose declared dependencies are injected from the active scope.
///
/// Resolution reads the scope that is active when [`ContextFn::call`] runs,
/// not the one active when the wrapper was built, so one wrapper can be
/// reused under different enclosing scopes.
pub struct ContextFn<F> {
	target: Arc<Target>,
	func: F,
}

impl<F> ContextFn<F> {
	/// Declaration this wrapper resolves against.
	pub fn target(&self) -> &Target {
		&self.target
	}

	/// Resolves the declared dependencies, then calls the wrapped function.
	///
	/// If any dependency is missing the function is not called at all and
	/// the resolution error is returned.
	pub fn call<A, R>(&self, args: A) -> DiResult<R>
	where
		F: Fn(A, &ResolvedDependencies) -> R,
	{
		let resolved = resolve_current(&self.target)?;
		Ok((self.func)(args, &resolved))
	}
}

impl<F: Clone> Clone for ContextFn<F> {
	fn clone(&self) -> Self {
		Self {
			target: Arc::clone(&self.target),
			func: self.func.clone(),
		}
	}
}

impl<F> fmt::Debug for ContextFn<F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ContextFn")
			.field("target", &self.target)
			.finish_non_exhaustive()
	}
}

/// Wraps `func` so that the dependencies `target` declares are injected on
/// every call.
///
/// `func` receives the caller's arguments and the resolved dependencies.
/// A target with no dependencies makes a plain pass-through wrapper.
///
/// # Examples
///
/// ```
/// use ambient_di::{Bindings, Target, scope, wrap};
///
/// let greet = wrap(
/// 	Target::new("greet").depends_on("greeting"),
/// 	|name: String, deps| {
/// 		let greeting: String = deps.get("greeting")?;
/// 		Ok::<_, ambient_di::DiError>(format!("{greeting}, {name}"))
/// 	},
/// );
///
/// let message = scope(Bindings::new().bind("greeting", "Hello".to_string()), || {
/// 	greet.call("Kotlin".to_string())
/// });
/// assert_eq!(message.unwrap().unwrap(), "Hello, Kotlin");
///
/// // Outside the scope the call fails before the closure runs.
/// assert!(greet.call("Kotlin".to_string()).unwrap_err().is_not_found());
/// ```
pub fn wrap<A, R, F>(target: Target, func: F) -> ContextFn<F>
where
	F: Fn(A, &ResolvedDependencies) -> R,
{
	ContextFn {
		target: Arc::new(target),
		func,
	}
}
