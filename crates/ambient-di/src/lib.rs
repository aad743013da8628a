//! # Ambient Dependency Injection
//!
//! Implicit, scope-based dependency propagation.
//!
//! A caller opens a scope binding named values; any function called inside
//! that scope, however deep, can declare that it needs some of those names
//! and receive them without every intermediate function passing them along.
//!
//! ## Features
//!
//! - **Nested scopes**: inner bindings override outer ones of the same name;
//!   closing a scope restores the previous context exactly
//! - **Per-thread, per-task**: every OS thread has its own scope stack, and
//!   async tasks opened with [`scope_async`] get their own task-local stack
//! - **RAII**: scopes close when their [`ScopeGuard`] is dropped, including
//!   on unwinding and future cancellation
//! - **Fail fast**: a missing dependency fails the call before the target
//!   runs, naming the missing dependency and what was available
//!
//! ## Example
//!
//! ```rust
//! use ambient_di::{Bindings, DiResult, ResolvedDependencies, Target, scope, wrap};
//! use std::sync::Arc;
//!
//! type Logger = Arc<dyn Fn(&str) -> String + Send + Sync>;
//!
//! let greet = wrap(
//! 	Target::new("greet").depends_on("logger"),
//! 	|to_who: &'static str, deps: &ResolvedDependencies| -> DiResult<String> {
//! 		let logger: Logger = deps.get("logger")?;
//! 		Ok(logger(&format!("Hello, {to_who}")))
//! 	},
//! );
//!
//! let logger: Logger = Arc::new(|line| format!("[log] {line}"));
//! let out = scope(Bindings::new().bind("logger", logger), || greet.call("Kotlin"));
//! assert_eq!(out.unwrap().unwrap(), "[log] Hello, Kotlin");
//! ```
//!
//! With the `#[with_context]` attribute (re-exported by the `ambient` facade),
//! the marker is a parameter type:
//!
//! ```rust,ignore
//! use ambient::{Depends, with_context};
//!
//! #[with_context]
//! fn greet(to_who: &str, logger: Depends<Logger>) -> String {
//! 	logger(&format!("Hello, {to_who}"))
//! }
//!
//! // greet(to_who) -> DiResult<String>
//! ```

// Lets macro-generated `::ambient_di::...` paths resolve inside this crate.
extern crate self as ambient_di;

pub mod error;
pub mod layer;
pub mod name;
pub mod resolve;
pub mod stack;
pub mod target;
pub mod wrap;

pub use error::{DependencyNotFoundError, DiError, DiResult};
pub use layer::{Binding, Bindings, ScopeLayer};
pub use name::DependencyName;
pub use resolve::{ResolvedDependencies, resolve, resolve_current};
pub use stack::{
	ScopeGuard, current_context, enter_scope, scope, scope_async, scope_depth, try_enter_scope,
	try_scope_async,
};
pub use target::{Depends, Target};
pub use wrap::{ContextFn, wrap};
