//! # Ambient
//!
//! Implicit, scope-based dependency propagation for Rust.
//!
//! A caller opens a scope that binds named values. Any function called while
//! that scope is open, however deep in the call chain, can declare that it
//! needs some of those names and receive them without the intermediate
//! functions passing them along.
//!
//! ## Feature Flags
//!
//! - `macros` (default) - `#[with_context]` attribute macro
//!
//! ## Quick Example
//!
//! ```rust
//! # #[cfg(feature = "macros")]
//! # {
//! use ambient::{Depends, bindings, scope, with_context};
//!
//! #[derive(Clone)]
//! struct Greeter {
//! 	greeting: &'static str,
//! }
//!
//! #[with_context]
//! fn greet(to_who: &str, greeter: Depends<Greeter>) -> String {
//! 	format!("{}, {to_who}", greeter.greeting)
//! }
//!
//! #[with_context]
//! fn some_func(to_who: &str) -> String {
//! 	// no `greeter` parameter here: it flows through the scope
//! 	greet(to_who).unwrap()
//! }
//!
//! let out = scope(bindings! { "greeter" => Greeter { greeting: "Hello" } }, || some_func("Kotlin"));
//! assert_eq!(out.unwrap(), "Hello, Kotlin");
//!
//! // Outside any scope the dependency is missing.
//! let err = greet("Kotlin").unwrap_err();
//! assert_eq!(err.as_not_found().unwrap().name().as_str(), "greeter");
//! # }
//! ```
//!
//! ## Modules
//!
//! The core crate is re-exported as [`di`]; its items are also available at
//! the crate root.

pub use ambient_di as di;
pub use ambient_di::*;

#[cfg(feature = "macros")]
pub use ambient_di_macros::with_context;
