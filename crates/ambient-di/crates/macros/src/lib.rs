//! Procedural macros for ambient dependency injection

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod crate_paths;
mod with_context;

/// Attribute macro that injects scope-bound dependencies into a function
///
/// Parameters typed `Depends<T>`, or marked `#[inject]`, are removed from the
/// public signature. On every call they are looked up by parameter name in
/// the active scope; all other parameters are passed through as-is.
///
/// # Parameters
///
/// - `name: Depends<T>`: resolved from the binding `"name"`, wrapped in `Depends`
/// - `#[inject] name: T`: resolved from the binding `"name"` as a plain `T`
/// - `#[inject(name = "other")] value: T`: resolved from the binding `"other"`
///
/// # Macro arguments
///
/// - `name = "..."`: target name used in error messages (defaults to the function name)
/// - `associated`: required for associated functions without a receiver
///
/// # Return type
///
/// The generated function returns `DiResult<R>` where `R` is the declared
/// return type. If any dependency is missing the body does not run and a
/// `DiError::NotFound` naming the dependency, the function and the
/// available names is returned. For `async fn` resolution happens on the
/// first poll.
///
/// # Requirements
///
/// 1. Injected types must be `Clone + Send + Sync + 'static`
/// 2. Dependency names must be unique per function
/// 3. The function must not be `const`, `extern` or variadic
/// 4. Not usable inside trait impls, since a hidden `<name>_original` item is emitted next to it
///
/// # Example
///
/// ```rust,ignore
/// use ambient::{Depends, bindings, scope, with_context};
///
/// #[with_context]
/// fn greet(to_who: &str, greeting: Depends<String>) -> String {
/// 	format!("{}, {to_who}", *greeting)
/// }
///
/// let out = scope(bindings! { "greeting" => "Hello".to_string() }, || greet("Kotlin"));
/// assert_eq!(out.unwrap(), "Hello, Kotlin");
/// ```
#[proc_macro_attribute]
pub fn with_context(args: TokenStream, input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as syn::ItemFn);

	with_context::with_context_impl(args.into(), input)
		.unwrap_or_else(|err| err.to_compile_error())
		.into()
}
