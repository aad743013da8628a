//! Helper functions for dynamic crate path resolution using proc_macro_crate

use proc_macro2::TokenStream;
use quote::quote;

/// Resolves the path to the ambient_di crate dynamically.
///
/// The `ambient` facade is tried first (it re-exports the core crate as
/// `ambient::di`), then the core crate itself. Returns an error if neither
/// is listed in Cargo.toml.
pub(crate) fn get_ambient_di_crate() -> syn::Result<TokenStream> {
	use proc_macro_crate::{FoundCrate, crate_name};

	match crate_name("ambient") {
		Ok(FoundCrate::Itself) => return Ok(quote!(::ambient::di)),
		Ok(FoundCrate::Name(name)) => {
			let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
			return Ok(quote!(::#ident::di));
		}
		Err(_) => {}
	}

	match crate_name("ambient-di") {
		Ok(FoundCrate::Itself) => Ok(quote!(::ambient_di)),
		Ok(FoundCrate::Name(name)) => {
			let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
			Ok(quote!(::#ident))
		}
		Err(e) => Err(syn::Error::new(
			proc_macro2::Span::call_site(),
			format!(
				"failed to resolve `ambient-di` crate: {}. Ensure `ambient` or `ambient-di` is listed in Cargo.toml dependencies.",
				e
			),
		)),
	}
}
