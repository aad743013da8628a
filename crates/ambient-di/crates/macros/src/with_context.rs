//! Implementation of the `#[with_context]` attribute macro
//!
//! The annotated function is split in two:
//!
//! - `<name>_original`: the untouched body with every parameter, hidden
//! - `<name>`: a wrapper without the scope-supplied parameters, returning
//!   `DiResult<R>`, that resolves those parameters from the active scope
//!   and then calls the original

use crate::crate_paths::get_ambient_di_crate;
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::parse::Parse;
use syn::punctuated::Punctuated;
use syn::{
	Attribute, FnArg, GenericArgument, GenericParam, Ident, ItemFn, LitStr, Meta, Pat, PatType,
	PathArguments, Result, ReturnType, Token, Type,
};

/// Known argument names for `#[with_context(...)]`
const KNOWN_ARGS: &[&str] = &["name", "associated"];

/// Macro arguments structure
#[derive(Default)]
struct MacroArgs {
	/// Overrides the target name used in diagnostics
	name: Option<LitStr>,
	/// The function is an associated function without a receiver
	associated: bool,
}

impl Parse for MacroArgs {
	fn parse(input: syn::parse::ParseStream) -> Result<Self> {
		let mut args = MacroArgs::default();
		let parsed = Punctuated::<Meta, Token![,]>::parse_terminated(input)?;

		for meta in parsed {
			match &meta {
				Meta::NameValue(nv) if nv.path.is_ident("name") => {
					args.name = Some(expect_str_lit(&nv.value)?);
				}
				Meta::Path(path) if path.is_ident("associated") => {
					args.associated = true;
				}
				_ => {
					let path = meta.path();
					return Err(syn::Error::new_spanned(
						path,
						format!(
							"unknown argument `{}`. Valid arguments are: {}",
							path.get_ident()
								.map(|i| i.to_string())
								.unwrap_or_else(|| "?".to_string()),
							KNOWN_ARGS.join(", "),
						),
					));
				}
			}
		}

		Ok(args)
	}
}

fn expect_str_lit(expr: &syn::Expr) -> Result<LitStr> {
	if let syn::Expr::Lit(syn::ExprLit {
		lit: syn::Lit::Str(lit_str),
		..
	}) = expr
	{
		Ok(lit_str.clone())
	} else {
		Err(syn::Error::new_spanned(expr, "expected a string literal"))
	}
}

/// Check if an attribute is `#[inject]`
fn is_inject_attr(attr: &Attribute) -> bool {
	attr.path().is_ident("inject")
}

/// Parses `#[inject]` / `#[inject(name = "...")]`, returning the explicit name if any.
fn parse_inject_attr(attr: &Attribute) -> Result<Option<LitStr>> {
	match &attr.meta {
		Meta::Path(_) => Ok(None),
		Meta::List(_) => {
			let nv: syn::MetaNameValue = attr.parse_args()?;
			if !nv.path.is_ident("name") {
				return Err(syn::Error::new_spanned(
					&nv.path,
					"unknown `inject` argument. Expected `name = \"...\"`",
				));
			}
			expect_str_lit(&nv.value).map(Some)
		}
		Meta::NameValue(nv) => Err(syn::Error::new_spanned(
			nv,
			"expected `#[inject]` or `#[inject(name = \"...\")]`",
		)),
	}
}

/// Returns `T` if `ty` is `Depends<T>`.
fn depends_inner(ty: &Type) -> Option<&Type> {
	let Type::Path(type_path) = ty else {
		return None;
	};
	let segment = type_path.path.segments.last()?;
	if segment.ident != "Depends" {
		return None;
	}
	let PathArguments::AngleBracketed(args) = &segment.arguments else {
		return None;
	};
	match args.args.first() {
		Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
		_ => None,
	}
}

/// How a parameter is supplied.
enum ArgKind {
	/// Passed by the caller
	Caller,
	/// `#[inject] name: T`
	Inject { name: LitStr },
	/// `name: Depends<T>`
	Depends { name: LitStr, inner: Type },
}

/// A typed function parameter after inspection
struct ProcessedArg {
	/// Identifier the wrapper binds the value to
	ident: Ident,
	ty: Type,
	kind: ArgKind,
}

impl ProcessedArg {
	fn from_pat_type(index: usize, pat_type: &mut PatType) -> Result<Self> {
		let mut explicit_name = None;
		let mut marked = false;
		for attr in &pat_type.attrs {
			if is_inject_attr(attr) {
				marked = true;
				explicit_name = parse_inject_attr(attr)?;
			}
		}
		pat_type.attrs.retain(|attr| !is_inject_attr(attr));

		let ty = (*pat_type.ty).clone();
		let simple_ident = match &*pat_type.pat {
			Pat::Ident(pat_ident) if pat_ident.subpat.is_none() && pat_ident.by_ref.is_none() => {
				Some(pat_ident.ident.clone())
			}
			_ => None,
		};
		let ident = simple_ident
			.clone()
			.unwrap_or_else(|| format_ident!("__ambient_arg{}", index));

		let depends = depends_inner(&ty).cloned();
		if !marked && depends.is_none() {
			return Ok(Self {
				ident,
				ty,
				kind: ArgKind::Caller,
			});
		}

		let name = match (explicit_name, &simple_ident) {
			(Some(name), _) => name,
			(None, Some(ident)) => {
				LitStr::new(ident.to_string().trim_start_matches("r#"), ident.span())
			}
			(None, None) => {
				return Err(syn::Error::new_spanned(
					&pat_type.pat,
					"cannot infer a dependency name from this pattern; use #[inject(name = \"...\")]",
				));
			}
		};

		let kind = match depends {
			Some(inner) => ArgKind::Depends { name, inner },
			None => ArgKind::Inject { name },
		};
		Ok(Self { ident, ty, kind })
	}

	fn dependency_name(&self) -> Option<&LitStr> {
		match &self.kind {
			ArgKind::Caller => None,
			ArgKind::Inject { name } | ArgKind::Depends { name, .. } => Some(name),
		}
	}
}

/// Implementation of the `#[with_context]` attribute macro
///
/// Generates:
/// 1. The original function, renamed to `<name>_original` and hidden
/// 2. A wrapper with the original name that drops the scope-supplied
///    parameters, resolves them from the active scope on every call and
///    returns `DiResult<R>`
///
/// For methods (with a receiver) the wrapper calls `Self::<name>_original`.
pub(crate) fn with_context_impl(args: TokenStream, input: ItemFn) -> Result<TokenStream> {
	let di_crate = get_ambient_di_crate()?;
	let args: MacroArgs = if args.is_empty() {
		MacroArgs::default()
	} else {
		syn::parse2(args)?
	};

	let ItemFn {
		attrs,
		vis,
		mut sig,
		block,
	} = input;

	if sig.constness.is_some() {
		return Err(syn::Error::new_spanned(
			sig.constness,
			"#[with_context] cannot be used on const functions",
		));
	}
	if sig.abi.is_some() {
		return Err(syn::Error::new_spanned(
			&sig.abi,
			"#[with_context] cannot be used on extern functions",
		));
	}
	if let Some(variadic) = &sig.variadic {
		return Err(syn::Error::new_spanned(
			variadic,
			"#[with_context] cannot be used on variadic functions",
		));
	}

	let fn_name = sig.ident.clone();
	let original_fn_name = format_ident!("{}_original", fn_name);
	let target_name = args
		.name
		.unwrap_or_else(|| LitStr::new(&fn_name.to_string(), Span::call_site()));

	// Process all function arguments, stripping #[inject] from the original
	let mut receiver = None;
	let mut processed_args = Vec::new();
	for (index, arg) in sig.inputs.iter_mut().enumerate() {
		match arg {
			FnArg::Receiver(recv) => receiver = Some(recv.clone()),
			FnArg::Typed(pat_type) => processed_args.push(ProcessedArg::from_pat_type(index, pat_type)?),
		}
	}

	// Dependency names must be unique per function
	let mut seen = std::collections::HashSet::new();
	for name in processed_args.iter().filter_map(ProcessedArg::dependency_name) {
		if !seen.insert(name.value()) {
			return Err(syn::Error::new_spanned(
				name,
				format!("dependency `{}` is declared more than once", name.value()),
			));
		}
	}

	// Original function: same signature, renamed, parameters bound to plain idents
	let mut original_sig = sig.clone();
	original_sig.ident = original_fn_name.clone();

	// Wrapper function: receiver plus caller-supplied parameters only
	let asyncness = &sig.asyncness;
	let unsafety = &sig.unsafety;
	let generics = &sig.generics;
	let where_clause = &sig.generics.where_clause;
	let output_ty = match &sig.output {
		ReturnType::Default => quote! { () },
		ReturnType::Type(_, ty) => quote! { #ty },
	};

	let wrapper_params: Vec<TokenStream> = processed_args
		.iter()
		.filter(|arg| matches!(arg.kind, ArgKind::Caller))
		.map(|arg| {
			let ident = &arg.ident;
			let ty = &arg.ty;
			quote! { #ident: #ty }
		})
		.collect();
	let receiver_param = receiver.as_ref().map(|recv| quote! { #recv, });

	let dependency_names: Vec<&LitStr> = processed_args
		.iter()
		.filter_map(ProcessedArg::dependency_name)
		.collect();

	let injection_stmts: Vec<TokenStream> = processed_args
		.iter()
		.filter_map(|arg| {
			let ident = &arg.ident;
			let ty = &arg.ty;
			match &arg.kind {
				ArgKind::Caller => None,
				ArgKind::Inject { name } => Some(quote! {
					let #ident: #ty = __ambient_deps.get::<#ty>(#name)?;
				}),
				ArgKind::Depends { name, inner } => Some(quote! {
					let #ident: #ty = #di_crate::Depends::new(__ambient_deps.get::<#inner>(#name)?);
				}),
			}
		})
		.collect();

	// Explicit generic arguments, unless `impl Trait` appears in argument position
	let uses_impl_trait = processed_args
		.iter()
		.any(|arg| matches!(arg.ty, Type::ImplTrait(_)));
	let explicit_generics: Vec<TokenStream> = generics
		.params
		.iter()
		.filter_map(|param| match param {
			GenericParam::Type(ty) => {
				let ident = &ty.ident;
				Some(quote! { #ident })
			}
			GenericParam::Const(c) => {
				let ident = &c.ident;
				Some(quote! { #ident })
			}
			GenericParam::Lifetime(_) => None,
		})
		.collect();
	let turbofish = if explicit_generics.is_empty() || uses_impl_trait {
		quote! {}
	} else {
		quote! { ::<#(#explicit_generics),*> }
	};

	let call_args: Vec<&Ident> = processed_args.iter().map(|arg| &arg.ident).collect();
	let callee = if receiver.is_some() {
		quote! { Self::#original_fn_name #turbofish(self, #(#call_args),*) }
	} else if args.associated {
		quote! { Self::#original_fn_name #turbofish(#(#call_args),*) }
	} else {
		quote! { #original_fn_name #turbofish(#(#call_args),*) }
	};
	let awaited = if asyncness.is_some() {
		quote! { #callee.await }
	} else {
		callee
	};
	let original_call = if unsafety.is_some() {
		quote! { unsafe { #awaited } }
	} else {
		awaited
	};

	let expanded = quote! {
		#[doc(hidden)]
		#[allow(clippy::too_many_arguments)]
		#original_sig #block

		#(#attrs)*
		#vis #asyncness #unsafety fn #fn_name #generics (#receiver_param #(#wrapper_params),*) -> #di_crate::DiResult<#output_ty> #where_clause {
			static __AMBIENT_TARGET: ::std::sync::LazyLock<#di_crate::Target> =
				::std::sync::LazyLock::new(|| {
					#di_crate::Target::new(#target_name)
						.in_module(::std::module_path!())
						#(.depends_on(#dependency_names))*
				});

			let __ambient_deps = #di_crate::resolve_current(&__AMBIENT_TARGET)?;
			#(#injection_stmts)*

			::std::result::Result::Ok(#original_call)
		}
	};

	Ok(expanded)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use syn::parse_quote;

	fn typed(arg: FnArg) -> PatType {
		match arg {
			FnArg::Typed(pat_type) => pat_type,
			FnArg::Receiver(_) => panic!("expected a typed parameter"),
		}
	}

	#[rstest]
	#[case(parse_quote!(Depends<Logger>), true)]
	#[case(parse_quote!(ambient::Depends<Arc<dyn Fn(&str) + Send + Sync>>), true)]
	#[case(parse_quote!(Logger), false)]
	#[case(parse_quote!(Option<Logger>), false)]
	fn test_depends_detection(#[case] ty: Type, #[case] is_marker: bool) {
		// Act
		let inner = depends_inner(&ty);

		// Assert
		assert_eq!(inner.is_some(), is_marker);
	}

	#[rstest]
	fn test_inject_attribute_name_is_stripped_and_used() {
		// Arrange
		let mut pat_type = typed(parse_quote!(#[inject(name = "db_url")] url: String));

		// Act
		let arg = ProcessedArg::from_pat_type(0, &mut pat_type).unwrap();

		// Assert
		assert!(pat_type.attrs.is_empty());
		assert_eq!(arg.ident, "url");
		assert_eq!(arg.dependency_name().unwrap().value(), "db_url");
	}

	#[rstest]
	fn test_plain_parameter_is_caller_supplied() {
		// Arrange
		let mut pat_type = typed(parse_quote!(mut count: usize));

		// Act
		let arg = ProcessedArg::from_pat_type(1, &mut pat_type).unwrap();

		// Assert
		assert!(matches!(arg.kind, ArgKind::Caller));
		assert_eq!(arg.ident, "count");
	}

	#[rstest]
	fn test_marker_on_destructured_pattern_needs_explicit_name() {
		// Arrange
		let mut pat_type = typed(parse_quote!((a, b): Depends<(u8, u8)>));

		// Act
		let result = ProcessedArg::from_pat_type(0, &mut pat_type);

		// Assert
		assert!(result.is_err());
	}

	#[rstest]
	fn test_unknown_macro_argument_is_rejected() {
		// Act
		let result = syn::parse2::<MacroArgs>(quote! { scope = "request" });

		// Assert
		let message = result.err().unwrap().to_string();
		assert!(message.contains("unknown argument `scope`"));
	}
}
