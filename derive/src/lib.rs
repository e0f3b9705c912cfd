//! Derive macros for the vaultpack codec.
//!
//! `#[derive(Encode)]` / `#[derive(Decode)]` synthesize the container-driven
//! trait implementations for application model structs: named structs map to
//! keyed containers with the field names as wire keys, tuple structs to
//! unkeyed containers, and unit structs to nil.

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, Index};

/// Field attributes parsed from `#[vaultpack(...)]` annotations.
///
/// * `rename` - Alternate wire key for the field
/// * `skip` - Never encoded; `Default::default()` on decode
/// * `default` - Missing key decodes to `Default::default()` instead of
///   failing with key-not-found
#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
    default: bool,
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("vaultpack") {
            continue;
        }
        attr.parse_args_with(|input: syn::parse::ParseStream| {
            while !input.is_empty() {
                let ident = input.parse::<Ident>()?;
                if ident == "rename" {
                    input.parse::<syn::Token![=]>()?;
                    let lit = input.parse::<syn::LitStr>()?;
                    out.rename = Some(lit.value());
                } else if ident == "skip" {
                    out.skip = true;
                } else if ident == "default" {
                    out.default = true;
                } else {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown vaultpack attribute: {}", ident),
                    ));
                }
                if input.peek(syn::Token![,]) {
                    input.parse::<syn::Token![,]>()?;
                }
            }
            Ok(())
        })?;
    }
    Ok(out)
}

fn add_trait_bounds(mut generics: syn::Generics, bound: syn::TypeParamBound) -> syn::Generics {
    for param in &mut generics.params {
        if let syn::GenericParam::Type(type_param) = param {
            type_param.bounds.push(bound.clone());
        }
    }
    generics
}

/// Derives the `vaultpack::Encode` trait for a struct.
///
/// Named structs encode as wire maps keyed by field name (or the
/// `#[vaultpack(rename = "...")]` override), tuple structs as wire arrays in
/// declaration order, unit structs as nil. `#[vaultpack(skip)]` fields are
/// omitted from the output.
#[proc_macro_derive(Encode, attributes(vaultpack))]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_encode(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn expand_encode(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new(
                Span::call_site(),
                "Encode can only be derived for structs",
            ))
        }
    };

    let body = match fields {
        Fields::Named(named) => {
            let mut writes = Vec::new();
            for field in &named.named {
                let attrs = parse_field_attrs(&field.attrs)?;
                if attrs.skip {
                    continue;
                }
                let ident = field.ident.as_ref().ok_or_else(|| {
                    syn::Error::new(Span::call_site(), "named field without an identifier")
                })?;
                let key = attrs.rename.unwrap_or_else(|| ident.to_string());
                writes.push(quote! {
                    map.encode(#key, &self.#ident)?;
                });
            }
            quote! {
                let mut map = encoder.keyed()?;
                #(#writes)*
                Ok(())
            }
        }
        Fields::Unnamed(unnamed) => {
            let mut writes = Vec::new();
            for (position, field) in unnamed.unnamed.iter().enumerate() {
                let attrs = parse_field_attrs(&field.attrs)?;
                if attrs.skip {
                    continue;
                }
                let index = Index::from(position);
                writes.push(quote! {
                    seq.encode(&self.#index)?;
                });
            }
            quote! {
                let mut seq = encoder.unkeyed()?;
                #(#writes)*
                Ok(())
            }
        }
        Fields::Unit => quote! {
            encoder.single_value().encode_nil()
        },
    };

    let generics = add_trait_bounds(input.generics.clone(), syn::parse_quote!(::vaultpack::Encode));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::vaultpack::Encode for #name #ty_generics #where_clause {
            fn encode(
                &self,
                encoder: &mut ::vaultpack::Encoder,
            ) -> ::std::result::Result<(), ::vaultpack::EncodeError> {
                #body
            }
        }
    })
}

/// Derives the `vaultpack::Decode` trait for a struct.
///
/// The mirror of `#[derive(Encode)]`: named structs read their fields by key
/// from a keyed container, tuple structs sequentially from an unkeyed
/// container, unit structs expect nil. `#[vaultpack(skip)]` and
/// `#[vaultpack(default)]` fields fall back to `Default::default()`.
#[proc_macro_derive(Decode, attributes(vaultpack))]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_decode(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn expand_decode(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new(
                Span::call_site(),
                "Decode can only be derived for structs",
            ))
        }
    };

    let body = match fields {
        Fields::Named(named) => {
            let mut reads = Vec::new();
            for field in &named.named {
                let attrs = parse_field_attrs(&field.attrs)?;
                let ident = field.ident.as_ref().ok_or_else(|| {
                    syn::Error::new(Span::call_site(), "named field without an identifier")
                })?;
                let key = attrs
                    .rename
                    .clone()
                    .unwrap_or_else(|| ident.to_string());
                let read = if attrs.skip {
                    quote! { #ident: ::std::default::Default::default() }
                } else if attrs.default {
                    quote! { #ident: map.decode_or_default(#key)? }
                } else {
                    quote! { #ident: map.decode(#key)? }
                };
                reads.push(read);
            }
            quote! {
                let map = decoder.keyed()?;
                Ok(Self { #(#reads),* })
            }
        }
        Fields::Unnamed(unnamed) => {
            let mut reads = Vec::new();
            for field in &unnamed.unnamed {
                let attrs = parse_field_attrs(&field.attrs)?;
                let read = if attrs.skip {
                    quote! { ::std::default::Default::default() }
                } else {
                    quote! { seq.decode_next()? }
                };
                reads.push(read);
            }
            quote! {
                let mut seq = decoder.unkeyed()?;
                Ok(Self(#(#reads),*))
            }
        }
        Fields::Unit => quote! {
            if decoder.single_value().decode_nil()? {
                Ok(Self)
            } else {
                Err(::vaultpack::DecodeError::TypeMismatch {
                    expected: "nil",
                    actual: decoder.peek_format()?,
                    path: decoder.coding_path().clone(),
                })
            }
        },
    };

    let generics = add_trait_bounds(input.generics.clone(), syn::parse_quote!(::vaultpack::Decode));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::vaultpack::Decode for #name #ty_generics #where_clause {
            fn decode(
                decoder: &mut ::vaultpack::Decoder<'_>,
            ) -> ::std::result::Result<Self, ::vaultpack::DecodeError> {
                #body
            }
        }
    })
}
