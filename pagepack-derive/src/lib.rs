//! # Pagepack Derive Macros
//!
//! This crate provides the procedural macro for `pagepack`. It automates the
//! implementation of the `Persist` trait for plain structs: symmetric
//! `default_write`/`default_read` methods enumerating the fields in declared
//! order, plus the `Any` upcasts.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields};

/// Derives `Persist` for a struct with named fields.
///
/// Fields marked `#[pagepack(skip)]` are excluded from the stream and are
/// restored via `Default::default()` on read.
#[proc_macro_derive(PagepackObject, attributes(pagepack))]
pub fn derive_pagepack_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;

    let data_struct = match input.data {
        Data::Struct(ds) => ds,
        _ => {
            return syn::Error::new(name.span(), "PagepackObject only supports structs")
                .to_compile_error()
                .into();
        }
    };

    let fields = match data_struct.fields {
        Fields::Named(named) => named.named,
        Fields::Unit => Default::default(),
        Fields::Unnamed(_) => {
            return syn::Error::new(
                name.span(),
                "PagepackObject requires named fields (or a unit struct)",
            )
            .to_compile_error()
            .into();
        }
    };

    let mut persisted = Vec::new();
    let mut skipped = Vec::new();

    for field in fields {
        let skip = match parse_attributes(&field.attrs) {
            Ok(skip) => skip,
            Err(e) => return e.to_compile_error().into(),
        };

        let ident = match field.ident.clone() {
            Some(ident) => ident,
            None => continue,
        };
        if skip {
            skipped.push(ident);
        } else {
            persisted.push((ident, field.ty.clone()));
        }
    }

    let write_stmts = persisted.iter().map(|(ident, ty)| {
        quote! {
            <#ty as pagepack::persist::FieldValue>::write_to(&self.#ident, enc)?;
        }
    });

    let read_stmts = persisted.iter().map(|(ident, ty)| {
        quote! {
            self.#ident = <#ty as pagepack::persist::FieldValue>::read_from(dec)?;
        }
    });

    let reset_skipped = skipped.iter().map(|ident| {
        quote! {
            self.#ident = Default::default();
        }
    });

    let expanded = quote! {
        impl pagepack::persist::Persist for #name {
            fn default_write(&self, enc: &mut pagepack::encoder::GraphEncoder<'_>) -> pagepack::Result<()> {
                #(#write_stmts)*
                Ok(())
            }

            fn default_read(&mut self, dec: &mut pagepack::decoder::GraphDecoder<'_>) -> pagepack::Result<()> {
                #(#read_stmts)*
                #(#reset_skipped)*
                Ok(())
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }
    };

    TokenStream::from(expanded)
}

/// Parses `#[pagepack(...)]` attributes. Returns whether the field is skipped.
fn parse_attributes(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut skip = false;

    for attr in attrs {
        if attr.path().is_ident("pagepack") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                    return Ok(());
                }
                Err(meta.error("Unknown pagepack attribute key. Supported: skip"))
            })?;
        }
    }
    Ok(skip)
}
