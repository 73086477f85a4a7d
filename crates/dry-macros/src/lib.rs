// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! This crate provides procedural macros for the Dry object model.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, LitStr, Path};

/// A derive macro that implements `dry_core::object::ObjectType` and
/// `dry_core::object::Object` for a struct.
///
/// The struct must own a `dry_core::object::ObjectBase`, either in a field
/// named `base` or in a field tagged with `#[object_base]`.
///
/// The optional `#[object(...)]` attribute accepts:
/// * `name = "..."` to override the registered type name (defaults to the struct name).
/// * `base = Path` to declare the logical base type used for `is_type_of` queries.
///
/// ```ignore
/// #[derive(Object)]
/// #[object(base = Component)]
/// struct Light {
///     base: ObjectBase,
///     component: Component,
///     brightness: f32,
/// }
/// ```
#[proc_macro_derive(Object, attributes(object, object_base))]
pub fn derive_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_object(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_object(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let options = ObjectOptions::parse(input)?;
    let base_field = find_base_field(input)?;

    let type_name = options
        .name
        .map(|lit| lit.value())
        .unwrap_or_else(|| name.to_string());

    let base_type_name = match &options.base {
        Some(path) => quote! {
            ::core::option::Option::Some(<#path as ::dry_core::object::ObjectType>::TYPE_NAME)
        },
        None => quote! { ::core::option::Option::None },
    };

    Ok(quote! {
        impl #impl_generics ::dry_core::object::ObjectType for #name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;
            const BASE_TYPE_NAME: ::core::option::Option<&'static str> = #base_type_name;
        }

        impl #impl_generics ::dry_core::object::Object for #name #ty_generics #where_clause {
            fn base(&self) -> &::dry_core::object::ObjectBase {
                &self.#base_field
            }

            fn type_name(&self) -> &'static str {
                #type_name
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }

            fn into_any(
                self: ::std::boxed::Box<Self>,
            ) -> ::std::boxed::Box<dyn ::core::any::Any> {
                self
            }
        }
    })
}

#[derive(Default)]
struct ObjectOptions {
    name: Option<LitStr>,
    base: Option<Path>,
}

impl ObjectOptions {
    fn parse(input: &DeriveInput) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in input.attrs.iter().filter(|a| a.path().is_ident("object")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    options.name = Some(meta.value()?.parse()?);
                    Ok(())
                } else if meta.path.is_ident("base") {
                    options.base = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `name` or `base`"))
                }
            })?;
        }
        Ok(options)
    }
}

fn find_base_field(input: &DeriveInput) -> syn::Result<Ident> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "`Object` can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "`Object` requires a struct with named fields",
        ));
    };

    let tagged = fields
        .named
        .iter()
        .find(|f| f.attrs.iter().any(|a| a.path().is_ident("object_base")));
    let by_name = || {
        fields
            .named
            .iter()
            .find(|f| f.ident.as_ref().is_some_and(|i| i == "base"))
    };

    tagged
        .or_else(by_name)
        .and_then(|f| f.ident.clone())
        .ok_or_else(|| {
            syn::Error::new_spanned(
                &input.ident,
                "`Object` needs an `ObjectBase` field named `base` or tagged `#[object_base]`",
            )
        })
}
