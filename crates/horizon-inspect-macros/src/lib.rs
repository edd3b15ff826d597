//! Procedural macros for Horizon Inspect reflection.
//!
//! This crate provides `#[derive(Reflect)]`, which turns a struct with named
//! fields into a reflected class, and `#[derive(ReflectEnum)]`, which makes a
//! unit-only enum usable as a field value.
//!
//! # Attributes
//!
//! ## `#[reflect(...)]`
//!
//! Struct-level configuration:
//!
//! ```ignore
//! #[derive(Reflect, Default)]
//! #[reflect(ui_name = "Light Source", title = "name", script = "UI[.[label{text=Light;}].]")]
//! struct Light {
//!     name: String,
//!     intensity: f32,
//! }
//! ```
//!
//! - `ui_name = "..."`: label used when nothing better is available
//! - `title = "field"`: field whose text is the instance title
//! - `script = "..."`: class `UIScript` property
//! - `property(Key = "value")`: any other class property
//! - `no_factory`: don't generate a default-instance factory
//!
//! ## `#[field(...)]`
//!
//! Per-field configuration:
//!
//! ```ignore
//! #[field(ui_name = "Texture", file_path, filter = "*.png;*.jpg", group = "Look/Maps")]
//! texture: PathBuf,
//!
//! #[field(read_only, default = "1")]
//! revision: u32,
//!
//! #[field(base)]
//! base: Node,
//!
//! #[field(reference)]
//! target: Option<Shared<Node>>,
//!
//! #[field(records)]
//! keys: Vec<Shared<Key>>,
//! ```
//!
//! - Flags: `hide`, `read_only`, `file_path`, `discard`, `flags = N`
//! - `ui_name`, `default`, `group`, `group_expanded`, `script`, `filter`,
//!   `property(Key = "value")`
//! - `base`: the embedded base struct (at most one)
//! - `reference`: an `Option<Shared<T>>` link to another reflected object
//! - `records`: a `Vec<Shared<T>>` of nested reflected records
//! - `skip`: leave the field out of the metadata

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Attribute, Data, DeriveInput, Field, Fields, Ident, LitInt, LitStr, Type,
    parse_macro_input,
};

/// Derive the `Reflect` trait and generate a static `MetaClass`.
///
/// This macro generates:
/// - Type-erased getter/setter functions for every value field
/// - A static `MetaClass` with one `MetaField` per field
/// - `Self::META` and `Self::register_type`
/// - Implementation of the `Reflect` trait
#[proc_macro_derive(Reflect, attributes(reflect, field))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match impl_derive_reflect(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derive `FieldValue` for a unit-only enum.
///
/// Variants are shown by name; rename one with `#[reflect(name = "...")]`.
#[proc_macro_derive(ReflectEnum, attributes(reflect))]
pub fn derive_reflect_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match impl_derive_reflect_enum(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Parsed struct-level `#[reflect(...)]` attributes.
#[derive(Default)]
struct ClassAttrs {
    ui_name: Option<String>,
    title: Option<Ident>,
    properties: Vec<(String, String)>,
    no_factory: bool,
}

/// How the field's storage is reached.
enum FieldKind {
    Value,
    Base,
    Reference,
    Records,
}

/// Parsed field information.
struct FieldInfo {
    ident: Ident,
    ty: Type,
    kind: FieldKind,
    ui_name: String,
    flag_bits: TokenStream2,
    read_only: bool,
    default: Option<String>,
    properties: Vec<(String, String)>,
}

fn impl_derive_reflect(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Reflect derive does not support generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Reflect derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Reflect derive only supports structs; use ReflectEnum for enums",
            ));
        }
    };

    let class_attrs = parse_class_attrs(&input.attrs)?;

    let mut infos = Vec::new();
    for field in fields {
        if let Some(info) = parse_field(field)? {
            infos.push(info);
        }
    }

    let bases: Vec<&FieldInfo> = infos
        .iter()
        .filter(|info| matches!(info.kind, FieldKind::Base))
        .collect();
    if bases.len() > 1 {
        return Err(syn::Error::new_spanned(
            &bases[1].ident,
            "Reflect derive supports at most one #[field(base)]",
        ));
    }

    let struct_str = struct_name.to_string();
    let lower = struct_str.to_lowercase();
    let meta_name = format_ident!("{}_META", struct_str.to_uppercase());
    let ui_name = class_attrs
        .ui_name
        .clone()
        .unwrap_or_else(|| humanize(&struct_str));

    let accessor_fns: Vec<TokenStream2> = infos
        .iter()
        .map(|info| generate_accessor_fns(struct_name, &lower, info))
        .collect();

    let field_meta: Vec<TokenStream2> = infos
        .iter()
        .filter(|info| !matches!(info.kind, FieldKind::Base))
        .map(|info| generate_field_meta(&lower, info))
        .collect();

    let base_link = match bases.first() {
        Some(base) => {
            let base_ty = &base.ty;
            let project = format_ident!("__{}_{}_project", lower, base.ident);
            let project_mut = format_ident!("__{}_{}_project_mut", lower, base.ident);
            quote! {
                Some(::horizon_inspect_core::meta::BaseLink {
                    class: <#base_ty>::META,
                    project: #project,
                    project_mut: #project_mut,
                })
            }
        }
        None => quote! { None },
    };

    let class_properties = property_tokens(&class_attrs.properties);

    let factory = if class_attrs.no_factory {
        quote! { None }
    } else {
        quote! {
            Some(|| ::horizon_inspect_core::as_instance(
                ::horizon_inspect_core::share(<#struct_name as Default>::default())
            ))
        }
    };

    let title_fn = class_attrs.title.as_ref().map(|title| {
        quote! {
            fn title(&self) -> Option<String> {
                Some(::horizon_inspect_core::FieldValue::to_text(&self.#title))
            }
        }
    });

    Ok(quote! {
        #(#accessor_fns)*

        /// Static metadata for this type (generated by #[derive(Reflect)]).
        #[allow(non_upper_case_globals)]
        static #meta_name: ::horizon_inspect_core::meta::MetaClass = ::horizon_inspect_core::meta::MetaClass {
            name: #struct_str,
            ui_name: #ui_name,
            type_id: ::std::any::TypeId::of::<#struct_name>,
            base: #base_link,
            fields: &[#(#field_meta),*],
            properties: &#class_properties,
            create: #factory,
        };

        impl #struct_name {
            /// Reference to the static `MetaClass` for this type.
            pub const META: &'static ::horizon_inspect_core::meta::MetaClass = &#meta_name;

            /// Register this type, and its bases, in `registry`.
            pub fn register_type(registry: &mut ::horizon_inspect_core::TypeRegistry) {
                registry.register(&#meta_name);
            }
        }

        impl ::horizon_inspect_core::Reflect for #struct_name {
            fn meta_class(&self) -> &'static ::horizon_inspect_core::meta::MetaClass {
                &#meta_name
            }

            #title_fn

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }
    })
}

/// Parse struct-level #[reflect(...)] attributes.
fn parse_class_attrs(attrs: &[Attribute]) -> syn::Result<ClassAttrs> {
    let mut result = ClassAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("reflect") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("ui_name") {
                result.ui_name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("title") {
                let lit: LitStr = meta.value()?.parse()?;
                result.title = Some(lit.parse()?);
            } else if meta.path.is_ident("script") {
                let lit: LitStr = meta.value()?.parse()?;
                result.properties.push(("UIScript".into(), lit.value()));
            } else if meta.path.is_ident("property") {
                meta.parse_nested_meta(|pair| {
                    let key = path_key(&pair.path)?;
                    let value: LitStr = pair.value()?.parse()?;
                    result.properties.push((key, value.value()));
                    Ok(())
                })?;
            } else if meta.path.is_ident("no_factory") {
                result.no_factory = true;
            } else {
                return Err(meta.error("unknown reflect attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

/// Parse a field and its #[field(...)] attributes.
fn parse_field(field: &Field) -> syn::Result<Option<FieldInfo>> {
    let Some(ident) = field.ident.clone() else {
        return Ok(None);
    };

    let mut info = FieldInfo {
        ui_name: humanize(&ident.to_string()),
        ident,
        ty: field.ty.clone(),
        kind: FieldKind::Value,
        flag_bits: quote! { 0u32 },
        read_only: false,
        default: None,
        properties: Vec::new(),
    };
    let mut flags: Vec<TokenStream2> = Vec::new();
    let mut skip = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("field") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("skip") {
                skip = true;
            } else if path.is_ident("base") {
                info.kind = FieldKind::Base;
            } else if path.is_ident("reference") {
                info.kind = FieldKind::Reference;
            } else if path.is_ident("records") {
                info.kind = FieldKind::Records;
            } else if path.is_ident("hide") {
                flags.push(quote! { ::horizon_inspect_core::FieldFlags::HIDE.bits() });
            } else if path.is_ident("read_only") {
                info.read_only = true;
                flags.push(quote! { ::horizon_inspect_core::FieldFlags::READ_ONLY.bits() });
            } else if path.is_ident("file_path") {
                flags.push(quote! { ::horizon_inspect_core::FieldFlags::FILE_PATH.bits() });
            } else if path.is_ident("discard") {
                flags.push(quote! { ::horizon_inspect_core::FieldFlags::DISCARD.bits() });
            } else if path.is_ident("flags") {
                let bits: LitInt = meta.value()?.parse()?;
                let bits: u32 = bits.base10_parse()?;
                flags.push(quote! { #bits });
            } else if path.is_ident("ui_name") {
                info.ui_name = meta.value()?.parse::<LitStr>()?.value();
            } else if path.is_ident("default") {
                info.default = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("group") {
                let group: LitStr = meta.value()?.parse()?;
                info.properties.push(("UIGroup".into(), group.value()));
            } else if path.is_ident("group_expanded") {
                info.properties.push(("UIGroupExpanded".into(), "true".into()));
            } else if path.is_ident("script") {
                let script: LitStr = meta.value()?.parse()?;
                info.properties.push(("UIScript".into(), script.value()));
            } else if path.is_ident("filter") {
                let filter: LitStr = meta.value()?.parse()?;
                info.properties.push(("FileFilter".into(), filter.value()));
            } else if path.is_ident("property") {
                meta.parse_nested_meta(|pair| {
                    let key = path_key(&pair.path)?;
                    let value: LitStr = pair.value()?.parse()?;
                    info.properties.push((key, value.value()));
                    Ok(())
                })?;
            } else {
                return Err(meta.error("unknown field attribute"));
            }
            Ok(())
        })?;
    }

    if skip {
        return Ok(None);
    }
    if !flags.is_empty() {
        info.flag_bits = quote! { #(#flags)|* };
    }
    Ok(Some(info))
}

fn path_key(path: &syn::Path) -> syn::Result<String> {
    path.get_ident()
        .map(|ident| ident.to_string())
        .ok_or_else(|| syn::Error::new_spanned(path, "expected a single identifier"))
}

/// `scale_factor` -> `Scale Factor`, `LightSource` -> `Light Source`.
fn humanize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut capitalize = true;
    let mut prev_lower = false;
    for ch in name.trim_start_matches("r#").chars() {
        if ch == '_' {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
            capitalize = true;
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            out.push(' ');
        }
        if capitalize {
            out.extend(ch.to_uppercase());
            capitalize = false;
        } else {
            out.push(ch);
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
    }
    out
}

fn property_tokens(properties: &[(String, String)]) -> TokenStream2 {
    let pairs = properties.iter().map(|(key, value)| quote! { (#key, #value) });
    quote! { [#(#pairs),*] }
}

/// Convert a type to a string representation.
fn type_to_string(ty: &Type) -> String {
    quote!(#ty).to_string().replace(' ', "")
}

/// Generate the type-erased functions a field's metadata points at.
fn generate_accessor_fns(struct_name: &Ident, lower: &str, info: &FieldInfo) -> TokenStream2 {
    let field = &info.ident;
    let ty = &info.ty;
    let struct_str = struct_name.to_string();
    let field_str = field.to_string();
    let type_str = type_to_string(ty);

    match info.kind {
        FieldKind::Base => {
            let project = format_ident!("__{}_{}_project", lower, field);
            let project_mut = format_ident!("__{}_{}_project_mut", lower, field);
            quote! {
                #[allow(non_snake_case)]
                fn #project(
                    obj: &dyn ::horizon_inspect_core::Reflect,
                ) -> Option<&dyn ::horizon_inspect_core::Reflect> {
                    obj.as_any()
                        .downcast_ref::<#struct_name>()
                        .map(|typed| &typed.#field as &dyn ::horizon_inspect_core::Reflect)
                }

                #[allow(non_snake_case)]
                fn #project_mut(
                    obj: &mut dyn ::horizon_inspect_core::Reflect,
                ) -> Option<&mut dyn ::horizon_inspect_core::Reflect> {
                    obj.as_any_mut()
                        .downcast_mut::<#struct_name>()
                        .map(|typed| &mut typed.#field as &mut dyn ::horizon_inspect_core::Reflect)
                }
            }
        }
        FieldKind::Reference => {
            let getter = format_ident!("__{}_{}_reference", lower, field);
            quote! {
                #[allow(non_snake_case)]
                fn #getter(
                    obj: &dyn ::horizon_inspect_core::Reflect,
                ) -> Option<::horizon_inspect_core::Instance> {
                    obj.as_any()
                        .downcast_ref::<#struct_name>()
                        .and_then(|typed| typed.#field.clone())
                        .map(|target| target as ::horizon_inspect_core::Instance)
                }
            }
        }
        FieldKind::Records => {
            let getter = format_ident!("__{}_{}_records", lower, field);
            quote! {
                #[allow(non_snake_case)]
                fn #getter(
                    obj: &dyn ::horizon_inspect_core::Reflect,
                ) -> Vec<::horizon_inspect_core::Instance> {
                    obj.as_any()
                        .downcast_ref::<#struct_name>()
                        .map(|typed| {
                            typed
                                .#field
                                .iter()
                                .map(|record| record.clone() as ::horizon_inspect_core::Instance)
                                .collect()
                        })
                        .unwrap_or_default()
                }
            }
        }
        FieldKind::Value => {
            let getter = format_ident!("__{}_{}_getter", lower, field);
            let setter = format_ident!("__{}_{}_setter", lower, field);
            let setter_fn = if info.read_only {
                quote! {}
            } else {
                quote! {
                    #[allow(non_snake_case)]
                    fn #setter(
                        obj: &mut dyn ::horizon_inspect_core::Reflect,
                        value: Box<dyn ::std::any::Any + Send>,
                    ) -> ::horizon_inspect_core::MetaResult<()> {
                        let typed = obj.as_any_mut().downcast_mut::<#struct_name>().ok_or(
                            ::horizon_inspect_core::MetaError::WrongOwner {
                                class: #struct_str,
                                field: #field_str,
                            },
                        )?;
                        let value = value.downcast::<#ty>().map_err(|_| {
                            ::horizon_inspect_core::MetaError::TypeMismatch {
                                expected: #type_str,
                                field: #field_str,
                            }
                        })?;
                        typed.#field = *value;
                        Ok(())
                    }
                }
            };

            quote! {
                #[allow(non_snake_case)]
                fn #getter(
                    obj: &dyn ::horizon_inspect_core::Reflect,
                ) -> Option<Box<dyn ::std::any::Any + Send>> {
                    obj.as_any()
                        .downcast_ref::<#struct_name>()
                        .map(|typed| Box::new(typed.#field.clone()) as Box<dyn ::std::any::Any + Send>)
                }

                #setter_fn
            }
        }
    }
}

/// Generate one `MetaField` entry.
fn generate_field_meta(lower: &str, info: &FieldInfo) -> TokenStream2 {
    let field = &info.ident;
    let ty = &info.ty;
    let name = field.to_string();
    let ui_name = &info.ui_name;
    let flag_bits = &info.flag_bits;
    let type_str = type_to_string(ty);
    let properties = property_tokens(&info.properties);
    let default = match &info.default {
        Some(value) => quote! { Some(#value) },
        None => quote! { None },
    };

    let (value_type, type_id, access) = match info.kind {
        FieldKind::Value => {
            let getter = format_ident!("__{}_{}_getter", lower, field);
            let setter = if info.read_only {
                quote! { None }
            } else {
                let setter = format_ident!("__{}_{}_setter", lower, field);
                quote! { Some(#setter) }
            };
            (
                quote! { <#ty as ::horizon_inspect_core::FieldValue>::VALUE_TYPE },
                quote! { ::std::any::TypeId::of::<#ty> },
                quote! {
                    ::horizon_inspect_core::meta::FieldAccess::Value {
                        get: #getter,
                        set: #setter,
                        format: ::horizon_inspect_core::value::format_erased::<#ty>,
                        parse: ::horizon_inspect_core::value::parse_erased::<#ty>,
                        eq: ::horizon_inspect_core::value::eq_erased::<#ty>,
                    }
                },
            )
        }
        FieldKind::Reference => {
            let getter = format_ident!("__{}_{}_reference", lower, field);
            (
                quote! { &::horizon_inspect_core::value::REFERENCE },
                quote! { ::std::any::TypeId::of::<()> },
                quote! { ::horizon_inspect_core::meta::FieldAccess::Reference(#getter) },
            )
        }
        FieldKind::Records => {
            let getter = format_ident!("__{}_{}_records", lower, field);
            (
                quote! { &::horizon_inspect_core::value::ELEMENT_ARRAY },
                quote! { ::std::any::TypeId::of::<()> },
                quote! { ::horizon_inspect_core::meta::FieldAccess::Records(#getter) },
            )
        }
        FieldKind::Base => unreachable!("base fields carry no MetaField"),
    };

    quote! {
        ::horizon_inspect_core::meta::MetaField {
            name: #name,
            ui_name: #ui_name,
            flags: ::horizon_inspect_core::FieldFlags::from_bits(#flag_bits),
            value_type: #value_type,
            type_name: #type_str,
            type_id: #type_id,
            default: #default,
            properties: &#properties,
            access: #access,
        }
    }
}

fn impl_derive_reflect_enum(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let enum_name = &input.ident;
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "ReflectEnum derive only supports enums",
        ));
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            input,
            "ReflectEnum derive needs at least one variant",
        ));
    }

    let mut idents = Vec::new();
    let mut names = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "ReflectEnum derive only supports unit variants",
            ));
        }
        let mut name = variant.ident.to_string();
        for attr in &variant.attrs {
            if !attr.path().is_ident("reflect") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    name = meta.value()?.parse::<LitStr>()?.value();
                    Ok(())
                } else {
                    Err(meta.error("unknown reflect attribute"))
                }
            })?;
        }
        idents.push(&variant.ident);
        names.push(name);
    }

    let enum_str = enum_name.to_string();
    let type_name = format_ident!("{}_VALUE_TYPE", enum_str.to_uppercase());

    Ok(quote! {
        /// Value type descriptor for this enum (generated by #[derive(ReflectEnum)]).
        #[allow(non_upper_case_globals)]
        static #type_name: ::horizon_inspect_core::ValueType =
            ::horizon_inspect_core::ValueType::enumeration(#enum_str, &[#(#names),*]);

        impl ::horizon_inspect_core::FieldValue for #enum_name {
            const VALUE_TYPE: &'static ::horizon_inspect_core::ValueType = &#type_name;

            fn to_text(&self) -> String {
                match self {
                    #(Self::#idents => #names.to_string(),)*
                }
            }

            fn from_text(text: &str) -> Option<Self> {
                match text.trim() {
                    #(#names => Some(Self::#idents),)*
                    _ => None,
                }
            }
        }
    })
}
