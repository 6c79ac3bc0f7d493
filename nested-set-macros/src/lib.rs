use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{parse_macro_input, spanned::Spanned, Attribute, Data, DeriveInput, Fields, Ident, Type};

#[proc_macro_derive(NestedSetModel, attributes(nested_set))]
pub fn derive_nested_set_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match impl_nested_set_model(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct Options {
    id_field: Option<String>,
    id_type: Option<Type>,
    parent_field: Option<String>,
    order_field: Option<String>,
    left_field: Option<String>,
    right_field: Option<String>,
    level_field: Option<String>,
    entity_name: Option<String>,
    max_depth: Option<syn::LitInt>,
    indent: Option<String>,
    position_column: Option<String>,
    lock_key: Option<String>,
    advisory_lock: Option<bool>,
}

fn impl_nested_set_model(input: &DeriveInput) -> syn::Result<TokenStream> {
    let struct_ident = &input.ident;

    let data_struct = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "NestedSetModel can only be derived for structs",
            ))
        }
    };

    let mut options = Options::default();
    let mut table_name: Option<String> = None;

    for attr in &input.attrs {
        if attr.path().is_ident("nested_set") {
            parse_nested_set_attr(attr, &mut options)?;
        }

        if attr.path().is_ident("sea_orm") {
            if let Some(name) = parse_sea_orm_table_name(attr)? {
                table_name = Some(name);
            }
        }
    }

    let id_field_name = options.id_field.unwrap_or_else(|| "id".to_string());
    let parent_field_name = options
        .parent_field
        .unwrap_or_else(|| "parent_id".to_string());
    let order_field_name = options.order_field.unwrap_or_else(|| "name".to_string());
    let left_field_name = options.left_field.unwrap_or_else(|| "lft".to_string());
    let right_field_name = options.right_field.unwrap_or_else(|| "rght".to_string());
    let level_field_name = options.level_field.unwrap_or_else(|| "level".to_string());

    let field = |name: &str| Ident::new(name, struct_ident.span());
    let id_field_ident = field(&id_field_name);
    let parent_field_ident = field(&parent_field_name);
    let order_field_ident = field(&order_field_name);
    let left_field_ident = field(&left_field_name);
    let right_field_ident = field(&right_field_name);
    let level_field_ident = field(&level_field_name);

    let mut id_field_type: Option<Type> = options.id_type.clone();

    if let Fields::Named(ref fields) = data_struct.fields {
        let mut missing: Vec<&str> = vec![
            parent_field_name.as_str(),
            order_field_name.as_str(),
            left_field_name.as_str(),
            right_field_name.as_str(),
            level_field_name.as_str(),
        ];
        for field in &fields.named {
            if let Some(ident) = &field.ident {
                if ident == &id_field_ident && id_field_type.is_none() {
                    id_field_type = Some(field.ty.clone());
                }
                missing.retain(|name| ident != name);
            }
        }
        if let Some(name) = missing.first() {
            return Err(syn::Error::new(
                struct_ident.span(),
                format!("NestedSetModel expects a field named `{name}`"),
            ));
        }
    } else {
        return Err(syn::Error::new(
            data_struct.fields.span(),
            "NestedSetModel requires named fields",
        ));
    }

    let id_type = id_field_type.ok_or_else(|| {
        syn::Error::new(
            struct_ident.span(),
            "Unable to determine id field type; specify `id_type = ...` in #[nested_set]",
        )
    })?;

    let entity_name = options
        .entity_name
        .unwrap_or_else(|| struct_ident.unraw().to_string());
    let table_name = table_name.unwrap_or_else(|| struct_ident.unraw().to_string());

    let column = |name: &str| format_ident!("{}", to_pascal_case(name));
    let id_column_variant = column(&id_field_name);
    let parent_column_variant = column(&parent_field_name);
    let order_column_variant = column(&order_field_name);
    let left_column_variant = column(&left_field_name);
    let right_column_variant = column(&right_field_name);
    let level_column_variant = column(&level_field_name);

    let entity_name_literal = syn::LitStr::new(&entity_name, struct_ident.span());
    let table_name_literal = syn::LitStr::new(&table_name, struct_ident.span());

    let mut option_calls = TokenStream2::new();
    if let Some(max_depth) = &options.max_depth {
        option_calls.extend(quote! { .max_depth(#max_depth) });
    }
    if let Some(indent) = &options.indent {
        option_calls.extend(quote! { .indent(#indent) });
    }
    if let Some(position) = &options.position_column {
        option_calls.extend(quote! {
            .order_strategy(::nested_set::OrderStrategy::numeric_column(#position))
        });
    }
    if options.advisory_lock == Some(false) {
        option_calls.extend(quote! {
            .advisory_lock_strategy(::nested_set::AdvisoryLockStrategy::Disabled)
        });
    } else if let Some(key) = &options.lock_key {
        option_calls.extend(quote! {
            .advisory_lock_strategy(::nested_set::AdvisoryLockStrategy::Namespaced(
                ::nested_set::AdvisoryLockKey::new(#key),
            ))
        });
    }

    let generated = quote! {
        impl ::nested_set::TreeRow for #struct_ident {
            type Id = #id_type;

            fn node_id(&self) -> Self::Id {
                self.#id_field_ident.clone()
            }

            fn parent_id(&self) -> ::core::option::Option<Self::Id> {
                self.#parent_field_ident.clone()
            }

            fn order_key(&self) -> &str {
                self.#order_field_ident.as_str()
            }

            fn tree_fields(&self) -> ::nested_set::TreeFields {
                ::nested_set::TreeFields::new(
                    self.#left_field_ident,
                    self.#right_field_ident,
                    self.#level_field_ident,
                )
            }
        }

        impl ::nested_set::NestedSetModel for #struct_ident {
            type Entity = Entity;
            type ActiveModel = ActiveModel;

            fn nested_set_config() -> &'static ::nested_set::NestedSetConfig {
                static CONFIG: ::nested_set::__private::Lazy<::nested_set::NestedSetConfig> =
                    ::nested_set::__private::Lazy::new(|| {
                        let base = ::nested_set::NestedSetConfig::new(
                            #entity_name_literal,
                            #table_name_literal,
                        );
                        ::nested_set::NestedSetOptions::default()
                            #option_calls
                            .apply(base)
                    });
                &CONFIG
            }

            fn set_tree_fields(active: &mut Self::ActiveModel, fields: ::nested_set::TreeFields) {
                active.#left_field_ident = ::sea_orm::ActiveValue::Set(fields.left);
                active.#right_field_ident = ::sea_orm::ActiveValue::Set(fields.right);
                active.#level_field_ident = ::sea_orm::ActiveValue::Set(fields.level);
            }

            fn id_to_value(id: &Self::Id) -> ::sea_orm::Value {
                ::sea_orm::Value::from(id.clone())
            }

            fn id_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#id_column_variant
            }

            fn parent_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#parent_column_variant
            }

            fn order_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#order_column_variant
            }

            fn left_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#left_column_variant
            }

            fn right_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#right_column_variant
            }

            fn level_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#level_column_variant
            }
        }
    };

    Ok(generated.into())
}

fn parse_nested_set_attr(attr: &Attribute, options: &mut Options) -> syn::Result<()> {
    attr.parse_nested_meta(|meta| {
        let ident = meta
            .path
            .get_ident()
            .ok_or_else(|| syn::Error::new(meta.path.span(), "Invalid option key"))?
            .to_string();

        match ident.as_str() {
            "id_type" => {
                let ty: Type = meta.value()?.parse()?;
                options.id_type = Some(ty);
            }
            "max_depth" => {
                let value: syn::LitInt = meta.value()?.parse()?;
                value.base10_parse::<usize>()?;
                options.max_depth = Some(value);
            }
            "advisory_lock" => {
                let value: syn::LitBool = meta.value()?.parse()?;
                options.advisory_lock = Some(value.value());
            }
            other => {
                let slot = match other {
                    "id_field" => &mut options.id_field,
                    "parent_field" => &mut options.parent_field,
                    "order_field" => &mut options.order_field,
                    "left_field" => &mut options.left_field,
                    "right_field" => &mut options.right_field,
                    "level_field" => &mut options.level_field,
                    "entity_name" => &mut options.entity_name,
                    "indent" => &mut options.indent,
                    "position_column" => &mut options.position_column,
                    "lock_key" => &mut options.lock_key,
                    _ => {
                        return Err(syn::Error::new(
                            meta.path.span(),
                            format!("Unsupported nested_set option `{other}`"),
                        ));
                    }
                };
                let value: syn::LitStr = meta.value()?.parse()?;
                *slot = Some(value.value());
            }
        }

        Ok(())
    })
}

fn parse_sea_orm_table_name(attr: &Attribute) -> syn::Result<Option<String>> {
    let mut table_name: Option<String> = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("table_name") {
            let value: syn::LitStr = meta.value()?.parse()?;
            table_name = Some(value.value());
        }
        Ok(())
    })?;
    Ok(table_name)
}

fn to_pascal_case(value: &str) -> String {
    value
        .split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
