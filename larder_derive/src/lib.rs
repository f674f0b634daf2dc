//! Derive macros for easily translating between objects in a Larder store and Rust structs.

extern crate proc_macro;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, quote_spanned, ToTokens};
use syn::{parse_macro_input, DeriveInput};

macro_rules! error_stream {
    ( $span:expr, $message:expr ) => {
        quote_spanned!($span=> compile_error!($message);).into()
    }
}

macro_rules! try_or_context {
    ( $expr:expr, $message:expr$(,)? ) => {
        match $expr {
            Ok(x) => x,
            Err(span) => return error_stream!(span, $message),
        }
    };
}

macro_rules! try_or_error {
    ( $expr:expr$(,)? ) => {
        match $expr {
            Ok(x) => x,
            Err(e) => return e.to_compile_error().into(),
        }
    };
}

const SUPPORTED_TYPES_MESSAGE: &str =
    "fields in ObjectShape must be i64, String, Vec<String> or Option<i64>";

fn parse_field_name(field: &syn::Field) -> syn::Result<String> {
    if let Some(attr) = field
        .attrs
        .iter()
        .find(|attr| attr.style == syn::AttrStyle::Outer && attr.path.is_ident("field"))
    {
        attr.parse_args::<syn::LitStr>().map(|lit| lit.value())
    } else {
        Ok(field.ident.clone().unwrap().to_string())
    }
}

enum FieldKind {
    Number,
    Str,
    List,
    OptionalNumber,
}

fn parse_field_kind(ty: &syn::Type) -> syn::Result<FieldKind> {
    let type_path = match ty {
        syn::Type::Path(p) => p,
        _ => return Err(syn::Error::new_spanned(ty, SUPPORTED_TYPES_MESSAGE)),
    };

    if type_path.path.is_ident("i64") {
        return Ok(FieldKind::Number);
    }

    if type_path.path.is_ident("String") {
        return Ok(FieldKind::Str);
    }

    // The only non-trivial paths allowed are `Vec<String>` and `Option<i64>`.
    if type_path.path.segments.len() == 1 {
        let segment = &type_path.path.segments[0];

        if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
            if args.args.len() == 1 {
                if let syn::GenericArgument::Type(syn::Type::Path(inner)) = &args.args[0] {
                    if segment.ident == "Vec" && inner.path.is_ident("String") {
                        return Ok(FieldKind::List);
                    }

                    if segment.ident == "Option" && inner.path.is_ident("i64") {
                        return Ok(FieldKind::OptionalNumber);
                    }
                }
            }
        }
    }

    Err(syn::Error::new_spanned(ty, SUPPORTED_TYPES_MESSAGE))
}

struct ParsedField {
    ident: proc_macro2::Ident,
    accessor: TokenStream2,
    inserter: TokenStream2,
}

fn base_accessor(field_name: &str) -> TokenStream2 {
    quote!(
        object
            .get(#field_name)
            .ok_or(larder::ConversionError::FieldMissing(#field_name.to_string()))?
    )
}

fn number_accessor(field_name: &str) -> TokenStream2 {
    let base_accessor = base_accessor(field_name);

    quote!(
        #base_accessor
        .as_number()
        .ok_or(
            larder::ConversionError::FieldWrongType(
                #field_name.to_string(),
                "number".to_string(),
            ),
        )?
    )
}

fn string_accessor(field_name: &str) -> TokenStream2 {
    let base_accessor = base_accessor(field_name);

    quote!(
        #base_accessor
        .as_str()
        .ok_or(
            larder::ConversionError::FieldWrongType(
                #field_name.to_string(),
                "string".to_string(),
            ),
        )?
        .clone()
    )
}

fn list_accessor(field_name: &str) -> TokenStream2 {
    let base_accessor = base_accessor(field_name);

    quote!(
        #base_accessor
        .as_list()
        .ok_or(
            larder::ConversionError::FieldWrongType(
                #field_name.to_string(),
                "list".to_string(),
            ),
        )?
        .clone()
    )
}

// An absent property is a valid `None`; only a present property of the wrong type is an error.
fn optional_number_accessor(field_name: &str) -> TokenStream2 {
    quote!(
        match object.get(#field_name) {
            Some(value) => Some(
                value
                    .as_number()
                    .ok_or(
                        larder::ConversionError::FieldWrongType(
                            #field_name.to_string(),
                            "number".to_string(),
                        ),
                    )?,
            ),
            None => None,
        }
    )
}

fn accessor_for(kind: &FieldKind, field_name: &str) -> TokenStream2 {
    match kind {
        FieldKind::Number => number_accessor(field_name),
        FieldKind::Str => string_accessor(field_name),
        FieldKind::List => list_accessor(field_name),
        FieldKind::OptionalNumber => optional_number_accessor(field_name),
    }
}

fn inserter_for(kind: &FieldKind, field_name: &str, ident: &proc_macro2::Ident) -> TokenStream2 {
    match kind {
        FieldKind::OptionalNumber => quote!(
            if let Some(value) = self.#ident {
                object.insert(#field_name.to_string(), value.into());
            }
        ),
        _ => quote!(
            object.insert(#field_name.to_string(), self.#ident.into());
        ),
    }
}

fn is_object_id_field(field: &syn::Field) -> bool {
    field
        .ident
        .as_ref()
        .map(|ident| ident == "object_id")
        .unwrap_or(false)
}

fn parse_fields(named_fields: &syn::FieldsNamed) -> syn::Result<Vec<ParsedField>> {
    named_fields
        .named
        .iter()
        .filter(|field| !is_object_id_field(field))
        .map(|field| {
            let field_name = parse_field_name(field)?;
            let field_kind = parse_field_kind(&field.ty)?;
            let ident = field.ident.clone().unwrap();

            let accessor = accessor_for(&field_kind, &field_name);
            let inserter = inserter_for(&field_kind, &field_name, &ident);

            Ok(ParsedField {
                ident,
                accessor,
                inserter,
            })
        })
        .collect()
}

// The `object_id: Option<i64>` field binds to the stored object's ID rather than a property.
fn parse_object_id_field(named_fields: &syn::FieldsNamed) -> syn::Result<bool> {
    let field = match named_fields.named.iter().find(|f| is_object_id_field(f)) {
        Some(f) => f,
        None => return Ok(false),
    };

    match parse_field_kind(&field.ty)? {
        FieldKind::OptionalNumber => Ok(true),
        _ => Err(syn::Error::new_spanned(
            &field.ty,
            "the object_id field of an ObjectShape must be Option<i64>",
        )),
    }
}

enum FixedFieldValue {
    Number(syn::LitInt),
    String(syn::LitStr),
}

impl syn::parse::Parse for FixedFieldValue {
    fn parse(input: &syn::parse::ParseBuffer<'_>) -> syn::Result<Self> {
        let lookahead = input.lookahead1();
        if lookahead.peek(syn::LitInt) {
            input.parse().map(FixedFieldValue::Number)
        } else if lookahead.peek(syn::LitStr) {
            input.parse().map(FixedFieldValue::String)
        } else {
            Err(lookahead.error())
        }
    }
}

impl quote::ToTokens for FixedFieldValue {
    fn to_tokens(&self, tokens: &mut TokenStream2) {
        match self {
            FixedFieldValue::Number(n) => n.to_tokens(tokens),
            FixedFieldValue::String(s) => s.to_tokens(tokens),
        }
    }
}

struct FixedField {
    name: syn::LitStr,
    _arrow_token: syn::token::FatArrow,
    value: FixedFieldValue,
}

impl FixedField {
    fn accessor(&self) -> TokenStream2 {
        match self.value {
            FixedFieldValue::Number(_) => number_accessor(&self.name.value()),
            FixedFieldValue::String(_) => string_accessor(&self.name.value()),
        }
    }
}

impl syn::parse::Parse for FixedField {
    fn parse(input: &syn::parse::ParseBuffer<'_>) -> syn::Result<Self> {
        Ok(FixedField {
            name: input.parse()?,
            _arrow_token: input.parse()?,
            value: input.parse()?,
        })
    }
}

struct FixedFields {
    fields: syn::punctuated::Punctuated<FixedField, syn::Token![,]>,
}

impl syn::parse::Parse for FixedFields {
    fn parse(input: &syn::parse::ParseBuffer<'_>) -> syn::Result<Self> {
        Ok(FixedFields {
            fields: input.parse_terminated(FixedField::parse)?,
        })
    }
}

fn parse_fixed_fields(attrs: &Vec<syn::Attribute>) -> syn::Result<Vec<FixedField>> {
    let attr = match attrs
        .iter()
        .find(|attr| attr.style == syn::AttrStyle::Outer && attr.path.is_ident("fixed_fields"))
    {
        Some(a) => a,
        None => return Ok(Vec::new()),
    };

    let fixed_fields: FixedFields = attr.parse_args()?;

    Ok(fixed_fields
        .fields
        .into_pairs()
        .map(|p| match p {
            syn::punctuated::Pair::Punctuated(f, _) => f,
            syn::punctuated::Pair::End(f) => f,
        })
        .collect())
}

/// Automatically translate between properties of stored objects and fields of structs.
///
/// A basic example:
///
/// ```
/// # use larder::{object, Object};
/// # use larder_derive::ObjectShape;
/// # use std::convert::TryFrom;
/// #[derive(Debug, ObjectShape, PartialEq)]
/// struct Person {
///     name: String,
///     age: Option<i64>,
///     #[field("favoriteFoods")]
///     favorite_foods: Vec<String>,
/// }
///
/// let object: Object = Person {
///     name: "Mary".to_string(),
///     age: Some(34),
///     favorite_foods: vec!["pizza".to_string()],
/// }
/// .into();
///
/// assert_eq!(
///     object,
///     object!("name" => "Mary", "age" => 34, "favoriteFoods" => vec!["pizza"]),
/// );
///
/// assert_eq!(
///     Person::try_from(object!("name" => "Leah", "favoriteFoods" => vec!["salad"])),
///     Ok(Person {
///         name: "Leah".to_string(),
///         age: None,
///         favorite_foods: vec!["salad".to_string()],
///     })
/// );
/// ```
///
/// Structs may also declare constant properties with `#[fixed_fields("kind" => "person")]`
/// (checked when converting back), and a field written exactly as `object_id: Option<i64>` binds
/// to the stored object's ID and implements
/// [`ObjectShapeWithId`](../larder/trait.ObjectShapeWithId.html).
#[proc_macro_derive(ObjectShape, attributes(field, fixed_fields))]
pub fn derive_object_shape(input: TokenStream) -> TokenStream {
    let parsed_struct = parse_macro_input!(input as DeriveInput);
    let orig_type_name = parsed_struct.ident;

    let fixed_fields = try_or_error!(parse_fixed_fields(&parsed_struct.attrs));

    let mut fixed_field_names = Vec::new();
    let mut fixed_field_values = Vec::new();
    let mut fixed_field_accessors = Vec::new();

    for f in fixed_fields.into_iter() {
        fixed_field_accessors.push(f.accessor());
        fixed_field_names.push(f.name);
        fixed_field_values.push(f.value.to_token_stream());
    }

    let struct_data = try_or_context!(
        match parsed_struct.data {
            syn::Data::Struct(s) => Ok(s),
            syn::Data::Enum(e) => Err(e.enum_token.span),
            syn::Data::Union(u) => Err(u.union_token.span),
        },
        "can only derive ObjectShape on a struct",
    );

    let named_fields = try_or_context!(
        match struct_data.fields {
            syn::Fields::Named(ref n) => Ok(n),
            syn::Fields::Unnamed(ref u) => Err(u.paren_token.span),
            syn::Fields::Unit => Err(struct_data.semi_token.unwrap().span),
        },
        "can only derive ObjectShape on a struct with named fields",
    );

    let has_object_id = try_or_error!(parse_object_id_field(named_fields));
    let parsed_fields = try_or_error!(parse_fields(named_fields));

    let mut field_idents = Vec::new();
    let mut field_accessors = Vec::new();
    let mut field_inserters = Vec::new();

    for f in parsed_fields.into_iter() {
        field_idents.push(f.ident);
        field_accessors.push(f.accessor);
        field_inserters.push(f.inserter);
    }

    let object_id_try_from = if has_object_id {
        let accessor = optional_number_accessor("object-id");
        quote!(object_id: #accessor,)
    } else {
        quote!()
    };

    let object_id_inserter = if has_object_id {
        quote!(
            if let Some(object_id) = self.object_id {
                object.insert("object-id".to_string(), object_id.into());
            }
        )
    } else {
        quote!()
    };

    let with_id_impl = if has_object_id {
        quote!(
            impl larder::ObjectShapeWithId for #orig_type_name {
                fn get_object_id(&self) -> Option<i64> {
                    self.object_id
                }

                fn set_object_id(&mut self, object_id: i64) {
                    self.object_id = Some(object_id);
                }
            }
        )
    } else {
        quote!()
    };

    quote!(
        impl std::convert::TryFrom<larder::Object> for #orig_type_name {
            type Error = larder::ConversionError;

            fn try_from(object: larder::Object) -> std::result::Result<#orig_type_name, larder::ConversionError> {
                #(
                    {
                        let value = #fixed_field_accessors;

                        if value != #fixed_field_values {
                            return Err(
                                larder::ConversionError::FixedFieldWrongValue(
                                    #fixed_field_names.to_string(),
                                    #fixed_field_values.into(),
                                    value.into(),
                                )
                            );
                        }
                    }
                )*

                Ok(#orig_type_name {
                    #object_id_try_from
                    #(#field_idents: #field_accessors),*
                })
            }
        }

        impl std::convert::Into<larder::Object> for #orig_type_name {
            fn into(self) -> larder::Object {
                let mut object = larder::Object::new();

                #(object.insert(#fixed_field_names.to_string(), #fixed_field_values.into());)*
                #object_id_inserter
                #(#field_inserters)*

                object
            }
        }

        impl #orig_type_name {
            /// A query pre-filtered on this shape's fixed fields.
            pub fn q() -> larder::query_builder::QueryBuilder {
                larder::Q
                    #(.equal(#fixed_field_names, #fixed_field_values))*
            }
        }

        impl larder::ObjectShape for #orig_type_name {}

        #with_id_impl
    )
    .into()
}
