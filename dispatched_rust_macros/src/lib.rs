use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

// ============================================================================
// #[derive(EventMessage)]
// ============================================================================

/// Derive macro for the `EventMessage` trait.
///
/// Implements `event_id()` and `occurred_at()` by delegating to an embedded
/// `info: EventInfo` field, and sets `TYPE_NAME` to the struct identifier.
///
/// # Usage
///
/// ```ignore
/// #[derive(Serialize, Deserialize, EventMessage)]
/// struct OrderPlacedEvent {
///     info: EventInfo,
///     order_id: String,
/// }
/// ```
///
/// The type name used for routing can be overridden:
///
/// ```ignore
/// #[derive(Serialize, Deserialize, EventMessage)]
/// #[event_message(type_name = "OrderPlacedEvent")]
/// struct OrderPlaced {
///     info: EventInfo,
/// }
/// ```
#[proc_macro_derive(EventMessage, attributes(event_message))]
pub fn derive_event_message(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ident = &input.ident;

    let mut type_name = ident.to_string();
    for attr in &input.attrs {
        if attr.path().is_ident("event_message") {
            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("type_name") {
                    let value: LitStr = meta.value()?.parse()?;
                    type_name = value.value();
                    Ok(())
                } else {
                    Err(meta.error("expected `type_name = \"...\"`"))
                }
            });
            if let Err(err) = parsed {
                return err.to_compile_error().into();
            }
        }
    }

    let has_info_field = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields
                .named
                .iter()
                .any(|field| field.ident.as_ref().is_some_and(|name| name == "info")),
            _ => false,
        },
        _ => false,
    };

    if !has_info_field {
        return syn::Error::new_spanned(
            ident,
            "#[derive(EventMessage)] requires a struct with a named field `info: EventInfo`",
        )
        .to_compile_error()
        .into();
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::dispatched_rust::EventMessage for #ident #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;

            fn event_id(&self) -> ::dispatched_rust::Uuid {
                self.info.event_id
            }

            fn occurred_at(&self) -> ::dispatched_rust::DateTime<::dispatched_rust::Utc> {
                self.info.occurred_at
            }
        }
    };

    expanded.into()
}
