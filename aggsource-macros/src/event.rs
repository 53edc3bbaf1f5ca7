use crate::utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Item, Result, Token, parse::Parse, parse::ParseStream, parse_macro_input};

pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EventAttrConfig);
    let mut input = parse_macro_input!(item as Item);

    let st = match &mut input {
        Item::Struct(st) => st,
        other => {
            return syn::Error::new(other.span(), "#[event] only supports struct")
                .to_compile_error()
                .into();
        }
    };

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    apply_derives(&mut st.attrs, required);

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();
    let event_type = cfg
        .event_type
        .unwrap_or_else(|| syn::LitStr::new(&ident.to_string(), ident.span()));

    TokenStream::from(quote! {
        #st

        impl #impl_generics ::aggsource_domain::event::Event for #ident #ty_generics #where_clause {
            const EVENT_TYPE: &'static str = #event_type;
        }
    })
}

// -------- parsing --------

struct EventAttrConfig {
    event_type: Option<syn::LitStr>,
}

impl Parse for EventAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.is_empty() {
            return Ok(Self { event_type: None });
        }

        let mut event_type: Option<syn::LitStr> = None;
        let pairs: Punctuated<EventAttrElem, Token![,]> = Punctuated::parse_terminated(input)?;

        for elem in pairs {
            match elem {
                EventAttrElem::EventType(lit) => {
                    if event_type.is_some() {
                        return Err(syn::Error::new(
                            lit.span(),
                            "duplicate key 'event_type' in attribute",
                        ));
                    }
                    if lit.value().is_empty() {
                        return Err(syn::Error::new(lit.span(), "'event_type' must not be empty"));
                    }
                    event_type = Some(lit);
                }
            }
        }
        Ok(Self { event_type })
    }
}

enum EventAttrElem {
    EventType(syn::LitStr),
}

impl Parse for EventAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        if key == "event_type" {
            let _eq: Token![=] = input.parse()?;
            let expr: syn::Expr = input.parse()?;
            match expr {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                }) => Ok(Self::EventType(s)),
                other => Err(syn::Error::new(
                    other.span(),
                    "expected string literal for 'event_type'",
                )),
            }
        } else {
            Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'event_type'",
            ))
        }
    }
}
