// tagged.rs - Implementation module
use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase};
use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, parse_macro_input};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameRule {
    None,
    SnakeCase,
    KebabCase,
    ScreamingSnakeCase,
    CamelCase,
}

/// Internal implementation of the Tagged derive macro.
pub(crate) fn derive_tagged_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_tagged_impl(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn generate_tagged_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let rule = find_rename_rule(input)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) => {
            if data.variants.is_empty() {
                return Err(syn::Error::new_spanned(
                    name,
                    "Tagged cannot be derived for an enum without variants",
                ));
            }

            let arms = data.variants.iter().map(|v| {
                let ident = &v.ident;
                let tag = rule.apply(&ident.to_string());

                quote! { Self::#ident { .. } => #tag, }
            });

            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(_) => {
            let tag = rule.apply(&name.to_string());
            quote! { #tag }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Tagged can only be derived for enums and structs",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::tactor::message::Tagged for #name #ty_generics #where_clause {
            fn tag(&self) -> &'static str {
                #body
            }
        }
    })
}

/// Reads `#[tagged(rename_all = "...")]`, defaulting to the identifier as written.
fn find_rename_rule(input: &DeriveInput) -> syn::Result<RenameRule> {
    let mut rule = RenameRule::None;

    for attr in &input.attrs {
        if !attr.path().is_ident("tagged") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                rule = RenameRule::parse(&lit)?;
                Ok(())
            } else {
                Err(meta.error("unsupported tagged attribute, expected `rename_all`"))
            }
        })?;
    }

    Ok(rule)
}

// Implementations

impl RenameRule {
    fn parse(lit: &syn::LitStr) -> syn::Result<Self> {
        match lit.value().as_str() {
            "snake_case" => Ok(RenameRule::SnakeCase),
            "kebab-case" => Ok(RenameRule::KebabCase),
            "SCREAMING_SNAKE_CASE" => Ok(RenameRule::ScreamingSnakeCase),
            "camelCase" => Ok(RenameRule::CamelCase),
            other => Err(syn::Error::new_spanned(
                lit,
                format!("unknown rename rule `{other}`"),
            )),
        }
    }

    fn apply(self, ident: &str) -> String {
        match self {
            RenameRule::None => ident.to_string(),
            RenameRule::SnakeCase => ident.to_snake_case(),
            RenameRule::KebabCase => ident.to_kebab_case(),
            RenameRule::ScreamingSnakeCase => ident.to_shouty_snake_case(),
            RenameRule::CamelCase => ident.to_lower_camel_case(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_rename_rules() {
        assert_eq!(RenameRule::None.apply("GetBalance"), "GetBalance");
        assert_eq!(RenameRule::SnakeCase.apply("GetBalance"), "get_balance");
        assert_eq!(RenameRule::KebabCase.apply("GetBalance"), "get-balance");
        assert_eq!(
            RenameRule::ScreamingSnakeCase.apply("GetBalance"),
            "GET_BALANCE"
        );
        assert_eq!(RenameRule::CamelCase.apply("GetBalance"), "getBalance");
    }

    #[test]
    fn test_find_rename_rule() {
        let input: DeriveInput = parse_quote! {
            #[tagged(rename_all = "kebab-case")]
            enum Msg { A }
        };
        assert_eq!(find_rename_rule(&input).unwrap(), RenameRule::KebabCase);

        let input: DeriveInput = parse_quote! {
            enum Msg { A }
        };
        assert_eq!(find_rename_rule(&input).unwrap(), RenameRule::None);
    }

    #[test]
    fn test_unknown_rule_rejected() {
        let input: DeriveInput = parse_quote! {
            #[tagged(rename_all = "Title Case")]
            enum Msg { A }
        };
        assert!(find_rename_rule(&input).is_err());
    }

    #[test]
    fn test_generate_enum() {
        let input: DeriveInput = parse_quote! {
            #[tagged(rename_all = "snake_case")]
            enum Msg { Increment, Add(u32), Set { value: u32 } }
        };

        let tokens = generate_tagged_impl(&input).unwrap().to_string();
        assert!(tokens.contains("\"increment\""));
        assert!(tokens.contains("\"add\""));
        assert!(tokens.contains("\"set\""));
    }

    #[test]
    fn test_union_rejected() {
        let input: DeriveInput = parse_quote! {
            union Raw { a: u32, b: f32 }
        };
        assert!(generate_tagged_impl(&input).is_err());
    }
}
