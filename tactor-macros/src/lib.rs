// lib.rs - Root of macro crate
use proc_macro::TokenStream;

mod tagged;

/// Implements `tactor::message::Tagged` for an enum (tag is the variant name)
/// or a struct (tag is the type name).
///
/// The container attribute `#[tagged(rename_all = "...")]` accepts
/// `snake_case`, `kebab-case`, `SCREAMING_SNAKE_CASE` and `camelCase`.
#[proc_macro_derive(Tagged, attributes(tagged))]
pub fn derive_tagged(input: TokenStream) -> TokenStream {
    tagged::derive_tagged_impl(input)
}
