#![cfg(feature = "macros")]
#![allow(dead_code)]

use tactor::prelude::*;

#[derive(Tagged)]
enum Plain {
    Increment,
    Add(u32),
    Set { value: u32 },
}

#[derive(Tagged)]
#[tagged(rename_all = "snake_case")]
enum Snake {
    GetBalance,
    Withdraw(u64),
}

#[derive(Tagged)]
#[tagged(rename_all = "kebab-case")]
struct OpenAccount {
    owner: String,
}

#[derive(Tagged)]
#[tagged(rename_all = "SCREAMING_SNAKE_CASE")]
enum Shout {
    CloseAccount,
}

#[derive(Tagged)]
#[tagged(rename_all = "camelCase")]
struct CloseAccount;

#[derive(Tagged)]
enum Wrapped<T> {
    Value(T),
    Empty,
}

#[test]
fn test_enum_tags_are_variant_names() {
    assert_eq!(Plain::Increment.tag(), "Increment");
    assert_eq!(Plain::Add(1).tag(), "Add");
    assert_eq!(Plain::Set { value: 1 }.tag(), "Set");
}

#[test]
fn test_rename_all() {
    assert_eq!(Snake::GetBalance.tag(), "get_balance");
    assert_eq!(Snake::Withdraw(5).tag(), "withdraw");
    assert_eq!(Shout::CloseAccount.tag(), "CLOSE_ACCOUNT");
}

#[test]
fn test_struct_tag_is_type_name() {
    let msg = OpenAccount {
        owner: "ada".into(),
    };
    assert_eq!(msg.tag(), "open-account");
    assert_eq!(CloseAccount.tag(), "closeAccount");
}

#[test]
fn test_generic_enum() {
    assert_eq!(Wrapped::Value(3u8).tag(), "Value");
    assert_eq!(Wrapped::<u8>::Empty.tag(), "Empty");
}
