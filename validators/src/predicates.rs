//! Format and membership predicates over JSON-typed input.
//!
//! Inputs arrive as [`serde_json::Value`] because the harness feeds them
//! straight from request/response payloads, where a field may be missing
//! (`null`) or carry the wrong type. Every predicate fails closed on
//! anything that is not a string.

use crate::types::{Priority, Role, Status};
use regex::Regex;
use serde_json::Value;
use std::str::FromStr;
use std::sync::OnceLock;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

/// `local@domain.tld` check on a plain string. No surrounding whitespace
/// is tolerated.
pub fn email_matches(email: &str) -> bool {
    !email.is_empty() && email_regex().is_match(email)
}

pub fn is_valid_email(input: &Value) -> bool {
    input.as_str().is_some_and(email_matches)
}

pub fn is_valid_password(input: &Value) -> bool {
    input
        .as_str()
        .is_some_and(|p| p.chars().count() >= MIN_PASSWORD_LENGTH)
}

pub fn is_valid_role(input: &Value) -> bool {
    is_member::<Role>(input)
}

pub fn is_valid_priority(input: &Value) -> bool {
    is_member::<Priority>(input)
}

pub fn is_valid_status(input: &Value) -> bool {
    is_member::<Status>(input)
}

fn is_member<T: FromStr>(input: &Value) -> bool {
    input.as_str().is_some_and(|s| s.parse::<T>().is_ok())
}
