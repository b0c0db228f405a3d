//! Validation predicates and data-shaping helpers for the defect tracker.
//!
//! Everything here is a pure function over its input (`generate_id` and the
//! timestamp helpers read the clock). The contract harness imports all of its
//! checks from this crate.

pub mod ident;
pub mod json;
pub mod predicates;
pub mod record;
pub mod text;
pub mod time;
pub mod types;

pub use ident::generate_id;
pub use json::safe_json_parse;
pub use predicates::{
    email_matches, is_valid_email, is_valid_password, is_valid_priority, is_valid_role,
    is_valid_status, MIN_PASSWORD_LENGTH,
};
pub use record::{
    missing_keys, validate_defect, validate_defect_page, validate_project, validate_stats,
    validate_user, Violation,
};
pub use text::{escape_csv_field, normalize_whitespace, truncate, DEFAULT_TRUNCATE_LENGTH};
pub use time::{iso_days_ago, iso_now};
pub use types::{ParseEnumError, Permission, Priority, Role, Status};

pub mod prelude {
    pub use crate::ident::*;
    pub use crate::json::*;
    pub use crate::predicates::*;
    pub use crate::record::*;
    pub use crate::text::*;
    pub use crate::time::*;
    pub use crate::types::*;
}
