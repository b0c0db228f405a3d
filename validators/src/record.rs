//! Shape checks for records returned by the defect-tracker API.
//!
//! Each check returns every [`Violation`] it finds rather than stopping at
//! the first, so a failing contract test can report the whole picture.

use crate::predicates::{is_valid_email, is_valid_priority, is_valid_role, is_valid_status};
use serde_json::Value;
use std::fmt;

/// Keys every project object carries.
pub const PROJECT_KEYS: &[&str] = &["id", "name", "code", "location", "stages"];
/// Keys every project stage carries.
pub const STAGE_KEYS: &[&str] = &["id", "name", "startDate"];
/// Keys of a paginated defect listing.
pub const DEFECT_PAGE_KEYS: &[&str] = &["items", "total", "page", "pageSize"];
/// Keys a defect list item must expose.
pub const DEFECT_ITEM_KEYS: &[&str] = &["id", "title", "status", "priority", "createdAt"];
/// Keys of the aggregated statistics payload.
pub const STATS_KEYS: &[&str] = &["byStatus", "byPriority", "monthlyCreated"];
/// Keys of a user object as returned by login and the user listings.
pub const USER_KEYS: &[&str] = &["id", "email", "role"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The value checked was not a JSON object.
    NotAnObject { context: String },
    /// A required key is absent.
    MissingKey { key: String },
    /// A required key is present but null or an empty string.
    EmptyField { field: String },
    /// A field has the wrong JSON type.
    WrongType { field: String, expected: &'static str },
    /// A field is outside its enumeration or format.
    InvalidValue { field: String, value: Value },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NotAnObject { context } => write!(f, "{context} is not a JSON object"),
            Violation::MissingKey { key } => write!(f, "missing required key '{key}'"),
            Violation::EmptyField { field } => write!(f, "required field '{field}' is empty"),
            Violation::WrongType { field, expected } => {
                write!(f, "field '{field}' should be {expected}")
            }
            Violation::InvalidValue { field, value } => {
                write!(f, "field '{field}' has invalid value {value}")
            }
        }
    }
}

/// Keys from `required` that `value` does not contain. A non-object is
/// missing all of them.
pub fn missing_keys<'a>(value: &Value, required: &[&'a str]) -> Vec<&'a str> {
    match value.as_object() {
        Some(map) => required
            .iter()
            .copied()
            .filter(|key| !map.contains_key(*key))
            .collect(),
        None => required.to_vec(),
    }
}

fn require_keys(value: &Value, required: &[&str], context: &str) -> Vec<Violation> {
    if !value.is_object() {
        return vec![Violation::NotAnObject {
            context: context.to_string(),
        }];
    }
    missing_keys(value, required)
        .into_iter()
        .map(|key| Violation::MissingKey {
            key: key.to_string(),
        })
        .collect()
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Validate a defect submitted to or returned by the API.
///
/// `title`, `projectId` and `priority` must be present and non-empty;
/// `priority` must name a known priority, and `status`, when present,
/// a known status.
pub fn validate_defect(defect: &Value) -> Vec<Violation> {
    if !defect.is_object() {
        return vec![Violation::NotAnObject {
            context: "defect".to_string(),
        }];
    }

    let mut violations: Vec<Violation> = ["title", "projectId", "priority"]
        .into_iter()
        .filter(|field| is_blank(defect.get(*field)))
        .map(|field| Violation::EmptyField {
            field: field.to_string(),
        })
        .collect();

    let priority = defect.get("priority").unwrap_or(&Value::Null);
    if !is_blank(Some(priority)) && !is_valid_priority(priority) {
        violations.push(Violation::InvalidValue {
            field: "priority".to_string(),
            value: priority.clone(),
        });
    }

    if let Some(status) = defect.get("status").filter(|s| !is_blank(Some(*s))) {
        if !is_valid_status(status) {
            violations.push(Violation::InvalidValue {
                field: "status".to_string(),
                value: status.clone(),
            });
        }
    }

    violations
}

/// Validate a project object, including each of its stages.
pub fn validate_project(project: &Value) -> Vec<Violation> {
    let mut violations = require_keys(project, PROJECT_KEYS, "project");
    if !violations.is_empty() {
        return violations;
    }

    for field in ["id", "name", "code"] {
        if !project[field].is_string() {
            violations.push(Violation::WrongType {
                field: field.to_string(),
                expected: "a string",
            });
        }
    }

    match project["stages"].as_array() {
        Some(stages) => {
            for (i, stage) in stages.iter().enumerate() {
                violations.extend(
                    require_keys(stage, STAGE_KEYS, &format!("stages[{i}]"))
                        .into_iter()
                        .map(|v| match v {
                            Violation::MissingKey { key } => Violation::MissingKey {
                                key: format!("stages[{i}].{key}"),
                            },
                            other => other,
                        }),
                );
            }
        }
        None => violations.push(Violation::WrongType {
            field: "stages".to_string(),
            expected: "an array",
        }),
    }

    violations
}

/// Validate a paginated defect listing: `{items, total, page, pageSize}`
/// with integer counters and well-formed items.
pub fn validate_defect_page(page: &Value) -> Vec<Violation> {
    let mut violations = require_keys(page, DEFECT_PAGE_KEYS, "defect page");
    if !violations.is_empty() {
        return violations;
    }

    for field in ["total", "page", "pageSize"] {
        if !page[field].is_u64() {
            violations.push(Violation::WrongType {
                field: field.to_string(),
                expected: "a non-negative integer",
            });
        }
    }

    match page["items"].as_array() {
        Some(items) => {
            for (i, item) in items.iter().enumerate() {
                violations.extend(validate_defect_item(i, item));
            }
        }
        None => violations.push(Violation::WrongType {
            field: "items".to_string(),
            expected: "an array",
        }),
    }

    violations
}

fn validate_defect_item(index: usize, item: &Value) -> Vec<Violation> {
    let mut violations: Vec<Violation> = missing_keys(item, DEFECT_ITEM_KEYS)
        .into_iter()
        .map(|key| Violation::MissingKey {
            key: format!("items[{index}].{key}"),
        })
        .collect();

    if item.get("title").is_some() && is_blank(item.get("title")) {
        violations.push(Violation::EmptyField {
            field: format!("items[{index}].title"),
        });
    }

    let enumerated: [(&str, fn(&Value) -> bool); 2] =
        [("status", is_valid_status), ("priority", is_valid_priority)];
    for (field, is_valid) in enumerated {
        if let Some(value) = item.get(field) {
            if !is_valid(value) {
                violations.push(Violation::InvalidValue {
                    field: format!("items[{index}].{field}"),
                    value: value.clone(),
                });
            }
        }
    }

    violations
}

/// Validate the statistics payload: `byStatus` and `byPriority` objects and
/// a `monthlyCreated` array.
pub fn validate_stats(stats: &Value) -> Vec<Violation> {
    let mut violations = require_keys(stats, STATS_KEYS, "stats");
    if !violations.is_empty() {
        return violations;
    }

    for field in ["byStatus", "byPriority"] {
        if !stats[field].is_object() {
            violations.push(Violation::WrongType {
                field: field.to_string(),
                expected: "an object",
            });
        }
    }
    if !stats["monthlyCreated"].is_array() {
        violations.push(Violation::WrongType {
            field: "monthlyCreated".to_string(),
            expected: "an array",
        });
    }

    violations
}

/// Validate a user object: `id`, a well-formed `email` and a known `role`.
pub fn validate_user(user: &Value) -> Vec<Violation> {
    let mut violations = require_keys(user, USER_KEYS, "user");
    if !violations.is_empty() {
        return violations;
    }

    if is_blank(user.get("id")) {
        violations.push(Violation::EmptyField {
            field: "id".to_string(),
        });
    }
    for (field, ok) in [
        ("email", is_valid_email(&user["email"])),
        ("role", is_valid_role(&user["role"])),
    ] {
        if !ok {
            violations.push(Violation::InvalidValue {
                field: field.to_string(),
                value: user[field].clone(),
            });
        }
    }

    violations
}
