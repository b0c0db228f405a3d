//! Offline tier: the validator library driven with literal inputs. Needs no
//! network and no running service.

use crate::scenario::{
    ensure, ensure_eq, ensure_valid, fail, Check, ScenarioRegistry, ScenarioResult,
};
use chrono::DateTime;
use serde_json::{json, Value};
use validators::prelude::*;

/// Inputs every enumeration predicate must reject.
fn rejected_inputs(valid_word: &str) -> Vec<Value> {
    vec![
        json!(""),
        json!("invalid"),
        json!(valid_word.to_uppercase()),
        json!(format!("{valid_word} ")),
        Value::Null,
        json!(123),
    ]
}

fn check_membership(
    label: &str,
    valid: &[&str],
    sample: &str,
    predicate: fn(&Value) -> bool,
) -> ScenarioResult<()> {
    for word in valid {
        ensure(predicate(&json!(word)), || {
            format!("{label}: '{word}' rejected")
        })?;
    }
    for input in rejected_inputs(sample) {
        ensure(!predicate(&input), || format!("{label}: {input} accepted"))?;
    }
    Ok(())
}

fn priority_enumeration() -> ScenarioResult<()> {
    let valid = Priority::ALL.map(|p| p.as_str());
    check_membership("priority", &valid, "medium", is_valid_priority)?;
    ensure(!is_valid_priority(&json!("LOW")), || {
        "priority: 'LOW' accepted".to_string()
    })
}

fn status_enumeration() -> ScenarioResult<()> {
    let valid = Status::ALL.map(|s| s.as_str());
    check_membership("status", &valid, "new", is_valid_status)
}

fn role_enumeration() -> ScenarioResult<()> {
    let valid = Role::ALL.map(|r| r.as_str());
    check_membership("role", &valid, "admin", is_valid_role)
}

fn email_format() -> ScenarioResult<()> {
    let cases = [
        (json!("test@example.com"), true),
        (json!("test+tag@example.com"), true),
        (json!("first.last@sub.example.org"), true),
        (json!("@example.com"), false),
        (json!("test@.com"), false),
        (json!("test@example"), false),
        (json!(""), false),
        (Value::Null, false),
        (json!(42), false),
    ];
    for (input, expected) in cases {
        ensure_eq(&format!("is_valid_email({input})"), &expected, &is_valid_email(&input))?;
    }
    Ok(())
}

fn password_length() -> ScenarioResult<()> {
    let cases = [
        (json!("admin123"), true),
        (json!("123456"), true),
        (json!("12345"), false),
        (json!(""), false),
        (json!(123456), false),
        (Value::Null, false),
    ];
    for (input, expected) in cases {
        ensure_eq(
            &format!("is_valid_password({input})"),
            &expected,
            &is_valid_password(&input),
        )?;
    }
    Ok(())
}

fn csv_escaping() -> ScenarioResult<()> {
    ensure_eq("escape(None)", "", escape_csv_field(None::<&str>).as_str())?;
    ensure_eq("escape(plain)", "plain", escape_csv_field(Some("plain")).as_str())?;
    ensure_eq("escape(a,b)", "\"a,b\"", escape_csv_field(Some("a,b")).as_str())?;
    ensure_eq(
        "escape(quotes)",
        "\"He said \"\"hi\"\"\"",
        escape_csv_field(Some("He said \"hi\"")).as_str(),
    )?;
    ensure_eq(
        "escape(newline)",
        "\"line\nbreak\"",
        escape_csv_field(Some("line\nbreak")).as_str(),
    )?;
    ensure_eq("escape(42)", "42", escape_csv_field(Some(42)).as_str())
}

/// Escaping an already escaped field quotes it again.
fn csv_escaping_not_idempotent() -> ScenarioResult<()> {
    for input in ["a,b", "He said \"hi\"", "line\nbreak"] {
        let once = escape_csv_field(Some(input));
        let twice = escape_csv_field(Some(once.as_str()));
        ensure(twice != once, || {
            format!("escaping {input:?} twice gave the same result {once:?}")
        })?;
    }
    Ok(())
}

fn truncation() -> ScenarioResult<()> {
    let long_text = "This is a very long defect description that exceeds the limit";
    for max in [5, 10, 20, DEFAULT_TRUNCATE_LENGTH] {
        let out = truncate(Some(long_text), max);
        ensure(out.chars().count() <= max, || {
            format!("truncate(.., {max}) gave {} chars", out.chars().count())
        })?;
        ensure(out.ends_with("..."), || {
            format!("truncate(.., {max}) = {out:?} has no ellipsis")
        })?;
    }
    ensure_eq("truncate(short)", "short", truncate(Some("short"), 20).as_str())?;
    ensure_eq("truncate(None)", "", truncate(None, 20).as_str())
}

fn whitespace_normalization() -> ScenarioResult<()> {
    ensure_eq("normalize", "a b", normalize_whitespace(Some("  a\nb  ")).as_str())?;
    ensure_eq("normalize(crlf)", "a  b", normalize_whitespace(Some("a\r\nb")).as_str())?;
    ensure_eq("normalize(None)", "", normalize_whitespace(None).as_str())
}

fn json_parsing() -> ScenarioResult<()> {
    ensure_eq(
        "parse(object)",
        &json!({"key": "value", "number": 123}),
        &safe_json_parse(Some(r#"{"key":"value","number":123}"#), Value::Null),
    )?;
    ensure_eq("parse(empty)", &Value::Null, &safe_json_parse(Some(""), Value::Null))?;
    ensure_eq(
        "parse(truncated)",
        &Value::Null,
        &safe_json_parse(Some(r#"{"key":"value""#), Value::Null),
    )?;
    ensure_eq("parse(None)", &json!([]), &safe_json_parse(None, json!([])))
}

fn id_generation() -> ScenarioResult<()> {
    for prefix in ["d", "p", "user"] {
        let id = generate_id(prefix);
        ensure(id.starts_with(&format!("{prefix}_")), || {
            format!("{id} lacks prefix {prefix}")
        })?;
        let suffix = id.rsplit('_').next().unwrap_or_default();
        let in_range = suffix
            .parse::<u16>()
            .map(|n| (1000..=9999).contains(&n))
            .unwrap_or(false);
        ensure(in_range, || format!("{id} has suffix outside 1000..=9999"))?;
    }
    Ok(())
}

fn timestamps() -> ScenarioResult<()> {
    let Some(month_ago) = iso_days_ago(30) else {
        return fail("iso_days_ago(30) out of range");
    };
    for stamp in [iso_now(), month_ago] {
        ensure(stamp.ends_with('Z'), || format!("{stamp} is not UTC"))?;
        ensure(DateTime::parse_from_rfc3339(&stamp).is_ok(), || {
            format!("{stamp} is not RFC 3339")
        })?;
    }
    ensure(iso_days_ago(1).is_some_and(|day_ago| day_ago < iso_now()), || {
        "a day ago sorts after now".to_string()
    })?;
    ensure(iso_days_ago(i64::MAX).is_none(), || {
        "out-of-range offset produced a timestamp".to_string()
    })
}

/// Every role can read, and admin holds every other role's permissions.
fn role_permissions() -> ScenarioResult<()> {
    let admin = Role::Admin.permissions();
    ensure_eq("admin permission count", &Permission::ALL.len(), &admin.len())?;
    for role in Role::ALL {
        ensure(role.has_permission(Permission::Read), || {
            format!("{role} cannot read")
        })?;
        for permission in role.permissions() {
            ensure(admin.contains(permission), || {
                format!("{role} has {permission}, admin does not")
            })?;
        }
    }
    ensure(!Role::Manager.has_permission(Permission::ManageUsers), || {
        "manager can manage users".to_string()
    })
}

fn defect_validation() -> ScenarioResult<()> {
    let valid = json!({
        "title": "Crack in foundation",
        "projectId": "p1",
        "priority": "high",
        "status": "new"
    });
    ensure_valid("valid defect", validate_defect(&valid))?;

    let invalid = json!({
        "title": "",
        "projectId": "p1",
        "priority": "invalid_priority",
        "status": "invalid_status"
    });
    let violations = validate_defect(&invalid);
    ensure_eq("invalid defect violations", &3, &violations.len())
}

fn defect_workflow() -> ScenarioResult<()> {
    let lifecycle = [Status::New, Status::InProgress, Status::InReview, Status::Closed];
    for pair in lifecycle.windows(2) {
        ensure(pair[0].can_transition_to(pair[1]), || {
            format!("{} -> {} not allowed", pair[0], pair[1])
        })?;
    }
    for status in Status::ALL {
        for next in status.next_statuses() {
            ensure(is_valid_status(&json!(next.as_str())), || {
                format!("{status} -> {next} leads outside the status set")
            })?;
        }
    }
    ensure(Status::Closed.is_terminal() && Status::Cancelled.is_terminal(), || {
        "closed and cancelled must be terminal".to_string()
    })?;
    ensure(!Status::Closed.can_transition_to(Status::New), || {
        "closed defect reopened".to_string()
    })
}

fn project_fixture() -> ScenarioResult<()> {
    let project = json!({
        "id": "p1",
        "name": "North Residential",
        "code": "NORTH-01",
        "location": "Moscow",
        "stages": [
            {"id": "s1", "name": "Foundation", "startDate": "2024-01-01T00:00:00.000Z"},
            {"id": "s2", "name": "Frame", "startDate": "2024-02-01T00:00:00.000Z"}
        ]
    });
    ensure_valid("project fixture", validate_project(&project))?;

    let broken = json!({"id": "p2", "name": "No stages", "code": "X", "location": "Y"});
    ensure(!validate_project(&broken).is_empty(), || {
        "project without stages accepted".to_string()
    })
}

fn defect_list_format() -> ScenarioResult<()> {
    let page = json!({
        "items": [{
            "id": "d1",
            "title": "Defect 1",
            "status": "new",
            "priority": "high",
            "createdAt": "2024-01-01T00:00:00.000Z"
        }],
        "total": 1,
        "page": 1,
        "pageSize": 20
    });
    ensure_valid("defect page", validate_defect_page(&page))?;

    let stats = json!({
        "byStatus": {"new": 1},
        "byPriority": {"high": 1},
        "monthlyCreated": [{"month": "2024-01", "count": 1}]
    });
    ensure_valid("stats", validate_stats(&stats))
}

/// Scenarios of the offline tier, in execution order.
pub fn offline_scenarios() -> ScenarioRegistry<()> {
    let checks: [(&'static str, fn() -> ScenarioResult<()>); 17] = [
        ("priority enumeration", priority_enumeration),
        ("status enumeration", status_enumeration),
        ("role enumeration", role_enumeration),
        ("email format", email_format),
        ("password length", password_length),
        ("csv escaping", csv_escaping),
        ("csv escaping is not idempotent", csv_escaping_not_idempotent),
        ("truncation", truncation),
        ("whitespace normalization", whitespace_normalization),
        ("json parsing", json_parsing),
        ("id generation", id_generation),
        ("timestamps", timestamps),
        ("role permissions", role_permissions),
        ("defect validation", defect_validation),
        ("defect workflow", defect_workflow),
        ("project fixture", project_fixture),
        ("defect list format", defect_list_format),
    ];

    let mut registry = ScenarioRegistry::new();
    for (name, check) in checks {
        registry.register(Box::new(Check::new(name, check)));
    }
    registry
}
