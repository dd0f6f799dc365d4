//! Validation rulesets as the controllers declare them.

use firin_core::storefront::OrderStatus;
use firin_core::validation::{Rule, RuleParseError, Ruleset};
use serde_json::{json, Map, Value};

fn input(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn login_rules() -> Ruleset {
    Ruleset::new()
        .field("username", vec![Rule::Required, Rule::Str, Rule::Max(64.0)])
        .field("password", vec![Rule::Required, Rule::Str, Rule::Max(128.0)])
        .field("code", vec![Rule::Nullable, Rule::Str])
}

fn status_rules() -> Ruleset {
    Ruleset::new()
        .field("durum", vec![Rule::Required, Rule::Str, Rule::In(OrderStatus::wire_values())])
}

fn contact_rules() -> Ruleset {
    Ruleset::new()
        .field("name", vec![Rule::Required, Rule::Str, Rule::Max(100.0)])
        .field("email", vec![Rule::Required, Rule::Email])
        .field("phone", vec![Rule::Nullable, Rule::Phone])
        .field("message", vec![Rule::Required, Rule::Str, Rule::Min(10.0), Rule::Max(1000.0)])
}

#[test]
fn test_login_rules_whitelist_extra_fields() {
    let validated = login_rules()
        .validate(&input(json!({
            "username": "ayse",
            "password": "parola",
            "role": "superadmin",
            "is_admin": true,
        })))
        .expect("valid credentials should pass");

    // Client-supplied extras are dropped, not forwarded.
    assert_eq!(validated.len(), 2);
    assert!(!validated.contains_key("role"));
    assert!(!validated.contains_key("is_admin"));
}

#[test]
fn test_login_rules_code_is_optional_but_typed() {
    assert!(login_rules()
        .validate(&input(json!({ "username": "a", "password": "b" })))
        .is_ok());
    assert!(login_rules()
        .validate(&input(json!({ "username": "a", "password": "b", "code": null })))
        .is_ok());
    assert!(login_rules()
        .validate(&input(json!({ "username": "a", "password": "b", "code": "123456" })))
        .is_ok());
    assert!(login_rules()
        .validate(&input(json!({ "username": "a", "password": "b", "code": 123456 })))
        .is_err());
}

#[test]
fn test_status_rules_reject_unknown_value_with_full_list() {
    let errors = status_rules()
        .validate(&input(json!({ "durum": "invalid_value" })))
        .unwrap_err();

    let message = &errors.field("durum").unwrap()[0];
    for status in OrderStatus::ALL {
        assert!(
            message.contains(status.as_str()),
            "error message should list '{status}': {message}"
        );
    }
}

#[test]
fn test_status_rules_accept_every_wire_value() {
    for status in OrderStatus::ALL {
        let validated = status_rules()
            .validate(&input(json!({ "durum": status.as_str() })))
            .unwrap_or_else(|e| panic!("'{status}' should validate: {e}"));
        assert_eq!(validated.get("durum"), Some(&json!(status.as_str())));
    }
}

#[test]
fn test_contact_rules_collect_all_failures_at_once() {
    let errors = contact_rules()
        .validate(&input(json!({
            "email": "bozuk",
            "message": "kisa",
        })))
        .unwrap_err();

    // name missing, email malformed, message too short: all reported.
    assert!(errors.field("name").is_some());
    assert!(errors.field("email").is_some());
    assert!(errors.field("message").is_some());
    assert!(errors.field("phone").is_none(), "nullable absent field stays silent");
}

#[test]
fn test_contact_rules_phone_checked_only_when_present() {
    let base = json!({
        "name": "Ali",
        "email": "ali@example.com",
        "message": "Hafta sonu için pasta siparişi.",
    });

    assert!(contact_rules().validate(&input(base.clone())).is_ok());

    let mut with_phone = input(base.clone());
    with_phone.insert("phone".to_string(), json!("+90 555 123 4567"));
    assert!(contact_rules().validate(&with_phone).is_ok());

    let mut bad_phone = input(base);
    bad_phone.insert("phone".to_string(), json!("beş yüz elli beş"));
    assert!(contact_rules().validate(&bad_phone).is_err());
}

#[test]
fn test_ruleset_specs_parse_like_the_declared_rules() {
    // The pipe-spec form builds the same ruleset the controllers declare in
    // code; both must agree on outcomes.
    let parsed = Ruleset::new()
        .parse_field("durum", "required|string|in:beklemede,hazirlaniyor,yolda,teslim_edildi,iptal")
        .unwrap();

    assert!(parsed.validate(&input(json!({ "durum": "yolda" }))).is_ok());
    assert!(parsed.validate(&input(json!({ "durum": "kayip" }))).is_err());
    assert!(parsed.validate(&input(json!({}))).is_err());
}

#[test]
fn test_misspelled_rule_is_a_startup_error() {
    let result = Ruleset::new().parse_field("email", "required|emial");

    assert_eq!(result.unwrap_err(), RuleParseError::UnknownRule("emial".to_string()));
}
