//! Declarative per-field input validation.
//!
//! A [`Ruleset`] maps field names to ordered rule lists. Validation either
//! returns the whitelisted subset of the input (only declared fields survive,
//! which keeps client-supplied extras like `price` away from handlers that
//! persist "validated" data) or fails with the complete field-keyed error map.
//!
//! Rules are a closed enum rather than name-to-method string dispatch, so a
//! typo in a rule spec is a startup error instead of a silently skipped check.
//!
//! `nullable` has explicit semantics here: when the value is absent or `null`
//! and the field is declared nullable, the remaining rules for that field are
//! skipped entirely.

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9][0-9 ()\-]{6,19}$").expect("phone pattern is valid")
});

/// A ruleset entry referenced an unknown rule name or a bad parameter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("unknown validation rule: {0}")]
    UnknownRule(String),

    #[error("rule '{rule}' has an invalid parameter: {parameter}")]
    InvalidParameter { rule: String, parameter: String },

    #[error("rule '{0}' requires a parameter")]
    MissingParameter(String),
}

/// A single validation rule. Rules execute in declaration order and each
/// failing rule contributes one message to the field's error list.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Required,
    Str,
    Numeric,
    Integer,
    Email,
    Min(f64),
    Max(f64),
    In(Vec<String>),
    Date(Option<String>),
    Phone,
    Boolean,
    Nullable,
    Confirmed,
}

impl Rule {
    /// Parses a single `name` or `name:parameter` rule spec.
    ///
    /// # Errors
    /// Fails on unknown rule names and malformed parameters.
    pub fn parse(spec: &str) -> Result<Self, RuleParseError> {
        let (name, parameter) = match spec.split_once(':') {
            Some((name, parameter)) => (name.trim(), Some(parameter.trim())),
            None => (spec.trim(), None),
        };

        let numeric_param = |rule: &str| -> Result<f64, RuleParseError> {
            let raw = parameter.ok_or_else(|| RuleParseError::MissingParameter(rule.to_string()))?;
            raw.parse().map_err(|_| RuleParseError::InvalidParameter {
                rule: rule.to_string(),
                parameter: raw.to_string(),
            })
        };

        match name {
            "required" => Ok(Self::Required),
            "string" => Ok(Self::Str),
            "numeric" => Ok(Self::Numeric),
            "integer" => Ok(Self::Integer),
            "email" => Ok(Self::Email),
            "min" => Ok(Self::Min(numeric_param("min")?)),
            "max" => Ok(Self::Max(numeric_param("max")?)),
            "in" => {
                let raw = parameter.ok_or_else(|| RuleParseError::MissingParameter("in".into()))?;
                let values: Vec<String> =
                    raw.split(',').map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect();
                if values.is_empty() {
                    return Err(RuleParseError::MissingParameter("in".into()));
                }
                Ok(Self::In(values))
            }
            "date" => Ok(Self::Date(parameter.map(str::to_string))),
            "phone" => Ok(Self::Phone),
            "boolean" => Ok(Self::Boolean),
            "nullable" => Ok(Self::Nullable),
            "confirmed" => Ok(Self::Confirmed),
            other => Err(RuleParseError::UnknownRule(other.to_string())),
        }
    }

    /// Stable rule name, used for custom message lookups.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Str => "string",
            Self::Numeric => "numeric",
            Self::Integer => "integer",
            Self::Email => "email",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::In(_) => "in",
            Self::Date(_) => "date",
            Self::Phone => "phone",
            Self::Boolean => "boolean",
            Self::Nullable => "nullable",
            Self::Confirmed => "confirmed",
        }
    }

    /// Evaluates the rule against a field value. Returns the default error
    /// message on failure, `None` when the rule is satisfied.
    ///
    /// Rules other than `required` are satisfied by absent or null values;
    /// presence is `required`'s concern.
    fn check(&self, field: &str, value: Option<&Value>, input: &Map<String, Value>) -> Option<String> {
        let present = value.is_some_and(|v| !v.is_null());

        match self {
            Self::Required => {
                let empty = match value {
                    None | Some(Value::Null) => true,
                    Some(Value::String(s)) => s.trim().is_empty(),
                    Some(Value::Array(items)) => items.is_empty(),
                    Some(_) => false,
                };
                empty.then(|| format!("the {field} field is required"))
            }
            Self::Str => {
                (present && !value.is_some_and(Value::is_string))
                    .then(|| format!("the {field} field must be a string"))
            }
            Self::Numeric => {
                (present && as_number(value).is_none())
                    .then(|| format!("the {field} field must be a number"))
            }
            Self::Integer => {
                let ok = !present || as_integer(value).is_some();
                (!ok).then(|| format!("the {field} field must be an integer"))
            }
            Self::Email => {
                let ok = !present ||
                    value.and_then(Value::as_str).is_some_and(|s| EMAIL_RE.is_match(s));
                (!ok).then(|| format!("the {field} field must be a valid email address"))
            }
            Self::Min(min) => {
                let Some(size) = value_size(value) else { return None };
                (size < *min).then(|| format!("the {field} field must be at least {min}"))
            }
            Self::Max(max) => {
                let Some(size) = value_size(value) else { return None };
                (size > *max).then(|| format!("the {field} field may not be greater than {max}"))
            }
            Self::In(allowed) => {
                let ok = !present ||
                    as_comparable(value).is_some_and(|v| allowed.iter().any(|a| *a == v));
                (!ok).then(|| {
                    format!("the {field} field must be one of: {}", allowed.join(", "))
                })
            }
            Self::Date(format) => {
                let format = format.as_deref().unwrap_or("%Y-%m-%d");
                let ok = !present ||
                    value
                        .and_then(Value::as_str)
                        .is_some_and(|s| NaiveDate::parse_from_str(s, format).is_ok());
                (!ok).then(|| format!("the {field} field must be a valid date"))
            }
            Self::Phone => {
                let ok = !present ||
                    value.and_then(Value::as_str).is_some_and(|s| PHONE_RE.is_match(s.trim()));
                (!ok).then(|| format!("the {field} field must be a valid phone number"))
            }
            Self::Boolean => {
                let ok = !present || as_boolean(value).is_some();
                (!ok).then(|| format!("the {field} field must be true or false"))
            }
            Self::Nullable => None,
            Self::Confirmed => {
                if !present {
                    return None;
                }
                let confirmation = input.get(&format!("{field}_confirmation"));
                (confirmation != value)
                    .then(|| format!("the {field} confirmation does not match"))
            }
        }
    }
}

fn as_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_boolean(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.as_str() {
            "0" | "false" => Some(false),
            "1" | "true" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// Size semantics for `min`/`max`: numeric magnitude for numbers (including
/// numeric strings), character count for other strings. Absent values and
/// non-measurable types yield `None` and are skipped.
#[allow(clippy::cast_precision_loss)]
fn value_size(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) => Some(n),
            Err(_) => Some(s.chars().count() as f64),
        },
        Value::Array(items) => Some(items.len() as f64),
        _ => None,
    }
}

fn as_comparable(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accumulated field-keyed validation failures.
///
/// Always rendered in full: a validation response never reports a partial
/// subset of the failing fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.errors.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.errors.keys()
    }

    /// The error map as a JSON object: `{field: [message, ...]}`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.errors).unwrap_or(Value::Null)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed for {} field(s)", self.errors.len())
    }
}

impl std::error::Error for ValidationErrors {}

/// An ordered field-to-rules mapping with optional per-(field, rule) message
/// overrides. Built once per scenario at startup and reused across requests.
#[derive(Debug, Clone, Default)]
pub struct Ruleset {
    fields: Vec<(String, Vec<Rule>)>,
    messages: HashMap<(String, String), String>,
}

impl Ruleset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field with an explicit rule list.
    #[must_use]
    pub fn field(mut self, name: &str, rules: Vec<Rule>) -> Self {
        self.fields.push((name.to_string(), rules));
        self
    }

    /// Declares a field from a pipe-separated spec, e.g.
    /// `"required|string|max:50"`.
    ///
    /// # Errors
    /// Fails on unknown rule names or malformed parameters, so a typo in a
    /// ruleset is caught when the ruleset is built, not skipped at runtime.
    pub fn parse_field(self, name: &str, spec: &str) -> Result<Self, RuleParseError> {
        let rules = spec
            .split('|')
            .filter(|part| !part.trim().is_empty())
            .map(Rule::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.field(name, rules))
    }

    /// Overrides the default message for one (field, rule) pair.
    #[must_use]
    pub fn message(mut self, field: &str, rule: &str, message: &str) -> Self {
        self.messages
            .insert((field.to_string(), rule.to_string()), message.to_string());
        self
    }

    /// Validates `data` against the ruleset.
    ///
    /// On success, returns only the declared fields that were present in the
    /// input (whitelist semantics). On failure, returns the complete error
    /// map; there is no partial success.
    ///
    /// # Errors
    /// Returns [`ValidationErrors`] when any field accumulates at least one
    /// rule failure.
    pub fn validate(&self, data: &Map<String, Value>) -> Result<Map<String, Value>, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for (field, rules) in &self.fields {
            let value = data.get(field);
            let absent = value.is_none_or(Value::is_null);

            if absent && rules.contains(&Rule::Nullable) {
                continue;
            }

            for rule in rules {
                if let Some(default_message) = rule.check(field, value, data) {
                    let message = self
                        .messages
                        .get(&(field.clone(), rule.name().to_string()))
                        .cloned()
                        .unwrap_or(default_message);
                    errors.add(field, message);
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let mut validated = Map::new();
        for (field, _) in &self.fields {
            if let Some(value) = data.get(field) {
                validated.insert(field.clone(), value.clone());
            }
        }
        Ok(validated)
    }
}
