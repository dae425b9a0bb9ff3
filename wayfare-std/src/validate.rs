//! Form validation rules.
//!
//! Rules are keyed by field name and deserialize from JSON:
//!
//! ```json
//! {
//!   "name":     { "required": true, "min_len": 3 },
//!   "email":    { "required": true, "match": "^[^@]+@[^@]+$" },
//!   "password2":{ "equals": "password" }
//! }
//! ```
//!
//! A failed field produces an entry `<field>_error` in the returned error map.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use wayfare_core::{Fields, NavError};

/// Checks for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldRule {
    /// The field must be present and non-empty.
    pub required: bool,
    /// Minimum length in characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,
    /// Maximum length in characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
    /// Regular expression the value must match.
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Another field this one must equal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
    /// Message used instead of the generated one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Rules for a whole form, in field-name order.
pub type RuleSet = BTreeMap<String, FieldRule>;

/// Parse rules from a hook value; `null` and non-maps mean "no rules".
pub fn rules_from_value(value: Value) -> Result<RuleSet, NavError> {
    match value {
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| NavError::Configuration(format!("invalid validation rules: {e}"))),
        _ => Ok(RuleSet::new()),
    }
}

/// Whether any field named by the rules is present in `form`.
pub fn has_data(rules: &RuleSet, form: &Fields) -> bool {
    rules.keys().any(|field| form.contains_key(field))
}

/// Rules with their patterns compiled.
#[derive(Debug)]
pub struct Validator {
    fields: Vec<(String, FieldRule, Option<Regex>)>,
}

impl Validator {
    /// Compile `rules`; an invalid pattern is a configuration error.
    pub fn new(rules: &RuleSet) -> Result<Self, NavError> {
        let fields = rules
            .iter()
            .map(|(field, rule)| {
                let regex = rule
                    .pattern
                    .as_deref()
                    .map(Regex::new)
                    .transpose()
                    .map_err(|e| {
                        NavError::Configuration(format!("invalid pattern for {field}: {e}"))
                    })?;
                Ok((field.clone(), rule.clone(), regex))
            })
            .collect::<Result<_, NavError>>()?;
        Ok(Self { fields })
    }

    /// Check `form` and return the errors, keyed `<field>_error`.
    pub fn check(&self, form: &Fields) -> Fields {
        let mut errors = Fields::new();
        for (field, rule, regex) in &self.fields {
            if let Some(message) = check_field(form, field, rule, regex.as_ref()) {
                errors.insert(
                    format!("{field}_error"),
                    Value::String(rule.message.clone().unwrap_or(message)),
                );
            }
        }
        errors
    }
}

fn check_field(form: &Fields, field: &str, rule: &FieldRule, regex: Option<&Regex>) -> Option<String> {
    let label = field.replace('_', " ");
    let Some(text) = field_text(form, field) else {
        return rule.required.then(|| format!("{label} is required."));
    };

    let len = text.chars().count();
    if let Some(min) = rule.min_len.filter(|min| len < *min) {
        return Some(format!("{label} must be at least {min} characters."));
    }
    if let Some(max) = rule.max_len.filter(|max| len > *max) {
        return Some(format!("{label} may not be more than {max} characters."));
    }
    if regex.is_some_and(|regex| !regex.is_match(&text)) {
        return Some(format!("{label} is not in the correct format."));
    }
    if let Some(other) = &rule.equals {
        if field_text(form, other).as_deref() != Some(text.as_str()) {
            return Some(format!("{label} must match {}.", other.replace('_', " ")));
        }
    }
    None
}

fn field_text(form: &Fields, field: &str) -> Option<String> {
    let text = match form.get(field)? {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}
