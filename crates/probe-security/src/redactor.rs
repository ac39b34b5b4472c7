use std::borrow::Cow;
use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::rules::{BUILTIN_RULES, ContentAction, KeyMatcher, KeyName, REDACTION_MARKER, RedactionRule};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionInfo {
    pub redaction_type: String,
    pub count: usize,
}

/// Redaction engine for tool results.
///
/// Holds an ordered rule list; immutable once built, so one instance can
/// serve any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct Redactor {
    rules: Vec<RedactionRule>,
}

lazy_static! {
    static ref DEFAULT_REDACTOR: Redactor = Redactor::new();
}

/// Redact secret-shaped spans of `text` with the built-in rules
pub fn redact_str(text: &str) -> Cow<'_, str> {
    DEFAULT_REDACTOR.redact_str(text)
}

/// Redact a result tree with the built-in rules
pub fn redact_value(value: &Value) -> Value {
    DEFAULT_REDACTOR.redact_value(value)
}

#[derive(Default)]
struct Tally(BTreeMap<String, usize>);

impl Tally {
    fn add(&mut self, rule: &str, count: usize) {
        if count > 0 {
            *self.0.entry(rule.to_string()).or_default() += count;
        }
    }

    fn into_infos(self) -> Vec<RedactionInfo> {
        self.0
            .into_iter()
            .map(|(redaction_type, count)| RedactionInfo {
                redaction_type,
                count,
            })
            .collect()
    }
}

impl Redactor {
    pub fn new() -> Self {
        Self {
            rules: BUILTIN_RULES.clone(),
        }
    }

    /// Built-in rules plus configured key terms and content patterns.
    ///
    /// Invalid patterns are skipped with a warning rather than failing.
    pub fn with_extras(extra_keys: &[String], extra_patterns: &[String]) -> Self {
        let mut redactor = Self::new();

        for term in extra_keys.iter().map(|t| t.trim().to_lowercase()) {
            if term.is_empty() {
                continue;
            }
            redactor.push(RedactionRule::key(
                format!("key:{term}"),
                KeyMatcher::Contains(term),
            ));
        }

        for (i, pattern) in extra_patterns.iter().enumerate() {
            match Regex::new(pattern) {
                Ok(re) => redactor.push(RedactionRule::content(
                    format!("CUSTOM_{i}"),
                    re,
                    ContentAction::ReplaceMatch,
                )),
                Err(e) => warn!(%pattern, error = %e, "skipping invalid redaction pattern"),
            }
        }

        redactor
    }

    /// Append a rule; it runs after every rule already present
    pub fn push(&mut self, rule: RedactionRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[RedactionRule] {
        &self.rules
    }

    /// Replace secret-shaped spans of `text` with the marker.
    ///
    /// Returns `text` itself, borrowed, when no rule fires.
    pub fn redact_str<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.redact_str_counted(text, &mut Tally::default())
    }

    /// Deep copy of `value` with sensitive leaves replaced by the marker
    pub fn redact_value(&self, value: &Value) -> Value {
        self.walk(value, &mut Tally::default())
    }

    /// Like `redact_value`, also reporting how often each rule fired
    pub fn redact_with_report(&self, value: &Value) -> (Value, Vec<RedactionInfo>) {
        let mut tally = Tally::default();
        let redacted = self.walk(value, &mut tally);
        (redacted, tally.into_infos())
    }

    fn redact_str_counted<'a>(&self, text: &'a str, tally: &mut Tally) -> Cow<'a, str> {
        let mut current = Cow::Borrowed(text);

        for rule in self.rules.iter().filter(|r| !r.is_key_rule()) {
            let mut hits = 0;
            let next = match rule.apply(&current, &mut hits) {
                Cow::Borrowed(_) => None,
                Cow::Owned(replaced) => Some(replaced),
            };
            if let Some(replaced) = next {
                tally.add(rule.name(), hits);
                current = Cow::Owned(replaced);
            }
        }

        current
    }

    fn key_rule_for(&self, key: &str) -> Option<&RedactionRule> {
        let key = KeyName::new(key);
        self.rules.iter().find(|r| r.matches_key(&key))
    }

    fn walk(&self, value: &Value, tally: &mut Tally) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, child) in map {
                    let redacted = match self.key_rule_for(key) {
                        Some(rule) => {
                            tally.add(rule.name(), 1);
                            Value::String(REDACTION_MARKER.to_string())
                        }
                        None => self.walk(child, tally),
                    };
                    out.insert(key.clone(), redacted);
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.walk(item, tally)).collect())
            }
            Value::String(text) => match self.redact_str_counted(text, tally) {
                Cow::Borrowed(_) => value.clone(),
                Cow::Owned(redacted) => Value::String(redacted),
            },
            Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        }
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}
