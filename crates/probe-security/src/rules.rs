//! Redaction rule table
//!
//! Rules are independent predicate + action pairs. Adding a new secret
//! shape means adding a row to `builtin_rules`, never touching traversal.

use std::borrow::Cow;
use std::fmt;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// Placeholder substituted for anything judged sensitive
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// How a key rule compares against a mapping key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatcher {
    /// Case-insensitive substring of the whole key
    Contains(String),
    /// Case-insensitive whole word, after splitting camelCase and `_ - . /`
    Word(String),
}

/// What a content rule replaces once its pattern matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentAction {
    /// Replace the entire match
    ReplaceMatch,
    /// Replace only the `secret` capture group, keeping the text around it
    ReplaceSecret,
}

#[derive(Clone)]
pub enum RedactionRule {
    /// Redacts the whole value stored under a matching mapping key
    Key { name: String, matcher: KeyMatcher },
    /// Redacts secret-shaped spans inside leaf strings.
    ///
    /// `accept` gets the span that would be replaced and may veto it.
    Content {
        name: String,
        pattern: Regex,
        action: ContentAction,
        accept: fn(&str) -> bool,
    },
}

impl fmt::Debug for RedactionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key { name, matcher } => f
                .debug_struct("Key")
                .field("name", name)
                .field("matcher", matcher)
                .finish(),
            Self::Content {
                name,
                pattern,
                action,
                ..
            } => f
                .debug_struct("Content")
                .field("name", name)
                .field("pattern", &pattern.as_str())
                .field("action", action)
                .finish(),
        }
    }
}

impl RedactionRule {
    pub fn key(name: impl Into<String>, matcher: KeyMatcher) -> Self {
        Self::Key {
            name: name.into(),
            matcher,
        }
    }

    pub fn content(name: impl Into<String>, pattern: Regex, action: ContentAction) -> Self {
        Self::Content {
            name: name.into(),
            pattern,
            action,
            accept: |_| true,
        }
    }

    /// Attach a veto to a content rule; key rules are returned unchanged
    pub fn with_accept(mut self, predicate: fn(&str) -> bool) -> Self {
        if let Self::Content { accept, .. } = &mut self {
            *accept = predicate;
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Key { name, .. } | Self::Content { name, .. } => name,
        }
    }

    pub fn is_key_rule(&self) -> bool {
        matches!(self, Self::Key { .. })
    }

    pub(crate) fn matches_key(&self, key: &KeyName) -> bool {
        match self {
            Self::Key {
                matcher: KeyMatcher::Contains(term),
                ..
            } => key.lowered.contains(term.as_str()),
            Self::Key {
                matcher: KeyMatcher::Word(term),
                ..
            } => key.has_word(term),
            Self::Content { .. } => false,
        }
    }

    /// Run a content rule over `text`, counting accepted replacements.
    ///
    /// Returns the input borrowed when nothing was replaced.
    pub(crate) fn apply<'t>(&self, text: &'t str, hits: &mut usize) -> Cow<'t, str> {
        let Self::Content {
            pattern,
            action,
            accept,
            ..
        } = self
        else {
            return Cow::Borrowed(text);
        };

        let mut replaced = 0;
        let out = pattern.replace_all(text, |caps: &Captures<'_>| {
            let Some(whole) = caps.get(0) else {
                return String::new();
            };
            let secret = match action {
                ContentAction::ReplaceMatch => Some(whole),
                ContentAction::ReplaceSecret => caps.name("secret"),
            };
            let Some(secret) = secret else {
                return whole.as_str().to_string();
            };
            if secret.as_str() == REDACTION_MARKER || !accept(secret.as_str()) {
                return whole.as_str().to_string();
            }

            replaced += 1;
            let start = secret.start() - whole.start();
            let end = secret.end() - whole.start();
            let whole = whole.as_str();
            format!("{}{}{}", &whole[..start], REDACTION_MARKER, &whole[end..])
        });

        if replaced == 0 {
            return Cow::Borrowed(text);
        }
        *hits += replaced;
        out
    }
}

/// A mapping key prepared once for every key rule
pub(crate) struct KeyName {
    lowered: String,
    words: Vec<String>,
    /// `SSHKEY`-style keys glue words together without any boundary
    shouted: bool,
}

impl KeyName {
    pub(crate) fn new(key: &str) -> Self {
        Self {
            lowered: key.to_lowercase(),
            words: key_words(key),
            shouted: key.chars().any(char::is_alphabetic) && !key.chars().any(char::is_lowercase),
        }
    }

    fn has_word(&self, term: &str) -> bool {
        self.words
            .iter()
            .any(|w| w == term || (self.shouted && w.len() > term.len() && w.ends_with(term)))
    }
}

/// Split `clientSecretRef`, `api_key`, `tls.key`, `TLSKey` into lowercase words
fn key_words(key: &str) -> Vec<String> {
    let chars: Vec<char> = key.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let boundary = c.is_uppercase()
            && !current.is_empty()
            && match prev {
                Some(p) if p.is_lowercase() || p.is_numeric() => true,
                // Last capital of an acronym starts the next word
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
        if boundary {
            words.push(std::mem::take(&mut current));
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Long runs count as opaque credentials only when they carry lowercase,
/// uppercase and digits, and are not a hex digest
fn opaque_credential(run: &str) -> bool {
    let lower = run.bytes().any(|b| b.is_ascii_lowercase());
    let upper = run.bytes().any(|b| b.is_ascii_uppercase());
    let digit = run.bytes().any(|b| b.is_ascii_digit());
    let hex = run.bytes().all(|b| b.is_ascii_hexdigit());
    lower && upper && digit && !hex
}

/// `Authorization: Bearer` leaves the scheme word for the bearer rule
fn not_auth_scheme(value: &str) -> bool {
    !value.eq_ignore_ascii_case("bearer") && !value.eq_ignore_ascii_case("basic")
}

fn content(
    name: &str,
    pattern: &str,
    action: ContentAction,
    accept: fn(&str) -> bool,
) -> Option<RedactionRule> {
    Regex::new(pattern)
        .ok()
        .map(|re| RedactionRule::content(name, re, action).with_accept(accept))
}

fn builtin_rules() -> Vec<RedactionRule> {
    use ContentAction::{ReplaceMatch, ReplaceSecret};

    let mut rules: Vec<RedactionRule> = [
        "token",
        "secret",
        "password",
        "passwd",
        "credential",
        "authorization",
        "cookie",
        "private_key",
        "privatekey",
        "apikey",
    ]
    .into_iter()
    .map(|term| RedactionRule::key(format!("key:{term}"), KeyMatcher::Contains(term.into())))
    .collect();
    rules.extend(
        ["key", "auth"]
            .into_iter()
            .map(|term| RedactionRule::key(format!("key:{term}"), KeyMatcher::Word(term.into()))),
    );

    // Content rules, order matters - more specific first
    let content_rules = [
        content(
            "PRIVATE_KEY",
            r"(?s)-----BEGIN[A-Z ]*PRIVATE KEY-----.*?(?:-----END[A-Z ]*PRIVATE KEY-----|\z)",
            ReplaceMatch,
            |_| true,
        ),
        content(
            "URL_CREDENTIALS",
            r"[a-zA-Z][a-zA-Z0-9+.-]*://[^:/\s@]+:(?P<secret>[^@\s/]+)@",
            ReplaceSecret,
            |_| true,
        ),
        content(
            "ASSIGNMENT",
            r#"(?i)\b[\w.-]*?(?:token|secret|passw(?:or)?d|credential|authorization|api[_-]?key|access[_-]?key|private[_-]?key)[\w.-]*["']?\s*[=:]\s*["']?(?:(?:bearer|basic)\s+)?(?P<secret>[^\s,;&"'\[\]]+)"#,
            ReplaceSecret,
            not_auth_scheme,
        ),
        content(
            "BEARER_TOKEN",
            r"(?i)\b(?:bearer|basic)\s+(?P<secret>[A-Za-z0-9\-._~+/]{8,}=*)",
            ReplaceSecret,
            |_| true,
        ),
        content(
            "JWT",
            r"eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+",
            ReplaceMatch,
            |_| true,
        ),
        content(
            "SIGNED_TOKEN",
            r"\b[A-Za-z0-9_-]{16,}\.[A-Za-z0-9_-]{16,}\.[A-Za-z0-9_-]{16,}\b",
            ReplaceMatch,
            |_| true,
        ),
        content(
            "AWS_ACCESS_KEY",
            r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b",
            ReplaceMatch,
            |_| true,
        ),
        content(
            "GITHUB_TOKEN",
            r"\bgh[pousr]_[A-Za-z0-9]{36,}\b",
            ReplaceMatch,
            |_| true,
        ),
        content(
            "OPAQUE_TOKEN",
            r"[A-Za-z0-9]{24,}",
            ReplaceMatch,
            opaque_credential,
        ),
    ];
    rules.extend(content_rules.into_iter().flatten());
    rules
}

lazy_static! {
    /// Process-wide built-in rules, read-only after first use
    pub(crate) static ref BUILTIN_RULES: Vec<RedactionRule> = builtin_rules();
}
