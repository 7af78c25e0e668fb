//! # Validation
//!
//! Field values are checked against ordered rule lists such as
//! `["optional", "minLen:8", "equalRef:password"]`.
//!
//! - `optional` makes an empty value pass outright.
//! - Otherwise every rule must pass; evaluation stops at the first failure.
//! - Rule names the validator does not know always fail.

use crate::lists::{str_array, value_text};
use crate::settings::Separators;
use crate::types::{StateMap, Value, is_truthy};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Field name -> rule list.
pub type RuleTable = BTreeMap<String, Vec<String>>;

/// One parsed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Optional,
    /// Value equals the literal argument.
    Equal(String),
    /// Value equals the value of another named field.
    EqualRef(String),
    MinLen(usize),
    MaxLen(usize),
    Email,
    /// Every delimited token is an email address.
    Emails,
    /// Unrecognised name or argument; never passes.
    Unknown(String),
}

impl FromStr for Rule {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };
        let length = |arg: Option<&str>| arg.and_then(|a| a.trim().parse::<usize>().ok());

        Ok(match (name, arg) {
            ("optional", _) => Self::Optional,
            ("equal", Some(arg)) => Self::Equal(arg.to_string()),
            ("equalRef", Some(arg)) => Self::EqualRef(arg.to_string()),
            ("minLen", arg) => length(arg).map_or_else(|| Self::Unknown(s.to_string()), Self::MinLen),
            ("maxLen", arg) => length(arg).map_or_else(|| Self::Unknown(s.to_string()), Self::MaxLen),
            ("email", _) => Self::Email,
            ("emails", _) => Self::Emails,
            _ => Self::Unknown(s.to_string()),
        })
    }
}

/// Applies rules, splitting multi-value fields with the given separators.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    separators: Separators,
}

impl Validator {
    #[must_use]
    pub fn new(separators: Separators) -> Self {
        Self { separators }
    }

    /// Check one value against `rules`; `refs` supplies values for `equalRef`.
    pub fn validate<S: AsRef<str>>(&self, value: &Value, rules: &[S], refs: &StateMap) -> bool {
        let rules: Vec<Rule> = rules
            .iter()
            .filter_map(|r| r.as_ref().parse().ok())
            .collect();

        if rules.contains(&Rule::Optional) && !is_truthy(value) {
            return true;
        }

        let text = value_text(value, &self.separators);
        rules.iter().all(|rule| self.check(rule, value, &text, refs))
    }

    /// Check every named value; returns the names that failed, in table order.
    pub fn validate_all(&self, rules: &RuleTable, refs: &StateMap) -> Vec<String> {
        rules
            .iter()
            .filter(|(name, list)| {
                let value = refs.get(name.as_str()).unwrap_or(&Value::Null);
                !self.validate(value, list.as_slice(), refs)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn check(&self, rule: &Rule, value: &Value, text: &str, refs: &StateMap) -> bool {
        match rule {
            Rule::Optional => true,
            Rule::Equal(expected) => text == expected,
            Rule::EqualRef(name) => refs
                .get(name)
                .is_some_and(|other| value_text(other, &self.separators) == text),
            Rule::MinLen(n) => text.chars().count() >= *n,
            Rule::MaxLen(n) => text.chars().count() <= *n,
            Rule::Email => is_email(text),
            Rule::Emails => str_array(value, &self.separators)
                .map(|all| all.iter().all(|e| is_email(e)))
                .unwrap_or(false),
            Rule::Unknown(name) => {
                tracing::debug!(rule = %name, "unknown validation rule");
                false
            }
        }
    }
}

/// Structural email check: dotted local part, `@`, dotted domain ending in
/// an alphabetic label.
#[must_use]
pub fn is_email(raw: &str) -> bool {
    let Some((local, domain)) = raw.rsplit_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local.split('.').all(|atom| {
            !atom.is_empty()
                && atom
                    .chars()
                    .all(|c| c.is_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c))
        });

    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
        && labels
            .last()
            .is_some_and(|tld| tld.chars().all(char::is_alphabetic));

    local_ok && domain_ok
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn refs(pairs: &[(&str, Value)]) -> StateMap {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn rules_parse_with_arguments() {
        assert_eq!("minLen:8".parse::<Rule>().ok(), Some(Rule::MinLen(8)));
        assert_eq!("equalRef:pw".parse::<Rule>().ok(), Some(Rule::EqualRef("pw".into())));
        assert_eq!(
            "minLen:eight".parse::<Rule>().ok(),
            Some(Rule::Unknown("minLen:eight".into()))
        );
        assert_eq!("shout".parse::<Rule>().ok(), Some(Rule::Unknown("shout".into())));
    }

    #[test]
    fn optional_short_circuits_on_empty() {
        let v = Validator::default();
        assert!(v.validate(&json!(""), &["optional", "email"], &StateMap::new()));
        assert!(!v.validate(&json!("nope"), &["optional", "email"], &StateMap::new()));
        assert!(!v.validate(&json!(""), &["email"], &StateMap::new()));
    }

    #[test]
    fn lengths_count_characters() {
        let v = Validator::default();
        assert!(v.validate(&json!("héllo"), &["minLen:5", "maxLen:5"], &StateMap::new()));
        assert!(!v.validate(&json!("hé"), &["minLen:3"], &StateMap::new()));
    }

    #[test]
    fn equal_ref_compares_other_field() {
        let v = Validator::default();
        let r = refs(&[("password", json!("s3cret")), ("confirm", json!("s3cret"))]);
        assert!(v.validate(&json!("s3cret"), &["equalRef:password"], &r));
        assert!(!v.validate(&json!("other"), &["equalRef:password"], &r));
        assert!(!v.validate(&json!("s3cret"), &["equalRef:missing"], &r));
        assert!(v.validate(&json!("yes"), &["equal:yes"], &r));
    }

    #[test]
    fn unknown_rules_fail() {
        let v = Validator::default();
        assert!(!v.validate(&json!("x"), &["shout"], &StateMap::new()));
    }

    #[test]
    fn emails_checks_every_token() {
        let v = Validator::default();
        assert!(v.validate(&json!("a@b.com, c@d.org"), &["emails"], &StateMap::new()));
        assert!(!v.validate(&json!("a@b.com, nope"), &["emails"], &StateMap::new()));
        assert!(v.validate(&json!(["a@b.com"]), &["emails"], &StateMap::new()));
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("first.last+tag@sub.example.com"));
        assert!(!is_email("no-at-sign"));
        assert!(!is_email("a@localhost"));
        assert!(!is_email("a..b@x.com"));
        assert!(!is_email("a@-x.com"));
        assert!(!is_email("a@x.c0m"));
    }

    #[test]
    fn validate_all_reports_failed_names() {
        let v = Validator::default();
        let mut rules = RuleTable::new();
        rules.insert("email".into(), vec!["email".into()]);
        rules.insert("name".into(), vec!["minLen:2".into()]);
        rules.insert("nick".into(), vec!["optional".into(), "maxLen:3".into()]);
        let data = refs(&[("email", json!("bad")), ("name", json!("Ada"))]);
        assert_eq!(v.validate_all(&rules, &data), vec!["email".to_string()]);
    }
}
