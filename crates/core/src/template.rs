//! `{{ name }}` placeholder rendering for outbound message bodies.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Variables a message body may reference.
pub const SUPPORTED_VARIABLES: &[&str] = &[
    "name",
    "phone",
    "product",
    "departure_date",
    "agent_name",
    "landing_url",
];

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}").expect("valid regex"));

/// Names referenced by a body, in order of first appearance.
pub fn placeholders(body: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(body) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Reject bodies that reference variables the dispatcher cannot fill.
pub fn validate_placeholders(body: &str) -> Result<(), CoreError> {
    let unknown: Vec<String> = placeholders(body)
        .into_iter()
        .filter(|name| !SUPPORTED_VARIABLES.contains(&name.as_str()))
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unsupported template variables: {}",
            unknown.join(", ")
        )))
    }
}

/// Substitute placeholders. Names missing from `vars` are left as written.
pub fn render(body: &str, vars: &HashMap<&str, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(body, |caps: &regex::Captures<'_>| {
            vars.get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_and_keeps_unknown() {
        let mut vars = HashMap::new();
        vars.insert("name", "Kim".to_string());
        let out = render("Hi {{ name }}, see {{landing_url}}", &vars);
        assert_eq!(out, "Hi Kim, see {{landing_url}}");
    }

    #[test]
    fn placeholders_deduplicated_in_order() {
        assert_eq!(
            placeholders("{{a}} {{ b }} {{a}}"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn unsupported_variables_rejected() {
        assert!(validate_placeholders("Hello {{name}}").is_ok());
        let err = validate_placeholders("Hello {{nickname}}").unwrap_err();
        assert!(err.to_string().contains("nickname"));
    }

    #[test]
    fn body_without_placeholders_is_unchanged() {
        assert_eq!(render("plain text", &HashMap::new()), "plain text");
    }
}
