//! Model aliases.
//!
//! Short names like `claude` or `grok` map to fully-qualified gateway model
//! identifiers. Anything that is not an alias is assumed to already be a
//! `provider/model` identifier and passes through untouched.

/// The model used when neither the command line nor the config names one.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Built-in aliases, in display order.
pub const MODEL_ALIASES: &[(&str, &str)] = &[
    ("gemini", "google/gemini-1.5-flash-8b"),
    ("chatgpt", "openai/gpt-4o-mini"),
    ("grok", "xai/grok-2"),
    ("claude", "anthropic/claude-3.5-sonnet"),
    ("sonnet", "anthropic/claude-3.5-sonnet"),
    ("haiku", "anthropic/claude-3.5-haiku"),
    ("o3", "openai/o3-mini"),
    // common misspelling
    ("clude", "anthropic/claude-3.5-sonnet"),
    ("grok-4", "xai/grok-2"),
    ("grok4", "xai/grok-2"),
];

/// Looks up an alias, ignoring case.
pub fn lookup_alias(alias: &str) -> Option<&'static str> {
    MODEL_ALIASES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(alias))
        .map(|(_, target)| *target)
}

/// Resolves user input to a model identifier.
///
/// Empty or missing input yields `fallback`, or the `chatgpt` alias target
/// when there is no fallback either.
pub fn resolve_model(input: Option<&str>, fallback: Option<&str>) -> String {
    match input.map(str::trim).filter(|s| !s.is_empty()) {
        Some(input) => lookup_alias(input).unwrap_or(input).to_string(),
        None => fallback
            .filter(|s| !s.is_empty())
            .or_else(|| lookup_alias("chatgpt"))
            .unwrap_or(DEFAULT_MODEL)
            .to_string(),
    }
}

/// Formats the alias table, one `alias -> target` per line.
pub fn alias_table() -> String {
    MODEL_ALIASES
        .iter()
        .map(|(alias, target)| format!("  {alias:<10} -> {target}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_lookup_is_case_insensitive() {
        assert_eq!(resolve_model(Some("GROK"), None), resolve_model(Some("grok"), None));
        assert_eq!(resolve_model(Some("Grok"), None), "xai/grok-2");
    }

    #[test]
    fn unknown_input_passes_through() {
        assert_eq!(resolve_model(Some("foo/bar"), None), "foo/bar");
        assert_eq!(
            resolve_model(Some("Meta-Llama/llama-3-70b"), Some("x/y")),
            "Meta-Llama/llama-3-70b"
        );
    }

    #[test]
    fn missing_input_uses_fallback() {
        assert_eq!(resolve_model(None, Some("x/y")), "x/y");
        assert_eq!(resolve_model(Some(""), Some("x/y")), "x/y");
        assert_eq!(resolve_model(None, None), "openai/gpt-4o-mini");
        assert_eq!(resolve_model(None, Some("")), "openai/gpt-4o-mini");
    }

    #[test]
    fn misspellings_and_variants() {
        assert_eq!(lookup_alias("clude"), Some("anthropic/claude-3.5-sonnet"));
        assert_eq!(lookup_alias("grok-4"), lookup_alias("grok4"));
        assert_eq!(lookup_alias("gpt"), None);
    }

    #[test]
    fn alias_table_lists_every_alias() {
        let table = alias_table();
        assert_eq!(table.lines().count(), MODEL_ALIASES.len());
        assert!(table.contains("chatgpt    -> openai/gpt-4o-mini"));
    }
}
