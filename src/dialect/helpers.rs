//! Shared helper functions for dialect implementations.
//!
//! Reusable building blocks that providers compose to implement the
//! `CapabilityProvider` trait with minimal duplication.

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard query language).
/// Used by: All providers
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote an escape character as a single character literal.
/// Used by: Hibernate, DataNucleus, OpenJPA
pub fn escape_character_plain(c: char) -> String {
    quote_string_single(&c.to_string())
}

/// Quote an escape character, doubling a backslash.
/// Used by: EclipseLink (its parser treats `\` inside literals as an escape)
pub fn escape_character_backslash_doubled(c: char) -> String {
    if c == '\\' {
        "'\\\\'".to_string()
    } else {
        escape_character_plain(c)
    }
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as lowercase literal.
/// Used by: Hibernate, OpenJPA
pub fn format_bool_lower(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as uppercase literal.
/// Used by: EclipseLink, DataNucleus
pub fn format_bool_upper(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Format a boolean predicate as a numeric comparison.
/// Used by: Hibernate, OpenJPA (bare boolean literals are not valid predicates)
pub fn bool_condition_numeric(b: bool) -> &'static str {
    if b {
        "1 = 1"
    } else {
        "1 = 0"
    }
}

// =============================================================================
// Function Invocation
// =============================================================================

/// Invocation prefix `name(` for providers that expose registered functions
/// directly by name.
/// Used by: Hibernate, DataNucleus, OpenJPA
pub fn invoke_by_name(name: &str) -> String {
    format!("{}(", name)
}

/// Invocation prefix through the `OPERATOR` construct.
///
/// `arg_count` includes the leading function-name marker, so a separator is
/// only emitted when real arguments follow.
/// Used by: EclipseLink
pub fn invoke_by_operator(name: &str, arg_count: usize) -> String {
    if arg_count > 1 {
        format!("OPERATOR('{}',", name)
    } else {
        format!("OPERATOR('{}'", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_character() {
        assert_eq!(escape_character_plain('!'), "'!'");
        assert_eq!(escape_character_plain('\''), "''''");
        assert_eq!(escape_character_backslash_doubled('\\'), "'\\\\'");
        assert_eq!(escape_character_backslash_doubled('!'), "'!'");
    }

    #[test]
    fn test_invoke_by_operator() {
        assert_eq!(invoke_by_operator("limit", 3), "OPERATOR('limit',");
        assert_eq!(invoke_by_operator("count_star", 1), "OPERATOR('count_star'");
    }
}
