//! EclipseLink dialect.
//!
//! EclipseLink differences from the baseline:
//! - Uppercase boolean literals, usable directly as predicates
//! - Registered functions are invoked through `OPERATOR('name', ...)`
//! - Backslash escape characters must be doubled

use super::helpers;
use super::CapabilityProvider;

/// EclipseLink dialect.
#[derive(Debug, Clone, Copy)]
pub struct EclipseLink;

impl CapabilityProvider for EclipseLink {
    fn name(&self) -> &'static str {
        "eclipselink"
    }

    fn boolean_expression(&self, value: bool) -> &'static str {
        helpers::format_bool_upper(value)
    }

    fn boolean_conditional_expression(&self, value: bool) -> &'static str {
        helpers::format_bool_upper(value)
    }

    fn escape_character(&self, c: char) -> String {
        helpers::escape_character_backslash_doubled(c)
    }

    fn custom_function_invocation(&self, name: &str, arg_count: usize) -> String {
        helpers::invoke_by_operator(name, arg_count)
    }
}
