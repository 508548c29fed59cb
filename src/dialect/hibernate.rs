//! Hibernate dialect.
//!
//! Hibernate features:
//! - Map values are dereferenced implicitly (no `VALUE()` wrapper)
//! - `WITH` instead of `ON` for join conditions
//! - Native `COUNT(*)`
//! - Bare boolean literals are not predicates, `1 = 1` is used instead
//! - Multi-valued parameters must be parenthesized
//! - Set operations, CTEs, collection DML and RETURNING through its extension

use super::helpers;
use super::CapabilityProvider;

/// Hibernate dialect.
#[derive(Debug, Clone, Copy)]
pub struct Hibernate;

impl CapabilityProvider for Hibernate {
    fn name(&self) -> &'static str {
        "hibernate"
    }

    fn boolean_expression(&self, value: bool) -> &'static str {
        helpers::format_bool_lower(value)
    }

    fn boolean_conditional_expression(&self, value: bool) -> &'static str {
        helpers::bool_condition_numeric(value)
    }

    fn null_expression(&self) -> &'static str {
        // A bare NULL in the select clause has no type for Hibernate
        "NULLIF(1,1)"
    }

    fn collection_value_function(&self) -> Option<&'static str> {
        None
    }

    fn needs_brackets_for_list_parameter(&self) -> bool {
        true
    }

    fn supports_count_star(&self) -> bool {
        true
    }

    fn on_clause_keyword(&self) -> &'static str {
        "WITH"
    }

    fn supports_native_set_operations(&self) -> bool {
        true
    }

    fn supports_with_clause(&self) -> bool {
        true
    }

    fn supports_collection_dml(&self) -> bool {
        true
    }

    fn supports_returning(&self) -> bool {
        true
    }
}
