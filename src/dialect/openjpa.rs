//! OpenJPA dialect.
//!
//! OpenJPA only implements the 2.0 query language: there is no generic
//! `FUNCTION(...)` invocation, so unregistered functions cannot be rendered.

use super::helpers;
use super::CapabilityProvider;

/// OpenJPA dialect.
#[derive(Debug, Clone, Copy)]
pub struct OpenJpa;

impl CapabilityProvider for OpenJpa {
    fn name(&self) -> &'static str {
        "openjpa"
    }

    fn boolean_expression(&self, value: bool) -> &'static str {
        helpers::format_bool_lower(value)
    }

    fn boolean_conditional_expression(&self, value: bool) -> &'static str {
        helpers::bool_condition_numeric(value)
    }

    fn supports_generic_function_syntax(&self) -> bool {
        false
    }

    fn supports_entity_join(&self) -> bool {
        false
    }
}
