//! Dialect capability providers.
//!
//! Every persistence provider parses a slightly different flavour of the
//! entity query language. This module provides a trait-based abstraction for
//! those differences; each dialect implements `CapabilityProvider`:
//!
//! - Boolean literals: `true` vs `TRUE`, and how a literal is used as a predicate
//! - NULL in value position: `NULL` vs `NULLIF(1,1)`
//! - Map value dereferencing: `VALUE(alias)` vs implicit
//! - Registered function invocation: `name(...)` vs `OPERATOR('name', ...)`
//! - Generic `FUNCTION('name', ...)` invocation
//! - Join condition keyword: `ON` vs `WITH`
//! - And more...
//!
//! # Usage
//!
//! ```ignore
//! use querygen::dialect::{CapabilityProvider, Dialect};
//!
//! let dialect = Dialect::EclipseLink;
//! assert_eq!(dialect.collection_value_function(), Some("VALUE"));
//! ```
//!
//! # Capability Matrix
//!
//! | Feature | Hibernate | EclipseLink | DataNucleus | OpenJPA |
//! |---------|-----------|-------------|-------------|---------|
//! | `VALUE()` for map values | ❌ | ✓ | ✓ | ✓ |
//! | `FUNCTION('name', ...)` | ✓ | ✓ | ✓ | ❌ |
//! | Native `COUNT(*)` | ✓ | ❌ | ❌ | ❌ |
//! | Native set operations | ✓ | ❌ | ❌ | ❌ |
//! | WITH clause | ✓ | ❌ | ❌ | ❌ |
//! | Collection DML | ✓ | ❌ | ❌ | ❌ |
//! | RETURNING | ✓ | ❌ | ❌ | ❌ |
//! | Entity joins | ✓ | ✓ | ❌ | ❌ |
//!
//! Legend: ✓ = supported, ❌ = not supported

mod datanucleus;
mod eclipselink;
pub mod helpers;
mod hibernate;
mod openjpa;

pub use datanucleus::DataNucleus;
pub use eclipselink::EclipseLink;
pub use hibernate::Hibernate;
pub use openjpa::OpenJpa;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Dialect capability trait - answers what the target provider can parse.
///
/// The default implementations follow the JPA 2.1 baseline.
/// Providers are immutable and queried only through this trait, so adding a
/// dialect means supplying one implementation.
pub trait CapabilityProvider: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Literals
    // =========================================================================

    /// Boolean literal used as a value (select item, comparison operand).
    fn boolean_expression(&self, value: bool) -> &'static str;

    /// Boolean literal used directly as a predicate.
    fn boolean_conditional_expression(&self, value: bool) -> &'static str;

    /// Quote a string literal.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Render the escape character of a LIKE predicate, including quotes.
    fn escape_character(&self, c: char) -> String {
        helpers::escape_character_plain(c)
    }

    /// NULL used as a value.
    fn null_expression(&self) -> &'static str {
        "NULL"
    }

    /// Null comparison suffix.
    fn null_comparison(&self, negated: bool) -> &'static str {
        if negated {
            "IS NOT NULL"
        } else {
            "IS NULL"
        }
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Function dereferencing the value side of a map-typed join, if the
    /// provider requires one.
    fn collection_value_function(&self) -> Option<&'static str> {
        Some("VALUE")
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Whether `FUNCTION('name', args...)` is understood.
    fn supports_generic_function_syntax(&self) -> bool {
        true
    }

    /// Invocation prefix for a registered function.
    ///
    /// `arg_count` includes the leading function-name marker argument. The
    /// generator appends the remaining arguments and a closing parenthesis.
    fn custom_function_invocation(&self, name: &str, arg_count: usize) -> String {
        let _ = arg_count;
        helpers::invoke_by_name(name)
    }

    /// Whether `COUNT(*)` can be emitted natively.
    fn supports_count_star(&self) -> bool {
        false
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Whether a multi-valued parameter marker must be wrapped in parentheses.
    fn needs_brackets_for_list_parameter(&self) -> bool {
        false
    }

    // =========================================================================
    // Joins
    // =========================================================================

    /// Keyword introducing a join condition.
    fn on_clause_keyword(&self) -> &'static str {
        "ON"
    }

    /// Whether unrelated entities can be joined with a condition.
    fn supports_entity_join(&self) -> bool {
        true
    }

    // =========================================================================
    // Statement Shapes
    // =========================================================================

    /// Whether `UNION`/`INTERSECT`/`EXCEPT` can be written natively.
    fn supports_native_set_operations(&self) -> bool {
        false
    }

    /// Whether a statement may start with a WITH clause.
    fn supports_with_clause(&self) -> bool {
        false
    }

    /// Whether DML against a collection-valued path is understood.
    fn supports_collection_dml(&self) -> bool {
        false
    }

    /// Whether DML statements may carry a RETURNING clause.
    fn supports_returning(&self) -> bool {
        false
    }
}

/// Supported dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Hibernate,
    EclipseLink,
    DataNucleus,
    OpenJpa,
}

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Dialect; 4] = [
        Dialect::Hibernate,
        Dialect::EclipseLink,
        Dialect::DataNucleus,
        Dialect::OpenJpa,
    ];

    /// Get the dialect implementation.
    pub fn provider(&self) -> &'static dyn CapabilityProvider {
        match self {
            Dialect::Hibernate => &Hibernate,
            Dialect::EclipseLink => &EclipseLink,
            Dialect::DataNucleus => &DataNucleus,
            Dialect::OpenJpa => &OpenJpa,
        }
    }
}

// Implement CapabilityProvider for Dialect enum by delegating to concrete types
impl CapabilityProvider for Dialect {
    fn name(&self) -> &'static str {
        self.provider().name()
    }

    fn boolean_expression(&self, value: bool) -> &'static str {
        self.provider().boolean_expression(value)
    }

    fn boolean_conditional_expression(&self, value: bool) -> &'static str {
        self.provider().boolean_conditional_expression(value)
    }

    fn quote_string(&self, s: &str) -> String {
        self.provider().quote_string(s)
    }

    fn escape_character(&self, c: char) -> String {
        self.provider().escape_character(c)
    }

    fn null_expression(&self) -> &'static str {
        self.provider().null_expression()
    }

    fn null_comparison(&self, negated: bool) -> &'static str {
        self.provider().null_comparison(negated)
    }

    fn collection_value_function(&self) -> Option<&'static str> {
        self.provider().collection_value_function()
    }

    fn supports_generic_function_syntax(&self) -> bool {
        self.provider().supports_generic_function_syntax()
    }

    fn custom_function_invocation(&self, name: &str, arg_count: usize) -> String {
        self.provider().custom_function_invocation(name, arg_count)
    }

    fn supports_count_star(&self) -> bool {
        self.provider().supports_count_star()
    }

    fn needs_brackets_for_list_parameter(&self) -> bool {
        self.provider().needs_brackets_for_list_parameter()
    }

    fn on_clause_keyword(&self) -> &'static str {
        self.provider().on_clause_keyword()
    }

    fn supports_entity_join(&self) -> bool {
        self.provider().supports_entity_join()
    }

    fn supports_native_set_operations(&self) -> bool {
        self.provider().supports_native_set_operations()
    }

    fn supports_with_clause(&self) -> bool {
        self.provider().supports_with_clause()
    }

    fn supports_collection_dml(&self) -> bool {
        self.provider().supports_collection_dml()
    }

    fn supports_returning(&self) -> bool {
        self.provider().supports_returning()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.provider().name())
    }
}

/// Error returned when parsing an unknown dialect name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown dialect: {0}")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownDialect(s.to_string()))
    }
}
