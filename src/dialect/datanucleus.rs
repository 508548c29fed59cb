//! DataNucleus dialect.
//!
//! DataNucleus has no entity joins and needs a comparison around boolean
//! predicates.

use super::helpers;
use super::CapabilityProvider;

/// DataNucleus dialect.
#[derive(Debug, Clone, Copy)]
pub struct DataNucleus;

impl CapabilityProvider for DataNucleus {
    fn name(&self) -> &'static str {
        "datanucleus"
    }

    fn boolean_expression(&self, value: bool) -> &'static str {
        helpers::format_bool_upper(value)
    }

    fn boolean_conditional_expression(&self, value: bool) -> &'static str {
        if value {
            "TRUE = TRUE"
        } else {
            "TRUE = FALSE"
        }
    }

    fn supports_entity_join(&self) -> bool {
        false
    }
}
