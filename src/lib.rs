//! # querygen
//!
//! Renders entity query trees into the query dialect of a specific
//! persistence provider.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │   Expression tree + join graph + alias namespace         │
//! │   (SelectQuery / set operations / CTEs / DML)            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [analysis]  SIZE rewriting, implicit GROUP BY
//! ┌─────────────────────────────────────────────────────────┐
//! │   RenderContext (dialect + registered functions)         │
//! │   QueryGenerator per query level                         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [token stream]
//! ┌─────────────────────────────────────────────────────────┐
//! │   RenderedQuery { text, parameters, limits, returning }  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything a dialect spells differently is answered by a
//! [`CapabilityProvider`](dialect::CapabilityProvider). Constructs a
//! dialect cannot express natively (set operations, subquery limits,
//! unregistered functions) fall back to the generic `FUNCTION('name', ...)`
//! encoding when the dialect understands it.

pub mod alias;
pub mod analysis;
pub mod config;
pub mod cte;
pub mod dialect;
pub mod dml;
pub mod error;
pub mod expr;
pub mod functions;
pub mod generator;
pub mod join;
pub mod query;
pub mod set_op;
pub mod token;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::analysis::{
        apply_implicit_group_by, implicit_group_by, AbortableVisitor, ClauseType,
        GroupByUsableDetection, SizeTransformer,
    };
    pub use crate::cte::{Cte, CteBody};
    pub use crate::dialect::{CapabilityProvider, Dialect};
    pub use crate::dml::{
        DeleteCollectionQuery, DeleteQuery, QueryVariant, RenderedQuery, Statement, UpdateQuery,
    };
    pub use crate::error::{GenerateError, GenerateResult};
    pub use crate::expr::{
        // Constructors
        avg,
        bound_path,
        case_when,
        count,
        count_distinct,
        count_star,
        entry,
        func,
        function_function,
        index,
        key,
        lit_bool,
        lit_float,
        lit_int,
        lit_str,
        max,
        min,
        null,
        outer,
        param,
        param_list,
        path,
        size,
        sum,
        value,
        // Types
        BinaryOperator,
        Expr,
        ExprExt,
        Literal,
    };
    pub use crate::functions::FunctionRegistry;
    pub use crate::generator::{GeneratorOptions, RenderContext};
    pub use crate::join::{JoinNodeId, JoinType, RelationKind};
    pub use crate::query::{NullsOrder, OrderByItem, QueryBuilder, SelectItem, SelectQuery, SortDir};
    pub use crate::token::{Token, TokenStream};
}

// Also export at crate root for convenience
pub use dialect::Dialect;
pub use dml::{QueryVariant, RenderedQuery, Statement};
pub use error::{GenerateError, GenerateResult};
pub use expr::{path, Expr, ExprExt};
pub use generator::{GeneratorOptions, RenderContext};
pub use query::{QueryBuilder, SelectQuery};
