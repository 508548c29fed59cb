//! Set operations between independently built queries.

use serde::{Deserialize, Serialize};

use crate::query::{OrderByItem, QueryBuilder};
use crate::token::Token;

/// Set operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOperationType {
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

impl SetOperationType {
    pub fn name(&self) -> &'static str {
        match self {
            SetOperationType::Union => "UNION",
            SetOperationType::UnionAll => "UNION_ALL",
            SetOperationType::Intersect => "INTERSECT",
            SetOperationType::IntersectAll => "INTERSECT_ALL",
            SetOperationType::Except => "EXCEPT",
            SetOperationType::ExceptAll => "EXCEPT_ALL",
        }
    }

    /// Marker naming the operator in the function-call encoding.
    ///
    /// Prefixed so it never collides with a provider's own `UNION` keyword.
    pub fn marker(&self) -> String {
        format!("SET_{}", self.name())
    }

    /// Whether duplicates are retained.
    pub fn is_all(&self) -> bool {
        matches!(
            self,
            SetOperationType::UnionAll
                | SetOperationType::IntersectAll
                | SetOperationType::ExceptAll
        )
    }

    /// Keyword tokens for the native syntax.
    pub fn tokens(&self) -> Vec<Token> {
        let keyword = match self {
            SetOperationType::Union | SetOperationType::UnionAll => Token::Union,
            SetOperationType::Intersect | SetOperationType::IntersectAll => Token::Intersect,
            SetOperationType::Except | SetOperationType::ExceptAll => Token::Except,
        };
        if self.is_all() {
            vec![keyword, Token::Space, Token::All]
        } else {
            vec![keyword]
        }
    }
}

/// A chain of set operations: `start op operand op operand ...`.
///
/// Order-by, limit and offset here apply to the combined result and are
/// independent of the members' own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetOperationManager {
    pub operator: Option<SetOperationType>,
    pub start: Box<QueryBuilder>,
    #[serde(default)]
    pub operands: Vec<QueryBuilder>,
    #[serde(default)]
    pub order_by: Vec<OrderByItem>,
    pub first_result: Option<u64>,
    pub max_results: Option<u64>,
}

impl SetOperationManager {
    /// A manager wrapping a single query, without an operator.
    pub fn with_start(start: QueryBuilder) -> Self {
        Self {
            operator: None,
            start: Box::new(start),
            operands: Vec::new(),
            order_by: Vec::new(),
            first_result: None,
            max_results: None,
        }
    }

    pub fn new(operator: SetOperationType, start: QueryBuilder, operand: QueryBuilder) -> Self {
        Self {
            operator: Some(operator),
            operands: vec![operand],
            ..Self::with_start(start)
        }
    }

    pub fn push(&mut self, operand: QueryBuilder) {
        self.operands.push(operand);
    }

    pub fn has_set_operations(&self) -> bool {
        !self.operands.is_empty()
    }

    pub fn has_limit(&self) -> bool {
        self.first_result.is_some() || self.max_results.is_some()
    }

    /// Whether the combined result carries its own order-by or limit.
    pub fn has_modifiers(&self) -> bool {
        !self.order_by.is_empty() || self.has_limit()
    }

    /// Start followed by the operands, in declaration order.
    pub fn members(&self) -> impl Iterator<Item = &QueryBuilder> {
        std::iter::once(self.start.as_ref()).chain(self.operands.iter())
    }
}
