//! Set operations in expression form.
//!
//! Providers without native set operations receive the whole tree as one
//! function call: `SET_<OP>` marker, the start member, the other members, then
//! the optional `ORDER_BY` and `LIMIT`/`OFFSET` marker groups. Nested set
//! operations collapse the same way, one call per level.

use tracing::trace;

use crate::alias::AliasManager;
use crate::error::{GenerateError, GenerateResult};
use crate::expr::{function_function, lit_int, lit_str, Expr};
use crate::join::JoinGraph;
use crate::query::{NullsOrder, OrderByItem, QueryBuilder, SortDir};
use crate::set_op::SetOperationManager;

use super::RenderContext;

impl RenderContext<'_> {
    /// Expression form of a query as used inside function arguments.
    ///
    /// A limited select becomes `FUNCTION('LIMIT', (query), max[, first])`.
    pub fn as_expression(&self, query: &QueryBuilder) -> GenerateResult<Expr> {
        match query {
            QueryBuilder::Select(select) => {
                let text = self.nested().select_text(select)?;
                let query = Expr::Verbatim(format!("({})", text));
                limited(query, select.first_result, select.max_results)
            }
            QueryBuilder::SetOperation(manager) => self.set_operation_expression(manager),
        }
    }

    fn set_operation_expression(&self, manager: &SetOperationManager) -> GenerateResult<Expr> {
        let Some(operator) = manager.operator.filter(|_| manager.has_set_operations()) else {
            trace!("set operation without operands, using start query");
            let start = self.as_expression(&manager.start)?;
            return limited(start, manager.first_result, manager.max_results);
        };

        let mut args = Vec::with_capacity(manager.operands.len() + 2);
        for member in manager.members() {
            args.push(self.as_expression(member)?);
        }

        if !manager.order_by.is_empty() {
            args.push(lit_str("ORDER_BY"));
            for item in &manager.order_by {
                args.push(lit_str(&self.order_by_marker(item)?));
            }
        }

        if let Some(max_results) = manager.max_results {
            args.push(lit_str("LIMIT"));
            args.push(lit_int(max_results as i64));
        }
        if let Some(first_result) = manager.first_result {
            args.push(lit_str("OFFSET"));
            args.push(lit_int(first_result as i64));
        }

        Ok(function_function(&operator.marker(), args))
    }

    /// Textual `expr DIR [NULLS FIRST|LAST]` of a set-operation order item.
    ///
    /// Items refer to the members' select aliases, so they are rendered
    /// without a namespace of their own.
    pub(crate) fn order_by_marker(&self, item: &OrderByItem) -> GenerateResult<String> {
        let aliases = AliasManager::new();
        let joins = JoinGraph::new();
        let mut text = self.generator(&aliases, &joins).expr_to_string(&item.expr)?;
        text.push_str(match item.dir {
            SortDir::Asc => " ASC",
            SortDir::Desc => " DESC",
        });
        match item.nulls {
            Some(NullsOrder::First) => text.push_str(" NULLS FIRST"),
            Some(NullsOrder::Last) => text.push_str(" NULLS LAST"),
            None => {}
        }
        Ok(text)
    }
}

/// `FUNCTION('LIMIT', query, max[, first])`, or `query` itself when unlimited.
fn limited(
    query: Expr,
    first_result: Option<u64>,
    max_results: Option<u64>,
) -> GenerateResult<Expr> {
    if first_result.is_none() && max_results.is_none() {
        return Ok(query);
    }
    let max_results = max_results.ok_or_else(|| {
        GenerateError::invalid("First result without max results is not supported!")
    })?;
    let mut args = vec![query, lit_int(max_results as i64)];
    if let Some(first_result) = first_result {
        args.push(lit_int(first_result as i64));
    }
    Ok(function_function("LIMIT", args))
}
