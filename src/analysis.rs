//! Side analyses over expression trees.
//!
//! - [`GroupByUsableDetection`] decides whether an expression is already
//!   aggregated and therefore needs no GROUP BY entry.
//! - [`implicit_group_by`] derives the GROUP BY expressions a query needs
//!   once its select clause aggregates.
//! - [`SizeTransformer`] rewrites `SIZE(collection)` into a count the
//!   target dialect can evaluate in the clause it appears in.

use tracing::debug;

use crate::error::GenerateResult;
use crate::expr::{bound_path, count, count_star, Expr, Literal, PathExpr};
use crate::join::{JoinNodeId, JoinType, RelationKind};
use crate::query::SelectQuery;

// =============================================================================
// Visitors
// =============================================================================

/// A boolean visitor that stops at the first `true`.
///
/// The default `visit` recurses structurally; a leaf yields `false`.
/// Subqueries have no children here, so implementations decide for
/// themselves whether to look inside.
pub trait AbortableVisitor {
    fn visit(&self, expr: &Expr) -> bool {
        self.visit_children(expr)
    }

    fn visit_children(&self, expr: &Expr) -> bool {
        expr.children().into_iter().any(|child| self.visit(child))
    }
}

/// Whether an expression counts as aggregated for GROUP BY purposes.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupByUsableDetection {
    /// Whether `SIZE(...)` counts as an aggregate; depends on the clause.
    pub treat_size_as_aggregate: bool,
}

impl GroupByUsableDetection {
    pub fn new(treat_size_as_aggregate: bool) -> Self {
        Self {
            treat_size_as_aggregate,
        }
    }

    pub fn for_clause(clause: ClauseType) -> Self {
        Self::new(clause.treats_size_as_aggregate())
    }
}

impl AbortableVisitor for GroupByUsableDetection {
    fn visit(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Aggregate(_) => true,
            Expr::Function(f) if f.is_size_function() && self.treat_size_as_aggregate => true,
            // Opaque to grouping analysis.
            Expr::Subquery(_) => true,
            _ => self.visit_children(expr),
        }
    }
}

/// The clause an expression is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseType {
    Select,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Join,
}

impl ClauseType {
    /// Clauses where `SIZE(...)` is evaluated after grouping.
    pub fn treats_size_as_aggregate(&self) -> bool {
        matches!(
            self,
            ClauseType::Select | ClauseType::Having | ClauseType::OrderBy
        )
    }

    /// Clauses where a size may become `COUNT(join)` of a new LEFT JOIN.
    fn allows_count_rewrite(&self) -> bool {
        matches!(self, ClauseType::Select | ClauseType::OrderBy)
    }
}

// =============================================================================
// Implicit GROUP BY
// =============================================================================

/// GROUP BY expressions a query needs but does not declare.
///
/// Empty unless the select or order-by clause aggregates. Every select and
/// order-by expression that is not aggregated is required, except constants.
/// With an empty select list the roots themselves are required.
pub fn implicit_group_by(query: &SelectQuery) -> Vec<Expr> {
    let select = GroupByUsableDetection::for_clause(ClauseType::Select);
    let order = GroupByUsableDetection::for_clause(ClauseType::OrderBy);

    let aggregates = query.select.iter().any(|item| select.visit(&item.expr))
        || query.order_by.iter().any(|item| order.visit(&item.expr));
    if !aggregates {
        return Vec::new();
    }

    let roots: Vec<Expr> = if query.select.is_empty() {
        query
            .joins
            .roots()
            .iter()
            .filter_map(|id| {
                query
                    .joins
                    .node(*id)
                    .map(|node| bound_path(*id, &node.alias, None))
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut candidates: Vec<&Expr> = roots.iter().collect();
    candidates.extend(
        query
            .select
            .iter()
            .map(|item| &item.expr)
            .filter(|expr| !select.visit(expr)),
    );
    candidates.extend(
        query
            .order_by
            .iter()
            .map(|item| &item.expr)
            .filter(|expr| !order.visit(expr)),
    );

    let mut required: Vec<Expr> = Vec::new();
    for expr in candidates {
        if is_constant(expr) || query.group_by.contains(expr) || required.contains(expr) {
            continue;
        }
        required.push(expr.clone());
    }
    required
}

/// Add the implicit GROUP BY expressions to `query`.
pub fn apply_implicit_group_by(query: &mut SelectQuery) {
    let required = implicit_group_by(query);
    if !required.is_empty() {
        debug!(count = required.len(), "adding implicit GROUP BY expressions");
        query.group_by.extend(required);
    }
}

fn is_constant(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Literal(_) | Expr::Parameter(_) | Expr::Null | Expr::Verbatim(_)
    )
}

// =============================================================================
// SIZE Rewriting
// =============================================================================

/// How a `SIZE(collection)` is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeStrategy {
    /// `COUNT(alias)` over a new LEFT JOIN, grouped by the other items.
    Count,
    /// `(SELECT COUNT(*) FROM owner.collection alias)`
    Subquery,
}

/// Rewrites `SIZE(...)` calls of one query level.
#[derive(Debug, Default)]
pub struct SizeTransformer {
    count_rewritten: bool,
}

impl SizeTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strategy for a size appearing in `clause` of `query`.
    pub fn strategy(&self, query: &SelectQuery, clause: ClauseType) -> SizeStrategy {
        let count_allowed = clause.allows_count_rewrite()
            && !query.distinct
            && !query.joins.has_collection_joins()
            && !has_complex_group_by(query)
            && !self.count_rewritten;
        if count_allowed {
            SizeStrategy::Count
        } else {
            SizeStrategy::Subquery
        }
    }

    /// Rewrite every `SIZE(path)` of the query level in place.
    ///
    /// Subqueries are left alone; they are transformed as their own level.
    pub fn transform(&mut self, query: &mut SelectQuery) -> GenerateResult<()> {
        let mut select = std::mem::take(&mut query.select);
        for item in &mut select {
            self.rewrite(&mut item.expr, ClauseType::Select, query)?;
        }
        query.select = select;

        let mut order_by = std::mem::take(&mut query.order_by);
        for item in &mut order_by {
            self.rewrite(&mut item.expr, ClauseType::OrderBy, query)?;
        }
        query.order_by = order_by;

        if let Some(mut condition) = query.where_clause.take() {
            self.rewrite(&mut condition, ClauseType::Where, query)?;
            query.where_clause = Some(condition);
        }

        let mut group_by = std::mem::take(&mut query.group_by);
        for expr in &mut group_by {
            self.rewrite(expr, ClauseType::GroupBy, query)?;
        }
        query.group_by = group_by;

        if let Some(mut condition) = query.having.take() {
            self.rewrite(&mut condition, ClauseType::Having, query)?;
            query.having = Some(condition);
        }

        for id in query.joins.depth_first() {
            let Some(mut condition) = query.joins.node_mut(id).and_then(|n| n.on.take()) else {
                continue;
            };
            self.rewrite(&mut condition, ClauseType::Join, query)?;
            if let Some(node) = query.joins.node_mut(id) {
                node.on = Some(condition);
            }
        }

        if self.count_rewritten {
            apply_implicit_group_by(query);
        }
        Ok(())
    }

    fn rewrite(
        &mut self,
        expr: &mut Expr,
        clause: ClauseType,
        query: &mut SelectQuery,
    ) -> GenerateResult<()> {
        let size_of = match expr {
            Expr::Function(f) if f.is_size_function() => match f.args.as_slice() {
                [Expr::Path(path)] => Some(path.clone()),
                _ => None,
            },
            Expr::Subquery(_) => return Ok(()),
            _ => None,
        };
        if let Some(path) = size_of {
            if let Some(replacement) = self.replace_size(&path, clause, query)? {
                *expr = replacement;
            }
            return Ok(());
        }
        for child in expr.children_mut() {
            self.rewrite(child, clause, query)?;
        }
        Ok(())
    }

    fn replace_size(
        &mut self,
        path: &PathExpr,
        clause: ClauseType,
        query: &mut SelectQuery,
    ) -> GenerateResult<Option<Expr>> {
        let Some((collection, owner)) = path.elements.split_last() else {
            return Ok(None);
        };
        if owner.is_empty() {
            return Ok(None);
        }
        let owner_path = owner.join(".");
        let base_alias = format!("{}_{}", owner.join("_"), collection);

        let owner_node = match owner {
            [alias] => query.aliases.join_node(alias),
            _ => None,
        };

        let strategy = match owner_node {
            Some(_) => self.strategy(query, clause),
            None => SizeStrategy::Subquery,
        };
        debug!(path = %path.path(), ?clause, ?strategy, "rewriting SIZE");

        match (strategy, owner_node) {
            (SizeStrategy::Count, Some(parent)) => {
                let alias = query.joins.unique_alias(&base_alias);
                let node = self.add_count_join(query, parent, collection, &alias)?;
                self.count_rewritten = true;
                Ok(Some(count(bound_path(node, &alias, None))))
            }
            _ => {
                let alias = query.joins.unique_alias(&base_alias);
                let subquery = SelectQuery::new()
                    .correlated(&format!("{}.{}", owner_path, collection), &alias)
                    .select(count_star());
                Ok(Some(Expr::Subquery(Box::new(subquery.into()))))
            }
        }
    }

    fn add_count_join(
        &self,
        query: &mut SelectQuery,
        parent: JoinNodeId,
        collection: &str,
        alias: &str,
    ) -> GenerateResult<JoinNodeId> {
        let node = query.joins.join(
            parent,
            collection,
            alias,
            RelationKind::Collection,
            JoinType::Left,
        )?;
        if let Some(n) = query.joins.node_mut(node) {
            n.implicit = true;
        }
        query.aliases.register_join(alias, node, true);
        Ok(node)
    }
}

/// GROUP BY entries other than plain paths and constants.
fn has_complex_group_by(query: &SelectQuery) -> bool {
    query.group_by.iter().any(|expr| {
        !matches!(
            expr,
            Expr::Path(_) | Expr::Literal(Literal::Int(_) | Literal::String(_))
        )
    })
}
