//! Select queries - construct entity queries with a fluent API.
//!
//! A [`SelectQuery`] owns the alias namespace and join graph of its level.
//! Clause methods take `mut self` and return the query; join methods take
//! `&mut self` and hand back the new node's handle, since joining may fail
//! on an unknown parent alias.

use serde::{Deserialize, Serialize};

use crate::alias::AliasManager;
use crate::cte::Cte;
use crate::error::{GenerateError, GenerateResult};
use crate::expr::{Expr, ExprExt, PathExpr};
use crate::join::{CopyContext, JoinGraph, JoinNodeId, JoinType, RelationKind};
use crate::set_op::{SetOperationManager, SetOperationType};

// =============================================================================
// Select Item
// =============================================================================

/// A SELECT list item: expression with optional alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use = "builders have no effect until used"]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

impl From<Expr> for SelectItem {
    fn from(expr: Expr) -> Self {
        SelectItem::new(expr)
    }
}

// =============================================================================
// Order By
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// NULLS FIRST / NULLS LAST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsOrder {
    First,
    Last,
}

/// ORDER BY item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use = "builders have no effect until used"]
pub struct OrderByItem {
    pub expr: Expr,
    #[serde(default)]
    pub dir: SortDir,
    pub nulls: Option<NullsOrder>,
}

impl OrderByItem {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            dir: SortDir::Asc,
            nulls: None,
        }
    }

    pub fn asc(expr: Expr) -> Self {
        Self::new(expr)
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            dir: SortDir::Desc,
            ..Self::new(expr)
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }
}

// =============================================================================
// Select Query
// =============================================================================

/// A single SELECT query level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[must_use = "builders have no effect until used"]
pub struct SelectQuery {
    #[serde(default)]
    pub ctes: Vec<Cte>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub select: Vec<SelectItem>,
    #[serde(default)]
    pub joins: JoinGraph,
    #[serde(default)]
    pub aliases: AliasManager,
    pub where_clause: Option<Expr>,
    #[serde(default)]
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    #[serde(default)]
    pub order_by: Vec<OrderByItem>,
    pub first_result: Option<u64>,
    pub max_results: Option<u64>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// `SELECT ... FROM entity alias`
    pub fn from_entity(entity: &str, alias: &str) -> Self {
        Self::new().from(entity, alias)
    }

    /// Add a root to the FROM clause.
    pub fn from(mut self, entity: &str, alias: &str) -> Self {
        let node = self.joins.add_root(entity, alias);
        self.aliases.register_join(alias, node, false);
        self
    }

    /// Add a root correlated to a path of the enclosing query.
    pub fn correlated(mut self, outer_path: &str, alias: &str) -> Self {
        let node = self.joins.correlate(outer_path, alias);
        self.aliases.register_join(alias, node, false);
        self
    }

    /// Add a CTE to the WITH clause.
    pub fn with_cte(mut self, cte: Cte) -> Self {
        self.ctes.push(cte);
        self
    }

    /// Join `path` (`alias.attribute[.attribute...]`) as `alias`.
    pub fn join(
        &mut self,
        path: &str,
        alias: &str,
        relation: RelationKind,
        join_type: JoinType,
    ) -> GenerateResult<JoinNodeId> {
        let (parent, attribute) = self.split_join_path(path)?;
        let node = self
            .joins
            .join(parent, attribute, alias, relation, join_type)?;
        self.aliases.register_join(alias, node, false);
        Ok(node)
    }

    pub fn left_join(
        &mut self,
        path: &str,
        alias: &str,
        relation: RelationKind,
    ) -> GenerateResult<JoinNodeId> {
        self.join(path, alias, relation, JoinType::Left)
    }

    pub fn inner_join(
        &mut self,
        path: &str,
        alias: &str,
        relation: RelationKind,
    ) -> GenerateResult<JoinNodeId> {
        self.join(path, alias, relation, JoinType::Inner)
    }

    /// `LEFT JOIN FETCH path alias`
    pub fn join_fetch(
        &mut self,
        path: &str,
        alias: &str,
        relation: RelationKind,
    ) -> GenerateResult<JoinNodeId> {
        let node = self.join(path, alias, relation, JoinType::Left)?;
        if let Some(n) = self.joins.node_mut(node) {
            n.fetch = true;
        }
        Ok(node)
    }

    /// Join an unrelated entity (or a CTE) under the root `parent_alias`.
    pub fn join_entity(
        &mut self,
        parent_alias: &str,
        entity: &str,
        alias: &str,
        join_type: JoinType,
        on: Expr,
    ) -> GenerateResult<JoinNodeId> {
        let parent = self.require_alias(parent_alias)?;
        let node = self
            .joins
            .join_entity(parent, entity, alias, join_type, on)?;
        self.aliases.register_join(alias, node, false);
        Ok(node)
    }

    /// `, Entity alias` under the root `parent_alias`.
    pub fn cross_join(
        &mut self,
        parent_alias: &str,
        entity: &str,
        alias: &str,
    ) -> GenerateResult<JoinNodeId> {
        let parent = self.require_alias(parent_alias)?;
        let node = self.joins.cross_join(parent, entity, alias)?;
        self.aliases.register_join(alias, node, false);
        Ok(node)
    }

    /// Attach an ON condition to an existing join.
    pub fn on(&mut self, node: JoinNodeId, condition: Expr) -> GenerateResult<()> {
        let n = self.joins.node_mut(node).ok_or_else(|| {
            GenerateError::UnresolvedReference(format!("join node #{} does not exist", node.0))
        })?;
        n.on = Some(match n.on.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        Ok(())
    }

    fn require_alias(&self, alias: &str) -> GenerateResult<JoinNodeId> {
        self.aliases.join_node(alias).ok_or_else(|| {
            GenerateError::UnresolvedReference(format!("'{}' is not a join alias", alias))
        })
    }

    fn split_join_path<'p>(&self, path: &'p str) -> GenerateResult<(JoinNodeId, &'p str)> {
        let (alias, attribute) = path.split_once('.').ok_or_else(|| {
            GenerateError::invalid(format!("join path '{}' has no attribute", path))
        })?;
        Ok((self.require_alias(alias)?, attribute))
    }

    /// A path bound to the join node named `alias`.
    pub fn alias_path(&self, alias: &str, field: Option<&str>) -> GenerateResult<Expr> {
        let node = self.require_alias(alias)?;
        Ok(Expr::Path(PathExpr::bound(node, alias, field)))
    }

    /// Add a select item. An aliased item is registered in the namespace.
    pub fn select(mut self, item: impl Into<SelectItem>) -> Self {
        let item = item.into();
        if let Some(alias) = &item.alias {
            self.aliases.register_select(alias, item.expr.clone());
        }
        self.select.push(item);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Add a WHERE condition, AND-ed with existing ones.
    pub fn filter(mut self, condition: Expr) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn group_by(mut self, exprs: Vec<Expr>) -> Self {
        self.group_by.extend(exprs);
        self
    }

    /// Add a HAVING condition, AND-ed with existing ones.
    pub fn having(mut self, condition: Expr) -> Self {
        self.having = Some(match self.having {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn order_by(mut self, items: Vec<OrderByItem>) -> Self {
        self.order_by.extend(items);
        self
    }

    pub fn limit(mut self, max_results: u64) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn offset(mut self, first_result: u64) -> Self {
        self.first_result = Some(first_result);
        self
    }

    pub fn has_limit(&self) -> bool {
        self.first_result.is_some() || self.max_results.is_some()
    }

    /// Every top-level expression of this level, mutably.
    pub fn expressions_mut(&mut self) -> impl Iterator<Item = &mut Expr> {
        self.select
            .iter_mut()
            .map(|item| &mut item.expr)
            .chain(self.where_clause.iter_mut())
            .chain(self.group_by.iter_mut())
            .chain(self.having.iter_mut())
            .chain(self.order_by.iter_mut().map(|item| &mut item.expr))
    }

    /// Parameter names in the order they appear in the rendered text.
    pub fn collect_parameters(&self, out: &mut Vec<String>) {
        for cte in &self.ctes {
            cte.body.collect_parameters(out);
        }
        for item in &self.select {
            item.expr.collect_parameters(out);
        }
        for id in self.joins.depth_first() {
            if let Some(on) = self.joins.node(id).and_then(|n| n.on.as_ref()) {
                on.collect_parameters(out);
            }
        }
        let rest = self
            .where_clause
            .iter()
            .chain(self.group_by.iter())
            .chain(self.having.iter())
            .chain(self.order_by.iter().map(|item| &item.expr));
        for expr in rest {
            expr.collect_parameters(out);
        }
    }

    /// Deep copy with a freshly numbered join graph.
    ///
    /// Fails when a CTE body cannot be copied.
    pub fn deep_copy(&self) -> GenerateResult<Self> {
        let mut ctx = CopyContext::new();
        let mut joins = JoinGraph::new();
        self.joins.copy_into(&mut joins, &mut ctx);

        let ctes = self
            .ctes
            .iter()
            .map(Cte::copy)
            .collect::<GenerateResult<Vec<_>>>()?;

        let mut copy = self.clone();
        copy.ctes = ctes;
        copy.joins = joins;
        copy.aliases.remap(&ctx);
        for expr in copy.expressions_mut() {
            expr.remap(&ctx);
        }
        Ok(copy)
    }
}

// =============================================================================
// Query Builder
// =============================================================================

/// A renderable query: a single select or a chain of set operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryBuilder {
    Select(SelectQuery),
    SetOperation(SetOperationManager),
}

impl QueryBuilder {
    pub fn first_result(&self) -> Option<u64> {
        match self {
            QueryBuilder::Select(q) => q.first_result,
            QueryBuilder::SetOperation(m) => m.first_result,
        }
    }

    pub fn max_results(&self) -> Option<u64> {
        match self {
            QueryBuilder::Select(q) => q.max_results,
            QueryBuilder::SetOperation(m) => m.max_results,
        }
    }

    pub fn has_limit(&self) -> bool {
        self.first_result().is_some() || self.max_results().is_some()
    }

    /// Combine with `other`. Chains of the same operator without their own
    /// modifiers are extended rather than nested.
    pub fn set_operation(self, operator: SetOperationType, other: impl Into<QueryBuilder>) -> Self {
        match self {
            QueryBuilder::SetOperation(mut manager)
                if manager.operator == Some(operator) && !manager.has_modifiers() =>
            {
                manager.push(other.into());
                QueryBuilder::SetOperation(manager)
            }
            start => QueryBuilder::SetOperation(SetOperationManager::new(
                operator,
                start,
                other.into(),
            )),
        }
    }

    pub fn union(self, other: impl Into<QueryBuilder>) -> Self {
        self.set_operation(SetOperationType::Union, other)
    }

    pub fn union_all(self, other: impl Into<QueryBuilder>) -> Self {
        self.set_operation(SetOperationType::UnionAll, other)
    }

    pub fn intersect(self, other: impl Into<QueryBuilder>) -> Self {
        self.set_operation(SetOperationType::Intersect, other)
    }

    pub fn intersect_all(self, other: impl Into<QueryBuilder>) -> Self {
        self.set_operation(SetOperationType::IntersectAll, other)
    }

    pub fn except(self, other: impl Into<QueryBuilder>) -> Self {
        self.set_operation(SetOperationType::Except, other)
    }

    pub fn except_all(self, other: impl Into<QueryBuilder>) -> Self {
        self.set_operation(SetOperationType::ExceptAll, other)
    }

    pub fn order_by(self, items: Vec<OrderByItem>) -> Self {
        match self {
            QueryBuilder::Select(q) => QueryBuilder::Select(q.order_by(items)),
            QueryBuilder::SetOperation(mut m) => {
                m.order_by.extend(items);
                QueryBuilder::SetOperation(m)
            }
        }
    }

    pub fn limit(self, max_results: u64) -> Self {
        match self {
            QueryBuilder::Select(q) => QueryBuilder::Select(q.limit(max_results)),
            QueryBuilder::SetOperation(mut m) => {
                m.max_results = Some(max_results);
                QueryBuilder::SetOperation(m)
            }
        }
    }

    pub fn offset(self, first_result: u64) -> Self {
        match self {
            QueryBuilder::Select(q) => QueryBuilder::Select(q.offset(first_result)),
            QueryBuilder::SetOperation(mut m) => {
                m.first_result = Some(first_result);
                QueryBuilder::SetOperation(m)
            }
        }
    }

    /// Parameter names in the order they appear in the rendered text.
    pub fn collect_parameters(&self, out: &mut Vec<String>) {
        match self {
            QueryBuilder::Select(q) => q.collect_parameters(out),
            QueryBuilder::SetOperation(m) => {
                for member in m.members() {
                    member.collect_parameters(out);
                }
                for item in &m.order_by {
                    item.expr.collect_parameters(out);
                }
            }
        }
    }

    /// Deep copy of every member query.
    pub fn deep_copy(&self) -> GenerateResult<Self> {
        match self {
            QueryBuilder::Select(q) => Ok(QueryBuilder::Select(q.deep_copy()?)),
            QueryBuilder::SetOperation(m) => {
                let mut copy = m.clone();
                copy.start = Box::new(m.start.deep_copy()?);
                copy.operands = m
                    .operands
                    .iter()
                    .map(QueryBuilder::deep_copy)
                    .collect::<GenerateResult<Vec<_>>>()?;
                Ok(QueryBuilder::SetOperation(copy))
            }
        }
    }
}

impl From<SelectQuery> for QueryBuilder {
    fn from(query: SelectQuery) -> Self {
        QueryBuilder::Select(query)
    }
}

impl From<SetOperationManager> for QueryBuilder {
    fn from(manager: SetOperationManager) -> Self {
        QueryBuilder::SetOperation(manager)
    }
}

impl From<SelectQuery> for Expr {
    /// Convert a query into a subquery expression.
    fn from(query: SelectQuery) -> Self {
        Expr::Subquery(Box::new(QueryBuilder::Select(query)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasInfo;
    use crate::expr::path;

    #[test]
    fn test_from_registers_alias() {
        let q = SelectQuery::from_entity("Document", "d");
        assert_eq!(q.aliases.join_node("d"), Some(JoinNodeId(0)));
        assert_eq!(q.joins.roots(), &[JoinNodeId(0)]);
    }

    #[test]
    fn test_join_path() {
        let mut q = SelectQuery::from_entity("Document", "d");
        let l = q.left_join("d.localized", "l", RelationKind::Map).unwrap();
        assert_eq!(q.aliases.join_node("l"), Some(l));
        assert!(q.joins.is_map_value(l));
        assert_eq!(q.joins.node(l).unwrap().parent, Some(JoinNodeId(0)));
    }

    #[test]
    fn test_join_errors() {
        let mut q = SelectQuery::from_entity("Document", "d");
        assert!(matches!(
            q.left_join("x.localized", "l", RelationKind::Map),
            Err(GenerateError::UnresolvedReference(_))
        ));
        assert!(matches!(
            q.left_join("d", "l", RelationKind::Map),
            Err(GenerateError::InvalidQueryShape(_))
        ));
    }

    #[test]
    fn test_select_alias_registered() {
        let q = SelectQuery::from_entity("Document", "d").select(path("d.name").alias("docName"));
        assert!(matches!(
            q.aliases.resolve("docName"),
            Some(AliasInfo::Select { .. })
        ));
    }

    #[test]
    fn test_filters_are_conjoined() {
        let q = SelectQuery::from_entity("Document", "d")
            .filter(path("d.age").gt(1))
            .filter(path("d.age").lt(10));
        assert!(matches!(
            q.where_clause,
            Some(Expr::Binary {
                op: crate::expr::BinaryOperator::And,
                ..
            })
        ));
    }

    #[test]
    fn test_deep_copy_renumbers_depth_first() {
        let mut q = SelectQuery::from_entity("Document", "d").from("Person", "p");
        let o = q.left_join("d.owner", "o", RelationKind::Singular).unwrap();
        assert_eq!(o, JoinNodeId(2));
        let owner_name = q.alias_path("o", Some("name")).unwrap();
        let person = q.alias_path("p", None).unwrap();
        let q = q.select(owner_name).select(person);

        let copy = q.deep_copy().unwrap();
        assert_eq!(copy.aliases.join_node("o"), Some(JoinNodeId(1)));
        assert_eq!(copy.aliases.join_node("p"), Some(JoinNodeId(2)));
        let Expr::Path(owner) = &copy.select[0].expr else {
            panic!("expected path");
        };
        assert_eq!(owner.base, Some(JoinNodeId(1)));
        let Expr::Path(person) = &copy.select[1].expr else {
            panic!("expected path");
        };
        assert_eq!(person.base, Some(JoinNodeId(2)));
    }

    #[test]
    fn test_set_operation_chaining() {
        let a = QueryBuilder::from(SelectQuery::from_entity("A", "a"));
        let b = SelectQuery::from_entity("B", "b");
        let c = SelectQuery::from_entity("C", "c");

        let chained = a.clone().union(b.clone()).union(c.clone());
        let QueryBuilder::SetOperation(m) = &chained else {
            panic!("expected set operation");
        };
        assert_eq!(m.operands.len(), 2);

        let nested = a.union(b).limit(5).union(c);
        let QueryBuilder::SetOperation(m) = &nested else {
            panic!("expected set operation");
        };
        assert_eq!(m.operands.len(), 1);
        assert!(matches!(
            m.start.as_ref(),
            QueryBuilder::SetOperation(inner) if inner.max_results == Some(5)
        ));
    }
}
