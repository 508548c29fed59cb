//! Modification statements and the closed set of statement variants.

use serde::{Deserialize, Serialize};

use crate::alias::AliasManager;
use crate::error::{GenerateError, GenerateResult};
use crate::expr::{path, Expr, ExprExt};
use crate::generator::RenderContext;
use crate::join::{CopyContext, JoinGraph};
use crate::query::QueryBuilder;

// =============================================================================
// Rendered Output
// =============================================================================

/// Query text plus what the execution layer needs to run it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedQuery {
    pub text: String,
    /// Parameter names in first-occurrence order.
    pub parameters: Vec<String>,
    /// Offset the execution layer applies; never part of `text`.
    pub first_result: Option<u64>,
    /// Row limit the execution layer applies; never part of `text`.
    pub max_results: Option<u64>,
    /// Paths reported back by a RETURNING clause.
    pub returning: Vec<String>,
}

// =============================================================================
// Statement Variants
// =============================================================================

/// Behaviour shared by every statement variant.
pub trait QueryVariant: Sized {
    /// Variant name used in error reports.
    const NAME: &'static str;

    fn render(&self, ctx: &RenderContext<'_>) -> GenerateResult<RenderedQuery>;

    /// Deep copy with freshly numbered join graphs.
    fn copy(&self) -> GenerateResult<Self>;
}

/// Every statement the generator can render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    Select(QueryBuilder),
    Update(UpdateQuery),
    Delete(DeleteQuery),
    DeleteCollection(DeleteCollectionQuery),
}

impl Statement {
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Select(_) => QueryBuilder::NAME,
            Statement::Update(_) => UpdateQuery::NAME,
            Statement::Delete(_) => DeleteQuery::NAME,
            Statement::DeleteCollection(_) => DeleteCollectionQuery::NAME,
        }
    }
}

impl QueryVariant for Statement {
    const NAME: &'static str = "Statement";

    fn render(&self, ctx: &RenderContext<'_>) -> GenerateResult<RenderedQuery> {
        match self {
            Statement::Select(q) => q.render(ctx),
            Statement::Update(q) => q.render(ctx),
            Statement::Delete(q) => q.render(ctx),
            Statement::DeleteCollection(q) => q.render(ctx),
        }
    }

    fn copy(&self) -> GenerateResult<Self> {
        Ok(match self {
            Statement::Select(q) => Statement::Select(q.copy()?),
            Statement::Update(q) => Statement::Update(q.copy()?),
            Statement::Delete(q) => Statement::Delete(q.copy()?),
            Statement::DeleteCollection(q) => Statement::DeleteCollection(q.copy()?),
        })
    }
}

impl QueryVariant for QueryBuilder {
    const NAME: &'static str = "QueryBuilder";

    fn render(&self, ctx: &RenderContext<'_>) -> GenerateResult<RenderedQuery> {
        ctx.render_query(self)
    }

    fn copy(&self) -> GenerateResult<Self> {
        self.deep_copy()
    }
}

impl From<QueryBuilder> for Statement {
    fn from(query: QueryBuilder) -> Self {
        Statement::Select(query)
    }
}

impl From<crate::query::SelectQuery> for Statement {
    fn from(query: crate::query::SelectQuery) -> Self {
        Statement::Select(QueryBuilder::Select(query))
    }
}

impl From<UpdateQuery> for Statement {
    fn from(query: UpdateQuery) -> Self {
        Statement::Update(query)
    }
}

impl From<DeleteQuery> for Statement {
    fn from(query: DeleteQuery) -> Self {
        Statement::Delete(query)
    }
}

impl From<DeleteCollectionQuery> for Statement {
    fn from(query: DeleteCollectionQuery) -> Self {
        Statement::DeleteCollection(query)
    }
}

/// Target entity and namespace shared by the modification statements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DmlTarget {
    pub entity: String,
    pub alias: String,
    #[serde(default)]
    pub joins: JoinGraph,
    #[serde(default)]
    pub aliases: AliasManager,
}

impl DmlTarget {
    fn new(entity: &str, alias: &str) -> Self {
        let mut joins = JoinGraph::new();
        let root = joins.add_root(entity, alias);
        let mut aliases = AliasManager::new();
        aliases.register_join(alias, root, false);
        Self {
            entity: entity.into(),
            alias: alias.into(),
            joins,
            aliases,
        }
    }

    fn copy<'e>(&self, exprs: impl Iterator<Item = &'e mut Expr>) -> Self {
        let mut ctx = CopyContext::new();
        let mut joins = JoinGraph::new();
        self.joins.copy_into(&mut joins, &mut ctx);
        let mut aliases = self.aliases.clone();
        aliases.remap(&ctx);
        for expr in exprs {
            expr.remap(&ctx);
        }
        Self {
            entity: self.entity.clone(),
            alias: self.alias.clone(),
            joins,
            aliases,
        }
    }
}

fn conjoin(existing: Option<Expr>, condition: Expr) -> Option<Expr> {
    Some(match existing {
        Some(e) => e.and(condition),
        None => condition,
    })
}

// =============================================================================
// UPDATE
// =============================================================================

/// `UPDATE Entity alias SET path = value, ... [WHERE ...] [RETURNING ...]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use = "builders have no effect until used"]
pub struct UpdateQuery {
    pub target: DmlTarget,
    pub assignments: Vec<(Expr, Expr)>,
    pub where_clause: Option<Expr>,
    #[serde(default)]
    pub returning: Vec<String>,
}

impl UpdateQuery {
    pub fn new(entity: &str, alias: &str) -> Self {
        Self {
            target: DmlTarget::new(entity, alias),
            assignments: Vec::new(),
            where_clause: None,
            returning: Vec::new(),
        }
    }

    pub fn collect_parameters(&self, out: &mut Vec<String>) {
        for (target, value) in &self.assignments {
            target.collect_parameters(out);
            value.collect_parameters(out);
        }
        if let Some(condition) = &self.where_clause {
            condition.collect_parameters(out);
        }
    }

    pub fn set(mut self, target: &str, value: impl Into<Expr>) -> Self {
        self.assignments.push((path(target), value.into()));
        self
    }

    pub fn filter(mut self, condition: Expr) -> Self {
        self.where_clause = conjoin(self.where_clause.take(), condition);
        self
    }

    pub fn returning(mut self, paths: Vec<&str>) -> Self {
        self.returning.extend(paths.into_iter().map(String::from));
        self
    }
}

impl QueryVariant for UpdateQuery {
    const NAME: &'static str = "UpdateQuery";

    fn render(&self, ctx: &RenderContext<'_>) -> GenerateResult<RenderedQuery> {
        ctx.render_update(self)
    }

    fn copy(&self) -> GenerateResult<Self> {
        let mut copy = self.clone();
        let exprs = copy
            .assignments
            .iter_mut()
            .flat_map(|(t, v)| [t, v])
            .chain(copy.where_clause.iter_mut());
        let target = self.target.copy(exprs);
        copy.target = target;
        Ok(copy)
    }
}

// =============================================================================
// DELETE
// =============================================================================

/// `DELETE FROM Entity alias [WHERE ...] [RETURNING ...]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use = "builders have no effect until used"]
pub struct DeleteQuery {
    pub target: DmlTarget,
    pub where_clause: Option<Expr>,
    #[serde(default)]
    pub returning: Vec<String>,
}

impl DeleteQuery {
    pub fn new(entity: &str, alias: &str) -> Self {
        Self {
            target: DmlTarget::new(entity, alias),
            where_clause: None,
            returning: Vec::new(),
        }
    }

    pub fn filter(mut self, condition: Expr) -> Self {
        self.where_clause = conjoin(self.where_clause.take(), condition);
        self
    }

    pub fn collect_parameters(&self, out: &mut Vec<String>) {
        if let Some(condition) = &self.where_clause {
            condition.collect_parameters(out);
        }
    }

    pub fn returning(mut self, paths: Vec<&str>) -> Self {
        self.returning.extend(paths.into_iter().map(String::from));
        self
    }
}

impl QueryVariant for DeleteQuery {
    const NAME: &'static str = "DeleteQuery";

    fn render(&self, ctx: &RenderContext<'_>) -> GenerateResult<RenderedQuery> {
        ctx.render_delete(self)
    }

    fn copy(&self) -> GenerateResult<Self> {
        let mut copy = self.clone();
        let target = self.target.copy(copy.where_clause.iter_mut());
        copy.target = target;
        Ok(copy)
    }
}

/// `DELETE FROM Entity(collection) alias [WHERE ...]`
///
/// Removes elements of a collection-valued attribute. This variant may only
/// be rendered on its own or as the body of a CTE; it cannot be copied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use = "builders have no effect until used"]
pub struct DeleteCollectionQuery {
    pub target: DmlTarget,
    pub collection: String,
    pub where_clause: Option<Expr>,
    #[serde(default)]
    pub returning: Vec<String>,
}

impl DeleteCollectionQuery {
    pub fn new(entity: &str, alias: &str, collection: &str) -> Self {
        Self {
            target: DmlTarget::new(entity, alias),
            collection: collection.into(),
            where_clause: None,
            returning: Vec::new(),
        }
    }

    pub fn filter(mut self, condition: Expr) -> Self {
        self.where_clause = conjoin(self.where_clause.take(), condition);
        self
    }

    pub fn collect_parameters(&self, out: &mut Vec<String>) {
        if let Some(condition) = &self.where_clause {
            condition.collect_parameters(out);
        }
    }

    pub fn returning(mut self, paths: Vec<&str>) -> Self {
        self.returning.extend(paths.into_iter().map(String::from));
        self
    }
}

impl QueryVariant for DeleteCollectionQuery {
    const NAME: &'static str = "DeleteCollectionQuery";

    fn render(&self, ctx: &RenderContext<'_>) -> GenerateResult<RenderedQuery> {
        ctx.render_delete_collection(self)
    }

    fn copy(&self) -> GenerateResult<Self> {
        Err(GenerateError::UnsupportedForVariant {
            variant: Self::NAME,
            operation: "copy",
        })
    }
}
