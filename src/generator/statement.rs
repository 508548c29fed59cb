//! Statement rendering: SELECT levels, set operations, CTEs and DML.

use tracing::debug;

use crate::alias::AliasManager;
use crate::cte::{Cte, CteBody};
use crate::dml::{DeleteCollectionQuery, DeleteQuery, DmlTarget, RenderedQuery, UpdateQuery};
use crate::error::{GenerateError, GenerateResult};
use crate::expr::path;
use crate::join::{JoinGraph, JoinNodeId, JoinSource, JoinType};
use crate::query::{NullsOrder, OrderByItem, QueryBuilder, SelectQuery, SortDir};
use crate::set_op::SetOperationManager;
use crate::token::{Token, TokenStream};

use super::{QueryGenerator, RenderContext};

impl RenderContext<'_> {
    // =========================================================================
    // Entry Points
    // =========================================================================

    /// Render a select or set-operation statement.
    ///
    /// Limits of a plain select are reported, not rendered. A set operation
    /// renders natively when the provider allows it and no member carries a
    /// limit; otherwise its limits travel inside the function-call form.
    pub fn render_query(&self, query: &QueryBuilder) -> GenerateResult<RenderedQuery> {
        debug!(dialect = self.provider.name(), statement = "select", "rendering statement");
        let mut parameters = Vec::new();
        query.collect_parameters(&mut parameters);

        let (text, first_result, max_results) = match query {
            QueryBuilder::Select(select) => (
                self.select_text(select)?,
                select.first_result,
                select.max_results,
            ),
            QueryBuilder::SetOperation(manager) => self.set_operation_text(manager)?,
        };

        Ok(RenderedQuery {
            text,
            parameters,
            first_result,
            max_results,
            returning: Vec::new(),
        })
    }

    pub fn render_update(&self, update: &UpdateQuery) -> GenerateResult<RenderedQuery> {
        debug!(dialect = self.provider.name(), statement = "update", "rendering statement");
        let mut out = TokenStream::new();
        self.render_update_into(update, &mut out)?;
        let mut parameters = Vec::new();
        update.collect_parameters(&mut parameters);
        Ok(RenderedQuery {
            text: out.serialize(self.provider),
            parameters,
            returning: update.returning.clone(),
            ..Default::default()
        })
    }

    pub fn render_delete(&self, delete: &DeleteQuery) -> GenerateResult<RenderedQuery> {
        debug!(dialect = self.provider.name(), statement = "delete", "rendering statement");
        let mut out = TokenStream::new();
        self.render_delete_into(
            &delete.target,
            None,
            delete.where_clause.as_ref(),
            &delete.returning,
            &mut out,
        )?;
        let mut parameters = Vec::new();
        delete.collect_parameters(&mut parameters);
        Ok(RenderedQuery {
            text: out.serialize(self.provider),
            parameters,
            returning: delete.returning.clone(),
            ..Default::default()
        })
    }

    pub fn render_delete_collection(
        &self,
        delete: &DeleteCollectionQuery,
    ) -> GenerateResult<RenderedQuery> {
        debug!(
            dialect = self.provider.name(),
            statement = "delete_collection",
            "rendering statement"
        );
        let mut out = TokenStream::new();
        self.render_delete_collection_into(delete, &mut out)?;
        let mut parameters = Vec::new();
        delete.collect_parameters(&mut parameters);
        Ok(RenderedQuery {
            text: out.serialize(self.provider),
            parameters,
            returning: delete.returning.clone(),
            ..Default::default()
        })
    }

    // =========================================================================
    // SELECT
    // =========================================================================

    /// Text of one select level, without its limits.
    pub(crate) fn select_text(&self, select: &SelectQuery) -> GenerateResult<String> {
        let mut out = TokenStream::new();
        self.render_select(select, &mut out)?;
        Ok(out.serialize(self.provider))
    }

    fn render_select(&self, select: &SelectQuery, out: &mut TokenStream) -> GenerateResult<()> {
        if select.joins.roots().is_empty() {
            return Err(GenerateError::invalid("query has no FROM clause"));
        }
        self.render_with_clause(&select.ctes, out)?;

        let g = self.generator(&select.aliases, &select.joins);

        out.push(Token::Select).space();
        if select.distinct {
            out.push(Token::Distinct).space();
        }
        if select.select.is_empty() {
            // Select the roots themselves.
            for (i, root) in select.joins.roots().iter().enumerate() {
                if i > 0 {
                    out.comma().space();
                }
                if let Some(node) = select.joins.node(*root) {
                    out.ident(&self.declared_alias(&node.alias));
                }
            }
        } else {
            for (i, item) in select.select.iter().enumerate() {
                if i > 0 {
                    out.comma().space();
                }
                g.render_expr(&item.expr, out)?;
                if let Some(alias) = &item.alias {
                    out.space().push(Token::As).space().ident(alias);
                }
            }
        }

        out.space().push(Token::From).space();
        self.render_from(&select.joins, &g, out)?;

        if let Some(condition) = &select.where_clause {
            out.space().push(Token::Where).space();
            g.render_predicate(condition, out)?;
        }

        if !select.group_by.is_empty() {
            out.space().push(Token::GroupBy).space();
            for (i, expr) in select.group_by.iter().enumerate() {
                if i > 0 {
                    out.comma().space();
                }
                g.render_expr(expr, out)?;
            }
        }

        if let Some(condition) = &select.having {
            out.space().push(Token::Having).space();
            g.render_predicate(condition, out)?;
        }

        if !select.order_by.is_empty() {
            out.space().push(Token::OrderBy).space();
            for (i, item) in select.order_by.iter().enumerate() {
                if i > 0 {
                    out.comma().space();
                }
                render_order_item(&g, item, out)?;
            }
        }

        Ok(())
    }

    // =========================================================================
    // FROM
    // =========================================================================

    fn render_from(
        &self,
        joins: &JoinGraph,
        g: &QueryGenerator<'_>,
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        for (i, root) in joins.roots().iter().enumerate() {
            if i > 0 {
                out.comma().space();
            }
            let mut nodes = joins.subtree(*root).into_iter();
            if let Some(root) = nodes.next() {
                self.render_root(joins, root, out)?;
            }
            for node in nodes {
                self.render_join(joins, node, g, out)?;
            }
        }
        Ok(())
    }

    fn render_root(
        &self,
        joins: &JoinGraph,
        id: JoinNodeId,
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        let node = node_or_err(joins, id)?;
        match &node.source {
            JoinSource::Root { entity } => out.ident(entity),
            JoinSource::Correlated { path } => {
                if let Some(prefix) = self.outer_prefix(path) {
                    out.push(Token::Raw(prefix.to_string()));
                }
                out.ident(path)
            }
            JoinSource::Attribute { .. } | JoinSource::Entity { .. } => {
                return Err(GenerateError::invalid(format!(
                    "join '{}' has no parent",
                    node.alias
                )))
            }
        };
        out.space().ident(&self.declared_alias(&node.alias));
        Ok(())
    }

    fn render_join(
        &self,
        joins: &JoinGraph,
        id: JoinNodeId,
        g: &QueryGenerator<'_>,
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        let node = node_or_err(joins, id)?;

        match node.join_type.unwrap_or_default() {
            JoinType::Cross => {
                let JoinSource::Entity { entity } = &node.source else {
                    return Err(GenerateError::invalid(format!(
                        "cross join '{}' must join an entity",
                        node.alias
                    )));
                };
                if node.on.is_some() {
                    return Err(GenerateError::invalid(format!(
                        "cross join '{}' cannot have a condition",
                        node.alias
                    )));
                }
                out.comma()
                    .space()
                    .ident(entity)
                    .space()
                    .ident(&self.declared_alias(&node.alias));
                return Ok(());
            }
            _ if matches!(node.source, JoinSource::Entity { .. })
                && !self.provider.supports_entity_join() =>
            {
                return Err(self.unsupported(format!(
                    "entity join '{}' is not supported",
                    node.alias
                )));
            }
            JoinType::Left => {
                out.space().push(Token::Left).space().push(Token::Join);
            }
            JoinType::Inner => {
                out.space().push(Token::Join);
            }
        }
        if node.fetch {
            out.space().push(Token::Fetch);
        }
        out.space();

        match &node.source {
            JoinSource::Attribute { attribute, .. } => {
                let parent = node
                    .parent
                    .and_then(|p| joins.node(p))
                    .ok_or_else(|| {
                        GenerateError::UnresolvedReference(format!(
                            "join '{}' has no parent node",
                            node.alias
                        ))
                    })?;
                out.ident(&self.declared_alias(&parent.alias))
                    .dot()
                    .ident(attribute);
            }
            JoinSource::Entity { entity } => {
                out.ident(entity);
            }
            JoinSource::Root { .. } | JoinSource::Correlated { .. } => {
                return Err(GenerateError::invalid(format!(
                    "root '{}' cannot be joined",
                    node.alias
                )))
            }
        }
        out.space().ident(&self.declared_alias(&node.alias));

        if let Some(condition) = &node.on {
            out.space().push(Token::OnKeyword).space();
            g.render_predicate(condition, out)?;
        }
        Ok(())
    }

    // =========================================================================
    // Set Operations
    // =========================================================================

    /// Text and execution-layer limits of a top-level set operation.
    fn set_operation_text(
        &self,
        manager: &SetOperationManager,
    ) -> GenerateResult<(String, Option<u64>, Option<u64>)> {
        if !manager.has_set_operations() || manager.operator.is_none() {
            let mut rendered = self.render_query(&manager.start)?;
            if manager.has_limit() {
                rendered.first_result = manager.first_result;
                rendered.max_results = manager.max_results;
            }
            return Ok((rendered.text, rendered.first_result, rendered.max_results));
        }

        if self.provider.supports_native_set_operations() && natively_expressible(manager) {
            let mut out = TokenStream::new();
            self.render_native_set_operation(manager, &mut out)?;
            return Ok((
                out.serialize(self.provider),
                manager.first_result,
                manager.max_results,
            ));
        }

        debug!(dialect = self.provider.name(), "set operation rendered as function call");
        let expr = self.as_expression(&QueryBuilder::SetOperation(manager.clone()))?;
        let aliases = AliasManager::new();
        let joins = JoinGraph::new();
        let text = self.generator(&aliases, &joins).expr_to_string(&expr)?;
        Ok((text, None, None))
    }

    fn render_native_set_operation(
        &self,
        manager: &SetOperationManager,
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        let operator = manager.operator.filter(|_| manager.has_set_operations());
        let members = self.nested();
        for (i, member) in manager.members().enumerate() {
            if i > 0 {
                if let Some(op) = operator {
                    out.space().extend(op.tokens()).space();
                }
            }
            match member {
                QueryBuilder::Select(select) if select.order_by.is_empty() => {
                    members.render_select(select, out)?;
                }
                QueryBuilder::Select(select) => {
                    out.lparen();
                    members.render_select(select, out)?;
                    out.rparen();
                }
                QueryBuilder::SetOperation(nested) => {
                    out.lparen();
                    self.render_native_set_operation(nested, out)?;
                    out.rparen();
                }
            }
            if operator.is_none() {
                break;
            }
        }

        if !manager.order_by.is_empty() {
            out.space().push(Token::OrderBy).space();
            for (i, item) in manager.order_by.iter().enumerate() {
                if i > 0 {
                    out.comma().space();
                }
                out.push(Token::Raw(self.order_by_marker(item)?));
            }
        }
        Ok(())
    }

    // =========================================================================
    // WITH
    // =========================================================================

    fn render_with_clause(&self, ctes: &[Cte], out: &mut TokenStream) -> GenerateResult<()> {
        if ctes.is_empty() {
            return Ok(());
        }
        if !self.provider.supports_with_clause() {
            return Err(self.unsupported("WITH clause is not supported"));
        }

        out.push(Token::With).space();
        if ctes.iter().any(|cte| cte.recursive) {
            out.push(Token::Recursive).space();
        }
        for (i, cte) in ctes.iter().enumerate() {
            if i > 0 {
                out.comma().space();
            }
            self.render_cte(cte, out)?;
        }
        out.space();
        Ok(())
    }

    fn render_cte(&self, cte: &Cte, out: &mut TokenStream) -> GenerateResult<()> {
        cte.validate()?;
        debug!(cte = %cte.entity, recursive = cte.recursive, "rendering CTE");

        out.ident(&cte.entity).lparen();
        for (i, attribute) in cte.attributes.iter().enumerate() {
            if i > 0 {
                out.comma().space();
            }
            out.ident(attribute);
        }
        out.rparen().space().push(Token::As).lparen();

        let body = self.nested();
        match &cte.body {
            CteBody::Query(query) if has_limit_anywhere(query) => {
                return Err(GenerateError::invalid(format!(
                    "CTE '{}' cannot limit its body",
                    cte.entity
                )));
            }
            CteBody::Query(QueryBuilder::Select(select)) => body.render_select(select, out)?,
            CteBody::Query(QueryBuilder::SetOperation(manager)) => {
                let (text, _, _) = body.set_operation_text(manager)?;
                out.push(Token::Raw(text));
            }
            CteBody::Update(update) => body.render_update_into(update, out)?,
            CteBody::DeleteCollection(delete) => body.render_delete_collection_into(delete, out)?,
        }
        out.rparen();
        Ok(())
    }

    // =========================================================================
    // DML
    // =========================================================================

    fn render_update_into(
        &self,
        update: &UpdateQuery,
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        if update.assignments.is_empty() {
            return Err(GenerateError::invalid("UPDATE without assignments"));
        }
        let target = &update.target;
        let g = self.generator(&target.aliases, &target.joins);

        out.push(Token::Update)
            .space()
            .ident(&target.entity)
            .space()
            .ident(&self.declared_alias(&target.alias))
            .space()
            .push(Token::Set)
            .space();
        for (i, (path, value)) in update.assignments.iter().enumerate() {
            if i > 0 {
                out.comma().space();
            }
            g.render_expr(path, out)?;
            out.space().push(Token::Eq).space();
            g.render_expr(value, out)?;
        }

        if let Some(condition) = &update.where_clause {
            out.space().push(Token::Where).space();
            g.render_predicate(condition, out)?;
        }
        self.render_returning(&g, &update.returning, out)
    }

    fn render_delete_into(
        &self,
        target: &DmlTarget,
        collection: Option<&str>,
        where_clause: Option<&crate::expr::Expr>,
        returning: &[String],
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        let g = self.generator(&target.aliases, &target.joins);

        out.push(Token::Delete)
            .space()
            .push(Token::From)
            .space()
            .ident(&target.entity);
        if let Some(collection) = collection {
            out.lparen().ident(collection).rparen();
        }
        out.space().ident(&self.declared_alias(&target.alias));

        if let Some(condition) = where_clause {
            out.space().push(Token::Where).space();
            g.render_predicate(condition, out)?;
        }
        self.render_returning(&g, returning, out)
    }

    fn render_delete_collection_into(
        &self,
        delete: &DeleteCollectionQuery,
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        if !self.provider.supports_collection_dml() {
            return Err(self.unsupported(format!(
                "DELETE on collection '{}' is not supported",
                delete.collection
            )));
        }
        self.render_delete_into(
            &delete.target,
            Some(&delete.collection),
            delete.where_clause.as_ref(),
            &delete.returning,
            out,
        )
    }

    fn render_returning(
        &self,
        g: &QueryGenerator<'_>,
        returning: &[String],
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        if returning.is_empty() {
            return Ok(());
        }
        if !self.provider.supports_returning() {
            return Err(self.unsupported("RETURNING clause is not supported"));
        }
        out.space().push(Token::Returning).space();
        for (i, returned) in returning.iter().enumerate() {
            if i > 0 {
                out.comma().space();
            }
            g.render_expr(&path(returned), out)?;
        }
        Ok(())
    }
}

fn render_order_item(
    g: &QueryGenerator<'_>,
    item: &OrderByItem,
    out: &mut TokenStream,
) -> GenerateResult<()> {
    g.render_expr(&item.expr, out)?;
    out.space().push(match item.dir {
        SortDir::Asc => Token::Asc,
        SortDir::Desc => Token::Desc,
    });
    match item.nulls {
        Some(NullsOrder::First) => {
            out.space().push(Token::NullsFirst);
        }
        Some(NullsOrder::Last) => {
            out.space().push(Token::NullsLast);
        }
        None => {}
    }
    Ok(())
}

fn node_or_err(joins: &JoinGraph, id: JoinNodeId) -> GenerateResult<&crate::join::JoinNode> {
    joins.node(id).ok_or_else(|| {
        GenerateError::UnresolvedReference(format!("join node #{} does not exist", id.0))
    })
}

/// No member at any depth carries a limit of its own.
fn natively_expressible(manager: &SetOperationManager) -> bool {
    !manager.members().any(has_limit_anywhere)
}

/// The query, or any set-operation member below it, carries a limit.
fn has_limit_anywhere(query: &QueryBuilder) -> bool {
    match query {
        QueryBuilder::Select(select) => select.has_limit(),
        QueryBuilder::SetOperation(manager) => {
            manager.has_limit() || manager.members().any(has_limit_anywhere)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::expr::ExprExt;
    use crate::functions::FunctionRegistry;
    use crate::join::RelationKind;

    fn render(dialect: Dialect, query: SelectQuery) -> GenerateResult<RenderedQuery> {
        let functions = FunctionRegistry::new();
        let ctx = RenderContext::new(dialect.provider(), &functions);
        ctx.render_query(&query.into())
    }

    #[test]
    fn test_select_roots_when_no_items() {
        let q = SelectQuery::from_entity("Document", "d").from("Person", "p");
        assert_eq!(
            render(Dialect::Hibernate, q).unwrap().text,
            "SELECT d, p FROM Document d, Person p"
        );
    }

    #[test]
    fn test_no_from_clause() {
        let err = render(Dialect::Hibernate, SelectQuery::new()).unwrap_err();
        assert_eq!(err, GenerateError::invalid("query has no FROM clause"));
    }

    #[test]
    fn test_join_rendering() {
        let mut q = SelectQuery::from_entity("Document", "d");
        let o = q.inner_join("d.owner", "o", RelationKind::Singular).unwrap();
        q.on(o, path("o.active").eq(true)).unwrap();
        q.join_fetch("d.people", "p", RelationKind::Collection).unwrap();

        assert_eq!(
            render(Dialect::EclipseLink, q.clone()).unwrap().text,
            "SELECT d FROM Document d JOIN d.owner o ON o.active = TRUE LEFT JOIN FETCH d.people p"
        );
        assert_eq!(
            render(Dialect::Hibernate, q).unwrap().text,
            "SELECT d FROM Document d JOIN d.owner o WITH o.active = true LEFT JOIN FETCH d.people p"
        );
    }

    #[test]
    fn test_entity_join_requires_capability() {
        let mut q = SelectQuery::from_entity("Document", "d");
        q.join_entity("d", "Person", "p", JoinType::Left, path("p.id").eq(path("d.ownerId")))
            .unwrap();
        let err = render(Dialect::OpenJpa, q).unwrap_err();
        assert!(matches!(err, GenerateError::UnsupportedShape { .. }));
    }

    #[test]
    fn test_cross_join() {
        let mut q = SelectQuery::from_entity("Document", "d");
        q.cross_join("d", "Person", "p").unwrap();
        let q = q.filter(path("p.id").eq(path("d.ownerId")));
        assert_eq!(
            render(Dialect::OpenJpa, q).unwrap().text,
            "SELECT d FROM Document d, Person p WHERE p.id = d.ownerId"
        );
    }

    #[test]
    fn test_cross_join_with_condition() {
        let mut q = SelectQuery::from_entity("Document", "d");
        q.join_entity("d", "Person", "p", JoinType::Cross, path("p.id").eq(1))
            .unwrap();
        assert!(matches!(
            render(Dialect::Hibernate, q).unwrap_err(),
            GenerateError::InvalidQueryShape(_)
        ));
    }

    #[test]
    fn test_limits_are_reported() {
        let q = SelectQuery::from_entity("Document", "d").limit(10).offset(20);
        let rendered = render(Dialect::Hibernate, q).unwrap();
        assert_eq!(rendered.text, "SELECT d FROM Document d");
        assert_eq!(rendered.max_results, Some(10));
        assert_eq!(rendered.first_result, Some(20));
    }

    #[test]
    fn test_natively_expressible() {
        let a = QueryBuilder::from(SelectQuery::from_entity("A", "a"));
        let b = SelectQuery::from_entity("B", "b");
        let QueryBuilder::SetOperation(plain) = a.clone().union(b.clone()) else {
            panic!("expected set operation");
        };
        assert!(natively_expressible(&plain));

        let QueryBuilder::SetOperation(limited) = a.union(b.limit(1)) else {
            panic!("expected set operation");
        };
        assert!(!natively_expressible(&limited));
    }
}
