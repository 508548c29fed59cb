//! Query generator - renders expression trees into dialect-correct text.
//!
//! A [`RenderContext`] fixes the target dialect, the registered functions and
//! the per-render options. For each query level it hands out a
//! [`QueryGenerator`] bound to that level's alias namespace and join graph.
//! Generators write into an explicit `&mut TokenStream`; they never mutate
//! the trees they render, so rendering the same tree twice yields the same
//! text.

mod set_ops;
mod statement;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::alias::{AliasInfo, AliasManager};
use crate::dialect::CapabilityProvider;
use crate::error::{GenerateError, GenerateResult};
use crate::expr::{
    AggregateExpr, BinaryOperator, CaseExpr, Expr, FunctionExpr, Literal, ParameterExpr, PathExpr,
};
use crate::functions::FunctionRegistry;
use crate::join::{JoinGraph, JoinNodeId};
use crate::query::QueryBuilder;
use crate::token::{Token, TokenStream};

/// Per-render switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorOptions {
    /// Replace unqualified references to a select alias bound to a path by
    /// the path itself.
    pub resolve_select_aliases: bool,
    /// Prepended to every join alias of the outermost query level, both
    /// where it is declared and where it is referenced.
    pub alias_prefix: Option<String>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            resolve_select_aliases: true,
            alias_prefix: None,
        }
    }
}

/// Dialect, registered functions and options for one render.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    provider: &'a dyn CapabilityProvider,
    functions: &'a FunctionRegistry,
    options: GeneratorOptions,
    outer: Option<OuterScope>,
}

/// Join aliases of an enclosing level that renders with an alias prefix.
#[derive(Debug, Clone)]
struct OuterScope {
    prefix: String,
    aliases: Vec<String>,
}

impl<'a> RenderContext<'a> {
    pub fn new(provider: &'a dyn CapabilityProvider, functions: &'a FunctionRegistry) -> Self {
        Self {
            provider,
            functions,
            options: GeneratorOptions::default(),
            outer: None,
        }
    }

    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn provider(&self) -> &'a dyn CapabilityProvider {
        self.provider
    }

    pub fn functions(&self) -> &'a FunctionRegistry {
        self.functions
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Context for an embedded query level. The alias prefix belongs to the
    /// outer level only.
    pub(crate) fn nested(&self) -> RenderContext<'a> {
        RenderContext {
            provider: self.provider,
            functions: self.functions,
            options: GeneratorOptions {
                alias_prefix: None,
                ..self.options.clone()
            },
            outer: self.outer.clone(),
        }
    }

    /// Context for a subquery of the level owning `aliases`. References the
    /// subquery makes to that level's join aliases keep its prefix.
    pub(crate) fn correlated(&self, aliases: &AliasManager) -> RenderContext<'a> {
        let mut ctx = self.nested();
        if let Some(prefix) = &self.options.alias_prefix {
            ctx.outer = Some(OuterScope {
                prefix: prefix.clone(),
                aliases: aliases
                    .iter()
                    .filter(|info| matches!(info, AliasInfo::Join { .. }))
                    .map(|info| info.alias().to_string())
                    .collect(),
            });
        }
        ctx
    }

    /// Alias as declared in FROM, JOIN or a DML target.
    pub(crate) fn declared_alias(&self, alias: &str) -> String {
        match &self.options.alias_prefix {
            Some(prefix) => format!("{}{}", prefix, alias),
            None => alias.to_string(),
        }
    }

    /// Prefix of the enclosing level when `path` starts at one of its aliases.
    pub(crate) fn outer_prefix(&self, path: &str) -> Option<&str> {
        let head = path.split('.').next()?;
        self.outer
            .as_ref()
            .filter(|outer| outer.aliases.iter().any(|alias| alias == head))
            .map(|outer| outer.prefix.as_str())
    }

    /// A generator for one query level.
    pub fn generator<'q>(
        &'q self,
        aliases: &'q AliasManager,
        joins: &'q JoinGraph,
    ) -> QueryGenerator<'q> {
        QueryGenerator {
            ctx: self,
            aliases,
            joins,
        }
    }

    pub(crate) fn unsupported(&self, message: impl Into<String>) -> GenerateError {
        GenerateError::unsupported(self.provider.name(), message)
    }
}

/// Renders expressions of one query level.
#[derive(Debug, Clone, Copy)]
pub struct QueryGenerator<'q> {
    ctx: &'q RenderContext<'q>,
    aliases: &'q AliasManager,
    joins: &'q JoinGraph,
}

impl<'q> QueryGenerator<'q> {
    /// Render an expression in value position.
    pub fn render_expr(&self, expr: &Expr, out: &mut TokenStream) -> GenerateResult<()> {
        self.visit(expr, false, out)
    }

    /// Render an expression in predicate position (WHERE, ON, HAVING).
    pub fn render_predicate(&self, expr: &Expr, out: &mut TokenStream) -> GenerateResult<()> {
        self.visit(expr, true, out)
    }

    /// Render an expression in value position to text.
    pub fn expr_to_string(&self, expr: &Expr) -> GenerateResult<String> {
        let mut out = TokenStream::new();
        self.render_expr(expr, &mut out)?;
        Ok(out.serialize(self.ctx.provider))
    }

    fn visit(&self, expr: &Expr, predicate: bool, out: &mut TokenStream) -> GenerateResult<()> {
        match expr {
            Expr::Path(p) => self.render_path(p, out, &mut Vec::new()),
            Expr::Literal(lit) => self.render_literal(lit, predicate, out),
            Expr::Parameter(p) => self.render_parameter(p, out),
            Expr::Function(f) => self.render_function(f, predicate, out),
            Expr::Aggregate(a) => self.render_aggregate(a, out),
            Expr::Subquery(q) => self.render_subquery(q, out),
            Expr::Array(_) => {
                // Placeholder consumed by the join that declared it.
                Ok(())
            }
            Expr::Null => {
                out.push(Token::NullValue);
                Ok(())
            }
            Expr::Case(c) => self.render_case(c, out),
            Expr::Binary { left, op, right } => self.render_binary(left, *op, right, out),
            Expr::Not(inner) => {
                out.push(Token::Not).space();
                self.render_operand(inner, true, precedence(BinaryOperator::And) + 1, out)
            }
            Expr::IsNull { expr, negated } => {
                self.render_expr(expr, out)?;
                out.space().push(Token::NullComparison { negated: *negated });
                Ok(())
            }
            Expr::Like {
                expr,
                pattern,
                escape,
                negated,
            } => {
                self.render_expr(expr, out)?;
                out.space();
                if *negated {
                    out.push(Token::Not).space();
                }
                out.push(Token::Like).space();
                self.render_expr(pattern, out)?;
                if let Some(c) = escape {
                    out.space().push(Token::Escape).space().push(Token::EscapeChar(*c));
                }
                Ok(())
            }
            Expr::In {
                expr,
                values,
                negated,
            } => self.render_in(expr, values, *negated, out),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                self.render_expr(expr, out)?;
                out.space();
                if *negated {
                    out.push(Token::Not).space();
                }
                out.push(Token::Between).space();
                self.render_expr(low, out)?;
                out.space().push(Token::And).space();
                self.render_expr(high, out)
            }
            Expr::Paren(inner) => {
                out.lparen();
                self.visit(inner, predicate, out)?;
                out.rparen();
                Ok(())
            }
            Expr::Verbatim(text) => {
                out.push(Token::Raw(text.clone()));
                Ok(())
            }
        }
    }

    // =========================================================================
    // Paths
    // =========================================================================

    fn render_path(
        &self,
        path: &PathExpr,
        out: &mut TokenStream,
        inlining: &mut Vec<String>,
    ) -> GenerateResult<()> {
        if let Some(node) = path.base {
            return self.render_bound_path(node, path.field.as_deref(), path, out);
        }

        let head = path.elements.first().map(String::as_str).unwrap_or_default();
        match self.aliases.resolve(head) {
            Some(AliasInfo::Select {
                expr: Expr::Path(target),
                ..
            }) if path.is_single_element() && self.ctx.options.resolve_select_aliases => {
                if inlining.iter().any(|a| a == head) {
                    trace!(alias = head, "select alias refers back to itself");
                    out.ident(head);
                    return Ok(());
                }
                trace!(alias = head, "inlining select alias");
                inlining.push(head.to_string());
                let result = self.render_path(target, out, inlining);
                inlining.pop();
                result
            }
            Some(AliasInfo::Join { node, .. }) => {
                let field = path
                    .elements
                    .get(1..)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| rest.join("."));
                self.render_bound_path(*node, field.as_deref(), path, out)
            }
            resolved => {
                if resolved.is_none() {
                    if let Some(prefix) = self.ctx.outer_prefix(head) {
                        out.push(Token::Raw(prefix.to_string()));
                    }
                }
                out.ident(&path.path());
                Ok(())
            }
        }
    }

    fn render_bound_path(
        &self,
        node: JoinNodeId,
        field: Option<&str>,
        path: &PathExpr,
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        let join = self.joins.node(node).ok_or_else(|| {
            GenerateError::UnresolvedReference(format!(
                "path '{}' is bound to unknown join node #{}",
                path.path(),
                node.0
            ))
        })?;

        let value_function = self
            .ctx
            .provider
            .collection_value_function()
            .filter(|_| self.needs_value_function(node, path));

        if let Some(function) = value_function {
            trace!(alias = %join.alias, function, "unwrapping map value");
            out.push(Token::FunctionName(function.to_string())).lparen();
        }
        if let Some(prefix) = &self.ctx.options.alias_prefix {
            out.push(Token::Raw(prefix.clone()));
        }
        out.ident(&join.alias);
        if value_function.is_some() {
            out.rparen();
        }
        if let Some(field) = field {
            out.dot().ident(field);
        }
        Ok(())
    }

    /// The node is the value side of a map and the path is not already the
    /// argument of a collection function.
    fn needs_value_function(&self, node: JoinNodeId, path: &PathExpr) -> bool {
        self.joins.is_map_value(node)
            && !path.collection_key_path
            && !path.used_in_collection_function
    }

    // =========================================================================
    // Literals and Parameters
    // =========================================================================

    fn render_literal(
        &self,
        lit: &Literal,
        predicate: bool,
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        match lit {
            Literal::Int(n) => {
                out.push(Token::LitInt(*n));
            }
            Literal::Float(f) => {
                if !f.is_finite() {
                    return Err(GenerateError::invalid(format!(
                        "non-finite float literal {}",
                        f
                    )));
                }
                out.push(Token::LitFloat(*f));
            }
            Literal::String(s) => {
                out.push(Token::LitString(s.clone()));
            }
            Literal::Bool(b) if predicate => {
                out.push(Token::BoolCondition(*b));
            }
            Literal::Bool(b) => {
                out.push(Token::LitBool(*b));
            }
        }
        Ok(())
    }

    fn render_parameter(&self, param: &ParameterExpr, out: &mut TokenStream) -> GenerateResult<()> {
        let name = param.name.as_deref().ok_or_else(|| {
            GenerateError::UnresolvedReference("parameter has no name".into())
        })?;
        let brackets = self.ctx.provider.needs_brackets_for_list_parameter()
            && param.value.as_ref().is_some_and(|v| v.is_multi_valued());

        if brackets {
            out.lparen();
        }
        out.push(Token::Parameter(name.to_string()));
        if brackets {
            out.rparen();
        }
        Ok(())
    }

    // =========================================================================
    // Functions
    // =========================================================================

    fn render_function(
        &self,
        func: &FunctionExpr,
        predicate: bool,
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        if func.is_outer_function() {
            return self.visit(&func.args[0], predicate, out);
        }
        if let Some(name) = func.function_function_name() {
            return self.render_function_function(name, &func.args, out);
        }

        out.push(Token::FunctionName(func.name.clone())).lparen();
        self.render_list(&func.args, out)?;
        out.rparen();
        Ok(())
    }

    fn render_aggregate(&self, agg: &AggregateExpr, out: &mut TokenStream) -> GenerateResult<()> {
        if agg.is_count_star() {
            return self.render_count_star(out);
        }
        out.push(Token::FunctionName(agg.name.to_uppercase())).lparen();
        if agg.distinct {
            out.push(Token::Distinct).space();
        }
        self.render_list(&agg.args, out)?;
        out.rparen();
        Ok(())
    }

    fn render_count_star(&self, out: &mut TokenStream) -> GenerateResult<()> {
        if self.ctx.provider.supports_count_star() {
            out.push(Token::FunctionName("COUNT".into()))
                .lparen()
                .push(Token::Star)
                .rparen();
            Ok(())
        } else {
            self.render_function_function("COUNT_STAR", &[], out)
        }
    }

    /// Render a function through the registered invocation or the generic
    /// `FUNCTION('name', ...)` form.
    ///
    /// `args[0]` is the function-name marker and is never rendered.
    pub(crate) fn render_function_function(
        &self,
        name: &str,
        args: &[Expr],
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        let rest = args.get(1..).unwrap_or_default();
        if self.ctx.functions.contains(name) {
            out.push(Token::Raw(
                self.ctx.provider.custom_function_invocation(name, args.len()),
            ));
            for (i, arg) in rest.iter().enumerate() {
                if i > 0 {
                    out.comma();
                }
                self.render_expr(arg, out)?;
            }
            out.rparen();
        } else if self.ctx.provider.supports_generic_function_syntax() {
            out.push(Token::FunctionName("FUNCTION".into()))
                .lparen()
                .push(Token::LitString(name.to_string()));
            for arg in rest {
                out.comma();
                self.render_expr(arg, out)?;
            }
            out.rparen();
        } else {
            return Err(self
                .ctx
                .unsupported(format!("Unknown function [{}] is used!", name)));
        }
        Ok(())
    }

    fn render_list(&self, items: &[Expr], out: &mut TokenStream) -> GenerateResult<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.comma().space();
            }
            self.render_expr(item, out)?;
        }
        Ok(())
    }

    // =========================================================================
    // Subqueries
    // =========================================================================

    fn render_subquery(&self, query: &QueryBuilder, out: &mut TokenStream) -> GenerateResult<()> {
        let ctx = self.ctx.correlated(self.aliases);
        out.lparen();
        match query {
            QueryBuilder::Select(select) if !select.has_limit() => {
                let text = ctx.select_text(select)?;
                out.push(Token::Raw(text));
            }
            // Limits and set operations only exist in function form.
            _ => {
                let expr = ctx.as_expression(query)?;
                self.render_expr(&expr, out)?;
            }
        }
        out.rparen();
        Ok(())
    }

    // =========================================================================
    // Predicates and Operators
    // =========================================================================

    fn render_case(&self, case: &CaseExpr, out: &mut TokenStream) -> GenerateResult<()> {
        out.push(Token::Case);
        if let Some(operand) = &case.operand {
            out.space();
            self.render_expr(operand, out)?;
        }
        for (when, then) in &case.when_clauses {
            out.space().push(Token::When).space();
            self.visit(when, case.operand.is_none(), out)?;
            out.space().push(Token::Then).space();
            self.render_expr(then, out)?;
        }
        if let Some(else_clause) = &case.else_clause {
            out.space().push(Token::Else).space();
            self.render_expr(else_clause, out)?;
        }
        out.space().push(Token::End);
        Ok(())
    }

    fn render_binary(
        &self,
        left: &Expr,
        op: BinaryOperator,
        right: &Expr,
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        let logical = op.is_logical();
        let prec = precedence(op);
        self.render_operand(left, logical, prec, out)?;
        out.space().push(operator_token(op)).space();
        // Right operands of equal precedence keep their grouping.
        self.render_operand(right, logical, prec + 1, out)
    }

    /// Render an operand, parenthesizing binary operations that bind looser
    /// than `min_precedence`.
    fn render_operand(
        &self,
        expr: &Expr,
        predicate: bool,
        min_precedence: u8,
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        match expr {
            Expr::Binary { op, .. } if precedence(*op) < min_precedence => {
                out.lparen();
                self.visit(expr, predicate, out)?;
                out.rparen();
                Ok(())
            }
            _ => self.visit(expr, predicate, out),
        }
    }

    fn render_in(
        &self,
        expr: &Expr,
        values: &[Expr],
        negated: bool,
        out: &mut TokenStream,
    ) -> GenerateResult<()> {
        if values.is_empty() {
            // Nothing is IN an empty list.
            out.push(Token::BoolCondition(negated));
            return Ok(());
        }

        self.render_expr(expr, out)?;
        out.space();
        if negated {
            out.push(Token::Not).space();
        }
        out.push(Token::In).space();
        match values {
            [single @ (Expr::Parameter(_) | Expr::Subquery(_))] => self.render_expr(single, out),
            _ => {
                out.lparen();
                self.render_list(values, out)?;
                out.rparen();
                Ok(())
            }
        }
    }
}

fn precedence(op: BinaryOperator) -> u8 {
    match op {
        BinaryOperator::Or => 1,
        BinaryOperator::And => 2,
        BinaryOperator::Eq
        | BinaryOperator::Ne
        | BinaryOperator::Lt
        | BinaryOperator::Gt
        | BinaryOperator::Lte
        | BinaryOperator::Gte => 3,
        BinaryOperator::Plus | BinaryOperator::Minus => 4,
        BinaryOperator::Mul | BinaryOperator::Div => 5,
    }
}

fn operator_token(op: BinaryOperator) -> Token {
    match op {
        BinaryOperator::Eq => Token::Eq,
        BinaryOperator::Ne => Token::Ne,
        BinaryOperator::Lt => Token::Lt,
        BinaryOperator::Gt => Token::Gt,
        BinaryOperator::Lte => Token::Lte,
        BinaryOperator::Gte => Token::Gte,
        BinaryOperator::And => Token::And,
        BinaryOperator::Or => Token::Or,
        BinaryOperator::Plus => Token::Plus,
        BinaryOperator::Minus => Token::Minus,
        BinaryOperator::Mul => Token::Mul,
        BinaryOperator::Div => Token::Div,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::expr::{
        count_star, func, function_function, key, lit_bool, lit_str, null, outer, param, param_list,
        path, ExprExt, ParameterValue,
    };
    use crate::join::RelationKind;
    use crate::query::SelectQuery;

    fn document_query() -> SelectQuery {
        let mut q = SelectQuery::from_entity("Document", "d");
        q.left_join("d.localized", "l", RelationKind::Map).unwrap();
        q.left_join("d.owner", "o", RelationKind::Singular).unwrap();
        q
    }

    fn render(
        dialect: Dialect,
        functions: &FunctionRegistry,
        q: &SelectQuery,
        expr: &Expr,
    ) -> GenerateResult<String> {
        let ctx = RenderContext::new(dialect.provider(), functions);
        ctx.generator(&q.aliases, &q.joins).expr_to_string(expr)
    }

    fn render_default_query(dialect: Dialect, q: &SelectQuery, expr: &Expr) -> String {
        render(dialect, &FunctionRegistry::new(), q, expr).unwrap()
    }

    fn render_default(dialect: Dialect, expr: &Expr) -> String {
        render(dialect, &FunctionRegistry::new(), &document_query(), expr).unwrap()
    }

    #[test]
    fn test_map_alias_unwrapped() {
        assert_eq!(render_default(Dialect::EclipseLink, &path("l")), "VALUE(l)");
        assert_eq!(render_default(Dialect::Hibernate, &path("l")), "l");
    }

    #[test]
    fn test_map_field_unwrapped() {
        assert_eq!(render_default(Dialect::DataNucleus, &path("l.name")), "VALUE(l).name");
        assert_eq!(render_default(Dialect::DataNucleus, &path("o.name")), "o.name");
    }

    #[test]
    fn test_collection_function_argument_not_unwrapped() {
        assert_eq!(render_default(Dialect::EclipseLink, &key(path("l"))), "KEY(l)");
    }

    #[test]
    fn test_alias_prefix() {
        let q = document_query();
        let functions = FunctionRegistry::new();
        let ctx = RenderContext::new(Dialect::EclipseLink.provider(), &functions).with_options(
            GeneratorOptions {
                alias_prefix: Some("outer_".into()),
                ..Default::default()
            },
        );
        let text = ctx
            .generator(&q.aliases, &q.joins)
            .expr_to_string(&path("l.name"))
            .unwrap();
        assert_eq!(text, "VALUE(outer_l).name");
    }

    #[test]
    fn test_empty_path_does_not_panic() {
        let mut q = document_query();
        q.aliases.register_join("", JoinNodeId(0), false);
        let empty = Expr::Path(PathExpr::default());
        assert_eq!(render_default_query(Dialect::Hibernate, &q, &empty), "d");
    }

    #[test]
    fn test_unknown_path_rendered_textually() {
        assert_eq!(render_default(Dialect::Hibernate, &path("x.y")), "x.y");
    }

    #[test]
    fn test_boolean_literal_context() {
        let expr = lit_bool(true).and(path("d.archived").eq(lit_bool(false)));
        let q = document_query();
        let functions = FunctionRegistry::new();
        let ctx = RenderContext::new(Dialect::Hibernate.provider(), &functions);
        let mut out = TokenStream::new();
        ctx.generator(&q.aliases, &q.joins)
            .render_predicate(&expr, &mut out)
            .unwrap();
        assert_eq!(out.serialize(&Dialect::Hibernate), "1 = 1 AND d.archived = false");
    }

    #[test]
    fn test_null_rendering() {
        assert_eq!(render_default(Dialect::Hibernate, &null()), "NULLIF(1,1)");
        assert_eq!(render_default(Dialect::OpenJpa, &null()), "NULL");
        assert_eq!(
            render_default(Dialect::OpenJpa, &path("d.name").is_not_null()),
            "d.name IS NOT NULL"
        );
    }

    #[test]
    fn test_outer_function_renders_argument() {
        assert_eq!(render_default(Dialect::Hibernate, &outer(path("d.id"))), "d.id");
    }

    #[test]
    fn test_function_function_fallback() {
        let expr = function_function("ADD_DAYS", vec![path("d.created"), 1.into()]);
        assert_eq!(
            render_default(Dialect::Hibernate, &expr),
            "FUNCTION('ADD_DAYS',d.created,1)"
        );

        let err = render(Dialect::OpenJpa, &FunctionRegistry::new(), &document_query(), &expr)
            .unwrap_err();
        assert_eq!(
            err,
            GenerateError::unsupported("openjpa", "Unknown function [ADD_DAYS] is used!")
        );
    }

    #[test]
    fn test_registered_function_invocation() {
        let functions: FunctionRegistry = ["add_days"].into_iter().collect();
        let expr = function_function("ADD_DAYS", vec![path("d.created"), 1.into()]);
        let q = document_query();
        assert_eq!(
            render(Dialect::OpenJpa, &functions, &q, &expr).unwrap(),
            "ADD_DAYS(d.created,1)"
        );
        assert_eq!(
            render(Dialect::EclipseLink, &functions, &q, &expr).unwrap(),
            "OPERATOR('ADD_DAYS',d.created,1)"
        );
    }

    #[test]
    fn test_count_star() {
        assert_eq!(render_default(Dialect::Hibernate, &count_star()), "COUNT(*)");
        assert_eq!(
            render_default(Dialect::DataNucleus, &count_star()),
            "FUNCTION('COUNT_STAR')"
        );
        let q = document_query();
        assert_eq!(
            render(Dialect::EclipseLink, &FunctionRegistry::with_builtins(), &q, &count_star())
                .unwrap(),
            "OPERATOR('COUNT_STAR')"
        );
    }

    #[test]
    fn test_unnamed_parameter() {
        let expr = Expr::Parameter(ParameterExpr::default());
        let err = render(Dialect::Hibernate, &FunctionRegistry::new(), &document_query(), &expr)
            .unwrap_err();
        assert!(matches!(err, GenerateError::UnresolvedReference(_)));
    }

    #[test]
    fn test_list_parameter_brackets() {
        let many = param_list("ids", vec![Literal::Int(1), Literal::Int(2)]);
        let one = param_list("ids", vec![Literal::Int(1)]);
        let scalar = Expr::Parameter(ParameterExpr {
            name: Some("id".into()),
            value: Some(ParameterValue::Scalar(Literal::Int(1))),
        });

        assert_eq!(render_default(Dialect::Hibernate, &many), "(:ids)");
        assert_eq!(render_default(Dialect::Hibernate, &one), ":ids");
        assert_eq!(render_default(Dialect::Hibernate, &scalar), ":id");
        assert_eq!(render_default(Dialect::EclipseLink, &many), ":ids");
        assert_eq!(
            render_default(Dialect::Hibernate, &path("d.id").in_list(vec![many])),
            "d.id IN (:ids)"
        );
    }

    #[test]
    fn test_in_list() {
        assert_eq!(
            render_default(Dialect::Hibernate, &path("d.age").in_list(vec![1.into(), 2.into()])),
            "d.age IN (1, 2)"
        );
        assert_eq!(
            render_default(Dialect::Hibernate, &path("d.age").not_in_list(vec![param("ages")])),
            "d.age NOT IN :ages"
        );
        assert_eq!(
            render_default(Dialect::EclipseLink, &path("d.age").in_list(vec![])),
            "FALSE"
        );
    }

    #[test]
    fn test_precedence_parentheses() {
        let expr = path("d.a")
            .eq(1)
            .or(path("d.b").eq(2))
            .and(path("d.c").eq(3));
        assert_eq!(
            render_default(Dialect::Hibernate, &expr),
            "(d.a = 1 OR d.b = 2) AND d.c = 3"
        );

        let arithmetic = path("d.a").sub(path("d.b").sub(1));
        assert_eq!(render_default(Dialect::Hibernate, &arithmetic), "d.a - (d.b - 1)");
    }

    #[test]
    fn test_like_escape() {
        let expr = path("d.name").like_escape("100\\%", '\\');
        assert_eq!(
            render_default(Dialect::EclipseLink, &expr),
            "d.name LIKE '100\\%' ESCAPE '\\\\'"
        );
        assert_eq!(
            render_default(Dialect::Hibernate, &expr),
            "d.name LIKE '100\\%' ESCAPE '\\'"
        );
    }

    #[test]
    fn test_case_when() {
        let expr = crate::expr::case_when(
            vec![(path("d.age").gt(18), lit_str("adult"))],
            Some(lit_str("minor")),
        );
        assert_eq!(
            render_default(Dialect::Hibernate, &expr),
            "CASE WHEN d.age > 18 THEN 'adult' ELSE 'minor' END"
        );
    }

    #[test]
    fn test_function_and_aggregate() {
        let expr = func("CONCAT", vec![path("d.name"), lit_str("!")]);
        assert_eq!(render_default(Dialect::Hibernate, &expr), "CONCAT(d.name, '!')");
        assert_eq!(
            render_default(Dialect::Hibernate, &crate::expr::count_distinct(path("d.id"))),
            "COUNT(DISTINCT d.id)"
        );
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let err = render(
            Dialect::Hibernate,
            &FunctionRegistry::new(),
            &document_query(),
            &Expr::Literal(Literal::Float(f64::NAN)),
        )
        .unwrap_err();
        assert!(matches!(err, GenerateError::InvalidQueryShape(_)));
    }

    #[test]
    fn test_array_is_noop() {
        assert_eq!(
            render_default(Dialect::Hibernate, &crate::expr::array("d.contacts", 1.into())),
            ""
        );
    }
}
