//! Expression AST - the trees the builder layer hands to the generator.
//!
//! A closed enum with exhaustive pattern matching enforced by the compiler.
//! Paths refer to join nodes through [`JoinNodeId`] handles rather than
//! owning references, so a tree can be copied into another query by
//! remapping its handles (see [`Expr::remap`]).

use serde::{Deserialize, Serialize};

use crate::join::{CopyContext, JoinNodeId};
use crate::query::QueryBuilder;

// =============================================================================
// Expression AST
// =============================================================================

/// A query expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Attribute path, optionally bound to a join node.
    Path(PathExpr),

    /// Literal values
    Literal(Literal),

    /// Named parameter `:name`
    Parameter(ParameterExpr),

    /// Function call: name(args...)
    Function(FunctionExpr),

    /// Aggregate call: COUNT/SUM/AVG/MIN/MAX(...)
    Aggregate(AggregateExpr),

    /// Subquery, rendered parenthesized.
    Subquery(Box<QueryBuilder>),

    /// Indexed access `base[index]`; only a placeholder consumed by the
    /// builder when it creates the corresponding join.
    Array(ArrayExpr),

    /// NULL used as a value.
    Null,

    /// CASE [operand] WHEN ... THEN ... ELSE ... END
    Case(CaseExpr),

    /// Binary operation: left op right
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// NOT expr
    Not(Box<Expr>),

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// expr LIKE pattern [ESCAPE c]
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<char>,
        negated: bool,
    },

    /// IN: expr IN (values...) or expr IN :param
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// BETWEEN: expr BETWEEN low AND high
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },

    /// Parenthesized expression
    Paren(Box<Expr>),

    /// Text the generator produced itself (materialized subqueries and
    /// query-expression forms). Rendered verbatim.
    Verbatim(String),
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
    // Arithmetic
    Plus,
    Minus,
    Mul,
    Div,
}

impl BinaryOperator {
    /// Whether both operands are predicates.
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

/// An attribute path such as `p.name` or `l`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PathExpr {
    /// The path as written, split on `.`.
    pub elements: Vec<String>,
    /// Join node the path resolves against, once resolved.
    pub base: Option<JoinNodeId>,
    /// Attribute dereferenced on the base node; `None` denotes the node itself.
    pub field: Option<String>,
    /// Set when the path is the argument of KEY/VALUE/ENTRY/INDEX/SIZE.
    pub used_in_collection_function: bool,
    /// Set when the path denotes the key side of a map.
    pub collection_key_path: bool,
}

impl PathExpr {
    /// An unbound path, resolved by name at render time.
    pub fn unbound(path: &str) -> Self {
        Self {
            elements: path.split('.').map(String::from).collect(),
            ..Default::default()
        }
    }

    /// A path bound to a join node.
    pub fn bound(node: JoinNodeId, alias: &str, field: Option<&str>) -> Self {
        let mut elements = vec![alias.to_string()];
        if let Some(f) = field {
            elements.extend(f.split('.').map(String::from));
        }
        Self {
            elements,
            base: Some(node),
            field: field.map(String::from),
            ..Default::default()
        }
    }

    /// The path text as written.
    pub fn path(&self) -> String {
        self.elements.join(".")
    }

    pub fn is_single_element(&self) -> bool {
        self.elements.len() == 1
    }
}

/// A named parameter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterExpr {
    pub name: Option<String>,
    /// The bound value, if known at render time.
    pub value: Option<ParameterValue>,
}

/// Value bound to a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Scalar(Literal),
    List(Vec<Literal>),
}

impl ParameterValue {
    /// Whether this is a sequence of more than one element.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, ParameterValue::List(items) if items.len() > 1)
    }
}

/// Function call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExpr {
    pub name: String,
    pub args: Vec<Expr>,
}

/// Name of the generic function-call encoding.
pub const FUNCTION_FUNCTION: &str = "FUNCTION";

impl FunctionExpr {
    /// `FUNCTION('name', args...)`: the first argument names the function.
    pub fn is_function_function(&self) -> bool {
        self.name.eq_ignore_ascii_case(FUNCTION_FUNCTION)
            && matches!(self.args.first(), Some(Expr::Literal(Literal::String(_))))
    }

    /// Name carried by the first argument of a `FUNCTION(...)` call.
    pub fn function_function_name(&self) -> Option<&str> {
        match self.args.first() {
            Some(Expr::Literal(Literal::String(name))) if self.is_function_function() => {
                Some(name)
            }
            _ => None,
        }
    }

    /// `OUTER(expr)` marks a reference to the enclosing query.
    pub fn is_outer_function(&self) -> bool {
        self.name.eq_ignore_ascii_case("OUTER") && self.args.len() == 1
    }

    pub fn is_size_function(&self) -> bool {
        self.name.eq_ignore_ascii_case("SIZE")
    }
}

/// Aggregate function call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateExpr {
    pub name: String,
    pub args: Vec<Expr>,
    pub distinct: bool,
}

impl AggregateExpr {
    /// `COUNT` with no arguments stands for `COUNT(*)`.
    pub fn is_count_star(&self) -> bool {
        self.args.is_empty() && self.name.eq_ignore_ascii_case("COUNT")
    }
}

/// Indexed access into a list or map attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayExpr {
    pub base: PathExpr,
    pub index: Box<Expr>,
}

/// CASE expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseExpr {
    pub operand: Option<Box<Expr>>,
    pub when_clauses: Vec<(Expr, Expr)>,
    pub else_clause: Option<Box<Expr>>,
}

// =============================================================================
// Traversal
// =============================================================================

impl Expr {
    /// Direct child expressions, in rendering order.
    ///
    /// Subqueries are opaque: their trees belong to another query level.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Path(_)
            | Expr::Literal(_)
            | Expr::Parameter(_)
            | Expr::Subquery(_)
            | Expr::Null
            | Expr::Verbatim(_) => vec![],
            Expr::Function(f) => f.args.iter().collect(),
            Expr::Aggregate(a) => a.args.iter().collect(),
            Expr::Array(a) => vec![a.index.as_ref()],
            Expr::Case(c) => {
                let mut out = Vec::new();
                if let Some(op) = &c.operand {
                    out.push(op.as_ref());
                }
                for (when, then) in &c.when_clauses {
                    out.push(when);
                    out.push(then);
                }
                if let Some(e) = &c.else_clause {
                    out.push(e.as_ref());
                }
                out
            }
            Expr::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::Not(e) | Expr::Paren(e) => vec![e.as_ref()],
            Expr::IsNull { expr, .. } => vec![expr.as_ref()],
            Expr::Like { expr, pattern, .. } => vec![expr.as_ref(), pattern.as_ref()],
            Expr::In { expr, values, .. } => {
                let mut out = vec![expr.as_ref()];
                out.extend(values.iter());
                out
            }
            Expr::Between {
                expr, low, high, ..
            } => vec![expr.as_ref(), low.as_ref(), high.as_ref()],
        }
    }

    /// Mutable counterpart of [`Expr::children`].
    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Expr::Path(_)
            | Expr::Literal(_)
            | Expr::Parameter(_)
            | Expr::Subquery(_)
            | Expr::Null
            | Expr::Verbatim(_) => vec![],
            Expr::Function(f) => f.args.iter_mut().collect(),
            Expr::Aggregate(a) => a.args.iter_mut().collect(),
            Expr::Array(a) => vec![a.index.as_mut()],
            Expr::Case(c) => {
                let mut out = Vec::new();
                if let Some(op) = &mut c.operand {
                    out.push(op.as_mut());
                }
                for (when, then) in &mut c.when_clauses {
                    out.push(when);
                    out.push(then);
                }
                if let Some(e) = &mut c.else_clause {
                    out.push(e.as_mut());
                }
                out
            }
            Expr::Binary { left, right, .. } => vec![left.as_mut(), right.as_mut()],
            Expr::Not(e) | Expr::Paren(e) => vec![e.as_mut()],
            Expr::IsNull { expr, .. } => vec![expr.as_mut()],
            Expr::Like { expr, pattern, .. } => vec![expr.as_mut(), pattern.as_mut()],
            Expr::In { expr, values, .. } => {
                let mut out = vec![expr.as_mut()];
                out.extend(values.iter_mut());
                out
            }
            Expr::Between {
                expr, low, high, ..
            } => vec![expr.as_mut(), low.as_mut(), high.as_mut()],
        }
    }

    /// Rebind every path handle through a copy context.
    ///
    /// Handles the context does not know are left untouched; they belong to
    /// an enclosing query level.
    pub fn remap(&mut self, ctx: &CopyContext) {
        match self {
            Expr::Path(p) => remap_path(p, ctx),
            Expr::Array(a) => {
                remap_path(&mut a.base, ctx);
                a.index.remap(ctx);
            }
            _ => {
                for child in self.children_mut() {
                    child.remap(ctx);
                }
            }
        }
    }

    /// Collect parameter names in first-occurrence order, including those
    /// of subqueries.
    pub fn collect_parameters(&self, out: &mut Vec<String>) {
        match self {
            Expr::Parameter(ParameterExpr {
                name: Some(name), ..
            }) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Expr::Subquery(query) => query.collect_parameters(out),
            _ => {
                for child in self.children() {
                    child.collect_parameters(out);
                }
            }
        }
    }
}

fn remap_path(path: &mut PathExpr, ctx: &CopyContext) {
    if let Some(base) = path.base {
        if let Some(mapped) = ctx.map(base) {
            path.base = Some(mapped);
        }
    }
}

// =============================================================================
// Expression Constructors
// =============================================================================

/// Create an unbound path, resolved by name at render time.
pub fn path(text: &str) -> Expr {
    Expr::Path(PathExpr::unbound(text))
}

/// Create a path bound to a join node.
pub fn bound_path(node: JoinNodeId, alias: &str, field: Option<&str>) -> Expr {
    Expr::Path(PathExpr::bound(node, alias, field))
}

/// Create an integer literal.
pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

/// Create a float literal.
pub fn lit_float(f: f64) -> Expr {
    Expr::Literal(Literal::Float(f))
}

/// Create a string literal.
pub fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.into()))
}

/// Create a boolean literal.
pub fn lit_bool(b: bool) -> Expr {
    Expr::Literal(Literal::Bool(b))
}

/// Create a NULL value.
pub fn null() -> Expr {
    Expr::Null
}

/// Create a named parameter without a bound value.
pub fn param(name: &str) -> Expr {
    Expr::Parameter(ParameterExpr {
        name: Some(name.into()),
        value: None,
    })
}

/// Create a named parameter bound to a list of values.
pub fn param_list(name: &str, values: Vec<Literal>) -> Expr {
    Expr::Parameter(ParameterExpr {
        name: Some(name.into()),
        value: Some(ParameterValue::List(values)),
    })
}

/// Create a function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function(FunctionExpr {
        name: name.into(),
        args,
    })
}

/// Create a `FUNCTION('name', args...)` call.
pub fn function_function(name: &str, args: Vec<Expr>) -> Expr {
    let mut all = Vec::with_capacity(args.len() + 1);
    all.push(lit_str(name));
    all.extend(args);
    func(FUNCTION_FUNCTION, all)
}

/// Mark a path argument of a collection function.
fn collection_arg(expr: Expr, key: bool) -> Expr {
    match expr {
        Expr::Path(mut p) => {
            p.used_in_collection_function = true;
            p.collection_key_path = key;
            Expr::Path(p)
        }
        other => other,
    }
}

/// KEY(path)
pub fn key(path: Expr) -> Expr {
    func("KEY", vec![collection_arg(path, true)])
}

/// VALUE(path)
pub fn value(path: Expr) -> Expr {
    func("VALUE", vec![collection_arg(path, false)])
}

/// ENTRY(path)
pub fn entry(path: Expr) -> Expr {
    func("ENTRY", vec![collection_arg(path, false)])
}

/// INDEX(path)
pub fn index(path: Expr) -> Expr {
    func("INDEX", vec![collection_arg(path, false)])
}

/// SIZE(path)
pub fn size(path: Expr) -> Expr {
    func("SIZE", vec![collection_arg(path, false)])
}

/// OUTER(expr) - reference to the enclosing query.
pub fn outer(expr: Expr) -> Expr {
    func("OUTER", vec![expr])
}

fn aggregate(name: &str, args: Vec<Expr>, distinct: bool) -> Expr {
    Expr::Aggregate(AggregateExpr {
        name: name.into(),
        args,
        distinct,
    })
}

/// COUNT(expr)
pub fn count(expr: Expr) -> Expr {
    aggregate("COUNT", vec![expr], false)
}

/// COUNT(*)
pub fn count_star() -> Expr {
    aggregate("COUNT", vec![], false)
}

/// COUNT(DISTINCT expr)
pub fn count_distinct(expr: Expr) -> Expr {
    aggregate("COUNT", vec![expr], true)
}

/// SUM(expr)
pub fn sum(expr: Expr) -> Expr {
    aggregate("SUM", vec![expr], false)
}

/// AVG(expr)
pub fn avg(expr: Expr) -> Expr {
    aggregate("AVG", vec![expr], false)
}

/// MIN(expr)
pub fn min(expr: Expr) -> Expr {
    aggregate("MIN", vec![expr], false)
}

/// MAX(expr)
pub fn max(expr: Expr) -> Expr {
    aggregate("MAX", vec![expr], false)
}

/// CASE WHEN ... THEN ... [ELSE ...] END
pub fn case_when(when_clauses: Vec<(Expr, Expr)>, else_clause: Option<Expr>) -> Expr {
    Expr::Case(CaseExpr {
        operand: None,
        when_clauses,
        else_clause: else_clause.map(Box::new),
    })
}

/// base[index]
pub fn array(base: &str, index: Expr) -> Expr {
    Expr::Array(ArrayExpr {
        base: PathExpr::unbound(base),
        index: Box::new(index),
    })
}

// =============================================================================
// Expression Builder Trait
// =============================================================================

/// Extension trait for building expressions fluently.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn binary(self, op: BinaryOperator, other: impl Into<Expr>) -> Expr {
        Expr::Binary {
            left: Box::new(self.into_expr()),
            op,
            right: Box::new(other.into()),
        }
    }

    // Comparison operators
    fn eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Eq, other)
    }

    fn ne(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Ne, other)
    }

    fn gt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Gt, other)
    }

    fn gte(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Gte, other)
    }

    fn lt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Lt, other)
    }

    fn lte(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Lte, other)
    }

    // Logical operators
    fn and(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::And, other)
    }

    fn or(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Or, other)
    }

    fn not(self) -> Expr {
        Expr::Not(Box::new(self.into_expr()))
    }

    // Arithmetic operators
    fn add(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Plus, other)
    }

    fn sub(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Minus, other)
    }

    fn mul(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Mul, other)
    }

    fn div(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Div, other)
    }

    fn like(self, pattern: impl Into<Expr>) -> Expr {
        Expr::Like {
            expr: Box::new(self.into_expr()),
            pattern: Box::new(pattern.into()),
            escape: None,
            negated: false,
        }
    }

    /// LIKE with ESCAPE clause for matching literal `%` and `_` characters.
    fn like_escape(self, pattern: impl Into<Expr>, escape: char) -> Expr {
        Expr::Like {
            expr: Box::new(self.into_expr()),
            pattern: Box::new(pattern.into()),
            escape: Some(escape),
            negated: false,
        }
    }

    // NULL checks
    #[allow(clippy::wrong_self_convention)]
    fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: false,
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: true,
        }
    }

    // IN operator
    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: false,
        }
    }

    fn not_in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: true,
        }
    }

    fn between(self, low: impl Into<Expr>, high: impl Into<Expr>) -> Expr {
        Expr::Between {
            expr: Box::new(self.into_expr()),
            low: Box::new(low.into()),
            high: Box::new(high.into()),
            negated: false,
        }
    }

    fn paren(self) -> Expr {
        Expr::Paren(Box::new(self.into_expr()))
    }

    /// Alias this expression (for the select clause).
    fn alias(self, name: &str) -> crate::query::SelectItem {
        crate::query::SelectItem {
            expr: self.into_expr(),
            alias: Some(name.into()),
        }
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        lit_int(n)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        lit_int(n as i64)
    }
}

impl From<f64> for Expr {
    fn from(f: f64) -> Self {
        lit_float(f)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        lit_str(s)
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        lit_bool(b)
    }
}

impl From<PathExpr> for Expr {
    fn from(p: PathExpr) -> Self {
        Expr::Path(p)
    }
}

impl From<QueryBuilder> for Expr {
    /// Convert a query into a subquery expression.
    fn from(query: QueryBuilder) -> Self {
        Expr::Subquery(Box::new(query))
    }
}

// =============================================================================
// Tests
// =============================================================================
