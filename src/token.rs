//! Query tokens - the atomic units of generated query text.
//!
//! Tokens are dialect-agnostic. Everything whose spelling depends on the
//! target dialect (boolean literals, NULL, escape characters, the join
//! condition keyword) is resolved in [`Token::serialize`], which is the only
//! place the generator consults the capability provider for literal text.

use crate::dialect::CapabilityProvider;

/// Query token - every possible element in a generated statement.
///
/// Adding a new variant here will cause compile errors everywhere
/// it needs to be handled (exhaustive matching).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Keywords ===
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    As,
    Join,
    Left,
    Fetch,
    GroupBy,
    Having,
    OrderBy,
    Asc,
    Desc,
    NullsFirst,
    NullsLast,
    Case,
    When,
    Then,
    Else,
    End,
    In,
    Between,
    Like,
    Escape,
    Distinct,
    All,
    Union,
    Intersect,
    Except,
    With,
    Recursive,
    Update,
    Set,
    Delete,
    Returning,

    // === Punctuation ===
    Comma,
    Dot,
    Star,
    LParen,
    RParen,

    // === Operators ===
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    Plus,
    Minus,
    Mul,
    Div,

    // === Whitespace ===
    Space,

    // === Dialect-resolved ===
    /// Boolean literal used as a value.
    LitBool(bool),
    /// Boolean literal used directly as a predicate.
    BoolCondition(bool),
    /// NULL used as a value.
    NullValue,
    /// `IS NULL` / `IS NOT NULL`
    NullComparison { negated: bool },
    /// Escape character of a LIKE predicate.
    EscapeChar(char),
    /// Keyword introducing a join condition (`ON` or `WITH`).
    OnKeyword,

    // === Dynamic Content ===
    /// Alias, entity name or attribute name, rendered as-is.
    Ident(String),
    /// Named parameter marker, rendered as `:name`.
    Parameter(String),
    /// Integer literal
    LitInt(i64),
    /// Float literal
    LitFloat(f64),
    /// String literal
    LitString(String),
    /// Function name, rendered as-is.
    FunctionName(String),

    /// Pre-rendered text passed directly to output.
    ///
    /// Only used for text the generator produced itself (materialized
    /// subqueries, provider invocation prefixes).
    Raw(String),
}

impl Token {
    /// Serialize this token to a string for the given provider.
    pub fn serialize(&self, provider: &dyn CapabilityProvider) -> String {
        match self {
            // Keywords
            Token::Select => "SELECT".into(),
            Token::From => "FROM".into(),
            Token::Where => "WHERE".into(),
            Token::And => "AND".into(),
            Token::Or => "OR".into(),
            Token::Not => "NOT".into(),
            Token::As => "AS".into(),
            Token::Join => "JOIN".into(),
            Token::Left => "LEFT".into(),
            Token::Fetch => "FETCH".into(),
            Token::GroupBy => "GROUP BY".into(),
            Token::Having => "HAVING".into(),
            Token::OrderBy => "ORDER BY".into(),
            Token::Asc => "ASC".into(),
            Token::Desc => "DESC".into(),
            Token::NullsFirst => "NULLS FIRST".into(),
            Token::NullsLast => "NULLS LAST".into(),
            Token::Case => "CASE".into(),
            Token::When => "WHEN".into(),
            Token::Then => "THEN".into(),
            Token::Else => "ELSE".into(),
            Token::End => "END".into(),
            Token::In => "IN".into(),
            Token::Between => "BETWEEN".into(),
            Token::Like => "LIKE".into(),
            Token::Escape => "ESCAPE".into(),
            Token::Distinct => "DISTINCT".into(),
            Token::All => "ALL".into(),
            Token::Union => "UNION".into(),
            Token::Intersect => "INTERSECT".into(),
            Token::Except => "EXCEPT".into(),
            Token::With => "WITH".into(),
            Token::Recursive => "RECURSIVE".into(),
            Token::Update => "UPDATE".into(),
            Token::Set => "SET".into(),
            Token::Delete => "DELETE".into(),
            Token::Returning => "RETURNING".into(),

            // Punctuation
            Token::Comma => ",".into(),
            Token::Dot => ".".into(),
            Token::Star => "*".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),

            // Operators
            Token::Eq => "=".into(),
            Token::Ne => "<>".into(),
            Token::Lt => "<".into(),
            Token::Gt => ">".into(),
            Token::Lte => "<=".into(),
            Token::Gte => ">=".into(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Mul => "*".into(),
            Token::Div => "/".into(),

            Token::Space => " ".into(),

            // Dialect policy hooks
            Token::LitBool(b) => provider.boolean_expression(*b).into(),
            Token::BoolCondition(b) => provider.boolean_conditional_expression(*b).into(),
            Token::NullValue => provider.null_expression().into(),
            Token::NullComparison { negated } => provider.null_comparison(*negated).into(),
            Token::EscapeChar(c) => provider.escape_character(*c),
            Token::OnKeyword => provider.on_clause_keyword().into(),

            Token::Ident(name) => name.clone(),
            Token::Parameter(name) => format!(":{}", name),
            Token::LitInt(n) => n.to_string(),
            Token::LitFloat(f) => {
                let mut buffer = ryu::Buffer::new();
                buffer.format(*f).to_string()
            }
            Token::LitString(s) => provider.quote_string(s),
            Token::FunctionName(name) => name.clone(),
            Token::Raw(s) => s.clone(),
        }
    }
}

/// A stream of tokens that can be serialized to query text.
///
/// The generator threads a `&mut TokenStream` through every visit, so the
/// output sink is always explicit and never shared between renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty token stream.
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    /// Push a single token.
    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    /// Extend with multiple tokens.
    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) -> &mut Self {
        self.tokens.extend(tokens);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Serialize all tokens to query text.
    pub fn serialize(&self, provider: &dyn CapabilityProvider) -> String {
        self.tokens.iter().map(|t| t.serialize(provider)).collect()
    }

    // Convenience methods for common tokens
    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }
    pub fn dot(&mut self) -> &mut Self {
        self.push(Token::Dot)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }
    pub fn ident(&mut self, name: &str) -> &mut Self {
        self.push(Token::Ident(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    #[test]
    fn test_keyword_serialize() {
        assert_eq!(Token::Select.serialize(&Dialect::Hibernate), "SELECT");
        assert_eq!(Token::GroupBy.serialize(&Dialect::EclipseLink), "GROUP BY");
    }

    #[test]
    fn test_dialect_resolved_tokens() {
        assert_eq!(Token::NullValue.serialize(&Dialect::Hibernate), "NULLIF(1,1)");
        assert_eq!(Token::NullValue.serialize(&Dialect::EclipseLink), "NULL");
        assert_eq!(Token::BoolCondition(true).serialize(&Dialect::Hibernate), "1 = 1");
        assert_eq!(Token::BoolCondition(false).serialize(&Dialect::EclipseLink), "FALSE");
        assert_eq!(Token::LitBool(true).serialize(&Dialect::EclipseLink), "TRUE");
        assert_eq!(Token::OnKeyword.serialize(&Dialect::Hibernate), "WITH");
        assert_eq!(Token::OnKeyword.serialize(&Dialect::DataNucleus), "ON");
    }

    #[test]
    fn test_token_stream() {
        let mut ts = TokenStream::new();
        ts.push(Token::Select)
            .space()
            .ident("p")
            .dot()
            .ident("name")
            .space()
            .push(Token::From)
            .space()
            .ident("Person")
            .space()
            .ident("p");

        assert_eq!(
            ts.serialize(&Dialect::Hibernate),
            "SELECT p.name FROM Person p"
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(Token::LitString("O'Neil".into()).serialize(&Dialect::Hibernate), "'O''Neil'");
        assert_eq!(Token::LitFloat(3.14).serialize(&Dialect::Hibernate), "3.14");
        assert_eq!(Token::Parameter("locale".into()).serialize(&Dialect::Hibernate), ":locale");
    }
}
