//! Common table expressions.
//!
//! A CTE materializes the rows of its body as a transient entity that the
//! main query joins like any other entity. Attributes of the CTE entity are
//! bound positionally to the body's select list, or to the RETURNING list
//! of a DML body.

use serde::{Deserialize, Serialize};

use crate::dml::{DeleteCollectionQuery, QueryVariant, UpdateQuery};
use crate::error::{GenerateError, GenerateResult};
use crate::query::{QueryBuilder, SelectQuery};

/// The query a CTE materializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CteBody {
    Query(QueryBuilder),
    Update(UpdateQuery),
    DeleteCollection(DeleteCollectionQuery),
}

impl CteBody {
    /// Number of values the body produces per row.
    pub fn width(&self) -> usize {
        match self {
            CteBody::Query(query) => query_width(query),
            CteBody::Update(update) => update.returning.len(),
            CteBody::DeleteCollection(delete) => delete.returning.len(),
        }
    }
}

impl CteBody {
    pub fn collect_parameters(&self, out: &mut Vec<String>) {
        match self {
            CteBody::Query(query) => query.collect_parameters(out),
            CteBody::Update(update) => update.collect_parameters(out),
            CteBody::DeleteCollection(delete) => delete.collect_parameters(out),
        }
    }
}

fn query_width(query: &QueryBuilder) -> usize {
    match query {
        QueryBuilder::Select(select) => select.select.len(),
        QueryBuilder::SetOperation(manager) => query_width(&manager.start),
    }
}

impl From<SelectQuery> for CteBody {
    fn from(query: SelectQuery) -> Self {
        CteBody::Query(QueryBuilder::Select(query))
    }
}

impl From<QueryBuilder> for CteBody {
    fn from(query: QueryBuilder) -> Self {
        CteBody::Query(query)
    }
}

impl From<UpdateQuery> for CteBody {
    fn from(update: UpdateQuery) -> Self {
        CteBody::Update(update)
    }
}

impl From<DeleteCollectionQuery> for CteBody {
    fn from(delete: DeleteCollectionQuery) -> Self {
        CteBody::DeleteCollection(delete)
    }
}

/// `Entity(attr, ...) AS(body)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use = "builders have no effect until used"]
pub struct Cte {
    pub entity: String,
    pub attributes: Vec<String>,
    pub body: CteBody,
    #[serde(default)]
    pub recursive: bool,
}

impl Cte {
    pub fn new(entity: &str, attributes: Vec<&str>, body: impl Into<CteBody>) -> Self {
        Self {
            entity: entity.into(),
            attributes: attributes.into_iter().map(String::from).collect(),
            body: body.into(),
            recursive: false,
        }
    }

    /// A recursive CTE; the body is usually a `UNION ALL` of the anchor
    /// query and the step query.
    pub fn recursive(entity: &str, attributes: Vec<&str>, body: impl Into<CteBody>) -> Self {
        Self {
            recursive: true,
            ..Self::new(entity, attributes, body)
        }
    }

    /// Every attribute must be bound to exactly one value of the body.
    pub fn validate(&self) -> GenerateResult<()> {
        if self.attributes.is_empty() {
            return Err(GenerateError::invalid(format!(
                "CTE '{}' declares no attributes",
                self.entity
            )));
        }
        let width = self.body.width();
        if width != self.attributes.len() {
            return Err(GenerateError::invalid(format!(
                "CTE '{}' binds {} attributes but its body produces {} values",
                self.entity,
                self.attributes.len(),
                width
            )));
        }
        Ok(())
    }

    pub fn copy(&self) -> GenerateResult<Self> {
        let body = match &self.body {
            CteBody::Query(query) => CteBody::Query(query.deep_copy()?),
            CteBody::Update(update) => CteBody::Update(update.copy()?),
            CteBody::DeleteCollection(delete) => CteBody::DeleteCollection(delete.copy()?),
        };
        Ok(Self {
            body,
            ..self.clone()
        })
    }
}
