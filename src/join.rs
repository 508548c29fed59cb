//! Join graph - the FROM-clause structure of one query level.
//!
//! Nodes live in an arena and are addressed by [`JoinNodeId`] handles. Each
//! query level (main query, subquery, CTE body) owns its own graph; copying a
//! graph into another goes through a [`CopyContext`] that records how handles
//! were renumbered so expressions can be rebound with [`Expr::remap`].
//!
//! [`Expr::remap`]: crate::expr::Expr::remap

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{GenerateError, GenerateResult};
use crate::expr::Expr;

/// Handle of a node within one [`JoinGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinNodeId(pub usize);

/// Join types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Cross,
}

/// Cardinality of the relationship a join follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    #[default]
    Singular,
    Collection,
    /// Map-typed relationship; the node denotes the value side unless a key
    /// function is applied.
    Map,
}

impl RelationKind {
    pub fn is_plural(&self) -> bool {
        matches!(self, RelationKind::Collection | RelationKind::Map)
    }
}

/// What a node selects from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinSource {
    /// `FROM Entity alias`
    Root { entity: String },
    /// `JOIN parent.attribute alias`
    Attribute {
        attribute: String,
        relation: RelationKind,
    },
    /// `JOIN Entity alias ON ...`
    Entity { entity: String },
    /// `FROM outer.path alias` - a subquery root correlated to the outer query.
    Correlated { path: String },
}

/// One FROM-clause entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinNode {
    pub alias: String,
    pub source: JoinSource,
    pub parent: Option<JoinNodeId>,
    pub join_type: Option<JoinType>,
    #[serde(default)]
    pub fetch: bool,
    pub on: Option<Expr>,
    /// Created by path resolution rather than by an explicit join.
    #[serde(default)]
    pub implicit: bool,
}

impl JoinNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn relation(&self) -> Option<RelationKind> {
        match &self.source {
            JoinSource::Attribute { relation, .. } => Some(*relation),
            _ => None,
        }
    }
}

/// Arena of join nodes for one query level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinGraph {
    nodes: Vec<JoinNode>,
    roots: Vec<JoinNodeId>,
}

impl JoinGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: JoinNode) -> JoinNodeId {
        let id = JoinNodeId(self.nodes.len());
        if node.is_root() {
            self.roots.push(id);
        }
        self.nodes.push(node);
        id
    }

    fn require(&self, id: JoinNodeId) -> GenerateResult<&JoinNode> {
        self.node(id).ok_or_else(|| {
            GenerateError::UnresolvedReference(format!("join node #{} does not exist", id.0))
        })
    }

    /// Add a root `FROM Entity alias`.
    pub fn add_root(&mut self, entity: &str, alias: &str) -> JoinNodeId {
        self.push(JoinNode {
            alias: alias.into(),
            source: JoinSource::Root {
                entity: entity.into(),
            },
            parent: None,
            join_type: None,
            fetch: false,
            on: None,
            implicit: false,
        })
    }

    /// Add a subquery root correlated to a path of the enclosing query.
    pub fn correlate(&mut self, path: &str, alias: &str) -> JoinNodeId {
        self.push(JoinNode {
            alias: alias.into(),
            source: JoinSource::Correlated { path: path.into() },
            parent: None,
            join_type: None,
            fetch: false,
            on: None,
            implicit: false,
        })
    }

    /// Join an attribute of `parent`.
    pub fn join(
        &mut self,
        parent: JoinNodeId,
        attribute: &str,
        alias: &str,
        relation: RelationKind,
        join_type: JoinType,
    ) -> GenerateResult<JoinNodeId> {
        self.require(parent)?;
        Ok(self.push(JoinNode {
            alias: alias.into(),
            source: JoinSource::Attribute {
                attribute: attribute.into(),
                relation,
            },
            parent: Some(parent),
            join_type: Some(join_type),
            fetch: false,
            on: None,
            implicit: false,
        }))
    }

    /// Join an unrelated entity under `parent` with an ON condition.
    pub fn join_entity(
        &mut self,
        parent: JoinNodeId,
        entity: &str,
        alias: &str,
        join_type: JoinType,
        on: Expr,
    ) -> GenerateResult<JoinNodeId> {
        self.require(parent)?;
        Ok(self.push(JoinNode {
            alias: alias.into(),
            source: JoinSource::Entity {
                entity: entity.into(),
            },
            parent: Some(parent),
            join_type: Some(join_type),
            fetch: false,
            on: Some(on),
            implicit: false,
        }))
    }

    /// Cross join an unrelated entity under `parent`.
    pub fn cross_join(
        &mut self,
        parent: JoinNodeId,
        entity: &str,
        alias: &str,
    ) -> GenerateResult<JoinNodeId> {
        self.require(parent)?;
        Ok(self.push(JoinNode {
            alias: alias.into(),
            source: JoinSource::Entity {
                entity: entity.into(),
            },
            parent: Some(parent),
            join_type: Some(JoinType::Cross),
            fetch: false,
            on: None,
            implicit: false,
        }))
    }

    pub fn node(&self, id: JoinNodeId) -> Option<&JoinNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: JoinNodeId) -> Option<&mut JoinNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn roots(&self) -> &[JoinNodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of `id`, in insertion order.
    pub fn children(&self, id: JoinNodeId) -> Vec<JoinNodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent == Some(id))
            .map(|(i, _)| JoinNodeId(i))
            .collect()
    }

    pub fn find_by_alias(&self, alias: &str) -> Option<JoinNodeId> {
        self.nodes
            .iter()
            .position(|n| n.alias == alias)
            .map(JoinNodeId)
    }

    /// Whether `id` denotes the value side of a map-typed relationship.
    pub fn is_map_value(&self, id: JoinNodeId) -> bool {
        self.node(id)
            .and_then(JoinNode::relation)
            .is_some_and(|r| r == RelationKind::Map)
    }

    /// All nodes, each root followed by its subtree in depth-first order.
    pub fn depth_first(&self) -> Vec<JoinNodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for root in &self.roots {
            self.collect_subtree(*root, &mut out);
        }
        out
    }

    /// `id` followed by its descendants in depth-first order.
    pub fn subtree(&self, id: JoinNodeId) -> Vec<JoinNodeId> {
        let mut out = Vec::new();
        self.collect_subtree(id, &mut out);
        out
    }

    fn collect_subtree(&self, id: JoinNodeId, out: &mut Vec<JoinNodeId>) {
        out.push(id);
        for child in self.children(id) {
            self.collect_subtree(child, out);
        }
    }

    /// Whether an explicit join follows a collection or map relationship.
    pub fn has_collection_joins(&self) -> bool {
        self.nodes
            .iter()
            .any(|n| !n.implicit && n.relation().is_some_and(|r| r.is_plural()))
    }

    /// `base` if unused, else the first free `base_N`.
    pub fn unique_alias(&self, base: &str) -> String {
        if self.find_by_alias(base).is_none() {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{}_{}", base, i))
            .find(|candidate| self.find_by_alias(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// Copy every node into `target`, recording the renumbering in `ctx`.
    ///
    /// ON conditions of the copies are rebound once all nodes exist, so
    /// conditions may reference nodes declared after them.
    pub fn copy_into(&self, target: &mut JoinGraph, ctx: &mut CopyContext) {
        let order = self.depth_first();
        for id in &order {
            let node = &self.nodes[id.0];
            let mut copy = node.clone();
            copy.parent = node.parent.and_then(|p| ctx.map(p));
            let new_id = target.push(copy);
            ctx.insert(*id, new_id);
        }
        for id in order {
            if let Some(new_id) = ctx.map(id) {
                if let Some(on) = target.nodes[new_id.0].on.as_mut() {
                    on.remap(ctx);
                }
            }
        }
    }
}

/// Handle renumbering recorded while copying a join graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyContext {
    mapping: HashMap<JoinNodeId, JoinNodeId>,
}

impl CopyContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: JoinNodeId, to: JoinNodeId) {
        self.mapping.insert(from, to);
    }

    pub fn map(&self, from: JoinNodeId) -> Option<JoinNodeId> {
        self.mapping.get(&from).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{bound_path, ExprExt};

    fn document_graph() -> (JoinGraph, JoinNodeId, JoinNodeId, JoinNodeId) {
        let mut graph = JoinGraph::new();
        let d = graph.add_root("Document", "d");
        let l = graph
            .join(d, "localized", "l", RelationKind::Map, JoinType::Left)
            .unwrap();
        let o = graph
            .join(d, "owner", "o", RelationKind::Singular, JoinType::Inner)
            .unwrap();
        (graph, d, l, o)
    }

    #[test]
    fn test_children_and_roots() {
        let (graph, d, l, o) = document_graph();
        assert_eq!(graph.roots(), &[d]);
        assert_eq!(graph.children(d), vec![l, o]);
        assert!(graph.children(l).is_empty());
    }

    #[test]
    fn test_join_unknown_parent() {
        let mut graph = JoinGraph::new();
        let err = graph
            .join(JoinNodeId(3), "people", "p", RelationKind::Collection, JoinType::Left)
            .unwrap_err();
        assert!(matches!(err, GenerateError::UnresolvedReference(_)));
    }

    #[test]
    fn test_is_map_value() {
        let (graph, d, l, o) = document_graph();
        assert!(graph.is_map_value(l));
        assert!(!graph.is_map_value(o));
        assert!(!graph.is_map_value(d));
    }

    #[test]
    fn test_depth_first_order() {
        let (mut graph, d, l, o) = document_graph();
        let c = graph
            .join(o, "contacts", "c", RelationKind::Collection, JoinType::Left)
            .unwrap();
        let p = graph.add_root("Person", "p");
        assert_eq!(graph.depth_first(), vec![d, l, o, c, p]);
    }

    #[test]
    fn test_unique_alias() {
        let (mut graph, d, ..) = document_graph();
        assert_eq!(graph.unique_alias("people"), "people");
        assert_eq!(graph.unique_alias("l"), "l_1");
        graph
            .join(d, "versions", "l_1", RelationKind::Collection, JoinType::Left)
            .unwrap();
        assert_eq!(graph.unique_alias("l"), "l_2");
    }

    #[test]
    fn test_has_collection_joins() {
        let mut graph = JoinGraph::new();
        let d = graph.add_root("Document", "d");
        graph
            .join(d, "owner", "o", RelationKind::Singular, JoinType::Inner)
            .unwrap();
        assert!(!graph.has_collection_joins());

        let people = graph
            .join(d, "people", "p", RelationKind::Collection, JoinType::Left)
            .unwrap();
        graph.node_mut(people).unwrap().implicit = true;
        assert!(!graph.has_collection_joins());

        graph
            .join(d, "versions", "v", RelationKind::Collection, JoinType::Left)
            .unwrap();
        assert!(graph.has_collection_joins());
    }

    #[test]
    fn test_copy_into_renumbers_and_rebinds_on() {
        let mut source = JoinGraph::new();
        let d = source.add_root("Document", "d");
        source
            .join_entity(
                d,
                "Person",
                "p",
                JoinType::Left,
                bound_path(d, "d", Some("owner.id")).eq(bound_path(JoinNodeId(1), "p", Some("id"))),
            )
            .unwrap();

        let mut target = JoinGraph::new();
        target.add_root("Archive", "a");
        let mut ctx = CopyContext::new();
        source.copy_into(&mut target, &mut ctx);

        assert_eq!(ctx.map(JoinNodeId(0)), Some(JoinNodeId(1)));
        assert_eq!(ctx.map(JoinNodeId(1)), Some(JoinNodeId(2)));
        assert_eq!(target.roots(), &[JoinNodeId(0), JoinNodeId(1)]);

        let copied = target.node(JoinNodeId(2)).unwrap();
        assert_eq!(copied.parent, Some(JoinNodeId(1)));
        let Some(Expr::Binary { left, right, .. }) = &copied.on else {
            panic!("expected ON condition");
        };
        let (Expr::Path(l), Expr::Path(r)) = (left.as_ref(), right.as_ref()) else {
            panic!("expected paths");
        };
        assert_eq!(l.base, Some(JoinNodeId(1)));
        assert_eq!(r.base, Some(JoinNodeId(2)));
    }
}
