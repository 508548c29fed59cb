//! Alias namespace of one query level.
//!
//! An alias names either a join node or a selected expression. Within one
//! namespace an alias maps to exactly one [`AliasInfo`]; registering an alias
//! again replaces the previous entry and hands it back to the caller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::expr::Expr;
use crate::join::{CopyContext, JoinNodeId};

/// What an alias is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AliasInfo {
    Join {
        alias: String,
        node: JoinNodeId,
        #[serde(default)]
        implicit: bool,
    },
    Select {
        alias: String,
        expr: Expr,
    },
}

impl AliasInfo {
    pub fn alias(&self) -> &str {
        match self {
            AliasInfo::Join { alias, .. } | AliasInfo::Select { alias, .. } => alias,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasManager {
    aliases: BTreeMap<String, AliasInfo>,
}

impl AliasManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_join(
        &mut self,
        alias: &str,
        node: JoinNodeId,
        implicit: bool,
    ) -> Option<AliasInfo> {
        self.aliases.insert(
            alias.to_string(),
            AliasInfo::Join {
                alias: alias.to_string(),
                node,
                implicit,
            },
        )
    }

    pub fn register_select(&mut self, alias: &str, expr: Expr) -> Option<AliasInfo> {
        self.aliases.insert(
            alias.to_string(),
            AliasInfo::Select {
                alias: alias.to_string(),
                expr,
            },
        )
    }

    pub fn resolve(&self, alias: &str) -> Option<&AliasInfo> {
        self.aliases.get(alias)
    }

    /// The join node bound to `alias`, if it names one.
    pub fn join_node(&self, alias: &str) -> Option<JoinNodeId> {
        match self.resolve(alias) {
            Some(AliasInfo::Join { node, .. }) => Some(*node),
            _ => None,
        }
    }

    pub fn remove(&mut self, alias: &str) -> Option<AliasInfo> {
        self.aliases.remove(alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AliasInfo> {
        self.aliases.values()
    }

    /// Rebind join handles and select expressions after a graph copy.
    pub fn remap(&mut self, ctx: &CopyContext) {
        for info in self.aliases.values_mut() {
            match info {
                AliasInfo::Join { node, .. } => {
                    if let Some(mapped) = ctx.map(*node) {
                        *node = mapped;
                    }
                }
                AliasInfo::Select { expr, .. } => expr.remap(ctx),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::path;

    #[test]
    fn test_resolve_join_and_select() {
        let mut aliases = AliasManager::new();
        aliases.register_join("d", JoinNodeId(0), false);
        aliases.register_select("docName", path("d.name"));

        assert_eq!(aliases.join_node("d"), Some(JoinNodeId(0)));
        assert_eq!(aliases.join_node("docName"), None);
        assert!(matches!(
            aliases.resolve("docName"),
            Some(AliasInfo::Select { expr, .. }) if *expr == path("d.name")
        ));
        assert!(aliases.resolve("x").is_none());
    }

    #[test]
    fn test_redefinition_replaces() {
        let mut aliases = AliasManager::new();
        assert!(aliases.register_select("n", path("d.name")).is_none());

        let previous = aliases.register_join("n", JoinNodeId(2), true);
        assert!(matches!(previous, Some(AliasInfo::Select { .. })));
        assert_eq!(aliases.iter().count(), 1);
        assert_eq!(aliases.join_node("n"), Some(JoinNodeId(2)));
    }

    #[test]
    fn test_remove() {
        let mut aliases = AliasManager::new();
        aliases.register_join("d", JoinNodeId(0), false);
        assert_eq!(aliases.remove("d").map(|a| a.alias().to_string()), Some("d".into()));
        assert!(!aliases.contains("d"));
    }
}
