//! Alias registry: resolves an index alias to its underlying index name
//! before partitioning (§4.5).

use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct AliasRegistry {
    aliases: DashMap<String, String>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    pub fn remove(&self, alias: &str) {
        self.aliases.remove(alias);
    }

    pub fn resolve(&self, alias: &str) -> Option<String> {
        self.aliases.get(alias).map(|v| v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_alias() {
        let reg = AliasRegistry::new();
        reg.set("alias1", "real_index");
        assert_eq!(reg.resolve("alias1").as_deref(), Some("real_index"));
    }

    #[test]
    fn unknown_alias_is_none() {
        let reg = AliasRegistry::new();
        assert!(reg.resolve("nope").is_none());
    }
}
