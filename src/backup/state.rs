//! In-memory table of backup/restore runs currently in flight, keyed by
//! namespaced name, so two reconciles of the same `PlatformBackup` (or
//! `PlatformRestore`) never race to run the same job twice.

use std::collections::HashSet;
use std::sync::RwLock;

#[derive(Default)]
pub struct ActiveRunTable {
    active: RwLock<HashSet<(String, String)>>,
}

impl ActiveRunTable {
    /// Attempts to claim `(namespace, name)`; returns `true` if the claim
    /// succeeded (nothing else was running), `false` if already active.
    pub fn try_claim(&self, namespace: &str, name: &str) -> bool {
        let mut active = self.active.write().unwrap();
        active.insert((namespace.to_string(), name.to_string()))
    }

    pub fn release(&self, namespace: &str, name: &str) {
        self.active
            .write()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn is_active(&self, namespace: &str, name: &str) -> bool {
        self.active
            .read()
            .unwrap()
            .contains(&(namespace.to_string(), name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_fails_while_first_is_active() {
        let table = ActiveRunTable::default();
        assert!(table.try_claim("default", "demo"));
        assert!(!table.try_claim("default", "demo"));
        table.release("default", "demo");
        assert!(table.try_claim("default", "demo"));
    }
}
