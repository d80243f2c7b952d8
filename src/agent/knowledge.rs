//! Per-agent knowledge base and message primitive.
//!
//! Both live for one pipeline run and are owned by exactly one agent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Private key/value store of a single agent.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: HashMap<String, Value>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `key`.
    pub fn update(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    /// Serialize `value` and store it under `key`.
    pub fn record<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.update(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Deserialize the value under `key`, if present and well-typed.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.entries
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A message delivered synchronously into an agent's inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub content: Value,
}

/// State shared by every agent: identity, knowledge base and inbox.
///
/// The knowledge base is only reachable through the owning agent's
/// `update_knowledge`/`get_knowledge`; other agents see messages only.
#[derive(Debug, Clone)]
pub struct AgentCore {
    pub name: String,
    knowledge: KnowledgeBase,
    pub(crate) inbox: Vec<Message>,
}

impl AgentCore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            knowledge: KnowledgeBase::new(),
            inbox: Vec::new(),
        }
    }

    pub(crate) fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub(crate) fn knowledge_mut(&mut self) -> &mut KnowledgeBase {
        &mut self.knowledge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_and_get() {
        let mut kb = KnowledgeBase::new();
        assert!(kb.is_empty());

        kb.update("a", json!(1));
        kb.update("a", json!(2));

        assert_eq!(kb.len(), 1);
        assert_eq!(kb.get("a"), Some(&json!(2)));
        assert_eq!(kb.get("missing"), None);
    }

    #[test]
    fn test_record_and_get_as() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Totals {
            count: u64,
        }

        let mut kb = KnowledgeBase::new();
        kb.record("totals", &Totals { count: 3 }).unwrap();

        assert_eq!(kb.get_as::<Totals>("totals"), Some(Totals { count: 3 }));
        assert_eq!(kb.get_as::<String>("totals"), None);
        assert!(kb.contains("totals"));
    }

    #[test]
    fn test_core_starts_empty() {
        let mut core = AgentCore::new("Analyst");
        assert!(core.knowledge().is_empty());
        assert!(core.inbox.is_empty());

        core.knowledge_mut().update("k", json!(true));
        assert_eq!(core.knowledge().keys(), vec!["k"]);
    }

    #[test]
    fn test_keys_sorted() {
        let mut kb = KnowledgeBase::new();
        kb.update("zeta", json!(null));
        kb.update("alpha", json!(null));
        assert_eq!(kb.keys(), vec!["alpha", "zeta"]);
    }
}
