//! Pipeline agents.
//!
//! Every stage of the forecasting pipeline is an [`Agent`]: it owns a private
//! knowledge base and an inbox, and exposes a single `process` operation.
//! Agents never read each other's knowledge; they talk through messages or
//! through the orchestrator's explicit stage mapping.

pub mod analysis;
pub mod ingestion;
pub mod knowledge;
pub mod prediction;
pub mod recommendation;
pub mod report;

pub use analysis::{AnalysisAgent, AnalysisResults};
pub use ingestion::{IngestionAgent, IngestionOutput, RawDataset};
pub use knowledge::{AgentCore, KnowledgeBase, Message};
pub use prediction::{PredictionAgent, PredictionInput, PredictionOutput};
pub use recommendation::{RecommendationAgent, RecommendationPools, Recommendations};
pub use report::{NarrativeSource, ReportAgent, ReportEnvelope, ReportInput, ReportMetadata};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Anything that can receive a [`Message`].
pub trait Mailbox {
    fn receive(&mut self, message: Message);
    fn inbox(&self) -> &[Message];
}

/// A pipeline stage.
pub trait Agent {
    type Input;
    type Output;

    fn core(&self) -> &AgentCore;
    fn core_mut(&mut self) -> &mut AgentCore;

    /// Run this stage.
    fn process(&mut self, input: &Self::Input) -> Self::Output;

    fn name(&self) -> &str {
        &self.core().name
    }

    /// Deliver `content` into `recipient`'s inbox.
    fn send_message<M: Mailbox + ?Sized>(&self, recipient: &mut M, content: Value) {
        debug!("{} -> message", self.name());
        recipient.receive(Message {
            sender: self.name().to_string(),
            content,
        });
    }

    fn update_knowledge(&mut self, key: &str, value: Value) {
        self.core_mut().knowledge_mut().update(key, value);
    }

    fn get_knowledge(&self, key: &str) -> Option<&Value> {
        self.core().knowledge().get(key)
    }

    /// Store a serializable stage result under `key`. Serialization failures
    /// are logged and skipped.
    fn remember<T: Serialize>(&mut self, key: &str, value: &T) {
        let name = self.name().to_string();
        if let Err(e) = self.core_mut().knowledge_mut().record(key, value) {
            warn!("{} could not record '{}': {}", name, key, e);
        }
    }
}

impl<A: Agent> Mailbox for A {
    fn receive(&mut self, message: Message) {
        self.core_mut().inbox.push(message);
    }

    fn inbox(&self) -> &[Message] {
        &self.core().inbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo {
        core: AgentCore,
    }

    impl Agent for Echo {
        type Input = String;
        type Output = usize;

        fn core(&self) -> &AgentCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut AgentCore {
            &mut self.core
        }

        fn process(&mut self, input: &String) -> usize {
            self.update_knowledge("last", json!(input));
            input.len()
        }
    }

    fn echo(name: &str) -> Echo {
        Echo {
            core: AgentCore::new(name),
        }
    }

    #[test]
    fn test_send_message_lands_in_recipient_inbox() {
        let sender = echo("sender");
        let mut recipient = echo("recipient");

        sender.send_message(&mut recipient, json!({"stage": "done"}));

        assert_eq!(recipient.inbox().len(), 1);
        assert_eq!(recipient.inbox()[0].sender, "sender");
        assert_eq!(recipient.inbox()[0].content["stage"], "done");
        assert!(sender.inbox().is_empty());
    }

    #[test]
    fn test_knowledge_is_private() {
        let mut a = echo("a");
        let b = echo("b");

        assert_eq!(a.process(&"hello".to_string()), 5);
        assert_eq!(a.get_knowledge("last"), Some(&json!("hello")));
        assert_eq!(b.get_knowledge("last"), None);
    }

    #[test]
    fn test_remember_serializes() {
        let mut a = echo("a");
        a.remember("numbers", &vec![1, 2, 3]);
        assert_eq!(a.get_knowledge("numbers"), Some(&json!([1, 2, 3])));
    }
}
