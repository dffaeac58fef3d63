//! External collaborator contracts.
//!
//! These are out of scope for this crate: the LLM chat/embedding
//! providers and the knowledge-fabric full-text index are "external
//! collaborators whose contracts are stated" here. Production callers
//! inject concrete adapters; tests use the `Null*`/`Mock*` doubles below.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedding provider contract.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds `text`, with no caller-imposed deadline.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds a batch of texts in one round trip.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Output embedding dimension.
    fn dimension(&self) -> usize;

    /// Human-readable model identifier.
    fn model_name(&self) -> &str;

    /// Same as [`Embedder::embed`] but bounded by `deadline`.
    async fn embed_fast(&self, text: &str, deadline: Duration) -> Result<Vec<f32>> {
        match tokio::time::timeout(deadline, self.embed(text)).await {
            Ok(result) => result,
            Err(_) => Err(Error::DeadlineExceeded),
        }
    }
}

/// LLM chat/completion provider contract.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Multi-turn chat completion.
    async fn chat(&self, messages: &[(String, String)], system_prompt: &str) -> Result<String>;

    /// Single-turn completion.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Trust scope of a knowledge-fabric item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeScope {
    Personal,
    Team,
    Global,
}

/// An item returned by the knowledge fabric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: String,
    pub title: String,
    pub content: String,
    pub scope: KnowledgeScope,
    pub trust_score: f32,
    pub tags: Vec<String>,
}

/// Query parameters for [`KnowledgeFabric::search`].
#[derive(Debug, Clone)]
pub struct KnowledgeSearchQuery {
    pub limit: usize,
    pub min_trust: f32,
    pub tiers: Vec<String>,
}

/// Search result envelope.
#[derive(Debug, Clone)]
pub struct KnowledgeSearchResult {
    pub items: Vec<KnowledgeItem>,
    pub tier: String,
}

/// The knowledge-fabric full-text index contract; its
/// implementation is out of scope for this crate.
#[async_trait]
pub trait KnowledgeFabric: Send + Sync {
    async fn search(&self, query: &str, params: KnowledgeSearchQuery)
        -> Result<KnowledgeSearchResult>;
    async fn create(&self, item: KnowledgeItem) -> Result<String>;
    async fn update(&self, item: KnowledgeItem) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn get_by_id(&self, id: &str) -> Result<Option<KnowledgeItem>>;
    async fn get_by_scope(&self, scope: KnowledgeScope) -> Result<Vec<KnowledgeItem>>;
    async fn record_success(&self, id: &str) -> Result<()>;
    async fn record_failure(&self, id: &str) -> Result<()>;
}

/// A [`KnowledgeFabric`] double that always reports no results; used by
/// tests and as the default when no fabric is configured.
#[derive(Debug, Default)]
pub struct NullKnowledgeFabric;

#[async_trait]
impl KnowledgeFabric for NullKnowledgeFabric {
    async fn search(
        &self,
        _query: &str,
        _params: KnowledgeSearchQuery,
    ) -> Result<KnowledgeSearchResult> {
        Ok(KnowledgeSearchResult {
            items: Vec::new(),
            tier: "none".to_string(),
        })
    }
    async fn create(&self, _item: KnowledgeItem) -> Result<String> {
        Ok(crate::types::new_id("ref"))
    }
    async fn update(&self, _item: KnowledgeItem) -> Result<()> {
        Ok(())
    }
    async fn delete(&self, _id: &str) -> Result<()> {
        Ok(())
    }
    async fn get_by_id(&self, _id: &str) -> Result<Option<KnowledgeItem>> {
        Ok(None)
    }
    async fn get_by_scope(&self, _scope: KnowledgeScope) -> Result<Vec<KnowledgeItem>> {
        Ok(Vec::new())
    }
    async fn record_success(&self, _id: &str) -> Result<()> {
        Ok(())
    }
    async fn record_failure(&self, _id: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_knowledge_fabric_returns_empty_search() {
        let fabric = NullKnowledgeFabric;
        let result = fabric
            .search(
                "anything",
                KnowledgeSearchQuery {
                    limit: 3,
                    min_trust: 0.5,
                    tiers: vec![],
                },
            )
            .await
            .unwrap();
        assert!(result.items.is_empty());
    }
}
