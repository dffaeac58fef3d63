//! Passive retrieval: a pre-LLM knowledge injection bounded to `<=50ms`.

use crate::config::PassiveRetrievalConfig;
use crate::external::{KnowledgeFabric, KnowledgeSearchQuery};
use crate::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Atomic counters plus a lock-free rolling average latency.
#[derive(Default)]
pub struct PassiveRetrievalMetrics {
    total_searches: AtomicU64,
    total_hits: AtomicU64,
    total_misses: AtomicU64,
    total_timeouts: AtomicU64,
    /// `f64` bit pattern of the rolling average latency in milliseconds.
    avg_latency_bits: AtomicU64,
}

/// Point-in-time snapshot of [`PassiveRetrievalMetrics`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub total_searches: u64,
    pub total_hits: u64,
    pub total_misses: u64,
    pub total_timeouts: u64,
    pub avg_latency_ms: f64,
}

impl PassiveRetrievalMetrics {
    fn record_latency(&self, latency_ms: f64) {
        let prev_bits = self.avg_latency_bits.load(Ordering::Relaxed);
        let prev = f64::from_bits(prev_bits);
        // Exponential moving average; no lock, last writer wins under races.
        let next = if prev == 0.0 { latency_ms } else { prev * 0.9 + latency_ms * 0.1 };
        self.avg_latency_bits.store(next.to_bits(), Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_searches: self.total_searches.load(Ordering::Relaxed),
            total_hits: self.total_hits.load(Ordering::Relaxed),
            total_misses: self.total_misses.load(Ordering::Relaxed),
            total_timeouts: self.total_timeouts.load(Ordering::Relaxed),
            avg_latency_ms: f64::from_bits(self.avg_latency_bits.load(Ordering::Relaxed)),
        }
    }
}

/// Pre-LLM knowledge injection without an LLM call, bounded to `<=50ms`.
pub struct PassiveRetriever {
    config: PassiveRetrievalConfig,
    fabric: Arc<dyn KnowledgeFabric>,
    metrics: PassiveRetrievalMetrics,
}

impl PassiveRetriever {
    #[must_use]
    pub fn new(config: PassiveRetrievalConfig, fabric: Arc<dyn KnowledgeFabric>) -> Self {
        Self {
            config,
            fabric,
            metrics: PassiveRetrievalMetrics::default(),
        }
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Returns formatted knowledge summaries within the token budget.
    /// Empty (after whitespace trim) or short (`<5` chars) queries, and a
    /// disabled config, return empty with no `Search` call and no metric
    /// increment.
    pub async fn retrieve(&self, query: &str) -> Vec<String> {
        let trimmed = query.trim();
        if trimmed.chars().count() < 5 || !self.config.enabled {
            return Vec::new();
        }

        let start = Instant::now();
        let deadline = std::time::Duration::from_millis(self.config.timeout_ms);
        let search = self.fabric.search(
            trimmed,
            KnowledgeSearchQuery {
                limit: self.config.max_results,
                min_trust: self.config.min_trust,
                tiers: Vec::new(),
            },
        );

        self.metrics.total_searches.fetch_add(1, Ordering::Relaxed);
        let result = match tokio::time::timeout(deadline, search).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) | Err(_) => {
                self.metrics.total_timeouts.fetch_add(1, Ordering::Relaxed);
                self.metrics.total_misses.fetch_add(1, Ordering::Relaxed);
                self.metrics.record_latency(start.elapsed().as_secs_f64() * 1000.0);
                return Vec::new();
            }
        };

        self.metrics.record_latency(start.elapsed().as_secs_f64() * 1000.0);
        if result.items.is_empty() {
            self.metrics.total_misses.fetch_add(1, Ordering::Relaxed);
            return Vec::new();
        }
        self.metrics.total_hits.fetch_add(1, Ordering::Relaxed);

        let mut budget_used = 0usize;
        let mut out = Vec::new();
        for item in &result.items {
            let formatted = format_item(item);
            let tokens = formatted.chars().count().div_ceil(4);
            if budget_used + tokens > self.config.max_tokens_to_add {
                break;
            }
            budget_used += tokens;
            out.push(formatted);
        }
        out
    }
}

/// Formats one knowledge item: code block, known-fix, or fallback summary.
fn format_item(item: &crate::external::KnowledgeItem) -> String {
    if let Some(body) = first_fenced_code_block(&item.content) {
        format!("{}: {}", item.title, truncate_chars(&body, 200))
    } else if item.title.to_lowercase().contains("fix") || item.title.to_lowercase().contains("solution") {
        format!("Known fix for {}: {}", item.title, truncate_chars(&item.content, 200))
    } else {
        format!("{}: {}", item.title, truncate_chars(&item.content, 150))
    }
}

/// Extracts the body of the first fenced code block (```lang\n...\n```),
/// with the leading language-specifier line stripped.
fn first_fenced_code_block(content: &str) -> Option<String> {
    let start = content.find("```")?;
    let after_open = &content[start + 3..];
    let end = after_open.find("```")?;
    let body = &after_open[..end];
    let body = body.strip_prefix('\r').unwrap_or(body);
    let body = match body.find('\n') {
        Some(idx) => &body[idx + 1..],
        None => body,
    };
    Some(body.trim().to_string())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Replaces the literal token `{{PASSIVE_RETRIEVAL}}\n` in `prompt` with
/// either a `<relevant_knowledge>` block or the empty string.
#[must_use]
pub fn inject_into_context(prompt: &str, results: &[String]) -> String {
    const TOKEN: &str = "{{PASSIVE_RETRIEVAL}}\n";
    let replacement = if results.is_empty() {
        String::new()
    } else {
        let mut block = String::from("<relevant_knowledge>\n");
        for summary in results {
            block.push_str("• ");
            block.push_str(summary);
            block.push('\n');
        }
        block.push_str("</relevant_knowledge>\n");
        block
    };
    prompt.replace(TOKEN, &replacement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{KnowledgeItem, KnowledgeScope, KnowledgeSearchResult};
    use async_trait::async_trait;

    struct StubFabric {
        items: Vec<KnowledgeItem>,
    }

    #[async_trait]
    impl KnowledgeFabric for StubFabric {
        async fn search(
            &self,
            _query: &str,
            _params: KnowledgeSearchQuery,
        ) -> Result<KnowledgeSearchResult> {
            Ok(KnowledgeSearchResult {
                items: self.items.clone(),
                tier: "test".into(),
            })
        }
        async fn create(&self, _item: KnowledgeItem) -> Result<String> {
            Ok(String::new())
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

    fn item(title: &str, content: &str, trust: f32) -> KnowledgeItem {
        KnowledgeItem {
            id: crate::types::new_id("ref"),
            title: title.into(),
            content: content.into(),
            scope: KnowledgeScope::Personal,
            trust_score: trust,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn short_query_returns_empty_with_no_metric() {
        let retriever = PassiveRetriever::new(
            PassiveRetrievalConfig::default(),
            Arc::new(StubFabric { items: vec![] }),
        );
        let results = retriever.retrieve("hi").await;
        assert!(results.is_empty());
        assert_eq!(retriever.metrics().total_searches, 0);
    }

    #[tokio::test]
    async fn disabled_config_returns_empty_immediately() {
        let retriever = PassiveRetriever::new(
            PassiveRetrievalConfig {
                enabled: false,
                ..PassiveRetrievalConfig::default()
            },
            Arc::new(StubFabric { items: vec![item("x", "y", 0.9)] }),
        );
        let results = retriever.retrieve("a real query here").await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn formats_fenced_code_block() {
        let content = "```rust\nfn main() {}\n```";
        let retriever = PassiveRetriever::new(
            PassiveRetrievalConfig::default(),
            Arc::new(StubFabric { items: vec![item("Snippet", content, 0.9)] }),
        );
        let results = retriever.retrieve("a real query here").await;
        assert_eq!(results[0], "Snippet: fn main() {}");
    }

    #[tokio::test]
    async fn formats_fix_title_specially() {
        let retriever = PassiveRetriever::new(
            PassiveRetrievalConfig::default(),
            Arc::new(StubFabric { items: vec![item("Null pointer fix", "set it to None first", 0.9)] }),
        );
        let results = retriever.retrieve("a real query here").await;
        assert!(results[0].starts_with("Known fix for Null pointer fix:"));
    }

    #[tokio::test]
    async fn token_budget_stops_before_exceeding() {
        // ~500-word items, max_tokens_to_add=100 => at most two.
        let word_content = "word ".repeat(500);
        let items = vec![
            item("A", &word_content, 0.9),
            item("B", &word_content, 0.8),
            item("C", &word_content, 0.7),
        ];
        let retriever = PassiveRetriever::new(
            PassiveRetrievalConfig {
                max_tokens_to_add: 100,
                ..PassiveRetrievalConfig::default()
            },
            Arc::new(StubFabric { items }),
        );
        let results = retriever.retrieve("a real query here").await;
        assert!(results.len() <= 2);
    }

    #[test]
    fn inject_replaces_token_with_block() {
        let prompt = "before\n{{PASSIVE_RETRIEVAL}}\nafter";
        let out = inject_into_context(prompt, &["a fact".to_string()]);
        assert!(out.contains("<relevant_knowledge>"));
        assert!(out.contains("• a fact"));
    }

    #[test]
    fn inject_empty_results_yields_empty_replacement() {
        let prompt = "before\n{{PASSIVE_RETRIEVAL}}\nafter";
        let out = inject_into_context(prompt, &[]);
        assert_eq!(out, "before\n\nafter");
    }
}
