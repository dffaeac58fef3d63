//! Next-scene prediction: speculative context assembly triggered by
//! keystrokes, bounded to `<=50ms`.
//!
//! A `dashmap`-backed per-key cache fronts a bounded `tokio::mpsc`
//! prefetch queue, covering the three `CubeType` lanes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::PredictionConfig;
use crate::external::{KnowledgeFabric, KnowledgeSearchQuery};
use crate::skills::SkillStore;
use crate::types::CubeType;

/// One piece of speculatively-fetched context.
#[derive(Debug, Clone)]
pub struct PredictedCube {
    pub cube_type: CubeType,
    pub title: String,
    pub content: String,
}

/// Cache entry state: `Pending` marks an in-flight computation so a
/// racing caller does not duplicate the work; `Ready` holds the final
/// result that overwrites the sentinel on completion.
#[derive(Debug, Clone)]
enum CacheState {
    Pending,
    Ready(Vec<PredictedCube>),
}

const CODE_INTENT_WORDS: &[&str] = &[
    "code", "implement", "function", "fix", "bug", "error", "class", "method",
];
const TOOL_INTENT_WORDS: &[&str] = &["run", "execute", "command", "shell", "terminal"];

/// Intent signals extracted from the lowercased input.
#[derive(Debug, Clone, Copy, Default)]
struct Signals {
    code_intent: bool,
    tool_intent: bool,
}

impl Signals {
    fn extract(lowered: &str) -> Self {
        Self {
            code_intent: CODE_INTENT_WORDS.iter().any(|w| lowered.contains(w)),
            tool_intent: TOOL_INTENT_WORDS.iter().any(|w| lowered.contains(w)) || lowered.starts_with('/'),
        }
    }
}

struct Inner {
    config: PredictionConfig,
    fabric: Arc<dyn KnowledgeFabric>,
    skills: Arc<SkillStore>,
    cache: DashMap<String, CacheState>,
}

impl Inner {
    async fn predict_core(self: &Arc<Self>, input: &str, deadline: Duration) -> Option<Vec<PredictedCube>> {
        if input.chars().count() < self.config.min_input_len {
            return None;
        }

        match self.cache.entry(input.to_string()) {
            Entry::Occupied(entry) => match entry.get() {
                CacheState::Ready(cubes) => return Some(cubes.clone()),
                // Another caller's computation is already in flight;
                // this call yields nothing rather than duplicating the
                // work or blocking on the racer.
                CacheState::Pending => return None,
            },
            Entry::Vacant(entry) => {
                entry.insert(CacheState::Pending);
            }
        }

        let result = self.run_branches(input, deadline).await;
        self.cache.insert(input.to_string(), CacheState::Ready(result.clone()));
        Some(result)
    }

    async fn run_branches(self: &Arc<Self>, input: &str, deadline: Duration) -> Vec<PredictedCube> {
        let cancel = Arc::new(AtomicBool::new(false));
        let buffer: Arc<Mutex<Vec<PredictedCube>>> = Arc::new(Mutex::new(Vec::new()));
        let lowered = input.to_lowercase();
        let signals = Signals::extract(&lowered);

        let knowledge = Self::query_knowledge(
            self.fabric.clone(),
            input.to_string(),
            self.config.knowledge_limit,
            cancel.clone(),
            buffer.clone(),
        );
        let skills = async {
            if signals.code_intent {
                Self::query_skills(
                    self.skills.clone(),
                    input.to_string(),
                    self.config.skill_limit,
                    cancel.clone(),
                    buffer.clone(),
                )
                .await;
            }
        };
        let tools = async {
            if signals.tool_intent {
                Self::query_tools(
                    self.fabric.clone(),
                    input.to_string(),
                    self.config.tool_limit,
                    cancel.clone(),
                    buffer.clone(),
                )
                .await;
            }
        };

        let fanned_out = async {
            tokio::join!(knowledge, skills, tools);
        };
        if tokio::time::timeout(deadline, fanned_out).await.is_err() {
            // Partial results from the branches still running are
            // dropped rather than returned.
            cancel.store(true, Ordering::Relaxed);
        }

        let result = buffer.lock().clone();
        result
    }

    async fn query_knowledge(
        fabric: Arc<dyn KnowledgeFabric>,
        query: String,
        limit: usize,
        cancel: Arc<AtomicBool>,
        buffer: Arc<Mutex<Vec<PredictedCube>>>,
    ) {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        let Ok(result) = fabric
            .search(
                &query,
                KnowledgeSearchQuery {
                    limit,
                    min_trust: 0.0,
                    tiers: Vec::new(),
                },
            )
            .await
        else {
            return;
        };
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        let mut buf = buffer.lock();
        for item in result.items {
            buf.push(PredictedCube {
                cube_type: CubeType::Text,
                title: item.title,
                content: item.content,
            });
        }
    }

    async fn query_tools(
        fabric: Arc<dyn KnowledgeFabric>,
        query: String,
        limit: usize,
        cancel: Arc<AtomicBool>,
        buffer: Arc<Mutex<Vec<PredictedCube>>>,
    ) {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        let Ok(result) = fabric
            .search(
                &query,
                KnowledgeSearchQuery {
                    limit,
                    min_trust: 0.0,
                    tiers: vec!["tool".to_string()],
                },
            )
            .await
        else {
            return;
        };
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        let mut buf = buffer.lock();
        for item in result.items {
            buf.push(PredictedCube {
                cube_type: CubeType::Tool,
                title: item.title,
                content: item.content,
            });
        }
    }

    async fn query_skills(
        skills: Arc<SkillStore>,
        query: String,
        limit: usize,
        cancel: Arc<AtomicBool>,
        buffer: Arc<Mutex<Vec<PredictedCube>>>,
    ) {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        let Ok(found) = skills.find_relevant_skills(&query, limit).await else {
            return;
        };
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        let mut buf = buffer.lock();
        for skill in found {
            buf.push(PredictedCube {
                cube_type: CubeType::Skill,
                title: skill.name,
                content: skill.description,
            });
        }
    }
}

/// Speculative context assembler used while the user is still typing.
/// Owns a bounded prefetch worker consuming a channel of candidate
/// inputs.
pub struct NextScenePredictor {
    inner: Arc<Inner>,
    prefetch_tx: Mutex<Option<mpsc::Sender<String>>>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
}

impl NextScenePredictor {
    #[must_use]
    pub fn new(config: PredictionConfig, fabric: Arc<dyn KnowledgeFabric>, skills: Arc<SkillStore>) -> Self {
        let inner = Arc::new(Inner {
            config,
            fabric,
            skills,
            cache: DashMap::new(),
        });
        let (tx, rx) = mpsc::channel(inner.config.prefetch_channel_capacity);
        let worker_inner = inner.clone();
        let handle = tokio::spawn(Self::run_prefetch_worker(worker_inner, rx));
        Self {
            inner,
            prefetch_tx: Mutex::new(Some(tx)),
            worker_handle: Mutex::new(Some(handle)),
        }
    }

    /// Inputs shorter than `min_input_len` return `None` with no work
    /// done. Otherwise runs the cached/fan-out prediction bounded by
    /// `predict_timeout_ms`.
    pub async fn predict(&self, input: &str) -> Option<Vec<PredictedCube>> {
        let deadline = Duration::from_millis(self.inner.config.predict_timeout_ms);
        self.inner.predict_core(input, deadline).await
    }

    /// Non-blocking offer to the prefetch worker; a full channel or a
    /// closed predictor silently drops the request.
    pub fn prefetch(&self, input: &str) {
        if let Some(tx) = self.prefetch_tx.lock().as_ref() {
            let _ = tx.try_send(input.to_string());
        }
    }

    /// Drops every cached entry so the next [`Self::predict`] call for a
    /// previously-seen input recomputes.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.inner.cache.len()
    }

    /// Signals the prefetch worker to stop and joins it.
    pub async fn close(&self) {
        self.prefetch_tx.lock().take();
        let handle = self.worker_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    async fn run_prefetch_worker(inner: Arc<Inner>, mut rx: mpsc::Receiver<String>) {
        let deadline = Duration::from_millis(inner.config.prefetch_timeout_ms);
        while let Some(input) = rx.recv().await {
            if inner.cache.contains_key(&input) {
                continue;
            }
            let _ = inner.predict_core(&input, deadline).await;
        }
    }
}

/// Formats non-empty `cubes` as a `<predicted_context>` block, prefixing
/// skill rows with `[Skill] ` and tool rows with `[Tool] `, truncating
/// content to 150 chars with `...`.
#[must_use]
pub fn inject_predicted_cubes(cubes: Option<&[PredictedCube]>) -> String {
    let Some(cubes) = cubes else {
        return String::new();
    };
    if cubes.is_empty() {
        return String::new();
    }

    let mut out = String::from("<predicted_context>\n");
    for cube in cubes {
        let prefix = match cube.cube_type {
            CubeType::Skill => "[Skill] ",
            CubeType::Tool => "[Tool] ",
            CubeType::Text => "",
        };
        out.push_str(prefix);
        out.push_str(&cube.title);
        out.push_str(": ");
        out.push_str(&truncate_with_ellipsis(&cube.content, 150));
        out.push('\n');
    }
    out.push_str("</predicted_context>\n");
    out
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}
