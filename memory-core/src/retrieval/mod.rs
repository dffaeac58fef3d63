//! Latency-bounded retrieval layer: passive retrieval and next-scene
//! prediction, both bounded to `<=50ms`.

pub mod next_scene;
pub mod passive;

pub use next_scene::{NextScenePredictor, PredictedCube, inject_predicted_cubes};
pub use passive::{MetricsSnapshot, PassiveRetrievalMetrics, PassiveRetriever, inject_into_context};
