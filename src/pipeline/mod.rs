pub mod aggregator;
pub mod events;
pub mod orchestrator;
pub mod partitioner;
pub mod phase;
pub mod results;
pub mod state;
pub mod worker_pool;

pub use aggregator::Aggregator;
pub use events::RunEvent;
pub use orchestrator::{AnalysisEngine, AnalysisOrchestrator, RunReport};
pub use phase::RunPhase;
pub use results::{CompletedPartition, ResultCollector};
pub use state::{EngineConfig, RunProgress, RunState};
pub use worker_pool::WorkerPool;
