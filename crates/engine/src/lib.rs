pub mod lifecycle;
pub mod pipeline;
pub mod position;
pub mod query;
pub mod store;
pub mod tinkoff;

pub use lifecycle::{EvaluationLoop, EventFormatter, LoopHandle, LoopSettings};
pub use pipeline::{Evaluation, Pipeline, PipelineSettings};
pub use position::{PositionReader, PositionStateMachine};
pub use query::OnDemandQuery;
pub use store::SqliteDestinationStore;
pub use tinkoff::TinkoffClient;
