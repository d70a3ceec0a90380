use std::sync::Arc;

use chrono::Utc;

use common::{Candle, Result, SignalSnapshot};

use crate::pipeline::{Evaluation, Pipeline};
use crate::position::PositionReader;

/// Read-only counterpart of the evaluation loop for interactive commands.
/// Runs the same pipeline and reads the live position, never advancing it.
#[derive(Clone)]
pub struct OnDemandQuery {
    pipeline: Arc<Pipeline>,
    position: PositionReader,
}

impl OnDemandQuery {
    pub fn new(pipeline: Arc<Pipeline>, position: PositionReader) -> Self {
        Self { pipeline, position }
    }

    /// Fetch fresh candles and describe the current signal and position.
    pub async fn snapshot(&self) -> Result<SignalSnapshot> {
        let eval = self.pipeline.evaluate().await?;
        Ok(self.assemble(eval))
    }

    /// Same as [`snapshot`](Self::snapshot) over candles the caller already has.
    pub fn snapshot_of(&self, candles: &[Candle]) -> Result<SignalSnapshot> {
        let eval = self.pipeline.evaluate_candles(candles)?;
        Ok(self.assemble(eval))
    }

    fn assemble(&self, eval: Evaluation) -> SignalSnapshot {
        SignalSnapshot {
            instrument: self.pipeline.instrument().to_string(),
            candle: eval.candle,
            indicators: eval.indicators,
            signal: eval.signal,
            position: self.position.snapshot(),
            taken_at: Utc::now(),
        }
    }
}
