use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use common::{DestinationStore, Error, NotificationSink, PositionEvent, Result};

use crate::pipeline::Pipeline;
use crate::position::{PositionReader, PositionStateMachine};

/// Turns a position event into the text handed to the sink.
pub type EventFormatter = Box<dyn Fn(&PositionEvent) -> String + Send + Sync>;

/// Cloneable handle used to stop the loop from outside.
#[derive(Clone)]
pub struct LoopHandle {
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl LoopHandle {
    /// Ask the loop to stop. A tick already running completes first.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

/// Timing knobs of the evaluation loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub tick_interval: Duration,
    pub notify_timeout: Duration,
}

/// Recurring driver: fetch → indicators → signal → position → notify.
///
/// Ticks never overlap: the next tick waits until the current one, including
/// delivery, is done. Only this loop mutates the position.
pub struct EvaluationLoop {
    pipeline: Arc<Pipeline>,
    machine: PositionStateMachine,
    sink: Arc<dyn NotificationSink>,
    destinations: Arc<dyn DestinationStore>,
    formatter: EventFormatter,
    settings: LoopSettings,
    shutdown_rx: watch::Receiver<bool>,
}

impl EvaluationLoop {
    pub fn new(
        pipeline: Arc<Pipeline>,
        machine: PositionStateMachine,
        sink: Arc<dyn NotificationSink>,
        destinations: Arc<dyn DestinationStore>,
        formatter: EventFormatter,
        settings: LoopSettings,
    ) -> (Self, LoopHandle) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = LoopHandle {
            shutdown_tx: Arc::new(shutdown_tx),
        };
        let evaluation_loop = Self {
            pipeline,
            machine,
            sink,
            destinations,
            formatter,
            settings,
            shutdown_rx,
        };
        (evaluation_loop, handle)
    }

    pub fn position_reader(&self) -> PositionReader {
        self.machine.reader()
    }

    /// Run until shutdown. The first tick fires immediately.
    ///
    /// Returns `Err` only for a fatal error (corrupted position state); every
    /// other failure abandons the tick and waits for the next one.
    /// Call from `tokio::spawn`.
    pub async fn run(mut self) -> Result<()> {
        info!(
            instrument = %self.pipeline.instrument(),
            interval = ?self.settings.tick_interval,
            "Evaluation loop running"
        );

        let mut ticker = tokio::time::interval(self.settings.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    info!("Evaluation loop stopping");
                    return Ok(());
                }

                _ = ticker.tick() => {
                    match self.run_tick().await {
                        Ok(_) => {}
                        Err(e) if e.is_fatal() => {
                            error!(error = %e, "Position state corrupted, stopping loop");
                            return Err(e);
                        }
                        Err(e) => {
                            warn!(error = %e, "Tick abandoned, position unchanged");
                        }
                    }
                }
            }
        }
    }

    /// Run a single tick. Any error before the position transition leaves
    /// the position untouched. Delivery problems are logged, not returned.
    pub async fn run_tick(&mut self) -> Result<Option<PositionEvent>> {
        let eval = self.pipeline.evaluate().await?;
        info!(
            instrument = %self.pipeline.instrument(),
            close = eval.candle.close,
            ema = ?eval.indicators.ema_trend,
            adx = ?eval.indicators.adx,
            plus_di = ?eval.indicators.plus_di,
            volume = eval.candle.volume,
            volume_ma = ?eval.indicators.volume_ma,
            signal = %eval.signal.signal,
            "Tick evaluated"
        );

        let event = self.machine.advance(&eval.candle, &eval.signal)?;
        if let Some(event) = &event {
            self.notify(event).await;
        }
        Ok(event)
    }

    async fn notify(&self, event: &PositionEvent) {
        let timeout = self.settings.notify_timeout;
        let destinations = match tokio::time::timeout(timeout, self.destinations.list()).await {
            Ok(Ok(d)) => d,
            Ok(Err(e)) => {
                warn!(error = %e, kind = event.kind(), "Destination lookup failed, not delivered");
                return;
            }
            Err(_) => {
                warn!(kind = event.kind(), ?timeout, "Destination lookup timed out, not delivered");
                return;
            }
        };
        if destinations.is_empty() {
            debug!(kind = event.kind(), "No subscribers, event not delivered");
            return;
        }

        let text = (self.formatter)(event);
        for destination in destinations {
            let delivery = tokio::time::timeout(timeout, self.sink.deliver(destination, &text))
                .await
                .unwrap_or_else(|_| {
                    Err(Error::NotificationDeliveryFailed(format!(
                        "timed out after {timeout:?}"
                    )))
                });

            match delivery {
                Ok(()) => info!(destination, kind = event.kind(), "Notification delivered"),
                Err(e) => warn!(
                    destination,
                    kind = event.kind(),
                    error = %e,
                    "Notification not delivered"
                ),
            }
        }
    }
}
