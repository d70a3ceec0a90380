use tokio::sync::watch;
use tracing::{debug, info};

use common::{
    pnl_pct, Candle, Error, ExitReason, OpenPosition, PositionEvent, PositionState, Result, Signal,
    SignalResult,
};

/// Owns the single simulated long position and its trailing stop.
///
/// Only the evaluation loop holds this value. Every other component sees the
/// position through a [`PositionReader`], which always observes a complete
/// state: the new state is published in one step after each transition.
pub struct PositionStateMachine {
    trail_fraction: f64,
    state: PositionState,
    published: watch::Sender<PositionState>,
}

/// Cloneable read-only view of the current position.
#[derive(Clone)]
pub struct PositionReader {
    rx: watch::Receiver<PositionState>,
}

impl PositionReader {
    pub fn snapshot(&self) -> PositionState {
        *self.rx.borrow()
    }
}

impl PositionStateMachine {
    pub fn new(trail_fraction: f64) -> Self {
        assert!(
            trail_fraction > 0.0 && trail_fraction < 1.0,
            "trail fraction must be in (0, 1), got {trail_fraction}"
        );
        let (published, _) = watch::channel(PositionState::Flat);
        Self {
            trail_fraction,
            state: PositionState::Flat,
            published,
        }
    }

    pub fn reader(&self) -> PositionReader {
        PositionReader {
            rx: self.published.subscribe(),
        }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    /// Advance one tick with the latest candle and signal.
    ///
    /// Order is fixed: an open position is updated (and possibly closed)
    /// first; only a position that was already flat before this tick can
    /// open. So a tick never both exits and re-enters.
    ///
    /// A bad close price is rejected before anything changes. A corrupted
    /// open position yields `Error::InvalidState`.
    pub fn advance(
        &mut self,
        candle: &Candle,
        signal: &SignalResult,
    ) -> Result<Option<PositionEvent>> {
        let close = candle.close;
        if !(close.is_finite() && close > 0.0) {
            return Err(Error::DataUnavailable(format!("invalid close price {close}")));
        }

        let (next, event) = match self.state {
            PositionState::Long(pos) => {
                self.check_invariants(&pos)?;
                let best_price = pos.best_price.max(close);
                let trailing_stop = self.stop_for(best_price);

                if close <= trailing_stop {
                    let pnl = pnl_pct(pos.entry_price, close);
                    info!(
                        entry = pos.entry_price,
                        exit = close,
                        stop = trailing_stop,
                        pnl_pct = pnl,
                        "Trailing stop hit, position closed"
                    );
                    let event = PositionEvent::Exit {
                        reason: ExitReason::TrailingStop,
                        exit_price: close,
                        entry_price: pos.entry_price,
                        pnl_pct: pnl,
                    };
                    (PositionState::Flat, Some(event))
                } else {
                    let updated = OpenPosition {
                        best_price,
                        trailing_stop,
                        ..pos
                    };
                    debug!(
                        price = close,
                        best = best_price,
                        stop = trailing_stop,
                        "Position updated"
                    );
                    let event = PositionEvent::Update {
                        current_price: close,
                        entry_price: pos.entry_price,
                        trailing_stop,
                        pnl_pct: updated.pnl_pct(close),
                    };
                    (PositionState::Long(updated), Some(event))
                }
            }

            PositionState::Flat if signal.signal == Signal::Buy => {
                let opened = OpenPosition {
                    entry_price: close,
                    best_price: close,
                    trailing_stop: self.stop_for(close),
                    opened_at: candle.timestamp,
                };
                info!(entry = close, stop = opened.trailing_stop, "BUY signal, position opened");
                let event = PositionEvent::Entry {
                    entry_price: close,
                    conditions: *signal,
                };
                (PositionState::Long(opened), Some(event))
            }

            PositionState::Flat => (PositionState::Flat, None),
        };

        self.state = next;
        self.published.send_replace(next);
        Ok(event)
    }

    fn stop_for(&self, best_price: f64) -> f64 {
        best_price * (1.0 - self.trail_fraction)
    }

    fn check_invariants(&self, pos: &OpenPosition) -> Result<()> {
        if !(pos.entry_price.is_finite() && pos.entry_price > 0.0) {
            return Err(Error::InvalidState(format!("entry price {}", pos.entry_price)));
        }
        if !pos.trailing_stop.is_finite() {
            return Err(Error::InvalidState(format!("trailing stop {}", pos.trailing_stop)));
        }
        if pos.best_price < pos.entry_price {
            return Err(Error::InvalidState(format!(
                "best price {} below entry {}",
                pos.best_price, pos.entry_price
            )));
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn force_state(&mut self, state: PositionState) {
        self.state = state;
        self.published.send_replace(state);
    }
}
