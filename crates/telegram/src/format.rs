//! Plain-text rendering of position events and signal snapshots.

use common::{PositionEvent, PositionState, Signal, SignalResult, SignalSnapshot};
use strategy::StrategyParams;

pub const BOT_VERSION: &str = env!("CARGO_PKG_VERSION");

fn mark(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "❌"
    }
}

fn num(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

/// Renders messages with the configured thresholds so every line can show
/// what it was compared against.
#[derive(Debug, Clone)]
pub struct MessageFormat {
    pub instrument: String,
    pub ema_period: usize,
    pub volume_window: usize,
    pub adx_threshold: f64,
}

impl MessageFormat {
    pub fn new(instrument: impl Into<String>, params: &StrategyParams) -> Self {
        Self {
            instrument: instrument.into(),
            ema_period: params.ema_period,
            volume_window: params.volume_window,
            adx_threshold: params.adx_threshold,
        }
    }

    pub fn greeting(&self) -> String {
        format!(
            "Subscribed to {} signals.\n\
             You will be notified on entry, every update and exit.\n\
             Version: {BOT_VERSION}",
            self.instrument
        )
    }

    pub fn event(&self, event: &PositionEvent) -> String {
        match event {
            PositionEvent::Entry {
                entry_price,
                conditions,
            } => {
                let mut lines = vec![format!(
                    "🟢 LONG opened on {} at {entry_price:.2}",
                    self.instrument
                )];
                lines.extend(self.condition_marks(conditions));
                lines.join("\n")
            }
            PositionEvent::Update {
                current_price,
                entry_price,
                trailing_stop,
                pnl_pct,
            } => format!(
                "📈 {} position update\n\
                 Price: {current_price:.2}\n\
                 Entry: {entry_price:.2}\n\
                 Trailing stop: {trailing_stop:.2}\n\
                 PnL: {pnl_pct:+.2}%",
                self.instrument
            ),
            PositionEvent::Exit {
                reason,
                exit_price,
                entry_price,
                pnl_pct,
            } => format!(
                "🔴 LONG closed on {} ({reason})\n\
                 Exit: {exit_price:.2}\n\
                 Entry: {entry_price:.2}\n\
                 PnL: {pnl_pct:+.2}%",
                self.instrument
            ),
        }
    }

    pub fn snapshot(&self, snap: &SignalSnapshot) -> String {
        let ind = &snap.indicators;
        let cond = &snap.signal;
        let price = snap.candle.close;

        let mut lines = vec![
            format!("📊 {} strategy parameters:", snap.instrument),
            format!(
                "ADX: {} {} (threshold > {})",
                num(ind.adx),
                mark(cond.adx_condition),
                self.adx_threshold
            ),
            format!(
                "Volume: {:.0} {} (MA{} = {})",
                snap.candle.volume,
                mark(cond.volume_condition),
                self.volume_window,
                ind.volume_ma.map_or_else(|| "-".to_string(), |v| format!("{v:.0}"))
            ),
            format!(
                "EMA{}: {} {} (price {price:.2} > EMA)",
                self.ema_period,
                num(ind.ema_trend),
                mark(cond.trend_condition)
            ),
            format!(
                "+DI / -DI: {} / {} {} (+DI > 0)",
                num(ind.plus_di),
                num(ind.minus_di),
                mark(cond.directional_condition)
            ),
        ];

        match cond.signal {
            Signal::Buy => lines.push("\n✅ Strategy signal: BUY".to_string()),
            Signal::None => lines.push("\n❌ No strategy signal".to_string()),
        }

        lines.push(format!("\nCurrent price: {price:.2}"));
        match snap.position {
            PositionState::Long(pos) => {
                lines.push(format!("Position: {}", snap.position));
                lines.push(format!("Entry price: {:.2}", pos.entry_price));
                lines.push(format!("Trailing stop: {:.2}", pos.trailing_stop));
                lines.push(format!("PnL: {:+.2}%", pos.pnl_pct(price)));
            }
            PositionState::Flat => {
                lines.push("Position: -".to_string());
                lines.push("Entry price: -".to_string());
                lines.push("Trailing stop: -".to_string());
                lines.push("PnL: -".to_string());
            }
        }

        lines.push(format!("\n🧩 Bot version: {BOT_VERSION}"));
        lines.join("\n")
    }

    fn condition_marks(&self, cond: &SignalResult) -> Vec<String> {
        vec![
            format!("ADX > {}: {}", self.adx_threshold, mark(cond.adx_condition)),
            format!("Volume > MA{}: {}", self.volume_window, mark(cond.volume_condition)),
            format!("+DI > 0: {}", mark(cond.directional_condition)),
            format!("Close > EMA{}: {}", self.ema_period, mark(cond.trend_condition)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::{Candle, ExitReason, IndicatorSet, OpenPosition};

    fn fmt() -> MessageFormat {
        MessageFormat::new("SBER", &StrategyParams::default())
    }

    fn buy() -> SignalResult {
        SignalResult {
            adx_condition: true,
            volume_condition: true,
            directional_condition: true,
            trend_condition: true,
            signal: Signal::Buy,
        }
    }

    fn snapshot(position: PositionState) -> SignalSnapshot {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        SignalSnapshot {
            instrument: "SBER".into(),
            candle: Candle {
                timestamp: ts,
                open: 250.0,
                high: 251.0,
                low: 249.0,
                close: 250.0,
                volume: 12_345.0,
            },
            indicators: IndicatorSet {
                ema_trend: Some(245.5),
                adx: Some(27.25),
                plus_di: Some(31.0),
                minus_di: Some(12.0),
                volume_ma: Some(10_000.0),
            },
            signal: buy(),
            position,
            taken_at: ts,
        }
    }

    #[test]
    fn entry_lists_every_condition() {
        let text = fmt().event(&PositionEvent::Entry {
            entry_price: 250.0,
            conditions: buy(),
        });
        assert!(text.contains("250.00"));
        assert_eq!(text.matches('✅').count(), 4);
        assert!(text.contains("ADX > 23"));
    }

    #[test]
    fn update_and_exit_show_key_numbers() {
        let update = fmt().event(&PositionEvent::Update {
            current_price: 253.0,
            entry_price: 250.0,
            trailing_stop: 249.2,
            pnl_pct: 1.2,
        });
        assert!(update.contains("253.00"));
        assert!(update.contains("249.20"));
        assert!(update.contains("+1.20%"));

        let exit = fmt().event(&PositionEvent::Exit {
            reason: ExitReason::TrailingStop,
            exit_price: 99.0,
            entry_price: 100.0,
            pnl_pct: -1.0,
        });
        assert!(exit.contains("trailing-stop"));
        assert!(exit.contains("99.00"));
        assert!(exit.contains("-1.00%"));
    }

    #[test]
    fn flat_snapshot_uses_dashes() {
        let text = fmt().snapshot(&snapshot(PositionState::Flat));
        assert!(text.contains("Strategy signal: BUY"));
        assert!(text.contains("ADX: 27.25 ✅"));
        assert!(text.contains("Entry price: -"));
        assert!(text.contains(BOT_VERSION));
    }

    #[test]
    fn long_snapshot_shows_pnl() {
        let ts = Utc.timestamp_opt(1_699_990_000, 0).unwrap();
        let pos = OpenPosition {
            entry_price: 200.0,
            best_price: 250.0,
            trailing_stop: 246.25,
            opened_at: ts,
        };
        let text = fmt().snapshot(&snapshot(PositionState::Long(pos)));
        assert!(text.contains("Entry price: 200.00"));
        assert!(text.contains("Trailing stop: 246.25"));
        assert!(text.contains("PnL: +25.00%"));
    }

    #[test]
    fn undefined_indicators_render_as_dash() {
        let mut snap = snapshot(PositionState::Flat);
        snap.indicators = IndicatorSet::default();
        snap.signal = SignalResult::default();
        let text = fmt().snapshot(&snap);
        assert!(text.contains("ADX: - ❌"));
        assert!(text.contains("No strategy signal"));
    }
}
