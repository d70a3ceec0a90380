use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV bar as returned by the candle source.
/// Sequences are ordered by timestamp, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// True when every price and the volume are finite numbers.
    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Candle resolution requested from the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CandleInterval {
    Minute1,
    Minute5,
    Minute15,
    #[default]
    Hour,
    Day,
}

impl CandleInterval {
    pub fn duration(&self) -> chrono::Duration {
        match self {
            CandleInterval::Minute1 => chrono::Duration::minutes(1),
            CandleInterval::Minute5 => chrono::Duration::minutes(5),
            CandleInterval::Minute15 => chrono::Duration::minutes(15),
            CandleInterval::Hour => chrono::Duration::hours(1),
            CandleInterval::Day => chrono::Duration::days(1),
        }
    }
}

impl std::str::FromStr for CandleInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" | "minute1" => Ok(CandleInterval::Minute1),
            "5m" | "minute5" => Ok(CandleInterval::Minute5),
            "15m" | "minute15" => Ok(CandleInterval::Minute15),
            "1h" | "hour" => Ok(CandleInterval::Hour),
            "1d" | "day" => Ok(CandleInterval::Day),
            other => Err(format!("unknown candle interval '{other}'")),
        }
    }
}

impl std::fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandleInterval::Minute1 => write!(f, "1m"),
            CandleInterval::Minute5 => write!(f, "5m"),
            CandleInterval::Minute15 => write!(f, "15m"),
            CandleInterval::Hour => write!(f, "1h"),
            CandleInterval::Day => write!(f, "1d"),
        }
    }
}

/// Indicator values for a single candle. `None` means not enough history.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub ema_trend: Option<f64>,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    /// Reported alongside +DI, never used by the signal decision.
    pub minus_di: Option<f64>,
    pub volume_ma: Option<f64>,
}

impl IndicatorSet {
    pub fn is_defined(&self) -> bool {
        self.ema_trend.is_some()
            && self.adx.is_some()
            && self.plus_di.is_some()
            && self.minus_di.is_some()
            && self.volume_ma.is_some()
    }
}

/// Trade decision produced by the signal evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    #[default]
    None,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::None => write!(f, "NONE"),
        }
    }
}

/// Individual strategy conditions plus the combined signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SignalResult {
    pub adx_condition: bool,
    pub volume_condition: bool,
    pub directional_condition: bool,
    pub trend_condition: bool,
    pub signal: Signal,
}

/// An open long position. Only exists while the position is open, so the
/// trailing stop is always defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry_price: f64,
    /// Highest close seen since entry, entry included.
    pub best_price: f64,
    pub trailing_stop: f64,
    pub opened_at: DateTime<Utc>,
}

impl OpenPosition {
    /// Unrealized PnL in percent at `price`.
    pub fn pnl_pct(&self, price: f64) -> f64 {
        pnl_pct(self.entry_price, price)
    }
}

/// State of the single simulated position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PositionState {
    #[default]
    Flat,
    Long(OpenPosition),
}

impl PositionState {
    pub fn is_open(&self) -> bool {
        matches!(self, PositionState::Long(_))
    }

    pub fn open_position(&self) -> Option<&OpenPosition> {
        match self {
            PositionState::Long(p) => Some(p),
            PositionState::Flat => None,
        }
    }
}

impl std::fmt::Display for PositionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionState::Flat => write!(f, "flat"),
            PositionState::Long(_) => write!(f, "long"),
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitReason {
    TrailingStop,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::TrailingStop => write!(f, "trailing-stop"),
        }
    }
}

/// Emitted by the position state machine, at most one per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PositionEvent {
    Entry {
        entry_price: f64,
        conditions: SignalResult,
    },
    Update {
        current_price: f64,
        entry_price: f64,
        trailing_stop: f64,
        pnl_pct: f64,
    },
    Exit {
        reason: ExitReason,
        exit_price: f64,
        entry_price: f64,
        pnl_pct: f64,
    },
}

impl PositionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PositionEvent::Entry { .. } => "entry",
            PositionEvent::Update { .. } => "update",
            PositionEvent::Exit { .. } => "exit",
        }
    }
}

/// Read-only view returned to on-demand queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub instrument: String,
    pub candle: Candle,
    pub indicators: IndicatorSet,
    pub signal: SignalResult,
    pub position: PositionState,
    pub taken_at: DateTime<Utc>,
}

/// `(price - entry) / entry * 100`.
pub fn pnl_pct(entry_price: f64, price: f64) -> f64 {
    (price - entry_price) / entry_price * 100.0
}
