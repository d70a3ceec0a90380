pub mod config;
pub mod engine;
pub mod indicators;
pub mod signal;

pub use config::StrategyParams;
pub use engine::IndicatorEngine;
pub use signal::SignalEvaluator;
