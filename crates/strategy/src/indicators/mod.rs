pub mod adx;
pub mod ema;
pub mod sma;

pub use adx::{directional, DirectionalSeries};
pub use ema::ema_series;
pub use sma::rolling_mean;
