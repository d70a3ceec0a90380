use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Candle, CandleInterval, CandleSource, Error, Result};

const BASE_URL: &str = "https://invest-public-api.tinkoff.ru/rest";
const GET_CANDLES: &str = "/tinkoff.public.invest.api.contract.v1.MarketDataService/GetCandles";

/// REST client for the Tinkoff Invest market data API. Read-only: only
/// historical candles are requested.
pub struct TinkoffClient {
    token: String,
    http: Client,
}

impl TinkoffClient {
    pub fn new(token: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            token: token.into(),
            http,
        })
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<String> {
        let url = format!("{BASE_URL}{path}");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::DataUnavailable(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::DataUnavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::DataUnavailable(format!("HTTP {status}: {text}")));
        }
        Ok(text)
    }
}

#[async_trait]
impl CandleSource for TinkoffClient {
    async fn fetch(
        &self,
        instrument: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        interval: CandleInterval,
    ) -> Result<Vec<Candle>> {
        let request = CandlesRequest {
            figi: instrument,
            from: from.to_rfc3339(),
            to: to.to_rfc3339(),
            interval: interval_name(interval),
        };
        debug!(instrument, %from, %to, %interval, "Requesting candles from Tinkoff");
        let body = self.post(GET_CANDLES, &request).await?;
        parse_candles(&body)
    }
}

fn interval_name(interval: CandleInterval) -> &'static str {
    match interval {
        CandleInterval::Minute1 => "CANDLE_INTERVAL_1_MIN",
        CandleInterval::Minute5 => "CANDLE_INTERVAL_5_MIN",
        CandleInterval::Minute15 => "CANDLE_INTERVAL_15_MIN",
        CandleInterval::Hour => "CANDLE_INTERVAL_HOUR",
        CandleInterval::Day => "CANDLE_INTERVAL_DAY",
    }
}

/// Parse a `GetCandles` response body. An empty candle list is an error.
pub fn parse_candles(body: &str) -> Result<Vec<Candle>> {
    let resp: CandlesResponse = serde_json::from_str(body)
        .map_err(|e| Error::DataUnavailable(format!("bad candles response: {e}")))?;

    if resp.candles.is_empty() {
        return Err(Error::DataUnavailable("no candles returned".into()));
    }

    resp.candles
        .into_iter()
        .map(|c| -> Result<Candle> {
            Ok(Candle {
                timestamp: c.time,
                open: c.open.to_f64()?,
                high: c.high.to_f64()?,
                low: c.low.to_f64()?,
                close: c.close.to_f64()?,
                volume: c.volume.to_i64()? as f64,
            })
        })
        .collect()
}

// ─── Request / response types ────────────────────────────────────────────────

#[derive(Serialize)]
struct CandlesRequest<'a> {
    figi: &'a str,
    from: String,
    to: String,
    interval: &'static str,
}

#[derive(Deserialize)]
struct CandlesResponse {
    #[serde(default)]
    candles: Vec<HistoricCandle>,
}

#[derive(Deserialize)]
struct HistoricCandle {
    open: Quotation,
    high: Quotation,
    low: Quotation,
    close: Quotation,
    volume: Int64,
    time: DateTime<Utc>,
}

/// Fixed-point price: `units + nano / 1e9`.
#[derive(Deserialize)]
struct Quotation {
    units: Int64,
    #[serde(default)]
    nano: i32,
}

impl Quotation {
    fn to_f64(&self) -> Result<f64> {
        Ok(self.units.to_i64()? as f64 + f64::from(self.nano) / 1e9)
    }
}

/// 64-bit integers arrive as JSON strings; accept plain numbers too.
#[derive(Deserialize)]
#[serde(untagged)]
enum Int64 {
    Num(i64),
    Str(String),
}

impl Int64 {
    fn to_i64(&self) -> Result<i64> {
        match self {
            Int64::Num(n) => Ok(*n),
            Int64::Str(s) => s
                .parse()
                .map_err(|_| Error::DataUnavailable(format!("bad integer '{s}'"))),
        }
    }
}
