use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::{Config, DestinationStore, PositionEvent};
use engine::{
    EvaluationLoop, LoopSettings, OnDemandQuery, Pipeline, PipelineSettings,
    PositionStateMachine, SqliteDestinationStore, TinkoffClient,
};
use strategy::StrategyParams;
use telegram_ctrl::{start_bot, BotDeps, MessageFormat, TelegramSink, BOT_VERSION};

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    let params = StrategyParams::load(&cfg.strategy_config_path);
    info!(
        version = BOT_VERSION,
        instrument = %cfg.instrument,
        interval = %cfg.candle_interval,
        tick_secs = cfg.tick_interval.as_secs(),
        "TrailBot starting"
    );

    // ── Database ──────────────────────────────────────────────────────────────
    let db = SqlitePool::connect(&cfg.database_url)
        .await
        .unwrap_or_else(|e| panic!("Failed to connect to database: {e}"));
    sqlx::migrate!("../../migrations")
        .run(&db)
        .await
        .unwrap_or_else(|e| panic!("Database migration failed: {e}"));
    info!("Database ready");
    let destinations: Arc<dyn DestinationStore> = Arc::new(SqliteDestinationStore::new(db));

    // ── Candle source and pipeline ────────────────────────────────────────────
    let source = TinkoffClient::new(cfg.tinkoff_api_token.clone(), cfg.fetch_timeout)
        .unwrap_or_else(|e| panic!("Failed to build Tinkoff client: {e}"));
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(source),
        PipelineSettings::from_config(&cfg),
        &params,
    ));
    info!(
        window_hours = pipeline.fetch_window().num_hours(),
        required_candles = strategy::IndicatorEngine::from_params(&params).required_candles(),
        "Candle fetch window"
    );

    // ── Evaluation loop ───────────────────────────────────────────────────────
    let bot = teloxide::Bot::new(cfg.telegram_token.clone());
    let format = MessageFormat::new(cfg.instrument.clone(), &params);
    let event_format = format.clone();

    let (evaluation_loop, loop_handle) = EvaluationLoop::new(
        pipeline.clone(),
        PositionStateMachine::new(params.trail_fraction),
        Arc::new(TelegramSink::new(bot.clone())),
        destinations.clone(),
        Box::new(move |event: &PositionEvent| event_format.event(event)),
        LoopSettings {
            tick_interval: cfg.tick_interval,
            notify_timeout: cfg.notify_timeout,
        },
    );

    // ── Telegram commands ─────────────────────────────────────────────────────
    let bot_deps = BotDeps {
        query: OnDemandQuery::new(pipeline, evaluation_loop.position_reader()),
        destinations,
        format,
        allowed_user_ids: Arc::new(cfg.telegram_allowed_user_ids.clone()),
    };

    // ── Spawn tasks ───────────────────────────────────────────────────────────
    let mut loop_task = tokio::spawn(evaluation_loop.run());
    tokio::spawn(start_bot(bot, bot_deps));

    info!("All subsystems started. Waiting for shutdown signal.");
    let early = tokio::select! {
        joined = &mut loop_task => Some(joined),
        _ = tokio::signal::ctrl_c() => None,
    };
    let finished = match early {
        Some(joined) => joined,
        None => {
            info!("Shutdown signal received");
            loop_handle.shutdown();
            loop_task.await
        }
    };

    match finished {
        Ok(Ok(())) => info!("Evaluation loop stopped. Exiting."),
        Ok(Err(e)) => {
            error!(error = %e, "Evaluation loop failed");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "Evaluation loop task panicked");
            std::process::exit(1);
        }
    }
}
