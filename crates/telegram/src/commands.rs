use std::sync::Arc;

use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
    utils::command::BotCommands,
};
use tracing::{info, warn};

use common::DestinationStore;
use engine::OnDemandQuery;

use crate::format::MessageFormat;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Dependencies injected into every handler via `dptree`.
#[derive(Clone)]
pub struct BotDeps {
    pub query: OnDemandQuery,
    pub destinations: Arc<dyn DestinationStore>,
    pub format: MessageFormat,
    /// Empty means everyone may use the bot.
    pub allowed_user_ids: Arc<Vec<i64>>,
}

/// Telegram bot commands exposed to subscribers.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "TrailBot commands:")]
pub enum Command {
    #[command(description = "Subscribe this chat to signal notifications")]
    Start,
    #[command(description = "Show the current signal and position")]
    Signal,
    #[command(description = "Stop notifications to this chat")]
    Stop,
    #[command(description = "Show this help")]
    Help,
}

/// Start the Telegram bot in long-polling mode. Returns when the dispatcher
/// stops (Ctrl-C).
pub async fn start_bot(bot: Bot, deps: BotDeps) {
    let deps = Arc::new(deps);

    info!("Telegram bot starting (long-polling)");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(handle_start))
        .branch(case![Command::Signal].endpoint(handle_signal))
        .branch(case![Command::Stop].endpoint(handle_stop))
        .branch(case![Command::Help].endpoint(handle_help));

    Update::filter_message()
        .filter_map(|msg: Message| msg.from().map(|u| u.id))
        .filter_async(auth_filter)
        .branch(command_handler)
}

/// Silently drop messages from users not in the allowed list.
async fn auth_filter(user_id: UserId, deps: Arc<BotDeps>) -> bool {
    let uid = user_id.0 as i64;
    let allowed = is_allowed(&deps.allowed_user_ids, uid);
    if !allowed {
        warn!(user_id = uid, "Unauthorized Telegram access attempt");
    }
    allowed
}

fn is_allowed(allowed_user_ids: &[i64], uid: i64) -> bool {
    allowed_user_ids.is_empty() || allowed_user_ids.contains(&uid)
}

async fn handle_start(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let reply = subscribe(deps.destinations.as_ref(), &deps.format, msg.chat.id.0).await;
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_signal(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let reply = match deps.query.snapshot().await {
        Ok(snapshot) => deps.format.snapshot(&snapshot),
        Err(e) => {
            warn!(chat_id = msg.chat.id.0, error = %e, "On-demand signal query failed");
            format!("Error: {e}")
        }
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_stop(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let reply = unsubscribe(deps.destinations.as_ref(), msg.chat.id.0).await;
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Subscribe a chat and build the reply. Other subscribers are untouched.
async fn subscribe(
    destinations: &dyn DestinationStore,
    format: &MessageFormat,
    chat_id: i64,
) -> String {
    match destinations.add(chat_id).await {
        Ok(true) => format.greeting(),
        Ok(false) => "This chat is already subscribed.".to_string(),
        Err(e) => {
            warn!(chat_id, error = %e, "Failed to subscribe destination");
            format!("Error: {e}")
        }
    }
}

/// Unsubscribe only the calling chat and build the reply.
async fn unsubscribe(destinations: &dyn DestinationStore, chat_id: i64) -> String {
    match destinations.remove(chat_id).await {
        Ok(true) => "Notifications stopped. Send /start to resume.".to_string(),
        Ok(false) => "This chat is not subscribed.".to_string(),
        Err(e) => {
            warn!(chat_id, error = %e, "Failed to unsubscribe destination");
            format!("Error: {e}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{Error, MemoryDestinationStore};
    use strategy::StrategyParams;

    struct BrokenStore;

    #[async_trait]
    impl DestinationStore for BrokenStore {
        async fn list(&self) -> common::Result<Vec<i64>> {
            Err(Error::Config("store offline".into()))
        }
        async fn add(&self, _destination: i64) -> common::Result<bool> {
            Err(Error::Config("store offline".into()))
        }
        async fn remove(&self, _destination: i64) -> common::Result<bool> {
            Err(Error::Config("store offline".into()))
        }
    }

    fn format() -> MessageFormat {
        MessageFormat::new("SBER", &StrategyParams::default())
    }

    #[tokio::test]
    async fn second_start_keeps_first_subscriber() {
        let store = MemoryDestinationStore::default();
        assert_eq!(subscribe(&store, &format(), 1).await, format().greeting());
        assert_eq!(subscribe(&store, &format(), 2).await, format().greeting());
        assert!(subscribe(&store, &format(), 1).await.contains("already subscribed"));
        assert_eq!(store.list().await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn stop_removes_only_the_caller() {
        let store = MemoryDestinationStore::new([1, 2]);
        assert!(unsubscribe(&store, 1).await.contains("stopped"));
        assert!(unsubscribe(&store, 1).await.contains("not subscribed"));
        assert_eq!(store.list().await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn store_failures_are_reported_to_the_chat() {
        let start = subscribe(&BrokenStore, &format(), 1).await;
        assert!(start.starts_with("Error: ") && start.contains("store offline"));

        let stop = unsubscribe(&BrokenStore, 1).await;
        assert!(stop.starts_with("Error: ") && stop.contains("store offline"));
    }

    #[test]
    fn empty_allow_list_admits_everyone() {
        assert!(is_allowed(&[], 12345));
    }

    #[test]
    fn allow_list_is_enforced() {
        assert!(is_allowed(&[1, 2], 2));
        assert!(!is_allowed(&[1, 2], 3));
    }

    #[test]
    fn commands_parse_lowercase() {
        assert_eq!(Command::parse("/signal", "trailbot").unwrap(), Command::Signal);
        assert_eq!(Command::parse("/start", "trailbot").unwrap(), Command::Start);
        assert!(Command::parse("/status", "trailbot").is_err());
    }
}
