// Bot lifecycle: startup with bounded retries, then long polling until shutdown

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::bot::handlers::{handle_update, BotContext};
use crate::bot::session::SessionStore;
use crate::telegram::types::{Update, User};
use crate::telegram::TelegramError;

const MAX_STARTUP_ATTEMPTS: u32 = 2;
const STARTUP_RETRY_DELAY: Duration = Duration::from_secs(1);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How a failed startup attempt should be treated
#[derive(Debug)]
enum StartupError {
    /// Stale session or a competing poller; clearing the session may help
    Retryable(anyhow::Error),
    Fatal(anyhow::Error),
}

fn classify(err: TelegramError) -> StartupError {
    if err.is_conflict() {
        StartupError::Retryable(err.into())
    } else {
        StartupError::Fatal(err.into())
    }
}

/// Chains handler tasks per chat so a chat's updates run in the order they arrived.
///
/// Each job holds a sender for as long as it runs; the next job from the same
/// chat waits until that sender is dropped.
#[derive(Debug, Default)]
struct ChatOrder {
    tails: HashMap<i64, oneshot::Receiver<()>>,
}

impl ChatOrder {
    /// Registers a new job for `chat_id`, returning its guard and the job it must wait for
    fn enqueue(&mut self, chat_id: i64) -> (oneshot::Sender<()>, Option<oneshot::Receiver<()>>) {
        let (done, tail) = oneshot::channel::<()>();
        let previous: Option<oneshot::Receiver<()>> = self.tails.insert(chat_id, tail);
        (done, previous)
    }

    /// Forgets chats whose last job has finished
    fn prune(&mut self) {
        self.tails
            .retain(|_, tail: &mut oneshot::Receiver<()>| matches!(tail.try_recv(), Err(TryRecvError::Empty)));
    }

    fn len(&self) -> usize {
        self.tails.len()
    }
}

pub struct BotRunner {
    ctx: Arc<BotContext>,
    session: SessionStore,
    shutdown: watch::Receiver<bool>,
}

impl BotRunner {
    pub fn new(ctx: BotContext, shutdown: watch::Receiver<bool>) -> Self {
        let session: SessionStore = SessionStore::new(ctx.state.environment.session_file.clone());
        Self {
            ctx: Arc::new(ctx),
            session,
            shutdown,
        }
    }

    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = session;
        self
    }

    /// Starts the bot and polls until shutdown is signalled.
    ///
    /// Startup is attempted twice; a retryable failure deletes the session
    /// file before the next attempt. A shutdown during startup returns `Ok`.
    pub async fn start_bot(mut self) -> Result<()> {
        info!("🔥 Starting Blaze Thumb Bot…");

        for attempt in 1..=MAX_STARTUP_ATTEMPTS {
            let outcome: Result<Option<i64>, StartupError> = tokio::select! {
                _ = self.shutdown.changed() => {
                    info!("Shutdown requested during startup");
                    return Ok(());
                }
                outcome = Self::startup(&self.ctx, &self.session) => outcome,
            };

            match outcome {
                Ok(offset) => {
                    info!("Bot started.");
                    return self.poll(offset).await;
                }
                Err(StartupError::Retryable(e)) => {
                    warn!(attempt, "Startup failed ({:#}) → deleting session and retrying", e);
                    if let Err(e) = self.session.clear().await {
                        warn!("{:#}", e);
                    }
                    if attempt == MAX_STARTUP_ATTEMPTS {
                        break;
                    }

                    tokio::select! {
                        _ = self.shutdown.changed() => {
                            info!("Shutdown requested during startup");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(STARTUP_RETRY_DELAY) => {}
                    }
                }
                Err(StartupError::Fatal(e)) => {
                    error!("Startup Error: {:#}", e);
                    return Err(e);
                }
            }
        }

        error!("Bot failed to start after {} attempts", MAX_STARTUP_ATTEMPTS);
        Err(anyhow!("Bot failed to start after {MAX_STARTUP_ATTEMPTS} attempts"))
    }

    async fn startup(ctx: &BotContext, session: &SessionStore) -> Result<Option<i64>, StartupError> {
        ctx.api.delete_webhook().await.map_err(classify)?;

        let me: User = ctx.api.get_me().await.map_err(classify)?;
        info!(username = ?me.username, id = me.id, "Authorized as bot");
        ctx.state.stats.set_username(me.username);

        let offset: Option<i64> = session.load().await.map_err(StartupError::Retryable)?;
        debug!(?offset, "Session restored");

        Ok(offset)
    }

    async fn poll(&mut self, mut offset: Option<i64>) -> Result<()> {
        let env = self.ctx.state.environment.clone();
        let jobs: Arc<Semaphore> = Arc::new(Semaphore::new(env.max_concurrent_jobs));
        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut order: ChatOrder = ChatOrder::default();
        let mut backoff: Duration = INITIAL_BACKOFF;

        loop {
            let batch: Result<Vec<Update>, TelegramError> = tokio::select! {
                _ = self.shutdown.changed() => break,
                batch = self.ctx.api.get_updates(offset, env.poll_timeout_seconds) => batch,
            };

            match batch {
                Ok(updates) => {
                    backoff = INITIAL_BACKOFF;
                    if updates.is_empty() {
                        continue;
                    }

                    order.prune();
                    for update in updates {
                        offset = Some(update.update_id + 1);

                        let (done, previous) = match update.message.as_ref() {
                            Some(message) => {
                                let (done, previous) = order.enqueue(message.chat.id);
                                (Some(done), previous)
                            }
                            None => (None, None),
                        };

                        let permit = jobs.clone().acquire_owned().await?;
                        let ctx: Arc<BotContext> = self.ctx.clone();
                        tasks.spawn(async move {
                            let _permit = permit;
                            let _done = done;
                            if let Some(previous) = previous {
                                // * Resolves once the earlier job for this chat has finished
                                let _ = previous.await;
                            }
                            handle_update(&ctx, update).await;
                        });
                    }
                    debug!(chats = order.len(), "Dispatched batch");

                    if let Some(offset) = offset {
                        if let Err(e) = self.session.save(offset).await {
                            warn!("{:#}", e);
                        }
                    }

                    while let Some(done) = tasks.try_join_next() {
                        if let Err(e) = done {
                            error!("Update handler panicked: {}", e);
                        }
                    }
                }
                Err(e) => {
                    let wait: Duration = e.retry_after().map(Duration::from_secs).unwrap_or(backoff);
                    warn!("Polling failed: {} (retrying in {:?})", e, wait);

                    tokio::select! {
                        _ = self.shutdown.changed() => break,
                        _ = tokio::time::sleep(wait) => {}
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }

        info!(in_flight = tasks.len(), "Stopping bot, waiting for running jobs");
        while let Some(done) = tasks.join_next().await {
            if let Err(e) = done {
                error!("Update handler panicked: {}", e);
            }
        }

        if let Some(offset) = offset {
            self.session.save(offset).await?;
        }

        info!("Bot stopped");
        Ok(())
    }
}
