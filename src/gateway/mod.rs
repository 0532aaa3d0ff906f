//! Gateway: the event loop connecting the channel, storage, and generator.
//!
//! Includes per-user message serialization, the background scheduler, and
//! graceful shutdown.

mod checkin;
mod routing;
mod scheduler;
mod text;

#[cfg(test)]
mod tests;

use crate::generator::Generator;
use crate::state::StateTracker;
use scheduler::Schedule;
use nosugar_core::{
    config::SchedulerConfig,
    error::NoSugarError,
    message::{Button, IncomingMessage, OutgoingMessage},
    traits::{Channel, Storage},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Generic reply when a handler fails.
const ERROR_REPLY: &str = "⚠️ Something went wrong. Please try again later.";

/// The central gateway that routes updates from the channel to handlers.
pub struct Gateway {
    pub(super) channel: Arc<dyn Channel>,
    pub(super) storage: Arc<dyn Storage>,
    pub(super) generator: Generator,
    pub(super) state: StateTracker,
    pub(super) schedule: Schedule,
    pub(super) scheduler_config: SchedulerConfig,
    /// Card number for the slip-up penalty reminder; no reminder when unset.
    pub(super) payment_card: Option<String>,
    /// Users with a message in flight. New messages queue here.
    pub(super) active_senders: Mutex<HashMap<i64, Vec<IncomingMessage>>>,
}

impl Gateway {
    /// Create a new gateway. Fails on an invalid scheduler config.
    pub fn new(
        channel: Arc<dyn Channel>,
        storage: Arc<dyn Storage>,
        generator: Generator,
        scheduler_config: SchedulerConfig,
        payment_card: Option<String>,
    ) -> Result<Self, NoSugarError> {
        let schedule = Schedule::from_config(&scheduler_config)?;
        Ok(Self {
            channel,
            storage,
            generator,
            state: StateTracker::new(),
            schedule,
            scheduler_config,
            payment_card: payment_card.filter(|c| !c.trim().is_empty()),
            active_senders: Mutex::new(HashMap::new()),
        })
    }

    /// Run the main event loop until ctrl-c or the channel closes.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "NoSugar gateway running | channel: {} | generator: {} | scheduler: {}",
            self.channel.name(),
            if self.generator.is_online() {
                "online"
            } else {
                "fallback only"
            },
            if self.scheduler_config.enabled {
                "enabled"
            } else {
                "disabled"
            },
        );

        let mut rx = self
            .channel
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start channel {}: {e}", self.channel.name()))?;

        let sched_handle = if self.scheduler_config.enabled {
            let gw = self.clone();
            Some(tokio::spawn(async move {
                gw.scheduler_loop().await;
            }))
        } else {
            None
        };

        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    let Some(incoming) = maybe else {
                        warn!("channel closed, stopping gateway");
                        break;
                    };
                    let gw = self.clone();
                    tokio::spawn(async move {
                        gw.dispatch_message(incoming).await;
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown(sched_handle).await;
        Ok(())
    }

    /// Dispatch a message: queue it if the user already has one in flight,
    /// otherwise process it and then drain the queue in arrival order.
    pub(super) async fn dispatch_message(self: Arc<Self>, incoming: IncomingMessage) {
        let sender = incoming.sender.platform_id;

        {
            let mut active = self.active_senders.lock().await;
            if let Some(queue) = active.get_mut(&sender) {
                queue.push(incoming);
                info!("queued message from {sender} (previous one still in progress)");
                return;
            }
            active.insert(sender, Vec::new());
        }

        self.handle_message(incoming).await;

        loop {
            let next = {
                let mut active = self.active_senders.lock().await;
                match active.get_mut(&sender) {
                    Some(queue) if !queue.is_empty() => Some(queue.remove(0)),
                    _ => {
                        active.remove(&sender);
                        None
                    }
                }
            };

            match next {
                Some(queued) => self.handle_message(queued).await,
                None => break,
            }
        }
    }

    /// Handle one update: register the user, then route it.
    pub(super) async fn handle_message(&self, incoming: IncomingMessage) {
        if let Some(ref callback_id) = incoming.callback_id {
            if let Err(e) = self.channel.answer_callback(callback_id, None).await {
                warn!("failed to acknowledge button press: {e}");
            }
        }

        let user = match self.storage.get_or_create_user(&incoming.sender).await {
            Ok(u) => u,
            Err(e) => {
                error!("failed to load user {}: {e}", incoming.sender.platform_id);
                self.reply(&incoming, ERROR_REPLY, Vec::new()).await;
                return;
            }
        };

        let result = if let Some(ref data) = incoming.callback_data {
            self.handle_callback(&incoming, &user, data).await
        } else if incoming.text.trim_start().starts_with('/') {
            self.handle_command(&incoming, &user).await
        } else {
            self.handle_text(&incoming, &user).await
        };

        if let Err(e) = result {
            error!("handler failed for user {}: {e}", user.telegram_id);
            self.reply(&incoming, ERROR_REPLY, Vec::new()).await;
        }
    }

    /// Send a message back to where `incoming` came from. Failures are logged.
    pub(super) async fn reply(
        &self,
        incoming: &IncomingMessage,
        text: impl Into<String>,
        buttons: Vec<Vec<Button>>,
    ) {
        let msg = OutgoingMessage {
            text: text.into(),
            buttons,
            reply_target: incoming.reply_target.clone(),
        };
        if let Err(e) = self.channel.send(msg).await {
            error!("failed to send message: {e}");
        }
    }

    /// Graceful shutdown: stop the scheduler, then the channel.
    async fn shutdown(&self, sched_handle: Option<tokio::task::JoinHandle<()>>) {
        info!("Shutting down...");

        if let Some(h) = sched_handle {
            h.abort();
        }

        if let Err(e) = self.channel.stop().await {
            warn!("failed to stop channel {}: {e}", self.channel.name());
        }

        info!("Shutdown complete.");
    }
}
