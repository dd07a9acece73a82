use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};

use super::api::RecommendationApi;
use crate::models::{AccessToken, InteractionEvent};

/// A logging failure, reported to whoever subscribed to diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub event: InteractionEvent,
    pub message: String,
}

/// Posts interaction events on detached tasks.
///
/// Delivery is best effort: no retry, no queueing, no ordering across events.
/// Failures go to the log and the optional diagnostic channel, never to the caller.
#[derive(Clone)]
pub struct InteractionRecorder {
    api: Arc<dyn RecommendationApi>,
    diagnostics: Option<mpsc::UnboundedSender<Diagnostic>>,
}

impl InteractionRecorder {
    pub fn new(api: Arc<dyn RecommendationApi>) -> Self {
        Self {
            api,
            diagnostics: None,
        }
    }

    /// Routes logging failures to a new channel, replacing any previous subscriber
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Diagnostic> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.diagnostics = Some(tx);
        rx
    }

    /// Sends `event` in the background. The handle exists for tests; callers drop it.
    pub fn log(&self, token: &AccessToken, event: InteractionEvent) -> JoinHandle<()> {
        let api = self.api.clone();
        let token = token.clone();
        let diagnostics = self.diagnostics.clone();

        tokio::spawn(async move {
            match api.log_interaction(&token, &event).await {
                Ok(()) => {}
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        item = %event.key(),
                        action = %event.action_type,
                        "Failed to log interaction"
                    );
                    if let Some(tx) = diagnostics {
                        let _ = tx.send(Diagnostic {
                            message: e.to_string(),
                            event,
                        });
                    }
                }
            }
        })
    }
}
