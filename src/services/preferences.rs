use std::sync::Arc;

use super::api::RecommendationApi;
use crate::{
    error::{ClientError, ClientResult},
    models::{MultiField, PreferenceDocument, PreferenceProfile, Session, SingleChoice},
};

/// Edits the stated preferences of the signed-in user.
///
/// Changes accumulate in a buffer copied from the user's quiz responses; the user
/// record is only replaced once the service accepts the buffer. Both write paths
/// return a complete new [`PreferenceProfile`] for the caller to swap in.
pub struct PreferenceEditor {
    api: Arc<dyn RecommendationApi>,
    buffer: Option<PreferenceDocument>,
    learn_window_days: u32,
}

impl PreferenceEditor {
    pub fn new(api: Arc<dyn RecommendationApi>, learn_window_days: u32) -> Self {
        Self {
            api,
            buffer: None,
            learn_window_days,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&PreferenceDocument> {
        self.buffer.as_ref()
    }

    pub fn learn_window_days(&self) -> u32 {
        self.learn_window_days
    }

    /// Snapshots the current quiz responses; restarts editing if already open
    pub fn begin_edit(&mut self, profile: &PreferenceProfile) {
        self.buffer = Some(profile.quiz_responses().clone());
    }

    pub fn toggle_option(&mut self, field: MultiField, value: &str) -> ClientResult<bool> {
        self.buffer
            .as_mut()
            .ok_or(ClientError::NotEditing)?
            .toggle(field, value)
    }

    pub fn set_single(&mut self, choice: SingleChoice) -> ClientResult<()> {
        self.buffer
            .as_mut()
            .ok_or(ClientError::NotEditing)?
            .set_single(choice);
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.buffer = None;
    }

    /// Submits the buffer. On failure the buffer stays open so no input is lost.
    pub async fn save(&mut self, session: &Session) -> ClientResult<PreferenceProfile> {
        let responses = self.buffer.as_ref().ok_or(ClientError::NotEditing)?;
        let projection = self
            .api
            .update_preferences(&session.token, responses)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, user_id = session.user.id, "Saving preferences failed");
                e
            })?;

        let responses = self.buffer.take().unwrap_or_default();
        tracing::info!(user_id = session.user.id, "Preferences saved");
        Ok(session.user.profile.with_responses(responses, projection))
    }

    /// Asks the service to re-derive the projection from logged interactions.
    ///
    /// Quiz responses are kept as they are; `window_days` falls back to the configured window.
    pub async fn learn_from_interactions(
        &self,
        session: &Session,
        window_days: Option<u32>,
    ) -> ClientResult<PreferenceProfile> {
        let window_days = window_days.unwrap_or(self.learn_window_days);
        let projection = self
            .api
            .update_from_interactions(&session.token, window_days)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, window_days, "Learning from interactions failed");
                e
            })?;

        tracing::info!(
            user_id = session.user.id,
            window_days,
            "Preferences updated from interactions"
        );
        Ok(session.user.profile.with_projection(projection))
    }
}
