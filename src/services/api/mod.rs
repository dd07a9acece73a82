//! Recommendation service port
//!
//! Every remote call the controllers make goes through [`RecommendationApi`]. The
//! production implementation is [`HttpApiClient`]; controller tests substitute a
//! generated mock.

use crate::{
    error::ClientResult,
    models::{
        AccessToken, AuthResponse, Credentials, Domain, FeedPage, InteractionEvent,
        PreferenceDocument, PreferenceProjection, ServiceStatus, SignupRequest,
    },
};

pub mod http;
pub mod request_id;

pub use http::HttpApiClient;
pub use request_id::RequestId;

/// Remote recommendation and authentication service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationApi: Send + Sync {
    /// `POST /api/auth/login`
    async fn login(&self, credentials: &Credentials) -> ClientResult<AuthResponse>;

    /// `POST /api/auth/signup`
    async fn signup(&self, request: &SignupRequest) -> ClientResult<AuthResponse>;

    /// `PUT /api/auth/update-preferences`
    ///
    /// Returns the projection the server recomputed from `responses`.
    async fn update_preferences(
        &self,
        token: &AccessToken,
        responses: &PreferenceDocument,
    ) -> ClientResult<PreferenceProjection>;

    /// `GET /api/recommendations/unified`
    async fn unified_recommendations(
        &self,
        token: &AccessToken,
        per_domain: u32,
    ) -> ClientResult<FeedPage>;

    /// `GET /api/recommendations/{domain}/{user_id}`
    async fn domain_recommendations(
        &self,
        token: &AccessToken,
        domain: Domain,
        user_id: i64,
        count: u32,
    ) -> ClientResult<FeedPage>;

    /// `POST /api/interactions/log`
    async fn log_interaction(
        &self,
        token: &AccessToken,
        event: &InteractionEvent,
    ) -> ClientResult<()>;

    /// `POST /api/preferences/update-from-interactions`
    async fn update_from_interactions(
        &self,
        token: &AccessToken,
        window_days: u32,
    ) -> ClientResult<PreferenceProjection>;

    /// `GET /`
    async fn service_status(&self, token: &AccessToken) -> ClientResult<ServiceStatus>;
}
