//! HTTP client for the recommendation service
//!
//! All endpoints speak JSON. Everything except login and signup is authenticated
//! with the session's bearer token. Non-2xx responses become
//! [`ClientError::Api`] carrying the service's `detail` message when it sent one.

use reqwest::{Client as HttpClient, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::Instrument;

use super::{
    request_id::{outgoing_span, RequestId, REQUEST_ID_HEADER},
    RecommendationApi,
};
use crate::{
    config::Config,
    error::{ClientError, ClientResult},
    models::{
        AccessToken, AuthResponse, Credentials, Domain, FeedPage, InteractionEvent,
        PreferenceDocument, PreferenceProjection, RawFeedPage, ServiceStatus, SignupRequest,
    },
};

#[derive(Deserialize)]
struct PreferencesResponse {
    #[serde(default)]
    preferences: PreferenceProjection,
}

#[derive(Clone)]
pub struct HttpApiClient {
    http_client: HttpClient,
    api_url: String,
}

impl HttpApiClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        let api_url = api_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http_client,
            api_url,
        })
    }

    pub fn from_config(config: &Config) -> ClientResult<Self> {
        Self::new(config.api_base_url.clone(), config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn request(&self, method: Method, path: &str, token: Option<&AccessToken>) -> RequestBuilder {
        let builder = self.http_client.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        }
    }

    /// Sends the request inside a correlation span and rejects non-2xx responses
    async fn dispatch(
        &self,
        request: RequestBuilder,
        method: Method,
        path: &str,
    ) -> ClientResult<Response> {
        let request_id = RequestId::new();
        let span = outgoing_span(&method, path, &request_id);
        Self::send(request.header(REQUEST_ID_HEADER, request_id.to_string()))
            .instrument(span)
            .await
    }

    async fn send(request: RequestBuilder) -> ClientResult<Response> {
        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Request failed before a response arrived");
            ClientError::from(e)
        })?;

        let status = response.status();
        tracing::debug!(
            status = %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Response received"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Remote service rejected request");
            return Err(ClientError::from_response(status.as_u16(), &body));
        }

        Ok(response)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: Method,
        path: &str,
    ) -> ClientResult<T> {
        let response = self.dispatch(request, method, path).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait::async_trait]
impl RecommendationApi for HttpApiClient {
    async fn login(&self, credentials: &Credentials) -> ClientResult<AuthResponse> {
        let path = "/api/auth/login";
        let request = self.request(Method::POST, path, None).json(credentials);
        let response: AuthResponse = self.call(request, Method::POST, path).await?;

        tracing::info!(user_id = response.user.id, "Login accepted");
        Ok(response)
    }

    async fn signup(&self, request: &SignupRequest) -> ClientResult<AuthResponse> {
        let path = "/api/auth/signup";
        let builder = self.request(Method::POST, path, None).json(request);
        let response: AuthResponse = self.call(builder, Method::POST, path).await?;

        tracing::info!(user_id = response.user.id, "Signup accepted");
        Ok(response)
    }

    async fn update_preferences(
        &self,
        token: &AccessToken,
        responses: &PreferenceDocument,
    ) -> ClientResult<PreferenceProjection> {
        let path = "/api/auth/update-preferences";
        let request = self
            .request(Method::PUT, path, Some(token))
            .json(&json!({ "quiz_responses": responses }));
        let response: PreferencesResponse = self.call(request, Method::PUT, path).await?;
        Ok(response.preferences)
    }

    async fn unified_recommendations(
        &self,
        token: &AccessToken,
        per_domain: u32,
    ) -> ClientResult<FeedPage> {
        let path = "/api/recommendations/unified";
        let request = self
            .request(Method::GET, path, Some(token))
            .query(&[("n_per_domain", per_domain)]);
        let page: RawFeedPage = self.call(request, Method::GET, path).await?;
        Ok(FeedPage::from(page))
    }

    async fn domain_recommendations(
        &self,
        token: &AccessToken,
        domain: Domain,
        user_id: i64,
        count: u32,
    ) -> ClientResult<FeedPage> {
        let path = format!("/api/recommendations/{}/{}", domain, user_id);
        let request = self
            .request(Method::GET, &path, Some(token))
            .query(&[("n_recommendations", count)]);
        let page: RawFeedPage = self.call(request, Method::GET, &path).await?;
        Ok(FeedPage::from(page))
    }

    async fn log_interaction(
        &self,
        token: &AccessToken,
        event: &InteractionEvent,
    ) -> ClientResult<()> {
        let path = "/api/interactions/log";
        let request = self.request(Method::POST, path, Some(token)).json(event);
        self.dispatch(request, Method::POST, path).await?;

        tracing::debug!(
            item = %event.key(),
            action = %event.action_type,
            "Interaction logged"
        );
        Ok(())
    }

    async fn update_from_interactions(
        &self,
        token: &AccessToken,
        window_days: u32,
    ) -> ClientResult<PreferenceProjection> {
        let path = "/api/preferences/update-from-interactions";
        let request = self
            .request(Method::POST, path, Some(token))
            .json(&json!({ "window_days": window_days }));
        let response: PreferencesResponse = self.call(request, Method::POST, path).await?;
        Ok(response.preferences)
    }

    async fn service_status(&self, token: &AccessToken) -> ClientResult<ServiceStatus> {
        let path = "/";
        let request = self.request(Method::GET, path, Some(token));
        self.call(request, Method::GET, path).await
    }
}
