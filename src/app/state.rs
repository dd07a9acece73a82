use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc;

use super::{
    navigation::{Destination, Screen, Tab},
    notices::{Notice, Notices},
};
use crate::{
    config::Config,
    error::{ClientError, ClientResult},
    models::{
        AccessToken, ActionType, DomainFilter, FeedPage, InteractionEvent, ItemKey, MultiField,
        Rating, RecommendationItem, ServiceStatus, Session, SingleChoice, User,
    },
    services::{
        api::RecommendationApi, AuthController, Diagnostic, FeedController, FeedLimits,
        FeedRequest, InteractionRecorder, OnboardingOutcome, OnboardingWizard, PreferenceEditor,
    },
    store::SessionStore,
};

const SAVE_FAILED: &str = "Failed to update preferences";
const LEARN_FAILED: &str = "Failed to update preferences from your activity";

/// Completion of a background request, tagged with the workspace that issued it
#[derive(Debug)]
pub enum AppEvent {
    FeedLoaded {
        workspace: u64,
        seq: u64,
        result: ClientResult<FeedPage>,
    },
    StatusLoaded {
        workspace: u64,
        result: ClientResult<ServiceStatus>,
    },
}

/// Everything that exists only while a user is signed in
pub struct Workspace {
    id: u64,
    session: Session,
    tab: Tab,
    feed: FeedController,
    editor: PreferenceEditor,
    status: Option<ServiceStatus>,
    detail: Option<ItemKey>,
}

impl Workspace {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn user(&self) -> &User {
        &self.session.user
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn feed(&self) -> &FeedController {
        &self.feed
    }

    pub fn editor(&self) -> &PreferenceEditor {
        &self.editor
    }

    pub fn status(&self) -> Option<&ServiceStatus> {
        self.status.as_ref()
    }

    /// Item open in the detail view, if it is still in the feed
    pub fn detail(&self) -> Option<&RecommendationItem> {
        self.detail.and_then(|key| self.feed.find(key))
    }

    fn interaction_metadata(&self, key: ItemKey) -> Map<String, Value> {
        let mut metadata = Map::new();
        if let Some(item) = self.feed.find(key) {
            metadata.insert("title".to_string(), Value::from(item.title.clone()));
        }
        metadata.insert("feed".to_string(), Value::from(self.feed.filter().to_string()));
        metadata
    }
}

/// Collaborators shared by every screen
struct Runtime {
    api: Arc<dyn RecommendationApi>,
    store: SessionStore,
    recorder: InteractionRecorder,
    notices: Notices,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    pending: usize,
}

impl Runtime {
    fn fetch_feed(&mut self, workspace: u64, request: FeedRequest) {
        self.pending += 1;
        let api = self.api.clone();
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            let result = request.execute(api.as_ref()).await;
            let _ = tx.send(AppEvent::FeedLoaded {
                workspace,
                seq: request.seq,
                result,
            });
        });
    }

    fn fetch_status(&mut self, workspace: u64, token: AccessToken) {
        self.pending += 1;
        let api = self.api.clone();
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            let result = api.service_status(&token).await;
            let _ = tx.send(AppEvent::StatusLoaded { workspace, result });
        });
    }

    fn record(&self, session: &Session, event: InteractionEvent) {
        // Detached: the outcome only reaches the diagnostic channel
        drop(self.recorder.log(&session.token, event));
    }
}

/// Client application state machine.
///
/// Network calls the user waits on (auth, preference writes) are awaited in place.
/// Feed and status fetches run on spawned tasks and land through [`App::next_event`],
/// so methods that start them must be called from within a Tokio runtime.
pub struct App {
    rt: Runtime,
    screen: Screen,
    limits: FeedLimits,
    learn_window_days: u32,
    dark_mode: bool,
    next_workspace: u64,
}

impl App {
    pub fn new(api: Arc<dyn RecommendationApi>, store: SessionStore, config: &Config) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let recorder = InteractionRecorder::new(api.clone());

        Self {
            rt: Runtime {
                api,
                store,
                recorder,
                notices: Notices::default(),
                events_tx,
                events_rx,
                pending: 0,
            },
            screen: Screen::Loading,
            limits: FeedLimits::from(config),
            learn_window_days: config.learn_window_days,
            dark_mode: false,
            next_workspace: 0,
        }
    }

    /// Channel receiving interaction-logging failures
    pub fn subscribe_diagnostics(&mut self) -> mpsc::UnboundedReceiver<Diagnostic> {
        self.rt.recorder.subscribe()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn workspace(&self) -> Option<&Workspace> {
        match &self.screen {
            Screen::Authenticated(workspace) => Some(&**workspace),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.workspace().map(Workspace::session)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.screen, Screen::Authenticated(_))
    }

    pub fn auth(&self) -> Option<&AuthController> {
        match &self.screen {
            Screen::Auth(auth) => Some(auth),
            _ => None,
        }
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    /// Background requests whose results have not been applied yet
    pub fn pending_requests(&self) -> usize {
        self.rt.pending
    }

    pub fn notices(&self) -> &Notices {
        &self.rt.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.rt.notices.drain()
    }

    /// Leaves `loading` for the saved session or the landing page
    pub fn boot(&mut self) -> ClientResult<()> {
        if !matches!(self.screen, Screen::Loading) {
            return Err(ClientError::InvalidTransition {
                state: self.screen.name(),
                event: "boot",
            });
        }

        self.dark_mode = self.rt.store.dark_mode();
        match self.rt.store.restore() {
            Some(session) => self.enter_authenticated(session),
            None => {
                tracing::info!("No saved session, showing landing page");
                self.screen = Screen::Landing;
            }
        }
        Ok(())
    }

    pub fn navigate(&mut self, destination: Destination) -> ClientResult<()> {
        match (&mut self.screen, destination.auth_mode()) {
            (Screen::Auth(auth), Some(mode)) => return auth.set_mode(mode),
            (Screen::Landing, None) => return Ok(()),
            (Screen::Landing, Some(_)) | (Screen::Auth(_), None) => {}
            (other, _) => {
                return Err(ClientError::InvalidTransition {
                    state: other.name(),
                    event: "navigate",
                })
            }
        }

        self.screen = match destination.auth_mode() {
            Some(mode) => Screen::Auth(AuthController::new(self.rt.api.clone(), mode)),
            None => Screen::Landing,
        };
        tracing::debug!(screen = self.screen.name(), "Navigated");
        Ok(())
    }

    /// Returns from the auth screen to the landing page
    pub fn back(&mut self) -> ClientResult<()> {
        self.auth_mut("go back")?;
        self.screen = Screen::Landing;
        Ok(())
    }

    pub fn toggle_auth_mode(&mut self) -> ClientResult<()> {
        self.auth_mut("switch auth mode")?.toggle_mode()
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<()> {
        let session = self.auth_mut("log in")?.login(email, password).await?;
        self.rt.store.persist(&session);
        self.enter_authenticated(session);
        Ok(())
    }

    pub fn begin_signup(&mut self, email: &str, password: &str, name: &str) -> ClientResult<()> {
        self.auth_mut("sign up")?.begin_signup(email, password, name)
    }

    /// The signup questionnaire, while it is open
    pub fn wizard_mut(&mut self) -> Option<&mut OnboardingWizard> {
        match &mut self.screen {
            Screen::Auth(auth) => auth.wizard_mut(),
            _ => None,
        }
    }

    pub async fn onboarding_next(&mut self) -> ClientResult<OnboardingOutcome> {
        let outcome = self.auth_mut("advance onboarding")?.onboarding_next().await?;
        if let OnboardingOutcome::Authenticated(session) = &outcome {
            self.rt.store.persist(session);
            self.enter_authenticated(session.clone());
        }
        Ok(outcome)
    }

    pub fn onboarding_back(&mut self) -> ClientResult<usize> {
        self.auth_mut("go back in onboarding")?.onboarding_back()
    }

    /// Closes the questionnaire and returns to the signup form
    pub fn cancel_onboarding(&mut self) -> ClientResult<()> {
        let auth = self.auth_mut("cancel onboarding")?;
        if !auth.is_onboarding() {
            return Err(ClientError::InvalidTransition {
                state: "entering credentials",
                event: "cancel onboarding",
            });
        }
        auth.cancel_onboarding();
        Ok(())
    }

    pub fn logout(&mut self) -> ClientResult<()> {
        let (workspace, rt) = self.authenticated("log out")?;
        let user_id = workspace.session.user.id;
        rt.store.clear();

        // Dropping the workspace discards the feed; late responses no longer match any workspace
        self.screen = Screen::Landing;
        tracing::info!(user_id, "Logged out");
        Ok(())
    }

    pub fn show_tab(&mut self, tab: Tab) -> ClientResult<()> {
        let (workspace, _) = self.authenticated("switch tab")?;
        workspace.tab = tab;
        Ok(())
    }

    pub fn select_domain(&mut self, filter: DomainFilter) -> ClientResult<()> {
        let (workspace, rt) = self.authenticated("select domain")?;
        if let Some(request) = workspace.feed.select_domain(filter, &workspace.session) {
            workspace.detail = None;
            rt.fetch_feed(workspace.id, request);
        }
        Ok(())
    }

    pub fn refresh(&mut self) -> ClientResult<()> {
        let (workspace, rt) = self.authenticated("refresh")?;
        let request = workspace.feed.begin_fetch(&workspace.session);
        rt.fetch_feed(workspace.id, request);
        rt.fetch_status(workspace.id, workspace.session.token.clone());
        Ok(())
    }

    pub fn like(&mut self, key: ItemKey) -> ClientResult<()> {
        let (workspace, rt) = self.authenticated("like")?;
        let metadata = workspace.interaction_metadata(key);
        rt.record(
            &workspace.session,
            InteractionEvent::new(key, ActionType::Like, metadata),
        );
        rt.notices.success("Thanks! We'll recommend more like this");
        Ok(())
    }

    /// Removes the item from the feed at once and logs the dislike in the background
    pub fn dislike(&mut self, key: ItemKey) -> ClientResult<usize> {
        let (workspace, rt) = self.authenticated("dislike")?;
        let metadata = workspace.interaction_metadata(key);
        let removed = workspace.feed.optimistic_remove(key);
        if workspace.detail == Some(key) {
            workspace.detail = None;
        }

        rt.record(
            &workspace.session,
            InteractionEvent::new(key, ActionType::Dislike, metadata),
        );
        rt.notices.success("Got it, we'll show you less like this");
        Ok(removed)
    }

    pub fn rate(&mut self, key: ItemKey, stars: u8) -> ClientResult<()> {
        let rating = Rating::new(stars)?;
        let (workspace, rt) = self.authenticated("rate")?;
        let metadata = workspace.interaction_metadata(key);
        rt.record(
            &workspace.session,
            InteractionEvent::rated(key, rating, metadata),
        );
        rt.notices
            .success(format!("Rated {} out of 5 stars", rating.stars()));
        Ok(())
    }

    /// Opens the detail view for an item in the feed and logs a view
    pub fn select(&mut self, key: ItemKey) -> ClientResult<()> {
        let (workspace, rt) = self.authenticated("select item")?;
        if workspace.feed.find(key).is_none() {
            return Err(ClientError::InvalidInput(format!(
                "Item {} is not in the feed",
                key
            )));
        }
        workspace.detail = Some(key);
        let metadata = workspace.interaction_metadata(key);
        rt.record(
            &workspace.session,
            InteractionEvent::new(key, ActionType::View, metadata),
        );
        Ok(())
    }

    pub fn close_detail(&mut self) -> ClientResult<()> {
        let (workspace, _) = self.authenticated("close detail")?;
        workspace.detail = None;
        Ok(())
    }

    pub fn begin_edit_preferences(&mut self) -> ClientResult<()> {
        let (workspace, _) = self.authenticated("edit preferences")?;
        workspace.editor.begin_edit(&workspace.session.user.profile);
        Ok(())
    }

    pub fn toggle_preference(&mut self, field: MultiField, value: &str) -> ClientResult<bool> {
        let (workspace, _) = self.authenticated("edit preferences")?;
        workspace.editor.toggle_option(field, value)
    }

    pub fn set_preference(&mut self, choice: SingleChoice) -> ClientResult<()> {
        let (workspace, _) = self.authenticated("edit preferences")?;
        workspace.editor.set_single(choice)
    }

    pub fn cancel_edit_preferences(&mut self) -> ClientResult<()> {
        let (workspace, _) = self.authenticated("edit preferences")?;
        workspace.editor.cancel_edit();
        Ok(())
    }

    /// Submits the edited preferences; on success the feed is refetched
    pub async fn save_preferences(&mut self) -> ClientResult<()> {
        let (workspace, rt) = self.authenticated("save preferences")?;
        match workspace.editor.save(&workspace.session).await {
            Ok(profile) => {
                workspace.session.user.profile = profile;
                rt.store.persist_user(&workspace.session.user);
                let request = workspace.feed.begin_fetch(&workspace.session);
                rt.fetch_feed(workspace.id, request);
                rt.notices
                    .success("Preferences updated! Recommendations will refresh.");
                Ok(())
            }
            Err(e) => {
                rt.notices.error(e.user_message(SAVE_FAILED));
                Err(e)
            }
        }
    }

    /// Re-derives preferences from logged interactions; `None` uses the configured window
    pub async fn learn_from_interactions(&mut self, window_days: Option<u32>) -> ClientResult<()> {
        let (workspace, rt) = self.authenticated("learn from interactions")?;
        match workspace
            .editor
            .learn_from_interactions(&workspace.session, window_days)
            .await
        {
            Ok(profile) => {
                workspace.session.user.profile = profile;
                rt.store.persist_user(&workspace.session.user);
                let request = workspace.feed.begin_fetch(&workspace.session);
                rt.fetch_feed(workspace.id, request);
                rt.notices.success("Preferences updated from your activity");
                Ok(())
            }
            Err(e) => {
                rt.notices.error(e.user_message(LEARN_FAILED));
                Err(e)
            }
        }
    }

    pub fn toggle_dark_mode(&mut self) -> bool {
        self.dark_mode = !self.dark_mode;
        self.rt.store.set_dark_mode(self.dark_mode);
        self.dark_mode
    }

    /// Waits for one background request and applies it; false when none are pending
    pub async fn next_event(&mut self) -> bool {
        if self.rt.pending == 0 {
            return false;
        }
        match self.rt.events_rx.recv().await {
            Some(event) => {
                self.apply_event(event);
                true
            }
            None => {
                self.rt.pending = 0;
                false
            }
        }
    }

    /// Applies every result that has already arrived without waiting
    pub fn poll_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rt.events_rx.try_recv() {
            self.apply_event(event);
            applied += 1;
        }
        applied
    }

    /// Waits until every background request has been applied
    pub async fn settle(&mut self) {
        while self.next_event().await {}
    }

    fn apply_event(&mut self, event: AppEvent) {
        self.rt.pending = self.rt.pending.saturating_sub(1);

        let Screen::Authenticated(workspace) = &mut self.screen else {
            tracing::debug!("Dropping response received while signed out");
            return;
        };

        match event {
            AppEvent::FeedLoaded {
                workspace: id,
                seq,
                result,
            } if id == workspace.id => {
                workspace.feed.apply(seq, result);
            }
            AppEvent::StatusLoaded {
                workspace: id,
                result,
            } if id == workspace.id => match result {
                Ok(status) => {
                    tracing::debug!(status = %status.status, "Service status updated");
                    workspace.status = Some(status);
                }
                Err(e) => tracing::warn!(error = %e, "Failed to fetch service status"),
            },
            _ => tracing::debug!("Dropping response from a previous session"),
        }
    }

    fn enter_authenticated(&mut self, session: Session) {
        self.next_workspace += 1;
        let id = self.next_workspace;
        let user_id = session.user.id;

        let mut workspace = Workspace {
            id,
            session,
            tab: Tab::default(),
            feed: FeedController::new(self.limits),
            editor: PreferenceEditor::new(self.rt.api.clone(), self.learn_window_days),
            status: None,
            detail: None,
        };
        let request = workspace.feed.begin_fetch(&workspace.session);
        self.rt.fetch_feed(id, request);
        self.rt.fetch_status(id, workspace.session.token.clone());

        self.screen = Screen::Authenticated(Box::new(workspace));
        tracing::info!(user_id, "Signed in");
    }

    fn auth_mut(&mut self, event: &'static str) -> ClientResult<&mut AuthController> {
        match &mut self.screen {
            Screen::Auth(auth) => Ok(auth),
            other => Err(ClientError::InvalidTransition {
                state: other.name(),
                event,
            }),
        }
    }

    fn authenticated(
        &mut self,
        event: &'static str,
    ) -> ClientResult<(&mut Workspace, &mut Runtime)> {
        match &mut self.screen {
            Screen::Authenticated(workspace) => Ok((&mut **workspace, &mut self.rt)),
            other => Err(ClientError::InvalidTransition {
                state: other.name(),
                event,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::NoticeKind,
        models::{Domain, PreferenceProjection},
        services::{api::MockRecommendationApi, AuthMode},
        store::MemoryStore,
    };
    use serde_json::json;

    fn user_json() -> &'static str {
        r#"{"id": 7, "name": "Ann", "quiz_responses": {"favorite_movie_genres": ["Drama"]}, "preferences": {"favorite_genres": ["Drama"]}}"#
    }

    fn signed_in_store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStore::with_entries([
            ("token", "T1"),
            ("user", user_json()),
        ])))
    }

    fn feed_page() -> FeedPage {
        let items = [(Domain::Movies, 42, 0.9), (Domain::Music, 5, 0.8), (Domain::Courses, 3, 0.7)]
            .into_iter()
            .map(|(domain, item_id, score)| RecommendationItem {
                key: ItemKey::new(domain, item_id),
                title: format!("{} {}", domain, item_id),
                score,
                metadata: Map::new(),
                exploration: false,
                rl_boost: None,
            })
            .collect();
        FeedPage {
            items,
            profile_summary: None,
        }
    }

    fn api_with_feed() -> MockRecommendationApi {
        let mut api = MockRecommendationApi::new();
        api.expect_unified_recommendations()
            .returning(|_, _| Ok(feed_page()));
        api.expect_service_status().returning(|_| {
            Ok(ServiceStatus {
                status: "healthy".to_string(),
                models_loaded: Default::default(),
            })
        });
        api
    }

    async fn booted(api: MockRecommendationApi, store: SessionStore) -> App {
        let mut app = App::new(Arc::new(api), store, &Config::default());
        app.boot().unwrap();
        app.settle().await;
        app
    }

    #[tokio::test]
    async fn test_boot_without_session_shows_landing() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        let app = booted(MockRecommendationApi::new(), store).await;
        assert!(matches!(app.screen(), Screen::Landing));
        assert!(app.session().is_none());
    }

    #[tokio::test]
    async fn test_boot_with_session_loads_feed_and_status() {
        let app = booted(api_with_feed(), signed_in_store()).await;
        let workspace = app.workspace().unwrap();
        assert_eq!(workspace.user().name, "Ann");
        assert_eq!(workspace.feed().items().len(), 3);
        assert!(!workspace.feed().is_loading());
        assert_eq!(workspace.status().unwrap().status, "healthy");
    }

    #[tokio::test]
    async fn test_invalid_transitions_are_rejected() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        let mut app = booted(MockRecommendationApi::new(), store).await;

        assert!(matches!(
            app.logout(),
            Err(ClientError::InvalidTransition {
                state: "landing",
                ..
            })
        ));
        assert!(app.boot().is_err());
        assert!(app.login("u@example.com", "secret1").await.is_err());

        app.navigate(Destination::Signup).unwrap();
        assert!(matches!(app.screen(), Screen::Auth(_)));
        app.navigate(Destination::Login).unwrap();
        assert_eq!(app.auth().unwrap().mode(), AuthMode::Login);

        app.back().unwrap();
        assert!(matches!(app.screen(), Screen::Landing));
        assert!(app.back().is_err());
    }

    #[tokio::test]
    async fn test_dislike_removes_item_even_when_logging_fails() {
        let mut api = api_with_feed();
        api.expect_log_interaction()
            .returning(|_, _| Err(ClientError::from_response(500, "")));

        let mut app = booted(api, signed_in_store()).await;
        let mut diagnostics = app.subscribe_diagnostics();
        let key = ItemKey::new(Domain::Movies, 42);

        assert_eq!(app.dislike(key).unwrap(), 1);
        let feed = app.workspace().unwrap().feed();
        assert_eq!(feed.items().len(), 2);
        assert!(feed.find(key).is_none());

        let notices = app.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Success);

        let diagnostic = diagnostics.recv().await.unwrap();
        assert_eq!(diagnostic.event.key(), key);
        assert_eq!(diagnostic.event.action_type, ActionType::Dislike);
    }

    #[tokio::test]
    async fn test_like_and_rate_succeed_when_logging_fails() {
        let mut api = api_with_feed();
        api.expect_log_interaction()
            .times(2)
            .returning(|_, _| Err(ClientError::from_response(500, "")));

        let mut app = booted(api, signed_in_store()).await;
        let mut diagnostics = app.subscribe_diagnostics();
        let before = app.workspace().unwrap().feed().items().to_vec();
        let key = ItemKey::new(Domain::Music, 5);

        assert!(app.like(key).is_ok());
        assert!(app.rate(key, 4).is_ok());
        assert_eq!(app.workspace().unwrap().feed().items(), before.as_slice());

        let notices = app.drain_notices();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.kind == NoticeKind::Success));
        assert_eq!(notices[1].message, "Rated 4 out of 5 stars");

        let mut failed = vec![
            diagnostics.recv().await.unwrap(),
            diagnostics.recv().await.unwrap(),
        ];
        failed.sort_by_key(|d| d.event.rating.is_some());
        assert_eq!(failed[0].event.action_type, ActionType::Like);
        assert_eq!(failed[1].event.action_type, ActionType::Rate);
        assert_eq!(failed[1].event.rating.map(|r| r.stars()), Some(4));
        assert!(failed.iter().all(|d| d.event.key() == key));
        assert!(diagnostics.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_onboarding_returns_to_signup_form() {
        let mut api = MockRecommendationApi::new();
        api.expect_signup().never();
        let mut app = App::new(
            Arc::new(api),
            SessionStore::new(Arc::new(MemoryStore::new())),
            &Config::default(),
        );
        app.boot().unwrap();
        assert!(app.cancel_onboarding().is_err());

        app.navigate(Destination::Signup).unwrap();
        assert!(app.cancel_onboarding().is_err());
        app.begin_signup("u@example.com", "secret1", "Ann").unwrap();
        app.wizard_mut().unwrap().toggle_option("Drama").unwrap();

        app.cancel_onboarding().unwrap();
        assert!(app.wizard_mut().is_none());
        let auth = app.auth().unwrap();
        assert!(!auth.is_onboarding());
        assert_eq!(auth.mode(), AuthMode::Signup);

        // Starting again opens a fresh questionnaire
        app.begin_signup("u@example.com", "secret1", "Ann").unwrap();
        let wizard = app.wizard_mut().unwrap();
        assert_eq!(wizard.step(), 0);
        assert!(!wizard.can_proceed());
    }

    #[tokio::test]
    async fn test_rate_rejects_out_of_range_stars() {
        let mut api = api_with_feed();
        api.expect_log_interaction().never();

        let mut app = booted(api, signed_in_store()).await;
        assert!(app.rate(ItemKey::new(Domain::Music, 5), 6).is_err());
        assert!(app.drain_notices().is_empty());
    }

    #[tokio::test]
    async fn test_select_opens_detail_and_logs_view() {
        let mut api = api_with_feed();
        api.expect_log_interaction()
            .withf(|_, event| event.action_type == ActionType::View && event.item_id == 5)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut app = booted(api, signed_in_store()).await;
        let mut diagnostics = app.subscribe_diagnostics();
        let key = ItemKey::new(Domain::Music, 5);

        app.select(key).unwrap();
        assert_eq!(app.workspace().unwrap().detail().unwrap().key, key);
        assert!(app.select(ItemKey::new(Domain::Products, 99)).is_err());

        app.close_detail().unwrap();
        assert!(app.workspace().unwrap().detail().is_none());

        // Let the detached log task finish before the mock is checked
        tokio::task::yield_now().await;
        assert!(diagnostics.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_learn_failure_leaves_preferences_and_feed_alone() {
        let mut api = api_with_feed();
        api.expect_update_from_interactions()
            .returning(|_, _| Err(ClientError::from_response(503, "")));

        let mut app = booted(api, signed_in_store()).await;
        let before = app.workspace().unwrap().user().profile.clone();

        assert!(app.learn_from_interactions(None).await.is_err());
        assert_eq!(app.workspace().unwrap().user().profile, before);
        assert_eq!(app.pending_requests(), 0);

        let notices = app.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, LEARN_FAILED);
    }

    #[tokio::test]
    async fn test_save_replaces_profile_and_refetches() {
        let mut api = api_with_feed();
        api.expect_update_preferences()
            .times(1)
            .returning(|_, _| {
                Ok(serde_json::from_value::<PreferenceProjection>(
                    json!({"favorite_genres": ["Drama", "Horror"]}),
                )
                .unwrap())
            });

        let mut app = booted(api, signed_in_store()).await;
        app.begin_edit_preferences().unwrap();
        app.toggle_preference(MultiField::MovieGenres, "Horror")
            .unwrap();
        app.save_preferences().await.unwrap();
        assert_eq!(app.pending_requests(), 1);
        app.settle().await;

        let workspace = app.workspace().unwrap();
        assert!(!workspace.editor().is_editing());
        assert!(workspace
            .user()
            .quiz_responses()
            .favorite_movie_genres
            .contains("Horror"));
        assert_eq!(
            workspace.user().profile.preferences().get("favorite_genres"),
            Some(&json!(["Drama", "Horror"]))
        );
        assert_eq!(workspace.user().profile.revision(), 1);
    }

    #[tokio::test]
    async fn test_logout_discards_late_feed_response() {
        let store = signed_in_store();
        let mut app = App::new(Arc::new(api_with_feed()), store.clone(), &Config::default());
        app.boot().unwrap();

        app.logout().unwrap();
        app.settle().await;
        assert!(matches!(app.screen(), Screen::Landing));
        assert!(store.restore().is_none());
        assert_eq!(app.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_dark_mode_persists() {
        let backend = Arc::new(MemoryStore::new());
        let mut app = App::new(
            Arc::new(MockRecommendationApi::new()),
            SessionStore::new(backend.clone()),
            &Config::default(),
        );
        app.boot().unwrap();
        assert!(!app.dark_mode());
        assert!(app.toggle_dark_mode());

        let mut restarted = App::new(
            Arc::new(MockRecommendationApi::new()),
            SessionStore::new(backend),
            &Config::default(),
        );
        restarted.boot().unwrap();
        assert!(restarted.dark_mode());
    }
}
