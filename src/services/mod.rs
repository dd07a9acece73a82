pub mod api;
pub mod auth;
pub mod feed;
pub mod interactions;
pub mod onboarding;
pub mod preferences;

pub use api::{HttpApiClient, RecommendationApi};
pub use auth::{AuthController, AuthMode, AuthStage, OnboardingOutcome};
pub use feed::{FeedController, FeedLimits, FeedRequest};
pub use interactions::{Diagnostic, InteractionRecorder};
pub use onboarding::{OnboardingWizard, WizardStep};
pub use preferences::PreferenceEditor;
