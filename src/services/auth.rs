use std::sync::Arc;

use super::{
    api::RecommendationApi,
    onboarding::{OnboardingWizard, WizardStep},
};
use crate::{
    error::{ClientError, ClientResult},
    models::{Credentials, PreferenceDocument, Session, SignupRequest},
};

pub const LOGIN_FAILED: &str = "Authentication failed";
pub const SIGNUP_FAILED: &str = "Signup failed";

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

/// Validated signup fields waiting for the questionnaire to finish
#[derive(Debug, Clone, PartialEq)]
pub struct SignupForm {
    pub credentials: Credentials,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthStage {
    Credentials,
    Onboarding {
        form: SignupForm,
        wizard: OnboardingWizard,
    },
}

/// Result of advancing the signup questionnaire
#[derive(Debug, Clone, PartialEq)]
pub enum OnboardingOutcome {
    Blocked,
    Advanced(usize),
    Authenticated(Session),
}

/// Login and signup flows.
///
/// Signup never reaches the service until the questionnaire completes, so every
/// account is created with its quiz responses attached.
pub struct AuthController {
    api: Arc<dyn RecommendationApi>,
    mode: AuthMode,
    stage: AuthStage,
    error: Option<String>,
}

impl AuthController {
    pub fn new(api: Arc<dyn RecommendationApi>, mode: AuthMode) -> Self {
        Self {
            api,
            mode,
            stage: AuthStage::Credentials,
            error: None,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn stage(&self) -> &AuthStage {
        &self.stage
    }

    /// Inline message for the credentials form
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_onboarding(&self) -> bool {
        matches!(self.stage, AuthStage::Onboarding { .. })
    }

    pub fn wizard(&self) -> Option<&OnboardingWizard> {
        match &self.stage {
            AuthStage::Onboarding { wizard, .. } => Some(wizard),
            AuthStage::Credentials => None,
        }
    }

    pub fn wizard_mut(&mut self) -> Option<&mut OnboardingWizard> {
        match &mut self.stage {
            AuthStage::Onboarding { wizard, .. } => Some(wizard),
            AuthStage::Credentials => None,
        }
    }

    /// Switches between the login and signup forms
    pub fn set_mode(&mut self, mode: AuthMode) -> ClientResult<()> {
        if self.is_onboarding() {
            return Err(ClientError::InvalidTransition {
                state: "onboarding",
                event: "switch auth mode",
            });
        }
        self.mode = mode;
        self.error = None;
        Ok(())
    }

    pub fn toggle_mode(&mut self) -> ClientResult<()> {
        let mode = match self.mode {
            AuthMode::Login => AuthMode::Signup,
            AuthMode::Signup => AuthMode::Login,
        };
        self.set_mode(mode)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<Session> {
        if self.is_onboarding() {
            return Err(ClientError::InvalidTransition {
                state: "onboarding",
                event: "log in",
            });
        }
        let credentials = match validate_credentials(email, password) {
            Ok(credentials) => credentials,
            Err(e) => return Err(self.fail(e, LOGIN_FAILED)),
        };
        self.error = None;

        match self.api.login(&credentials).await {
            Ok(response) => {
                tracing::info!(user_id = response.user.id, "Logged in");
                Ok(Session::from(response))
            }
            Err(e) => {
                tracing::warn!(error = %e, email = %credentials.email, "Login failed");
                Err(self.fail(e, LOGIN_FAILED))
            }
        }
    }

    /// Validates the signup form and starts the questionnaire; nothing is sent yet
    pub fn begin_signup(&mut self, email: &str, password: &str, name: &str) -> ClientResult<()> {
        if self.is_onboarding() {
            return Err(ClientError::InvalidTransition {
                state: "onboarding",
                event: "start signup",
            });
        }
        let form = match validate_signup(email, password, name) {
            Ok(form) => form,
            Err(e) => return Err(self.fail(e, SIGNUP_FAILED)),
        };

        tracing::debug!(email = %form.credentials.email, "Starting onboarding");
        self.mode = AuthMode::Signup;
        self.error = None;
        self.stage = AuthStage::Onboarding {
            form,
            wizard: OnboardingWizard::new(),
        };
        Ok(())
    }

    /// Advances the questionnaire, submitting the signup once the last question is answered
    pub async fn onboarding_next(&mut self) -> ClientResult<OnboardingOutcome> {
        let (form, mut wizard) = match std::mem::replace(&mut self.stage, AuthStage::Credentials) {
            AuthStage::Onboarding { form, wizard } => (form, wizard),
            AuthStage::Credentials => {
                return Err(ClientError::InvalidTransition {
                    state: "entering credentials",
                    event: "advance onboarding",
                })
            }
        };

        match wizard.next() {
            WizardStep::Blocked => {
                self.stage = AuthStage::Onboarding { form, wizard };
                Ok(OnboardingOutcome::Blocked)
            }
            WizardStep::Advanced(step) => {
                self.stage = AuthStage::Onboarding { form, wizard };
                Ok(OnboardingOutcome::Advanced(step))
            }
            WizardStep::Completed(responses) => self
                .submit_signup(form, responses)
                .await
                .map(OnboardingOutcome::Authenticated),
        }
    }

    pub fn onboarding_back(&mut self) -> ClientResult<usize> {
        self.wizard_mut()
            .map(OnboardingWizard::back)
            .ok_or(ClientError::InvalidTransition {
                state: "entering credentials",
                event: "go back in onboarding",
            })
    }

    /// Abandons the questionnaire and returns to the signup form
    pub fn cancel_onboarding(&mut self) {
        if self.is_onboarding() {
            tracing::debug!("Onboarding abandoned");
        }
        self.stage = AuthStage::Credentials;
    }

    async fn submit_signup(
        &mut self,
        form: SignupForm,
        quiz_responses: PreferenceDocument,
    ) -> ClientResult<Session> {
        let request = SignupRequest {
            credentials: form.credentials,
            name: form.name,
            quiz_responses,
        };

        match self.api.signup(&request).await {
            Ok(response) => {
                tracing::info!(user_id = response.user.id, "Account created");
                self.error = None;
                Ok(Session::from(response))
            }
            Err(e) => {
                // Stage was already reset to credentials; the questionnaire answers are dropped
                tracing::warn!(error = %e, email = %request.credentials.email, "Signup failed");
                Err(self.fail(e, SIGNUP_FAILED))
            }
        }
    }

    fn fail(&mut self, error: ClientError, fallback: &str) -> ClientError {
        self.error = Some(error.user_message(fallback));
        error
    }
}

pub fn validate_credentials(email: &str, password: &str) -> ClientResult<Credentials> {
    let email = email.trim();
    if !email.contains('@') {
        return Err(ClientError::InvalidInput(
            "Please enter a valid email address".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClientError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(Credentials {
        email: email.to_string(),
        password: password.to_string(),
    })
}

pub fn validate_signup(email: &str, password: &str, name: &str) -> ClientResult<SignupForm> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClientError::InvalidInput("Please enter your name".to_string()));
    }
    Ok(SignupForm {
        credentials: validate_credentials(email, password)?,
        name: name.to_string(),
    })
}
