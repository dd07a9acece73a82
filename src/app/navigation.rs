use std::fmt::Display;

use super::state::Workspace;
use crate::services::{AuthController, AuthMode};

/// Sub-view of the authenticated app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Feed,
    Profile,
    Stats,
}

impl Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Tab::Feed => "recommendations",
            Tab::Profile => "profile",
            Tab::Stats => "stats",
        };
        f.write_str(name)
    }
}

/// Targets reachable by explicit navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Landing,
    Login,
    Signup,
}

impl Destination {
    pub fn auth_mode(&self) -> Option<AuthMode> {
        match self {
            Destination::Landing => None,
            Destination::Login => Some(AuthMode::Login),
            Destination::Signup => Some(AuthMode::Signup),
        }
    }
}

/// Top-level screen.
///
/// The session only exists inside [`Screen::Authenticated`], so no other screen
/// can observe a signed-in user.
pub enum Screen {
    Loading,
    Landing,
    Auth(AuthController),
    Authenticated(Box<Workspace>),
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Loading => "loading",
            Screen::Landing => "landing",
            Screen::Auth(_) => "auth",
            Screen::Authenticated(_) => "authenticated",
        }
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
