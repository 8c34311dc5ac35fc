// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use log::warn;
use secrecy::SecretString;
use serde_json::{Map, Value};

use super::Admin;

#[derive(Clone, Debug)]
pub(crate) enum Phase {
    LoggedOut,
    Authenticating,
    /// A token was found in storage but the server has not confirmed it or
    /// told us who it belongs to yet.
    AuthenticatedUnverified {
        token: SecretString,
    },
    Authenticated {
        admin: Admin,
        token: SecretString,
    },
    Failed {
        error: String,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct State {
    phase: Phase,
    verifying: bool,
}

#[derive(Debug)]
pub(crate) enum Action {
    LoginStart,
    LoginSuccess { admin: Admin, token: SecretString },
    LoginFailure(String),
    Restore { token: SecretString },
    VerifyStart,
    Verified { admin: Admin },
    Logout,
    UpdateProfile(Map<String, Value>),
    ClearError,
}

impl State {
    pub(crate) const fn phase(&self) -> &Phase {
        &self.phase
    }

    pub(crate) const fn is_authenticated(&self) -> bool {
        matches!(
            self.phase,
            Phase::AuthenticatedUnverified { .. } | Phase::Authenticated { .. }
        )
    }

    /// Whether the server has confirmed the session and supplied a profile.
    pub(crate) const fn is_verified(&self) -> bool {
        matches!(self.phase, Phase::Authenticated { .. })
    }

    pub(crate) const fn admin(&self) -> Option<&Admin> {
        match self.phase {
            Phase::Authenticated { ref admin, .. } => Some(admin),
            Phase::LoggedOut
            | Phase::Authenticating
            | Phase::AuthenticatedUnverified { .. }
            | Phase::Failed { .. } => None,
        }
    }

    pub(crate) const fn token(&self) -> Option<&SecretString> {
        match self.phase {
            Phase::Authenticated { ref token, .. }
            | Phase::AuthenticatedUnverified { ref token } => Some(token),
            Phase::LoggedOut | Phase::Authenticating | Phase::Failed { .. } => None,
        }
    }

    pub(crate) const fn loading(&self) -> bool {
        self.verifying || matches!(self.phase, Phase::Authenticating)
    }

    pub(crate) fn error(&self) -> Option<&str> {
        match self.phase {
            Phase::Failed { ref error } => Some(error),
            Phase::LoggedOut
            | Phase::Authenticating
            | Phase::AuthenticatedUnverified { .. }
            | Phase::Authenticated { .. } => None,
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self {
            phase: Phase::LoggedOut,
            verifying: false,
        }
    }
}

/// Applies `action` to `state`, returning the next state.
pub(crate) fn reduce(state: State, action: Action) -> State {
    let State { phase, verifying } = state;
    match (phase, action) {
        (_, Action::LoginStart) => State {
            phase: Phase::Authenticating,
            verifying,
        },
        (_, Action::LoginSuccess { admin, token }) => State {
            phase: Phase::Authenticated { admin, token },
            verifying,
        },
        (_, Action::LoginFailure(error)) => State {
            phase: Phase::Failed { error },
            verifying,
        },
        (_, Action::Restore { token }) => State {
            phase: Phase::AuthenticatedUnverified { token },
            verifying,
        },
        (phase, Action::VerifyStart) => State {
            phase,
            verifying: true,
        },
        (
            Phase::AuthenticatedUnverified { token } | Phase::Authenticated { token, .. },
            Action::Verified { admin },
        ) => State {
            phase: Phase::Authenticated { admin, token },
            verifying: false,
        },
        // A logout raced ahead of the verification; the session stays closed.
        (phase, Action::Verified { .. }) => State {
            phase,
            verifying: false,
        },
        (_, Action::Logout) => State::default(),
        (Phase::Authenticated { mut admin, token }, Action::UpdateProfile(patch)) => {
            if let Err(e) = admin.merge(patch) {
                warn!("Ignoring profile update that does not fit the admin profile: {}", e);
            }
            State {
                phase: Phase::Authenticated { admin, token },
                verifying,
            }
        }
        (phase, Action::UpdateProfile(_)) => State { phase, verifying },
        (Phase::Failed { .. }, Action::ClearError) => State {
            phase: Phase::LoggedOut,
            verifying,
        },
        (phase, Action::ClearError) => State { phase, verifying },
    }
}
