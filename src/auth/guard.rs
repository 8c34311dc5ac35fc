// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use super::state::{Phase, State};

pub(crate) const LOGIN_PATH: &str = "/admin/login";
pub(crate) const UNAUTHORIZED_PATH: &str = "/unauthorized";
pub(crate) const DEFAULT_ROLE: &str = "admin";

/// What to do with a navigation to an admin route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Access {
    /// Show a loading indicator; the session is still being established.
    Loading,
    /// Redirect to the login page, returning to `from` afterwards.
    Login { from: String },
    /// Redirect to the unauthorized page.
    Unauthorized { from: String },
    Granted,
}

impl Access {
    /// The path to redirect to, if any.
    pub(crate) const fn redirect(&self) -> Option<&'static str> {
        match *self {
            Self::Login { .. } => Some(LOGIN_PATH),
            Self::Unauthorized { .. } => Some(UNAUTHORIZED_PATH),
            Self::Loading | Self::Granted => None,
        }
    }
}

/// Decides access to `route`. When `required_role` is set, the verified admin
/// must hold exactly that role.
///
/// A restored but unverified session never grants access: its profile is not
/// known yet, so the caller sees [`Access::Loading`] until verification
/// resolves one way or the other.
pub(crate) fn check(state: &State, route: &str, required_role: Option<&str>) -> Access {
    if state.loading() {
        return Access::Loading;
    }

    match *state.phase() {
        Phase::LoggedOut | Phase::Authenticating | Phase::Failed { .. } => Access::Login {
            from: route.to_owned(),
        },
        Phase::AuthenticatedUnverified { .. } => Access::Loading,
        Phase::Authenticated { ref admin, .. } => match required_role {
            Some(role) if !admin.has_role(role) => Access::Unauthorized {
                from: route.to_owned(),
            },
            _ => Access::Granted,
        },
    }
}
