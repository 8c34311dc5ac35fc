// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod admin;
pub(crate) mod guard;
pub(crate) mod state;
pub(crate) mod token;

use std::{mem, sync::Arc};

use futures_util::{
    future::{BoxFuture, FutureExt as _, Shared},
    lock::Mutex,
};
use log::{debug, info, warn};
use secrecy::{ExposeSecret as _, SecretString};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{
    api::{self, Executor as _},
    clock::Clock,
    error::{Error, Result},
    notify::Notifier,
    storage::{Scope, Storage},
    transport::Transport,
};

pub(crate) use admin::Admin;
use state::{Action, State};

const INVALID_RESPONSE: &str = "Invalid response from server";

/// A user-facing explanation of why an auth operation did not succeed.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{0}")]
pub(crate) struct Failure(pub(crate) String);

pub(crate) type Outcome = std::result::Result<(), Failure>;

/// How a token verification ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Verification {
    Verified,
    LoggedOut,
}

type PendingVerification = Shared<BoxFuture<'static, Verification>>;

struct Inner {
    storage: Arc<Mutex<Box<dyn Storage>>>,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    state: RwLock<State>,
    verification: Mutex<Option<PendingVerification>>,
}

/// The admin session. Clones share the same state.
#[derive(Clone)]
pub(crate) struct Session {
    inner: Arc<Inner>,
}

fn failure_message(err: &Error, fallback: &str) -> String {
    if matches!(*err, Error::InvalidResponse(_)) {
        return INVALID_RESPONSE.to_owned();
    }
    err.server_message()
        .map_or_else(|| fallback.to_owned(), str::to_owned)
}

impl Inner {
    async fn dispatch(&self, action: Action) {
        debug!("Auth action: {:?}", action);
        let mut guard = self.state.write().await;
        *guard = state::reduce(mem::take(&mut *guard), action);
    }

    async fn stored_token(&self) -> Option<String> {
        let mut storage = self.storage.lock().await;
        match storage.get(Scope::Durable, token::STORAGE_KEY).await {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not read the stored admin token: {}", e);
                None
            }
        }
    }

    async fn store_token(&self, token: &str) {
        let mut storage = self.storage.lock().await;
        if let Err(e) = storage.set(Scope::Durable, token::STORAGE_KEY, token).await {
            warn!("Could not persist the admin token: {}", e);
        }
    }

    /// Drops every trace of the session: the stored token, the transport's
    /// bearer and the in-memory state.
    async fn end(&self) {
        {
            let mut storage = self.storage.lock().await;
            if let Err(e) = storage.remove(Scope::Durable, token::STORAGE_KEY).await {
                warn!("Could not remove the stored admin token: {}", e);
            }
        }
        self.transport.set_bearer(None).await;
        self.dispatch(Action::Logout).await;
    }

    async fn current_token(&self) -> Option<String> {
        match self.stored_token().await {
            Some(token) => Some(token),
            None => self
                .state
                .read()
                .await
                .token()
                .map(|token| token.expose_secret().clone()),
        }
    }

    async fn fetch_admin(&self) -> Result<Admin> {
        let token = self
            .current_token()
            .await
            .filter(|token| token::is_well_formed(token, self.clock.now_ms()))
            .ok_or(Error::MissingToken)?;
        self.transport
            .set_bearer(Some(SecretString::new(token)))
            .await;

        api::VerifyToken
            .execute(&*self.transport)
            .await?
            .into_admin()
            .ok_or(Error::InvalidResponse("verification response has no admin"))
    }

    async fn verify(&self) -> Verification {
        self.dispatch(Action::VerifyStart).await;
        match self.fetch_admin().await {
            Ok(admin) => {
                debug!(
                    "Token verified for {}",
                    admin.email.as_deref().unwrap_or("unknown admin")
                );
                self.dispatch(Action::Verified { admin }).await;
                Verification::Verified
            }
            Err(e) => {
                warn!("Token verification failed: {}", e);
                self.end().await;
                Verification::LoggedOut
            }
        }
    }

    async fn authenticate(&self, credentials: api::Credentials) -> Result<(String, Admin)> {
        let resp = api::Login(credentials).execute(&*self.transport).await?;
        match (resp.token, resp.envelope.into_admin()) {
            (Some(token), Some(admin)) if !token.is_empty() => Ok((token, admin)),
            _ => Err(Error::InvalidResponse("login response lacks token or admin")),
        }
    }

    /// Reports a failed call made on behalf of the signed-in admin. A
    /// rejected token ends the session.
    async fn authenticated_failure(&self, err: &Error, fallback: &str) -> Failure {
        if err.is_unauthorized() {
            warn!("The server rejected the admin session: {}", err);
            self.end().await;
        }
        self.failure(err, fallback)
    }

    fn failure(&self, err: &Error, fallback: &str) -> Failure {
        let message = failure_message(err, fallback);
        self.notifier.error(&message);
        Failure(message)
    }
}

impl Session {
    pub(crate) fn new(
        storage: Arc<Mutex<Box<dyn Storage>>>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                transport,
                notifier,
                clock,
                state: RwLock::new(State::default()),
                verification: Mutex::new(None),
            }),
        }
    }

    pub(crate) async fn state(&self) -> State {
        self.inner.state.read().await.clone()
    }

    /// Seeds the session from a previously stored token without contacting
    /// the server. Returns whether a usable token was found; the session is
    /// then authenticated but unverified until [`Self::verify_token`] runs.
    pub(crate) async fn restore(&self) -> bool {
        match self.inner.stored_token().await {
            Some(token) if token::is_well_formed(&token, self.inner.clock.now_ms()) => {
                let token = SecretString::new(token);
                self.inner.transport.set_bearer(Some(token.clone())).await;
                self.inner.dispatch(Action::Restore { token }).await;
                true
            }
            Some(_) => {
                debug!("Discarding a stored admin token that is malformed or expired");
                self.inner.end().await;
                false
            }
            None => {
                self.inner.dispatch(Action::Logout).await;
                false
            }
        }
    }

    pub(crate) async fn login(&self, credentials: api::Credentials) -> Outcome {
        self.inner.dispatch(Action::LoginStart).await;

        let email = credentials.email.clone();
        match self.inner.authenticate(credentials).await {
            Ok((token, admin)) => {
                self.inner.store_token(&token).await;
                let token = SecretString::new(token);
                self.inner.transport.set_bearer(Some(token.clone())).await;
                self.inner
                    .dispatch(Action::LoginSuccess { admin, token })
                    .await;
                info!("Login successful for {}", email);
                self.inner.notifier.success("Login successful!");
                Ok(())
            }
            Err(e) => {
                warn!("Login failed for {}: {}", email, e);
                let message = failure_message(&e, "Login failed");
                self.inner
                    .dispatch(Action::LoginFailure(message.clone()))
                    .await;
                self.inner.notifier.error(&message);
                Err(Failure(message))
            }
        }
    }

    /// Ends the session. The server is told when we hold a token, but the
    /// local session is closed whatever it answers.
    pub(crate) async fn logout(&self) {
        if self.inner.current_token().await.is_some() {
            if let Err(e) = api::Logout.execute(&*self.inner.transport).await {
                warn!("Logout request failed, closing the session anyway: {}", e);
            }
        }
        self.inner.end().await;
        self.inner.notifier.success("Logged out successfully");
    }

    /// Confirms the stored token with the server. Callers that arrive while a
    /// verification is already running wait for that one instead of starting
    /// another.
    pub(crate) async fn verify_token(&self) -> Verification {
        let pending = {
            let mut slot = self.inner.verification.lock().await;
            if let Some(pending) = slot.as_ref() {
                debug!("Token verification already in progress, waiting for it");
                pending.clone()
            } else {
                let inner = Arc::clone(&self.inner);
                let pending = async move {
                    let outcome = inner.verify().await;
                    let _finished = inner.verification.lock().await.take();
                    outcome
                }
                .boxed()
                .shared();
                *slot = Some(pending.clone());
                pending
            }
        };
        pending.await
    }

    pub(crate) async fn change_password(
        &self,
        current_password: SecretString,
        new_password: SecretString,
    ) -> Outcome {
        let req = api::ChangePassword {
            current_password,
            new_password,
        };
        match req.execute(&*self.inner.transport).await {
            Ok(_) => {
                let mut patch = Map::new();
                let _previous = patch.insert("requirePasswordChange".to_owned(), Value::Bool(false));
                self.inner.dispatch(Action::UpdateProfile(patch)).await;
                self.inner.notifier.success("Password changed successfully!");
                Ok(())
            }
            Err(e) => Err(self
                .inner
                .authenticated_failure(&e, "Password change failed")
                .await),
        }
    }

    pub(crate) async fn update_profile(&self, patch: Map<String, Value>) -> Outcome {
        match api::UpdateProfile(patch).execute(&*self.inner.transport).await {
            Ok(resp) => {
                if let Some(fields) = resp.into_admin() {
                    self.inner.dispatch(Action::UpdateProfile(fields)).await;
                }
                self.inner.notifier.success("Profile updated successfully!");
                Ok(())
            }
            Err(e) => Err(self
                .inner
                .authenticated_failure(&e, "Profile update failed")
                .await),
        }
    }

    pub(crate) async fn forgot_password(&self, email: &str) -> Outcome {
        let req = api::ForgotPassword {
            email: email.to_owned(),
        };
        match req.execute(&*self.inner.transport).await {
            Ok(_) => {
                self.inner.notifier.success("Password reset email sent!");
                Ok(())
            }
            Err(e) => Err(self.inner.failure(&e, "Failed to send reset email")),
        }
    }

    pub(crate) async fn reset_password(&self, token: &str, password: SecretString) -> Outcome {
        let req = api::ResetPassword {
            token: token.to_owned(),
            password,
        };
        match req.execute(&*self.inner.transport).await {
            Ok(_) => {
                self.inner.notifier.success("Password reset successfully!");
                Ok(())
            }
            Err(e) => Err(self.inner.failure(&e, "Password reset failed")),
        }
    }

    pub(crate) async fn clear_error(&self) {
        self.inner.dispatch(Action::ClearError).await;
    }
}
