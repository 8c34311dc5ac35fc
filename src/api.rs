// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use secrecy::{ExposeSecret as _, SecretString};
use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize};
use serde_json::{json, Map, Value};

use crate::{
    auth::Admin,
    error::Result,
    transport::{Request, Transport},
};

#[async_trait]
pub(crate) trait Executor: Into<Request> + Send {
    type Response: DeserializeOwned;

    async fn execute(self, transport: &dyn Transport) -> Result<Self::Response> {
        let body = transport.send(self.into()).await?;
        Ok(serde_json::from_value(body)?)
    }
}

/// The `{ data: { admin } }` envelope used by the auth endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct AdminEnvelope<A> {
    #[serde(default = "Option::default")]
    data: Option<AdminData<A>>,
}

#[derive(Debug, Deserialize)]
struct AdminData<A> {
    #[serde(default = "Option::default")]
    admin: Option<A>,
}

impl<A> AdminEnvelope<A> {
    pub(crate) fn into_admin(self) -> Option<A> {
        self.data.and_then(|data| data.admin)
    }
}

pub(crate) struct Credentials {
    pub(crate) email: String,
    pub(crate) password: SecretString,
}

pub(crate) struct Login(pub(crate) Credentials);

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub(crate) token: Option<String>,
    #[serde(flatten)]
    pub(crate) envelope: AdminEnvelope<Admin>,
}

impl From<Login> for Request {
    fn from(value: Login) -> Self {
        Self::post("auth/login").with_body(json!({
            "email": value.0.email,
            "password": value.0.password.expose_secret(),
        }))
    }
}

impl Executor for Login {
    type Response = LoginResponse;
}

pub(crate) struct Logout;

impl From<Logout> for Request {
    fn from(_: Logout) -> Self {
        Self::post("auth/logout")
    }
}

impl Executor for Logout {
    type Response = IgnoredAny;
}

pub(crate) struct VerifyToken;

impl From<VerifyToken> for Request {
    fn from(_: VerifyToken) -> Self {
        Self::get("auth/verify-token")
            .with_header("Cache-Control", "no-cache")
            .with_header("Pragma", "no-cache")
    }
}

impl Executor for VerifyToken {
    type Response = AdminEnvelope<Admin>;
}

pub(crate) struct ChangePassword {
    pub(crate) current_password: SecretString,
    pub(crate) new_password: SecretString,
}

impl From<ChangePassword> for Request {
    fn from(value: ChangePassword) -> Self {
        Self::put("auth/change-password").with_body(json!({
            "currentPassword": value.current_password.expose_secret(),
            "newPassword": value.new_password.expose_secret(),
        }))
    }
}

impl Executor for ChangePassword {
    type Response = IgnoredAny;
}

pub(crate) struct UpdateProfile(pub(crate) Map<String, Value>);

impl From<UpdateProfile> for Request {
    fn from(value: UpdateProfile) -> Self {
        Self::put("auth/profile").with_body(Value::Object(value.0))
    }
}

impl Executor for UpdateProfile {
    type Response = AdminEnvelope<Map<String, Value>>;
}

pub(crate) struct ForgotPassword {
    pub(crate) email: String,
}

impl From<ForgotPassword> for Request {
    fn from(value: ForgotPassword) -> Self {
        Self::post("auth/forgot-password").with_body(json!({ "email": value.email }))
    }
}

impl Executor for ForgotPassword {
    type Response = IgnoredAny;
}

pub(crate) struct ResetPassword {
    pub(crate) token: String,
    pub(crate) password: SecretString,
}

impl From<ResetPassword> for Request {
    fn from(value: ResetPassword) -> Self {
        Self::post("auth/reset-password").with_body(json!({
            "token": value.token,
            "password": value.password.expose_secret(),
        }))
    }
}

impl Executor for ResetPassword {
    type Response = IgnoredAny;
}

pub(crate) struct PartnerLookup {
    pub(crate) code: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct Partner {
    pub(crate) name: Option<String>,
    #[serde(rename = "type")]
    pub(crate) type_: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PartnerLookupResponse {
    data: PartnerData,
}

#[derive(Debug, Deserialize)]
struct PartnerData {
    partner: Partner,
}

impl PartnerLookupResponse {
    pub(crate) fn into_partner(self) -> Partner {
        self.data.partner
    }
}

impl From<PartnerLookup> for Request {
    fn from(value: PartnerLookup) -> Self {
        Self::get("partners/lookup")
            .with_segment(&value.code)
            .anonymous()
    }
}

impl Executor for PartnerLookup {
    type Response = PartnerLookupResponse;
}
