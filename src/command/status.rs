// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::debug;

use crate::{
    auth::guard::{self, Access},
    error::Result,
};

use super::{print_fields, Context, Field};

fn access_label(access: &Access) -> String {
    match *access {
        Access::Loading => "pending verification".to_owned(),
        Access::Granted => "granted".to_owned(),
        Access::Login { ref from } | Access::Unauthorized { ref from } => format!(
            "redirect to {} (from {})",
            access.redirect().unwrap_or_default(),
            from
        ),
    }
}

/// Show the admin session and whether it may open a given admin route.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The admin route to check access to.
    #[arg(long, default_value = "/admin")]
    route: String,

    /// The role the route requires.
    #[arg(long, default_value = guard::DEFAULT_ROLE, conflicts_with = "any_role")]
    role: String,

    /// Allow any signed-in admin regardless of role.
    #[arg(long)]
    any_role: bool,

    /// Use the stored token as-is instead of confirming it with the server.
    #[arg(long)]
    no_verify: bool,
}

impl Command {
    async fn report(&self, ctx: &Context) -> Result<Vec<Field>> {
        let session = ctx.session();
        if session.restore().await && !self.no_verify {
            let outcome = session.verify_token().await;
            debug!("Verification finished: {:?}", outcome);
        }

        let state = session.state().await;
        let required_role = (!self.any_role).then_some(self.role.as_str());
        let access = guard::check(&state, &self.route, required_role);

        let admin = state.admin();
        Ok(vec![
            Field::new("Authenticated", state.is_authenticated()),
            Field::new("Verified", state.is_verified()),
            Field::optional("Email", admin.and_then(|admin| admin.email.as_deref())),
            Field::optional("Role", admin.and_then(|admin| admin.role.as_deref())),
            Field::new(
                "Password change required",
                admin.map_or(false, |admin| admin.require_password_change),
            ),
            Field::optional("Error", state.error()),
            Field::new("Access", access_label(&access)),
            Field::new("Bearer attached", ctx.transport.bearer().await.is_some()),
            Field::new(
                "Active referral",
                ctx.tracker().has_active_referral().await?,
            ),
        ])
    }
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        print_fields(self.report(&ctx).await?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::{
        auth::token,
        referral::{self, Referral, Utm},
        storage::{self, Memory, Scope, Storage as _},
        testing::{self, FakeTransport, Reply, ScriptedPrompt},
        transport::Method,
    };

    use super::*;

    fn command(no_verify: bool) -> Command {
        Command {
            route: "/admin".to_owned(),
            role: guard::DEFAULT_ROLE.to_owned(),
            any_role: false,
            no_verify,
        }
    }

    fn value<'a>(fields: &'a [Field], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }

    #[tokio::test]
    async fn reports_bearer_and_referral() -> Result<()> {
        let mut storage = Memory::new();
        let token = token::tests::token_with_claims(
            &json!({ "id": "65f1", "exp": testing::NOW_MS / 1000 + 3600 }),
        );
        storage
            .set(Scope::Durable, token::STORAGE_KEY, &token)
            .await?;
        let referral = Referral {
            ref_code: "PARTNER1".to_owned(),
            utm: Utm::default(),
            timestamp: testing::NOW_MS,
            page: "/".to_owned(),
            partner_name: None,
            partner_type: None,
            expires_at: None,
        };
        storage::set_json(&mut storage, Scope::Session, referral::STORAGE_KEY, &referral)
            .await?;

        let transport = Arc::new(FakeTransport::new().reply(
            Method::Get,
            "auth/verify-token",
            Reply::Json(json!({
                "success": true,
                "data": { "admin": { "email": "events@thewhitebarnfl.com", "role": "admin" } },
            })),
        ));
        let prompt = Arc::new(ScriptedPrompt::default());
        let ctx = testing::context(&storage, &transport, &prompt);

        let fields = command(false).report(&ctx).await?;
        assert_eq!(value(&fields, "Verified"), Some("true"));
        assert_eq!(value(&fields, "Access"), Some("granted"));
        assert_eq!(value(&fields, "Bearer attached"), Some("true"));
        assert_eq!(value(&fields, "Active referral"), Some("true"));
        Ok(())
    }

    #[tokio::test]
    async fn reports_a_signed_out_session() -> Result<()> {
        let storage = Memory::new();
        let transport = Arc::new(FakeTransport::new());
        let prompt = Arc::new(ScriptedPrompt::default());
        let ctx = testing::context(&storage, &transport, &prompt);

        let fields = command(true).report(&ctx).await?;
        assert_eq!(value(&fields, "Authenticated"), Some("false"));
        assert_eq!(value(&fields, "Bearer attached"), Some("false"));
        assert_eq!(value(&fields, "Active referral"), Some("false"));
        assert_eq!(
            value(&fields, "Access"),
            Some("redirect to /admin/login (from /admin)")
        );
        assert_eq!(transport.count("auth/verify-token"), 0);
        Ok(())
    }

    #[test]
    fn access_labels_name_the_redirect() {
        assert_eq!(access_label(&Access::Granted), "granted");
        assert_eq!(
            access_label(&Access::Login {
                from: "/admin/gallery".to_owned()
            }),
            "redirect to /admin/login (from /admin/gallery)"
        );
        assert_eq!(
            access_label(&Access::Unauthorized {
                from: "/admin".to_owned()
            }),
            "redirect to /unauthorized (from /admin)"
        );
    }
}
