// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret as _, SecretString};

use crate::{error::Result, password::Request};

use super::Context;

#[derive(Debug, Subcommand)]
enum Action {
    /// Change the signed-in admin's password.
    Change,
    /// Ask the server to email a password reset link.
    Forgot {
        /// The admin account's email address.
        #[arg(long, env = "WHITEBARN_ADMIN_EMAIL")]
        email: String,
    },
    /// Set a new password using the token from a reset email.
    Reset {
        /// The reset token from the email.
        #[arg(long)]
        token: String,
    },
}

/// Change, recover or reset the admin password.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    #[command(subcommand)]
    action: Action,
}

/// Asks for a new password twice until both entries match.
async fn new_password(ctx: &Context) -> Result<SecretString> {
    let mut req = Request::new("New password");
    loop {
        let password = ctx.secret(req).await?;
        let confirmation = ctx.secret(Request::new("Confirm new password")).await?;
        if password.expose_secret() == confirmation.expose_secret() {
            return Ok(password);
        }
        req = Request::new("New password").with_error("The passwords did not match");
    }
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        match self.action {
            Action::Change => {
                let session = ctx.verified_session().await?;
                let current = ctx.secret(Request::new("Current password")).await?;
                let new = new_password(&ctx).await?;
                session.change_password(current, new).await?;
            }
            Action::Forgot { email } => {
                ctx.session().forgot_password(&email).await?;
            }
            Action::Reset { token } => {
                let new = new_password(&ctx).await?;
                ctx.session().reset_password(&token, new).await?;
            }
        }
        Ok(())
    }
}
