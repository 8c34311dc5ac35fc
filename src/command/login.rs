// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::{api::Credentials, error::Result, password::Request};

use super::Context;

/// How many passwords to try before giving up.
const ATTEMPTS: usize = 3;

/// Sign in to the admin area.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The admin account's email address.
    #[arg(long, env = "WHITEBARN_ADMIN_EMAIL")]
    email: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        let session = ctx.session();
        let mut req = Request::new("Password");
        let mut attempt = 1;
        loop {
            let credentials = Credentials {
                email: self.email.clone(),
                password: ctx.secret(req).await?,
            };
            match session.login(credentials).await {
                Ok(()) => break,
                Err(failure) if attempt < ATTEMPTS => {
                    session.clear_error().await;
                    req = Request::new("Password").with_error(&failure.to_string());
                    attempt += 1;
                }
                Err(failure) => return Err(failure.into()),
            }
        }

        if session
            .state()
            .await
            .admin()
            .map_or(false, |admin| admin.require_password_change)
        {
            println!("A password change is required before continuing");
        }
        Ok(())
    }
}
