// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use log::debug;

use crate::{
    error::Result,
    storage::{Scope, Storage as _},
};

use super::Context;

#[derive(Debug, Subcommand)]
enum Action {
    /// End the browsing session, discarding everything kept only for it.
    End,
}

/// Manage the browsing session.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    #[command(subcommand)]
    action: Action,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        match self.action {
            Action::End => {
                ctx.storage.lock().await.clear(Scope::Session).await?;
                debug!("Session storage cleared");
            }
        }
        Ok(())
    }
}
