// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::error::Result;

use super::Context;

/// Report a contact-form lead, crediting any active referral.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Where on the site the form was submitted from.
    #[arg(long)]
    source: String,

    /// The kind of inquiry. Defaults to a general inquiry.
    #[arg(long)]
    event_type: Option<String>,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        let mut tracker = ctx.tracker();
        tracker
            .lead_submit(&self.source, self.event_type.as_deref())
            .await?;
        ctx.notifier.success("Lead recorded");
        Ok(())
    }
}
