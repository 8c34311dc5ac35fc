// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use url::Url;

use crate::error::Result;

use super::{referral::describe, Context};

/// Record a landing on the site, capturing any partner referral in the URL.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The full URL of the landing page, including its query string.
    #[arg(value_parser = Url::parse)]
    url: Url,

    /// Do not report a page view for the landing.
    #[arg(long)]
    no_page_view: bool,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        let mut tracker = ctx.tracker();
        let referral = tracker.capture_from_url(&self.url).await?;
        if !self.no_page_view {
            tracker.page_view(&self.url);
        }

        match referral {
            Some(ref referral) => describe(referral),
            None => println!("No active referral"),
        }
        Ok(())
    }
}
