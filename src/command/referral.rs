// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::Value;

use log::error;

use crate::{
    error::{Error, Result},
    referral::{PartnerInfo, Referral},
};

use super::{parse_param, print_fields, Context, Field};

pub(crate) fn describe(referral: &Referral) {
    print_fields(vec![
        Field::new("Code", &referral.ref_code),
        Field::optional("Partner", referral.partner_name.as_deref()),
        Field::optional("Partner type", referral.partner_type.as_deref()),
        Field::optional("UTM source", referral.utm.source.as_deref()),
        Field::optional("UTM medium", referral.utm.medium.as_deref()),
        Field::optional("UTM campaign", referral.utm.campaign.as_deref()),
        Field::optional("UTM content", referral.utm.content.as_deref()),
        Field::optional("UTM term", referral.utm.term.as_deref()),
        Field::new("Landing page", &referral.page),
        Field::new("Captured at (ms)", referral.timestamp),
    ]);
}

fn partner_fields(partner: &PartnerInfo) -> Vec<Field> {
    vec![
        Field::new("Code", &partner.code),
        Field::optional("Name", partner.name.as_deref()),
        Field::optional("Type", partner.type_.as_deref()),
    ]
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Show the active referral.
    Show,
    /// Show the partner credited with the active referral.
    Partner,
    /// Print the active referral code. Fails when there is none.
    Code,
    /// Print the referral fields attached to contact-form submissions as JSON.
    FormData,
    /// Report a conversion for the active referral.
    Convert {
        /// The kind of conversion, such as `contact_form_submit`.
        event_type: String,

        /// Extra event parameters as key=value. Values are read as JSON when
        /// possible.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },
    /// Forget the referral and every visit marker.
    Clear,
}

/// Inspect or act on the stored partner referral.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    #[command(subcommand)]
    action: Action,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        let mut tracker = ctx.tracker();
        match self.action {
            Action::Show => match tracker.load_persisted().await? {
                Some(ref referral) => describe(referral),
                None => println!("No active referral"),
            },
            Action::Partner => match tracker.partner_info().await? {
                Some(ref partner) => print_fields(partner_fields(partner)),
                None => println!("No active referral"),
            },
            Action::Code => match tracker.referral_code().await? {
                Some(code) => println!("{code}"),
                None => {
                    error!("No active referral");
                    return Err(Error::Command);
                }
            },
            Action::FormData => {
                let _loaded = tracker.load_persisted().await?;
                println!("{}", serde_json::to_string_pretty(&tracker.form_data())?);
            }
            Action::Convert { event_type, params } => {
                if tracker
                    .track_conversion(&event_type, params.into_iter().collect())
                    .await?
                {
                    ctx.notifier
                        .success(&format!("Conversion {event_type} recorded"));
                } else {
                    println!("No active referral; nothing recorded");
                }
            }
            Action::Clear => {
                tracker.clear().await?;
                ctx.notifier.success("Referral data cleared");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partner_fields_mark_unknown_values() {
        let fields = partner_fields(&PartnerInfo {
            code: "PARTNER1".to_owned(),
            name: Some("Bloom Florals".to_owned()),
            type_: None,
        });
        let rows: Vec<_> = fields
            .iter()
            .map(|field| (field.name, field.value.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![("Code", "PARTNER1"), ("Name", "Bloom Florals"), ("Type", "-")]
        );
    }
}
