// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use serde_json::Value;

use crate::{auth::Admin, error::Result};

use super::{parse_param, print_fields, Context, Field};

pub(crate) fn describe(admin: &Admin) {
    let mut fields = vec![
        Field::optional("ID", admin.key()),
        Field::optional("Email", admin.email.as_deref()),
        Field::optional("Name", admin.name.as_deref()),
        Field::optional("Role", admin.role.as_deref()),
        Field::new("Password change required", admin.require_password_change),
    ];
    fields.extend(admin.extra.iter().map(|(key, value)| Field {
        name: "Other",
        value: format!("{key}: {value}"),
    }));
    print_fields(fields);
}

/// Show or update the signed-in admin's profile.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Profile fields to change, as key=value. Values are read as JSON when
    /// possible.
    #[arg(long = "set", value_parser = parse_param)]
    fields: Vec<(String, Value)>,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        let session = ctx.verified_session().await?;
        if !self.fields.is_empty() {
            session
                .update_profile(self.fields.into_iter().collect())
                .await?;
        }

        if let Some(admin) = session.state().await.admin() {
            describe(admin);
        }
        Ok(())
    }
}
