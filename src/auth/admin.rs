// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

/// The admin profile as returned by the API. Fields this client does not
/// interpret are carried along untouched.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Admin {
    #[serde(default, deserialize_with = "scalar_id")]
    pub(crate) id: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) role: Option<String>,
    #[serde(default)]
    pub(crate) require_password_change: bool,
    #[serde(flatten)]
    pub(crate) extra: Map<String, Value>,
}

/// Accepts string and numeric identifiers alike.
fn scalar_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        Some(Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_)) | None => None,
    })
}

impl Admin {
    /// The record identifier, whether the backend sent it as `id` or as a
    /// document `_id`.
    pub(crate) fn key(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.extra.get("_id").and_then(Value::as_str))
    }

    pub(crate) fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }

    /// Overlays `patch` onto this profile field by field.
    pub(crate) fn merge(&mut self, patch: Map<String, Value>) -> serde_json::Result<()> {
        let mut fields = match serde_json::to_value(&*self)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.extend(patch);
        *self = serde_json::from_value(Value::Object(fields))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_mongo_style_ids_and_keeps_unknown_fields() -> serde_json::Result<()> {
        let admin: Admin = serde_json::from_value(json!({
            "_id": "65f1",
            "email": "events@thewhitebarnfl.com",
            "role": "admin",
            "lastLogin": "2024-05-01T10:00:00Z",
        }))?;

        assert_eq!(admin.key(), Some("65f1"));
        assert!(admin.has_role("admin"));
        assert!(!admin.require_password_change);
        assert_eq!(
            admin.extra.get("lastLogin"),
            Some(&json!("2024-05-01T10:00:00Z"))
        );
        Ok(())
    }

    #[test]
    fn tolerates_virtual_and_numeric_ids() -> serde_json::Result<()> {
        let both: Admin = serde_json::from_value(json!({
            "_id": "65f1",
            "id": "65f1",
            "email": "events@thewhitebarnfl.com",
        }))?;
        assert_eq!(both.id.as_deref(), Some("65f1"));
        assert_eq!(both.extra.get("_id"), Some(&json!("65f1")));

        let numeric: Admin = serde_json::from_value(json!({ "id": 7, "role": "admin" }))?;
        assert_eq!(numeric.key(), Some("7"));

        let mut merged = both.clone();
        let Value::Object(patch) = json!({ "_id": "65f1", "id": "65f1", "name": "Jess" }) else {
            unreachable!()
        };
        merged.merge(patch)?;
        assert_eq!(merged.key(), Some("65f1"));
        assert_eq!(merged.name.as_deref(), Some("Jess"));
        Ok(())
    }

    #[test]
    fn merge_overlays_known_and_unknown_fields() -> serde_json::Result<()> {
        let mut admin: Admin = serde_json::from_value(json!({
            "id": "1",
            "name": "Old Name",
            "role": "admin",
            "requirePasswordChange": true,
            "avatar": "a.png",
        }))?;

        let patch = json!({ "name": "New Name", "requirePasswordChange": false, "phone": "555" });
        let Value::Object(patch) = patch else {
            unreachable!()
        };
        admin.merge(patch)?;

        assert_eq!(admin.name.as_deref(), Some("New Name"));
        assert!(!admin.require_password_change);
        assert_eq!(admin.role.as_deref(), Some("admin"));
        assert_eq!(admin.extra.get("avatar"), Some(&json!("a.png")));
        assert_eq!(admin.extra.get("phone"), Some(&json!("555")));
        Ok(())
    }
}
