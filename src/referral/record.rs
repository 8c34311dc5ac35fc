// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Utm {
    #[serde(default)]
    pub(crate) source: Option<String>,
    #[serde(default)]
    pub(crate) medium: Option<String>,
    #[serde(default)]
    pub(crate) campaign: Option<String>,
    #[serde(default)]
    pub(crate) content: Option<String>,
    #[serde(default)]
    pub(crate) term: Option<String>,
}

/// A captured partner referral. The session copy never carries
/// `expires_at`; the durable copy always does.
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Referral {
    pub(crate) ref_code: String,
    #[serde(default)]
    pub(crate) utm: Utm,
    pub(crate) timestamp: i64,
    #[serde(default)]
    pub(crate) page: String,
    pub(crate) partner_name: Option<String>,
    pub(crate) partner_type: Option<String>,
    pub(crate) expires_at: Option<i64>,
}

impl Referral {
    pub(crate) fn with_expiry(&self, expires_at: i64) -> Self {
        Self {
            expires_at: Some(expires_at),
            ..self.clone()
        }
    }

    pub(crate) fn without_expiry(self) -> Self {
        Self {
            expires_at: None,
            ..self
        }
    }

    /// Whether the record may still be used at `now_ms`. Records without an
    /// expiry never qualify.
    pub(crate) fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at.map_or(false, |expires_at| now_ms < expires_at)
    }
}

/// Attribution fields attached to contact-form submissions. With a referral
/// present `refSource` is always written, as `null` when the partner type is
/// unknown.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FormData {
    pub(crate) ref_code: Option<String>,
    pub(crate) ref_source: Option<Option<String>>,
    pub(crate) utm_source: Option<String>,
    pub(crate) utm_medium: Option<String>,
    pub(crate) utm_campaign: Option<String>,
    pub(crate) utm_content: Option<String>,
    pub(crate) utm_term: Option<String>,
}

impl From<&Referral> for FormData {
    fn from(value: &Referral) -> Self {
        Self {
            ref_code: Some(value.ref_code.clone()),
            ref_source: Some(value.partner_type.clone()),
            utm_source: value.utm.source.clone(),
            utm_medium: value.utm.medium.clone(),
            utm_campaign: value.utm.campaign.clone(),
            utm_content: value.utm.content.clone(),
            utm_term: value.utm.term.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct PartnerInfo {
    pub(crate) code: String,
    pub(crate) name: Option<String>,
    #[serde(rename = "type")]
    pub(crate) type_: Option<String>,
}

impl From<&Referral> for PartnerInfo {
    fn from(value: &Referral) -> Self {
        Self {
            code: value.ref_code.clone(),
            name: value.partner_name.clone(),
            type_: value.partner_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_test::{assert_ser_tokens, Token};

    use super::*;

    fn referral() -> Referral {
        Referral {
            ref_code: "PARTNER1".to_owned(),
            utm: Utm {
                source: Some("instagram".to_owned()),
                ..Utm::default()
            },
            timestamp: 1_000,
            page: "/".to_owned(),
            partner_name: None,
            partner_type: None,
            expires_at: None,
        }
    }

    #[test]
    fn session_copy_omits_absent_enrichment_and_expiry() {
        assert_ser_tokens(
            &referral(),
            &[
                Token::Struct {
                    name: "Referral",
                    len: 4,
                },
                Token::Str("refCode"),
                Token::Str("PARTNER1"),
                Token::Str("utm"),
                Token::Struct {
                    name: "Utm",
                    len: 5,
                },
                Token::Str("source"),
                Token::Some,
                Token::Str("instagram"),
                Token::Str("medium"),
                Token::None,
                Token::Str("campaign"),
                Token::None,
                Token::Str("content"),
                Token::None,
                Token::Str("term"),
                Token::None,
                Token::StructEnd,
                Token::Str("timestamp"),
                Token::I64(1_000),
                Token::Str("page"),
                Token::Str("/"),
                Token::StructEnd,
            ],
        );
    }

    #[test]
    fn durable_copy_reads_back_with_expiry() -> serde_json::Result<()> {
        let durable = referral().with_expiry(5_000);
        let raw = serde_json::to_string(&durable)?;
        assert!(raw.contains("\"expiresAt\":5000"));

        let parsed: Referral = serde_json::from_str(&raw)?;
        assert!(parsed.is_live(4_999));
        assert!(!parsed.is_live(5_000));
        assert!(!parsed.without_expiry().is_live(0));
        Ok(())
    }

    #[test]
    fn empty_form_data_serializes_to_an_empty_object() {
        assert_ser_tokens(
            &FormData::default(),
            &[
                Token::Struct {
                    name: "FormData",
                    len: 0,
                },
                Token::StructEnd,
            ],
        );
    }

    #[test]
    fn form_data_uses_partner_type_as_source() {
        let mut referral = referral();
        referral.partner_type = Some("florist".to_owned());
        let form = FormData::from(&referral);
        assert_eq!(form.ref_code.as_deref(), Some("PARTNER1"));
        assert_eq!(form.ref_source, Some(Some("florist".to_owned())));
        assert_eq!(form.utm_source.as_deref(), Some("instagram"));
        assert!(form.utm_term.is_none());
    }

    #[test]
    fn unknown_partner_type_is_written_as_null() -> serde_json::Result<()> {
        let form = serde_json::to_value(FormData::from(&referral()))?;
        assert_eq!(
            form,
            serde_json::json!({
                "refCode": "PARTNER1",
                "refSource": null,
                "utmSource": "instagram",
            })
        );
        Ok(())
    }
}
