// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;

/// Durable storage key holding the admin bearer token.
pub(crate) const STORAGE_KEY: &str = "whitebarn_admin_token";

#[derive(Deserialize)]
struct Claims {
    exp: Option<f64>,
}

/// Checks that `token` looks like a usable JWT: three non-empty segments, a
/// JSON claims payload, and an expiry (if any) later than `now_ms`.
///
/// The signature is not checked; the server does that on verification.
pub(crate) fn is_well_formed(token: &str, now_ms: i64) -> bool {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return false;
    };
    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return false;
    }

    let Ok(raw) = base64::decode_config(payload, base64::URL_SAFE_NO_PAD) else {
        return false;
    };
    match serde_json::from_slice::<Claims>(&raw) {
        // LINT: JWT expiry is in whole seconds; sub-millisecond precision is
        // irrelevant here.
        #[allow(clippy::cast_precision_loss)]
        Ok(Claims { exp: Some(exp) }) => exp * 1000.0 > now_ms as f64,
        Ok(Claims { exp: None }) => true,
        Err(_) => false,
    }
}
