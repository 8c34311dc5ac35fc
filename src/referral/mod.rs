// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Partner referral attribution: captures `ref` and UTM parameters from a
//! landing URL, keeps them for the session and for 90 days beyond it, and
//! reports visits, conversions and leads to the analytics sink.

mod record;

use std::sync::Arc;

use futures_util::lock::Mutex;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use url::Url;

use crate::{
    analytics::{self, Event, Sink},
    api::{self, Executor as _},
    clock::{Clock, MILLIS_PER_DAY},
    error::{Error, Result},
    storage::{self, Scope, Storage},
    transport::Transport,
};

pub(crate) use record::{FormData, PartnerInfo, Referral, Utm};

pub(crate) const STORAGE_KEY: &str = "whitebarn_referral";
pub(crate) const VISIT_MARKER_PREFIX: &str = "partner_visit_";
const VISIT_MARKER_VALUE: &str = "tracked";
pub(crate) const EXPIRY_DAYS: i64 = 90;

const DEFAULT_PARTNER_TYPE: &str = "unknown";
const DEFAULT_UTM_SOURCE: &str = "direct";
const DEFAULT_UTM_MEDIUM: &str = "referral";
const DEFAULT_LEAD_EVENT_TYPE: &str = "general_inquiry";
const FOOTER_FORM: &str = "footer";
const CONTACT_PAGE_FORM: &str = "contact_page";
pub(crate) const CONTACT_FORM_CONVERSION: &str = "contact_form_submit";

fn visit_marker(code: &str) -> String {
    format!("{VISIT_MARKER_PREFIX}{code}")
}

/// The first non-empty value of query parameter `name`.
fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

pub(crate) struct Tracker {
    storage: Arc<Mutex<Box<dyn Storage>>>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn Sink>,
    clock: Arc<dyn Clock>,
    current: Option<Referral>,
}

impl Tracker {
    pub(crate) fn new(
        storage: Arc<Mutex<Box<dyn Storage>>>,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn Sink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            transport,
            sink,
            clock,
            current: None,
        }
    }

    /// Captures the referral carried by a landing URL, or adopts a previously
    /// stored one when the URL has none.
    pub(crate) async fn capture_from_url(&mut self, url: &Url) -> Result<Option<Referral>> {
        let Some(code) = query_param(url, "ref").map(|code| code.to_uppercase()) else {
            return self.load_persisted().await;
        };

        if let Some(existing) = self.session_copy().await? {
            if existing.ref_code == code {
                debug!("Referral {} already captured for this session", code);
                self.current = Some(existing.clone());
                return Ok(Some(existing));
            }
        }

        let now = self.clock.now_ms();
        let mut referral = Referral {
            ref_code: code,
            utm: Utm {
                source: query_param(url, "utm_source"),
                medium: query_param(url, "utm_medium"),
                campaign: query_param(url, "utm_campaign"),
                content: query_param(url, "utm_content"),
                term: query_param(url, "utm_term"),
            },
            timestamp: now,
            page: url.path().to_owned(),
            partner_name: None,
            partner_type: None,
            expires_at: None,
        };

        let lookup = api::PartnerLookup {
            code: referral.ref_code.clone(),
        };
        match lookup.execute(&*self.transport).await {
            Ok(resp) => {
                let partner = resp.into_partner();
                referral.partner_name = partner.name;
                referral.partner_type = partner.type_;
            }
            Err(e) => warn!("Could not verify partner {}: {}", referral.ref_code, e),
        }

        let marker = visit_marker(&referral.ref_code);
        let first_visit = {
            let mut storage = self.storage.lock().await;
            storage::set_json(&mut *storage, Scope::Session, STORAGE_KEY, &referral).await?;
            let durable = referral.with_expiry(now + EXPIRY_DAYS * MILLIS_PER_DAY);
            storage::set_json(&mut *storage, Scope::Durable, STORAGE_KEY, &durable).await?;

            let first_visit = storage.get(Scope::Session, &marker).await?.is_none();
            if first_visit {
                storage
                    .set(Scope::Session, &marker, VISIT_MARKER_VALUE)
                    .await?;
            }
            first_visit
        };

        if first_visit {
            self.sink.track(
                &Self::attribution(analytics::PARTNER_VISIT, &referral)
                    .with("page_location", url.as_str()),
            );
            info!("Partner visit tracked: {}", referral.ref_code);
        }

        self.current = Some(referral.clone());
        Ok(Some(referral))
    }

    /// Reads the stored referral, preferring the session copy and falling back
    /// to an unexpired durable copy, which is then copied into the session.
    pub(crate) async fn load_persisted(&mut self) -> Result<Option<Referral>> {
        if let Some(referral) = self.session_copy().await? {
            self.current = Some(referral.clone());
            return Ok(Some(referral));
        }

        let mut storage = self.storage.lock().await;
        let Some(durable) = Self::read(&mut **storage, Scope::Durable).await? else {
            return Ok(None);
        };

        if !durable.is_live(self.clock.now_ms()) {
            debug!("Stored referral {} has expired", durable.ref_code);
            storage.remove(Scope::Durable, STORAGE_KEY).await?;
            return Ok(None);
        }

        let referral = durable.without_expiry();
        storage::set_json(&mut *storage, Scope::Session, STORAGE_KEY, &referral).await?;
        self.current = Some(referral.clone());
        Ok(Some(referral))
    }

    pub(crate) fn form_data(&self) -> FormData {
        self.current.as_ref().map(FormData::from).unwrap_or_default()
    }

    /// Reports a conversion attributed to the active referral. `extra` is
    /// merged last and overrides the standard parameters.
    pub(crate) async fn track_conversion(
        &mut self,
        event_type: &str,
        extra: Map<String, Value>,
    ) -> Result<bool> {
        let Some(referral) = self.active().await? else {
            return Ok(false);
        };

        self.sink.track(
            &Self::attribution(analytics::PARTNER_CONVERSION, &referral)
                .with("conversion_type", event_type)
                .with("value", 1)
                .merge(extra),
        );
        info!("Referral conversion tracked: {} {}", event_type, referral.ref_code);
        Ok(true)
    }

    /// Forgets the referral everywhere, including the per-partner visit
    /// markers.
    pub(crate) async fn clear(&mut self) -> Result<()> {
        let mut storage = self.storage.lock().await;
        storage.remove(Scope::Session, STORAGE_KEY).await?;
        storage.remove(Scope::Durable, STORAGE_KEY).await?;
        for key in storage.keys(Scope::Session).await? {
            if key.starts_with(VISIT_MARKER_PREFIX) {
                storage.remove(Scope::Session, &key).await?;
            }
        }
        self.current = None;
        Ok(())
    }

    pub(crate) async fn has_active_referral(&mut self) -> Result<bool> {
        Ok(self.active().await?.is_some())
    }

    pub(crate) async fn referral_code(&mut self) -> Result<Option<String>> {
        Ok(self.active().await?.map(|referral| referral.ref_code))
    }

    pub(crate) async fn partner_info(&mut self) -> Result<Option<PartnerInfo>> {
        Ok(self.active().await?.as_ref().map(PartnerInfo::from))
    }

    /// Reports a contact-form lead, carrying the referral form data, and
    /// credits the active referral with a conversion.
    pub(crate) async fn lead_submit(
        &mut self,
        form_source: &str,
        event_type: Option<&str>,
    ) -> Result<()> {
        let event_type = event_type.unwrap_or(DEFAULT_LEAD_EVENT_TYPE);
        let active = self.active().await?.is_some();

        let form_type = if form_source == FOOTER_FORM {
            FOOTER_FORM
        } else {
            CONTACT_PAGE_FORM
        };

        let form_data = self.form_data();
        let ref_code = form_data.ref_code.clone();
        let partner_type = form_data.ref_source.clone().flatten();
        let form = match serde_json::to_value(form_data)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        self.sink.track(
            &Event::new(analytics::LEAD_SUBMIT)
                .with("event_category", "Lead Generation")
                .with("event_label", "Contact Form")
                .with("lead_source", form_source)
                .with("form_type", form_type)
                .with("event_type", event_type)
                .with("ref_code", ref_code)
                .with("partner_type", partner_type)
                .with("value", 1)
                .merge(form),
        );

        if active {
            let mut extra = Map::new();
            let _previous = extra.insert("event_type".to_owned(), event_type.into());
            let _previous = extra.insert("form_source".to_owned(), form_source.into());
            let _tracked = self
                .track_conversion(CONTACT_FORM_CONVERSION, extra)
                .await?;
        }
        Ok(())
    }

    pub(crate) fn page_view(&self, url: &Url) {
        self.sink.track(
            &Event::new(analytics::PAGE_VIEW)
                .with("page_location", url.as_str())
                .with("page_path", url.path()),
        );
    }

    async fn active(&mut self) -> Result<Option<Referral>> {
        match self.current {
            Some(ref referral) => Ok(Some(referral.clone())),
            None => self.load_persisted().await,
        }
    }

    async fn session_copy(&self) -> Result<Option<Referral>> {
        let mut storage = self.storage.lock().await;
        Self::read(&mut **storage, Scope::Session).await
    }

    /// Reads the record in `scope`. Undecodable records are discarded.
    async fn read(storage: &mut dyn Storage, scope: Scope) -> Result<Option<Referral>> {
        match storage::get_json::<Referral, _>(storage, scope, STORAGE_KEY).await {
            Err(Error::Json(e)) => {
                warn!("Discarding unreadable {} referral record: {}", scope, e);
                storage.remove(scope, STORAGE_KEY).await?;
                Ok(None)
            }
            result => result,
        }
    }

    /// The parameters shared by visit and conversion events.
    fn attribution(name: &str, referral: &Referral) -> Event {
        Event::new(name)
            .with("event_category", "Referral")
            .with("event_label", referral.ref_code.as_str())
            .with("ref_code", referral.ref_code.as_str())
            .with(
                "partner_type",
                referral
                    .partner_type
                    .as_deref()
                    .unwrap_or(DEFAULT_PARTNER_TYPE),
            )
            .with(
                "utm_source",
                referral.utm.source.as_deref().unwrap_or(DEFAULT_UTM_SOURCE),
            )
            .with(
                "utm_medium",
                referral.utm.medium.as_deref().unwrap_or(DEFAULT_UTM_MEDIUM),
            )
            .with(
                "utm_campaign",
                referral.utm.campaign.as_deref().unwrap_or_default(),
            )
    }
}
