//! HTTP client for the backend slot store.
//!
//! The backend is a consumed collaborator: `GET /api/slots` lists
//! `{id, code, is_occupied}` entries and `PUT /api/slots/{id}` updates one.
//! A `PUT` is only issued when the backend-reported value differs from the
//! newly computed one, keeping write volume minimal.

use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::error::LotError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One slot row as the backend reports it.
#[derive(Clone, Debug, Deserialize)]
pub struct BackendSlot {
    pub id: i64,
    pub code: String,
    pub is_occupied: bool,
}

#[derive(Debug, Deserialize)]
struct SlotsEnvelope {
    #[serde(default)]
    data: Vec<BackendSlot>,
}

#[derive(Debug, Serialize)]
struct SlotUpdate {
    is_occupied: bool,
}

pub struct BackendClient {
    base_url: String,
    agent: ureq::Agent,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self { base_url, agent }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fetch_slots(&self) -> Result<Vec<BackendSlot>, LotError> {
        let url = format!("{}/api/slots", self.base_url);
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|err| LotError::BackendUnreachable(format!("GET {}: {}", url, err)))?;
        let envelope: SlotsEnvelope = response.into_json().map_err(|err| {
            LotError::BackendUnreachable(format!("parse slots response: {}", err))
        })?;
        Ok(envelope.data)
    }

    pub fn update_slot(&self, id: i64, is_occupied: bool) -> Result<(), LotError> {
        let url = format!("{}/api/slots/{}", self.base_url, id);
        self.agent
            .put(&url)
            .send_json(SlotUpdate { is_occupied })
            .map_err(|err| LotError::BackendUnreachable(format!("PUT {}: {}", url, err)))?;
        Ok(())
    }

    /// Push a reconciliation diff to the backend.
    ///
    /// Slots unknown to the backend are skipped; slots whose backend value
    /// already matches are not written. A failing slot never blocks the
    /// remaining writes; failures come back per region for the caller to
    /// report.
    pub fn push_changes(&self, changed: &[(String, bool)]) -> Vec<(String, anyhow::Error)> {
        let slots = match self.fetch_slots() {
            Ok(slots) => slots,
            Err(err) => {
                let message = err.to_string();
                return changed
                    .iter()
                    .map(|(code, _)| (code.clone(), anyhow!("{}", message)))
                    .collect();
            }
        };

        let mut failures = Vec::new();
        for (code, value) in changed {
            let Some(slot) = slots.iter().find(|slot| &slot.code == code) else {
                log::debug!("slot {} not present in backend; skipping", code);
                continue;
            };
            if slot.is_occupied == *value {
                continue;
            }
            match self.update_slot(slot.id, *value) {
                Ok(()) => log::info!(
                    "updated {}: {}",
                    code,
                    if *value { "occupied" } else { "available" }
                ),
                Err(err) => failures.push((code.clone(), err.into())),
            }
        }
        failures
    }
}
