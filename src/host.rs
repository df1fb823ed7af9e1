//! Signals from tools to the host UI
//!
//! Tools never render anything themselves. They emit a signal and the host
//! decides how to show it. Delivery is fire-and-forget.

use crate::directory::Doctor;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Pre-fill record for the host's booking form
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingPrefill {
    pub name: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub age: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub reason: Option<String>,
}

/// Models write ages as `34` as often as `"34"`
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostSignal {
    /// Display directory results
    ShowSpecialists {
        specialty: Option<String>,
        doctors: Vec<Doctor>,
    },
    /// Open the booking form pre-filled
    OpenBookingForm { prefill: BookingPrefill },
    /// Surface emergency escalation
    SurfaceEmergency,
}

/// Broadcast channel for host signals
#[derive(Clone)]
pub struct HostSignals {
    tx: broadcast::Sender<HostSignal>,
}

impl HostSignals {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn emit(&self, signal: HostSignal) {
        if self.tx.send(signal).is_err() {
            tracing::debug!("Host signal dropped, no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostSignal> {
        self.tx.subscribe()
    }
}

impl Default for HostSignals {
    fn default() -> Self {
        Self::new(32)
    }
}
