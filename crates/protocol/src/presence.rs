//! Presence-Protokoll
//!
//! Nachrichten des Presence-Gateways:
//! - Ausgehend: `voice_state_update` – der lokale Client kuendigt Join/Leave an
//! - Eingehend: `voice_state` – vollstaendiger Teilnehmer-Snapshot pro Kanal
//!
//! ## Design
//! - JSON-Serialisierung via serde (Presence ist nicht zeitkritisch)
//! - Tagged Enum fuer typsichere Nachrichtentypen
//! - Snapshots ersetzen den gespeicherten Zustand komplett (full-replace)

use serde::{Deserialize, Serialize};
use stimmraum_core::types::{ChannelId, UserId};

// ---------------------------------------------------------------------------
// Aktionen
// ---------------------------------------------------------------------------

/// Aktion einer Voice-State-Ankuendigung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceAktion {
    Join,
    Leave,
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

/// Ausgehende Ankuendigung: lokaler Client betritt oder verlaesst einen Kanal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStateUpdate {
    /// Betroffener Kanal
    pub channel_id: ChannelId,
    /// Join oder Leave
    pub action: PresenceAktion,
}

/// Eingehender Snapshot: wer ist aktuell in einem Kanal
///
/// Ersetzt den gespeicherten Zustand fuer diesen Kanal vollstaendig.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStateSnapshot {
    /// Betroffener Kanal
    pub channel_id: ChannelId,
    /// Alle Teilnehmer laut Server (kann veraltete Eintraege enthalten)
    pub participants: Vec<UserId>,
}

/// Alle Nachrichten auf dem Presence-Kanal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenceNachricht {
    VoiceStateUpdate(VoiceStateUpdate),
    VoiceState(VoiceStateSnapshot),
}

impl PresenceNachricht {
    /// Serialisiert die Nachricht als JSON-String
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parst eine Nachricht aus einem JSON-String
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_roundtrip() {
        let msg = PresenceNachricht::VoiceStateUpdate(VoiceStateUpdate {
            channel_id: ChannelId::new(),
            action: PresenceAktion::Join,
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"voice_state_update\""));
        assert!(json.contains("\"join\""));
        let zurueck = PresenceNachricht::from_json(&json).unwrap();
        assert!(matches!(zurueck, PresenceNachricht::VoiceStateUpdate(_)));
    }

    #[test]
    fn snapshot_enthaelt_teilnehmer() {
        let teilnehmer = vec![UserId::new(), UserId::new()];
        let msg = PresenceNachricht::VoiceState(VoiceStateSnapshot {
            channel_id: ChannelId::new(),
            participants: teilnehmer.clone(),
        });
        let json = msg.to_json().unwrap();
        let zurueck = PresenceNachricht::from_json(&json).unwrap();
        match zurueck {
            PresenceNachricht::VoiceState(snap) => {
                assert_eq!(snap.participants, teilnehmer);
            }
            other => panic!("Erwartet VoiceState, erhalten: {:?}", other),
        }
    }

    #[test]
    fn leave_aktion_wire_name() {
        let json = serde_json::to_string(&PresenceAktion::Leave).unwrap();
        assert_eq!(json, "\"leave\"");
    }
}
