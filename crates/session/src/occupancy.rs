//! Occupancy-Aggregator
//!
//! Fuehrt pro Kanal die Teilnehmerliste aus den Presence-Snapshots des
//! Gateways – unabhaengig davon ob der lokale Benutzer selbst verbunden
//! ist. Snapshots ersetzen den gespeicherten Zustand vollstaendig.
//!
//! Geister-Filter: meldet der Server den lokalen Benutzer in einem
//! Kanal mit dem er gar nicht verbunden ist (veralteter Serverzustand),
//! wird die eigene ID vor dem Speichern entfernt. Im tatsaechlich
//! verbundenen Kanal bleibt sie erhalten.

use dashmap::DashMap;

use stimmraum_core::types::{ChannelId, UserId};
use stimmraum_protocol::presence::VoiceStateSnapshot;

/// Presence-Sicht: wer ist in welchem Kanal
pub struct OccupancyAggregator {
    lokale_id: UserId,
    belegung: DashMap<ChannelId, Vec<UserId>>,
}

impl OccupancyAggregator {
    pub fn new(lokale_id: UserId) -> Self {
        Self {
            lokale_id,
            belegung: DashMap::new(),
        }
    }

    /// Wendet einen Snapshot an (full-replace)
    ///
    /// `verbundener_kanal` ist der Kanal mit dem der lokale Benutzer
    /// gerade verbunden ist, falls ueberhaupt.
    pub fn snapshot_anwenden(
        &self,
        snapshot: VoiceStateSnapshot,
        verbundener_kanal: Option<ChannelId>,
    ) {
        let mut teilnehmer = snapshot.participants;
        if verbundener_kanal != Some(snapshot.channel_id) {
            teilnehmer.retain(|id| *id != self.lokale_id);
        }
        self.belegung.insert(snapshot.channel_id, teilnehmer);
    }

    /// Entfernt nur die lokale ID aus einem Kanal
    ///
    /// Wird beim Leave aufgerufen, damit die Anzeige nicht auf das
    /// Presence-Echo des Servers warten muss. Andere Kanaele bleiben
    /// unberuehrt.
    pub fn lokal_entfernen(&self, kanal: ChannelId) {
        if let Some(mut eintrag) = self.belegung.get_mut(&kanal) {
            eintrag.retain(|id| *id != self.lokale_id);
        }
    }

    /// Aktuelle Teilnehmerliste eines Kanals
    pub fn teilnehmer(&self, kanal: ChannelId) -> Vec<UserId> {
        self.belegung
            .get(&kanal)
            .map(|eintrag| eintrag.value().clone())
            .unwrap_or_default()
    }
}
