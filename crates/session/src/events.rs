//! Session-Ereignisse
//!
//! Fan-out der benutzer-sichtbaren Engine-Ereignisse ueber einen
//! broadcast-Kanal. Ohne Abonnenten verpuffen Ereignisse folgenlos.

use tokio::sync::broadcast;

use stimmraum_core::types::UserId;

use crate::session::SessionPhase;

/// Kapazitaet des Ereignis-Kanals
pub const EVENT_KANAL_GROESSE: usize = 256;

/// Benutzer-sichtbare Ereignisse der Session-Engine
#[derive(Debug, Clone)]
pub enum SessionEreignis {
    PhaseGeaendert(SessionPhase),
    VerbindungFehlgeschlagen { meldung: String },
    /// Teilnehmerliste hat sich geaendert; die abgeleitete Sicht ist
    /// ueber `SessionManager::teilnehmer_zustaende` abrufbar
    TeilnehmerGeaendert,
    SprecherGeaendert(Vec<UserId>),
    ShareGestartet { user_id: UserId, anzeige_name: String },
    ShareBeendet { user_id: UserId, anzeige_name: String },
    BitrateAngepasst(u32),
}

/// Broadcast-Bus fuer Session-Ereignisse
pub struct EventBus {
    sender: broadcast::Sender<SessionEreignis>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_KANAL_GROESSE);
        Self { sender }
    }

    /// Abonniert den Ereignis-Strom
    pub fn abonnieren(&self) -> broadcast::Receiver<SessionEreignis> {
        self.sender.subscribe()
    }

    /// Sendet ein Ereignis; ohne Abonnenten ist das ein No-op
    pub fn senden(&self, ereignis: SessionEreignis) {
        let _ = self.sender.send(ereignis);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ereignisse_erreichen_abonnenten() {
        let bus = EventBus::new();
        let mut rx = bus.abonnieren();
        bus.senden(SessionEreignis::PhaseGeaendert(SessionPhase::Verbunden));
        match rx.recv().await {
            Ok(SessionEreignis::PhaseGeaendert(SessionPhase::Verbunden)) => {}
            other => panic!("Unerwartet: {:?}", other),
        }
    }

    #[test]
    fn senden_ohne_abonnenten_ist_noop() {
        let bus = EventBus::new();
        bus.senden(SessionEreignis::BitrateAngepasst(48_000));
    }
}
