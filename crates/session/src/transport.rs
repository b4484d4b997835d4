//! Transport-Abstraktion
//!
//! Der eigentliche WebRTC/SFU-Client ist eine externe Bibliothek. Die
//! Engine behandelt ihn als Blackbox hinter diesem Trait: Verbindung
//! auf/ab, Mikrofon- und Screen-Share-Publikation mit Constraints,
//! Encoder-Bitrate, Pegel- und Verluststatistik sowie ein
//! Ereignis-Strom (Track- und Teilnehmer-Lebenszyklus).

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use stimmraum_audio::settings::{AudioSettings, SuppressorModell};
use stimmraum_core::types::{TrackId, UserId};

/// Fehler an der Transport-Grenze
#[derive(Debug, Error)]
pub enum TransportFehler {
    /// Benutzer hat eine Berechtigungsabfrage abgelehnt
    #[error("Zugriff verweigert: {0}")]
    ZugriffVerweigert(String),

    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Capture fehlgeschlagen: {0}")]
    Capture(String),

    #[error("Prozessor-Anbindung fehlgeschlagen: {0}")]
    ProzessorAnbindung(String),

    #[error("Transport-Fehler: {0}")]
    Sonstig(String),
}

/// Capture-Constraints fuer die Mikrofon-Publikation
///
/// Aenderungen an diesen Feldern erfordern ein Republish des Mikrofons
/// (kurzer Mute-Blip), sie koennen nicht live umgeschaltet werden.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureConstraints {
    pub echo_unterdrueckung: bool,
    pub rausch_unterdrueckung: bool,
    pub auto_gain: bool,
    /// Discontinuous Transmission: Stille wird nicht gesendet
    pub dtx: bool,
    pub gain: f32,
}

impl From<&AudioSettings> for CaptureConstraints {
    fn from(settings: &AudioSettings) -> Self {
        Self {
            echo_unterdrueckung: settings.echo_unterdrueckung,
            rausch_unterdrueckung: settings.rausch_unterdrueckung,
            auto_gain: settings.auto_gain,
            dtx: settings.dtx,
            gain: settings.mikrofon_gain,
        }
    }
}

/// Art eines publizierten Tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Live-Sicht des Transports auf einen Remote-Teilnehmer
#[derive(Debug, Clone)]
pub struct TeilnehmerInfo {
    pub user_id: UserId,
    pub anzeige_name: String,
    /// Publiziert der Teilnehmer gerade keinen Audio-Track?
    pub stumm: bool,
    pub spricht: bool,
}

/// Eine aktuell publizierte Video-Quelle (lokal oder remote)
#[derive(Debug, Clone)]
pub struct VideoQuelle {
    pub user_id: UserId,
    pub anzeige_name: String,
    pub track_id: TrackId,
}

/// Ereignisse die der Transport asynchron liefert
#[derive(Debug, Clone)]
pub enum TransportEreignis {
    TrackSubscribed {
        track_id: TrackId,
        user_id: UserId,
        kind: TrackKind,
    },
    TrackUnsubscribed {
        track_id: TrackId,
        kind: TrackKind,
    },
    ParticipantConnected {
        user_id: UserId,
    },
    ParticipantDisconnected {
        user_id: UserId,
    },
    ActiveSpeakersChanged {
        sprecher: Vec<UserId>,
    },
    /// Transport-seitige Trennung (Netzverlust, Kick, Server-Close)
    Disconnected {
        grund: String,
    },
}

/// Blackbox-Schnittstelle zum SFU-Client
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Oeffnet die Verbindung mit Token-Credential
    async fn connect(&self, url: &str, credential: &str) -> Result<(), TransportFehler>;

    /// Trennt die Verbindung (idempotent)
    async fn disconnect(&self);

    /// Aktiviert/deaktiviert die lokale Mikrofon-Publikation
    async fn set_mic_enabled(
        &self,
        enabled: bool,
        constraints: &CaptureConstraints,
    ) -> Result<(), TransportFehler>;

    /// Startet/stoppt lokales Screen-Capture samt Publikation
    async fn set_screenshare_enabled(&self, enabled: bool) -> Result<(), TransportFehler>;

    /// Setzt die Encoder-Bitrate des Audio-Senders (ohne Renegotiation)
    async fn set_audio_bitrate(&self, bitrate: u32) -> Result<(), TransportFehler>;

    /// Bindet das externe Rauschunterdrueckungs-Modell an bzw. loest es
    async fn attach_suppressor(
        &self,
        modell: SuppressorModell,
        staerke: u8,
    ) -> Result<(), TransportFehler>;

    /// Zuletzt gemeldeter Paketverlust in Prozent
    fn paketverlust_prozent(&self) -> f32;

    /// RMS-Pegel des lokalen Mikrofons (fuer das Noise Gate)
    fn lokaler_pegel(&self) -> f32;

    /// Aktuelle Remote-Teilnehmerliste
    fn teilnehmer(&self) -> Vec<TeilnehmerInfo>;

    /// Aktuell publizierte Video-Quellen (lokal und remote)
    fn video_quellen(&self) -> Vec<VideoQuelle>;

    /// Abonniert den Ereignis-Strom des Transports
    fn ereignisse(&self) -> broadcast::Receiver<TransportEreignis>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraints_aus_settings() {
        let settings = AudioSettings {
            dtx: true,
            auto_gain: false,
            mikrofon_gain: 1.5,
            ..AudioSettings::default()
        };
        let c = CaptureConstraints::from(&settings);
        assert!(c.dtx);
        assert!(!c.auto_gain);
        assert!((c.gain - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn transportfehler_anzeige() {
        let e = TransportFehler::ZugriffVerweigert("getUserMedia abgelehnt".into());
        assert!(e.to_string().contains("Zugriff verweigert"));
    }
}
