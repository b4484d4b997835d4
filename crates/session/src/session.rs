//! Session-Zustand
//!
//! Es existiert hoechstens eine Voice-Session pro Client. Erzeugt und
//! zerstoert wird sie ausschliesslich vom `SessionManager`; die
//! Generation dient als Guard gegen verspaetete Callbacks nach einem
//! Teardown.

use stimmraum_core::types::ChannelId;

use crate::bitrate::AdaptiveBitrateRegler;

/// Verbindungsphase
///
/// Leerlauf -> Verbindet -> Verbunden -> Leerlauf (Leave oder
/// Transport-Trennung). Fehler beim Verbinden fuehren ebenfalls zurueck
/// nach Leerlauf, mit gesetztem Fehlerfeld im Manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Leerlauf,
    Verbindet,
    Verbunden,
}

/// Die eine aktive Voice-Session
pub struct VoiceSession {
    pub kanal: ChannelId,
    /// Generation zum Zeitpunkt des Joins; verspaetete Callbacks mit
    /// anderer Generation sind No-ops
    pub generation: u64,
    /// Benutzer-sichtbares Mute (das Gate aendert dieses Flag nie)
    pub stumm: bool,
    pub taub: bool,
    /// Lokales Screen-Share aktiv?
    pub teilt_bildschirm: bool,
    pub bitrate: AdaptiveBitrateRegler,
}

impl VoiceSession {
    pub fn new(kanal: ChannelId, generation: u64, stumm: bool, ziel_bitrate: u32) -> Self {
        Self {
            kanal,
            generation,
            stumm,
            taub: false,
            teilt_bildschirm: false,
            bitrate: AdaptiveBitrateRegler::new(ziel_bitrate),
        }
    }
}
