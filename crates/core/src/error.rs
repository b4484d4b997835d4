//! Fehlertypen fuer die Voice-Session-Engine
//!
//! Zentraler Fehler-Enum der alle Fehlerzustaende der Engine abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Stimmraum
pub type Result<T> = std::result::Result<T, EngineFehler>;

/// Alle moeglichen Fehler der Voice-Session-Engine
#[derive(Debug, Error)]
pub enum EngineFehler {
    // --- Verbindungsaufbau ---
    #[error("Voice-Token konnte nicht geholt werden: {0}")]
    Anmeldedaten(String),

    #[error("Transport-Verbindung fehlgeschlagen: {0}")]
    TransportVerbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    // --- Medien ---
    #[error("Capture-Fehler: {0}")]
    Capture(String),

    #[error("Prozessor konnte nicht angebunden werden: {0}")]
    ProzessorAnbindung(String),

    // --- Zustand ---
    #[error("Keine aktive Voice-Session")]
    KeineSession,

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl EngineFehler {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler den Verbindungsaufbau betrifft
    ///
    /// Beide Faelle werden dem Benutzer als ein einziger
    /// "Verbindung fehlgeschlagen"-Zustand angezeigt.
    pub fn ist_verbindungsfehler(&self) -> bool {
        matches!(self, Self::Anmeldedaten(_) | Self::TransportVerbindung(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = EngineFehler::Anmeldedaten("HTTP 503".into());
        assert_eq!(
            e.to_string(),
            "Voice-Token konnte nicht geholt werden: HTTP 503"
        );
    }

    #[test]
    fn verbindungsfehler_erkennung() {
        assert!(EngineFehler::Anmeldedaten("x".into()).ist_verbindungsfehler());
        assert!(EngineFehler::TransportVerbindung("x".into()).ist_verbindungsfehler());
        assert!(!EngineFehler::Capture("x".into()).ist_verbindungsfehler());
        assert!(!EngineFehler::KeineSession.ist_verbindungsfehler());
    }
}
