//! Collaborator-Schnittstellen
//!
//! Externe Dienste auf die die Engine angewiesen ist, aber die nicht
//! Teil von ihr sind: Token-Dienst, Kanal-Register, Keybind-Store und
//! Presence-Gateway. Alle als Traits, damit Tests sie mocken koennen.

use async_trait::async_trait;

use stimmraum_core::types::ChannelId;
use stimmraum_protocol::presence::PresenceNachricht;

/// Kurzlebiges Zugangs-Token fuer den Transport
#[derive(Debug, Clone)]
pub struct VoiceToken {
    pub credential: String,
    pub transport_url: String,
}

/// Holt Zugangs-Tokens vom Backend
///
/// Fehler werden als Verbindungsfehler nach oben gereicht und nicht
/// automatisch wiederholt.
#[async_trait]
pub trait TokenDienst: Send + Sync {
    async fn voice_token_anfordern(&self, kanal: ChannelId) -> anyhow::Result<VoiceToken>;
}

/// Kanal-Metadaten-Store
///
/// Wird beim Join gelesen; Aenderungen zur Laufzeit meldet der
/// Aufrufer ueber `SessionManager::kanal_bitrate_geaendert`.
#[async_trait]
pub trait KanalRegister: Send + Sync {
    /// Per-Kanal-Bitrate-Override in bps, `None` = Standard
    async fn bitrate_override(&self, kanal: ChannelId) -> Option<u32>;
}

/// Read-only-Sicht auf die Tastenbelegung
///
/// Einmalig beim Join konsultiert: existiert ein Push-to-Talk-Bind,
/// startet die Session stummgeschaltet.
pub trait KeybindStore: Send + Sync {
    fn hat_push_to_talk(&self) -> bool;
}

/// Ausgehende Seite des Presence-Kanals
///
/// Die eingehende Seite (Snapshots) fuettert der Aufrufer ueber
/// `SessionManager::presence_nachricht`.
#[async_trait]
pub trait PresenceGateway: Send + Sync {
    async fn senden(&self, nachricht: PresenceNachricht) -> anyhow::Result<()>;
}
