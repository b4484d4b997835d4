//! stimmraum-protocol – Presence-Gateway Nachrichtentypen
//!
//! Definiert die Nachrichten die ueber den bidirektionalen Presence-Kanal
//! laufen: ausgehende Join/Leave-Ankuendigungen und eingehende
//! Voice-State-Snapshots (full-replace, kein inkrementeller Patch).

pub mod presence;

pub use presence::{PresenceAktion, PresenceNachricht, VoiceStateSnapshot, VoiceStateUpdate};
