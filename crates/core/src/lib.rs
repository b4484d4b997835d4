//! stimmraum-core – Gemeinsame Typen fuer die Voice-Session-Engine
//!
//! Enthaelt die Newtype-IDs (User, Kanal, Track) und den zentralen
//! Fehler-Enum. Alle anderen Crates bauen hierauf auf.

pub mod error;
pub mod types;

pub use error::{EngineFehler, Result};
pub use types::{ChannelId, TrackId, UserId};
