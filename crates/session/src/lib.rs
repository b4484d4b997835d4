//! stimmraum-session – Session-Engine der Voice-Anwendung
//!
//! Der `SessionManager` ist die Wurzel: er besitzt die eine
//! Voice-Session, spricht mit dem Transport (Blackbox hinter
//! `VoiceTransport`), baut pro Remote-Audio-Track eine Pipeline aus
//! `stimmraum-audio` auf und betreibt Noise-Gate- und Bitrate-Schleife.
//! Screen-Share-Buchfuehrung und Presence-Occupancy laufen daneben.

pub mod bitrate;
pub mod collaborators;
pub mod events;
pub mod manager;
pub mod occupancy;
pub mod screenshare;
pub mod session;
pub mod transport;

pub use bitrate::{AdaptiveBitrateRegler, BITRATE_MINIMUM};
pub use collaborators::{KanalRegister, KeybindStore, PresenceGateway, TokenDienst, VoiceToken};
pub use events::{EventBus, SessionEreignis};
pub use manager::{SessionManager, TeilnehmerZustand, STANDARD_BITRATE};
pub use occupancy::OccupancyAggregator;
pub use screenshare::{ScreenShareInfo, ScreenShareKoordinator, ShareDiff};
pub use session::{SessionPhase, VoiceSession};
pub use transport::{
    CaptureConstraints, TeilnehmerInfo, TrackKind, TransportEreignis, TransportFehler,
    VideoQuelle, VoiceTransport,
};
