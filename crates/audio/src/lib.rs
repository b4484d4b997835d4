//! stimmraum-audio – Audio-Graph der Voice-Session-Engine
//!
//! Baut pro abonniertem Remote-Audio-Track eine Filterkette in fester
//! Reihenfolge: Quelle -> Hochpass -> Tiefpass -> [De-Esser] -> [Kompressor]
//! -> Analyse-Tap -> Gain -> Senke. Lokales Capture nutzt stattdessen
//! Geraete-Constraints (Sache des Transports).
//!
//! Ausserdem:
//! - `AudioSettings` mit deklarativer Klassifikation welche Aenderung
//!   sofort greift, ein Capture-Republish braucht oder ein Feature anbindet
//! - `MikrofonGate` – Zustandsmaschine des lokalen Noise Gates

pub mod dsp;
pub mod noise_gate;
pub mod pipeline;
pub mod settings;

pub use dsp::AudioProcessor;
pub use noise_gate::{GateAktion, MikrofonGate};
pub use pipeline::{TrackPipeline, VerarbeitungsKontext, ABTASTRATE};
pub use settings::{
    AnwendungsArt, AudioSettings, SettingsSchluessel, SuppressorModell,
};
