//! Audio-Einstellungen
//!
//! Flacher, unveraenderlicher Settings-Snapshot den der Audio-Graph
//! konsumiert. Persistenz ist Sache eines Collaborator-Stores; mutiert
//! wird nur ueber den einen Update-Einstiegspunkt im Session-Manager.
//!
//! ## Klassifikationstabelle
//! Statt einer langen Fallunterscheidung pro Feld gibt es eine
//! deklarative Zuordnung Schluessel -> Anwendungsart:
//! - `SofortLive`: greift sofort auf alle bestehenden Pipelines
//! - `CaptureNeustart`: erfordert Republish des Mikrofons mit neuen
//!   Constraints (kurzer hoerbarer Mute-Blip ist akzeptabel)
//! - `FeatureAnbindung`: erfordert Attach/Detach eines externen
//!   Prozessors (z.B. neuronale Rauschunterdrueckung)

use serde::{Deserialize, Serialize};

use crate::dsp::kompressor::KompressorParameter;

// ---------------------------------------------------------------------------
// Suppressor-Modell
// ---------------------------------------------------------------------------

/// Auswahl des Rauschunterdrueckungs-Modells
///
/// Das Modell selbst ist eine Blackbox des Transports; hier steht nur
/// welche Variante angebunden werden soll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressorModell {
    /// Kein externer Suppressor
    Keines,
    /// Transport-eigene Standard-Unterdrueckung
    Standard,
    /// Neuronales Modell (kann beim Anbinden fehlschlagen)
    Neural,
}

// ---------------------------------------------------------------------------
// AudioSettings
// ---------------------------------------------------------------------------

/// Flacher Einstellungs-Snapshot fuer den Audio-Graphen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    // --- Capture-Constraints (Republish noetig) ---
    /// Echo-Unterdrueckung im Capture
    pub echo_unterdrueckung: bool,
    /// Geraeteseitige Rauschunterdrueckung im Capture
    pub rausch_unterdrueckung: bool,
    /// Automatische Verstaerkungsregelung im Capture
    pub auto_gain: bool,
    /// Discontinuous Transmission (Stille wird nicht gesendet)
    pub dtx: bool,
    /// Mikrofon-Verstaerkung (1.0 = neutral)
    pub mikrofon_gain: f32,

    // --- Filterfrequenzen (sofort live) ---
    /// Hochpass-Grenzfrequenz in Hz (0 = aus)
    pub hochpass_hz: f32,
    /// Tiefpass-Grenzfrequenz in Hz (0 = aus)
    pub tiefpass_hz: f32,

    // --- Noise Gate ---
    /// Gate aktiv?
    pub gate_aktiv: bool,
    /// Empfindlichkeit 0–100 (0 = gated nie)
    pub gate_empfindlichkeit: u8,
    /// Haltezeit bevor das Gate schliesst, in Millisekunden
    pub gate_haltezeit_ms: u64,

    // --- Externer Suppressor (Feature-Anbindung) ---
    /// Gewaehltes Modell
    pub suppressor_modell: SuppressorModell,
    /// Staerke 0–100
    pub suppressor_staerke: u8,

    // --- Sprach-Erkennung ---
    /// RMS-Schwelle fuer Speaking-Anzeige
    pub vad_schwelle: f32,

    // --- De-Esser (sofort live) ---
    pub deesser_aktiv: bool,
    /// Staerke 0–100
    pub deesser_staerke: u8,

    // --- Kompressor (sofort live) ---
    pub kompressor_aktiv: bool,
    pub kompressor: KompressorParameter,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            echo_unterdrueckung: true,
            rausch_unterdrueckung: true,
            auto_gain: true,
            dtx: false,
            mikrofon_gain: 1.0,
            hochpass_hz: 0.0,
            tiefpass_hz: 0.0,
            gate_aktiv: false,
            gate_empfindlichkeit: 50,
            gate_haltezeit_ms: 200,
            suppressor_modell: SuppressorModell::Keines,
            suppressor_staerke: 50,
            vad_schwelle: 0.005,
            deesser_aktiv: false,
            deesser_staerke: 50,
            kompressor_aktiv: false,
            kompressor: KompressorParameter::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Klassifikation
// ---------------------------------------------------------------------------

/// Einstellungs-Schluessel (ein Eintrag pro Feld)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsSchluessel {
    EchoUnterdrueckung,
    RauschUnterdrueckung,
    AutoGain,
    Dtx,
    MikrofonGain,
    HochpassHz,
    TiefpassHz,
    GateAktiv,
    GateEmpfindlichkeit,
    GateHaltezeit,
    SuppressorModell,
    SuppressorStaerke,
    VadSchwelle,
    DeesserAktiv,
    DeesserStaerke,
    KompressorAktiv,
    KompressorParameter,
}

/// Wie eine Einstellungs-Aenderung angewendet wird
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnwendungsArt {
    /// Greift sofort auf alle bestehenden Pipelines bzw. Regler
    SofortLive,
    /// Erfordert Republish des Mikrofons mit neuen Constraints
    CaptureNeustart,
    /// Erfordert Attach/Detach eines externen Prozessors
    FeatureAnbindung,
}

impl SettingsSchluessel {
    /// Deklarative Tabelle: Schluessel -> Anwendungsart
    pub fn anwendungs_art(self) -> AnwendungsArt {
        use AnwendungsArt::*;
        use SettingsSchluessel::*;
        match self {
            EchoUnterdrueckung | RauschUnterdrueckung | AutoGain | Dtx | MikrofonGain => {
                CaptureNeustart
            }
            SuppressorModell | SuppressorStaerke => FeatureAnbindung,
            HochpassHz | TiefpassHz | GateAktiv | GateEmpfindlichkeit | GateHaltezeit
            | VadSchwelle | DeesserAktiv | DeesserStaerke | KompressorAktiv
            | KompressorParameter => SofortLive,
        }
    }
}

impl AudioSettings {
    /// Ermittelt welche Schluessel sich gegenueber `neu` geaendert haben
    pub fn geaenderte_schluessel(&self, neu: &AudioSettings) -> Vec<SettingsSchluessel> {
        use SettingsSchluessel::*;
        let mut geaendert = Vec::new();
        let mut pruefe = |gleich: bool, schluessel: SettingsSchluessel| {
            if !gleich {
                geaendert.push(schluessel);
            }
        };

        pruefe(self.echo_unterdrueckung == neu.echo_unterdrueckung, EchoUnterdrueckung);
        pruefe(self.rausch_unterdrueckung == neu.rausch_unterdrueckung, RauschUnterdrueckung);
        pruefe(self.auto_gain == neu.auto_gain, AutoGain);
        pruefe(self.dtx == neu.dtx, Dtx);
        pruefe(self.mikrofon_gain == neu.mikrofon_gain, MikrofonGain);
        pruefe(self.hochpass_hz == neu.hochpass_hz, HochpassHz);
        pruefe(self.tiefpass_hz == neu.tiefpass_hz, TiefpassHz);
        pruefe(self.gate_aktiv == neu.gate_aktiv, GateAktiv);
        pruefe(self.gate_empfindlichkeit == neu.gate_empfindlichkeit, GateEmpfindlichkeit);
        pruefe(self.gate_haltezeit_ms == neu.gate_haltezeit_ms, GateHaltezeit);
        pruefe(self.suppressor_modell == neu.suppressor_modell, SuppressorModell);
        pruefe(self.suppressor_staerke == neu.suppressor_staerke, SuppressorStaerke);
        pruefe(self.vad_schwelle == neu.vad_schwelle, VadSchwelle);
        pruefe(self.deesser_aktiv == neu.deesser_aktiv, DeesserAktiv);
        pruefe(self.deesser_staerke == neu.deesser_staerke, DeesserStaerke);
        pruefe(self.kompressor_aktiv == neu.kompressor_aktiv, KompressorAktiv);
        pruefe(self.kompressor == neu.kompressor, KompressorParameter);

        geaendert
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
