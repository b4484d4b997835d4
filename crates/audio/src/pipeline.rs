//! Track-Pipeline
//!
//! Pro abonniertem Remote-Audio-Track eine Filterkette in fester
//! Reihenfolge:
//!
//! Quelle -> Hochpass -> Tiefpass -> [De-Esser] -> [Kompressor]
//!        -> Analyse-Tap -> Gain -> Senke
//!
//! De-Esser und Kompressor sind immer Teil der Kette und werden nur
//! aktiviert/deaktiviert – so greifen Einstellungsaenderungen live,
//! ohne die Kette je neu aufzubauen. Die Kette haelt einen
//! Verarbeitungs-Kontext der beim Abbau explizit geschlossen werden
//! muss; vergessene Kontexte werden beim Drop geloggt.

use tracing::warn;

use crate::dsp::analyse::AnalyseTap;
use crate::dsp::deesser::DeEsser;
use crate::dsp::gain::GainNode;
use crate::dsp::hochpass::HighPassFilter;
use crate::dsp::kompressor::Kompressor;
use crate::dsp::tiefpass::LowPassFilter;
use crate::dsp::AudioProcessor;
use crate::settings::AudioSettings;

/// Standard-Abtastrate der Verarbeitungskette
pub const ABTASTRATE: f32 = 48_000.0;

// ---------------------------------------------------------------------------
// Verarbeitungs-Kontext
// ---------------------------------------------------------------------------

/// Verarbeitungs-Kontext einer Pipeline
///
/// Steht fuer die Ressourcen der Kette (bei WebRTC-Transporten der
/// zugrundeliegende Audio-Kontext). Muss beim Abbau der Pipeline
/// geschlossen werden, sonst leckt pro Track-Wechsel ein Kontext.
pub struct VerarbeitungsKontext {
    sample_rate: f32,
    offen: bool,
}

impl VerarbeitungsKontext {
    /// Oeffnet einen neuen Kontext
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            offen: true,
        }
    }

    /// Abtastrate des Kontexts
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Gibt zurueck ob der Kontext noch offen ist
    pub fn ist_offen(&self) -> bool {
        self.offen
    }

    /// Schliesst den Kontext und gibt seine Ressourcen frei
    pub fn schliessen(&mut self) {
        self.offen = false;
    }
}

impl Drop for VerarbeitungsKontext {
    fn drop(&mut self) {
        if self.offen {
            warn!("Verarbeitungs-Kontext wurde nicht geschlossen (Ressourcen-Leck)");
        }
    }
}

// ---------------------------------------------------------------------------
// TrackPipeline
// ---------------------------------------------------------------------------

/// Filterkette eines Remote-Audio-Tracks
pub struct TrackPipeline {
    kontext: VerarbeitungsKontext,
    hochpass: HighPassFilter,
    tiefpass: LowPassFilter,
    deesser: DeEsser,
    kompressor: Kompressor,
    analyse: AnalyseTap,
    gain: GainNode,
}

impl TrackPipeline {
    /// Baut die Kette aus den aktuellen Einstellungen auf
    ///
    /// `lautstaerke` ist die gespeicherte Teilnehmer-Lautstaerke,
    /// `geduckt` gilt waehrend Deafen (Lautstaerke bleibt erhalten).
    pub fn aus_settings(
        settings: &AudioSettings,
        lautstaerke: f32,
        geduckt: bool,
        sample_rate: f32,
    ) -> Self {
        let mut deesser = DeEsser::new(settings.deesser_staerke, sample_rate);
        deesser.set_enabled(settings.deesser_aktiv);
        let mut kompressor = Kompressor::new(settings.kompressor, sample_rate);
        kompressor.set_enabled(settings.kompressor_aktiv);

        Self {
            kontext: VerarbeitungsKontext::new(sample_rate),
            hochpass: HighPassFilter::new(settings.hochpass_hz, sample_rate),
            tiefpass: LowPassFilter::new(settings.tiefpass_hz, sample_rate),
            deesser,
            kompressor,
            analyse: AnalyseTap::new(),
            gain: GainNode::new(lautstaerke, geduckt, sample_rate),
        }
    }

    /// Verarbeitet einen Frame in fester Knoten-Reihenfolge
    pub fn process_frame(&mut self, samples: &mut [f32]) {
        self.hochpass.process(samples);
        self.tiefpass.process(samples);
        self.deesser.process(samples);
        self.kompressor.process(samples);
        self.analyse.process(samples);
        self.gain.process(samples);
    }

    /// Wendet geaenderte Einstellungen live auf die laufende Kette an
    ///
    /// Die Kette wird nie neu aufgebaut; Filter-Historien bleiben
    /// erhalten, optionale Knoten werden nur (de)aktiviert.
    pub fn settings_anwenden(&mut self, settings: &AudioSettings) {
        self.hochpass.set_grenzfrequenz(settings.hochpass_hz);
        self.tiefpass.set_grenzfrequenz(settings.tiefpass_hz);
        self.deesser.set_staerke(settings.deesser_staerke);
        self.deesser.set_enabled(settings.deesser_aktiv);
        self.kompressor.set_parameter(settings.kompressor);
        self.kompressor.set_enabled(settings.kompressor_aktiv);
    }

    /// Setzt die Teilnehmer-Lautstaerke (sanfte Rampe)
    pub fn set_lautstaerke(&mut self, lautstaerke: f32) {
        self.gain.set_lautstaerke(lautstaerke);
    }

    /// Gespeicherte Teilnehmer-Lautstaerke (auch waehrend Deafen)
    pub fn lautstaerke(&self) -> f32 {
        self.gain.lautstaerke()
    }

    /// Duckt den Ausgang (Deafen) bzw. stellt ihn wieder her
    pub fn set_geduckt(&mut self, geduckt: bool) {
        self.gain.set_geduckt(geduckt);
    }

    /// RMS-Pegel des letzten Frames (Analyse-Tap)
    pub fn pegel(&self) -> f32 {
        self.analyse.pegel()
    }

    /// Gibt zurueck ob der Kontext noch offen ist
    pub fn ist_offen(&self) -> bool {
        self.kontext.ist_offen()
    }

    /// Baut die Kette ab und schliesst den Verarbeitungs-Kontext
    pub fn schliessen(mut self) {
        self.kontext.schliessen();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::tiefpass::TIEFPASS_OFFEN_HZ;

    fn pipeline() -> TrackPipeline {
        TrackPipeline::aus_settings(&AudioSettings::default(), 1.0, false, ABTASTRATE)
    }

    #[test]
    fn pipeline_default_passiert_signal() {
        let mut p = pipeline();
        // Rampe ueberbruecken, dann muss das Signal nahezu unveraendert durch
        let mut warmup = vec![0.0f32; 9600];
        p.process_frame(&mut warmup);

        let mut samples = vec![0.2f32; 480];
        p.process_frame(&mut samples);
        let last = samples[samples.len() - 1];
        assert!(
            (last - 0.2).abs() < 0.02,
            "Default-Kette (alles aus/offen) soll kaum veraendern, last={}",
            last
        );
    }

    #[test]
    fn pipeline_analyse_liefert_pegel() {
        let mut p = pipeline();
        let mut samples = vec![0.4f32; 480];
        p.process_frame(&mut samples);
        assert!(p.pegel() > 0.1, "Analyse-Tap misst den Frame-Pegel");
    }

    #[test]
    fn pipeline_settings_live_anwenden() {
        let mut p = pipeline();
        let neu = AudioSettings {
            hochpass_hz: 120.0,
            tiefpass_hz: 8000.0,
            deesser_aktiv: true,
            deesser_staerke: 80,
            kompressor_aktiv: true,
            ..AudioSettings::default()
        };
        p.settings_anwenden(&neu);
        assert!((p.hochpass.grenzfrequenz() - 120.0).abs() < f32::EPSILON);
        assert!((p.tiefpass.grenzfrequenz() - 8000.0).abs() < f32::EPSILON);
        assert!(p.deesser.is_enabled());
        assert_eq!(p.deesser.staerke(), 80);
        assert!(p.kompressor.is_enabled());
    }

    #[test]
    fn pipeline_tiefpass_null_wird_offen() {
        let p = TrackPipeline::aus_settings(
            &AudioSettings {
                tiefpass_hz: 0.0,
                ..AudioSettings::default()
            },
            1.0,
            false,
            ABTASTRATE,
        );
        assert_eq!(p.tiefpass.grenzfrequenz(), TIEFPASS_OFFEN_HZ);
    }

    #[test]
    fn pipeline_deafen_duckt_und_stellt_wieder_her() {
        let mut p = TrackPipeline::aus_settings(&AudioSettings::default(), 0.8, true, ABTASTRATE);
        let mut samples = vec![0.5f32; 9600];
        p.process_frame(&mut samples);
        assert!(samples.iter().all(|&s| s == 0.0), "Geduckt = stumm");
        assert!((p.lautstaerke() - 0.8).abs() < f32::EPSILON);

        p.set_geduckt(false);
        let mut samples = vec![0.5f32; 48000];
        p.process_frame(&mut samples);
        assert!(
            samples[samples.len() - 1] > 0.3,
            "Nach Undeafen rampt der Ausgang zur gespeicherten Lautstaerke"
        );
    }

    #[test]
    fn pipeline_schliessen_ohne_leck_warnung() {
        let p = pipeline();
        assert!(p.ist_offen());
        p.schliessen();
    }
}
