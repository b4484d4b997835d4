//! Ausgangs-Gain mit klickfreiem Einblenden
//!
//! Der Gain startet bei 0 und faehrt linear ueber eine feste kurze
//! Rampe zum Ziel – so entstehen keine Klicks beim Aufbau der Kette.
//! Beim Deafen wird der Gain auf 0 "geduckt", die Ziel-Lautstaerke
//! bleibt dabei gespeichert und wird beim Undeafen wiederhergestellt.

use super::AudioProcessor;

/// Dauer der linearen Rampe in Millisekunden
pub const AUFBLEND_MS: f32 = 200.0;

/// Gain-Knoten am Ende der Filterkette
pub struct GainNode {
    /// Aktueller Gain (startet bei 0)
    aktuell: f32,
    /// Ziel-Lautstaerke des Teilnehmers (bleibt beim Ducken erhalten)
    ziel: f32,
    /// Geduckt (Deafen): effektives Ziel ist 0
    geduckt: bool,
    /// Gain-Aenderung pro Sample fuer die lineare Rampe
    schritt: f32,
    enabled: bool,
}

impl GainNode {
    /// Erstellt einen neuen Gain-Knoten
    ///
    /// `ziel` ist die initiale Teilnehmer-Lautstaerke; bei `geduckt`
    /// bleibt der effektive Gain 0 bis zum Undeafen.
    pub fn new(ziel: f32, geduckt: bool, sample_rate: f32) -> Self {
        Self {
            aktuell: 0.0,
            ziel: ziel.clamp(0.0, 2.0),
            geduckt,
            schritt: 1.0 / (AUFBLEND_MS / 1000.0 * sample_rate),
            enabled: true,
        }
    }

    /// Setzt die Ziel-Lautstaerke (sanfte Rampe, kein Sprung)
    pub fn set_lautstaerke(&mut self, lautstaerke: f32) {
        self.ziel = lautstaerke.clamp(0.0, 2.0);
    }

    /// Gibt die gespeicherte Ziel-Lautstaerke zurueck (auch waehrend Ducking)
    pub fn lautstaerke(&self) -> f32 {
        self.ziel
    }

    /// Duckt den Ausgang auf 0 bzw. hebt das Ducking wieder auf
    ///
    /// Die Ziel-Lautstaerke bleibt erhalten.
    pub fn set_geduckt(&mut self, geduckt: bool) {
        self.geduckt = geduckt;
    }

    /// Gibt zurueck ob der Ausgang geduckt ist
    pub fn ist_geduckt(&self) -> bool {
        self.geduckt
    }

    /// Aktueller Momentan-Gain (fuer Tests und Debugging)
    pub fn aktueller_gain(&self) -> f32 {
        self.aktuell
    }

    fn effektives_ziel(&self) -> f32 {
        if self.geduckt {
            0.0
        } else {
            self.ziel
        }
    }
}

impl AudioProcessor for GainNode {
    fn process(&mut self, samples: &mut [f32]) {
        if !self.enabled {
            return;
        }

        let ziel = self.effektives_ziel();
        for sample in samples.iter_mut() {
            let delta = (ziel - self.aktuell).clamp(-self.schritt, self.schritt);
            self.aktuell += delta;
            *sample *= self.aktuell;
        }
    }

    fn reset(&mut self) {
        self.aktuell = 0.0;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_startet_bei_null() {
        let gain = GainNode::new(1.0, false, 48000.0);
        assert_eq!(gain.aktueller_gain(), 0.0);
    }

    #[test]
    fn gain_rampt_linear_zum_ziel() {
        let mut gain = GainNode::new(1.0, false, 48000.0);
        // 200 ms bei 48 kHz = 9600 Samples bis zum Vollpegel
        let mut samples = vec![1.0f32; 9600];
        gain.process(&mut samples);
        assert!(
            (gain.aktueller_gain() - 1.0).abs() < 0.001,
            "Nach voller Rampe ist der Gain am Ziel, war {}",
            gain.aktueller_gain()
        );
        // Erste Samples nahezu stumm, letzte nahezu voll
        assert!(samples[0] < 0.01);
        assert!(samples[9599] > 0.99);
    }

    #[test]
    fn gain_halbe_rampe_halber_pegel() {
        let mut gain = GainNode::new(1.0, false, 48000.0);
        let mut samples = vec![1.0f32; 4800];
        gain.process(&mut samples);
        assert!(
            (gain.aktueller_gain() - 0.5).abs() < 0.01,
            "Nach halber Rampe ca. halber Gain, war {}",
            gain.aktueller_gain()
        );
    }

    #[test]
    fn gain_geduckt_bleibt_stumm() {
        let mut gain = GainNode::new(1.0, true, 48000.0);
        let mut samples = vec![1.0f32; 9600];
        gain.process(&mut samples);
        assert_eq!(gain.aktueller_gain(), 0.0);
        assert!(samples.iter().all(|&s| s == 0.0));
        // Ziel-Lautstaerke bleibt gespeichert
        assert!((gain.lautstaerke() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn gain_undeafen_stellt_lautstaerke_wieder_her() {
        let mut gain = GainNode::new(0.7, true, 48000.0);
        let mut samples = vec![1.0f32; 4800];
        gain.process(&mut samples);
        assert_eq!(gain.aktueller_gain(), 0.0);

        gain.set_geduckt(false);
        let mut samples = vec![1.0f32; 48000];
        gain.process(&mut samples);
        assert!(
            (gain.aktueller_gain() - 0.7).abs() < 0.001,
            "Nach Undeafen rampt der Gain zur gespeicherten Lautstaerke"
        );
    }

    #[test]
    fn gain_lautstaerke_clamp() {
        let mut gain = GainNode::new(1.0, false, 48000.0);
        gain.set_lautstaerke(99.0);
        assert!((gain.lautstaerke() - 2.0).abs() < f32::EPSILON);
        gain.set_lautstaerke(-1.0);
        assert!(gain.lautstaerke().abs() < f32::EPSILON);
    }
}
