//! De-Esser
//!
//! Shelving-Absenkung im Sibilanzbereich (um 6 kHz). Die Staerke 0–100
//! skaliert die Absenkung linear von 0 dB bis zur festen Maximal-Absenkung:
//! Staerke 50 ergibt exakt die halbe Maximal-Absenkung in dB.

use super::{db_to_linear, AudioProcessor};

/// Zentrum des Sibilanzbereichs
pub const SIBILANZ_HZ: f32 = 6000.0;

/// Maximale Shelf-Absenkung bei Staerke 100
pub const MAX_ABSENKUNG_DB: f32 = 20.0;

/// De-Esser Knoten
///
/// Arbeitsweise: Ein RC-Hochpass bei `SIBILANZ_HZ` extrahiert den
/// Hochfrequenzanteil. Der Shelf ergibt sich aus
/// `y = x + (g - 1) * hf(x)` mit `g` als linearem Absenkungsfaktor –
/// unterhalb des Shelfs bleibt das Signal unveraendert.
pub struct DeEsser {
    /// Staerke 0–100
    staerke: u8,
    /// Linearer Shelf-Gain (1.0 = keine Absenkung)
    shelf_gain: f32,
    /// Hochpass-Filterkoeffizient
    hp_coeff: f32,
    hp_last_in: f32,
    hp_last_out: f32,
    enabled: bool,
}

impl DeEsser {
    /// Erstellt einen neuen De-Esser mit gegebener Staerke
    pub fn new(staerke: u8, sample_rate: f32) -> Self {
        let hp_coeff = 1.0 / (1.0 + 2.0 * std::f32::consts::PI * SIBILANZ_HZ / sample_rate);
        let mut de = Self {
            staerke: 0,
            shelf_gain: 1.0,
            hp_coeff,
            hp_last_in: 0.0,
            hp_last_out: 0.0,
            enabled: true,
        };
        de.set_staerke(staerke);
        de
    }

    /// Setzt die Staerke (0–100) zur Laufzeit
    pub fn set_staerke(&mut self, staerke: u8) {
        self.staerke = staerke.min(100);
        self.shelf_gain = db_to_linear(-self.absenkung_db());
    }

    /// Gibt die aktuelle Staerke zurueck
    pub fn staerke(&self) -> u8 {
        self.staerke
    }

    /// Aktuelle Shelf-Absenkung in dB (linear aus der Staerke skaliert)
    pub fn absenkung_db(&self) -> f32 {
        self.staerke as f32 / 100.0 * MAX_ABSENKUNG_DB
    }
}

impl AudioProcessor for DeEsser {
    fn process(&mut self, samples: &mut [f32]) {
        if !self.enabled || self.staerke == 0 {
            return;
        }

        let anteil = self.shelf_gain - 1.0;
        for sample in samples.iter_mut() {
            let x = *sample;
            let hf = self.hp_coeff * (self.hp_last_out + x - self.hp_last_in);
            self.hp_last_out = hf;
            self.hp_last_in = x;
            *sample = x + anteil * hf;
        }
    }

    fn reset(&mut self) {
        self.hp_last_in = 0.0;
        self.hp_last_out = 0.0;
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
    fn deesser_staerke_50_halbe_absenkung() {
        let halb = DeEsser::new(50, 48000.0);
        let voll = DeEsser::new(100, 48000.0);
        assert!(
            (halb.absenkung_db() * 2.0 - voll.absenkung_db()).abs() < f32::EPSILON,
            "Staerke 50 muss exakt die halbe Absenkung von Staerke 100 ergeben"
        );
        assert!((halb.absenkung_db() - MAX_ABSENKUNG_DB / 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn deesser_staerke_null_unveraendert() {
        let mut de = DeEsser::new(0, 48000.0);
        let original = vec![0.5f32; 480];
        let mut samples = original.clone();
        de.process(&mut samples);
        assert_eq!(samples, original);
    }

    #[test]
    fn deesser_staerke_geclamped() {
        let de = DeEsser::new(200, 48000.0);
        assert_eq!(de.staerke(), 100);
        assert!((de.absenkung_db() - MAX_ABSENKUNG_DB).abs() < f32::EPSILON);
    }

    #[test]
    fn deesser_daempft_sibilanz() {
        let mut de = DeEsser::new(100, 48000.0);
        // 10 kHz Sinus liegt im Shelf-Bereich
        let samples_in: Vec<f32> = (0..4800)
            .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 10000.0 / 48000.0).sin() * 0.4)
            .collect();
        let mut samples = samples_in.clone();
        de.process(&mut samples);
        let energy_in: f32 = samples_in.iter().map(|s| s * s).sum();
        let energy_out: f32 = samples.iter().map(|s| s * s).sum();
        assert!(
            energy_out < energy_in * 0.7,
            "Sibilanz sollte spuerbar abgesenkt sein: in={} out={}",
            energy_in,
            energy_out
        );
    }

    #[test]
    fn deesser_tiefe_frequenzen_kaum_betroffen() {
        let mut de = DeEsser::new(100, 48000.0);
        // 200 Hz liegt weit unter dem Shelf
        let samples_in: Vec<f32> = (0..4800)
            .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 200.0 / 48000.0).sin() * 0.4)
            .collect();
        let mut samples = samples_in.clone();
        de.process(&mut samples);
        let energy_ratio: f32 = samples.iter().map(|s| s * s).sum::<f32>()
            / samples_in.iter().map(|s| s * s).sum::<f32>();
        assert!(
            energy_ratio > 0.85,
            "Tiefe Frequenzen sollten kaum gedaempft werden: ratio={}",
            energy_ratio
        );
    }

    #[test]
    fn deesser_deaktiviert_unveraendert() {
        let mut de = DeEsser::new(100, 48000.0);
        de.set_enabled(false);
        let original = vec![0.3f32; 480];
        let mut samples = original.clone();
        de.process(&mut samples);
        assert_eq!(samples, original);
    }

    #[test]
    fn deesser_reset() {
        let mut de = DeEsser::new(80, 48000.0);
        let mut samples = vec![0.5f32; 480];
        de.process(&mut samples);
        de.reset();
        assert_eq!(de.hp_last_in, 0.0);
        assert_eq!(de.hp_last_out, 0.0);
    }
}
