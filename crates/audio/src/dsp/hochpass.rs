//! Hochpassfilter (1. Ordnung, RC)
//!
//! Entfernt tieffrequentes Rumpeln aus Remote-Streams.
//! Grenzfrequenz 0 Hz bedeutet "deaktiviert" – das Signal passiert
//! unveraendert.

use super::AudioProcessor;

/// Hochpassfilter mit zur Laufzeit aenderbarer Grenzfrequenz
pub struct HighPassFilter {
    /// Konfigurierte Grenzfrequenz (0 = aus)
    grenz_hz: f32,
    sample_rate: f32,
    /// RC-Koeffizient: alpha = 1 / (1 + 2*pi*fc/fs)
    coeff: f32,
    last_in: f32,
    last_out: f32,
    enabled: bool,
}

impl HighPassFilter {
    /// Erstellt einen neuen Hochpass
    pub fn new(grenz_hz: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            grenz_hz: 0.0,
            sample_rate,
            coeff: 0.0,
            last_in: 0.0,
            last_out: 0.0,
            enabled: true,
        };
        filter.set_grenzfrequenz(grenz_hz);
        filter
    }

    /// Setzt die Grenzfrequenz zur Laufzeit (0 = aus)
    pub fn set_grenzfrequenz(&mut self, hz: f32) {
        self.grenz_hz = hz.max(0.0);
        if self.grenz_hz > 0.0 {
            self.coeff =
                1.0 / (1.0 + 2.0 * std::f32::consts::PI * self.grenz_hz / self.sample_rate);
        }
    }

    /// Gibt die konfigurierte Grenzfrequenz zurueck (0 = aus)
    pub fn grenzfrequenz(&self) -> f32 {
        self.grenz_hz
    }

    /// Gibt zurueck ob der Filter effektiv wirkt
    pub fn ist_wirksam(&self) -> bool {
        self.enabled && self.grenz_hz > 0.0
    }
}

impl AudioProcessor for HighPassFilter {
    fn process(&mut self, samples: &mut [f32]) {
        if !self.ist_wirksam() {
            return;
        }

        for sample in samples.iter_mut() {
            let x = *sample;
            // RC-Hochpass: y[n] = alpha * (y[n-1] + x[n] - x[n-1])
            let y = self.coeff * (self.last_out + x - self.last_in);
            self.last_out = y;
            self.last_in = x;
            *sample = y;
        }
    }

    fn reset(&mut self) {
        self.last_in = 0.0;
        self.last_out = 0.0;
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
    fn hochpass_null_hz_passiert_alles() {
        let mut hp = HighPassFilter::new(0.0, 48000.0);
        let original = vec![0.5f32; 480];
        let mut samples = original.clone();
        hp.process(&mut samples);
        assert_eq!(samples, original, "0 Hz = deaktiviert, Signal unveraendert");
    }

    #[test]
    fn hochpass_daempft_gleichanteil() {
        let mut hp = HighPassFilter::new(100.0, 48000.0);
        // Konstantes Signal (0 Hz Anteil) sollte stark gedaempft werden
        let mut samples = vec![0.5f32; 4800];
        hp.process(&mut samples);
        let last = samples[samples.len() - 1].abs();
        assert!(last < 0.05, "Gleichanteil sollte ausgefiltert sein, last={}", last);
    }

    #[test]
    fn hochpass_hohe_frequenz_passiert() {
        let mut hp = HighPassFilter::new(100.0, 48000.0);
        // 8 kHz Sinus liegt weit ueber der Grenzfrequenz
        let samples_in: Vec<f32> = (0..4800)
            .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 8000.0 / 48000.0).sin() * 0.3)
            .collect();
        let mut samples = samples_in.clone();
        hp.process(&mut samples);
        let energy_in: f32 = samples_in.iter().map(|s| s * s).sum();
        let energy_out: f32 = samples.iter().map(|s| s * s).sum();
        assert!(
            energy_out > energy_in * 0.8,
            "Hohe Frequenzen sollten weitgehend passieren"
        );
    }

    #[test]
    fn hochpass_frequenz_aenderbar() {
        let mut hp = HighPassFilter::new(80.0, 48000.0);
        hp.set_grenzfrequenz(200.0);
        assert!((hp.grenzfrequenz() - 200.0).abs() < f32::EPSILON);
        hp.set_grenzfrequenz(0.0);
        assert!(!hp.ist_wirksam());
    }

    #[test]
    fn hochpass_reset() {
        let mut hp = HighPassFilter::new(100.0, 48000.0);
        let mut samples = vec![0.5f32; 480];
        hp.process(&mut samples);
        hp.reset();
        assert_eq!(hp.last_in, 0.0);
        assert_eq!(hp.last_out, 0.0);
    }
}
