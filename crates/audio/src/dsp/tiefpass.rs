//! Tiefpassfilter (1. Ordnung, RC)
//!
//! Begrenzt Remote-Streams nach oben. Grenzfrequenz 0 Hz bedeutet
//! "deaktiviert" und wird intern auf eine sehr hohe Grenzfrequenz
//! abgebildet (effektiv ungefiltert) – niemals auf 0 Hz, das waere Stille.

use super::AudioProcessor;

/// Sentinel fuer "Tiefpass aus": effektiv ungefilterte Grenzfrequenz
pub const TIEFPASS_OFFEN_HZ: f32 = 20_000.0;

/// Tiefpassfilter mit zur Laufzeit aenderbarer Grenzfrequenz
pub struct LowPassFilter {
    /// Effektive Grenzfrequenz (bei konfiguriertem 0: `TIEFPASS_OFFEN_HZ`)
    grenz_hz: f32,
    sample_rate: f32,
    /// RC-Koeffizient: alpha = (2*pi*fc/fs) / (1 + 2*pi*fc/fs)
    coeff: f32,
    last_out: f32,
    enabled: bool,
}

impl LowPassFilter {
    /// Erstellt einen neuen Tiefpass (0 Hz = aus)
    pub fn new(grenz_hz: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            grenz_hz: TIEFPASS_OFFEN_HZ,
            sample_rate,
            coeff: 1.0,
            last_out: 0.0,
            enabled: true,
        };
        filter.set_grenzfrequenz(grenz_hz);
        filter
    }

    /// Setzt die Grenzfrequenz zur Laufzeit
    ///
    /// 0 Hz wird auf `TIEFPASS_OFFEN_HZ` abgebildet, nicht auf Stille.
    pub fn set_grenzfrequenz(&mut self, hz: f32) {
        self.grenz_hz = if hz <= 0.0 { TIEFPASS_OFFEN_HZ } else { hz };
        let omega = 2.0 * std::f32::consts::PI * self.grenz_hz / self.sample_rate;
        self.coeff = omega / (1.0 + omega);
    }

    /// Gibt die effektive Grenzfrequenz zurueck
    pub fn grenzfrequenz(&self) -> f32 {
        self.grenz_hz
    }
}

impl AudioProcessor for LowPassFilter {
    fn process(&mut self, samples: &mut [f32]) {
        if !self.enabled {
            return;
        }

        for sample in samples.iter_mut() {
            // RC-Tiefpass: y[n] = y[n-1] + alpha * (x[n] - y[n-1])
            let y = self.last_out + self.coeff * (*sample - self.last_out);
            self.last_out = y;
            *sample = y;
        }
    }

    fn reset(&mut self) {
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
    fn tiefpass_null_hz_ist_offen_sentinel() {
        let lp = LowPassFilter::new(0.0, 48000.0);
        assert_eq!(
            lp.grenzfrequenz(),
            TIEFPASS_OFFEN_HZ,
            "0 Hz muss auf den Offen-Sentinel abgebildet werden, nicht auf 0"
        );
    }

    #[test]
    fn tiefpass_null_hz_keine_stille() {
        let mut lp = LowPassFilter::new(0.0, 48000.0);
        let mut samples = vec![0.5f32; 4800];
        lp.process(&mut samples);
        // Konstantes Signal muss nahezu voll durchkommen
        let last = samples[samples.len() - 1];
        assert!(last > 0.45, "Offener Tiefpass darf nicht stumm schalten, last={}", last);
    }

    #[test]
    fn tiefpass_daempft_hohe_frequenzen() {
        let mut lp = LowPassFilter::new(500.0, 48000.0);
        // 10 kHz Sinus weit ueber der Grenzfrequenz
        let samples_in: Vec<f32> = (0..4800)
            .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 10000.0 / 48000.0).sin() * 0.5)
            .collect();
        let mut samples = samples_in.clone();
        lp.process(&mut samples);
        let energy_in: f32 = samples_in.iter().map(|s| s * s).sum();
        let energy_out: f32 = samples.iter().map(|s| s * s).sum();
        assert!(
            energy_out < energy_in * 0.3,
            "10 kHz sollte bei fc=500 Hz stark gedaempft sein: in={} out={}",
            energy_in,
            energy_out
        );
    }

    #[test]
    fn tiefpass_frequenz_aenderbar() {
        let mut lp = LowPassFilter::new(8000.0, 48000.0);
        assert!((lp.grenzfrequenz() - 8000.0).abs() < f32::EPSILON);
        lp.set_grenzfrequenz(0.0);
        assert_eq!(lp.grenzfrequenz(), TIEFPASS_OFFEN_HZ);
    }

    #[test]
    fn tiefpass_reset() {
        let mut lp = LowPassFilter::new(500.0, 48000.0);
        let mut samples = vec![0.5f32; 480];
        lp.process(&mut samples);
        lp.reset();
        assert_eq!(lp.last_out, 0.0);
    }
}
