//! Analyse-Tap
//!
//! Rein analytischer Knoten: misst den RMS-Pegel des letzten Frames
//! ohne die Samples zu veraendern. Liefert den Pegel fuer
//! Speaking-Anzeigen und Debugging.

use super::AudioProcessor;

/// Analyse-Tap der Filterkette
pub struct AnalyseTap {
    /// RMS-Pegel des letzten Frames
    letzter_pegel: f32,
    enabled: bool,
}

impl AnalyseTap {
    /// Erstellt einen neuen Analyse-Tap
    pub fn new() -> Self {
        Self {
            letzter_pegel: 0.0,
            enabled: true,
        }
    }

    /// Gibt den RMS-Pegel des letzten Frames zurueck
    pub fn pegel(&self) -> f32 {
        self.letzter_pegel
    }
}

impl Default for AnalyseTap {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioProcessor for AnalyseTap {
    /// Veraendert keine Samples – nur interne Pegelmessung
    fn process(&mut self, samples: &mut [f32]) {
        if !self.enabled {
            return;
        }
        self.letzter_pegel = rms_pegel(samples);
    }

    fn reset(&mut self) {
        self.letzter_pegel = 0.0;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Berechnet den RMS-Pegel eines Frames
pub fn rms_pegel(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_stille() {
        assert!(rms_pegel(&vec![0.0f32; 480]) < f32::EPSILON);
    }

    #[test]
    fn rms_signal() {
        let samples = vec![0.5f32; 480];
        assert!((rms_pegel(&samples) - 0.5).abs() < 0.001);
    }

    #[test]
    fn rms_leer() {
        assert!(rms_pegel(&[]) < f32::EPSILON);
    }

    #[test]
    fn analyse_veraendert_samples_nicht() {
        let mut tap = AnalyseTap::new();
        let original = vec![0.3f32; 480];
        let mut samples = original.clone();
        tap.process(&mut samples);
        assert_eq!(samples, original);
        assert!((tap.pegel() - 0.3).abs() < 0.001);
    }

    #[test]
    fn analyse_reset() {
        let mut tap = AnalyseTap::new();
        let mut samples = vec![0.5f32; 480];
        tap.process(&mut samples);
        tap.reset();
        assert_eq!(tap.pegel(), 0.0);
    }
}
