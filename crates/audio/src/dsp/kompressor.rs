//! Dynamik-Kompressor
//!
//! Standard-Feedforward-Kompressor: Threshold, Ratio, Attack, Release,
//! festes Soft-Knee. Parameteraenderungen greifen sofort auf die laufende
//! Kette, die Filter-Historie bleibt dabei erhalten.

use serde::{Deserialize, Serialize};

use super::{db_to_linear, linear_to_db, time_to_coeff, AudioProcessor};

/// Festes Soft-Knee in dB
pub const KNEE_DB: f32 = 30.0;

/// Parameter des Kompressors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KompressorParameter {
    /// Schwellenwert in dBFS (z.B. -24.0)
    pub schwelle_db: f32,
    /// Kompressionsverhaeltnis (1.0 = kein Effekt)
    pub ratio: f32,
    /// Attack-Zeit in Millisekunden
    pub attack_ms: f32,
    /// Release-Zeit in Millisekunden
    pub release_ms: f32,
}

impl Default for KompressorParameter {
    fn default() -> Self {
        Self {
            schwelle_db: -24.0,
            ratio: 4.0,
            attack_ms: 3.0,
            release_ms: 250.0,
        }
    }
}

/// Kompressor-Knoten
pub struct Kompressor {
    parameter: KompressorParameter,
    sample_rate: f32,
    attack_coeff: f32,
    release_coeff: f32,
    /// Geglaettete Huellkurve des Eingangspegels (linear)
    envelope: f32,
    enabled: bool,
}

impl Kompressor {
    /// Erstellt einen neuen Kompressor
    pub fn new(parameter: KompressorParameter, sample_rate: f32) -> Self {
        let mut k = Self {
            parameter,
            sample_rate,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope: 0.0,
            enabled: true,
        };
        k.set_parameter(parameter);
        k
    }

    /// Setzt alle Parameter zur Laufzeit (Huellkurve bleibt erhalten)
    pub fn set_parameter(&mut self, parameter: KompressorParameter) {
        self.parameter = KompressorParameter {
            ratio: parameter.ratio.max(1.0),
            ..parameter
        };
        self.attack_coeff = time_to_coeff(self.parameter.attack_ms / 1000.0, self.sample_rate);
        self.release_coeff = time_to_coeff(self.parameter.release_ms / 1000.0, self.sample_rate);
    }

    /// Gibt die aktuellen Parameter zurueck
    pub fn parameter(&self) -> KompressorParameter {
        self.parameter
    }

    /// Gain-Reduktion in dB fuer einen Eingangspegel in dB (Soft-Knee)
    fn gain_reduktion_db(&self, pegel_db: f32) -> f32 {
        let ueber = pegel_db - self.parameter.schwelle_db;
        let steigung = 1.0 / self.parameter.ratio - 1.0;

        if 2.0 * ueber < -KNEE_DB {
            // Unter dem Knee: keine Reduktion
            0.0
        } else if 2.0 * ueber.abs() <= KNEE_DB {
            // Im Knee: quadratische Interpolation
            steigung * (ueber + KNEE_DB / 2.0).powi(2) / (2.0 * KNEE_DB)
        } else {
            // Ueber dem Knee: volle Kompression
            steigung * ueber
        }
    }
}

impl AudioProcessor for Kompressor {
    fn process(&mut self, samples: &mut [f32]) {
        if !self.enabled {
            return;
        }

        for sample in samples.iter_mut() {
            let level = sample.abs();

            // Huellkurve: Attack bei steigendem, Release bei fallendem Pegel
            let coeff = if level > self.envelope {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * level;

            let reduktion_db = self.gain_reduktion_db(linear_to_db(self.envelope));
            *sample *= db_to_linear(reduktion_db);
        }
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
