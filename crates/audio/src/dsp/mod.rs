//! DSP-Knoten der Track-Filterkette
//!
//! Alle Knoten implementieren das `AudioProcessor` Trait und verarbeiten
//! Samples in-place. Parameteraenderungen greifen sofort, ohne die Kette
//! neu aufzubauen.

pub mod analyse;
pub mod deesser;
pub mod gain;
pub mod hochpass;
pub mod kompressor;
pub mod tiefpass;

/// Gemeinsames Trait fuer alle Audio-Knoten
///
/// Alle Knoten verarbeiten Samples in-place und sind Send + Sync
/// fuer Thread-sichere Pipeline-Nutzung.
pub trait AudioProcessor: Send + Sync {
    /// Verarbeitet einen Puffer von Samples in-place
    fn process(&mut self, samples: &mut [f32]);

    /// Setzt den internen Zustand zurueck (z.B. Filter-Historie)
    fn reset(&mut self);

    /// Gibt zurueck ob der Knoten aktiv ist
    fn is_enabled(&self) -> bool;

    /// Aktiviert oder deaktiviert den Knoten
    fn set_enabled(&mut self, enabled: bool);
}

/// Rechnet eine Attack/Release-Zeit in einen Glaettungskoeffizienten um
pub(crate) fn time_to_coeff(time_secs: f32, sample_rate: f32) -> f32 {
    if time_secs <= 0.0 {
        return 0.0;
    }
    (-1.0 / (time_secs * sample_rate)).exp()
}

/// dB in linearen Faktor
pub(crate) fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Linearer Faktor in dB (mit Untergrenze gegen log(0))
pub(crate) fn linear_to_db(linear: f32) -> f32 {
    20.0 * linear.max(1e-6).log10()
}
