//! Adaptiver Bitrate-Regler
//!
//! Reine Zustandsmaschine mit Hysterese-Zaehlern, gefuettert von der
//! Bitrate-Schleife der Session mit periodischen Verlust-Proben:
//!
//! - Verlust > 5%: Hoch-Zaehler hoch, Niedrig-Zaehler zurueck. Ab der
//!   zweiten Probe wird um 25% reduziert (gerundet, Untergrenze
//!   32 kbps) – und bei anhaltendem Verlust jede weitere Probe erneut.
//! - Verlust < 1%: Niedrig-Zaehler hoch, Hoch-Zaehler zurueck. Nach 5
//!   Proben in Folge wird um 10% erhoeht (gerundet, Obergrenze ist die
//!   Ziel-Bitrate der Session), danach zaehlt der Niedrig-Zaehler neu.
//! - Verlust in [1%, 5%]: beide Zaehler zurueck, keine Aenderung.
//!
//! Einzelne Ausreisser akkumulieren so nie zu einer Reduktion.

use tracing::debug;

/// Untergrenze der Audio-Bitrate in bps
pub const BITRATE_MINIMUM: u32 = 32_000;

/// Verlust-Schwelle ab der reduziert wird (Prozent)
pub const VERLUST_HOCH_PROZENT: f32 = 5.0;

/// Verlust-Schwelle unter der erhoeht wird (Prozent)
pub const VERLUST_NIEDRIG_PROZENT: f32 = 1.0;

/// Noetige Hoch-Verlust-Proben in Folge bis zur ersten Reduktion
pub const HOCH_PROBEN: u8 = 2;

/// Noetige Niedrig-Verlust-Proben in Folge pro Erhoehung
pub const NIEDRIG_PROBEN: u8 = 5;

const REDUKTIONS_FAKTOR: f64 = 0.75;
const ERHOEHUNGS_FAKTOR: f64 = 1.10;

/// Hysterese-Zustandsmaschine der Bitrate-Anpassung
pub struct AdaptiveBitrateRegler {
    aktuell: u32,
    /// Obergrenze der Session (Kanal-Override oder Standard)
    ziel: u32,
    hoch_zaehler: u8,
    niedrig_zaehler: u8,
}

impl AdaptiveBitrateRegler {
    /// Startet bei der Ziel-Bitrate
    pub fn new(ziel: u32) -> Self {
        Self {
            aktuell: ziel,
            ziel,
            hoch_zaehler: 0,
            niedrig_zaehler: 0,
        }
    }

    /// Aktuell angewendete Bitrate in bps
    pub fn aktuelle_bitrate(&self) -> u32 {
        self.aktuell
    }

    /// Ziel-Bitrate (Obergrenze) der Session
    pub fn ziel_bitrate(&self) -> u32 {
        self.ziel
    }

    /// Setzt die Ziel-Bitrate zur Laufzeit (Kanal-Override geaendert)
    ///
    /// Liegt die aktuelle Bitrate ueber dem neuen Ziel, wird sie
    /// sofort heruntergeklemmt und zurueckgegeben.
    pub fn set_ziel(&mut self, ziel: u32) -> Option<u32> {
        self.ziel = ziel.max(BITRATE_MINIMUM);
        if self.aktuell > self.ziel {
            self.aktuell = self.ziel;
            return Some(self.aktuell);
        }
        None
    }

    /// Wertet eine Verlust-Probe aus
    ///
    /// Gibt die neue Bitrate zurueck wenn sie sich geaendert hat und
    /// auf den Encoder angewendet werden muss.
    pub fn probe(&mut self, verlust_prozent: f32) -> Option<u32> {
        if verlust_prozent > VERLUST_HOCH_PROZENT {
            self.niedrig_zaehler = 0;
            // Saettigt an der Schwelle: anhaltender Verlust reduziert
            // danach jede Probe erneut
            if self.hoch_zaehler < HOCH_PROBEN {
                self.hoch_zaehler += 1;
            }
            if self.hoch_zaehler >= HOCH_PROBEN {
                let neu =
                    ((self.aktuell as f64 * REDUKTIONS_FAKTOR).round() as u32).max(BITRATE_MINIMUM);
                if neu != self.aktuell {
                    debug!(von = self.aktuell, nach = neu, verlust = verlust_prozent,
                        "Bitrate reduziert");
                    self.aktuell = neu;
                    return Some(neu);
                }
            }
            None
        } else if verlust_prozent < VERLUST_NIEDRIG_PROZENT {
            self.hoch_zaehler = 0;
            self.niedrig_zaehler += 1;
            if self.niedrig_zaehler >= NIEDRIG_PROBEN {
                self.niedrig_zaehler = 0;
                let neu =
                    ((self.aktuell as f64 * ERHOEHUNGS_FAKTOR).round() as u32).min(self.ziel);
                if neu != self.aktuell {
                    debug!(von = self.aktuell, nach = neu, "Bitrate erhoeht");
                    self.aktuell = neu;
                    return Some(neu);
                }
            }
            None
        } else {
            // Mittelband: stabil, beide Zaehler zurueck
            self.hoch_zaehler = 0;
            self.niedrig_zaehler = 0;
            None
        }
    }
}
