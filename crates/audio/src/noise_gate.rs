//! Noise Gate Zustandsmaschine
//!
//! Reine Zustandsmaschine ohne Timer: die Session fuettert sie im
//! Poll-Intervall (mindestens 20 Hz) mit dem aktuellen Mikrofon-Pegel
//! und einem Zeitstempel. Die Aktion sagt dem Aufrufer was zu tun ist:
//!
//! - Schliessen erst nachdem der Pegel fuer die volle Haltezeit unter
//!   der Schwelle lag (Entprellung gegen kurze Sprechpausen)
//! - Oeffnen sofort beim ersten Poll ueber der Schwelle
//!
//! Das Gate steuert nur den Sende-Mute; es weiss nichts vom Transport.

use std::time::{Duration, Instant};

/// RMS-Schwelle bei Empfindlichkeit 100
pub const GATE_MAX_SCHWELLE: f32 = 0.20;

/// Was der Aufrufer nach einem Poll tun soll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAktion {
    /// Nichts zu tun
    Keine,
    /// Haltezeit abgelaufen: Sendepfad stummschalten
    Schliessen,
    /// Pegel wieder ueber der Schwelle: Sendepfad freigeben
    Oeffnen,
}

/// Zustandsmaschine des lokalen Mikrofon-Gates
pub struct MikrofonGate {
    /// Empfindlichkeit 0–100 (0 = gated nie)
    empfindlichkeit: u8,
    /// Haltezeit unter der Schwelle bevor geschlossen wird
    haltezeit: Duration,
    /// Beginn der aktuellen Unter-Schwelle-Phase
    unter_schwelle_seit: Option<Instant>,
    /// Gate geschlossen (Sendepfad stumm)?
    geschlossen: bool,
}

impl MikrofonGate {
    /// Erstellt ein offenes Gate
    pub fn new(empfindlichkeit: u8, haltezeit: Duration) -> Self {
        Self {
            empfindlichkeit: empfindlichkeit.min(100),
            haltezeit,
            unter_schwelle_seit: None,
            geschlossen: false,
        }
    }

    /// Aktuelle RMS-Schwelle, linear aus der Empfindlichkeit skaliert
    ///
    /// Empfindlichkeit 0 ergibt Schwelle 0 – da der Pegel nie negativ
    /// ist, gated das Gate dann nie.
    pub fn schwelle(&self) -> f32 {
        self.empfindlichkeit as f32 / 100.0 * GATE_MAX_SCHWELLE
    }

    /// Setzt die Empfindlichkeit zur Laufzeit
    pub fn set_empfindlichkeit(&mut self, empfindlichkeit: u8) {
        self.empfindlichkeit = empfindlichkeit.min(100);
    }

    /// Setzt die Haltezeit zur Laufzeit
    pub fn set_haltezeit(&mut self, haltezeit: Duration) {
        self.haltezeit = haltezeit;
    }

    /// Gibt zurueck ob das Gate aktuell geschlossen ist
    pub fn ist_geschlossen(&self) -> bool {
        self.geschlossen
    }

    /// Wertet einen Pegel-Poll aus
    ///
    /// `pegel` ist der RMS-Pegel des lokalen Mikrofons, `jetzt` der
    /// Zeitstempel des Polls (injiziert, damit die Entprellung testbar
    /// bleibt).
    pub fn pegel_verarbeiten(&mut self, pegel: f32, jetzt: Instant) -> GateAktion {
        if pegel >= self.schwelle() {
            self.unter_schwelle_seit = None;
            if self.geschlossen {
                self.geschlossen = false;
                return GateAktion::Oeffnen;
            }
            return GateAktion::Keine;
        }

        if self.geschlossen {
            return GateAktion::Keine;
        }

        match self.unter_schwelle_seit {
            None => {
                self.unter_schwelle_seit = Some(jetzt);
                GateAktion::Keine
            }
            Some(seit) if jetzt.duration_since(seit) >= self.haltezeit => {
                self.geschlossen = true;
                self.unter_schwelle_seit = None;
                GateAktion::Schliessen
            }
            Some(_) => GateAktion::Keine,
        }
    }

    /// Gibt den Sendepfad frei, z.B. wenn das Gate-Feature deaktiviert wird
    ///
    /// Liefert `true` wenn das Gate vorher geschlossen war und der
    /// Aufrufer den Sendepfad entstummen muss.
    pub fn freigeben(&mut self) -> bool {
        self.unter_schwelle_seit = None;
        std::mem::take(&mut self.geschlossen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> MikrofonGate {
        MikrofonGate::new(50, Duration::from_millis(200))
    }

    #[test]
    fn gate_schwelle_linear() {
        assert!((gate().schwelle() - GATE_MAX_SCHWELLE / 2.0).abs() < f32::EPSILON);
        assert!(MikrofonGate::new(0, Duration::from_millis(200)).schwelle() < f32::EPSILON);
        assert!(
            (MikrofonGate::new(100, Duration::from_millis(200)).schwelle() - GATE_MAX_SCHWELLE)
                .abs()
                < f32::EPSILON
        );
    }

    #[test]
    fn gate_schliesst_erst_nach_haltezeit() {
        let mut g = gate();
        let t0 = Instant::now();

        assert_eq!(g.pegel_verarbeiten(0.0, t0), GateAktion::Keine);
        assert_eq!(
            g.pegel_verarbeiten(0.0, t0 + Duration::from_millis(100)),
            GateAktion::Keine,
            "Haltezeit noch nicht abgelaufen"
        );
        assert_eq!(
            g.pegel_verarbeiten(0.0, t0 + Duration::from_millis(200)),
            GateAktion::Schliessen
        );
        assert!(g.ist_geschlossen());
    }

    #[test]
    fn gate_oeffnet_sofort() {
        let mut g = gate();
        let t0 = Instant::now();
        g.pegel_verarbeiten(0.0, t0);
        g.pegel_verarbeiten(0.0, t0 + Duration::from_millis(250));
        assert!(g.ist_geschlossen());

        // Erster Poll ueber der Schwelle oeffnet ohne Entprellung
        assert_eq!(
            g.pegel_verarbeiten(0.15, t0 + Duration::from_millis(300)),
            GateAktion::Oeffnen
        );
        assert!(!g.ist_geschlossen());
    }

    #[test]
    fn gate_kurze_pause_entprellt() {
        let mut g = gate();
        let t0 = Instant::now();

        g.pegel_verarbeiten(0.0, t0);
        // Pegel kommt vor Ablauf der Haltezeit zurueck
        assert_eq!(
            g.pegel_verarbeiten(0.15, t0 + Duration::from_millis(150)),
            GateAktion::Keine
        );
        // Neue Unter-Schwelle-Phase beginnt von vorn
        g.pegel_verarbeiten(0.0, t0 + Duration::from_millis(200));
        assert_eq!(
            g.pegel_verarbeiten(0.0, t0 + Duration::from_millis(350)),
            GateAktion::Keine,
            "Timer muss nach der Unterbrechung neu starten"
        );
        assert_eq!(
            g.pegel_verarbeiten(0.0, t0 + Duration::from_millis(400)),
            GateAktion::Schliessen
        );
    }

    #[test]
    fn gate_empfindlichkeit_null_gated_nie() {
        let mut g = MikrofonGate::new(0, Duration::from_millis(200));
        let t0 = Instant::now();
        for i in 0..20 {
            assert_eq!(
                g.pegel_verarbeiten(0.0, t0 + Duration::from_millis(50 * i)),
                GateAktion::Keine,
                "Bei Schwelle 0 liegt jeder Pegel >= Schwelle"
            );
        }
        assert!(!g.ist_geschlossen());
    }

    #[test]
    fn gate_geschlossen_bleibt_ruhig() {
        let mut g = gate();
        let t0 = Instant::now();
        g.pegel_verarbeiten(0.0, t0);
        g.pegel_verarbeiten(0.0, t0 + Duration::from_millis(250));
        // Weitere Polls unter der Schwelle duerfen nicht erneut Schliessen melden
        assert_eq!(
            g.pegel_verarbeiten(0.0, t0 + Duration::from_millis(500)),
            GateAktion::Keine
        );
    }

    #[test]
    fn gate_freigeben_entstummt() {
        let mut g = gate();
        let t0 = Instant::now();
        g.pegel_verarbeiten(0.0, t0);
        g.pegel_verarbeiten(0.0, t0 + Duration::from_millis(250));
        assert!(g.freigeben(), "Geschlossenes Gate muss Entstummen melden");
        assert!(!g.ist_geschlossen());
        assert!(!g.freigeben(), "Offenes Gate hat nichts freizugeben");
    }
}
