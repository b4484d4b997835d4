//! Screen-Share-Koordinator
//!
//! Buchfuehrung ueber die aktuell publizierenden Video-Quellen. Bei
//! jedem Video-Track-Ereignis berechnet die Session die Quellenliste
//! neu und uebergibt sie hier; der Koordinator diffed gegen den
//! vorherigen Stand (hoechstens eine Meldung pro Sharer und Durchlauf)
//! und pflegt Pin und Theatre-Modus:
//!
//! - Verschwindet der gepinnte Sharer, faellt der Pin weg
//! - Ist nichts gepinnt und es gibt Sharer, wird der erste auto-gepinnt
//! - Wird die Liste leer, erlischt auch der Theatre-Modus

use stimmraum_core::types::UserId;

/// Ein aktuell teilender Teilnehmer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenShareInfo {
    pub user_id: UserId,
    pub anzeige_name: String,
}

/// Ergebnis eines Neuberechnungs-Durchlaufs
#[derive(Debug, Default)]
pub struct ShareDiff {
    /// Sharer die in diesem Durchlauf neu aufgetaucht sind
    pub gestartet: Vec<ScreenShareInfo>,
    /// Sharer die in diesem Durchlauf verschwunden sind
    pub beendet: Vec<ScreenShareInfo>,
}

/// Zustand aller Screen-Shares einer Session
pub struct ScreenShareKoordinator {
    sharer: Vec<ScreenShareInfo>,
    gepinnt: Option<UserId>,
    theatre_modus: bool,
}

impl ScreenShareKoordinator {
    pub fn new() -> Self {
        Self {
            sharer: Vec::new(),
            gepinnt: None,
            theatre_modus: false,
        }
    }

    /// Ersetzt die Sharer-Liste und liefert das Diff zum Vorzustand
    pub fn neu_berechnen(&mut self, quellen: Vec<ScreenShareInfo>) -> ShareDiff {
        // Duplikate pro user_id zusammenfassen (mehrere Tracks eines
        // Teilnehmers sind ein Share)
        let mut neu: Vec<ScreenShareInfo> = Vec::new();
        for q in quellen {
            if !neu.iter().any(|s| s.user_id == q.user_id) {
                neu.push(q);
            }
        }

        let gestartet: Vec<ScreenShareInfo> = neu
            .iter()
            .filter(|s| !self.sharer.iter().any(|alt| alt.user_id == s.user_id))
            .cloned()
            .collect();
        let beendet: Vec<ScreenShareInfo> = self
            .sharer
            .iter()
            .filter(|alt| !neu.iter().any(|s| s.user_id == alt.user_id))
            .cloned()
            .collect();

        self.sharer = neu;

        if let Some(pin) = self.gepinnt {
            if !self.sharer.iter().any(|s| s.user_id == pin) {
                self.gepinnt = None;
            }
        }
        if self.gepinnt.is_none() {
            self.gepinnt = self.sharer.first().map(|s| s.user_id);
        }
        if self.sharer.is_empty() {
            self.theatre_modus = false;
        }

        ShareDiff { gestartet, beendet }
    }

    /// Pinnt einen Sharer; nur moeglich wenn er tatsaechlich teilt
    pub fn pinnen(&mut self, user_id: UserId) -> bool {
        if self.sharer.iter().any(|s| s.user_id == user_id) {
            self.gepinnt = Some(user_id);
            true
        } else {
            false
        }
    }

    pub fn sharer(&self) -> &[ScreenShareInfo] {
        &self.sharer
    }

    pub fn gepinnt(&self) -> Option<UserId> {
        self.gepinnt
    }

    /// Schaltet den Theatre-Modus; ohne Sharer bleibt er aus
    pub fn set_theatre_modus(&mut self, an: bool) {
        self.theatre_modus = an && !self.sharer.is_empty();
    }

    pub fn theatre_modus(&self) -> bool {
        self.theatre_modus
    }
}

impl Default for ScreenShareKoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(user_id: UserId, name: &str) -> ScreenShareInfo {
        ScreenShareInfo {
            user_id,
            anzeige_name: name.into(),
        }
    }

    #[test]
    fn neuer_sharer_wird_gemeldet_und_gepinnt() {
        let mut k = ScreenShareKoordinator::new();
        let alice = UserId::new();
        let diff = k.neu_berechnen(vec![info(alice, "alice")]);
        assert_eq!(diff.gestartet.len(), 1);
        assert!(diff.beendet.is_empty());
        assert_eq!(k.gepinnt(), Some(alice), "Erster Sharer wird auto-gepinnt");
    }

    #[test]
    fn verschwundener_pin_wird_geloescht_und_neu_vergeben() {
        let mut k = ScreenShareKoordinator::new();
        let alice = UserId::new();
        let bob = UserId::new();
        k.neu_berechnen(vec![info(alice, "alice"), info(bob, "bob")]);
        assert_eq!(k.gepinnt(), Some(alice));

        let diff = k.neu_berechnen(vec![info(bob, "bob")]);
        assert_eq!(diff.beendet.len(), 1);
        assert_eq!(diff.beendet[0].user_id, alice);
        assert_eq!(k.gepinnt(), Some(bob), "Pin wandert auf verbleibenden Sharer");
    }

    #[test]
    fn leere_liste_beendet_theatre_modus() {
        let mut k = ScreenShareKoordinator::new();
        let alice = UserId::new();
        k.neu_berechnen(vec![info(alice, "alice")]);
        k.set_theatre_modus(true);
        assert!(k.theatre_modus());

        k.neu_berechnen(vec![]);
        assert!(!k.theatre_modus(), "Ohne Sharer kein Theatre-Modus");
        assert_eq!(k.gepinnt(), None);
    }

    #[test]
    fn unveraenderte_liste_meldet_nichts() {
        let mut k = ScreenShareKoordinator::new();
        let alice = UserId::new();
        k.neu_berechnen(vec![info(alice, "alice")]);
        let diff = k.neu_berechnen(vec![info(alice, "alice")]);
        assert!(diff.gestartet.is_empty());
        assert!(diff.beendet.is_empty());
    }

    #[test]
    fn mehrere_tracks_eines_sharers_eine_meldung() {
        let mut k = ScreenShareKoordinator::new();
        let alice = UserId::new();
        let diff = k.neu_berechnen(vec![info(alice, "alice"), info(alice, "alice")]);
        assert_eq!(diff.gestartet.len(), 1, "Pro Sharer hoechstens eine Meldung");
        assert_eq!(k.sharer().len(), 1);
    }

    #[test]
    fn pinnen_nur_aktive_sharer() {
        let mut k = ScreenShareKoordinator::new();
        let alice = UserId::new();
        let fremd = UserId::new();
        k.neu_berechnen(vec![info(alice, "alice")]);
        assert!(!k.pinnen(fremd), "Nicht-Sharer kann nicht gepinnt werden");
        assert_eq!(k.gepinnt(), Some(alice));
    }

    #[test]
    fn theatre_ohne_sharer_bleibt_aus() {
        let mut k = ScreenShareKoordinator::new();
        k.set_theatre_modus(true);
        assert!(!k.theatre_modus());
    }
}
