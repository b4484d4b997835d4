//! Session-Manager
//!
//! Wurzel der Engine: besitzt die eine Voice-Session, orchestriert
//! Join/Leave, verdrahtet Transport-Ereignisse mit dem Audio-Graphen
//! und betreibt die beiden Poll-Schleifen (Noise Gate, Bitrate).
//!
//! ## Nebenlaeufigkeit
//! Kein klassisches Locking ueber await-Punkte hinweg; Korrektheit
//! beruht auf:
//! - idempotentem Teardown
//! - einem Generations-Zaehler: jede Session traegt die Generation
//!   ihres Joins, verspaetete Callbacks mit fremder Generation sind
//!   No-ops
//! - Single-Writer pro Ressourcenklasse: nur der Manager erzeugt und
//!   zerstoert Sessions, nur der Pipeline-Lebenszyklus erzeugt und
//!   zerstoert Pipelines
//!
//! Die Poll-Schleifen werden beim Teardown synchron per
//! `JoinHandle::abort` gestoppt, nicht bloss geflaggt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use stimmraum_audio::noise_gate::{GateAktion, MikrofonGate};
use stimmraum_audio::pipeline::{TrackPipeline, ABTASTRATE};
use stimmraum_audio::settings::{AnwendungsArt, AudioSettings, SuppressorModell};
use stimmraum_core::error::{EngineFehler, Result};
use stimmraum_core::types::{ChannelId, TrackId, UserId};
use stimmraum_protocol::presence::{PresenceAktion, PresenceNachricht, VoiceStateUpdate};

use crate::collaborators::{KanalRegister, KeybindStore, PresenceGateway, TokenDienst};
use crate::events::{EventBus, SessionEreignis};
use crate::occupancy::OccupancyAggregator;
use crate::screenshare::{ScreenShareInfo, ScreenShareKoordinator};
use crate::session::{SessionPhase, VoiceSession};
use crate::transport::{
    CaptureConstraints, TrackKind, TransportEreignis, TransportFehler, VoiceTransport,
};

/// Standard-Audio-Bitrate ohne Kanal-Override, in bps
pub const STANDARD_BITRATE: u32 = 64_000;

/// Poll-Intervall des Noise Gates (25 Hz)
pub const GATE_POLL_MS: u64 = 40;

/// Proben-Intervall des Bitrate-Reglers
pub const BITRATE_POLL_MS: u64 = 2_000;

/// Abgeleitete Sicht auf einen Teilnehmer
///
/// Wird bei jedem Abruf aus der Live-Liste des Transports plus den
/// lokalen Flags neu berechnet, nie inkrementell gepatcht.
#[derive(Debug, Clone)]
pub struct TeilnehmerZustand {
    pub user_id: UserId,
    pub anzeige_name: String,
    pub spricht: bool,
    pub stumm: bool,
    /// Nur fuer den lokalen Teilnehmer aussagekraeftig
    pub taub: bool,
}

struct PipelineEintrag {
    user_id: UserId,
    pipeline: TrackPipeline,
}

struct ManagerInner {
    lokale_id: UserId,
    lokaler_name: String,
    transport: Arc<dyn VoiceTransport>,
    token_dienst: Arc<dyn TokenDienst>,
    kanal_register: Arc<dyn KanalRegister>,
    keybinds: Arc<dyn KeybindStore>,
    presence: Arc<dyn PresenceGateway>,

    settings: RwLock<AudioSettings>,
    phase: RwLock<SessionPhase>,
    /// Kanal ab Join-Beginn, auch waehrend Verbindet (fuer die
    /// Doppel-Join-Erkennung)
    kanal: RwLock<Option<ChannelId>>,
    fehler: RwLock<Option<String>>,
    session: Mutex<Option<VoiceSession>>,
    generation: AtomicU64,

    /// Track-ID -> Pipeline; alleinige Autoritaet fuer "ist dieser
    /// Track gerade geroutet"
    pipelines: DashMap<TrackId, PipelineEintrag>,
    /// Gespeicherte Per-Teilnehmer-Lautstaerken (ueberleben Deafen)
    lautstaerken: DashMap<UserId, f32>,
    screenshare: Mutex<ScreenShareKoordinator>,
    occupancy: OccupancyAggregator,
    events: EventBus,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

/// Oeffentliche Aktionsflaeche der Voice-Engine
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

impl SessionManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lokale_id: UserId,
        lokaler_name: impl Into<String>,
        transport: Arc<dyn VoiceTransport>,
        token_dienst: Arc<dyn TokenDienst>,
        kanal_register: Arc<dyn KanalRegister>,
        keybinds: Arc<dyn KeybindStore>,
        presence: Arc<dyn PresenceGateway>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                lokale_id,
                lokaler_name: lokaler_name.into(),
                transport,
                token_dienst,
                kanal_register,
                keybinds,
                presence,
                settings: RwLock::new(AudioSettings::default()),
                phase: RwLock::new(SessionPhase::Leerlauf),
                kanal: RwLock::new(None),
                fehler: RwLock::new(None),
                session: Mutex::new(None),
                generation: AtomicU64::new(0),
                pipelines: DashMap::new(),
                lautstaerken: DashMap::new(),
                screenshare: Mutex::new(ScreenShareKoordinator::new()),
                occupancy: OccupancyAggregator::new(lokale_id),
                events: EventBus::new(),
                loops: Mutex::new(Vec::new()),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Lebenszyklus
    // -----------------------------------------------------------------------

    /// Betritt einen Voice-Kanal
    ///
    /// No-op wenn bereits in `kanal` (auch waehrend Verbindet). Ist
    /// eine andere Session aktiv, wird vorher ein vollstaendiges Leave
    /// ausgefuehrt. Fehler beim Token-Abruf oder Connect setzen das
    /// Fehlerfeld und fuehren zurueck nach Leerlauf; es wird nicht
    /// automatisch neu versucht.
    pub async fn join(&self, kanal: ChannelId) -> Result<()> {
        let inner = &self.inner;
        if *inner.kanal.read() == Some(kanal) {
            debug!(%kanal, "Join ignoriert: bereits in diesem Kanal");
            return Ok(());
        }
        if inner.kanal.read().is_some() {
            self.leave().await;
        }

        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *inner.kanal.write() = Some(kanal);
        *inner.fehler.write() = None;
        inner.set_phase(SessionPhase::Verbindet);
        info!(%kanal, "Voice-Join gestartet");

        let token = match inner.token_dienst.voice_token_anfordern(kanal).await {
            Ok(token) => token,
            Err(e) => {
                return Err(
                    inner.verbindung_fehlgeschlagen(EngineFehler::Anmeldedaten(e.to_string()))
                )
            }
        };
        if inner.generation.load(Ordering::SeqCst) != generation {
            debug!("Join waehrend des Token-Abrufs abgebrochen");
            return Ok(());
        }

        if let Err(e) = inner
            .transport
            .connect(&token.transport_url, &token.credential)
            .await
        {
            return Err(
                inner.verbindung_fehlgeschlagen(EngineFehler::TransportVerbindung(e.to_string()))
            );
        }
        if inner.generation.load(Ordering::SeqCst) != generation {
            debug!("Join waehrend des Connects abgebrochen");
            inner.transport.disconnect().await;
            return Ok(());
        }

        // Sofort nach dem Connect abonnieren: eine SFU subscribt
        // bestehende Tracks direkt beim Beitritt, und ein broadcast-
        // Receiver sieht nur Ereignisse nach seinem subscribe. Die
        // Dispatch-Schleife arbeitet den Puffer spaeter ab.
        let ereignisse = inner.transport.ereignisse();

        let ziel_bitrate = inner
            .kanal_register
            .bitrate_override(kanal)
            .await
            .unwrap_or(STANDARD_BITRATE);

        // Mikrofon publizieren; ein Capture-Fehler rollt den Join nicht zurueck
        let constraints = inner.constraints();
        if let Err(e) = inner.transport.set_mic_enabled(true, &constraints).await {
            warn!(fehler = %e, "Mikrofon-Publikation fehlgeschlagen, Session bleibt bestehen");
        }

        inner.suppressor_anbinden().await;

        // Push-to-Talk: verbunden, aber sofort wieder stumm
        let stumm = inner.keybinds.hat_push_to_talk();
        if stumm {
            debug!("Push-to-Talk-Bind vorhanden, Session startet stumm");
            if let Err(e) = inner.transport.set_mic_enabled(false, &constraints).await {
                warn!(fehler = %e, "Initiales Stummschalten fehlgeschlagen");
            }
        }

        if let Err(e) = inner.transport.set_audio_bitrate(ziel_bitrate).await {
            warn!(fehler = %e, "Initiale Bitrate nicht setzbar");
        }

        *inner.session.lock() = Some(VoiceSession::new(kanal, generation, stumm, ziel_bitrate));
        inner.set_phase(SessionPhase::Verbunden);

        if let Err(e) = inner
            .presence
            .senden(PresenceNachricht::VoiceStateUpdate(VoiceStateUpdate {
                channel_id: kanal,
                action: PresenceAktion::Join,
            }))
            .await
        {
            warn!(fehler = %e, "Join-Ankuendigung nicht zustellbar");
        }

        ManagerInner::schleifen_starten(inner, generation, ereignisse);
        info!(%kanal, bitrate = ziel_bitrate, "Voice-Session verbunden");
        Ok(())
    }

    /// Verlaesst die aktuelle Session (idempotent)
    pub async fn leave(&self) {
        let inner = &self.inner;
        if inner.phase() == SessionPhase::Verbindet {
            // In-flight Join abbrechen: Generations-Sprung macht alle
            // haengenden Schritte des Joins zu No-ops
            inner.generation.fetch_add(1, Ordering::SeqCst);
            *inner.kanal.write() = None;
            inner.set_phase(SessionPhase::Leerlauf);
            debug!("Laufender Join abgebrochen");
            return;
        }
        let generation = { inner.session.lock().as_ref().map(|s| s.generation) };
        if let Some(generation) = generation {
            inner.abbauen(generation).await;
        }
    }

    // -----------------------------------------------------------------------
    // Mute / Deafen
    // -----------------------------------------------------------------------

    pub async fn set_muted(&self, stumm: bool) -> Result<()> {
        let inner = &self.inner;
        {
            let mut session = inner.session.lock();
            let s = session.as_mut().ok_or(EngineFehler::KeineSession)?;
            s.stumm = stumm;
        }
        inner.mikrofon_schalten(!stumm).await;
        inner.events.senden(SessionEreignis::TeilnehmerGeaendert);
        Ok(())
    }

    pub async fn toggle_mute(&self) -> Result<bool> {
        let stumm = {
            let session = self.inner.session.lock();
            !session.as_ref().ok_or(EngineFehler::KeineSession)?.stumm
        };
        self.set_muted(stumm).await?;
        Ok(stumm)
    }

    /// Schaltet Deafen um
    ///
    /// Deafen duckt jede Pipeline auf 0 (die gespeicherten
    /// Lautstaerken bleiben erhalten) und erzwingt Mute. Undeafen hebt
    /// immer auch das Mute auf, selbst wenn es unabhaengig gesetzt war.
    /// Rein lokal: was andere hoeren aendert sich nicht.
    pub async fn toggle_deafen(&self) -> Result<bool> {
        let inner = &self.inner;
        let taub = {
            let mut session = inner.session.lock();
            let s = session.as_mut().ok_or(EngineFehler::KeineSession)?;
            s.taub = !s.taub;
            s.stumm = s.taub;
            s.taub
        };
        for mut eintrag in inner.pipelines.iter_mut() {
            eintrag.value_mut().pipeline.set_geduckt(taub);
        }
        inner.mikrofon_schalten(!taub).await;
        inner.events.senden(SessionEreignis::TeilnehmerGeaendert);
        debug!(taub, "Deafen umgeschaltet");
        Ok(taub)
    }

    // -----------------------------------------------------------------------
    // Lautstaerke
    // -----------------------------------------------------------------------

    /// Setzt die gespeicherte Lautstaerke eines Teilnehmers und wendet
    /// sie auf dessen laufende Pipelines an
    pub fn set_lautstaerke(&self, user_id: UserId, lautstaerke: f32) {
        let lautstaerke = lautstaerke.clamp(0.0, 2.0);
        self.inner.lautstaerken.insert(user_id, lautstaerke);
        for mut eintrag in self.inner.pipelines.iter_mut() {
            let e = eintrag.value_mut();
            if e.user_id == user_id {
                e.pipeline.set_lautstaerke(lautstaerke);
            }
        }
    }

    pub fn lautstaerke(&self, user_id: UserId) -> f32 {
        self.inner
            .lautstaerken
            .get(&user_id)
            .map(|v| *v)
            .unwrap_or(1.0)
    }

    // -----------------------------------------------------------------------
    // Einstellungen
    // -----------------------------------------------------------------------

    /// Der eine Update-Einstiegspunkt fuer Audio-Einstellungen
    ///
    /// Klassifiziert die geaenderten Schluessel ueber die Tabelle in
    /// `SettingsSchluessel::anwendungs_art`: Live-Aenderungen gehen
    /// sofort in alle Pipelines, Capture-Aenderungen republishen das
    /// Mikrofon, Feature-Aenderungen binden den Suppressor neu an.
    pub async fn settings_aktualisieren(&self, neu: AudioSettings) -> Result<()> {
        let inner = &self.inner;
        let geaendert = { inner.settings.read().geaenderte_schluessel(&neu) };
        *inner.settings.write() = neu.clone();
        if geaendert.is_empty() {
            return Ok(());
        }

        let mut live = false;
        let mut republish = false;
        let mut feature = false;
        for schluessel in &geaendert {
            match schluessel.anwendungs_art() {
                AnwendungsArt::SofortLive => live = true,
                AnwendungsArt::CaptureNeustart => republish = true,
                AnwendungsArt::FeatureAnbindung => feature = true,
            }
        }
        debug!(
            anzahl = geaendert.len(),
            live, republish, feature, "Audio-Einstellungen aktualisiert"
        );

        if live {
            for mut eintrag in inner.pipelines.iter_mut() {
                eintrag.value_mut().pipeline.settings_anwenden(&neu);
            }
        }

        if inner.phase() != SessionPhase::Verbunden {
            return Ok(());
        }

        if republish {
            // Republish mit neuen Constraints; kurzer Mute-Blip ist akzeptabel
            let stumm = inner
                .session
                .lock()
                .as_ref()
                .map(|s| s.stumm)
                .unwrap_or(true);
            if !stumm {
                inner.mikrofon_schalten(false).await;
                inner.mikrofon_schalten(true).await;
            }
        }
        if feature {
            inner.suppressor_anbinden().await;
        }
        Ok(())
    }

    pub fn settings(&self) -> AudioSettings {
        self.inner.settings.read().clone()
    }

    // -----------------------------------------------------------------------
    // Bitrate
    // -----------------------------------------------------------------------

    /// Kanal-Register meldet einen geaenderten Bitrate-Override
    ///
    /// Betrifft es den verbundenen Kanal, wird das neue Ziel sofort
    /// uebernommen und bei Bedarf direkt auf den Encoder angewendet.
    pub async fn kanal_bitrate_geaendert(&self, kanal: ChannelId, bitrate: u32) {
        let neu = {
            let mut session = self.inner.session.lock();
            match session.as_mut() {
                Some(s) if s.kanal == kanal => s.bitrate.set_ziel(bitrate),
                _ => return,
            }
        };
        if let Some(bitrate) = neu {
            self.inner.bitrate_anwenden(bitrate).await;
        }
    }

    pub fn aktuelle_bitrate(&self) -> Option<u32> {
        self.inner
            .session
            .lock()
            .as_ref()
            .map(|s| s.bitrate.aktuelle_bitrate())
    }

    // -----------------------------------------------------------------------
    // Screen-Share
    // -----------------------------------------------------------------------

    /// Startet oder stoppt das lokale Screen-Share
    ///
    /// Lehnt der Benutzer den Capture-Dialog ab, verpufft das still;
    /// andere Fehler sind nicht fatal und werden nur geloggt.
    pub async fn toggle_screenshare(&self) -> Result<bool> {
        let inner = &self.inner;
        let neu = {
            let session = inner.session.lock();
            !session
                .as_ref()
                .ok_or(EngineFehler::KeineSession)?
                .teilt_bildschirm
        };
        match inner.transport.set_screenshare_enabled(neu).await {
            Ok(()) => {
                if let Some(s) = inner.session.lock().as_mut() {
                    s.teilt_bildschirm = neu;
                }
                info!(aktiv = neu, "Screen-Share umgeschaltet");
                Ok(neu)
            }
            Err(TransportFehler::ZugriffVerweigert(_)) => {
                debug!("Screen-Share-Abfrage vom Benutzer abgebrochen");
                Ok(false)
            }
            Err(e) => {
                warn!(fehler = %e, "Screen-Share fehlgeschlagen");
                Ok(false)
            }
        }
    }

    pub fn share_pinnen(&self, user_id: UserId) -> bool {
        self.inner.screenshare.lock().pinnen(user_id)
    }

    pub fn gepinnter_share(&self) -> Option<UserId> {
        self.inner.screenshare.lock().gepinnt()
    }

    pub fn set_theatre_modus(&self, an: bool) {
        self.inner.screenshare.lock().set_theatre_modus(an);
    }

    pub fn theatre_modus(&self) -> bool {
        self.inner.screenshare.lock().theatre_modus()
    }

    // -----------------------------------------------------------------------
    // Presence / Occupancy
    // -----------------------------------------------------------------------

    /// Verarbeitet eine eingehende Presence-Nachricht des Gateways
    pub fn presence_nachricht(&self, nachricht: PresenceNachricht) {
        match nachricht {
            PresenceNachricht::VoiceState(snapshot) => {
                let verbundener_kanal = if self.inner.phase() == SessionPhase::Verbunden {
                    *self.inner.kanal.read()
                } else {
                    None
                };
                self.inner
                    .occupancy
                    .snapshot_anwenden(snapshot, verbundener_kanal);
            }
            PresenceNachricht::VoiceStateUpdate(_) => {
                // Ausgehender Nachrichtentyp, eingehend ohne Bedeutung
                debug!("Eingehende voice_state_update-Nachricht ignoriert");
            }
        }
    }

    pub fn kanal_belegung(&self, kanal: ChannelId) -> Vec<UserId> {
        self.inner.occupancy.teilnehmer(kanal)
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        self.inner.phase()
    }

    pub fn aktueller_kanal(&self) -> Option<ChannelId> {
        *self.inner.kanal.read()
    }

    pub fn letzter_fehler(&self) -> Option<String> {
        self.inner.fehler.read().clone()
    }

    pub fn ereignisse(&self) -> broadcast::Receiver<SessionEreignis> {
        self.inner.events.abonnieren()
    }

    /// RMS-Pegel der Pipeline eines Tracks, falls geroutet
    pub fn track_pegel(&self, track_id: &TrackId) -> Option<f32> {
        self.inner
            .pipelines
            .get(track_id)
            .map(|e| e.pipeline.pegel())
    }

    /// Anzahl aktuell gerouteter Audio-Tracks
    pub fn aktive_pipelines(&self) -> usize {
        self.inner.pipelines.len()
    }

    /// Abgeleitete Teilnehmer-Sicht (lokal zuerst)
    pub fn teilnehmer_zustaende(&self) -> Vec<TeilnehmerZustand> {
        let inner = &self.inner;
        let lokal = inner
            .session
            .lock()
            .as_ref()
            .map(|s| (s.stumm, s.taub));
        let mut zustaende = Vec::new();
        if let Some((stumm, taub)) = lokal {
            let spricht = !stumm
                && inner.transport.lokaler_pegel() >= inner.settings.read().vad_schwelle;
            zustaende.push(TeilnehmerZustand {
                user_id: inner.lokale_id,
                anzeige_name: inner.lokaler_name.clone(),
                spricht,
                stumm,
                taub,
            });
        }
        for t in inner.transport.teilnehmer() {
            zustaende.push(TeilnehmerZustand {
                user_id: t.user_id,
                anzeige_name: t.anzeige_name,
                spricht: t.spricht,
                stumm: t.stumm,
                taub: false,
            });
        }
        zustaende
    }
}

// ---------------------------------------------------------------------------
// Interna
// ---------------------------------------------------------------------------

impl ManagerInner {
    fn phase(&self) -> SessionPhase {
        *self.phase.read()
    }

    fn set_phase(&self, neu: SessionPhase) {
        let mut phase = self.phase.write();
        if *phase != neu {
            debug!(von = ?*phase, nach = ?neu, "Session-Phase gewechselt");
            *phase = neu;
            drop(phase);
            self.events.senden(SessionEreignis::PhaseGeaendert(neu));
        }
    }

    fn constraints(&self) -> CaptureConstraints {
        CaptureConstraints::from(&*self.settings.read())
    }

    fn verbindung_fehlgeschlagen(&self, fehler: EngineFehler) -> EngineFehler {
        warn!(fehler = %fehler, "Voice-Verbindung fehlgeschlagen");
        *self.fehler.write() = Some(fehler.to_string());
        *self.kanal.write() = None;
        self.set_phase(SessionPhase::Leerlauf);
        self.events.senden(SessionEreignis::VerbindungFehlgeschlagen {
            meldung: fehler.to_string(),
        });
        fehler
    }

    async fn mikrofon_schalten(&self, an: bool) {
        let constraints = self.constraints();
        if let Err(e) = self.transport.set_mic_enabled(an, &constraints).await {
            warn!(fehler = %e, an, "Mikrofon-Umschaltung fehlgeschlagen");
        }
    }

    /// Bindet den konfigurierten Suppressor an; ein Fehlschlag
    /// deaktiviert das Feature statt die Session scheitern zu lassen
    async fn suppressor_anbinden(&self) {
        let (modell, staerke) = {
            let s = self.settings.read();
            (s.suppressor_modell, s.suppressor_staerke)
        };
        if modell == SuppressorModell::Keines {
            return;
        }
        if let Err(e) = self.transport.attach_suppressor(modell, staerke).await {
            warn!(fehler = %e, "Suppressor-Anbindung fehlgeschlagen, Feature deaktiviert");
            self.settings.write().suppressor_modell = SuppressorModell::Keines;
        }
    }

    async fn bitrate_anwenden(&self, bitrate: u32) {
        if let Err(e) = self.transport.set_audio_bitrate(bitrate).await {
            warn!(fehler = %e, bitrate, "Bitrate nicht anwendbar");
            return;
        }
        info!(bitrate, "Audio-Bitrate angepasst");
        self.events.senden(SessionEreignis::BitrateAngepasst(bitrate));
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Baut die Session mit Generation `erwartete_generation` ab
    ///
    /// Reihenfolge: Schleifen stoppen, Pipelines zerstoeren, Transport
    /// trennen, Leave ankuendigen, lokale ID aus der Occupancy.
    async fn abbauen(&self, erwartete_generation: u64) {
        {
            let session = self.session.lock();
            match session.as_ref() {
                Some(s) if s.generation == erwartete_generation => {}
                _ => return,
            }
        }
        // Ab hier sind alle haengenden Callbacks dieser Session No-ops
        self.generation.fetch_add(1, Ordering::SeqCst);

        for handle in self.loops.lock().drain(..) {
            handle.abort();
        }

        let tracks: Vec<TrackId> = self.pipelines.iter().map(|e| e.key().clone()).collect();
        for track in tracks {
            self.pipeline_abbauen(&track);
        }

        self.transport.disconnect().await;

        let kanal = { self.session.lock().take().map(|s| s.kanal) };
        *self.kanal.write() = None;
        self.screenshare.lock().neu_berechnen(Vec::new());
        self.set_phase(SessionPhase::Leerlauf);

        if let Some(kanal) = kanal {
            if let Err(e) = self
                .presence
                .senden(PresenceNachricht::VoiceStateUpdate(VoiceStateUpdate {
                    channel_id: kanal,
                    action: PresenceAktion::Leave,
                }))
                .await
            {
                warn!(fehler = %e, "Leave-Ankuendigung nicht zustellbar");
            }
            // Nicht auf das Presence-Echo warten
            self.occupancy.lokal_entfernen(kanal);
            info!(%kanal, "Voice-Session beendet");
        }
    }

    // -----------------------------------------------------------------------
    // Pipeline-Lebenszyklus
    // -----------------------------------------------------------------------

    fn pipeline_anlegen(&self, track_id: TrackId, user_id: UserId) {
        let settings = self.settings.read().clone();
        let lautstaerke = self
            .lautstaerken
            .get(&user_id)
            .map(|v| *v)
            .unwrap_or(1.0);
        let geduckt = self
            .session
            .lock()
            .as_ref()
            .map(|s| s.taub)
            .unwrap_or(false);
        let pipeline = TrackPipeline::aus_settings(&settings, lautstaerke, geduckt, ABTASTRATE);
        info!(%track_id, %user_id, "Audio-Pipeline angelegt");
        if let Some(alt) = self
            .pipelines
            .insert(track_id, PipelineEintrag { user_id, pipeline })
        {
            warn!("Pipeline fuer bereits gerouteten Track ersetzt");
            alt.pipeline.schliessen();
        }
    }

    fn pipeline_abbauen(&self, track_id: &TrackId) {
        match self.pipelines.remove(track_id) {
            Some((_, eintrag)) => {
                info!(%track_id, "Audio-Pipeline abgebaut");
                eintrag.pipeline.schliessen();
            }
            None => debug!(%track_id, "Unsubscribe fuer unbekannten Track ignoriert"),
        }
    }

    fn shares_neu_berechnen(&self) {
        let quellen: Vec<ScreenShareInfo> = self
            .transport
            .video_quellen()
            .into_iter()
            .map(|q| ScreenShareInfo {
                user_id: q.user_id,
                anzeige_name: q.anzeige_name,
            })
            .collect();
        let diff = self.screenshare.lock().neu_berechnen(quellen);
        for s in diff.gestartet {
            info!(user = %s.user_id, "Screen-Share gestartet");
            self.events.senden(SessionEreignis::ShareGestartet {
                user_id: s.user_id,
                anzeige_name: s.anzeige_name,
            });
        }
        for s in diff.beendet {
            info!(user = %s.user_id, "Screen-Share beendet");
            self.events.senden(SessionEreignis::ShareBeendet {
                user_id: s.user_id,
                anzeige_name: s.anzeige_name,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Ereignis-Dispatch und Poll-Schleifen
    // -----------------------------------------------------------------------

    fn schleifen_starten(
        inner: &Arc<ManagerInner>,
        generation: u64,
        ereignisse: broadcast::Receiver<TransportEreignis>,
    ) {
        let mut loops = inner.loops.lock();
        loops.push(Self::dispatch_schleife(inner, generation, ereignisse));
        loops.push(Self::gate_schleife(inner));
        loops.push(Self::bitrate_schleife(inner));
    }

    /// Eine Dispatch-Task pro Session: konsumiert den Ereignis-Strom
    /// des Transports, mit dem Generations-Guard an genau einer Stelle.
    /// Der Receiver stammt aus dem Join-Pfad, damit kein Ereignis
    /// zwischen Connect und Schleifenstart verloren geht.
    fn dispatch_schleife(
        inner: &Arc<ManagerInner>,
        generation: u64,
        mut rx: broadcast::Receiver<TransportEreignis>,
    ) -> JoinHandle<()> {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ereignis) => {
                        if inner.transport_ereignis(generation, ereignis).await {
                            // Transport-Trennung: Teardown in eigener
                            // Task, da `abbauen` diese Schleife abbricht
                            let inner = Arc::clone(&inner);
                            tokio::spawn(async move {
                                inner.abbauen(generation).await;
                            });
                            break;
                        }
                    }
                    Err(RecvError::Lagged(verpasst)) => {
                        warn!(verpasst, "Transport-Ereignisse verpasst");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Verarbeitet ein Transport-Ereignis; `true` heisst der Transport
    /// hat getrennt und die Session muss abgebaut werden
    async fn transport_ereignis(&self, generation: u64, ereignis: TransportEreignis) -> bool {
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Verspaetetes Transport-Ereignis ignoriert");
            return false;
        }
        match ereignis {
            TransportEreignis::TrackSubscribed {
                track_id,
                user_id,
                kind,
            } => match kind {
                TrackKind::Audio => self.pipeline_anlegen(track_id, user_id),
                TrackKind::Video => self.shares_neu_berechnen(),
            },
            TransportEreignis::TrackUnsubscribed { track_id, kind } => match kind {
                TrackKind::Audio => self.pipeline_abbauen(&track_id),
                TrackKind::Video => self.shares_neu_berechnen(),
            },
            TransportEreignis::ParticipantConnected { user_id } => {
                debug!(%user_id, "Teilnehmer verbunden");
                self.events.senden(SessionEreignis::TeilnehmerGeaendert);
            }
            TransportEreignis::ParticipantDisconnected { user_id } => {
                debug!(%user_id, "Teilnehmer getrennt");
                self.events.senden(SessionEreignis::TeilnehmerGeaendert);
            }
            TransportEreignis::ActiveSpeakersChanged { sprecher } => {
                self.events
                    .senden(SessionEreignis::SprecherGeaendert(sprecher));
            }
            TransportEreignis::Disconnected { grund } => {
                info!(%grund, "Transport hat die Verbindung getrennt");
                return true;
            }
        }
        false
    }

    /// Noise-Gate-Schleife (25 Hz)
    ///
    /// Laeuft nur solange die Session existiert; bei manuellem Mute
    /// oder Deafen haelt das Gate still, der Mute-Pfad besitzt den
    /// Capture-Zugriff.
    fn gate_schleife(inner: &Arc<ManagerInner>) -> JoinHandle<()> {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let (empfindlichkeit, haltezeit) = {
                let s = inner.settings.read();
                (
                    s.gate_empfindlichkeit,
                    Duration::from_millis(s.gate_haltezeit_ms),
                )
            };
            let mut gate = MikrofonGate::new(empfindlichkeit, haltezeit);
            let mut intervall = tokio::time::interval(Duration::from_millis(GATE_POLL_MS));
            loop {
                intervall.tick().await;

                let (gate_aktiv, empfindlichkeit, haltezeit) = {
                    let s = inner.settings.read();
                    (
                        s.gate_aktiv,
                        s.gate_empfindlichkeit,
                        Duration::from_millis(s.gate_haltezeit_ms),
                    )
                };
                gate.set_empfindlichkeit(empfindlichkeit);
                gate.set_haltezeit(haltezeit);

                let flags = {
                    let session = inner.session.lock();
                    session.as_ref().map(|s| (s.stumm, s.taub))
                };
                let (stumm, taub) = match flags {
                    Some(flags) => flags,
                    None => break,
                };

                if stumm || taub {
                    gate.freigeben();
                    continue;
                }
                if !gate_aktiv {
                    // Feature-Abschaltung loest ein geschlossenes Gate sofort
                    if gate.freigeben() {
                        inner.mikrofon_schalten(true).await;
                    }
                    continue;
                }

                let pegel = inner.transport.lokaler_pegel();
                match gate.pegel_verarbeiten(pegel, Instant::now()) {
                    GateAktion::Schliessen => {
                        debug!("Noise Gate geschlossen");
                        inner.mikrofon_schalten(false).await;
                    }
                    GateAktion::Oeffnen => {
                        debug!("Noise Gate geoeffnet");
                        inner.mikrofon_schalten(true).await;
                    }
                    GateAktion::Keine => {}
                }
            }
        })
    }

    /// Bitrate-Schleife: fuettert den Regler mit Verlust-Proben
    fn bitrate_schleife(inner: &Arc<ManagerInner>) -> JoinHandle<()> {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let mut intervall = tokio::time::interval(Duration::from_millis(BITRATE_POLL_MS));
            loop {
                intervall.tick().await;
                let verlust = inner.transport.paketverlust_prozent();
                let neu = {
                    let mut session = inner.session.lock();
                    match session.as_mut() {
                        Some(s) => s.bitrate.probe(verlust),
                        None => break,
                    }
                };
                if let Some(bitrate) = neu {
                    inner.bitrate_anwenden(bitrate).await;
                }
            }
        })
    }
}
