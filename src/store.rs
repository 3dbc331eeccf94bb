//! Session state: the cached mosque list and its fetch cycles.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::location::{self, LocationOptions, LocationProvider, UserPosition};
use crate::models::{GeoPoint, Mosque};
use crate::source::MosqueSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Identifies one fetch cycle; only the newest cycle may apply its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleToken(u64);

/// In-memory cache of the canonical list for one session.
///
/// A refresh keeps the previous list visible while it is loading and
/// replaces it wholesale on success.
#[derive(Debug)]
pub struct MosqueStore {
    status: FetchStatus,
    generation: u64,
    mosques: Arc<[Mosque]>,
    error: Option<String>,
}

impl Default for MosqueStore {
    fn default() -> Self {
        Self {
            status: FetchStatus::Idle,
            generation: 0,
            mosques: Arc::from(Vec::new()),
            error: None,
        }
    }
}

impl MosqueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn mosques(&self) -> Arc<[Mosque]> {
        Arc::clone(&self.mosques)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new cycle, superseding any cycle still in flight
    pub fn begin_cycle(&mut self) -> CycleToken {
        self.generation += 1;
        self.status = FetchStatus::Loading;
        self.error = None;
        info!("Fetch cycle {} started", self.generation);
        CycleToken(self.generation)
    }

    pub fn is_current(&self, token: CycleToken) -> bool {
        token.0 == self.generation
    }

    /// Apply a cycle's result. Returns `false` and changes nothing when a
    /// newer cycle has started since `token` was issued.
    pub fn complete(&mut self, token: CycleToken, result: anyhow::Result<Vec<Mosque>>) -> bool {
        if !self.is_current(token) {
            debug!(
                "Discarding result of cycle {}, cycle {} is current",
                token.0, self.generation
            );
            return false;
        }

        match result {
            Ok(mosques) => {
                info!("Fetch cycle {} loaded {} mosques", token.0, mosques.len());
                self.mosques = mosques.into();
                self.status = FetchStatus::Success;
                self.error = None;
            }
            Err(e) => {
                warn!("Fetch cycle {} failed: {:#}", token.0, e);
                self.status = FetchStatus::Error;
                self.error = Some(format!("{e:#}"));
            }
        }
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One explorer session: a source, its cached list and the user position.
///
/// Locks are only taken for short synchronous sections, never across an
/// await.
pub struct Explorer<S> {
    source: S,
    store: Mutex<MosqueStore>,
    position: Mutex<Option<UserPosition>>,
    alive: AtomicBool,
}

impl<S: MosqueSource> Explorer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            store: Mutex::new(MosqueStore::new()),
            position: Mutex::new(None),
            alive: AtomicBool::new(true),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Reload from the source. Returns whether this cycle's result was
    /// applied (it is not when a newer refresh started meanwhile).
    pub async fn refresh(&self) -> bool {
        let token = lock(&self.store).begin_cycle();
        debug!("Loading from {}", self.source.describe());

        let result = self.source.load().await;
        lock(&self.store).complete(token, result)
    }

    pub fn status(&self) -> FetchStatus {
        lock(&self.store).status()
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.store).error().map(str::to_string)
    }

    pub fn mosques(&self) -> Arc<[Mosque]> {
        lock(&self.store).mosques()
    }

    /// Query the provider once and keep the result, unless the session was
    /// closed while waiting.
    pub async fn locate<P: LocationProvider>(
        &self,
        provider: &P,
        options: &LocationOptions,
        fallback: GeoPoint,
    ) -> Option<UserPosition> {
        if !self.is_alive() {
            return None;
        }

        let position = location::locate(provider, options, fallback).await;
        if !self.is_alive() {
            debug!("Session closed before the position arrived");
            return None;
        }

        *lock(&self.position) = Some(position.clone());
        Some(position)
    }

    pub fn position(&self) -> Option<UserPosition> {
        lock(&self.position).clone()
    }

    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{FixedLocation, ISTANBUL_CENTER};
    use std::collections::VecDeque;
    use tokio::sync::{mpsc, oneshot};

    fn mosque(id: i64, name: &str) -> Mosque {
        Mosque::new(id, name, GeoPoint::new(41.0 + id as f64 * 0.001, 29.0))
    }

    /// Source whose loads finish only when the test releases them
    struct GatedSource {
        gates: Mutex<VecDeque<oneshot::Receiver<anyhow::Result<Vec<Mosque>>>>>,
        started: mpsc::UnboundedSender<()>,
    }

    impl MosqueSource for GatedSource {
        async fn load(&self) -> anyhow::Result<Vec<Mosque>> {
            let gate = lock(&self.gates).pop_front();
            let _ = self.started.send(());
            match gate {
                Some(gate) => gate.await?,
                None => anyhow::bail!("no gate left"),
            }
        }

        fn describe(&self) -> String {
            "gated".into()
        }
    }

    struct ListSource(Result<Vec<Mosque>, String>);

    impl MosqueSource for ListSource {
        async fn load(&self) -> anyhow::Result<Vec<Mosque>> {
            self.0.clone().map_err(anyhow::Error::msg)
        }

        fn describe(&self) -> String {
            "list".into()
        }
    }

    #[test]
    fn test_store_lifecycle() {
        let mut store = MosqueStore::new();
        assert_eq!(store.status(), FetchStatus::Idle);
        assert!(store.mosques().is_empty());

        let token = store.begin_cycle();
        assert_eq!(store.status(), FetchStatus::Loading);
        assert!(store.complete(token, Ok(vec![mosque(1, "Eyüp Sultan")])));
        assert_eq!(store.status(), FetchStatus::Success);
        assert_eq!(store.mosques().len(), 1);
    }

    #[test]
    fn test_refetch_keeps_previous_list_until_done() {
        let mut store = MosqueStore::new();
        let first = store.begin_cycle();
        store.complete(first, Ok(vec![mosque(1, "Eyüp Sultan")]));

        let second = store.begin_cycle();
        assert_eq!(store.status(), FetchStatus::Loading);
        assert_eq!(store.mosques().len(), 1);

        store.complete(second, Err(anyhow::anyhow!("all endpoints failed")));
        assert_eq!(store.status(), FetchStatus::Error);
        assert_eq!(store.error(), Some("all endpoints failed"));
        // failed refresh leaves the last good list visible
        assert_eq!(store.mosques().len(), 1);
    }

    #[test]
    fn test_superseded_cycle_is_ignored() {
        let mut store = MosqueStore::new();
        let first = store.begin_cycle();
        let second = store.begin_cycle();

        assert!(store.complete(second, Ok(vec![mosque(2, "Ortaköy")])));
        assert!(!store.complete(first, Ok(vec![mosque(1, "Eski")])));
        assert_eq!(store.mosques()[0].id, 2);
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(FetchStatus::Loading.to_string(), "loading");
        assert_eq!(FetchStatus::Error.to_string(), "error");
    }

    #[tokio::test]
    async fn test_concurrent_refresh_applies_only_newest() {
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let explorer = Arc::new(Explorer::new(GatedSource {
            gates: Mutex::new(VecDeque::from([rx1, rx2])),
            started: started_tx,
        }));

        let first = tokio::spawn({
            let explorer = Arc::clone(&explorer);
            async move { explorer.refresh().await }
        });
        started_rx.recv().await.unwrap();

        let second = tokio::spawn({
            let explorer = Arc::clone(&explorer);
            async move { explorer.refresh().await }
        });
        started_rx.recv().await.unwrap();

        tx2.send(Ok(vec![mosque(2, "Yeni")])).unwrap();
        assert!(second.await.unwrap());
        assert_eq!(explorer.status(), FetchStatus::Success);

        tx1.send(Ok(vec![mosque(1, "Eski"), mosque(3, "Eski 2")])).unwrap();
        assert!(!first.await.unwrap());

        let mosques = explorer.mosques();
        assert_eq!(mosques.len(), 1);
        assert_eq!(mosques[0].id, 2);
    }

    #[tokio::test]
    async fn test_refresh_error_surfaces_message() {
        let explorer = Explorer::new(ListSource(Err("static file missing".into())));
        assert!(explorer.refresh().await);
        assert_eq!(explorer.status(), FetchStatus::Error);
        assert_eq!(explorer.error().as_deref(), Some("static file missing"));
    }

    #[tokio::test]
    async fn test_locate_stores_position_while_alive() {
        let explorer = Explorer::new(ListSource(Ok(vec![])));
        let here = GeoPoint::new(41.04, 29.0);

        let position = explorer
            .locate(&FixedLocation(here), &LocationOptions::default(), ISTANBUL_CENTER)
            .await;
        assert_eq!(position.map(|p| p.coords), Some(here));
        assert_eq!(explorer.position().map(|p| p.coords), Some(here));
    }

    #[tokio::test]
    async fn test_closed_session_ignores_location() {
        let explorer = Explorer::new(ListSource(Ok(vec![])));
        explorer.close();

        let position = explorer
            .locate(&FixedLocation(GeoPoint::new(41.04, 29.0)), &LocationOptions::default(), ISTANBUL_CENTER)
            .await;
        assert!(position.is_none());
        assert!(explorer.position().is_none());
    }
}
