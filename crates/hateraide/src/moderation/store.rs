use super::{
    ActionLayer, AnalysisPayload, Decision, Moderatable, ModerationAction, StaticFacts,
    fetch_analysis_payload, fetch_applied_actions, resolve_decision,
};
use crate::channel::{ListenerResult, ModerationChannel};
use hateraide_common::error::ClientError;
use hateraide_common::http_client::HttpClient;
use hateraide_common::websocket::WebSocketClient;
use smol_str::SmolStr;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use url::Url;

/// Subscription id the store registers its live listener under
pub const LIVE_SUBSCRIPTION: &str = "moderation-store";

#[derive(Debug, Default)]
struct Layers {
    live: ActionLayer,
    preloaded: ActionLayer,
    items: HashMap<SmolStr, StaticFacts>,
    important: HashSet<SmolStr>,
}

/// Outcome of [`ModerationStore::activate`]
///
/// Fetch failures are not fatal: the store keeps whatever it had and the
/// live channel still runs.
#[derive(Debug)]
pub struct ActivationReport {
    /// Number of preloaded actions built from the analysis payload
    pub preloaded: Result<usize, ClientError>,
    /// Number of applied actions merged into the live layer
    pub snapshot: Result<usize, ClientError>,
}

impl ActivationReport {
    /// Both fetches succeeded
    pub fn is_complete(&self) -> bool {
        self.preloaded.is_ok() && self.snapshot.is_ok()
    }
}

/// Holds the live and preloaded layers and answers per-item queries
///
/// The layers sit behind a lock shared with the channel listener, so updates
/// pushed by the backend land here without any work from the caller.
/// Precedence between layers is left to [`resolve_decision`].
pub struct ModerationStore<C> {
    client: C,
    analysis_url: Url,
    snapshot_url: Url,
    layers: Arc<RwLock<Layers>>,
}

impl<C> std::fmt::Debug for ModerationStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let layers = self.read();
        f.debug_struct("ModerationStore")
            .field("analysis_url", &self.analysis_url.as_str())
            .field("snapshot_url", &self.snapshot_url.as_str())
            .field("live", &layers.live.len())
            .field("preloaded", &layers.preloaded.len())
            .field("items", &layers.items.len())
            .finish()
    }
}

impl<C> ModerationStore<C> {
    /// Create an empty store that loads from the given backend endpoints
    pub fn new(client: C, analysis_url: Url, snapshot_url: Url) -> Self {
        Self {
            client,
            analysis_url,
            snapshot_url,
            layers: Arc::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Layers> {
        self.layers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Layers> {
        write_layers(&self.layers)
    }

    /// Record the static facts of content items
    ///
    /// Registering an id again replaces its facts.
    pub fn register_content<'a, T, I>(&self, items: I)
    where
        T: Moderatable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut layers = self.write();
        let before = layers.items.len();
        for item in items {
            let facts = StaticFacts::of(item);
            layers.items.insert(facts.id.clone(), facts);
        }
        tracing::debug!(added = layers.items.len() - before, "content registered");
    }

    /// Apply one live action, replacing any earlier action for the same item
    pub fn apply_live(&self, action: ModerationAction) {
        apply_live(&self.layers, action);
    }

    /// Replace the preloaded layer from an analysis payload
    ///
    /// Returns the number of preloaded actions.
    pub fn load_preloaded(&self, payload: &AnalysisPayload) -> usize {
        let preloaded = payload.preloaded_actions();
        let important = payload.important_authors();
        let count = preloaded.len();
        let mut layers = self.write();
        layers.preloaded = preloaded;
        layers.important = important;
        count
    }

    /// Merge the backend's applied-action snapshot into the live layer
    ///
    /// Entries replace whatever the live layer holds for the same item.
    pub fn merge_snapshot(&self, snapshot: ActionLayer) -> usize {
        let count = snapshot.len();
        self.write().live.extend(snapshot);
        count
    }

    /// Effective action for an item
    pub fn get(&self, id: &str) -> Option<ModerationAction> {
        self.decision(id).map(|decision| decision.action)
    }

    /// Effective action for an item together with the layer it came from
    ///
    /// Items that were never registered are resolved from the live and
    /// preloaded layers alone.
    pub fn decision(&self, id: &str) -> Option<Decision> {
        let layers = self.read();
        match layers.items.get(id) {
            Some(facts) => resolve_decision(facts, &layers.live, &layers.preloaded),
            None => resolve_decision(id, &layers.live, &layers.preloaded),
        }
    }

    /// Every item the store knows of that ends up moderated
    pub fn decisions(&self) -> BTreeMap<SmolStr, Decision> {
        let layers = self.read();
        let ids: HashSet<&SmolStr> = layers
            .items
            .keys()
            .chain(layers.live.keys())
            .chain(layers.preloaded.keys())
            .collect();

        ids.into_iter()
            .filter_map(|id| {
                let decision = match layers.items.get(id) {
                    Some(facts) => resolve_decision(facts, &layers.live, &layers.preloaded),
                    None => resolve_decision(id, &layers.live, &layers.preloaded),
                }?;
                Some((id.clone(), decision))
            })
            .collect()
    }

    /// Whether the analysis marked the author of this reply as important
    pub fn is_author_important(&self, id: &str) -> bool {
        self.read().important.contains(id)
    }

    /// Number of actions in the live layer
    pub fn live_len(&self) -> usize {
        self.read().live.len()
    }

    /// Stop listening to `channel` and forget every live action
    ///
    /// The preloaded layer and registered content stay.
    pub fn deactivate<W>(&self, channel: &ModerationChannel<W>)
    where
        W: WebSocketClient + Send + Sync + 'static,
    {
        channel.unsubscribe(LIVE_SUBSCRIPTION);
        self.write().live.clear();
        tracing::debug!("moderation store deactivated");
    }
}

impl<C: HttpClient + Sync> ModerationStore<C> {
    /// Start live updates and load the batch data
    ///
    /// Subscribes the live layer to `channel` and connects it, then fetches
    /// the analysis payload and the applied-action snapshot concurrently. A
    /// failed payload fetch leaves the preloaded layer as it was.
    pub async fn activate<W>(&self, channel: &ModerationChannel<W>) -> ActivationReport
    where
        W: WebSocketClient + Send + Sync + 'static,
    {
        let layers = Arc::clone(&self.layers);
        channel.subscribe(LIVE_SUBSCRIPTION, move |action: &ModerationAction| -> ListenerResult {
            apply_live(&layers, action.clone());
            Ok(())
        });
        channel.connect();

        let (payload, snapshot) = tokio::join!(
            fetch_analysis_payload(&self.client, &self.analysis_url),
            fetch_applied_actions(&self.client, &self.snapshot_url),
        );

        let preloaded = payload.map(|payload| self.load_preloaded(&payload));
        match &preloaded {
            Ok(count) => tracing::info!(count, "preloaded moderation loaded"),
            Err(e) => tracing::warn!(error = %e, "analysis payload unavailable, keeping preloaded layer"),
        }

        let snapshot = snapshot.map(|snapshot| self.merge_snapshot(snapshot));
        match &snapshot {
            Ok(count) => tracing::info!(count, "applied moderation merged"),
            Err(e) => tracing::warn!(error = %e, "applied moderation snapshot unavailable"),
        }

        ActivationReport {
            preloaded,
            snapshot,
        }
    }
}

fn write_layers(layers: &RwLock<Layers>) -> RwLockWriteGuard<'_, Layers> {
    layers.write().unwrap_or_else(PoisonError::into_inner)
}

fn apply_live(layers: &RwLock<Layers>, action: ModerationAction) {
    tracing::debug!(item = %action.item_id, action = %action.action_type, "live moderation applied");
    write_layers(layers)
        .live
        .insert(action.item_id.clone(), action);
}
