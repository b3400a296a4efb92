// Session store: the single source of truth for pipeline UI state.
// Mirrors every change to durable storage and applies changes written by other tabs.

use tracing::{debug, warn};

use crate::state::{
    BusinessRule, DashboardTab, DatasetRef, PipelineData, PipelineStage, PipelineStatus,
    SessionState, SessionUpdate, StageResult,
};
use crate::storage::{ChangeFeed, Storage, StorageEvent, load_json, remove_entry};

/// Storage key the session state is persisted under.
pub const SESSION_KEY: &str = "pipeline_session";

/// Handle returned by [`SessionStore::watch`] and [`SessionStore::subscribe`].
pub type ListenerId = u64;

type Listener = Box<dyn FnMut(&SessionState)>;

/// Pipeline session state, persisted and synchronized across tabs.
///
/// All mutation goes through [`set`](Self::set) or the named setters built
/// on it. Persistence is best-effort: storage failures are logged and the
/// in-memory state stays authoritative.
pub struct SessionStore<S: Storage> {
    storage: S,
    key: String,
    state: SessionState,
    /// Serialization of `state`; remote values equal to it are no-ops.
    serialized: String,
    feed: Option<Box<dyn ChangeFeed>>,
    listeners: Vec<(ListenerId, Listener)>,
    remote_handlers: Vec<(ListenerId, Listener)>,
    next_id: ListenerId,
}

impl<S: Storage> SessionStore<S> {
    /// Open the store under the default key, restoring any persisted state.
    pub fn open(storage: S) -> Self {
        Self::with_key(storage, SESSION_KEY)
    }

    /// Open the store under a custom key.
    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let state: SessionState = load_json(&storage, &key).unwrap_or_default();
        let serialized = serialize(&state);
        debug!(key = %key, status = state.pipeline_status.display(), "opened session store");

        Self {
            storage,
            key,
            state,
            serialized,
            feed: None,
            listeners: Vec::new(),
            remote_handlers: Vec::new(),
            next_id: 0,
        }
    }

    /// Attach the feed of changes made by other tabs.
    pub fn with_feed(mut self, feed: impl ChangeFeed + 'static) -> Self {
        self.feed = Some(Box::new(feed));
        self
    }

    /// Current state snapshot.
    pub fn get(&self) -> &SessionState {
        &self.state
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Shallow-merge `update` into the state, persist it, and notify watchers.
    pub fn set(&mut self, update: SessionUpdate) {
        update.apply_to(&mut self.state);
        self.serialized = serialize(&self.state);

        if let Err(err) = self.storage.set_item(&self.key, &self.serialized) {
            warn!(key = %self.key, error = %err, "failed to persist session state");
        }

        self.notify_listeners();
    }

    /// Restore the default state and drop the persisted copy.
    pub fn reset(&mut self) {
        self.state = SessionState::default();
        self.serialized = serialize(&self.state);
        remove_entry(&self.storage, &self.key);
        debug!(key = %self.key, "session state reset");

        self.notify_listeners();
    }

    /// Register a listener fired after every change, local or remote.
    pub fn watch(&mut self, listener: impl FnMut(&SessionState) + 'static) -> ListenerId {
        let id = self.allocate_id();
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unwatch(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Register a handler fired when another tab's write replaces the state.
    pub fn subscribe(&mut self, handler: impl FnMut(&SessionState) + 'static) -> ListenerId {
        let id = self.allocate_id();
        self.remote_handlers.push((id, Box::new(handler)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.remote_handlers.len();
        self.remote_handlers
            .retain(|(handler_id, _)| *handler_id != id);
        self.remote_handlers.len() != before
    }

    /// Apply a storage change made by another tab.
    ///
    /// The remote value replaces the whole state. Returns `false` for other
    /// keys, values identical to ours, and values that fail to parse.
    pub fn apply_storage_event(&mut self, event: &StorageEvent) -> bool {
        if self.storage.normalize_key(&event.key) != self.storage.normalize_key(&self.key) {
            return false;
        }

        match &event.new_value {
            Some(raw) => {
                if *raw == self.serialized {
                    return false;
                }
                match serde_json::from_str::<SessionState>(raw) {
                    Ok(remote) => {
                        self.state = remote;
                        self.serialized = raw.clone();
                    }
                    Err(err) => {
                        warn!(key = %self.key, error = %err, "ignoring malformed remote session state");
                        return false;
                    }
                }
            }
            None => {
                // Another tab reset the session
                if self.state == SessionState::default() {
                    return false;
                }
                self.state = SessionState::default();
                self.serialized = serialize(&self.state);
            }
        }

        debug!(key = %self.key, "applied remote session state");
        let state = &self.state;
        for (_, handler) in &mut self.remote_handlers {
            handler(state);
        }
        self.notify_listeners();
        true
    }

    /// Drain the change feed and apply every pending event.
    ///
    /// Returns how many events changed the state.
    pub fn sync_remote(&mut self) -> usize {
        let events = match self.feed.as_mut() {
            Some(feed) => feed.poll(),
            None => return 0,
        };

        events
            .iter()
            .filter(|event| self.apply_storage_event(event))
            .count()
    }

    pub fn set_current_dataset(&mut self, dataset: DatasetRef) {
        self.set(SessionUpdate::new().current_dataset(Some(dataset)));
    }

    pub fn clear_current_dataset(&mut self) {
        self.set(SessionUpdate::new().current_dataset(None));
    }

    pub fn set_pipeline_status(&mut self, status: PipelineStatus) {
        self.set(SessionUpdate::new().pipeline_status(status));
    }

    pub fn set_pipeline_data(&mut self, data: PipelineData) {
        self.set(SessionUpdate::new().pipeline_data(data));
    }

    /// Record the outcome of one stage, keeping the other stages' results.
    pub fn record_stage_result(&mut self, stage: PipelineStage, result: StageResult) {
        let mut data = self.state.pipeline_data.clone();
        data.insert(stage, result);
        self.set_pipeline_data(data);
    }

    pub fn set_active_tab(&mut self, tab: DashboardTab) {
        self.set(SessionUpdate::new().active_tab(tab));
    }

    pub fn set_chat_open(&mut self, open: bool) {
        self.set(SessionUpdate::new().chat_open(open));
    }

    /// Flip the chat panel flag. Returns the new value.
    pub fn toggle_chat(&mut self) -> bool {
        let open = !self.state.is_chat_open;
        self.set_chat_open(open);
        open
    }

    pub fn set_business_rules(&mut self, rules: Vec<BusinessRule>) {
        self.set(SessionUpdate::new().business_rules(rules));
    }

    /// Append a rule. A rule with the same id is replaced in place.
    pub fn add_business_rule(&mut self, rule: BusinessRule) {
        let mut rules = self.state.business_rules.clone();
        match rules.iter_mut().find(|existing| existing.id == rule.id) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
        self.set_business_rules(rules);
    }

    /// Replace the rule with the same id. Returns `false` if there is none.
    pub fn update_business_rule(&mut self, rule: BusinessRule) -> bool {
        if self.state.find_rule(&rule.id).is_none() {
            return false;
        }
        self.add_business_rule(rule);
        true
    }

    /// Flip a rule's enabled flag. Returns the new value, or `None` if missing.
    pub fn toggle_business_rule(&mut self, id: &str) -> Option<bool> {
        let mut rules = self.state.business_rules.clone();
        let rule = rules.iter_mut().find(|rule| rule.id == id)?;
        rule.enabled = !rule.enabled;
        let enabled = rule.enabled;
        self.set_business_rules(rules);
        Some(enabled)
    }

    /// Remove a rule by id. Returns `false` if there is none.
    pub fn remove_business_rule(&mut self, id: &str) -> bool {
        let mut rules = self.state.business_rules.clone();
        let before = rules.len();
        rules.retain(|rule| rule.id != id);
        if rules.len() == before {
            return false;
        }
        self.set_business_rules(rules);
        true
    }

    fn notify_listeners(&mut self) {
        let state = &self.state;
        for (_, listener) in &mut self.listeners {
            listener(state);
        }
    }

    fn allocate_id(&mut self) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn serialize(state: &SessionState) -> String {
    serde_json::to_string(state).unwrap_or_else(|err| {
        warn!(error = %err, "failed to serialize session state");
        String::new()
    })
}
