// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! State scopes: process-wide app scope, per-connection client scope and the
//! per-interaction argument/event scopes. Every scope can snapshot itself as
//! flat key/value strings for diagnostics.

use std::collections::BTreeMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use ripple_page::Value;

use crate::error::HandlerResult;

/// Dynamic key → value bag.
pub type Scope = BTreeMap<String, Value>;

/// Key of the app-scope initialization flag.
pub const APP_INITIALIZED: &str = "app_initialized";
/// Key of the client-scope initialization flag.
pub const CLIENT_INITIALIZED: &str = "client_initialized";

/// Flat key/value view of a state scope, used by the diagnostic dump.
pub trait StateScope {
    /// Every key of the scope with its rendered value, in a stable order.
    fn snapshot(&self) -> Vec<(String, String)>;
}

impl StateScope for Scope {
    fn snapshot(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.to_string())).collect()
    }
}

impl StateScope for () {
    fn snapshot(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Process-wide scope shared by every client of one app.
///
/// Written exactly once by the app-init handler and read-only afterwards.
#[derive(Debug, Default)]
pub struct AppState {
    scope: OnceLock<Scope>,
    init: Mutex<()>,
}

impl AppState {
    /// Uninitialized app state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether app-init has completed.
    pub fn is_initialized(&self) -> bool {
        self.scope.get().is_some()
    }

    /// The app scope, once initialized.
    pub fn scope(&self) -> Option<&Scope> {
        self.scope.get()
    }

    /// Look up an app-scope value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.scope.get().and_then(|s| s.get(key))
    }

    /// Run `init` at most once per process. Returns `Ok(true)` when this call
    /// performed the initialization and `Ok(false)` when it had already run.
    /// A failed `init` leaves the state uninitialized.
    pub fn initialize_with<F>(&self, init: F) -> HandlerResult<bool>
    where
        F: FnOnce(&mut Scope) -> HandlerResult,
    {
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if self.scope.get().is_some() {
            return Ok(false);
        }
        let mut scope = Scope::new();
        init(&mut scope)?;
        scope.insert(APP_INITIALIZED.to_string(), Value::Bool(true));
        // Only this guarded path ever sets the cell.
        let _ = self.scope.set(scope);
        Ok(true)
    }
}

impl StateScope for AppState {
    fn snapshot(&self) -> Vec<(String, String)> {
        match self.scope.get() {
            Some(scope) => scope.snapshot(),
            None => vec![(APP_INITIALIZED.to_string(), Value::Bool(false).to_string())],
        }
    }
}

/// Per-connection scope: the initialization flag plus the app's typed record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientState<C> {
    /// Set by client-init, cleared by restart.
    pub initialized: bool,
    /// App-specific fields.
    pub fields: C,
}

impl<C: StateScope> StateScope for ClientState<C> {
    fn snapshot(&self) -> Vec<(String, String)> {
        let mut out = vec![(
            CLIENT_INITIALIZED.to_string(),
            Value::Bool(self.initialized).to_string(),
        )];
        out.extend(self.fields.snapshot());
        out
    }
}

/// Arguments and component events of one interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestArgs {
    args: BTreeMap<String, Value>,
    events: BTreeMap<String, BTreeMap<String, Value>>,
}

impl RequestArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded wire maps.
    pub fn from_parts(
        args: BTreeMap<String, Value>,
        events: BTreeMap<String, BTreeMap<String, Value>>,
    ) -> Self {
        Self { args, events }
    }

    /// Builder: add a trigger value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Builder: add a component event.
    pub fn with_event(
        mut self,
        source: impl Into<String>,
        event: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.events
            .entry(source.into())
            .or_default()
            .insert(event.into(), value.into());
        self
    }

    /// Trigger value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Component event value (`source.event`).
    pub fn event(&self, source: &str, event: &str) -> Option<&Value> {
        self.events.get(source).and_then(|e| e.get(event))
    }

    /// Whether `name` (a trigger, or `source.event` for component events)
    /// is present with a truthy value.
    pub fn is_set(&self, name: &str) -> bool {
        let value = match name.split_once('.') {
            Some((source, event)) => self.event(source, event),
            None => self.get(name),
        };
        value.is_some_and(Value::is_truthy)
    }

    /// All trigger values.
    pub fn args(&self) -> &BTreeMap<String, Value> {
        &self.args
    }

    /// Event scope flattened as `source.event` keys.
    pub fn events_snapshot(&self) -> Vec<(String, String)> {
        self.events
            .iter()
            .flat_map(|(source, events)| {
                events
                    .iter()
                    .map(move |(event, v)| (format!("{source}.{event}"), v.to_string()))
            })
            .collect()
    }
}

impl StateScope for RequestArgs {
    fn snapshot(&self) -> Vec<(String, String)> {
        self.args.snapshot()
    }
}
