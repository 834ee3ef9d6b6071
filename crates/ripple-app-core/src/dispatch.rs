// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The per-interaction dispatch loop.
//!
//! Every interaction runs exactly one handler, chosen in fixed priority order:
//!
//! 1. app-init, while the app scope is uninitialized;
//! 2. client-init, while the client scope is uninitialized;
//! 3. a targeted update, when an argument differs from client state;
//! 4. the first registered named event present in the arguments;
//! 5. the fallback.
//!
//! The whole run sits behind a failure boundary: handler errors and panics
//! are turned into the diagnostic card and never reach the caller.

use std::fmt;
use std::sync::Arc;

use ripple_page::{Page, PageDelta};
use tracing::{debug, error, info, warn};

use crate::error::{HandlerError, HandlerResult};
use crate::handlers;
use crate::report::{self, Diagnostic};
use crate::state::{AppState, ClientState, RequestArgs, Scope, StateScope};

/// Handler signature shared by updates, named events and the fallback.
pub type Handler<A> = fn(&A, &mut Context<'_, A>) -> HandlerResult;

/// Named-event key; apps declare an enum of the events they answer.
pub trait EventKey: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Trigger name (or `source.event` for component events).
    fn name(self) -> &'static str;
}

/// A card application driven by the dispatch loop.
pub trait App: Send + Sync + Sized + 'static {
    /// Typed per-client record.
    type Client: StateScope + Default + fmt::Debug + Send;
    /// Named events the app answers.
    type Event: EventKey;

    /// Human-readable app name (logs, crash reports).
    fn name(&self) -> &str;

    /// Populate the process-wide scope; runs at most once per process.
    fn init_app(&self, _scope: &mut Scope) -> HandlerResult {
        Ok(())
    }

    /// Build the default page for a new (or restarted) client. The page is
    /// empty when this runs.
    fn init_client(&self, cx: &mut Context<'_, Self>) -> HandlerResult;

    /// Handler for an argument that differs from the current client state.
    fn targeted_update(
        &self,
        _client: &ClientState<Self::Client>,
        _args: &RequestArgs,
    ) -> Option<(&'static str, Handler<Self>)> {
        None
    }

    /// Named-event table; built once when the dispatcher is created.
    fn events(&self) -> EventTable<Self>;

    /// Runs when nothing else matched.
    fn fallback(&self, cx: &mut Context<'_, Self>) -> HandlerResult {
        handlers::clear_dummy(self, cx)
    }

    /// Cards removed before the diagnostic card is installed.
    fn droppable_cards(&self) -> &[&'static str];
}

/// What a handler sees: every scope plus the client's page.
pub struct Context<'a, A: App> {
    /// Process-wide scope (read-only).
    pub app: &'a AppState,
    /// This client's scope.
    pub client: &'a mut ClientState<A::Client>,
    /// This interaction's arguments and events.
    pub args: &'a RequestArgs,
    /// This client's page.
    pub page: &'a mut Page,
    redirect: Option<String>,
}

impl<'a, A: App> Context<'a, A> {
    fn new(
        app: &'a AppState,
        client: &'a mut ClientState<A::Client>,
        args: &'a RequestArgs,
        page: &'a mut Page,
    ) -> Self {
        Self {
            app,
            client,
            args,
            page,
            redirect: None,
        }
    }

    /// Ask the client to navigate to `target` after this flush.
    pub fn redirect(&mut self, target: impl Into<String>) {
        self.redirect = Some(target.into());
    }
}

/// Ordered named-event table.
pub struct EventTable<A: App> {
    entries: Vec<(A::Event, Handler<A>)>,
}

impl<A: App> Default for EventTable<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<A: App> EventTable<A> {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `key`. Re-registering a key replaces its
    /// handler and keeps its position.
    pub fn on(mut self, key: A::Event, handler: Handler<A>) -> Self {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            warn!(event = key.name(), "event handler re-registered");
            slot.1 = handler;
        } else {
            self.entries.push((key, handler));
        }
        self
    }

    /// First registered event set in `args`.
    pub fn lookup(&self, args: &RequestArgs) -> Option<(A::Event, Handler<A>)> {
        self.entries
            .iter()
            .find(|(key, _)| args.is_set(key.name()))
            .copied()
    }
}

/// Which branch a dispatch took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// First-time app initialization.
    InitApp,
    /// First-time client initialization.
    InitClient,
    /// Targeted update, named after the argument it reacts to.
    Update(&'static str),
    /// Named event.
    Event(&'static str),
    /// Nothing matched.
    Fallback,
}

/// Result of one dispatch.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Branch taken.
    pub route: Route,
    /// Page deltas to send, in order.
    pub flushes: Vec<PageDelta>,
    /// Navigation signal.
    pub redirect: Option<String>,
    /// Set when the failure boundary fired.
    pub diagnostic: Option<Diagnostic>,
}

impl DispatchOutcome {
    /// Whether the handler failed and the diagnostic card was rendered.
    pub fn is_failure(&self) -> bool {
        self.diagnostic.is_some()
    }
}

/// Per-connection state owned by the connection's dispatch sequence.
pub struct ClientSession<A: App> {
    /// Client scope.
    pub client: ClientState<A::Client>,
    /// What is rendered for this client.
    pub page: Page,
}

impl<A: App> ClientSession<A> {
    /// Fresh, uninitialized client.
    pub fn new() -> Self {
        Self {
            client: ClientState::default(),
            page: Page::new(),
        }
    }
}

impl<A: App> Default for ClientSession<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: App> fmt::Debug for ClientSession<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("client", &self.client)
            .field("page", &self.page)
            .finish()
    }
}

enum Selected<A: App> {
    InitApp,
    InitClient,
    Update(&'static str, Handler<A>),
    Event(&'static str, Handler<A>),
    Fallback,
}

impl<A: App> Selected<A> {
    fn route(&self) -> Route {
        match self {
            Selected::InitApp => Route::InitApp,
            Selected::InitClient => Route::InitClient,
            Selected::Update(name, _) => Route::Update(*name),
            Selected::Event(name, _) => Route::Event(*name),
            Selected::Fallback => Route::Fallback,
        }
    }
}

/// Routes interactions of every client of one app.
pub struct Dispatcher<A: App> {
    app: A,
    state: Arc<AppState>,
    events: EventTable<A>,
}

impl<A: App> Dispatcher<A> {
    /// Dispatcher with a fresh app scope.
    pub fn new(app: A) -> Self {
        Self::with_state(app, Arc::new(AppState::new()))
    }

    /// Dispatcher sharing an existing app scope.
    pub fn with_state(app: A, state: Arc<AppState>) -> Self {
        let events = app.events();
        Self { app, state, events }
    }

    /// The app.
    pub fn app(&self) -> &A {
        &self.app
    }

    /// The shared app scope.
    pub fn app_state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// The named-event table.
    pub fn events(&self) -> &EventTable<A> {
        &self.events
    }

    fn select(&self, client: &ClientState<A::Client>, args: &RequestArgs) -> Selected<A> {
        if !self.state.is_initialized() {
            Selected::InitApp
        } else if !client.initialized {
            Selected::InitClient
        } else if let Some((name, handler)) = self.app.targeted_update(client, args) {
            Selected::Update(name, handler)
        } else if let Some((key, handler)) = self.events.lookup(args) {
            Selected::Event(key.name(), handler)
        } else {
            Selected::Fallback
        }
    }

    fn run(
        &self,
        selected: &Selected<A>,
        cx: &mut Context<'_, A>,
    ) -> HandlerResult<Option<PageDelta>> {
        match selected {
            Selected::InitApp => {
                self.state.initialize_with(|scope| {
                    info!(app = self.app.name(), "Initializing app");
                    self.app.init_app(scope)
                })?;
                return Ok(None);
            }
            Selected::InitClient => {
                info!(app = self.app.name(), "Initializing client");
                cx.page.clear();
                self.app.init_client(cx)?;
                cx.client.initialized = true;
            }
            Selected::Update(_, handler) | Selected::Event(_, handler) => handler(&self.app, cx)?,
            Selected::Fallback => self.app.fallback(cx)?,
        }
        Ok(Some(cx.page.save()?))
    }

    /// Run one interaction for `session`. Never fails: handler errors and
    /// panics are rendered as the diagnostic card.
    pub fn dispatch(&self, session: &mut ClientSession<A>, args: RequestArgs) -> DispatchOutcome {
        let selected = self.select(&session.client, &args);
        let route = selected.route();
        debug!(app = self.app.name(), ?route, "dispatch");

        let (result, redirect) = {
            let mut cx = Context::new(&self.state, &mut session.client, &args, &mut session.page);
            let result = crate::error::contain(|| self.run(&selected, &mut cx));
            (result, cx.redirect)
        };

        match result {
            Ok(flush) => DispatchOutcome {
                route,
                flushes: flush.into_iter().collect(),
                redirect,
                diagnostic: None,
            },
            Err(err) => {
                let diagnostic = self.render_failure(session, &args, route, &err);
                let flushes = match session.page.save() {
                    Ok(delta) => vec![delta],
                    Err(save_err) => {
                        error!(error = %save_err, "failed to flush diagnostic card");
                        Vec::new()
                    }
                };
                DispatchOutcome {
                    route,
                    flushes,
                    redirect: None,
                    diagnostic: Some(diagnostic),
                }
            }
        }
    }

    fn render_failure(
        &self,
        session: &mut ClientSession<A>,
        args: &RequestArgs,
        route: Route,
        err: &HandlerError,
    ) -> Diagnostic {
        error!(app = self.app.name(), ?route, error = %err, "handler failed");
        let diagnostic = Diagnostic::capture(
            err,
            vec![
                ("app".to_string(), self.state.snapshot()),
                ("client".to_string(), session.client.snapshot()),
                ("events".to_string(), args.events_snapshot()),
                ("args".to_string(), args.snapshot()),
            ],
        );
        report::render(
            &mut session.page,
            self.app.droppable_cards(),
            &diagnostic,
            self.app.name(),
        );
        diagnostic
    }
}
