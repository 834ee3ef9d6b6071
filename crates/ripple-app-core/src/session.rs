// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Object-safe session seam so a host can serve any app without knowing its
//! client record type.

use std::sync::Arc;

use ripple_page::Page;

use crate::dispatch::{App, ClientSession, DispatchOutcome, Dispatcher};
use crate::state::RequestArgs;

/// One connected client of some app.
pub trait Session: Send {
    /// Dispatch one interaction.
    fn interact(&mut self, args: RequestArgs) -> DispatchOutcome;
    /// What is currently rendered for this client.
    fn page(&self) -> &Page;
}

/// Opens sessions for new connections.
pub trait SessionFactory: Send + Sync {
    /// Name of the served app.
    fn app_name(&self) -> &str;
    /// Fresh, uninitialized session.
    fn open(&self) -> Box<dyn Session>;
}

struct BoundSession<A: App> {
    dispatcher: Arc<Dispatcher<A>>,
    state: ClientSession<A>,
}

impl<A: App> Session for BoundSession<A> {
    fn interact(&mut self, args: RequestArgs) -> DispatchOutcome {
        self.dispatcher.dispatch(&mut self.state, args)
    }

    fn page(&self) -> &Page {
        &self.state.page
    }
}

impl<A: App> SessionFactory for Arc<Dispatcher<A>> {
    fn app_name(&self) -> &str {
        self.app().name()
    }

    fn open(&self) -> Box<dyn Session> {
        Box::new(BoundSession {
            dispatcher: Arc::clone(self),
            state: ClientSession::new(),
        })
    }
}
