// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for Ripple apps: state scopes, the dispatch
//! loop with its failure boundary, crash reports, and config storage.
//! Keeps hosts thin and apps free of transport details.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod report;
pub mod session;
pub mod state;

pub use dispatch::{
    App, ClientSession, Context, DispatchOutcome, Dispatcher, EventKey, EventTable, Handler, Route,
};
pub use error::{HandlerError, HandlerResult};
pub use report::Diagnostic;
pub use session::{Session, SessionFactory};
pub use state::{AppState, ClientState, RequestArgs, Scope, StateScope};
