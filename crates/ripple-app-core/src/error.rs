// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Handler error type. Handlers never recover locally; every error travels
//! to the dispatch boundary and is rendered there.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use ripple_page::PageError;
use thiserror::Error;

/// Result returned by handlers.
pub type HandlerResult<T = ()> = Result<T, HandlerError>;

/// Anything a handler can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Page bookkeeping failed.
    #[error(transparent)]
    Page(#[from] PageError),
    /// A handler expected a card that is not on the page.
    #[error("missing card: {0}")]
    MissingCard(String),
    /// A trigger carried a value of the wrong shape.
    #[error("invalid argument {name}: {reason}")]
    InvalidArgument {
        /// Trigger name.
        name: String,
        /// What was wrong.
        reason: String,
    },
    /// The handler panicked.
    #[error("handler panicked: {message}")]
    Panic {
        /// Panic payload message.
        message: String,
        /// Backtrace taken at the panic site, when the panic happened inside
        /// [`contain`].
        backtrace: Option<String>,
    },
    /// App-specific failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    /// Stable type label shown in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerError::Page(_) => "PageError",
            HandlerError::MissingCard(_) => "MissingCard",
            HandlerError::InvalidArgument { .. } => "InvalidArgument",
            HandlerError::Panic { .. } => "Panic",
            HandlerError::Other(_) => "Error",
        }
    }

    /// Convert a `catch_unwind` payload, picking up the panic-site backtrace
    /// recorded on this thread if there is one.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        HandlerError::Panic {
            message,
            backtrace: PANIC_TRACE.with(RefCell::take),
        }
    }

    /// Shorthand for a bad trigger value.
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        HandlerError::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

thread_local! {
    static CONTAINING: Cell<bool> = const { Cell::new(false) };
    static PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Chain a panic hook that records the panic-site backtrace while the
/// panicking thread is inside [`contain`]. Other panics pass straight through.
fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CONTAINING.with(Cell::get) {
                let trace = Backtrace::force_capture().to_string();
                PANIC_TRACE.with(|slot| slot.replace(Some(trace)));
            }
            previous(info);
        }));
    });
}

/// Run `f`, turning a panic into [`HandlerError::Panic`] with the backtrace of
/// the panic site.
pub fn contain<T>(f: impl FnOnce() -> HandlerResult<T>) -> HandlerResult<T> {
    install_panic_hook();
    let outer = CONTAINING.with(|c| c.replace(true));
    PANIC_TRACE.with(|slot| slot.replace(None));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CONTAINING.with(|c| c.set(outer));
    result.unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)))
}
