// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Theme Switch: a header toggle flips the page between dark and light mode.

pub mod cards;

use ripple_app_core::{
    handlers, App, ClientState, Context, EventKey, EventTable, Handler, HandlerError,
    HandlerResult, RequestArgs, StateScope,
};
use ripple_page::{Item, Value};
use tracing::info;

use crate::chrome;

/// Per-client record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeClient {
    /// Dark mode on.
    pub theme_dark: bool,
}

impl Default for ThemeClient {
    fn default() -> Self {
        Self { theme_dark: true }
    }
}

impl StateScope for ThemeClient {
    fn snapshot(&self) -> Vec<(String, String)> {
        vec![(
            chrome::THEME_TOGGLE.to_string(),
            Value::Bool(self.theme_dark).to_string(),
        )]
    }
}

/// Named events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeEvent {
    /// Crash card "Reload".
    Restart,
    /// Crash card "Report".
    Report,
}

impl EventKey for ThemeEvent {
    fn name(self) -> &'static str {
        match self {
            ThemeEvent::Restart => "restart",
            ThemeEvent::Report => "report",
        }
    }
}

/// The Theme Switch app.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeSwitch;

impl App for ThemeSwitch {
    type Client = ThemeClient;
    type Event = ThemeEvent;

    fn name(&self) -> &str {
        "Theme Switch"
    }

    fn init_client(&self, cx: &mut Context<'_, Self>) -> HandlerResult {
        // The default page is dark; keep the record in step with it.
        cx.client.fields = ThemeClient::default();
        cx.page.put("meta", cards::meta());
        cx.page.put("header", cards::header());
        cx.page.put("home", cards::home());
        cx.page.put("footer", chrome::footer());
        cx.page.put("dummy", chrome::dummy());
        Ok(())
    }

    fn targeted_update(
        &self,
        client: &ClientState<ThemeClient>,
        args: &RequestArgs,
    ) -> Option<(&'static str, Handler<Self>)> {
        chrome::theme_change(args, client.fields.theme_dark)
            .map(|_| (chrome::THEME_TOGGLE, update_theme as Handler<Self>))
    }

    fn events(&self) -> EventTable<Self> {
        EventTable::new()
            .on(ThemeEvent::Restart, handlers::restart)
            .on(ThemeEvent::Report, handlers::report)
    }

    fn droppable_cards(&self) -> &[&'static str] {
        &cards::DROPPABLE_CARDS
    }
}

fn update_theme(_app: &ThemeSwitch, cx: &mut Context<'_, ThemeSwitch>) -> HandlerResult {
    cx.client.fields.theme_dark = chrome::theme_flag(cx.args)?;
    if cx.client.fields.theme_dark {
        info!("Updating theme to dark mode");
    } else {
        info!("Updating theme to light mode");
    }
    render_theme(cx)
}

fn render_theme(cx: &mut Context<'_, ThemeSwitch>) -> HandlerResult {
    let dark = cx.client.fields.theme_dark;
    chrome::apply_theme(cx.page, dark)?;
    let home = cx
        .page
        .get_mut("home")
        .and_then(|c| c.items_mut())
        .and_then(|items| items.first_mut())
        .ok_or_else(|| HandlerError::MissingCard("home".into()))?;
    *home = Item::text(if dark {
        cards::DARK_TEXT
    } else {
        cards::LIGHT_TEXT
    });
    Ok(())
}
