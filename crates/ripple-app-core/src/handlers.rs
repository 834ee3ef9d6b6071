// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Handlers every app registers: restart, report, and the dummy fallback.

use ripple_page::Card;
use tracing::info;

use crate::dispatch::{App, Context};
use crate::error::HandlerResult;
use crate::report;

/// Navigation target issued by `restart`.
pub const HOME_ROUTE: &str = "#home";
/// Card cleared by the fallback.
pub const DUMMY_CARD: &str = "dummy";

/// Send the client home and re-run client-init on its next interaction.
/// Other client fields are kept.
pub fn restart<A: App>(_app: &A, cx: &mut Context<'_, A>) -> HandlerResult {
    info!("Restarting app");
    if let Some(meta) = cx.page.get_mut("meta").and_then(Card::as_meta_mut) {
        meta.redirect = Some(HOME_ROUTE.to_string());
    }
    cx.redirect(HOME_ROUTE);
    cx.client.initialized = false;
    Ok(())
}

/// Reveal the diagnostic card's detail section.
pub fn report<A: App>(_app: &A, cx: &mut Context<'_, A>) -> HandlerResult {
    if !report::reveal_details(cx.page) {
        info!("report requested without a diagnostic card");
    }
    Ok(())
}

/// Empty the dummy card; used when no other branch matched.
pub fn clear_dummy<A: App>(_app: &A, cx: &mut Context<'_, A>) -> HandlerResult {
    if let Some(items) = cx.page.get_mut(DUMMY_CARD).and_then(Card::items_mut) {
        items.clear();
    }
    Ok(())
}
