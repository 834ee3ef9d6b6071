// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cards and theme plumbing shared by every demo.

use ripple_app_core::{HandlerError, HandlerResult, RequestArgs};
use ripple_page::{Card, FooterCard, FormCard, Item, Page, Value};

/// Project link shown in footers.
pub const REPO_URL: &str = "https://github.com/vopani/waveton";
/// Theme used while `theme_dark` is set.
pub const DARK_THEME: &str = "h2o-dark";
/// Theme used otherwise.
pub const LIGHT_THEME: &str = "light";
/// Header icon colour in dark mode.
pub const DARK_ICON_COLOR: &str = "black";
/// Header icon colour in light mode.
pub const LIGHT_ICON_COLOR: &str = "#FEC924";
/// Trigger name of the header theme toggle.
pub const THEME_TOGGLE: &str = "theme_dark";

/// Header toggle bound to [`THEME_TOGGLE`].
pub fn theme_toggle(dark: bool) -> Item {
    Item::toggle(THEME_TOGGLE, "Dark Mode", dark)
}

/// Footer linking to the project.
pub fn footer() -> FooterCard {
    FooterCard {
        zone: "footer".into(),
        caption: format!(
            "Learn more about <a href=\"{REPO_URL}\" target=\"_blank\"> WaveTon: 💯 Wave Applications</a>"
        ),
    }
}

/// Empty card the fallback clears.
pub fn dummy() -> FormCard {
    FormCard::new("", Vec::new())
}

/// Requested theme flag when it differs from `current`.
pub fn theme_change(args: &RequestArgs, current: bool) -> Option<&Value> {
    args.get(THEME_TOGGLE)
        .filter(|v| v.as_bool() != Some(current))
}

/// Parse the theme toggle value.
pub fn theme_flag(args: &RequestArgs) -> HandlerResult<bool> {
    args.get(THEME_TOGGLE)
        .and_then(Value::as_bool)
        .ok_or_else(|| HandlerError::invalid_argument(THEME_TOGGLE, "expected a boolean"))
}

/// Restyle the meta and header cards for `dark`.
pub fn apply_theme(page: &mut Page, dark: bool) -> HandlerResult {
    let (theme, icon_color) = if dark {
        (DARK_THEME, DARK_ICON_COLOR)
    } else {
        (LIGHT_THEME, LIGHT_ICON_COLOR)
    };

    let meta = page
        .get_mut("meta")
        .and_then(Card::as_meta_mut)
        .ok_or_else(|| HandlerError::MissingCard("meta".into()))?;
    meta.theme = theme.to_string();

    let header = page
        .get_mut("header")
        .and_then(Card::as_header_mut)
        .ok_or_else(|| HandlerError::MissingCard("header".into()))?;
    header.icon_color = icon_color.to_string();
    for item in &mut header.items {
        if let Item::Toggle { name, value, .. } = item {
            if name == THEME_TOGGLE {
                *value = dark;
            }
        }
    }
    Ok(())
}
