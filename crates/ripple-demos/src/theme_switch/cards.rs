// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cards of the Theme Switch app.

use ripple_page::{FormCard, HeaderCard, Item, Layout, MetaCard, Zone};

use crate::chrome::{self, DARK_ICON_COLOR, DARK_THEME};

/// Home card text in dark mode.
pub const DARK_TEXT: &str = "This is dark mode.";
/// Home card text in light mode.
pub const LIGHT_TEXT: &str = "This is light mode.";

/// Cards torn down before the crash card is shown.
pub const DROPPABLE_CARDS: [&str; 2] = ["home", "dummy"];

/// Page metadata.
pub fn meta() -> MetaCard {
    MetaCard {
        title: "WaveTon".into(),
        theme: DARK_THEME.into(),
        layouts: vec![Layout {
            breakpoint: "xs".into(),
            zones: vec![
                Zone::new("header"),
                Zone::new("main").size("calc(100vh - 130px)"),
                Zone::new("footer"),
            ],
        }],
        dialog: None,
        redirect: None,
    }
}

/// Header with the theme toggle.
pub fn header() -> HeaderCard {
    HeaderCard {
        zone: "header".into(),
        title: "Theme Switch".into(),
        subtitle: "Toggle between dark and light mode".into(),
        icon: "ClearNight".into(),
        icon_color: DARK_ICON_COLOR.into(),
        items: vec![chrome::theme_toggle(true)],
    }
}

/// Main content; item 0 names the active mode.
pub fn home() -> FormCard {
    FormCard::new("main", vec![Item::text(DARK_TEXT)])
}
