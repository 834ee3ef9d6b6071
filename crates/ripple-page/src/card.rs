// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Declarative card and item structures. Rendering is the client's job; the
//! server only describes what each named card contains.

use serde::{Deserialize, Serialize};

/// A layout zone; cards are placed into zones by their `zone` name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Zone {
    /// Zone name referenced by cards.
    pub name: String,
    /// Optional CSS size (e.g. `25%`, `calc(100vh - 130px)`).
    pub size: Option<String>,
    /// Optional flex direction (`row` / `column`).
    pub direction: Option<String>,
    /// Nested zones.
    pub zones: Vec<Zone>,
}

impl Zone {
    /// Plain zone with no size or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            direction: None,
            zones: Vec::new(),
        }
    }

    /// Set the zone size.
    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Set the flex direction.
    pub fn direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    /// Set nested zones.
    pub fn zones(mut self, zones: Vec<Zone>) -> Self {
        self.zones = zones;
        self
    }
}

/// Responsive layout applied from a breakpoint upward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Layout {
    /// Minimum viewport breakpoint (`xs`, `m`, …).
    pub breakpoint: String,
    /// Top-level zones.
    pub zones: Vec<Zone>,
}

/// Modal dialog attached to the meta card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dialog {
    /// Dialog name; used as the event source for `events`.
    pub name: String,
    /// Title line.
    pub title: String,
    /// Dialog body.
    pub items: Vec<Item>,
    /// Whether a close button is shown.
    pub closable: bool,
    /// Component events the dialog reports (e.g. `dismissed`).
    pub events: Vec<String>,
}

/// One tab of a tab strip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tab {
    /// Value sent when selected.
    pub name: String,
    /// Display label.
    pub label: String,
}

/// One stat of a stats strip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stat {
    /// Label.
    pub label: String,
    /// Headline value.
    pub value: String,
    /// Caption under the value.
    pub caption: String,
    /// Icon name.
    pub icon: String,
    /// Optional icon colour.
    pub icon_color: Option<String>,
}

/// Form items. Every item carries a `visible` flag so handlers can reveal
/// or hide content without rebuilding the card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Item {
    /// Body text (markdown).
    Text {
        /// Markdown content.
        content: String,
        /// Visibility.
        visible: bool,
    },
    /// Large body text (markdown).
    TextL {
        /// Markdown content.
        content: String,
        /// Visibility.
        visible: bool,
    },
    /// Horizontal rule with optional label.
    Separator {
        /// Optional label.
        label: Option<String>,
        /// Visibility.
        visible: bool,
    },
    /// Boolean switch.
    Toggle {
        /// Argument name.
        name: String,
        /// Display label.
        label: String,
        /// Current value.
        value: bool,
        /// Submit immediately on change.
        trigger: bool,
        /// Visibility.
        visible: bool,
    },
    /// Tab strip.
    Tabs {
        /// Argument name.
        name: String,
        /// Tabs in display order.
        tabs: Vec<Tab>,
        /// Selected tab name.
        value: String,
        /// Render as links.
        link: bool,
        /// Visibility.
        visible: bool,
    },
    /// Push button.
    Button {
        /// Argument name sent as `true` when pressed.
        name: String,
        /// Display label.
        label: String,
        /// Primary styling.
        primary: bool,
        /// Visibility.
        visible: bool,
    },
    /// Row of buttons.
    Buttons {
        /// Buttons (normally `Item::Button`).
        items: Vec<Item>,
        /// Visibility.
        visible: bool,
    },
    /// Horizontal group.
    Inline {
        /// Children.
        items: Vec<Item>,
        /// Justification (`start`, `center`, `around`, …).
        justify: String,
        /// Visibility.
        visible: bool,
    },
    /// Image by path.
    Image {
        /// Title / alt text.
        title: String,
        /// Image path or URL.
        path: String,
        /// CSS width.
        width: String,
        /// Visibility.
        visible: bool,
    },
    /// Integer slider.
    Slider {
        /// Argument name.
        name: String,
        /// Display label.
        label: String,
        /// Minimum value.
        min: i64,
        /// Maximum value.
        max: i64,
        /// Current value.
        value: i64,
        /// Submit immediately on change.
        trigger: bool,
        /// CSS width.
        width: String,
        /// Visibility.
        visible: bool,
    },
    /// Stats strip.
    Stats {
        /// Stats in display order.
        items: Vec<Stat>,
        /// Justification.
        justify: String,
        /// Visibility.
        visible: bool,
    },
    /// File picker.
    FileUpload {
        /// Argument name.
        name: String,
        /// Accepted extensions without dot.
        extensions: Vec<String>,
        /// Visibility.
        visible: bool,
    },
}

impl Item {
    /// Markdown text.
    pub fn text(content: impl Into<String>) -> Self {
        Item::Text {
            content: content.into(),
            visible: true,
        }
    }

    /// Large markdown text.
    pub fn text_l(content: impl Into<String>) -> Self {
        Item::TextL {
            content: content.into(),
            visible: true,
        }
    }

    /// Unlabelled separator.
    pub fn separator() -> Self {
        Item::Separator {
            label: None,
            visible: true,
        }
    }

    /// Labelled separator.
    pub fn separator_labeled(label: impl Into<String>) -> Self {
        Item::Separator {
            label: Some(label.into()),
            visible: true,
        }
    }

    /// Toggle switch.
    pub fn toggle(name: impl Into<String>, label: impl Into<String>, value: bool) -> Self {
        Item::Toggle {
            name: name.into(),
            label: label.into(),
            value,
            trigger: true,
            visible: true,
        }
    }

    /// Linked tab strip.
    pub fn tabs(name: impl Into<String>, tabs: Vec<Tab>, value: impl Into<String>) -> Self {
        Item::Tabs {
            name: name.into(),
            tabs,
            value: value.into(),
            link: true,
            visible: true,
        }
    }

    /// Push button.
    pub fn button(name: impl Into<String>, label: impl Into<String>, primary: bool) -> Self {
        Item::Button {
            name: name.into(),
            label: label.into(),
            primary,
            visible: true,
        }
    }

    /// Button row.
    pub fn buttons(items: Vec<Item>) -> Self {
        Item::Buttons {
            items,
            visible: true,
        }
    }

    /// Horizontal group.
    pub fn inline(items: Vec<Item>, justify: impl Into<String>) -> Self {
        Item::Inline {
            items,
            justify: justify.into(),
            visible: true,
        }
    }

    /// Image.
    pub fn image(
        title: impl Into<String>,
        path: impl Into<String>,
        width: impl Into<String>,
    ) -> Self {
        Item::Image {
            title: title.into(),
            path: path.into(),
            width: width.into(),
            visible: true,
        }
    }

    /// Triggering integer slider.
    pub fn slider(
        name: impl Into<String>,
        label: impl Into<String>,
        (min, max): (i64, i64),
        value: i64,
        width: impl Into<String>,
    ) -> Self {
        Item::Slider {
            name: name.into(),
            label: label.into(),
            min,
            max,
            value,
            trigger: true,
            width: width.into(),
            visible: true,
        }
    }

    /// Stats strip.
    pub fn stats(items: Vec<Stat>, justify: impl Into<String>) -> Self {
        Item::Stats {
            items,
            justify: justify.into(),
            visible: true,
        }
    }

    /// File picker.
    pub fn file_upload(name: impl Into<String>, extensions: &[&str]) -> Self {
        Item::FileUpload {
            name: name.into(),
            extensions: extensions.iter().map(ToString::to_string).collect(),
            visible: true,
        }
    }

    /// Builder: same item, initially hidden.
    pub fn hidden(mut self) -> Self {
        self.set_visible(false);
        self
    }

    /// Current visibility.
    pub fn is_visible(&self) -> bool {
        *self.visible_flag()
    }

    /// Show or hide the item.
    pub fn set_visible(&mut self, visible: bool) {
        *self.visible_flag_mut() = visible;
    }

    fn visible_flag(&self) -> &bool {
        match self {
            Item::Text { visible, .. }
            | Item::TextL { visible, .. }
            | Item::Separator { visible, .. }
            | Item::Toggle { visible, .. }
            | Item::Tabs { visible, .. }
            | Item::Button { visible, .. }
            | Item::Buttons { visible, .. }
            | Item::Inline { visible, .. }
            | Item::Image { visible, .. }
            | Item::Slider { visible, .. }
            | Item::Stats { visible, .. }
            | Item::FileUpload { visible, .. } => visible,
        }
    }

    fn visible_flag_mut(&mut self) -> &mut bool {
        match self {
            Item::Text { visible, .. }
            | Item::TextL { visible, .. }
            | Item::Separator { visible, .. }
            | Item::Toggle { visible, .. }
            | Item::Tabs { visible, .. }
            | Item::Button { visible, .. }
            | Item::Buttons { visible, .. }
            | Item::Inline { visible, .. }
            | Item::Image { visible, .. }
            | Item::Slider { visible, .. }
            | Item::Stats { visible, .. }
            | Item::FileUpload { visible, .. } => visible,
        }
    }
}

/// Page-level metadata: title, layouts, theme, dialogs, redirects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetaCard {
    /// Browser title.
    pub title: String,
    /// Theme name (`h2o-dark`, `light`, …).
    pub theme: String,
    /// Responsive layouts.
    pub layouts: Vec<Layout>,
    /// Currently open dialog.
    pub dialog: Option<Dialog>,
    /// Pending client-side navigation target (e.g. `#home`).
    pub redirect: Option<String>,
}

/// Header shown on every view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderCard {
    /// Target zone.
    pub zone: String,
    /// Title.
    pub title: String,
    /// Subtitle.
    pub subtitle: String,
    /// Icon name.
    pub icon: String,
    /// Icon colour.
    pub icon_color: String,
    /// Items shown on the right side (e.g. theme toggle).
    pub items: Vec<Item>,
}

/// Footer shown on every view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FooterCard {
    /// Target zone.
    pub zone: String,
    /// Caption (markdown/HTML).
    pub caption: String,
}

/// Generic form card holding a vertical list of items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormCard {
    /// Target zone.
    pub zone: String,
    /// Items in display order.
    pub items: Vec<Item>,
}

impl FormCard {
    /// Form card in `zone`.
    pub fn new(zone: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            zone: zone.into(),
            items,
        }
    }
}

/// A named unit of page content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Card {
    /// Page metadata.
    Meta(MetaCard),
    /// Header.
    Header(HeaderCard),
    /// Footer.
    Footer(FooterCard),
    /// Form.
    Form(FormCard),
}

impl Card {
    /// Meta view.
    pub fn as_meta_mut(&mut self) -> Option<&mut MetaCard> {
        match self {
            Card::Meta(m) => Some(m),
            _ => None,
        }
    }

    /// Header view.
    pub fn as_header_mut(&mut self) -> Option<&mut HeaderCard> {
        match self {
            Card::Header(h) => Some(h),
            _ => None,
        }
    }

    /// Items of a form or header card.
    pub fn items(&self) -> &[Item] {
        match self {
            Card::Form(f) => &f.items,
            Card::Header(h) => &h.items,
            Card::Meta(_) | Card::Footer(_) => &[],
        }
    }

    /// Mutable items of a form or header card; `None` for cards without items.
    pub fn items_mut(&mut self) -> Option<&mut Vec<Item>> {
        match self {
            Card::Form(f) => Some(&mut f.items),
            Card::Header(h) => Some(&mut h.items),
            Card::Meta(_) | Card::Footer(_) => None,
        }
    }
}

impl From<MetaCard> for Card {
    fn from(c: MetaCard) -> Self {
        Card::Meta(c)
    }
}

impl From<HeaderCard> for Card {
    fn from(c: HeaderCard) -> Self {
        Card::Header(c)
    }
}

impl From<FooterCard> for Card {
    fn from(c: FooterCard) -> Self {
        Card::Footer(c)
    }
}

impl From<FormCard> for Card {
    fn from(c: FormCard) -> Self {
        Card::Form(c)
    }
}
