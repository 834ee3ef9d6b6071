// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Image Augmentation: choose augmentations from a light or heavy menu and
//! preview up to four augmented copies of the base image.

pub mod cards;

use anyhow::anyhow;
use ripple_app_core::{
    handlers, App, ClientState, Context, EventKey, EventTable, Handler, HandlerError,
    HandlerResult, RequestArgs, Scope, StateScope,
};
use ripple_page::{Card, Value};
use tracing::info;

use crate::chrome;

/// App-scope key of the base image path.
pub const BASE_IMAGE: &str = "base_image";
/// Default number of augmented previews.
pub const DEFAULT_IMAGES: i64 = 4;
/// Bounds of the previews slider.
pub const IMAGES_RANGE: (i64, i64) = (1, 4);

/// Augmentation menu tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Menu {
    /// Light augmentations.
    #[default]
    Light,
    /// Heavy augmentations.
    Heavy,
}

impl Menu {
    /// Tab name.
    pub fn as_str(self) -> &'static str {
        match self {
            Menu::Light => "light",
            Menu::Heavy => "heavy",
        }
    }

    /// Tab for `name`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "light" => Some(Menu::Light),
            "heavy" => Some(Menu::Heavy),
            _ => None,
        }
    }

    /// Augmentations listed on this tab.
    pub fn augmentations(self) -> &'static [&'static str] {
        match self {
            Menu::Light => &cards::LIGHT_AUGMENTATIONS,
            Menu::Heavy => &cards::HEAVY_AUGMENTATIONS,
        }
    }
}

fn known_augmentations() -> impl Iterator<Item = &'static str> {
    cards::LIGHT_AUGMENTATIONS
        .iter()
        .chain(cards::HEAVY_AUGMENTATIONS.iter())
        .copied()
}

/// Per-client record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentationClient {
    /// Dark mode on.
    pub theme_dark: bool,
    /// Menu tab shown.
    pub tab: Menu,
    /// Selected augmentations, in selection order.
    pub augs: Vec<String>,
    /// Number of previews, within [`IMAGES_RANGE`].
    pub n_images: i64,
    /// Upload dialog shown.
    pub dialog_open: bool,
}

impl Default for AugmentationClient {
    fn default() -> Self {
        Self {
            theme_dark: true,
            tab: Menu::Light,
            augs: Vec::new(),
            n_images: DEFAULT_IMAGES,
            dialog_open: false,
        }
    }
}

impl StateScope for AugmentationClient {
    fn snapshot(&self) -> Vec<(String, String)> {
        vec![
            (
                chrome::THEME_TOGGLE.into(),
                Value::Bool(self.theme_dark).to_string(),
            ),
            ("tab".into(), Value::from(self.tab.as_str()).to_string()),
            ("augs".into(), Value::from(self.augs.clone()).to_string()),
            ("n_images".into(), Value::Int(self.n_images).to_string()),
            (
                "dialog_open".into(),
                Value::Bool(self.dialog_open).to_string(),
            ),
        ]
    }
}

/// Named events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugmentationEvent {
    /// "Upload New" button.
    NewImage,
    /// "Reset" button.
    Reset,
    /// Upload dialog closed.
    DialogDismissed,
    /// Crash card "Reload".
    Restart,
    /// Crash card "Report".
    Report,
}

impl EventKey for AugmentationEvent {
    fn name(self) -> &'static str {
        match self {
            AugmentationEvent::NewImage => "new_image",
            AugmentationEvent::Reset => "reset",
            AugmentationEvent::DialogDismissed => "dialog_new_image.dismissed",
            AugmentationEvent::Restart => "restart",
            AugmentationEvent::Report => "report",
        }
    }
}

/// The Image Augmentation app.
#[derive(Debug, Clone)]
pub struct ImageAugmentation {
    base_image: String,
}

impl ImageAugmentation {
    /// App previewing `base_image`.
    pub fn new(base_image: impl Into<String>) -> Self {
        Self {
            base_image: base_image.into(),
        }
    }
}

impl Default for ImageAugmentation {
    fn default() -> Self {
        Self::new("/assets/base_image.jpg")
    }
}

impl App for ImageAugmentation {
    type Client = AugmentationClient;
    type Event = AugmentationEvent;

    fn name(&self) -> &str {
        "Image Augmentation"
    }

    fn init_app(&self, scope: &mut Scope) -> HandlerResult {
        info!(base_image = %self.base_image, "Registering base image");
        scope.insert(BASE_IMAGE.into(), Value::from(self.base_image.as_str()));
        Ok(())
    }

    fn init_client(&self, cx: &mut Context<'_, Self>) -> HandlerResult {
        cx.client.fields = AugmentationClient::default();
        cx.page.put("meta", cards::meta());
        cx.page.put("header", cards::header());
        cx.page.put("footer", chrome::footer());
        cx.page.put("dummy", chrome::dummy());
        render_augmentations(cx);
        render_images(cx)
    }

    fn targeted_update(
        &self,
        client: &ClientState<AugmentationClient>,
        args: &RequestArgs,
    ) -> Option<(&'static str, Handler<Self>)> {
        let fields = &client.fields;
        if chrome::theme_change(args, fields.theme_dark).is_some() {
            return Some((chrome::THEME_TOGGLE, update_theme as Handler<Self>));
        }
        if args
            .get("tab")
            .is_some_and(|v| v.as_str() != Some(fields.tab.as_str()))
        {
            return Some(("tab", update_tab as Handler<Self>));
        }
        if args
            .get("images")
            .is_some_and(|v| v.as_i64() != Some(fields.n_images))
        {
            return Some(("images", update_images as Handler<Self>));
        }
        if toggled_augmentations(fields, args).next().is_some() {
            return Some(("augmentation", update_augmentations as Handler<Self>));
        }
        None
    }

    fn events(&self) -> EventTable<Self> {
        EventTable::new()
            .on(AugmentationEvent::NewImage, new_image)
            .on(AugmentationEvent::Reset, reset)
            .on(AugmentationEvent::DialogDismissed, dismiss_dialog)
            .on(AugmentationEvent::Restart, handlers::restart)
            .on(AugmentationEvent::Report, handlers::report)
    }

    fn droppable_cards(&self) -> &[&'static str] {
        &cards::DROPPABLE_CARDS
    }
}

/// Augmentations whose toggle argument disagrees with the selection.
fn toggled_augmentations<'a>(
    fields: &'a AugmentationClient,
    args: &'a RequestArgs,
) -> impl Iterator<Item = (&'static str, bool)> + 'a {
    known_augmentations().filter_map(move |name| {
        let wanted = args.get(name)?.as_bool()?;
        let selected = fields.augs.iter().any(|a| a == name);
        (wanted != selected).then_some((name, wanted))
    })
}

fn render_augmentations(cx: &mut Context<'_, ImageAugmentation>) {
    let fields = &cx.client.fields;
    cx.page
        .put("augmentations", cards::augmentations(fields.tab, &fields.augs));
}

fn render_images(cx: &mut Context<'_, ImageAugmentation>) -> HandlerResult {
    let base = cx
        .app
        .get(BASE_IMAGE)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("no base image registered"))?;
    let fields = &cx.client.fields;
    cx.page.put(
        "images",
        cards::images(base, fields.n_images, &fields.augs),
    );
    Ok(())
}

fn update_theme(_app: &ImageAugmentation, cx: &mut Context<'_, ImageAugmentation>) -> HandlerResult {
    let dark = chrome::theme_flag(cx.args)?;
    cx.client.fields.theme_dark = dark;
    info!(dark, "Updating theme");
    chrome::apply_theme(cx.page, dark)
}

fn update_tab(_app: &ImageAugmentation, cx: &mut Context<'_, ImageAugmentation>) -> HandlerResult {
    let tab = cx
        .args
        .get("tab")
        .and_then(Value::as_str)
        .and_then(Menu::parse)
        .ok_or_else(|| HandlerError::invalid_argument("tab", "expected light or heavy"))?;
    info!(tab = tab.as_str(), "Switching augmentation tab");
    cx.client.fields.tab = tab;
    render_augmentations(cx);
    Ok(())
}

fn update_images(_app: &ImageAugmentation, cx: &mut Context<'_, ImageAugmentation>) -> HandlerResult {
    let requested = cx
        .args
        .get("images")
        .and_then(Value::as_i64)
        .ok_or_else(|| HandlerError::invalid_argument("images", "expected an integer"))?;
    let (min, max) = IMAGES_RANGE;
    cx.client.fields.n_images = requested.clamp(min, max);
    info!(n_images = cx.client.fields.n_images, "Updating image count");
    render_images(cx)
}

fn update_augmentations(
    _app: &ImageAugmentation,
    cx: &mut Context<'_, ImageAugmentation>,
) -> HandlerResult {
    let changes: Vec<_> = toggled_augmentations(&cx.client.fields, cx.args).collect();
    for (name, wanted) in changes {
        info!(augmentation = name, enabled = wanted, "Toggling augmentation");
        let augs = &mut cx.client.fields.augs;
        if wanted {
            augs.push(name.to_string());
        } else {
            augs.retain(|a| a != name);
        }
    }
    render_augmentations(cx);
    render_images(cx)
}

fn new_image(_app: &ImageAugmentation, cx: &mut Context<'_, ImageAugmentation>) -> HandlerResult {
    info!("Opening upload dialog");
    set_dialog(cx, true)
}

fn dismiss_dialog(
    _app: &ImageAugmentation,
    cx: &mut Context<'_, ImageAugmentation>,
) -> HandlerResult {
    info!("Closing upload dialog");
    set_dialog(cx, false)
}

fn set_dialog(cx: &mut Context<'_, ImageAugmentation>, open: bool) -> HandlerResult {
    let meta = cx
        .page
        .get_mut("meta")
        .and_then(Card::as_meta_mut)
        .ok_or_else(|| HandlerError::MissingCard("meta".into()))?;
    meta.dialog = open.then(cards::dialog_new_image);
    cx.client.fields.dialog_open = open;
    Ok(())
}

fn reset(_app: &ImageAugmentation, cx: &mut Context<'_, ImageAugmentation>) -> HandlerResult {
    info!("Resetting augmentations");
    cx.client.fields.augs.clear();
    cx.client.fields.n_images = DEFAULT_IMAGES;
    render_augmentations(cx);
    render_images(cx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_parse_and_list_their_menus() {
        assert_eq!(Menu::parse("heavy"), Some(Menu::Heavy));
        assert_eq!(Menu::parse("medium"), None);
        assert_eq!(Menu::Light.augmentations().len(), 22);
        assert_eq!(Menu::Heavy.augmentations().len(), 16);
    }

    #[test]
    fn only_disagreeing_toggles_are_reported() {
        let fields = AugmentationClient {
            augs: vec!["Blur".into()],
            ..AugmentationClient::default()
        };
        let args = RequestArgs::new()
            .with("Blur", true)
            .with("Sharpen", true)
            .with("CLAHE", false)
            .with("Unknown", true);
        let toggled: Vec<_> = toggled_augmentations(&fields, &args).collect();
        assert_eq!(toggled, vec![("Sharpen", true)]);
    }

    #[test]
    fn client_snapshot_lists_every_field() {
        let keys: Vec<_> = AugmentationClient::default()
            .snapshot()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, ["theme_dark", "tab", "augs", "n_images", "dialog_open"]);
    }
}
