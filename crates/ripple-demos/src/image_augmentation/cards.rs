// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cards and augmentation menus of the Image Augmentation app.

use ripple_page::{Dialog, FormCard, HeaderCard, Item, Layout, MetaCard, Stat, Tab, Zone};

use super::Menu;
use crate::chrome::{self, DARK_ICON_COLOR, DARK_THEME, LIGHT_ICON_COLOR};

/// Cards torn down before the crash card is shown.
pub const DROPPABLE_CARDS: [&str; 3] = ["augmentations", "images", "dummy"];

/// Name of the upload dialog; its `dismissed` event closes it.
pub const UPLOAD_DIALOG: &str = "dialog_new_image";

/// Light augmentations, in menu order.
pub const LIGHT_AUGMENTATIONS: [&str; 22] = [
    "CLAHE",
    "Defocus",
    "Equalize",
    "FancyPCA",
    "HorizontalFlip",
    "HueSaturationValue",
    "MultiplicativeNoise",
    "Normalize",
    "PixelDropout",
    "RandomBrightness",
    "RandomBrightnessContrast",
    "RandomContrast",
    "RandomCrop",
    "RandomCropFromBorders",
    "RandomGamma",
    "RandomRotate90",
    "RandomScale",
    "RandomShadow",
    "Rotate",
    "SafeRotate",
    "Spatter",
    "VerticalFlip",
];

/// Heavy augmentations, in menu order.
pub const HEAVY_AUGMENTATIONS: [&str; 16] = [
    "AdvancedBlur",
    "Blur",
    "ChannelShuffle",
    "CoarseDropout",
    "ColorJitter",
    "Downscale",
    "GaussianBlur",
    "GlassBlur",
    "GaussNoise",
    "MedianBlur",
    "MotionBlur",
    "RandomGridShuffle",
    "RGBShift",
    "Sharpen",
    "ShiftScaleRotate",
    "ZoomBlur",
];

/// Page metadata.
pub fn meta() -> MetaCard {
    MetaCard {
        title: "WaveTon".into(),
        theme: DARK_THEME.into(),
        layouts: vec![Layout {
            breakpoint: "xs".into(),
            zones: vec![
                Zone::new("header"),
                Zone::new("main")
                    .size("calc(100vh - 130px)")
                    .direction("row")
                    .zones(vec![
                        Zone::new("augmentations").size("25%"),
                        Zone::new("images").size("75%"),
                    ]),
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
        title: "Image Augmentation".into(),
        subtitle: "Visualize image augmentations".into(),
        icon: "FieldChanged".into(),
        icon_color: DARK_ICON_COLOR.into(),
        items: vec![chrome::theme_toggle(true)],
    }
}

/// Upload dialog opened by `new_image`.
pub fn dialog_new_image() -> Dialog {
    Dialog {
        name: UPLOAD_DIALOG.into(),
        title: "Upload New Image".into(),
        items: vec![Item::file_upload("upload", &["jpg", "jpeg", "png"])],
        closable: true,
        events: vec!["dismissed".into()],
    }
}

/// Menu of `tab` with one toggle per augmentation, checked per `augs`.
pub fn augmentations(tab: Menu, augs: &[String]) -> FormCard {
    let mut items = vec![
        Item::separator_labeled("Augmentations"),
        Item::tabs(
            "tab",
            vec![
                Tab {
                    name: Menu::Light.as_str().into(),
                    label: "Light".into(),
                },
                Tab {
                    name: Menu::Heavy.as_str().into(),
                    label: "Heavy".into(),
                },
            ],
            tab.as_str(),
        ),
    ];
    items.extend(
        tab.augmentations()
            .iter()
            .map(|name| Item::toggle(*name, *name, augs.iter().any(|a| a == name))),
    );
    FormCard::new("augmentations", items)
}

/// Base image, `n_images` augmented previews, the slider and the selection summary.
pub fn images(base_image: &str, n_images: i64, augs: &[String]) -> FormCard {
    let previews = (0..n_images)
        .map(|i| Item::image(format!("augmented_image_{i}"), base_image, "25%"))
        .collect();
    let mut summary = Item::stats(
        vec![Stat {
            label: "Augmentations".into(),
            value: String::new(),
            caption: augs.join(", "),
            icon: "PhotoCollection".into(),
            icon_color: Some(LIGHT_ICON_COLOR.into()),
        }],
        "center",
    );
    summary.set_visible(!augs.is_empty());

    FormCard::new(
        "images",
        vec![
            Item::separator_labeled("Base Image"),
            Item::inline(
                vec![
                    Item::image("", base_image, "200px"),
                    Item::button("new_image", "Upload New", true),
                ],
                "around",
            ),
            Item::separator_labeled("Augmented Images"),
            Item::inline(previews, "center"),
            Item::inline(
                vec![
                    Item::slider("images", "Images", (1, 4), n_images, "200px"),
                    Item::button("reset", "Reset", true),
                ],
                "center",
            ),
            summary,
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menus_have_no_overlap() {
        assert!(LIGHT_AUGMENTATIONS
            .iter()
            .all(|name| !HEAVY_AUGMENTATIONS.contains(name)));
    }

    #[test]
    fn summary_hidden_without_selection() {
        let card = images("base.jpg", 4, &[]);
        assert!(card.items.last().is_some_and(|i| !i.is_visible()));

        let card = images("base.jpg", 2, &["Blur".into(), "Sharpen".into()]);
        assert!(matches!(
            card.items.last(),
            Some(Item::Stats { items, visible: true, .. }) if items[0].caption == "Blur, Sharpen"
        ));
    }
}
