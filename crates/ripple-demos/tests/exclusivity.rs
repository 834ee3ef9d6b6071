// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property tests: any interaction sequence runs one branch per dispatch and
//! keeps the image app's page in step with its client record.

use proptest::prelude::*;
use ripple_app_core::{ClientSession, Dispatcher, RequestArgs};
use ripple_demos::image_augmentation::cards::{HEAVY_AUGMENTATIONS, LIGHT_AUGMENTATIONS};
use ripple_demos::image_augmentation::Menu;
use ripple_demos::ImageAugmentation;
use ripple_page::{Card, Item};

fn interaction() -> impl Strategy<Value = RequestArgs> {
    let augmentation = prop::sample::select(
        LIGHT_AUGMENTATIONS
            .iter()
            .chain(HEAVY_AUGMENTATIONS.iter())
            .copied()
            .collect::<Vec<_>>(),
    );
    prop_oneof![
        Just(RequestArgs::new()),
        any::<bool>().prop_map(|dark| RequestArgs::new().with("theme_dark", dark)),
        prop::sample::select(vec!["light", "heavy"])
            .prop_map(|tab| RequestArgs::new().with("tab", tab)),
        (-3_i64..10).prop_map(|n| RequestArgs::new().with("images", n)),
        (augmentation, any::<bool>()).prop_map(|(name, on)| RequestArgs::new().with(name, on)),
        Just(RequestArgs::new().with("reset", true)),
        Just(RequestArgs::new().with("new_image", true)),
        Just(RequestArgs::new().with_event("dialog_new_image", "dismissed", true)),
    ]
}

proptest! {
    #[test]
    fn every_dispatch_flushes_at_most_once(steps in prop::collection::vec(interaction(), 1..40)) {
        let dispatcher = Dispatcher::new(ImageAugmentation::default());
        let mut session = ClientSession::new();
        for args in steps {
            let out = dispatcher.dispatch(&mut session, args);
            prop_assert!(out.flushes.len() <= 1);
            prop_assert!(!out.is_failure(), "unexpected failure: {:?}", out.diagnostic);
        }
    }

    #[test]
    fn page_mirrors_client_record(steps in prop::collection::vec(interaction(), 1..40)) {
        let dispatcher = Dispatcher::new(ImageAugmentation::default());
        let mut session = ClientSession::new();
        dispatcher.dispatch(&mut session, RequestArgs::new());
        dispatcher.dispatch(&mut session, RequestArgs::new());
        for args in steps {
            dispatcher.dispatch(&mut session, args);
            let fields = &session.client.fields;
            prop_assert!((1..=4).contains(&fields.n_images));

            let menu = session.page.get("augmentations").map(Card::items).unwrap_or_default();
            let listed: Vec<&str> = match fields.tab {
                Menu::Light => LIGHT_AUGMENTATIONS.to_vec(),
                Menu::Heavy => HEAVY_AUGMENTATIONS.to_vec(),
            };
            let shown: Vec<(&str, bool)> = menu
                .iter()
                .filter_map(|item| match item {
                    Item::Toggle { name, value, .. } => Some((name.as_str(), *value)),
                    _ => None,
                })
                .collect();
            prop_assert_eq!(shown.len(), listed.len());
            for (name, checked) in shown {
                prop_assert!(listed.contains(&name));
                prop_assert_eq!(checked, fields.augs.iter().any(|a| a == name));
            }
        }
    }
}
