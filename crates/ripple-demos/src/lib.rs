// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Demo apps built on the Ripple dispatch loop.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ripple_app_core::{Dispatcher, SessionFactory};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod chrome;
pub mod image_augmentation;
pub mod theme_switch;

pub use image_augmentation::ImageAugmentation;
pub use theme_switch::ThemeSwitch;

/// Apps a host can serve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DemoApp {
    /// Dark/light theme toggle.
    #[default]
    ThemeSwitch,
    /// Image augmentation previewer.
    ImageAugmentation,
}

/// Unrecognised app slug.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown app {0:?} (expected theme-switch or image-augmentation)")]
pub struct UnknownApp(pub String);

impl DemoApp {
    /// Every servable app.
    pub const ALL: [DemoApp; 2] = [DemoApp::ThemeSwitch, DemoApp::ImageAugmentation];

    /// Command-line / config slug.
    pub fn slug(self) -> &'static str {
        match self {
            DemoApp::ThemeSwitch => "theme-switch",
            DemoApp::ImageAugmentation => "image-augmentation",
        }
    }

    /// Session factory with a fresh app scope.
    pub fn factory(self) -> Arc<dyn SessionFactory> {
        match self {
            DemoApp::ThemeSwitch => Arc::new(Arc::new(Dispatcher::new(ThemeSwitch))),
            DemoApp::ImageAugmentation => {
                Arc::new(Arc::new(Dispatcher::new(ImageAugmentation::default())))
            }
        }
    }
}

impl fmt::Display for DemoApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for DemoApp {
    type Err = UnknownApp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|app| app.slug() == s)
            .ok_or_else(|| UnknownApp(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_parse_back() {
        for app in DemoApp::ALL {
            assert_eq!(app.slug().parse::<DemoApp>(), Ok(app));
        }
        assert!("paint".parse::<DemoApp>().is_err());
    }

    #[test]
    fn persists_as_kebab_case_json() {
        let json = serde_json::to_string(&DemoApp::ImageAugmentation).unwrap();
        assert_eq!(json, "\"image-augmentation\"");
        let back: DemoApp = serde_json::from_str("\"theme-switch\"").unwrap();
        assert_eq!(back, DemoApp::ThemeSwitch);
    }

    #[test]
    fn factories_report_app_names() {
        assert_eq!(DemoApp::ThemeSwitch.factory().app_name(), "Theme Switch");
        assert_eq!(
            DemoApp::ImageAugmentation.factory().app_name(),
            "Image Augmentation"
        );
    }
}
