// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Crash capture and the diagnostic card.
//!
//! The card keeps a fixed item layout so the `report` handler can reveal the
//! details section by index without touching the captured content:
//!
//! | idx | item                                   | visible |
//! |-----|----------------------------------------|---------|
//! | 0   | stats "Oops!" / "Something went wrong" | yes     |
//! | 1   | separator                              | yes     |
//! | 2   | apology                                | yes     |
//! | 3   | `restart` / `report` buttons           | yes     |
//! | 4   | "Error Details" separator              | no      |
//! | 5   | issue link                             | no      |
//! | 6   | app name                               | no      |
//! | 7   | stack trace                            | no      |
//! | 8.. | one dump per scope                     | no      |

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as _;

use ripple_page::{Card, FormCard, Item, Page, Stat};

use crate::error::HandlerError;

/// Name of the diagnostic card.
pub const ERROR_CARD: &str = "error";
/// Index of the first item hidden until `report` is triggered.
pub const FIRST_DETAIL_ITEM: usize = 4;
/// Where users file crash reports.
pub const ISSUE_URL: &str = "https://github.com/vopani/waveton/issues/new?assignees=vopani&labels=bug&template=error-report.md&title=%5BERROR%5D";

/// Everything captured at the moment a dispatch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Error type label.
    pub error_type: String,
    /// Error message.
    pub message: String,
    /// Error line, cause chain, then backtrace frames.
    pub stack_trace: Vec<String>,
    /// Scope name → flat key/value dump, in capture order.
    pub scopes: Vec<(String, Vec<(String, String)>)>,
}

impl Diagnostic {
    /// Capture `error` together with snapshots of every state scope.
    pub fn capture(error: &HandlerError, scopes: Vec<(String, Vec<(String, String)>)>) -> Self {
        let mut stack_trace = vec![format!("{}: {}", error.kind(), error)];
        let mut source = error.source();
        while let Some(cause) = source {
            stack_trace.push(format!("Caused by: {cause}"));
            source = cause.source();
        }
        let backtrace = match error {
            HandlerError::Other(e) if e.backtrace().status() == BacktraceStatus::Captured => {
                e.backtrace().to_string()
            }
            HandlerError::Panic {
                backtrace: Some(trace),
                ..
            } => trace.clone(),
            _ => Backtrace::force_capture().to_string(),
        };
        stack_trace.extend(backtrace.lines().map(str::to_string));

        Self {
            error_type: error.kind().to_string(),
            message: error.to_string(),
            stack_trace,
            scopes,
        }
    }

    /// Dump of one scope.
    pub fn scope(&self, name: &str) -> Option<&[(String, String)]> {
        self.scopes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, kv)| kv.as_slice())
    }
}

fn code_block<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::from("```\n");
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out.push_str("```");
    out
}

/// Build the diagnostic card for `diag`.
pub fn crash_card(diag: &Diagnostic, app_name: &str) -> FormCard {
    let mut items = vec![
        Item::stats(
            vec![Stat {
                label: String::new(),
                value: "Oops!".into(),
                caption: "Something went wrong".into(),
                icon: "Error".into(),
                icon_color: None,
            }],
            "start",
        ),
        Item::separator(),
        Item::text_l("Apologies for the inconvenience!"),
        Item::buttons(vec![
            Item::button("restart", "Reload", true),
            Item::button("report", "Report", false),
        ]),
        Item::separator_labeled("Error Details").hidden(),
        Item::text(format!(
            "To report this issue, <a href=\"{ISSUE_URL}\" target=\"_blank\">please open an issue</a> with the details below:"
        ))
        .hidden(),
        Item::text_l(format!("Report Issue in App: **{app_name}**")).hidden(),
        Item::text(format!("### Stack Trace\n{}", code_block(&diag.stack_trace))).hidden(),
    ];
    for (name, kv) in &diag.scopes {
        let lines = kv.iter().map(|(k, v)| format!("{k}: {v}"));
        items.push(Item::text(format!("### {name}\n{}", code_block(lines))).hidden());
    }
    FormCard::new("main", items)
}

/// Tear down the droppable cards and install the diagnostic card.
pub fn render(page: &mut Page, droppable: &[&str], diag: &Diagnostic, app_name: &str) {
    for name in droppable {
        page.remove(name);
    }
    page.put(ERROR_CARD, crash_card(diag, app_name));
}

/// Reveal the hidden detail items of the diagnostic card in index order.
/// Returns false when no diagnostic card is shown.
pub fn reveal_details(page: &mut Page) -> bool {
    let Some(items) = page.get_mut(ERROR_CARD).and_then(Card::items_mut) else {
        return false;
    };
    for item in items.iter_mut().skip(FIRST_DETAIL_ITEM) {
        item.set_visible(true);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Diagnostic {
        Diagnostic::capture(
            &HandlerError::Other(anyhow::anyhow!("division by zero")),
            vec![
                ("app".into(), vec![("app_initialized".into(), "True".into())]),
                ("args".into(), vec![("boom".into(), "True".into())]),
            ],
        )
    }

    #[test]
    fn capture_leads_with_error_line() {
        let diag = sample();
        assert_eq!(diag.error_type, "Error");
        assert_eq!(diag.stack_trace[0], "Error: division by zero");
        assert_eq!(diag.scope("args").map(<[_]>::len), Some(1));
    }

    #[test]
    fn details_start_hidden_and_reveal_in_place() {
        let diag = sample();
        let mut page = Page::new();
        page.put("home", FormCard::new("main", vec![Item::text("hi")]));
        render(&mut page, &["home", "absent"], &diag, "Theme Switch");
        assert_eq!(page.names().collect::<Vec<_>>(), vec![ERROR_CARD]);

        let before = page.get(ERROR_CARD).cloned();
        let items = page.get(ERROR_CARD).map(Card::items).unwrap_or_default();
        assert_eq!(items.len(), FIRST_DETAIL_ITEM + 4 + 2);
        assert!(items[..FIRST_DETAIL_ITEM].iter().all(Item::is_visible));
        assert!(items[FIRST_DETAIL_ITEM..].iter().all(|i| !i.is_visible()));

        assert!(reveal_details(&mut page));
        let items = page.get(ERROR_CARD).map(Card::items).unwrap_or_default();
        assert!(items.iter().all(Item::is_visible));

        let mut restored = page.get(ERROR_CARD).cloned();
        if let Some(items) = restored.as_mut().and_then(Card::items_mut) {
            for item in items.iter_mut().skip(FIRST_DETAIL_ITEM) {
                item.set_visible(false);
            }
        }
        assert_eq!(restored, before);
    }

    #[test]
    fn reveal_without_error_card_is_noop() {
        let mut page = Page::new();
        assert!(!reveal_details(&mut page));
    }
}
