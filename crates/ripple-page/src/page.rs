// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ordered card-name → card mapping with atomic, epoch-stamped flushes.
//!
//! Handlers mutate the page freely; `save` seals everything that changed since
//! the previous flush into one `PageDelta`. A client mirror applies deltas with
//! `apply_delta`, which rejects gaps, order drift and hash mismatches and
//! leaves the mirror untouched when it does.

use ciborium::ser::into_writer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::Card;

/// Monotonic flush counter.
pub type EpochId = u64;
/// Blake3 hash of a page's canonical form.
pub type Hash32 = [u8; 32];

/// Structural page mutation carried in a delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PageOp {
    /// Insert or replace the named card.
    Put {
        /// Card name.
        name: String,
        /// Full card content.
        card: Card,
    },
    /// Remove the named card.
    Delete {
        /// Card name.
        name: String,
    },
}

/// Changes between two consecutive flushes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageDelta {
    /// Epoch the delta applies on top of.
    pub from_epoch: EpochId,
    /// Epoch after applying (always `from_epoch + 1`).
    pub to_epoch: EpochId,
    /// Deletions first, then puts in page order.
    pub ops: Vec<PageOp>,
    /// Every card name after applying, in page order.
    pub order: Vec<String>,
    /// Hash of the page after applying.
    pub state_hash: Hash32,
}

/// Page errors.
#[derive(Debug, Error)]
pub enum PageError {
    /// Delta referenced a card the page does not hold.
    #[error("missing card: {0}")]
    MissingCard(String),
    /// Delta does not continue from the local epoch.
    #[error("non-sequential delta: from={from}, to={to}, local={local}")]
    Gap {
        /// Delta base epoch.
        from: EpochId,
        /// Delta target epoch.
        to: EpochId,
        /// Local epoch.
        local: EpochId,
    },
    /// Local state diverged from the sender's.
    #[error("state hash mismatch at epoch {0}")]
    HashMismatch(EpochId),
    /// Card set after applying does not match the delta's name order.
    #[error("card order mismatch at epoch {0}")]
    OrderMismatch(EpochId),
    /// Canonical encoding failed.
    #[error("encode error: {0}")]
    Encode(String),
}

/// What is currently rendered for one client.
#[derive(Debug, Clone, Default)]
pub struct Page {
    cards: Vec<(String, Card)>,
    flushed: Vec<(String, Card)>,
    epoch: EpochId,
}

impl Page {
    /// Empty page at epoch 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Epoch of the last flush (or applied delta).
    pub fn epoch(&self) -> EpochId {
        self.epoch
    }

    /// Insert a card, replacing any card of the same name in place.
    pub fn put(&mut self, name: impl Into<String>, card: impl Into<Card>) {
        let name = name.into();
        let card = card.into();
        if let Some(slot) = self.cards.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = card;
        } else {
            self.cards.push((name, card));
        }
    }

    /// Look up a card.
    pub fn get(&self, name: &str) -> Option<&Card> {
        self.cards.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Look up a card for in-place edits.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Card> {
        self.cards
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// Remove a card by name.
    pub fn remove(&mut self, name: &str) -> Option<Card> {
        let idx = self.cards.iter().position(|(n, _)| n == name)?;
        Some(self.cards.remove(idx).1)
    }

    /// Whether a card is present.
    pub fn contains(&self, name: &str) -> bool {
        self.cards.iter().any(|(n, _)| n == name)
    }

    /// Card names in page order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().map(|(n, _)| n.as_str())
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// True when no cards are present.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Remove every card (the removals are flushed on the next `save`).
    pub fn clear(&mut self) {
        self.cards.clear();
    }

    /// Operations needed to bring the last flushed state up to date.
    pub fn pending_ops(&self) -> Vec<PageOp> {
        let mut ops: Vec<PageOp> = self
            .flushed
            .iter()
            .filter(|(name, _)| !self.contains(name))
            .map(|(name, _)| PageOp::Delete { name: name.clone() })
            .collect();
        for (name, card) in &self.cards {
            let unchanged = self
                .flushed
                .iter()
                .any(|(n, c)| n == name && c == card);
            if !unchanged {
                ops.push(PageOp::Put {
                    name: name.clone(),
                    card: card.clone(),
                });
            }
        }
        ops
    }

    /// Seal pending changes into a delta and advance the epoch.
    pub fn save(&mut self) -> Result<PageDelta, PageError> {
        let ops = self.pending_ops();
        let state_hash = self.compute_hash()?;
        let from_epoch = self.epoch;
        self.epoch += 1;
        self.flushed = self.cards.clone();
        Ok(PageDelta {
            from_epoch,
            to_epoch: self.epoch,
            ops,
            order: self.names().map(str::to_owned).collect(),
            state_hash,
        })
    }

    /// Canonical serialization (cards in page order) for hashing/comparison.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, PageError> {
        let mut bytes = Vec::new();
        into_writer(&self.cards, &mut bytes).map_err(|e| PageError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    /// Compute blake3 hash of the canonical form.
    pub fn compute_hash(&self) -> Result<Hash32, PageError> {
        Ok(blake3::hash(&self.to_canonical_bytes()?).into())
    }

    /// Apply a delta produced by another page's `save` (client-side mirror).
    ///
    /// Ops run against a scratch copy; the mirror only changes once the
    /// resulting order and hash agree with the sender.
    pub fn apply_delta(&mut self, delta: PageDelta) -> Result<(), PageError> {
        if delta.from_epoch != self.epoch || delta.to_epoch != delta.from_epoch + 1 {
            return Err(PageError::Gap {
                from: delta.from_epoch,
                to: delta.to_epoch,
                local: self.epoch,
            });
        }
        let mut next = self.cards.clone();
        for op in delta.ops {
            match op {
                PageOp::Put { name, card } => {
                    if let Some(slot) = next.iter_mut().find(|(n, _)| *n == name) {
                        slot.1 = card;
                    } else {
                        next.push((name, card));
                    }
                }
                PageOp::Delete { name } => {
                    let idx = next
                        .iter()
                        .position(|(n, _)| *n == name)
                        .ok_or(PageError::MissingCard(name))?;
                    next.remove(idx);
                }
            }
        }
        let next = reorder(next, &delta.order).ok_or(PageError::OrderMismatch(delta.to_epoch))?;
        let candidate = Self {
            cards: next,
            flushed: Vec::new(),
            epoch: delta.to_epoch,
        };
        if candidate.compute_hash()? != delta.state_hash {
            return Err(PageError::HashMismatch(delta.to_epoch));
        }
        self.flushed = candidate.cards.clone();
        self.cards = candidate.cards;
        self.epoch = delta.to_epoch;
        Ok(())
    }
}

/// Rearrange `cards` to follow `order`; `None` unless the name sets agree.
fn reorder(mut cards: Vec<(String, Card)>, order: &[String]) -> Option<Vec<(String, Card)>> {
    if cards.len() != order.len() {
        return None;
    }
    let mut sorted = Vec::with_capacity(order.len());
    for name in order {
        let idx = cards.iter().position(|(n, _)| n == name)?;
        sorted.push(cards.swap_remove(idx));
    }
    Some(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{FormCard, Item};

    fn form(text: &str) -> FormCard {
        FormCard::new("main", vec![Item::text(text)])
    }

    #[test]
    fn save_emits_only_changes() {
        let mut page = Page::new();
        page.put("a", form("one"));
        page.put("b", form("two"));
        let first = page.save().unwrap();
        assert_eq!(first.ops.len(), 2);
        assert_eq!((first.from_epoch, first.to_epoch), (0, 1));

        page.put("b", form("changed"));
        page.remove("a");
        let second = page.save().unwrap();
        assert_eq!(
            second.ops,
            vec![
                PageOp::Delete { name: "a".into() },
                PageOp::Put {
                    name: "b".into(),
                    card: form("changed").into()
                },
            ]
        );
    }

    #[test]
    fn mirror_tracks_server_page() {
        let mut server = Page::new();
        let mut mirror = Page::new();
        server.put("a", form("one"));
        mirror.apply_delta(server.save().unwrap()).unwrap();
        server.clear();
        server.put("c", form("three"));
        mirror.apply_delta(server.save().unwrap()).unwrap();
        assert_eq!(mirror.names().collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(mirror.compute_hash().unwrap(), server.compute_hash().unwrap());
    }

    #[test]
    fn gap_is_rejected() {
        let mut server = Page::new();
        let mut mirror = Page::new();
        server.put("a", form("one"));
        let _skipped = server.save().unwrap();
        let next = server.save().unwrap();
        assert!(matches!(
            mirror.apply_delta(next),
            Err(PageError::Gap { local: 0, .. })
        ));
    }

    #[test]
    fn mirror_follows_server_order_after_reinsertion() {
        let mut server = Page::new();
        let mut mirror = Page::new();
        for name in ["meta", "home", "footer"] {
            server.put(name, form(name));
        }
        mirror.apply_delta(server.save().unwrap()).unwrap();
        server.remove("home");
        mirror.apply_delta(server.save().unwrap()).unwrap();

        // Rebuild in the original order: only "home" is new, "footer" is unchanged.
        server.clear();
        for name in ["meta", "home", "footer"] {
            server.put(name, form(name));
        }
        let delta = server.save().unwrap();
        assert_eq!(delta.ops.len(), 1);
        mirror.apply_delta(delta).unwrap();
        assert_eq!(
            mirror.names().collect::<Vec<_>>(),
            server.names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn hash_depends_on_card_order() {
        let mut ab = Page::new();
        ab.put("a", form("1"));
        ab.put("b", form("2"));
        let mut ba = Page::new();
        ba.put("b", form("2"));
        ba.put("a", form("1"));
        assert_ne!(ab.compute_hash().unwrap(), ba.compute_hash().unwrap());
    }

    #[test]
    fn failed_delta_leaves_mirror_untouched() {
        let mut server = Page::new();
        let mut mirror = Page::new();
        server.put("a", form("one"));
        mirror.apply_delta(server.save().unwrap()).unwrap();

        server.put("b", form("two"));
        let mut bad = server.save().unwrap();
        bad.ops.push(PageOp::Delete { name: "ghost".into() });
        assert!(matches!(
            mirror.apply_delta(bad.clone()),
            Err(PageError::MissingCard(name)) if name == "ghost"
        ));
        assert_eq!(mirror.names().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(mirror.epoch(), 1);

        bad.ops.pop();
        bad.state_hash = [0; 32];
        assert!(matches!(
            mirror.apply_delta(bad.clone()),
            Err(PageError::HashMismatch(2))
        ));
        assert_eq!(mirror.names().collect::<Vec<_>>(), vec!["a"]);

        // The untouched mirror still accepts the genuine delta.
        bad.state_hash = server.compute_hash().unwrap();
        mirror.apply_delta(bad).unwrap();
        assert_eq!(mirror.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn replacing_keeps_position() {
        let mut page = Page::new();
        page.put("a", form("1"));
        page.put("b", form("2"));
        page.put("a", form("3"));
        assert_eq!(page.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
