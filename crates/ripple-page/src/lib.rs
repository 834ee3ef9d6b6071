// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical page representation shared across Ripple hosts, apps and clients.
//! Pure data (named cards, their items, scalar values) with deterministic
//! hashing and epoch-stamped deltas.

mod card;
mod page;
mod value;

pub use card::{
    Card, Dialog, FooterCard, FormCard, HeaderCard, Item, Layout, MetaCard, Stat, Tab, Zone,
};
pub use page::{EpochId, Hash32, Page, PageDelta, PageError, PageOp};
pub use value::Value;
