//! Record of module creates issued by this runtime.
//!
//! Every create-module request sent after registration is kept with its
//! affinity, so the session can later delete or re-send it. Entries with
//! `client` affinity are the modules this runtime *owns*: they are deleted on
//! cleanup even when nothing else is.
//!
//! ## Rules
//! - insertion order is preserved for every selection
//! - `reload` and `restart` only read the ledger
//! - `take` (used by cleanup) is the only way entries leave

use crate::protocol::{Affinity, Message, ModuleData};

#[derive(Debug, Clone)]
pub(crate) struct LedgerEntry {
    pub affinity: Option<Affinity>,
    /// The create request as it was published.
    pub create: Message,
}

impl LedgerEntry {
    #[inline]
    pub(crate) fn is_owned(&self) -> bool {
        self.affinity == Some(Affinity::Client)
    }

    /// Module data carried by the create request.
    pub(crate) fn module(&self) -> Option<&ModuleData> {
        self.create.module()
    }

    fn selected(&self, all: bool) -> bool {
        all || self.is_owned()
    }
}

#[derive(Debug, Default)]
pub(crate) struct ModuleLedger {
    entries: Vec<LedgerEntry>,
}

impl ModuleLedger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, affinity: Option<Affinity>, create: Message) {
        self.entries.push(LedgerEntry { affinity, create });
    }

    /// Owned entries, or every entry when `all`.
    pub(crate) fn select(&self, all: bool) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(move |e| e.selected(all))
    }

    /// Removes and returns the owned entries, or every entry when `all`.
    pub(crate) fn take(&mut self, all: bool) -> Vec<LedgerEntry> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.selected(all));
        self.entries = kept;
        taken
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn owned_len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_owned()).count()
    }
}
