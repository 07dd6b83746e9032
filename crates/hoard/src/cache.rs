// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use parking_lot::Mutex;

use crate::{store::Store, view::ByteView};

/// A [`Store`] behind a mutex, built lazily on first insert.
///
/// The lock is held for the whole of each operation, so reads and writes on one
/// instance are linearizable. A read before the first insert reports a miss without
/// allocating the store.
pub(crate) struct SyncCache {
    budget: u64,
    store: Mutex<Option<Store<ByteView>>>,
}

impl SyncCache {
    pub(crate) fn new(budget: u64) -> Self {
        Self {
            budget,
            store: Mutex::new(None),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<ByteView> {
        let mut store = self.store.lock();
        store.as_mut()?.get(key).cloned()
    }

    pub(crate) fn insert(&self, key: &str, value: ByteView) {
        let mut store = self.store.lock();
        store.get_or_insert_with(|| Store::new(self.budget)).insert(key, value);
    }
}

impl std::fmt::Debug for SyncCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCache").field("budget", &self.budget).finish_non_exhaustive()
    }
}
