//! Category list component: fetches its rows on mount and registers its own
//! refetch with the screen's refresh registry.

use super::store::MemoryStore;
use super::{Sacrament, SacramentRecord};
use crate::screen::{Mounted, RefreshRegistry};
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct ListState {
    rows: Vec<SacramentRecord>,
    fetch_count: usize,
    last_error: Option<String>,
}

/// A mounted list of one category's records.
///
/// Dropping the view unregisters its refetch callback.
#[derive(Debug)]
pub struct ListView {
    category: Sacrament,
    state: Arc<Mutex<ListState>>,
    mounted: Mounted<Sacrament>,
}

impl ListView {
    pub fn mount(
        registry: &RefreshRegistry<Sacrament>,
        store: MemoryStore,
        category: Sacrament,
    ) -> Self {
        let state = Arc::new(Mutex::new(ListState::default()));

        // Initial query; a failure is shown in the list, not raised.
        let _ = refetch(&store, category, &state);

        let callback_state = Arc::clone(&state);
        let mounted = registry.mount(category, move || {
            refetch(&store, category, &callback_state)
        });
        debug!("List view mounted: {}", category);

        Self {
            category,
            state,
            mounted,
        }
    }

    pub fn category(&self) -> Sacrament {
        self.category
    }

    pub fn rows(&self) -> Vec<SacramentRecord> {
        lock(&self.state).rows.clone()
    }

    /// Number of successful fetches, including the one on mount.
    pub fn fetch_count(&self) -> usize {
        lock(&self.state).fetch_count
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.state).last_error.clone()
    }

    pub fn unmount(self) {
        debug!("List view unmounted: {}", self.category);
        self.mounted.unmount();
    }
}

fn refetch(
    store: &MemoryStore,
    category: Sacrament,
    state: &Mutex<ListState>,
) -> anyhow::Result<()> {
    match store.fetch(category) {
        Ok(rows) => {
            let mut state = lock(state);
            state.rows = rows;
            state.fetch_count += 1;
            state.last_error = None;
            Ok(())
        }
        Err(err) => {
            lock(state).last_error = Some(format!("{err:#}"));
            Err(err)
        }
    }
}

fn lock(state: &Mutex<ListState>) -> MutexGuard<'_, ListState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
