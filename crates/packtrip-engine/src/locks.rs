//! Per-trip mutual exclusion.
//!
//! Generation pipelines are check-then-act: look for an existing
//! `trip_options` or `detailed_plan` message, then insert one. Two tasks
//! racing on the same trip must serialise across that whole window, so
//! each trip gets its own async mutex and the guard is held for the
//! duration of the pipeline. Different trips never contend.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct TripLocks {
  inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl TripLocks {
  pub fn new() -> Self { Self::default() }

  /// Acquire the lock for one trip, waiting behind any task already
  /// holding it. The guard is owned so it can cross await points.
  pub async fn acquire(&self, trip_id: &str) -> OwnedMutexGuard<()> {
    let lock = {
      let mut map = self.inner.lock().await;
      map.entry(trip_id.to_owned()).or_default().clone()
    };
    lock.lock_owned().await
  }
}
