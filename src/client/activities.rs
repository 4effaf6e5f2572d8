// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process activity list shared by every view (map, recent list,
//! category filter).
//!
//! The remote store stays the source of truth; this cache is a disposable
//! projection. Loads never return an error to the caller: failures are
//! captured in [`ActivityCache::error`] and the list is reset to empty.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{Activity, ActivityCategory};
use crate::services::{ActivityFilter, ActivityService};

/// Upper bound on a single load.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the cache gets its activities from.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Every activity, newest first.
    async fn fetch_activities(&self) -> Result<Vec<Activity>>;
}

#[async_trait]
impl ActivitySource for ActivityService {
    async fn fetch_activities(&self) -> Result<Vec<Activity>> {
        self.list_activities(&ActivityFilter::default()).await
    }
}

/// What a call to [`ActivityCache::load_activities`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// List replaced with this many activities
    Loaded(usize),
    /// Another load was already running
    Skipped,
    /// Fetch failed; list reset to empty
    Failed(String),
    /// Deadline passed; list reset to empty
    TimedOut,
    /// Cache was reset while loading; result dropped
    Discarded,
}

#[derive(Default)]
struct CacheState {
    activities: Vec<Activity>,
    error: Option<String>,
}

pub struct ActivityCache {
    source: Arc<dyn ActivitySource>,
    load_timeout: Duration,
    loading: AtomicBool,
    /// Bumped by `reset` so a load started earlier cannot write back.
    epoch: AtomicU64,
    state: RwLock<CacheState>,
}

/// Clears the loading flag however the load ends.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ActivityCache {
    pub fn new(source: Arc<dyn ActivitySource>) -> Self {
        Self::with_timeout(source, DEFAULT_LOAD_TIMEOUT)
    }

    pub fn with_timeout(source: Arc<dyn ActivitySource>, load_timeout: Duration) -> Self {
        Self {
            source,
            load_timeout,
            loading: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Fetch the full list from the source and replace the cached one.
    ///
    /// A call made while another load is in flight returns
    /// [`LoadOutcome::Skipped`] without fetching.
    pub async fn load_activities(&self) -> LoadOutcome {
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Activity load already in flight, skipping");
            return LoadOutcome::Skipped;
        }
        let _guard = LoadingGuard(&self.loading);
        let epoch = self.epoch.load(Ordering::Acquire);

        // The fetch future is dropped on timeout, so a late result is never applied.
        let result = tokio::time::timeout(self.load_timeout, self.source.fetch_activities()).await;

        let mut state = self.state.write().await;
        if self.epoch.load(Ordering::Acquire) != epoch {
            tracing::debug!("Cache reset during load, discarding result");
            return LoadOutcome::Discarded;
        }

        match result {
            Ok(Ok(activities)) => {
                warn_unmappable(&activities);
                let count = activities.len();
                state.activities = activities;
                state.error = None;
                tracing::debug!(count, "Activity cache loaded");
                LoadOutcome::Loaded(count)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Activity load failed");
                let message = e.to_string();
                state.activities.clear();
                state.error = Some(message.clone());
                LoadOutcome::Failed(message)
            }
            Err(_) => {
                let err = AppError::Timeout(format!(
                    "loading activities took longer than {}s",
                    self.load_timeout.as_secs_f64()
                ));
                tracing::warn!(error = %err, "Activity load timed out");
                state.activities.clear();
                state.error = Some(err.to_string());
                LoadOutcome::TimedOut
            }
        }
    }

    /// Insert a freshly created activity at the front.
    pub async fn add_activity(&self, activity: Activity) {
        self.state.write().await.activities.insert(0, activity);
    }

    /// Replace the cached activity with the same id. Unknown ids are ignored.
    pub async fn update_activity(&self, activity: Activity) {
        let mut state = self.state.write().await;
        if let Some(slot) = state.activities.iter_mut().find(|a| a.id == activity.id) {
            *slot = activity;
        }
    }

    pub async fn remove_activity(&self, id: &str) {
        self.state.write().await.activities.retain(|a| a.id != id);
    }

    /// Every cached activity, newest first.
    pub async fn activities(&self) -> Vec<Activity> {
        self.state.read().await.activities.clone()
    }

    /// Activities that can be drawn on the map.
    pub async fn map_activities(&self) -> Vec<Activity> {
        self.state
            .read()
            .await
            .activities
            .iter()
            .filter(|a| a.map_point().is_some())
            .cloned()
            .collect()
    }

    pub async fn by_category(&self, category: ActivityCategory) -> Vec<Activity> {
        self.state
            .read()
            .await
            .activities
            .iter()
            .filter(|a| a.category == category)
            .cloned()
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Message of the last failed load, cleared by a successful one.
    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    /// Drop everything. A load already in flight will not repopulate.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        self.epoch.fetch_add(1, Ordering::AcqRel);
        *state = CacheState::default();
    }
}

fn warn_unmappable(activities: &[Activity]) {
    for activity in activities.iter().filter(|a| a.map_point().is_none()) {
        tracing::warn!(
            activity_id = %activity.id,
            location = ?activity.location,
            "Activity has invalid coordinates, hidden from map"
        );
    }
}
