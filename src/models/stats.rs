// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity directory statistics.
//!
//! Computed on demand from the full activity list; nothing is stored.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::Activity;

/// Counts over the whole directory.
///
/// Only categories and statuses that occur appear as keys, so the values of
/// each map always sum to `total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityStats {
    pub total: u32,
    /// Activity count per category ("eventos", "colectas", ...)
    #[serde(default)]
    pub by_category: HashMap<String, u32>,
    /// Activity count per status ("upcoming", "active", "completed")
    #[serde(default)]
    pub by_status: HashMap<String, u32>,
}

impl ActivityStats {
    pub fn from_activities<'a>(activities: impl IntoIterator<Item = &'a Activity>) -> Self {
        let mut stats = Self::default();
        for activity in activities {
            stats.record(activity);
        }
        stats
    }

    /// Count one more activity.
    pub fn record(&mut self, activity: &Activity) {
        self.total += 1;
        *self
            .by_category
            .entry(activity.category.as_str().to_string())
            .or_insert(0) += 1;
        *self
            .by_status
            .entry(activity.status.as_str().to_string())
            .or_insert(0) += 1;
    }
}
