//! Consumption ledger
//!
//! Monotone accumulation of priced deltas plus the query-side aggregation
//! that turns them into per-app, per-user and per-part snapshots.

use std::collections::HashMap;

use crate::config::PowerModel;
use crate::stats::types::{
    BatteryStatsInfo, ConsumptionDelta, ConsumptionType, StatsType, DEFAULT_VALUE, INVALID_VALUE,
    USER_ID_RANGE, US_PER_SECOND,
};

/// Accumulated totals, all monotone between resets
#[derive(Debug, Default)]
pub struct ConsumptionLedger {
    /// Per-app energy, keyed uid then activity
    app_power_mah: HashMap<i32, HashMap<StatsType, f64>>,
    /// Hardware-part energy for part-scoped activities
    part_power_mah: HashMap<StatsType, f64>,
    /// Closed active time, uid is `INVALID_VALUE` for part-scoped stats
    time_us: HashMap<(StatsType, i32), u64>,
    /// Occurrence counters for single-shot stats
    counts: HashMap<(StatsType, i32), u64>,
}

impl ConsumptionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a closed interval.
    ///
    /// App-scoped deltas without a usable uid degrade to their part bucket
    /// so the energy is never dropped.
    pub fn credit(&mut self, delta: &ConsumptionDelta, model: &PowerModel) {
        let mah = delta.power_mah(model);
        let app_scoped = delta.stats_type.is_app_scoped() && delta.uid > INVALID_VALUE;
        if app_scoped {
            *self
                .app_power_mah
                .entry(delta.uid)
                .or_default()
                .entry(delta.stats_type)
                .or_insert(DEFAULT_VALUE) += mah;
        } else {
            *self.part_power_mah.entry(delta.stats_type).or_insert(DEFAULT_VALUE) += mah;
        }

        let time_uid = if app_scoped { delta.uid } else { INVALID_VALUE };
        *self.time_us.entry((delta.stats_type, time_uid)).or_insert(0) += delta.duration_us;
    }

    /// Credit single-shot occurrences at the model's per-occurrence cost
    pub fn credit_count(&mut self, stats_type: StatsType, uid: i32, count: u64, model: &PowerModel) {
        let mah = count as f64 * model.average_ma(stats_type.current_kind());
        let app_scoped = stats_type.is_app_scoped() && uid > INVALID_VALUE;
        if app_scoped {
            *self
                .app_power_mah
                .entry(uid)
                .or_default()
                .entry(stats_type)
                .or_insert(DEFAULT_VALUE) += mah;
        } else {
            *self.part_power_mah.entry(stats_type).or_insert(DEFAULT_VALUE) += mah;
        }
        let count_uid = if app_scoped { uid } else { INVALID_VALUE };
        *self.counts.entry((stats_type, count_uid)).or_insert(0) += count;
    }

    /// Drop every accumulated total
    pub fn reset(&mut self) {
        self.app_power_mah.clear();
        self.part_power_mah.clear();
        self.time_us.clear();
        self.counts.clear();
    }

    /// Total energy attributed to one app uid
    pub fn app_stats_mah(&self, uid: i32) -> f64 {
        self.app_power_mah
            .get(&uid)
            .map(|per_type| per_type.values().sum())
            .unwrap_or(DEFAULT_VALUE)
    }

    /// Total energy of one hardware-part bucket
    pub fn part_stats_mah(&self, consumption_type: ConsumptionType) -> f64 {
        self.part_power_mah
            .iter()
            .filter(|(stats_type, _)| stats_type.consumption_type() == consumption_type)
            .map(|(_, mah)| mah)
            .sum()
    }

    /// Energy attributed to one app uid for one activity
    pub fn app_stats_mah_of(&self, uid: i32, stats_type: StatsType) -> f64 {
        self.app_power_mah
            .get(&uid)
            .and_then(|per_type| per_type.get(&stats_type))
            .copied()
            .unwrap_or(DEFAULT_VALUE)
    }

    /// Grand total over apps and parts; user aggregates are derived and
    /// therefore excluded to avoid double counting
    pub fn total_power_mah(&self) -> f64 {
        let app: f64 = self
            .app_power_mah
            .values()
            .flat_map(|per_type| per_type.values())
            .sum();
        let part: f64 = self.part_power_mah.values().sum();
        // An empty f64 sum yields -0.0, which would render as "-0.000000"
        app + part + 0.0
    }

    /// Closed active time for one activity, in whole seconds
    pub fn total_time_second(&self, stats_type: StatsType, uid: i32) -> u64 {
        let key_uid = if stats_type.is_app_scoped() { uid } else { INVALID_VALUE };
        let us = self.time_us.get(&(stats_type, key_uid)).copied().unwrap_or(0);
        (us as f64 / US_PER_SECOND).round() as u64
    }

    /// Occurrence count for one single-shot activity
    pub fn total_count(&self, stats_type: StatsType, uid: i32) -> u64 {
        let key_uid = if stats_type.is_app_scoped() { uid } else { INVALID_VALUE };
        self.counts.get(&(stats_type, key_uid)).copied().unwrap_or(0)
    }

    /// Transferred bytes for one traffic-bearing activity.
    ///
    /// No current feed event reports byte counts, so this always reads as
    /// zero; the query exists for interface parity with the wire protocol.
    pub fn total_data_bytes(&self, _stats_type: StatsType, _uid: i32) -> u64 {
        0
    }

    /// Materialize the full stats list: one entry per app uid, one roll-up
    /// per user, one entry per hardware-part bucket with recorded energy
    pub fn snapshot(&self) -> Vec<BatteryStatsInfo> {
        let mut entries = Vec::new();
        let mut user_power: HashMap<i32, f64> = HashMap::new();

        let mut uids: Vec<i32> = self.app_power_mah.keys().copied().collect();
        uids.sort_unstable();
        for uid in uids {
            let mah = self.app_stats_mah(uid);
            entries.push(BatteryStatsInfo::for_app(uid, mah));
            *user_power.entry(uid / USER_ID_RANGE).or_insert(DEFAULT_VALUE) += mah;
        }

        let mut user_ids: Vec<i32> = user_power.keys().copied().collect();
        user_ids.sort_unstable();
        for user_id in user_ids {
            entries.push(BatteryStatsInfo::for_user(user_id, user_power[&user_id]));
        }

        let mut parts: Vec<ConsumptionType> = self
            .part_power_mah
            .keys()
            .map(StatsType::consumption_type)
            .collect();
        parts.sort_unstable_by_key(|t| *t as i32);
        parts.dedup();
        for part in parts {
            entries.push(BatteryStatsInfo::for_part(part, self.part_stats_mah(part)));
        }

        entries
    }
}
