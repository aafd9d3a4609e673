//! Batch metrics: sealed records, aggregate counters and wall-clock timers
//!
//! Timers live here and never inside a [`RunRecord`], so records stay a pure
//! function of their seed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::harness::record::{RunOutcome, RunRecord};

/// Accumulated wall-clock time for one named phase
#[derive(Debug, Clone, Copy, Default)]
struct TimerStats {
    total: Duration,
    count: u64,
    max: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerSummary {
    pub count: u64,
    pub total_ms: f64,
    pub mean_ms: f64,
    pub max_ms: f64,
}

/// Aggregate of one scenario's batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub scenario: String,
    pub runs: u64,
    pub completed: u64,
    pub died: u64,
    pub crashed: u64,
    pub tick_limit: u64,
    pub stalled: u64,
    pub mean_turns: f64,
    pub mean_floor: f64,
    pub max_floor: u32,
    pub counters: BTreeMap<String, u64>,
    pub timers: BTreeMap<String, TimerSummary>,
}

impl BatchSummary {
    /// Fixed-width text table for terminals
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Scenario: {}\n", self.scenario));
        out.push_str(&format!(
            "{:>6} {:>10} {:>6} {:>8} {:>11} {:>8}\n",
            "runs", "completed", "died", "crashes", "tick-limit", "stalled"
        ));
        out.push_str(&format!(
            "{:>6} {:>10} {:>6} {:>8} {:>11} {:>8}\n",
            self.runs, self.completed, self.died, self.crashed, self.tick_limit, self.stalled
        ));
        out.push_str(&format!(
            "mean turns {:.1}, mean floor {:.2}, deepest floor {}\n",
            self.mean_turns, self.mean_floor, self.max_floor
        ));
        if let Some(run) = self.timers.get("run") {
            out.push_str(&format!(
                "run time: mean {:.2} ms, max {:.2} ms\n",
                run.mean_ms, run.max_ms
            ));
        }
        out
    }
}

pub struct MetricsCollector {
    scenario: String,
    records: Vec<RunRecord>,
    counters: BTreeMap<String, u64>,
    outcomes: BTreeMap<RunOutcome, u64>,
    timers: BTreeMap<String, TimerStats>,
}

impl MetricsCollector {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            records: Vec::new(),
            counters: BTreeMap::new(),
            outcomes: BTreeMap::new(),
            timers: BTreeMap::new(),
        }
    }

    /// Take ownership of a sealed record and fold it into the aggregates
    pub fn record_run(&mut self, record: RunRecord) {
        for (name, value) in record.counters() {
            *self.counters.entry(name.clone()).or_insert(0) += value;
        }
        *self.outcomes.entry(record.outcome()).or_insert(0) += 1;
        self.records.push(record);
    }

    pub fn record_duration(&mut self, timer: &str, elapsed: Duration) {
        let stats = self.timers.entry(timer.to_string()).or_default();
        stats.total += elapsed;
        stats.count += 1;
        stats.max = stats.max.max(elapsed);
    }

    /// Time a closure under the given timer name
    pub fn time<T>(&mut self, timer: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let value = f();
        self.record_duration(timer, start.elapsed());
        value
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn outcome_count(&self, outcome: RunOutcome) -> u64 {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn summary(&self) -> BatchSummary {
        let runs = self.records.len() as u64;
        let mean = |total: u64| if runs == 0 { 0.0 } else { total as f64 / runs as f64 };
        let turns: u64 = self.records.iter().map(|r| r.turns()).sum();
        let floors: u64 = self.records.iter().map(|r| r.floor_reached() as u64).sum();

        let timers = self
            .timers
            .iter()
            .map(|(name, stats)| {
                let total_ms = stats.total.as_secs_f64() * 1000.0;
                let summary = TimerSummary {
                    count: stats.count,
                    total_ms,
                    mean_ms: if stats.count == 0 { 0.0 } else { total_ms / stats.count as f64 },
                    max_ms: stats.max.as_secs_f64() * 1000.0,
                };
                (name.clone(), summary)
            })
            .collect();

        BatchSummary {
            scenario: self.scenario.clone(),
            runs,
            completed: self.outcome_count(RunOutcome::Completed),
            died: self.outcome_count(RunOutcome::Died),
            crashed: self.outcome_count(RunOutcome::Crashed),
            tick_limit: self.outcome_count(RunOutcome::TickLimit),
            stalled: self.outcome_count(RunOutcome::Stalled),
            mean_turns: mean(turns),
            mean_floor: mean(floors),
            max_floor: self.records.iter().map(|r| r.floor_reached()).max().unwrap_or(0),
            counters: self.counters.clone(),
            timers,
        }
    }
}

/// Merge a scenario summary into the telemetry file, keyed by scenario
///
/// Other scenarios already in the file are kept.
pub fn write_summary_json(path: &Path, summary: &BatchSummary) -> Result<()> {
    let mut all: BTreeMap<String, BatchSummary> = match fs::read_to_string(path) {
        Ok(contents) if !contents.trim().is_empty() => serde_json::from_str(&contents)?,
        _ => BTreeMap::new(),
    };
    all.insert(summary.scenario.clone(), summary.clone());
    fs::write(path, serde_json::to_string_pretty(&all)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::record::RunRecordBuilder;

    fn record(index: u32, outcome: RunOutcome, turns: u64, floor: u32) -> RunRecord {
        let mut builder = RunRecordBuilder::new(index, index as u64, "test");
        builder.bump("moves", turns);
        builder.seal(outcome, turns, turns, floor)
    }

    #[test]
    fn test_summary_tallies_outcomes() {
        let mut metrics = MetricsCollector::new("test");
        metrics.record_run(record(0, RunOutcome::Completed, 10, 3));
        metrics.record_run(record(1, RunOutcome::Died, 20, 1));
        metrics.record_run(record(2, RunOutcome::Died, 30, 2));

        let summary = metrics.summary();
        assert_eq!(summary.runs, 3);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.died, 2);
        assert_eq!(summary.max_floor, 3);
        assert_eq!(summary.counters.get("moves"), Some(&60));
        assert!((summary.mean_turns - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_summary() {
        let summary = MetricsCollector::new("none").summary();
        assert_eq!(summary.runs, 0);
        assert_eq!(summary.mean_turns, 0.0);
    }

    #[test]
    fn test_timer_records() {
        let mut metrics = MetricsCollector::new("t");
        let value = metrics.time("build", || 7);
        assert_eq!(value, 7);
        assert_eq!(metrics.summary().timers.get("build").map(|t| t.count), Some(1));
    }

    #[test]
    fn test_table_has_all_columns() {
        let table = MetricsCollector::new("t").summary().render_table();
        for column in ["runs", "completed", "died", "crashes", "tick-limit", "stalled"] {
            assert!(table.contains(column));
        }
    }

    #[test]
    fn test_summary_json_merges_scenarios() {
        let path = std::env::temp_dir().join(format!("delvekeep_summary_{}.json", std::process::id()));
        let _ = fs::remove_file(&path);

        write_summary_json(&path, &MetricsCollector::new("a").summary()).unwrap();
        write_summary_json(&path, &MetricsCollector::new("b").summary()).unwrap();
        let all: BTreeMap<String, BatchSummary> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(all.keys().cloned().collect::<Vec<_>>(), vec!["a", "b"]);
        let _ = fs::remove_file(&path);
    }
}
