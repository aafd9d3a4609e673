//! Per-run records
//!
//! A record is assembled through [`RunRecordBuilder`] while the run is live
//! and sealed once at the end. Sealed records have no setters. Everything in
//! a record is derived from the seed, so two runs with the same seed produce
//! byte-identical JSON.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Reached the floor limit
    Completed,
    Died,
    /// Ran out of ticks
    TickLimit,
    /// The idle-tick backstop fired
    Stalled,
    /// A panic was caught inside the run
    Crashed,
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Died => "died",
            RunOutcome::TickLimit => "tick_limit",
            RunOutcome::Stalled => "stalled",
            RunOutcome::Crashed => "crashed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    run_index: u32,
    seed: u64,
    scenario: String,
    outcome: RunOutcome,
    turns: u64,
    ticks: u64,
    floor_reached: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    crash: Option<String>,
    counters: BTreeMap<String, u64>,
}

impl RunRecord {
    pub fn run_index(&self) -> u32 {
        self.run_index
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn floor_reached(&self) -> u32 {
        self.floor_reached
    }

    pub fn crash(&self) -> Option<&str> {
        self.crash.as_deref()
    }

    pub fn counters(&self) -> &BTreeMap<String, u64> {
        &self.counters
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Mutable accumulator for a run in progress
#[derive(Debug, Clone)]
pub struct RunRecordBuilder {
    run_index: u32,
    seed: u64,
    scenario: String,
    counters: BTreeMap<String, u64>,
    crash: Option<String>,
}

impl RunRecordBuilder {
    pub fn new(run_index: u32, seed: u64, scenario: impl Into<String>) -> Self {
        Self {
            run_index,
            seed,
            scenario: scenario.into(),
            counters: BTreeMap::new(),
            crash: None,
        }
    }

    pub fn bump(&mut self, counter: &str, by: u64) {
        *self.counters.entry(counter.to_string()).or_insert(0) += by;
    }

    pub fn set(&mut self, counter: &str, value: u64) {
        self.counters.insert(counter.to_string(), value);
    }

    pub fn counter(&self, counter: &str) -> u64 {
        self.counters.get(counter).copied().unwrap_or(0)
    }

    pub fn crashed(&mut self, message: impl Into<String>) {
        self.crash = Some(message.into());
    }

    pub fn seal(self, outcome: RunOutcome, turns: u64, ticks: u64, floor_reached: u32) -> RunRecord {
        RunRecord {
            run_index: self.run_index,
            seed: self.seed,
            scenario: self.scenario,
            outcome,
            turns,
            ticks,
            floor_reached,
            crash: self.crash,
            counters: self.counters,
        }
    }
}

/// Append records to a line-delimited JSON file
pub fn append_json_lines(path: &Path, records: &[RunRecord]) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for record in records {
        writeln!(file, "{}", record.to_json_line()?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_keeps_counters() {
        let mut builder = RunRecordBuilder::new(3, 99, "balanced");
        builder.bump("moves", 2);
        builder.bump("moves", 1);
        let record = builder.seal(RunOutcome::Died, 10, 12, 2);

        assert_eq!(record.counter("moves"), 3);
        assert_eq!(record.counter("missing"), 0);
        assert_eq!(record.outcome(), RunOutcome::Died);
        assert_eq!(record.floor_reached(), 2);
    }

    #[test]
    fn test_json_line_is_stable() {
        let mut builder = RunRecordBuilder::new(0, 1, "s");
        builder.bump("b", 1);
        builder.bump("a", 1);
        let line = builder.seal(RunOutcome::Completed, 1, 1, 1).to_json_line().unwrap();
        assert!(line.find("\"a\"").unwrap() < line.find("\"b\"").unwrap());
        assert!(line.contains("\"outcome\":\"completed\""));
        assert!(!line.contains("crash"));
    }

    #[test]
    fn test_append_json_lines() {
        let path = std::env::temp_dir().join(format!("delvekeep_records_{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let record = RunRecordBuilder::new(0, 1, "s").seal(RunOutcome::Stalled, 0, 0, 1);

        append_json_lines(&path, &[record.clone()]).unwrap();
        append_json_lines(&path, &[record]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let parsed: RunRecord = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(parsed.outcome(), RunOutcome::Stalled);
        let _ = std::fs::remove_file(&path);
    }
}
