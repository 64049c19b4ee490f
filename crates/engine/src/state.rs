use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

use common::Symbol;
use risk::SignalCap;

/// Decision records kept in memory.
pub const DECISION_LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Signalled,
    /// Actionable, but the daily cap was already reached.
    Suppressed,
    DispatchFailed,
    Wait,
    /// Classifier, parse or validation failure, handled as WAIT.
    Rejected(&'static str),
    /// Data or render failure; the symbol was not analyzed this cycle.
    Skipped(&'static str),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Signalled => write!(f, "signalled"),
            Outcome::Suppressed => write!(f, "suppressed (cap reached)"),
            Outcome::DispatchFailed => write!(f, "dispatch failed"),
            Outcome::Wait => write!(f, "wait"),
            Outcome::Rejected(kind) => write!(f, "rejected ({kind})"),
            Outcome::Skipped(kind) => write!(f, "skipped ({kind})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    pub at: DateTime<Utc>,
    pub symbol: Symbol,
    pub outcome: Outcome,
}

/// Most recent decisions, oldest dropped first.
#[derive(Debug, Clone, Default)]
pub struct DecisionLog {
    records: VecDeque<DecisionRecord>,
}

impl DecisionLog {
    pub fn push(&mut self, record: DecisionRecord) {
        if self.records.len() == DECISION_LOG_CAPACITY {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecisionRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&DecisionRecord> {
        self.records.back()
    }
}

/// Everything the orchestrator carries from one cycle to the next.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub candidates: Vec<Symbol>,
    pub cap: SignalCap,
    pub log: DecisionLog,
}

impl SessionState {
    pub fn new(daily_cap: u32, now: DateTime<Utc>) -> Self {
        Self {
            candidates: Vec::new(),
            cap: SignalCap::new(daily_cap, now),
            log: DecisionLog::default(),
        }
    }

    pub fn record(&mut self, symbol: &Symbol, outcome: Outcome, at: DateTime<Utc>) {
        self.log.push(DecisionRecord {
            at,
            symbol: symbol.clone(),
            outcome,
        });
    }
}
