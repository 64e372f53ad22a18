//! Output structures for terminal display

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::types::{Trace, TraceReason, TraceStatus};

/// Summary of one step call, printed by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutput {
    pub timestamp: DateTime<Utc>,
    pub status: TraceStatus,
    pub reason: TraceReason,
    pub pair_count: usize,
    pub pos: String,
    pub neg: String,
    pub ended_at: Option<String>,
    pub fingerprint: String,
}

impl StepOutput {
    pub fn new(trace: &Trace, fingerprint: String) -> Self {
        Self {
            timestamp: Utc::now(),
            status: trace.status,
            reason: trace.reason,
            pair_count: trace.pairs.len(),
            pos: format!("{}@v{}", trace.pos_design.id, trace.pos_design.version),
            neg: format!("{}@v{}", trace.neg_design.id, trace.neg_design.version),
            ended_at: trace.reason_locus.as_ref().map(|l| l.to_string()),
            fingerprint,
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let head = format!("{} {}", self.status.symbol(), self.status).color(self.status.color()).bold();
        format!(
            "{} | {} ⟂ {} | pairs={} | at={} | {}",
            head,
            self.pos,
            self.neg,
            self.pair_count,
            self.ended_at.as_deref().unwrap_or("-"),
            self.reason.code().color(self.status.color())
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "status={} | pos={} | neg={} | pairs={} | at={} | reason={} | fp={}",
            self.status,
            self.pos,
            self.neg,
            self.pair_count,
            self.ended_at.as_deref().unwrap_or("-"),
            self.reason.code(),
            &self.fingerprint[..self.fingerprint.len().min(16)]
        )
    }
}

/// One line per pair, for `--verbose` listings
pub fn pair_lines(trace: &Trace) -> Vec<String> {
    trace
        .pairs
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mark = if trace.decisive_indices.contains(&i) { "*" } else { " " };
            format!(
                "{}{:>4} {:<12} + {:<16} - {}",
                mark,
                p.ts,
                p.locus.to_string(),
                p.pos_act_id.as_deref().unwrap_or("·"),
                p.neg_act_id.as_deref().unwrap_or("·")
            )
        })
        .collect()
}
