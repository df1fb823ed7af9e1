//! Plan tracking
//!
//! Each model turn may declare an ordered list of steps. The tracker holds
//! the latest list; a new model turn replaces it wholesale.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Progress of a single plan step. Ordered: a step only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Pending,
    Active,
    Completed,
}

impl PlanStatus {
    fn glyph(self) -> &'static str {
        match self {
            PlanStatus::Pending => "○",
            PlanStatus::Active => "◐",
            PlanStatus::Completed => "●",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub text: String,
    #[serde(default)]
    pub status: PlanStatus,
}

impl PlanStep {
    pub fn pending(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: PlanStatus::Pending,
        }
    }
}

/// Holds the plan declared by the most recent model turn
#[derive(Debug, Clone, Default)]
pub struct PlanTracker {
    steps: Vec<PlanStep>,
}

impl PlanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current plan. Every step starts pending; blank
    /// descriptions are dropped.
    pub fn replace<I, S>(&mut self, descriptions: I) -> &[PlanStep]
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.steps = descriptions
            .into_iter()
            .filter_map(|d| {
                let text = d.as_ref().trim();
                (!text.is_empty()).then(|| PlanStep::pending(text))
            })
            .collect();
        &self.steps
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// One line per step, prefixed with a status glyph
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = write!(out, "{} {}", step.status.glyph(), step.text);
        }
        out
    }
}
