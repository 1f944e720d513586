//! Outcome log for best-effort work that runs after a primary write has
//! committed (cashback credit, partner auto-assignment, event publishing).

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideEffect {
    pub name: &'static str,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SideEffectLog {
    entries: Vec<SideEffect>,
}

impl SideEffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeeded(&mut self, name: &'static str) {
        self.push(name, Outcome::Succeeded, None);
    }

    pub fn skipped(&mut self, name: &'static str, detail: impl Into<String>) {
        self.push(name, Outcome::Skipped, Some(detail.into()));
    }

    /// Records a failure and logs it; the caller carries on.
    pub fn failed(&mut self, name: &'static str, detail: impl Into<String>) {
        let detail = detail.into();
        warn!(side_effect = name, error = %detail, "side effect failed");
        self.push(name, Outcome::Failed, Some(detail));
    }

    fn push(&mut self, name: &'static str, outcome: Outcome, detail: Option<String>) {
        self.entries.push(SideEffect {
            name,
            outcome,
            detail,
        });
    }

    pub fn entries(&self) -> &[SideEffect] {
        &self.entries
    }

    pub fn outcome_of(&self, name: &str) -> Option<Outcome> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.name == name)
            .map(|e| e.outcome)
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| e.outcome == Outcome::Failed)
    }

    pub fn merge(&mut self, other: SideEffectLog) {
        self.entries.extend(other.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_outcome_wins() {
        let mut log = SideEffectLog::new();
        log.failed("assign_partner", "no partner nearby");
        log.succeeded("assign_partner");
        log.skipped("cashback", "no plan");

        assert_eq!(log.outcome_of("assign_partner"), Some(Outcome::Succeeded));
        assert_eq!(log.outcome_of("cashback"), Some(Outcome::Skipped));
        assert_eq!(log.outcome_of("events"), None);
        assert!(log.has_failures());
        assert_eq!(log.entries().len(), 3);
    }

    #[test]
    fn serializes_as_a_list() {
        let mut log = SideEffectLog::new();
        log.succeeded("cashback");
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json, serde_json::json!([{"name": "cashback", "outcome": "succeeded"}]));
    }
}
