//! Per-target reconciliation results
//!
//! Outcomes are produced once per orchestration pass and never mutated
//! afterwards.

use serde::{Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;

/// The step at which a target's reconciliation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    /// Public IP could not be resolved
    Ip,
    /// Token exchange failed
    Token,
    /// Listing the existing entries failed
    List,
    /// Creating the entry failed
    Create,
}

impl FailureStage {
    /// Lowercase stage label used in logs and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Ip => "ip",
            FailureStage::Token => "token",
            FailureStage::List => "list",
            FailureStage::Create => "create",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of one target's reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// A new entry was created
    Created { rule_name: String },
    /// An entry for the current IP already existed
    AlreadyPresent { rule_name: String },
    /// Client secret or subscription missing; nothing was attempted
    SkippedMissingCredential,
    /// Reconciliation stopped at `stage`
    Failed { stage: FailureStage, reason: String },
}

impl OutcomeStatus {
    pub(crate) fn failed(stage: FailureStage, err: &crate::Error) -> Self {
        OutcomeStatus::Failed {
            stage,
            reason: err.to_string(),
        }
    }

    /// Whether this is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, OutcomeStatus::Failed { .. })
    }
}

/// Result of reconciling one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationOutcome {
    /// Logical target name
    pub target: String,

    /// Address reconciled against (`"unknown"` when resolution failed)
    #[serde(serialize_with = "serialize_ip_or_unknown")]
    pub public_ip: Option<IpAddr>,

    /// What happened
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ReconciliationOutcome {
    /// Build an outcome for `target`
    pub fn new(target: impl Into<String>, public_ip: Option<IpAddr>, status: OutcomeStatus) -> Self {
        Self {
            target: target.into(),
            public_ip,
            status,
        }
    }

    /// The resolved address as text, or `"unknown"`
    pub fn public_ip_display(&self) -> String {
        self.public_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ip = self.public_ip_display();
        match &self.status {
            OutcomeStatus::Created { rule_name } => {
                write!(f, "{}: created rule '{}' for {}", self.target, rule_name, ip)
            }
            OutcomeStatus::AlreadyPresent { rule_name } => {
                write!(f, "{}: rule '{}' already allows {}", self.target, rule_name, ip)
            }
            OutcomeStatus::SkippedMissingCredential => {
                write!(f, "{}: skipped (missing credential)", self.target)
            }
            OutcomeStatus::Failed { stage, reason } => {
                write!(f, "{}: failed at {} for {}: {}", self.target, stage, ip, reason)
            }
        }
    }
}

fn serialize_ip_or_unknown<S>(ip: &Option<IpAddr>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match ip {
        Some(ip) => serializer.collect_str(ip),
        None => serializer.serialize_str("unknown"),
    }
}

/// All outcomes of one orchestration pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    #[serde(serialize_with = "serialize_ip_or_unknown")]
    pub public_ip: Option<IpAddr>,
    pub outcomes: Vec<ReconciliationOutcome>,
}

impl ReconciliationReport {
    /// Outcome for a target, by name
    pub fn outcome(&self, target: &str) -> Option<&ReconciliationOutcome> {
        self.outcomes.iter().find(|o| o.target == target)
    }

    /// Number of targets that got a new entry
    pub fn created(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Created { .. }))
    }

    /// Number of targets whose entry already existed
    pub fn already_present(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::AlreadyPresent { .. }))
    }

    /// Number of targets skipped for missing credentials
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::SkippedMissingCredential))
    }

    /// Number of failed targets
    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::is_failure)
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_json_shape() {
        let outcome = ReconciliationOutcome::new(
            "T1",
            Some("203.0.113.5".parse().unwrap()),
            OutcomeStatus::Created {
                rule_name: "Automatic IP".to_string(),
            },
        );

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "target": "T1",
                "public_ip": "203.0.113.5",
                "kind": "created",
                "rule_name": "Automatic IP"
            })
        );
    }

    #[test]
    fn test_unknown_ip_in_failure() {
        let outcome = ReconciliationOutcome::new(
            "T1",
            None,
            OutcomeStatus::Failed {
                stage: FailureStage::Ip,
                reason: "timeout".to_string(),
            },
        );

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["public_ip"], "unknown");
        assert_eq!(json["stage"], "ip");
        assert_eq!(outcome.to_string(), "T1: failed at ip for unknown: timeout");
    }

    #[test]
    fn test_report_counters() {
        let report = ReconciliationReport {
            public_ip: None,
            outcomes: vec![
                ReconciliationOutcome::new("a", None, OutcomeStatus::SkippedMissingCredential),
                ReconciliationOutcome::new(
                    "b",
                    None,
                    OutcomeStatus::Failed {
                        stage: FailureStage::Token,
                        reason: "denied".to_string(),
                    },
                ),
            ],
        };

        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.created(), 0);
        assert!(report.outcome("b").is_some());
        assert!(report.outcome("c").is_none());
    }
}
