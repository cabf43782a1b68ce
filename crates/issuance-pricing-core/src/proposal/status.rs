use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::PricingError;
use crate::types::normalize_label;
use crate::PricingResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    #[serde(rename = "rascunho", alias = "draft")]
    Draft,
    #[serde(rename = "enviada", alias = "sent")]
    Sent,
    #[serde(rename = "aceita", alias = "accepted")]
    Accepted,
    #[serde(rename = "rejeitada", alias = "rejected")]
    Rejected,
    #[serde(rename = "em_estruturacao", alias = "structuring")]
    Structuring,
}

impl ProposalStatus {
    pub fn code(&self) -> &'static str {
        match self {
            ProposalStatus::Draft => "rascunho",
            ProposalStatus::Sent => "enviada",
            ProposalStatus::Accepted => "aceita",
            ProposalStatus::Rejected => "rejeitada",
            ProposalStatus::Structuring => "em_estruturacao",
        }
    }

    /// Statuses reachable in one step.
    pub fn allowed_next(&self) -> &'static [ProposalStatus] {
        use ProposalStatus::*;
        match self {
            Draft => &[Sent, Accepted],
            Sent => &[Accepted, Rejected],
            Accepted => &[Structuring],
            Rejected => &[Draft],
            Structuring => &[],
        }
    }

    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ProposalStatus {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "rascunho" | "draft" => Ok(ProposalStatus::Draft),
            "enviada" | "sent" => Ok(ProposalStatus::Sent),
            "aceita" | "accepted" => Ok(ProposalStatus::Accepted),
            "rejeitada" | "rejected" => Ok(ProposalStatus::Rejected),
            "em_estruturacao" | "structuring" => Ok(ProposalStatus::Structuring),
            _ => Err(PricingError::InvalidInput {
                field: "status".into(),
                reason: format!("Unknown proposal status '{}'", s),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalState {
    pub status: ProposalStatus,
    pub version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Status,
}

/// Audit record written for every status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub version: u32,
    pub previous_status: ProposalStatus,
    pub new_status: ProposalStatus,
    pub change_kind: ChangeKind,
    pub reason: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub state: ProposalState,
    /// `None` when the status did not change
    pub history: Option<HistoryEntry>,
}

/// Move a proposal to `next`. Re-applying the current status is a no-op;
/// a real change bumps the version and yields a history entry.
pub fn transition(
    state: ProposalState,
    next: ProposalStatus,
    at: DateTime<Utc>,
    reason: Option<&str>,
) -> PricingResult<TransitionOutcome> {
    if state.status == next {
        return Ok(TransitionOutcome { state, history: None });
    }
    if !state.status.can_transition_to(next) {
        return Err(PricingError::InvalidStatusTransition {
            from: state.status.to_string(),
            to: next.to_string(),
        });
    }

    let version = state.version + 1;
    let entry = HistoryEntry {
        version,
        previous_status: state.status,
        new_status: next,
        change_kind: ChangeKind::Status,
        reason: reason
            .map(str::to_string)
            .unwrap_or_else(|| format!("Status alterado: {} → {}", state.status, next)),
        changed_at: at,
    };
    debug!(from = %state.status, to = %next, version, "proposal status changed");

    Ok(TransitionOutcome {
        state: ProposalState { status: next, version },
        history: Some(entry),
    })
}
