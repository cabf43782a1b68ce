use chrono::Utc;
use clap::Args;
use serde_json::Value;

use issuance_pricing_core::proposal::{transition, ProposalState, ProposalStatus};

/// Arguments for a proposal status change
#[derive(Args)]
pub struct TransitionArgs {
    /// Current status (rascunho, enviada, aceita, rejeitada, em_estruturacao)
    #[arg(long)]
    pub from: String,

    /// Requested status
    #[arg(long)]
    pub to: String,

    /// Current proposal version
    #[arg(long, default_value_t = 1)]
    pub version: u32,

    /// Free-text reason recorded in the history entry
    #[arg(long)]
    pub reason: Option<String>,
}

pub fn run_transition(args: TransitionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let state = ProposalState {
        status: args.from.parse::<ProposalStatus>()?,
        version: args.version,
    };
    let next: ProposalStatus = args.to.parse()?;
    let outcome = transition(state, next, Utc::now(), args.reason.as_deref())?;
    Ok(serde_json::to_value(outcome)?)
}
