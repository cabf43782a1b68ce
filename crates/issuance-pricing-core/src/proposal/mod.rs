pub mod status;

pub use status::{
    transition, ChangeKind, HistoryEntry, ProposalState, ProposalStatus, TransitionOutcome,
};
