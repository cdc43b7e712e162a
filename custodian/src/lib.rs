//! Custodian elections for decentralized communities.
//!
//! Members vote for candidates with weight proportional to their live token
//! balance; every period the top-ranked candidates (by a recency-decayed
//! score) are promoted into a paid custodian set, and the treasury budget
//! is split between proposal funding and spending accounts.
//!
//! The accounting stays consistent under three independent mutation paths:
//! direct voting, proxy (de)registration, and balance-change notifications
//! pushed by the token contract. Every action is all-or-nothing: a
//! rejected action leaves community state untouched.

pub mod balance;
pub mod budget;
pub mod community;
pub mod config;
pub mod election;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod payout;
pub mod registry;

pub use balance::{BalanceChange, BalanceLookup, StaticBalances};
pub use budget::{claim_budget, BudgetAccounts};
pub use community::{Community, CommunityAccounts};
pub use config::{ConfigUpdate, DacConfig};
pub use election::{
    AuthorityUpdate, Custodian, ElectionScheduler, ElectionState, PeriodOutcome,
};
pub use engine::CustodianEngine;
pub use error::{CustodianError, ErrorKind};
pub use ledger::{ProxyRecord, Vote, VoteChoice, VoteLedger};
pub use payout::{PayoutQueue, PendingPayment, Transfer};
pub use registry::{Candidate, CandidateRegistry};
