use dac_types::{MemberName, TokenAmount};
use thiserror::Error;

/// Classification of a failure, mirroring the error taxonomy the external
/// tooling greps for: configuration, authority, state-machine, lookup, and
/// accounting failures. Every error aborts the whole action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Authority,
    State,
    NotFound,
    Arithmetic,
}

#[derive(Debug, Error)]
pub enum CustodianError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("ERR::UPDATECONFIG_INVALID_NUM_ELECTED::number of elected custodians must be <= {max}, got {got}")]
    InvalidNumElected { got: u8, max: u8 },

    #[error("ERR::UPDATECONFIG_INVALID_MAX_VOTES::max votes ({maxvotes}) must not exceed the number of elected custodians ({numelected})")]
    InvalidMaxVotes { maxvotes: u8, numelected: u8 },

    #[error("ERR::UPDATECONFIG_PERIOD_LENGTH::period length {got}s exceeds the {max}s maximum")]
    InvalidPeriodLength { got: u32, max: u32 },

    #[error("ERR::UPDATECONFIG_PENDING_PERIOD_LENGTH::pending period delay {delay}s cannot exceed the period length {period}s")]
    InvalidPendingDelay { delay: u32, period: u32 },

    #[error("ERR::UPDATECONFIG_INVALID_INITIAL_VOTE_QUORUM_PERCENT::initial vote quorum percent must be below 100, got {0}")]
    InvalidInitialQuorum(u32),

    #[error("ERR::UPDATECONFIG_INVALID_VOTE_QUORUM_PERCENT::vote quorum percent must be below 100, got {0}")]
    InvalidVoteQuorum(u32),

    #[error("ERR::UPDATECONFIG_INVALID_TOKEN_THRESHOLD::token supply threshold must be at least {min} raw units, got {got}")]
    InvalidSupplyThreshold { got: u64, min: u64 },

    #[error("ERR::UPDATECONFIG_INVALID_AUTH_HIGH_TO_NUM_ELECTED::auth threshold {threshold} can never be satisfied by {numelected} custodians")]
    AuthThresholdTooHigh { threshold: u8, numelected: u8 },

    #[error("ERR::UPDATECONFIG_INVALID_AUTH_HIGH_TO_MID_AUTH::mid auth threshold {mid} cannot exceed the high auth threshold {high}")]
    AuthMidAboveHigh { mid: u8, high: u8 },

    #[error("ERR::UPDATECONFIG_INVALID_AUTH_MID_TO_LOW_AUTH::low auth threshold {low} cannot exceed the mid auth threshold {mid}")]
    AuthLowAboveMid { low: u8, mid: u8 },

    // ── Authority ────────────────────────────────────────────────────────
    #[error("ERR::MISSING_REQUIRED_AUTHORITY::action requires the authority of {required}, called by {caller}")]
    MissingAuthority {
        required: MemberName,
        caller: MemberName,
    },

    // ── State ────────────────────────────────────────────────────────────
    #[error("ERR::NEWPERIOD_EARLY::new period called too soon, period length is {period_length}s but only {elapsed}s elapsed")]
    PeriodTooEarly { period_length: u32, elapsed: u64 },

    #[error("ERR::NEWPERIOD_PENDING_EARLY::new period called too soon while pending, delay is {delay}s but only {elapsed}s elapsed")]
    PendingPeriodTooEarly { delay: u32, elapsed: u64 },

    #[error("ERR::NEWPERIOD_VOTER_ENGAGEMENT_LOW_ACTIVATE::voter engagement is insufficient to activate the community ({required}% of supply required)")]
    EngagementTooLowToActivate { required: u32 },

    #[error("ERR::NEWPERIOD_VOTER_ENGAGEMENT_LOW_PROCESS::voter engagement is insufficient to process a new period ({required}% of supply required)")]
    EngagementTooLow { required: u32 },

    #[error("ERR::NEWPERIOD_TOKEN_SUPPLY_TOO_LOW::token supply {supply} is below the {threshold} threshold")]
    SupplyTooLow { supply: u64, threshold: u64 },

    #[error("ERR::NEWPERIOD_NOT_ENOUGH_CANDIDATES::not enough eligible candidates with votes to elect {required} custodians")]
    NotEnoughCandidates { required: u8 },

    #[error("ERR::CLAIMBUDGET_ONCE_PER_PERIOD::budget already claimed for the current period")]
    BudgetAlreadyClaimed,

    #[error("ERR::CLAIMBUDGET_NOT_CONFIGURED::no budget percentage or fixed budget amounts are configured")]
    BudgetNotConfigured,

    #[error("ERR::PAYMENT_NOT_RECEIVER::pending payment {0} can only be claimed or rejected by its receiver")]
    NotPaymentReceiver(u64),

    #[error("ERR::CUSTODIANS_NOT_EMPTY::custodians can only be appointed while the custodian set is empty")]
    CustodiansNotEmpty,

    #[error("ERR::NOMINATECAND_ALREADY_REGISTERED::candidate {0} is already registered and active")]
    AlreadyNominated(MemberName),

    #[error("ERR::NOMINATECAND_PAY_LIMIT_EXCEEDED::requested pay {requested} exceeds the configured maximum {max}")]
    RequestedPayTooHigh {
        requested: TokenAmount,
        max: TokenAmount,
    },

    #[error("ERR::REMOVECANDIDATE_CANDIDATE_NOT_ACTIVE::candidate {0} is not active")]
    CandidateNotActive(MemberName),

    #[error("ERR::NOT_IN_WHITELIST::candidate {0} is not in the whitelist")]
    NotInWhitelist(MemberName),

    #[error("ERR::CAND_WL_ALREADY_EXISTS::{0} already exists in the whitelist")]
    AlreadyWhitelisted(MemberName),

    #[error("ERR::USER_REGISTERED_CANDIDATE::{0} is currently a registered candidate")]
    StillRegisteredCandidate(MemberName),

    #[error("ERR::VOTECUST_MAX_VOTES_EXCEEDED::ballot lists {got} candidates but the maximum is {max}")]
    TooManyVotes { got: usize, max: u8 },

    #[error("ERR::VOTECUST_DUPLICATE_VOTE::ballot lists candidate {0} more than once")]
    DuplicateBallotEntry(MemberName),

    #[error("ERR::VOTEPROXY_SELF::cannot delegate votes to yourself")]
    SelfProxy,

    #[error("ERR::VOTEPROXY_PROXY_VOTES_PROXY::a registered proxy cannot delegate to another proxy")]
    ProxyVotesProxy,

    #[error("ERR::REGPROXY_ALREADY_REGISTERED::{0} is already registered as a proxy")]
    ProxyAlreadyRegistered(MemberName),

    #[error("ERR::UNREGPROXY_NOT_REGISTERED::{0} is not registered as a proxy")]
    ProxyNotRegistered(MemberName),

    #[error("ERR::VOTEPROXY_PROXY_NOT_REGISTERED::cannot delegate to {0}, not a registered proxy")]
    VoteProxyNotRegistered(MemberName),

    // ── NotFound ─────────────────────────────────────────────────────────
    #[error("ERR::COMMUNITY_NOT_FOUND::community {0} does not exist")]
    CommunityNotFound(String),

    #[error("ERR::COMMUNITY_EXISTS::community {0} already exists")]
    CommunityExists(String),

    #[error("ERR::REMOVECANDIDATE_NOT_CURRENT_CANDIDATE::{0} is not a registered candidate")]
    CandidateNotFound(MemberName),

    #[error("ERR::REMOVECUSTODIAN_NOT_CURRENT_CUSTODIAN::{0} is not a current custodian")]
    CustodianNotFound(MemberName),

    #[error("ERR::CAND_WL_NOT_FOUND::{0} not found in the whitelist")]
    WhitelistEntryNotFound(MemberName),

    #[error("ERR::PAYMENT_NOT_FOUND::pending payment {0} does not exist")]
    PaymentNotFound(u64),

    // ── Arithmetic ───────────────────────────────────────────────────────
    #[error("ERR::OVERFLOW::arithmetic overflow in {0}")]
    Overflow(&'static str),
}

impl CustodianError {
    /// The stable, greppable error code (the `ERR::NAME` prefix of the
    /// display output).
    pub fn code(&self) -> &'static str {
        let message = match self {
            Self::InvalidNumElected { .. } => "ERR::UPDATECONFIG_INVALID_NUM_ELECTED",
            Self::InvalidMaxVotes { .. } => "ERR::UPDATECONFIG_INVALID_MAX_VOTES",
            Self::InvalidPeriodLength { .. } => "ERR::UPDATECONFIG_PERIOD_LENGTH",
            Self::InvalidPendingDelay { .. } => "ERR::UPDATECONFIG_PENDING_PERIOD_LENGTH",
            Self::InvalidInitialQuorum(_) => {
                "ERR::UPDATECONFIG_INVALID_INITIAL_VOTE_QUORUM_PERCENT"
            }
            Self::InvalidVoteQuorum(_) => "ERR::UPDATECONFIG_INVALID_VOTE_QUORUM_PERCENT",
            Self::InvalidSupplyThreshold { .. } => "ERR::UPDATECONFIG_INVALID_TOKEN_THRESHOLD",
            Self::AuthThresholdTooHigh { .. } => {
                "ERR::UPDATECONFIG_INVALID_AUTH_HIGH_TO_NUM_ELECTED"
            }
            Self::AuthMidAboveHigh { .. } => "ERR::UPDATECONFIG_INVALID_AUTH_HIGH_TO_MID_AUTH",
            Self::AuthLowAboveMid { .. } => "ERR::UPDATECONFIG_INVALID_AUTH_MID_TO_LOW_AUTH",
            Self::MissingAuthority { .. } => "ERR::MISSING_REQUIRED_AUTHORITY",
            Self::PeriodTooEarly { .. } => "ERR::NEWPERIOD_EARLY",
            Self::PendingPeriodTooEarly { .. } => "ERR::NEWPERIOD_PENDING_EARLY",
            Self::EngagementTooLowToActivate { .. } => {
                "ERR::NEWPERIOD_VOTER_ENGAGEMENT_LOW_ACTIVATE"
            }
            Self::EngagementTooLow { .. } => "ERR::NEWPERIOD_VOTER_ENGAGEMENT_LOW_PROCESS",
            Self::SupplyTooLow { .. } => "ERR::NEWPERIOD_TOKEN_SUPPLY_TOO_LOW",
            Self::NotEnoughCandidates { .. } => "ERR::NEWPERIOD_NOT_ENOUGH_CANDIDATES",
            Self::BudgetAlreadyClaimed => "ERR::CLAIMBUDGET_ONCE_PER_PERIOD",
            Self::BudgetNotConfigured => "ERR::CLAIMBUDGET_NOT_CONFIGURED",
            Self::NotPaymentReceiver(_) => "ERR::PAYMENT_NOT_RECEIVER",
            Self::CustodiansNotEmpty => "ERR::CUSTODIANS_NOT_EMPTY",
            Self::AlreadyNominated(_) => "ERR::NOMINATECAND_ALREADY_REGISTERED",
            Self::RequestedPayTooHigh { .. } => "ERR::NOMINATECAND_PAY_LIMIT_EXCEEDED",
            Self::CandidateNotActive(_) => "ERR::REMOVECANDIDATE_CANDIDATE_NOT_ACTIVE",
            Self::NotInWhitelist(_) => "ERR::NOT_IN_WHITELIST",
            Self::AlreadyWhitelisted(_) => "ERR::CAND_WL_ALREADY_EXISTS",
            Self::StillRegisteredCandidate(_) => "ERR::USER_REGISTERED_CANDIDATE",
            Self::TooManyVotes { .. } => "ERR::VOTECUST_MAX_VOTES_EXCEEDED",
            Self::DuplicateBallotEntry(_) => "ERR::VOTECUST_DUPLICATE_VOTE",
            Self::SelfProxy => "ERR::VOTEPROXY_SELF",
            Self::ProxyVotesProxy => "ERR::VOTEPROXY_PROXY_VOTES_PROXY",
            Self::ProxyAlreadyRegistered(_) => "ERR::REGPROXY_ALREADY_REGISTERED",
            Self::ProxyNotRegistered(_) => "ERR::UNREGPROXY_NOT_REGISTERED",
            Self::VoteProxyNotRegistered(_) => "ERR::VOTEPROXY_PROXY_NOT_REGISTERED",
            Self::CommunityNotFound(_) => "ERR::COMMUNITY_NOT_FOUND",
            Self::CommunityExists(_) => "ERR::COMMUNITY_EXISTS",
            Self::CandidateNotFound(_) => "ERR::REMOVECANDIDATE_NOT_CURRENT_CANDIDATE",
            Self::CustodianNotFound(_) => "ERR::REMOVECUSTODIAN_NOT_CURRENT_CUSTODIAN",
            Self::WhitelistEntryNotFound(_) => "ERR::CAND_WL_NOT_FOUND",
            Self::PaymentNotFound(_) => "ERR::PAYMENT_NOT_FOUND",
            Self::Overflow(_) => "ERR::OVERFLOW",
        };
        message
    }

    /// Which class of failure this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidNumElected { .. }
            | Self::InvalidMaxVotes { .. }
            | Self::InvalidPeriodLength { .. }
            | Self::InvalidPendingDelay { .. }
            | Self::InvalidInitialQuorum(_)
            | Self::InvalidVoteQuorum(_)
            | Self::InvalidSupplyThreshold { .. }
            | Self::AuthThresholdTooHigh { .. }
            | Self::AuthMidAboveHigh { .. }
            | Self::AuthLowAboveMid { .. } => ErrorKind::Config,
            Self::MissingAuthority { .. } => ErrorKind::Authority,
            Self::PeriodTooEarly { .. }
            | Self::PendingPeriodTooEarly { .. }
            | Self::EngagementTooLowToActivate { .. }
            | Self::EngagementTooLow { .. }
            | Self::SupplyTooLow { .. }
            | Self::NotEnoughCandidates { .. }
            | Self::BudgetAlreadyClaimed
            | Self::BudgetNotConfigured
            | Self::NotPaymentReceiver(_)
            | Self::CustodiansNotEmpty
            | Self::AlreadyNominated(_)
            | Self::RequestedPayTooHigh { .. }
            | Self::CandidateNotActive(_)
            | Self::NotInWhitelist(_)
            | Self::AlreadyWhitelisted(_)
            | Self::StillRegisteredCandidate(_)
            | Self::TooManyVotes { .. }
            | Self::DuplicateBallotEntry(_)
            | Self::SelfProxy
            | Self::ProxyVotesProxy
            | Self::ProxyAlreadyRegistered(_)
            | Self::ProxyNotRegistered(_)
            | Self::VoteProxyNotRegistered(_) => ErrorKind::State,
            Self::CommunityNotFound(_)
            | Self::CommunityExists(_)
            | Self::CandidateNotFound(_)
            | Self::CustodianNotFound(_)
            | Self::WhitelistEntryNotFound(_)
            | Self::PaymentNotFound(_) => ErrorKind::NotFound,
            Self::Overflow(_) => ErrorKind::Arithmetic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_matches_display_prefix() {
        let err = CustodianError::BudgetAlreadyClaimed;
        assert!(err.to_string().starts_with(err.code()));

        let err = CustodianError::PeriodTooEarly {
            period_length: 604_800,
            elapsed: 10,
        };
        assert!(err.to_string().starts_with(err.code()));
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_kinds_cover_taxonomy() {
        assert_eq!(
            CustodianError::InvalidVoteQuorum(150).kind(),
            ErrorKind::Config
        );
        assert_eq!(
            CustodianError::CommunityNotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CustodianError::Overflow("running_weight_time").kind(),
            ErrorKind::Arithmetic
        );
    }
}
