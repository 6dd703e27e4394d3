use crate::*;

use thiserror::Error;

/// Broad classification of a failed invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidState,
    InvalidCandidate,
    AlreadySubmitted,
    AlreadyDisclosed,
    EndorsementPolicyViolation,
    InvalidArgument,
    Unauthorized,
    Conflict,
    Internal,
}

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("evoting: CBOR error packing or unpacking state: {0}")]
    CBOR(#[from] serde_cbor::Error),

    #[error("evoting: JSON error: {0}")]
    JSON(#[from] serde_json::Error),

    #[error("evoting: cannot decode identity: {0}")]
    IdentityBadBase64(#[from] base64::DecodeError),

    #[error("evoting: identity is not valid UTF-8")]
    IdentityNotUtf8,

    #[error("evoting: invalid transaction id - invalid hexidecimal")]
    TransactionIdBadHex,

    #[error("evoting: invalid transaction id - wrong length")]
    TransactionIdBadLen,

    #[error("evoting: error deserializing operation: unknown format")]
    DeserializationUnknownFormat,

    #[error("evoting: unknown operation {0}")]
    UnknownOperation(String),

    #[error("evoting: {0} takes {1} argument(s), {2} given")]
    WrongArgumentCount(OperationType, usize, usize),

    #[error("evoting: organization {0} is not a member of the channel")]
    UnknownOrganization(OrgId),

    #[error("evoting: {0} is read-only and cannot be submitted for ordering")]
    NotSubmittable(OperationType),

    #[error("evoting: {0} changes state and must be submitted for endorsement")]
    NotEvaluable(OperationType),

    #[error("evoting: endorsement results for transaction {0} do not match across organizations")]
    EndorsementMismatch(TransactionId),

    #[error("evoting: MVCC read conflict on {key:?} in transaction {tx_id}")]
    MvccReadConflict { tx_id: TransactionId, key: String },

    #[error("evoting: transaction {0} has already been committed")]
    DuplicateTransaction(TransactionId),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(e) => e.kind(),
            Error::IdentityBadBase64(_)
            | Error::IdentityNotUtf8
            | Error::TransactionIdBadHex
            | Error::TransactionIdBadLen
            | Error::DeserializationUnknownFormat
            | Error::UnknownOperation(_)
            | Error::WrongArgumentCount(..)
            | Error::NotSubmittable(_)
            | Error::NotEvaluable(_) => ErrorKind::InvalidArgument,
            Error::UnknownOrganization(_) => ErrorKind::Unauthorized,
            Error::EndorsementMismatch(_)
            | Error::MvccReadConflict { .. }
            | Error::DuplicateTransaction(_) => ErrorKind::Conflict,
            Error::CBOR(_) | Error::JSON(_) => ErrorKind::Internal,
        }
    }
}

/// Contract validation errors
///
/// Every one of these is raised before the invocation writes anything.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("evoting validation: election {0:?} does not exist")]
    ElectionNotFound(String),

    #[error("evoting validation: election {0:?} already exists")]
    ElectionAlreadyExists(String),

    #[error("evoting validation: ballot {transaction_id} not found in election {election:?}")]
    BallotNotFound {
        election: String,
        transaction_id: TransactionId,
    },

    #[error("evoting validation: vote {transaction_id} in election {election:?} has not been disclosed")]
    DisclosedVoteNotFound {
        election: String,
        transaction_id: TransactionId,
    },

    #[error("evoting validation: election {election:?} is {status}, must be {required}")]
    InvalidState {
        election: String,
        status: ElectionStatus,
        required: ElectionStatus,
    },

    #[error("evoting validation: {0:?} is not a candidate in this election")]
    InvalidCandidate(String),

    #[error("evoting validation: ballot {0} has already been submitted")]
    AlreadySubmitted(TransactionId),

    #[error("evoting validation: ballot {0} has already been disclosed")]
    AlreadyDisclosed(TransactionId),

    #[error("evoting validation: {operation} requires endorsement from {missing}")]
    EndorsementPolicyViolation {
        operation: OperationType,
        missing: String,
    },

    #[error("evoting validation: invalid argument: {0}")]
    InvalidArgument(String),

    #[error("evoting validation: transient field {0:?} is missing")]
    MissingTransient(String),

    #[error("evoting validation: malformed vote payload: {0}")]
    MalformedPayload(String),

    #[error("evoting validation: vote payload does not match the commitment of ballot {0}")]
    CommitmentMismatch(TransactionId),

    #[error("evoting validation: only the voter can cast or disclose this ballot")]
    NotBallotOwner,

    #[error("evoting validation: only the organizer can close election {0:?}")]
    NotOrganizer(String),

    #[error("evoting validation: client from {client} cannot use a peer of {peer}")]
    OrganizationMismatch { client: OrgId, peer: OrgId },

    #[error("evoting validation: no votes have been disclosed in election {0:?}")]
    NoDisclosedVotes(String),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::ElectionNotFound(_)
            | ValidationError::BallotNotFound { .. }
            | ValidationError::DisclosedVoteNotFound { .. } => ErrorKind::NotFound,
            ValidationError::ElectionAlreadyExists(_) => ErrorKind::AlreadyExists,
            ValidationError::InvalidState { .. } | ValidationError::NoDisclosedVotes(_) => {
                ErrorKind::InvalidState
            }
            ValidationError::InvalidCandidate(_) => ErrorKind::InvalidCandidate,
            ValidationError::AlreadySubmitted(_) => ErrorKind::AlreadySubmitted,
            ValidationError::AlreadyDisclosed(_) => ErrorKind::AlreadyDisclosed,
            ValidationError::EndorsementPolicyViolation { .. } => {
                ErrorKind::EndorsementPolicyViolation
            }
            ValidationError::InvalidArgument(_)
            | ValidationError::MissingTransient(_)
            | ValidationError::MalformedPayload(_)
            | ValidationError::CommitmentMismatch(_) => ErrorKind::InvalidArgument,
            ValidationError::NotBallotOwner
            | ValidationError::NotOrganizer(_)
            | ValidationError::OrganizationMismatch { .. } => ErrorKind::Unauthorized,
        }
    }
}
