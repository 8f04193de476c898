use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("openvote: voter {0} is not registered in this session")]
    UnknownVoter(String),

    #[error("openvote: session is finished and accepts no further messages")]
    SessionFinished,

    #[error("openvote: no vote has been cast yet")]
    MissingVote,

    #[error("openvote: received {0} before the domain parameters")]
    MissingParameters(&'static str),

    #[error("openvote: JSON error decoding round payload: {0}")]
    PayloadDecode(#[from] serde_json::Error),

    #[error("openvote: unknown round number {0}")]
    InvalidRound(u8),

    #[error("openvote: missing round {round} payload for voter {voter_id}")]
    MissingPeerPayload { voter_id: String, round: u8 },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Protocol-integrity errors. Any of these is fatal to the session: a
/// forged or malformed proof is a security event, not a transient fault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("openvote validation: point is not on the curve")]
    InvalidPoint,

    #[error("openvote validation: domain parameters do not describe a valid curve")]
    InvalidParameters,

    #[error("openvote validation: proof verification failed for voter {0}")]
    ProofVerificationFailed(String),

    #[error("openvote validation: challenge does not recompute from the proof data of voter {0}")]
    MalformedChallenge(String),

    #[error("openvote validation: tallied sum is outside the feasible range")]
    TallyUnrecoverable,
}
