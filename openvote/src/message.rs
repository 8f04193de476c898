//! The messages exchanged between the coordinator and its voters.
//!
//! Transport-agnostic: any reliable ordered channel works. The library
//! never performs I/O; coordinator operations return the outbound
//! messages for the embedder to deliver.

use crate::*;

/// The stages of a voting session, in protocol order.
///
/// `AlreadyStarted` is only ever sent as a reply to a late registration;
/// a session itself never enters it.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    WaitingToCommence,
    AlreadyStarted,
    DistributingDomainParameters,
    Round1,
    Round1PayloadBroadcast,
    Round1ZkpCheck,
    Round2,
    Round2PayloadBroadcast,
    Round2ZkpCheck,
    VotingResultCalculation,
    Finished,
}

impl SessionState {
    /// The successor stage. `Finished` is terminal and `AlreadyStarted`
    /// is not part of the sequence.
    pub fn next(self) -> Option<SessionState> {
        use SessionState::*;
        match self {
            WaitingToCommence => Some(DistributingDomainParameters),
            DistributingDomainParameters => Some(Round1),
            Round1 => Some(Round1PayloadBroadcast),
            Round1PayloadBroadcast => Some(Round1ZkpCheck),
            Round1ZkpCheck => Some(Round2),
            Round2 => Some(Round2PayloadBroadcast),
            Round2PayloadBroadcast => Some(Round2ZkpCheck),
            Round2ZkpCheck => Some(VotingResultCalculation),
            VotingResultCalculation => Some(Finished),
            Finished => None,
            AlreadyStarted => None,
        }
    }
}

/// An opaque per-round envelope: the round body travels as its JSON
/// encoding, so the coordinator stores and redistributes payloads
/// without understanding them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoundPayload {
    pub voter_id: String,
    pub round: u8,
    pub payload: String,
}

impl RoundPayload {
    pub fn from_round1(body: &Round1Payload) -> Result<Self, Error> {
        Ok(RoundPayload {
            voter_id: body.voter_id.clone(),
            round: 1,
            payload: serde_json::to_string(body)?,
        })
    }

    pub fn from_round2(body: &Round2Payload) -> Result<Self, Error> {
        Ok(RoundPayload {
            voter_id: body.voter_id.clone(),
            round: 2,
            payload: serde_json::to_string(body)?,
        })
    }

    pub fn decode_round1(&self) -> Result<Round1Payload, Error> {
        Ok(serde_json::from_str(&self.payload)?)
    }

    pub fn decode_round2(&self) -> Result<Round2Payload, Error> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

/// A message from the coordinator to voters.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Stage transition notice
    State(SessionState),
    /// Curve setup for the session
    DomainParameters(DomainParameters),
    /// All payloads of the finished round, ordered by voter id
    RoundPayloads(Vec<RoundPayload>),
    /// The ballot question; display only, no protocol effect
    Question(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Recipient {
    AllVoters,
    Caller,
}

/// One message addressed to either every voter or the calling voter.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipient,
    pub message: Message,
}

impl Outbound {
    pub fn all(message: Message) -> Self {
        Outbound {
            to: Recipient::AllVoters,
            message,
        }
    }

    pub fn caller(message: Message) -> Self {
        Outbound {
            to: Recipient::Caller,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_sequence_is_linear_and_terminal() {
        let mut state = SessionState::WaitingToCommence;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            state = next;
            seen.push(state);
        }

        assert_eq!(state, SessionState::Finished);
        assert_eq!(seen.len(), 10);
        assert!(!seen.contains(&SessionState::AlreadyStarted));
    }

    #[test]
    fn already_started_has_no_successor() {
        assert_eq!(SessionState::AlreadyStarted.next(), None);
    }
}
