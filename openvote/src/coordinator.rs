//! The session coordinator.
//!
//! One coordinator per session, trusted for liveness only: it admits
//! voters up to quorum, walks the stage sequence, barrier-synchronizes
//! readiness each round, and fans round payloads back out. It never sees
//! a private scalar and cannot learn a vote.
//!
//! All mutation goes through `&mut self`, so an embedder serializes
//! concurrent inbound calls with a single lock around the coordinator;
//! the quorum and all-ready checks then observe a consistent view and
//! each barrier fires exactly once.

use crate::*;

use indexmap::IndexMap;
use std::collections::BTreeMap;

/// A voter's barrier flag, reset to `Busy` on every stage change.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Readiness {
    Busy,
    Ready,
}

/// Coordinates a single voting session.
pub struct Coordinator {
    quorum: usize,
    state: SessionState,
    voters: IndexMap<String, Readiness>,
    round1_payloads: BTreeMap<String, RoundPayload>,
    round2_payloads: BTreeMap<String, RoundPayload>,
}

impl Coordinator {
    /// Create a coordinator for a committee of `quorum` voters.
    pub fn new(quorum: usize) -> Self {
        Coordinator {
            quorum,
            state: SessionState::WaitingToCommence,
            voters: IndexMap::new(),
            round1_payloads: BTreeMap::new(),
            round2_payloads: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    fn started(&self) -> bool {
        self.state != SessionState::WaitingToCommence
    }

    /// Register a voter. Late registrations (the session has started)
    /// are answered `AlreadyStarted` and excluded from all broadcasts;
    /// the session continues unaffected. Reaching quorum starts the
    /// session.
    pub fn register(&mut self, voter_id: &str) -> Vec<Outbound> {
        if self.started() {
            debug!("voter {} rejected, session already started", voter_id);
            return vec![Outbound::caller(Message::State(
                SessionState::AlreadyStarted,
            ))];
        }

        info!("voter {} is registered", voter_id);
        self.voters.insert(voter_id.to_string(), Readiness::Busy);

        let mut out = vec![Outbound::caller(Message::State(
            SessionState::WaitingToCommence,
        ))];
        if self.voters.len() == self.quorum {
            out.extend(self.advance());
        }
        out
    }

    /// Store a round payload, keyed by voter and round. Resubmission
    /// replaces the stored envelope. Never advances the session:
    /// advancement is readiness-driven, so "I have sent my data" stays
    /// decoupled from "I am ready to proceed".
    pub fn submit_payload(&mut self, payload: RoundPayload) -> Result<(), Error> {
        if self.state == SessionState::Finished {
            return Err(Error::SessionFinished);
        }
        if !self.voters.contains_key(&payload.voter_id) {
            return Err(Error::UnknownVoter(payload.voter_id));
        }

        debug!(
            "got the round {} payload from voter {}",
            payload.round, payload.voter_id
        );
        match payload.round {
            1 => self.round1_payloads.insert(payload.voter_id.clone(), payload),
            2 => self.round2_payloads.insert(payload.voter_id.clone(), payload),
            other => return Err(Error::InvalidRound(other)),
        };
        Ok(())
    }

    /// Mark a voter ready. When the last registered voter turns ready
    /// the session advances one stage.
    pub fn voter_ready(&mut self, voter_id: &str) -> Result<Vec<Outbound>, Error> {
        if self.state == SessionState::Finished {
            return Err(Error::SessionFinished);
        }
        match self.voters.get_mut(voter_id) {
            None => return Err(Error::UnknownVoter(voter_id.to_string())),
            Some(readiness) => *readiness = Readiness::Ready,
        }

        if self.all_ready() {
            Ok(self.advance())
        } else {
            Ok(vec![])
        }
    }

    /// Relay the ballot question to every voter. Display only.
    pub fn broadcast_question(&self, question: &str) -> Vec<Outbound> {
        vec![Outbound::all(Message::Question(question.to_string()))]
    }

    fn all_ready(&self) -> bool {
        self.voters
            .values()
            .all(|readiness| *readiness == Readiness::Ready)
    }

    fn mark_all_busy(&mut self) {
        for readiness in self.voters.values_mut() {
            *readiness = Readiness::Busy;
        }
    }

    // Move to the next stage and emit its broadcasts. Fires exactly once
    // per barrier: the caller holds `&mut self`, and readiness is reset
    // before anything is emitted.
    fn advance(&mut self) -> Vec<Outbound> {
        let next = match self.state.next() {
            Some(next) => next,
            None => return vec![],
        };
        info!("state change: {:?} -> {:?}", self.state, next);
        self.state = next;
        self.mark_all_busy();

        let mut out = vec![Outbound::all(Message::State(next))];
        match next {
            SessionState::DistributingDomainParameters => {
                out.push(Outbound::all(Message::DomainParameters(
                    DomainParameters::prime256v1(),
                )));
            }
            SessionState::Round1ZkpCheck => {
                let payloads = self.round_payloads(&self.round1_payloads);
                info!("{} round 1 payloads are being sent to voters", payloads.len());
                out.push(Outbound::all(Message::RoundPayloads(payloads)));
            }
            SessionState::Round2ZkpCheck => {
                let payloads = self.round_payloads(&self.round2_payloads);
                info!("{} round 2 payloads are being sent to voters", payloads.len());
                out.push(Outbound::all(Message::RoundPayloads(payloads)));
            }
            _ => {}
        }
        out
    }

    // Ordered by voter id; a BTreeMap already iterates lexicographically.
    fn round_payloads(&self, stored: &BTreeMap<String, RoundPayload>) -> Vec<RoundPayload> {
        stored.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(voter_id: &str, round: u8, body: &str) -> RoundPayload {
        RoundPayload {
            voter_id: voter_id.to_string(),
            round,
            payload: body.to_string(),
        }
    }

    fn states_of(out: &[Outbound]) -> Vec<SessionState> {
        out.iter()
            .filter_map(|o| match o.message {
                Message::State(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn quorum_starts_the_session() {
        let mut coordinator = Coordinator::new(3);

        assert!(states_of(&coordinator.register("a"))
            .contains(&SessionState::WaitingToCommence));
        assert_eq!(coordinator.state(), SessionState::WaitingToCommence);
        coordinator.register("b");
        assert_eq!(coordinator.state(), SessionState::WaitingToCommence);

        let out = coordinator.register("c");
        assert_eq!(
            coordinator.state(),
            SessionState::DistributingDomainParameters
        );
        // the caller reply, the stage broadcast, and the parameters
        assert!(out
            .iter()
            .any(|o| matches!(o.message, Message::DomainParameters(_))));
    }

    #[test]
    fn late_registration_is_already_started() {
        let mut coordinator = Coordinator::new(2);
        coordinator.register("a");
        coordinator.register("b");

        let out = coordinator.register("d");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, Recipient::Caller);
        assert_eq!(
            out[0].message,
            Message::State(SessionState::AlreadyStarted)
        );
        // the latecomer is not part of the barrier
        assert!(coordinator.voter_ready("d").is_err());
    }

    #[test]
    fn readiness_barrier_advances_once() {
        let mut coordinator = Coordinator::new(2);
        coordinator.register("a");
        coordinator.register("b");
        assert_eq!(
            coordinator.state(),
            SessionState::DistributingDomainParameters
        );

        assert!(coordinator.voter_ready("a").unwrap().is_empty());
        assert_eq!(
            coordinator.state(),
            SessionState::DistributingDomainParameters
        );

        let out = coordinator.voter_ready("b").unwrap();
        assert_eq!(coordinator.state(), SessionState::Round1);
        assert_eq!(states_of(&out), vec![SessionState::Round1]);

        // the barrier reset: a new stage needs both voters again
        assert!(coordinator.voter_ready("a").unwrap().is_empty());
    }

    #[test]
    fn unknown_voter_is_rejected() {
        let mut coordinator = Coordinator::new(2);
        coordinator.register("a");
        assert!(matches!(
            coordinator.voter_ready("nobody"),
            Err(Error::UnknownVoter(_))
        ));
        assert!(matches!(
            coordinator.submit_payload(envelope("nobody", 1, "{}")),
            Err(Error::UnknownVoter(_))
        ));
    }

    #[test]
    fn payload_submission_never_advances() {
        let mut coordinator = Coordinator::new(2);
        coordinator.register("a");
        coordinator.register("b");
        let state = coordinator.state();

        coordinator
            .submit_payload(envelope("a", 1, "{}"))
            .unwrap();
        coordinator
            .submit_payload(envelope("b", 1, "{}"))
            .unwrap();
        assert_eq!(coordinator.state(), state);
    }

    #[test]
    fn resubmission_replaces_the_stored_payload() {
        let mut coordinator = Coordinator::new(2);
        coordinator.register("a");
        coordinator.register("b");

        coordinator
            .submit_payload(envelope("a", 1, "first"))
            .unwrap();
        coordinator
            .submit_payload(envelope("a", 1, "second"))
            .unwrap();
        coordinator
            .submit_payload(envelope("b", 1, "other"))
            .unwrap();

        let payloads = coordinator.round_payloads(&coordinator.round1_payloads);
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].payload, "second");
    }

    #[test]
    fn payloads_are_ordered_by_voter_id() {
        let mut coordinator = Coordinator::new(3);
        coordinator.register("c");
        coordinator.register("a");
        coordinator.register("b");

        coordinator.submit_payload(envelope("c", 1, "3")).unwrap();
        coordinator.submit_payload(envelope("a", 1, "1")).unwrap();
        coordinator.submit_payload(envelope("b", 1, "2")).unwrap();

        let ids: Vec<String> = coordinator
            .round_payloads(&coordinator.round1_payloads)
            .into_iter()
            .map(|p| p.voter_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn bad_round_number_is_rejected() {
        let mut coordinator = Coordinator::new(1);
        coordinator.register("a");
        assert!(matches!(
            coordinator.submit_payload(envelope("a", 3, "{}")),
            Err(Error::InvalidRound(3))
        ));
    }

    #[test]
    fn full_walk_reaches_finished_and_stays_there() {
        let mut coordinator = Coordinator::new(2);
        coordinator.register("a");
        coordinator.register("b");

        let mut walked = vec![coordinator.state()];
        while coordinator.state() != SessionState::Finished {
            coordinator.voter_ready("a").unwrap();
            coordinator.voter_ready("b").unwrap();
            walked.push(coordinator.state());
        }

        assert_eq!(
            walked,
            vec![
                SessionState::DistributingDomainParameters,
                SessionState::Round1,
                SessionState::Round1PayloadBroadcast,
                SessionState::Round1ZkpCheck,
                SessionState::Round2,
                SessionState::Round2PayloadBroadcast,
                SessionState::Round2ZkpCheck,
                SessionState::VotingResultCalculation,
                SessionState::Finished,
            ]
        );

        assert!(matches!(
            coordinator.voter_ready("a"),
            Err(Error::SessionFinished)
        ));
        assert!(matches!(
            coordinator.submit_payload(envelope("a", 2, "{}")),
            Err(Error::SessionFinished)
        ));
    }
}
