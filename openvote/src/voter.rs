//! The per-voter protocol engine.
//!
//! A `Voter` reacts to coordinator messages one at a time and answers
//! with the readiness signals and payload submissions the transport
//! should carry back. All cryptography is local and single-threaded;
//! nothing here is shared between voters.

use crate::*;

use rand::Rng;
use std::collections::BTreeMap;

/// A voter's reply to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum VoterAction {
    /// Barrier signal: this voter is done with the current stage.
    Ready,
    /// Submit this voter's artifact for the current round.
    Submit(RoundPayload),
}

/// Drives one voter through a session.
pub struct Voter {
    voter_id: String,
    state: SessionState,
    rejected: bool,
    question: Option<String>,
    vote: Option<Vote>,

    ctx: Option<CurveContext>,
    keypair: Option<KeyPair>,
    round1_payload: Option<Round1Payload>,
    round2_payload: Option<Round2Payload>,
    round1_set: BTreeMap<String, Round1Payload>,
    round2_set: BTreeMap<String, Round2Payload>,
    blinding: Option<Point>,
    tally: Option<Tally>,
}

impl Voter {
    pub fn new(voter_id: &str) -> Self {
        Voter {
            voter_id: voter_id.to_string(),
            state: SessionState::WaitingToCommence,
            rejected: false,
            question: None,
            vote: None,
            ctx: None,
            keypair: None,
            round1_payload: None,
            round2_payload: None,
            round1_set: BTreeMap::new(),
            round2_set: BTreeMap::new(),
            blinding: None,
            tally: None,
        }
    }

    pub fn voter_id(&self) -> &str {
        &self.voter_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the session turned this voter away (`AlreadyStarted`).
    pub fn rejected(&self) -> bool {
        self.rejected
    }

    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    /// The locally decoded result, available once the session reached
    /// the result stage.
    pub fn tally(&self) -> Option<&Tally> {
        self.tally.as_ref()
    }

    /// Record the ballot choice. If round 2 is already in progress the
    /// payload is built right away and the voter turns ready; otherwise
    /// the choice is held until the round starts.
    pub fn cast_vote<R: Rng + ?Sized>(
        &mut self,
        vote: Vote,
        rng: &mut R,
    ) -> Result<Vec<VoterAction>, Error> {
        self.vote = Some(vote);
        if self.state == SessionState::Round2 && self.round2_payload.is_none() {
            self.build_round2(rng)?;
            return Ok(vec![VoterAction::Ready]);
        }
        Ok(vec![])
    }

    /// React to one coordinator message.
    pub fn handle<R: Rng + ?Sized>(
        &mut self,
        message: &Message,
        rng: &mut R,
    ) -> Result<Vec<VoterAction>, Error> {
        if self.rejected {
            return Ok(vec![]);
        }

        match message {
            Message::Question(question) => {
                self.question = Some(question.clone());
                Ok(vec![])
            }
            Message::DomainParameters(params) => {
                let ctx = CurveContext::new(params.clone())?;
                self.keypair = Some(KeyPair::generate(&ctx, rng));
                self.ctx = Some(ctx);
                debug!("voter {} generated its session keys", self.voter_id);
                Ok(vec![VoterAction::Ready])
            }
            Message::RoundPayloads(payloads) => self.handle_payload_set(payloads),
            Message::State(state) => self.handle_state(*state, rng),
        }
    }

    fn handle_state<R: Rng + ?Sized>(
        &mut self,
        state: SessionState,
        rng: &mut R,
    ) -> Result<Vec<VoterAction>, Error> {
        if state == self.state {
            return Ok(vec![]);
        }
        self.state = state;

        match state {
            SessionState::AlreadyStarted => {
                info!("voter {}: session already started, going inert", self.voter_id);
                self.rejected = true;
                Ok(vec![])
            }
            SessionState::Round1 => {
                let ctx = self.context()?;
                let keypair = self.keypair.as_ref().ok_or(Error::MissingParameters("round 1"))?;
                let r = round1::pick_commitment_scalar(ctx, rng);
                self.round1_payload = Some(Round1Payload::build(ctx, keypair, &self.voter_id, &r));
                Ok(vec![VoterAction::Ready])
            }
            SessionState::Round1PayloadBroadcast => {
                let body = self
                    .round1_payload
                    .as_ref()
                    .ok_or(Error::MissingParameters("round 1 broadcast"))?;
                Ok(vec![
                    VoterAction::Submit(RoundPayload::from_round1(body)?),
                    VoterAction::Ready,
                ])
            }
            SessionState::Round2 => {
                let ctx = self.context()?;
                let blinding = blinding_point(ctx, &self.voting_keys(), &self.voter_id)?;
                self.blinding = Some(blinding);
                if self.vote.is_some() {
                    self.build_round2(rng)?;
                    Ok(vec![VoterAction::Ready])
                } else {
                    // nothing to do until the ballot is cast
                    Ok(vec![])
                }
            }
            SessionState::Round2PayloadBroadcast => {
                let body = self.round2_payload.as_ref().ok_or(Error::MissingVote)?;
                Ok(vec![
                    VoterAction::Submit(RoundPayload::from_round2(body)?),
                    VoterAction::Ready,
                ])
            }
            SessionState::VotingResultCalculation => {
                let ctx = self.context()?;
                let encoded: Vec<Point> = self
                    .round2_set
                    .values()
                    .map(|payload| payload.encoded_vote.clone())
                    .collect();
                let tally = decode_tally(ctx, &encoded)?;
                info!(
                    "voter {} tallied {} yes / {} no",
                    self.voter_id, tally.yes_votes, tally.no_votes
                );
                self.tally = Some(tally);
                Ok(vec![VoterAction::Ready])
            }
            // waiting stages: the next broadcast carries the work
            _ => Ok(vec![]),
        }
    }

    // Save the redistributed payload set for the round we are checking
    // and verify every peer's proof. A single bad proof aborts the
    // session: the error propagates instead of being retried.
    fn handle_payload_set(&mut self, payloads: &[RoundPayload]) -> Result<Vec<VoterAction>, Error> {
        match self.state {
            SessionState::Round1ZkpCheck => {
                let ctx = self.context()?;
                let mut set = BTreeMap::new();
                for envelope in payloads {
                    let body = envelope.decode_round1()?;
                    if body.voter_id != self.voter_id {
                        body.verify(ctx)?;
                        debug!(
                            "voter {}: round 1 proof for {} holds",
                            self.voter_id, body.voter_id
                        );
                    }
                    set.insert(body.voter_id.clone(), body);
                }
                self.round1_set = set;
                Ok(vec![VoterAction::Ready])
            }
            SessionState::Round2ZkpCheck => {
                let ctx = self.context()?;
                let voting_keys = self.voting_keys();
                let mut set = BTreeMap::new();
                for envelope in payloads {
                    let body = envelope.decode_round2()?;
                    if body.voter_id != self.voter_id {
                        let voting_key = voting_keys.get(&body.voter_id).ok_or_else(|| {
                            Error::MissingPeerPayload {
                                voter_id: body.voter_id.clone(),
                                round: 1,
                            }
                        })?;
                        let blinding = blinding_point(ctx, &voting_keys, &body.voter_id)?;
                        body.verify(ctx, voting_key, &blinding)?;
                        debug!(
                            "voter {}: round 2 proof for {} holds",
                            self.voter_id, body.voter_id
                        );
                    }
                    set.insert(body.voter_id.clone(), body);
                }
                self.round2_set = set;
                Ok(vec![VoterAction::Ready])
            }
            // a payload set outside a check stage has nothing to verify
            _ => Ok(vec![]),
        }
    }

    fn build_round2<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), Error> {
        let ctx = self.ctx.as_ref().ok_or(Error::MissingParameters("round 2"))?;
        let keypair = self.keypair.as_ref().ok_or(Error::MissingParameters("round 2"))?;
        let blinding = self.blinding.as_ref().ok_or(Error::MissingParameters("round 2"))?;
        let vote = self.vote.ok_or(Error::MissingVote)?;

        self.round2_payload = Some(Round2Payload::build(
            ctx,
            keypair,
            blinding,
            vote,
            &self.voter_id,
            rng,
        ));
        Ok(())
    }

    fn context(&self) -> Result<&CurveContext, Error> {
        self.ctx
            .as_ref()
            .ok_or(Error::MissingParameters("session stage"))
    }

    fn voting_keys(&self) -> BTreeMap<String, Point> {
        self.round1_set
            .iter()
            .map(|(voter_id, payload)| (voter_id.clone(), payload.voting_key.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_started_makes_the_voter_inert() {
        let mut rng = rand::rngs::OsRng;
        let mut voter = Voter::new("late");

        let actions = voter
            .handle(&Message::State(SessionState::AlreadyStarted), &mut rng)
            .unwrap();
        assert!(actions.is_empty());
        assert!(voter.rejected());

        // every later message is ignored
        let actions = voter
            .handle(
                &Message::DomainParameters(DomainParameters::prime256v1()),
                &mut rng,
            )
            .unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn domain_parameters_produce_keys_and_readiness() {
        let mut rng = rand::rngs::OsRng;
        let mut voter = Voter::new("a");

        let actions = voter
            .handle(
                &Message::DomainParameters(DomainParameters::prime256v1()),
                &mut rng,
            )
            .unwrap();
        assert_eq!(actions, vec![VoterAction::Ready]);
        assert!(voter.keypair.is_some());
    }

    #[test]
    fn round1_before_parameters_is_an_error() {
        let mut rng = rand::rngs::OsRng;
        let mut voter = Voter::new("a");
        let result = voter.handle(&Message::State(SessionState::Round1), &mut rng);
        assert!(matches!(result, Err(Error::MissingParameters(_))));
    }

    #[test]
    fn question_is_display_only() {
        let mut rng = rand::rngs::OsRng;
        let mut voter = Voter::new("a");
        let actions = voter
            .handle(&Message::Question("raise the dues?".to_string()), &mut rng)
            .unwrap();
        assert!(actions.is_empty());
        assert_eq!(voter.question(), Some("raise the dues?"));
    }

    #[test]
    fn duplicate_state_broadcast_is_ignored() {
        let mut rng = rand::rngs::OsRng;
        let mut voter = Voter::new("a");
        voter
            .handle(
                &Message::DomainParameters(DomainParameters::prime256v1()),
                &mut rng,
            )
            .unwrap();
        let first = voter
            .handle(&Message::State(SessionState::Round1), &mut rng)
            .unwrap();
        assert_eq!(first, vec![VoterAction::Ready]);

        let again = voter
            .handle(&Message::State(SessionState::Round1), &mut rng)
            .unwrap();
        assert!(again.is_empty());
    }
}
