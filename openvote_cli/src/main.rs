use clap::{App, Arg, SubCommand};
use openvote::*;
use std::collections::VecDeque;

fn main() {
    let matches = App::new("OpenVote CLI")
        .version("0.1")
        .about("Runs a self-tallying committee vote in a single process")
        .subcommand(
            SubCommand::with_name("run")
                .about("Run a complete local voting session")
                .arg(
                    Arg::with_name("VOTES")
                        .index(1)
                        .required(true)
                        .help("Comma-separated ballots, e.g. yes,no,yes"),
                )
                .arg(
                    Arg::with_name("question")
                        .long("question")
                        .takes_value(true)
                        .help("Ballot question to show the committee"),
                ),
        )
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("run") {
        command_run(matches);
    }
}

fn command_run(matches: &clap::ArgMatches) {
    let votes: Vec<Vote> = matches
        .value_of("VOTES")
        .unwrap_or_default()
        .split(',')
        .map(|ballot| match ballot.trim() {
            "yes" | "y" => Vote::Yes,
            "no" | "n" => Vote::No,
            other => {
                eprintln!("openvote run: invalid ballot {:?} (expected yes or no)", other);
                std::process::exit(1);
            }
        })
        .collect();

    let mut rng = rand::rngs::OsRng;
    let mut coordinator = Coordinator::new(votes.len());
    let mut voters: Vec<Voter> = votes
        .iter()
        .map(|_| Voter::new(&uuid::Uuid::new_v4().to_string()))
        .collect();

    for (voter, vote) in voters.iter_mut().zip(&votes) {
        if let Err(e) = voter.cast_vote(*vote, &mut rng) {
            eprintln!("openvote run: failed to cast ballot: {}", e);
            std::process::exit(1);
        }
    }

    let mut queue: VecDeque<(usize, Outbound)> = VecDeque::new();

    if let Some(question) = matches.value_of("question") {
        println!("> Question: {}", question);
        for outbound in coordinator.broadcast_question(question) {
            queue.push_back((0, outbound));
        }
    }

    for index in 0..voters.len() {
        println!("> Voter {} connects", voters[index].voter_id());
        for outbound in coordinator.register(voters[index].voter_id()) {
            queue.push_back((index, outbound));
        }
    }

    // Single-process message pump: every coordinator broadcast goes to
    // the voters, every voter reply goes back to the coordinator.
    while let Some((caller, outbound)) = queue.pop_front() {
        let targets: Vec<usize> = match outbound.to {
            Recipient::AllVoters => (0..voters.len()).collect(),
            Recipient::Caller => vec![caller],
        };

        if let Message::State(state) = &outbound.message {
            println!("> Stage: {:?}", state);
        }

        for target in targets {
            let actions = voters[target]
                .handle(&outbound.message, &mut rng)
                .unwrap_or_else(|e| {
                    eprintln!("openvote run: session aborted: {}", e);
                    std::process::exit(1);
                });

            for action in actions {
                match action {
                    VoterAction::Ready => {
                        let replies = coordinator
                            .voter_ready(voters[target].voter_id())
                            .unwrap_or_else(|e| {
                                eprintln!("openvote run: session aborted: {}", e);
                                std::process::exit(1);
                            });
                        for reply in replies {
                            queue.push_back((target, reply));
                        }
                    }
                    VoterAction::Submit(payload) => {
                        if let Err(e) = coordinator.submit_payload(payload) {
                            eprintln!("openvote run: session aborted: {}", e);
                            std::process::exit(1);
                        }
                    }
                }
            }
        }
    }

    if coordinator.state() != SessionState::Finished {
        eprintln!("openvote run: session stalled in {:?}", coordinator.state());
        std::process::exit(1);
    }

    // Every voter decodes the same public tally; print the first.
    match voters[0].tally() {
        Some(tally) => {
            println!("> Session finished");
            println!("  {} voted yes", tally.yes_votes);
            println!("  {} voted no", tally.no_votes);
        }
        None => {
            eprintln!("openvote run: no tally was produced");
            std::process::exit(1);
        }
    }
}
