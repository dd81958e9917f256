//! End-to-end tests of the election workflow

use election::{
    Election, ElectionEvent, Error, ErrorKind, Principal, Result, Role, WorkflowStatus,
    config::ElectionConfig,
};

fn setup() -> (Election, Principal) {
    let config = ElectionConfig::for_testing();
    let admin = config.administrator.clone();
    let election = Election::from_config(&config).expect("test config is valid");
    (election, admin)
}

#[test]
fn test_single_voter_election() -> Result<()> {
    println!("🗳️  Testing single voter election...");
    // another test binary may already own the global subscriber
    let _ = election::init();

    let (mut election, admin) = setup();
    let x = Principal::random();

    election.register_voter(&admin, &x)?;
    election.start_proposals_registration(&admin)?;
    let proposal_id = election.submit_proposal(&x, "Proposal 1")?;
    assert_eq!(proposal_id, 0);
    election.end_proposals_registration(&admin)?;
    election.start_voting_session(&admin)?;
    election.vote(&x, 0)?;
    println!("✅ Vote cast");

    let tally = election.end_voting_session(&admin)?;
    assert_eq!(tally.winning_proposal_id, 0);
    assert_eq!(election.current_phase(), WorkflowStatus::VotesTallied);
    assert_eq!(election.current_phase().index(), 5);
    assert_eq!(election.get_winner()?, "Proposal 1");
    println!("✅ Winner: {}", election.get_winner()?);

    // Tallying again after the fused end+tally keeps the same winner
    election.tally_votes(&admin)?;
    assert_eq!(election.get_winner()?, "Proposal 1");

    Ok(())
}

#[test]
fn test_tie_resolved_to_lowest_id() -> Result<()> {
    println!("⚖️  Testing tie resolution...");

    let (mut election, admin) = setup();
    let x = Principal::random();
    let y = Principal::random();

    election.register_voter(&admin, &x)?;
    election.register_voter(&admin, &y)?;
    election.start_proposals_registration(&admin)?;
    election.submit_proposal(&x, "Proposal 1")?;
    election.submit_proposal(&y, "Proposal 2")?;
    election.end_proposals_registration(&admin)?;
    election.start_voting_session(&admin)?;
    election.vote(&x, 0)?;
    election.vote(&y, 1)?;

    let proposals = election.get_proposals();
    assert_eq!(proposals[0].vote_count, 1);
    assert_eq!(proposals[1].vote_count, 1);

    election.end_voting_session(&admin)?;
    assert_eq!(election.get_winner()?, "Proposal 1");
    assert_eq!(election.winning_proposal_id()?, 0);
    println!("✅ Tie went to proposal 0");

    Ok(())
}

fn assert_registration_closed(election: &mut Election, admin: &Principal, voter: &Principal) {
    let phase = election.current_phase();

    let err = election.register_voter(admin, voter).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyRegistered, "phase {phase}");

    let err = election
        .register_voter(admin, &Principal::random())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPhase, "phase {phase}");
}

#[test]
fn test_double_registration_fails_in_every_phase() -> Result<()> {
    let (mut election, admin) = setup();
    let voter = Principal::random();
    election.register_voter(&admin, &voter)?;

    let err = election.register_voter(&admin, &voter).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyRegistered);

    election.start_proposals_registration(&admin)?;
    election.submit_proposal(&voter, "Only option")?;
    assert_registration_closed(&mut election, &admin, &voter);

    election.end_proposals_registration(&admin)?;
    assert_registration_closed(&mut election, &admin, &voter);

    election.start_voting_session(&admin)?;
    assert_registration_closed(&mut election, &admin, &voter);

    election.end_voting_session(&admin)?;
    assert_registration_closed(&mut election, &admin, &voter);

    assert_eq!(election.current_phase(), WorkflowStatus::VotesTallied);
    assert_eq!(election.voter_count(), 1);
    Ok(())
}

#[test]
fn test_non_administrator_is_rejected_everywhere() -> Result<()> {
    println!("🚫 Testing administrator-only operations...");

    let (mut election, admin) = setup();
    let voter = Principal::random();
    election.register_voter(&admin, &voter)?;

    let events_before = election.events().len();
    let stranger_err = |err: Error| {
        assert!(matches!(
            err,
            Error::Unauthorized {
                role: Role::Administrator,
                ..
            }
        ));
    };

    stranger_err(election.register_voter(&voter, &Principal::random()).unwrap_err());
    stranger_err(election.start_proposals_registration(&voter).unwrap_err());
    stranger_err(election.end_proposals_registration(&voter).unwrap_err());
    stranger_err(election.start_voting_session(&voter).unwrap_err());
    stranger_err(election.end_voting_session(&voter).unwrap_err());
    stranger_err(election.tally_votes(&voter).unwrap_err());

    assert_eq!(election.events().len(), events_before);
    assert_eq!(election.current_phase(), WorkflowStatus::RegisteringVoters);
    assert_eq!(election.voter_count(), 1);
    println!("✅ Every administrator-only operation rejected");

    Ok(())
}

#[test]
fn test_unregistered_caller_cannot_propose_or_vote() -> Result<()> {
    let (mut election, admin) = setup();
    let voter = Principal::random();
    let outsider = Principal::random();

    election.register_voter(&admin, &voter)?;
    election.start_proposals_registration(&admin)?;

    let err = election.submit_proposal(&outsider, "Sneaky").unwrap_err();
    assert!(matches!(
        err,
        Error::Unauthorized {
            role: Role::RegisteredVoter,
            ..
        }
    ));
    assert!(election.get_proposals().is_empty());

    election.submit_proposal(&voter, "Legit")?;
    election.end_proposals_registration(&admin)?;
    election.start_voting_session(&admin)?;

    let err = election.vote(&outsider, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnauthorizedVoter);
    assert_eq!(election.get_proposal(0)?.vote_count, 0);
    assert_eq!(
        election.get_voter(&outsider).unwrap_err().kind(),
        ErrorKind::VoterNotFound
    );

    Ok(())
}

#[test]
fn test_duplicate_descriptions_across_voters() -> Result<()> {
    let (mut election, admin) = setup();
    let x = Principal::random();
    let y = Principal::random();
    election.register_voter(&admin, &x)?;
    election.register_voter(&admin, &y)?;
    election.start_proposals_registration(&admin)?;

    election.submit_proposal(&x, "Build a park")?;
    match election.submit_proposal(&y, "Build a park") {
        Err(Error::DuplicateProposal { description }) => assert_eq!(description, "Build a park"),
        other => panic!("Expected duplicate proposal, got {other:?}"),
    }

    // exact match only
    assert_eq!(election.submit_proposal(&y, "Build a Park")?, 1);
    assert_eq!(election.submit_proposal(&x, "Build a park ")?, 2);

    Ok(())
}

#[test]
fn test_vote_once_and_in_range() -> Result<()> {
    let (mut election, admin) = setup();
    let voter = Principal::random();
    election.register_voter(&admin, &voter)?;
    election.start_proposals_registration(&admin)?;
    election.submit_proposal(&voter, "A")?;
    election.submit_proposal(&voter, "B")?;

    let err = election.vote(&voter, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPhase);

    election.end_proposals_registration(&admin)?;
    election.start_voting_session(&admin)?;

    for bad_id in [2, 3, usize::MAX] {
        let err = election.vote(&voter, bad_id).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidProposalId {
                proposal_count: 2,
                ..
            }
        ));
    }
    assert!(election.get_proposals().iter().all(|p| p.vote_count == 0));

    election.vote(&voter, 1)?;
    for id in [0, 1, 7] {
        let err = election.vote(&voter, id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyVoted);
    }
    assert_eq!(election.get_proposal(1)?.vote_count, 1);
    assert_eq!(election.get_proposal(0)?.vote_count, 0);

    Ok(())
}

#[test]
fn test_winner_unavailable_until_tallied() -> Result<()> {
    let (mut election, admin) = setup();
    let voter = Principal::random();

    assert!(matches!(election.get_winner(), Err(Error::NotTalliedYet)));

    election.register_voter(&admin, &voter)?;
    election.start_proposals_registration(&admin)?;
    election.submit_proposal(&voter, "A")?;
    election.end_proposals_registration(&admin)?;
    election.start_voting_session(&admin)?;
    assert!(matches!(election.get_winner(), Err(Error::NotTalliedYet)));

    election.end_voting_session(&admin)?;
    assert_eq!(election.get_winner()?, "A");

    Ok(())
}

#[test]
fn test_event_log_follows_the_workflow() -> Result<()> {
    let (mut election, admin) = setup();
    let voter = Principal::random();

    election.register_voter(&admin, &voter)?;
    election.start_proposals_registration(&admin)?;
    election.submit_proposal(&voter, "A")?;
    election.end_proposals_registration(&admin)?;
    election.start_voting_session(&admin)?;
    election.vote(&voter, 0)?;
    election.end_voting_session(&admin)?;

    let transitions: Vec<WorkflowStatus> = election
        .events()
        .iter()
        .filter_map(|record| match record.event {
            ElectionEvent::WorkflowStatusChange { new, .. } => Some(new),
            _ => None,
        })
        .collect();
    assert_eq!(transitions, WorkflowStatus::ALL[1..].to_vec());

    assert!(election.event_log().verify_chain()?);
    println!("✅ {} events, chain intact", election.events().len());

    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = ElectionConfig::for_testing();
    config.max_description_len = 0;

    match Election::from_config(&config) {
        Err(Error::Configuration { .. }) => {}
        other => panic!("Expected configuration error, got {other:?}"),
    }
}
