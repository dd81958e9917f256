//! The election engine
//!
//! A single owned [`Election`] holds the whole state of one voting round and
//! enforces every rule on it:
//! 1. Role check first (administrator or registered voter)
//! 2. Phase check (each operation is admissible in exactly one phase)
//! 3. Entity checks (uniqueness, one vote per voter, proposal bounds)
//! 4. Seal the resulting events, then apply the mutation
//!
//! A rejected operation never touches state. Sealing happens before the
//! mutation so a failure there is a no-op too.

use crate::config::ElectionConfig;
use crate::errors::{Error, Result, Role};
use crate::types::{Principal, Proposal, ProposalId, ProposalResult, TallyResult, Voter, WorkflowStatus};
use crate::workflow::events::{ElectionEvent, EventLog, EventRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Serializable read-only view of an election
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSnapshot {
    pub election_id: Uuid,
    pub administrator: Principal,
    pub status: WorkflowStatus,
    pub voters: Vec<Voter>,
    pub proposals: Vec<Proposal>,
    pub tally: Option<TallyResult>,
    pub created_at: DateTime<Utc>,
}

/// One voting round, from voter registration to tally
#[derive(Debug, Clone)]
pub struct Election {
    id: Uuid,
    administrator: Principal,
    status: WorkflowStatus,
    voters: HashMap<Principal, Voter>,
    proposals: Vec<Proposal>,
    descriptions: HashSet<String>,
    tally: Option<TallyResult>,
    events: EventLog,
    max_description_len: usize,
    created_at: DateTime<Utc>,
}

impl Election {
    /// Open a new round in `RegisteringVoters`, administered by `administrator`
    pub fn new(administrator: Principal) -> Self {
        Self::open(&ElectionConfig::new(administrator))
    }

    /// Open a new round from a validated configuration
    pub fn from_config(config: &ElectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::open(config))
    }

    fn open(config: &ElectionConfig) -> Self {
        let election = Self {
            id: Uuid::new_v4(),
            administrator: config.administrator.clone(),
            status: WorkflowStatus::RegisteringVoters,
            voters: HashMap::new(),
            proposals: Vec::new(),
            descriptions: HashSet::new(),
            tally: None,
            events: EventLog::new(),
            max_description_len: config.max_description_len,
            created_at: Utc::now(),
        };

        tracing::info!(
            "🗳️  Election {} opened by {}",
            election.id,
            election.administrator.short()
        );

        election
    }

    // =========================================================================
    // Role and phase guards
    // =========================================================================

    fn require_administrator(&self, caller: &Principal, operation: &'static str) -> Result<()> {
        if *caller == self.administrator {
            return Ok(());
        }

        tracing::warn!(
            "🚫 {} rejected: {} is not the administrator",
            operation,
            caller.short()
        );
        Err(Error::unauthorized(caller, Role::Administrator))
    }

    fn require_registered_voter(&self, caller: &Principal, operation: &'static str) -> Result<&Voter> {
        match self.voters.get(caller) {
            Some(voter) if voter.is_registered => Ok(voter),
            _ => {
                tracing::warn!(
                    "🚫 {} rejected: {} is not a registered voter",
                    operation,
                    caller.short()
                );
                Err(Error::unauthorized(caller, Role::RegisteredVoter))
            }
        }
    }

    fn require_phase(&self, required: WorkflowStatus, operation: &'static str) -> Result<()> {
        if self.status == required {
            return Ok(());
        }

        tracing::debug!("{} rejected during {}", operation, self.status);
        Err(Error::InvalidPhase {
            operation,
            current: self.status,
        })
    }

    /// Shared body of the four plain phase transitions
    fn transition(
        &mut self,
        caller: &Principal,
        operation: &'static str,
        required: WorkflowStatus,
    ) -> Result<WorkflowStatus> {
        self.require_administrator(caller, operation)?;

        let next = match required.next() {
            Some(next) if self.status == required => next,
            _ => {
                tracing::debug!("{} rejected during {}", operation, self.status);
                return Err(Error::InvalidPhaseTransition {
                    operation,
                    current: self.status,
                    required,
                });
            }
        };

        self.events.append(vec![ElectionEvent::WorkflowStatusChange {
            previous: self.status,
            new: next,
        }])?;
        self.status = next;

        tracing::info!("🔄 Workflow status changed: {} -> {}", required, next);
        Ok(next)
    }

    // =========================================================================
    // Mutating operations
    // =========================================================================

    /// Register `voter`; administrator only, during `RegisteringVoters`
    ///
    /// A principal that is already registered is reported as such in every
    /// phase, ahead of the phase check.
    pub fn register_voter(&mut self, caller: &Principal, voter: &Principal) -> Result<()> {
        self.require_administrator(caller, "register_voter")?;

        if self.voters.get(voter).is_some_and(|v| v.is_registered) {
            tracing::debug!("register_voter rejected: {} already registered", voter.short());
            return Err(Error::AlreadyRegistered {
                principal: voter.clone(),
            });
        }

        self.require_phase(WorkflowStatus::RegisteringVoters, "register_voter")?;

        self.events.append(vec![ElectionEvent::VoterRegistered {
            voter: voter.clone(),
        }])?;
        self.voters
            .insert(voter.clone(), Voter::registered(voter.clone()));

        tracing::info!("✅ Voter registered: {}", voter.short());
        Ok(())
    }

    pub fn start_proposals_registration(&mut self, caller: &Principal) -> Result<WorkflowStatus> {
        self.transition(
            caller,
            "start_proposals_registration",
            WorkflowStatus::RegisteringVoters,
        )
    }

    pub fn end_proposals_registration(&mut self, caller: &Principal) -> Result<WorkflowStatus> {
        self.transition(
            caller,
            "end_proposals_registration",
            WorkflowStatus::ProposalsRegistrationStarted,
        )
    }

    /// Submit a proposal; registered voters only, during
    /// `ProposalsRegistrationStarted`
    ///
    /// Descriptions must be non-empty, within the configured length and not
    /// an exact (case-sensitive) repeat of an earlier proposal.
    pub fn submit_proposal(&mut self, caller: &Principal, description: &str) -> Result<ProposalId> {
        self.require_registered_voter(caller, "submit_proposal")?;
        self.require_phase(WorkflowStatus::ProposalsRegistrationStarted, "submit_proposal")?;

        if description.is_empty() {
            return Err(crate::validation_error!("proposal description must not be empty"));
        }

        if description.len() > self.max_description_len {
            return Err(crate::validation_error!(
                "proposal description longer than {} bytes",
                self.max_description_len
            ));
        }

        if self.descriptions.contains(description) {
            tracing::debug!("submit_proposal rejected: duplicate {:?}", description);
            return Err(Error::DuplicateProposal {
                description: description.to_string(),
            });
        }

        let proposal_id = self.proposals.len();
        self.events
            .append(vec![ElectionEvent::ProposalRegistered { proposal_id }])?;

        self.descriptions.insert(description.to_string());
        self.proposals.push(Proposal {
            id: proposal_id,
            description: description.to_string(),
            vote_count: 0,
            submitted_by: caller.clone(),
        });

        tracing::info!(
            "📝 Proposal {} registered by {}",
            proposal_id,
            caller.short()
        );
        Ok(proposal_id)
    }

    pub fn start_voting_session(&mut self, caller: &Principal) -> Result<WorkflowStatus> {
        self.transition(
            caller,
            "start_voting_session",
            WorkflowStatus::ProposalsRegistrationEnded,
        )
    }

    /// Cast the caller's single, final vote for `proposal_id`
    pub fn vote(&mut self, caller: &Principal, proposal_id: ProposalId) -> Result<()> {
        let voter = self.require_registered_voter(caller, "vote")?;
        let previous_choice = voter.voted_proposal_id;
        let has_voted = voter.has_voted;

        self.require_phase(WorkflowStatus::VotingSessionStarted, "vote")?;

        if has_voted {
            tracing::debug!("vote rejected: {} already voted", caller.short());
            return Err(Error::AlreadyVoted {
                principal: caller.clone(),
                proposal_id: previous_choice.unwrap_or_default(),
            });
        }

        if proposal_id >= self.proposals.len() {
            tracing::debug!("vote rejected: proposal {} does not exist", proposal_id);
            return Err(Error::InvalidProposalId {
                proposal_id,
                proposal_count: self.proposals.len(),
            });
        }

        self.events.append(vec![ElectionEvent::Voted {
            voter: caller.clone(),
            proposal_id,
        }])?;

        self.proposals[proposal_id].vote_count += 1;
        if let Some(voter) = self.voters.get_mut(caller) {
            voter.has_voted = true;
            voter.voted_proposal_id = Some(proposal_id);
        }

        tracing::info!("🗳️  {} voted for proposal {}", caller.short(), proposal_id);
        Ok(())
    }

    /// Close the voting session and tally in one step
    ///
    /// Moves `VotingSessionStarted -> VotingSessionEnded -> VotesTallied`
    /// atomically; no caller ever observes `VotingSessionEnded`. Fails with
    /// [`Error::NoProposals`] (and stays in `VotingSessionStarted`) when
    /// there is nothing to tally.
    pub fn end_voting_session(&mut self, caller: &Principal) -> Result<TallyResult> {
        const OPERATION: &str = "end_voting_session";
        self.require_administrator(caller, OPERATION)?;

        if self.status != WorkflowStatus::VotingSessionStarted {
            tracing::debug!("{} rejected during {}", OPERATION, self.status);
            return Err(Error::InvalidPhaseTransition {
                operation: OPERATION,
                current: self.status,
                required: WorkflowStatus::VotingSessionStarted,
            });
        }

        let tally = self.compute_tally()?;

        self.events.append(vec![
            ElectionEvent::WorkflowStatusChange {
                previous: WorkflowStatus::VotingSessionStarted,
                new: WorkflowStatus::VotingSessionEnded,
            },
            ElectionEvent::WorkflowStatusChange {
                previous: WorkflowStatus::VotingSessionEnded,
                new: WorkflowStatus::VotesTallied,
            },
            ElectionEvent::VotesTallied {
                winning_proposal_id: tally.winning_proposal_id,
            },
        ])?;

        self.status = WorkflowStatus::VotesTallied;
        self.tally = Some(tally.clone());

        tracing::info!(
            "🏁 Voting session ended, proposal {} wins with {}/{} votes",
            tally.winning_proposal_id,
            tally.winning_vote_count,
            tally.total_votes
        );
        Ok(tally)
    }

    /// Tally the votes; administrator only
    ///
    /// Admissible in `VotingSessionEnded` (moving to `VotesTallied`) and again
    /// in `VotesTallied`, where it recomputes the same winner.
    pub fn tally_votes(&mut self, caller: &Principal) -> Result<TallyResult> {
        const OPERATION: &str = "tally_votes";
        self.require_administrator(caller, OPERATION)?;

        if !matches!(
            self.status,
            WorkflowStatus::VotingSessionEnded | WorkflowStatus::VotesTallied
        ) {
            tracing::debug!("{} rejected during {}", OPERATION, self.status);
            return Err(Error::InvalidPhase {
                operation: OPERATION,
                current: self.status,
            });
        }

        let tally = self.compute_tally()?;

        let mut events = Vec::with_capacity(2);
        // only reachable when ending the session and tallying are driven as
        // two separate steps; `end_voting_session` goes straight to `VotesTallied`
        if self.status == WorkflowStatus::VotingSessionEnded {
            events.push(ElectionEvent::WorkflowStatusChange {
                previous: WorkflowStatus::VotingSessionEnded,
                new: WorkflowStatus::VotesTallied,
            });
        }
        events.push(ElectionEvent::VotesTallied {
            winning_proposal_id: tally.winning_proposal_id,
        });
        self.events.append(events)?;

        self.status = WorkflowStatus::VotesTallied;
        self.tally = Some(tally.clone());

        tracing::info!(
            "🏁 Votes tallied, proposal {} wins with {}/{} votes",
            tally.winning_proposal_id,
            tally.winning_vote_count,
            tally.total_votes
        );
        Ok(tally)
    }

    /// Highest vote count wins; ties go to the lowest proposal id
    fn compute_tally(&self) -> Result<TallyResult> {
        let mut proposals = self.proposals.iter();
        let first = proposals.next().ok_or(Error::NoProposals)?;

        let mut winner = first;
        let mut total_votes = first.vote_count;
        for proposal in proposals {
            total_votes += proposal.vote_count;
            // strictly greater: an equal count never displaces an earlier id
            if proposal.vote_count > winner.vote_count {
                winner = proposal;
            }
        }

        Ok(TallyResult {
            winning_proposal_id: winner.id,
            winning_vote_count: winner.vote_count,
            total_votes,
            tallied_at: Utc::now(),
        })
    }

    // =========================================================================
    // Read-only queries
    // =========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn administrator(&self) -> &Principal {
        &self.administrator
    }

    pub fn current_phase(&self) -> WorkflowStatus {
        self.status
    }

    pub fn get_voter(&self, principal: &Principal) -> Result<&Voter> {
        self.voters.get(principal).ok_or_else(|| Error::VoterNotFound {
            principal: principal.clone(),
        })
    }

    pub fn is_registered_voter(&self, principal: &Principal) -> bool {
        self.voters.get(principal).is_some_and(|v| v.is_registered)
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    /// Proposals in submission order; index equals proposal id
    pub fn get_proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn get_proposal(&self, proposal_id: ProposalId) -> Result<&Proposal> {
        self.proposals
            .get(proposal_id)
            .ok_or(Error::InvalidProposalId {
                proposal_id,
                proposal_count: self.proposals.len(),
            })
    }

    /// Latest tally, if votes were tallied
    pub fn tally(&self) -> Option<&TallyResult> {
        self.tally.as_ref()
    }

    pub fn winning_proposal_id(&self) -> Result<ProposalId> {
        self.winner().map(|proposal| proposal.id)
    }

    /// The winning proposal, once votes are tallied
    pub fn winner(&self) -> Result<&Proposal> {
        match (&self.status, &self.tally) {
            (WorkflowStatus::VotesTallied, Some(tally)) => self.get_proposal(tally.winning_proposal_id),
            _ => Err(Error::NotTalliedYet),
        }
    }

    /// Description of the winning proposal
    pub fn get_winner(&self) -> Result<&str> {
        self.winner().map(|proposal| proposal.description.as_str())
    }

    /// Full results table, once votes are tallied
    pub fn results(&self) -> Result<Vec<ProposalResult>> {
        let tally = self.tally.as_ref().ok_or(Error::NotTalliedYet)?;

        Ok(self
            .proposals
            .iter()
            .map(|proposal| ProposalResult {
                proposal_id: proposal.id,
                description: proposal.description.clone(),
                vote_count: proposal.vote_count,
                percentage: if tally.total_votes == 0 {
                    0.0
                } else {
                    proposal.vote_count as f64 * 100.0 / tally.total_votes as f64
                },
                is_winner: proposal.id == tally.winning_proposal_id,
            })
            .collect())
    }

    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }

    pub fn events_since(&self, sequence: u64) -> &[EventRecord] {
        self.events.since(sequence)
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    pub fn snapshot(&self) -> ElectionSnapshot {
        let mut voters: Vec<Voter> = self.voters.values().cloned().collect();
        voters.sort_by(|a, b| a.principal.cmp(&b.principal));

        ElectionSnapshot {
            election_id: self.id,
            administrator: self.administrator.clone(),
            status: self.status,
            voters,
            proposals: self.proposals.clone(),
            tally: self.tally.clone(),
            created_at: self.created_at,
        }
    }

    pub fn snapshot_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}
