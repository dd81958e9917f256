//! Shared, thread-safe access to one election
//!
//! [`ElectionService`] serializes every mutation behind a write lock, so a
//! vote or transition is never observed half-applied, while queries share a
//! read lock and see a consistent state. Events sealed by an accepted
//! mutation are broadcast to subscribers in log order before the lock is
//! released.

use crate::config::{DEFAULT_EVENT_CHANNEL_CAPACITY, ElectionConfig};
use crate::types::{Principal, Proposal, ProposalId, ProposalResult, TallyResult, Voter, WorkflowStatus};
use crate::workflow::election::{Election, ElectionSnapshot};
use crate::workflow::events::EventRecord;
use crate::{Result, internal_error};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Cloneable handle to a single shared election
#[derive(Debug, Clone)]
pub struct ElectionService {
    election: Arc<RwLock<Election>>,
    notifier: broadcast::Sender<EventRecord>,
}

impl ElectionService {
    /// Create a service around a fresh election
    pub fn new(config: &ElectionConfig) -> Result<Self> {
        let election = Election::from_config(config)?;
        Ok(Self::from_election(election, config.event_channel_capacity))
    }

    /// Wrap an existing election
    pub fn from_election(election: Election, channel_capacity: usize) -> Self {
        let (notifier, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            election: Arc::new(RwLock::new(election)),
            notifier,
        }
    }

    /// Create for testing with a random administrator
    pub fn for_testing() -> Self {
        Self::from_election(
            Election::new(Principal::random()),
            DEFAULT_EVENT_CHANNEL_CAPACITY,
        )
    }

    /// Receive every event recorded from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.notifier.subscribe()
    }

    fn mutate<T>(&self, operation: impl FnOnce(&mut Election) -> Result<T>) -> Result<T> {
        let mut election = self
            .election
            .write()
            .map_err(|_| internal_error!("Failed to lock election for writing"))?;

        let mark = election.events().len() as u64;
        let outcome = operation(&mut *election)?;

        for record in election.events_since(mark) {
            // No subscribers is not an error
            let _ = self.notifier.send(record.clone());
        }

        Ok(outcome)
    }

    fn read<T>(&self, query: impl FnOnce(&Election) -> Result<T>) -> Result<T> {
        let election = self
            .election
            .read()
            .map_err(|_| internal_error!("Failed to lock election for reading"))?;
        query(&*election)
    }

    pub fn register_voter(&self, caller: &Principal, voter: &Principal) -> Result<()> {
        self.mutate(|election| election.register_voter(caller, voter))
    }

    pub fn start_proposals_registration(&self, caller: &Principal) -> Result<WorkflowStatus> {
        self.mutate(|election| election.start_proposals_registration(caller))
    }

    pub fn end_proposals_registration(&self, caller: &Principal) -> Result<WorkflowStatus> {
        self.mutate(|election| election.end_proposals_registration(caller))
    }

    pub fn submit_proposal(&self, caller: &Principal, description: &str) -> Result<ProposalId> {
        self.mutate(|election| election.submit_proposal(caller, description))
    }

    pub fn start_voting_session(&self, caller: &Principal) -> Result<WorkflowStatus> {
        self.mutate(|election| election.start_voting_session(caller))
    }

    pub fn vote(&self, caller: &Principal, proposal_id: ProposalId) -> Result<()> {
        self.mutate(|election| election.vote(caller, proposal_id))
    }

    pub fn end_voting_session(&self, caller: &Principal) -> Result<TallyResult> {
        self.mutate(|election| election.end_voting_session(caller))
    }

    pub fn tally_votes(&self, caller: &Principal) -> Result<TallyResult> {
        self.mutate(|election| election.tally_votes(caller))
    }

    pub fn administrator(&self) -> Result<Principal> {
        self.read(|election| Ok(election.administrator().clone()))
    }

    pub fn current_phase(&self) -> Result<WorkflowStatus> {
        self.read(|election| Ok(election.current_phase()))
    }

    pub fn get_voter(&self, principal: &Principal) -> Result<Voter> {
        self.read(|election| election.get_voter(principal).cloned())
    }

    pub fn get_proposals(&self) -> Result<Vec<Proposal>> {
        self.read(|election| Ok(election.get_proposals().to_vec()))
    }

    pub fn get_proposal(&self, proposal_id: ProposalId) -> Result<Proposal> {
        self.read(|election| election.get_proposal(proposal_id).cloned())
    }

    pub fn get_winner(&self) -> Result<String> {
        self.read(|election| election.get_winner().map(str::to_string))
    }

    pub fn results(&self) -> Result<Vec<ProposalResult>> {
        self.read(Election::results)
    }

    pub fn events_since(&self, sequence: u64) -> Result<Vec<EventRecord>> {
        self.read(|election| Ok(election.events_since(sequence).to_vec()))
    }

    pub fn snapshot(&self) -> Result<ElectionSnapshot> {
        self.read(|election| Ok(election.snapshot()))
    }
}
