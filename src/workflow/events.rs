//! Notifications for completed mutations
//!
//! Every accepted mutation appends one or more [`EventRecord`]s to the
//! election's [`EventLog`]. Records form a blake3 hash chain: each one commits
//! to the hash of its predecessor, so a relayed copy of the log can be checked
//! for gaps or edits with [`EventLog::verify_chain`].

use crate::Result;
use crate::types::{Principal, ProposalId, WorkflowStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// What happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionEvent {
    VoterRegistered {
        voter: Principal,
    },
    WorkflowStatusChange {
        previous: WorkflowStatus,
        new: WorkflowStatus,
    },
    ProposalRegistered {
        proposal_id: ProposalId,
    },
    Voted {
        voter: Principal,
        proposal_id: ProposalId,
    },
    VotesTallied {
        winning_proposal_id: ProposalId,
    },
}

/// A sealed entry of the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub record_id: Uuid,

    /// Position in the log, starting at 0
    pub sequence: u64,

    pub recorded_at: DateTime<Utc>,

    /// Hash of the preceding record, `None` for the first one
    pub previous_hash: Option<[u8; 32]>,

    /// Hash over everything above plus the event
    pub hash: [u8; 32],

    pub event: ElectionEvent,
}

#[derive(Serialize)]
struct HashedContent<'a> {
    record_id: &'a Uuid,
    sequence: u64,
    recorded_at: &'a DateTime<Utc>,
    previous_hash: &'a Option<[u8; 32]>,
    event: &'a ElectionEvent,
}

impl EventRecord {
    fn seal(sequence: u64, previous_hash: Option<[u8; 32]>, event: ElectionEvent) -> Result<Self> {
        let record_id = Uuid::new_v4();
        let recorded_at = Utc::now();

        let hash = Self::content_hash(&HashedContent {
            record_id: &record_id,
            sequence,
            recorded_at: &recorded_at,
            previous_hash: &previous_hash,
            event: &event,
        })?;

        Ok(Self {
            record_id,
            sequence,
            recorded_at,
            previous_hash,
            hash,
            event,
        })
    }

    fn content_hash(content: &HashedContent<'_>) -> Result<[u8; 32]> {
        let bytes = serde_json::to_vec(content)?;
        Ok(*blake3::hash(&bytes).as_bytes())
    }

    /// Recompute the hash and compare it with the stored one
    pub fn verify_integrity(&self) -> Result<bool> {
        let expected = Self::content_hash(&HashedContent {
            record_id: &self.record_id,
            sequence: self.sequence,
            recorded_at: &self.recorded_at,
            previous_hash: &self.previous_hash,
            event: &self.event,
        })?;

        Ok(self.hash.as_slice().ct_eq(expected.as_slice()).into())
    }

    /// Hex form of the record hash, for logs and display
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Append-only, hash-chained log of election events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seal and append a batch of events
    ///
    /// Nothing is appended unless every record of the batch was sealed.
    pub fn append(&mut self, events: Vec<ElectionEvent>) -> Result<Vec<EventRecord>> {
        let mut sequence = self.records.len() as u64;
        let mut previous_hash = self.records.last().map(|record| record.hash);
        let mut sealed = Vec::with_capacity(events.len());

        for event in events {
            let record = EventRecord::seal(sequence, previous_hash, event)?;
            previous_hash = Some(record.hash);
            sequence += 1;
            sealed.push(record);
        }

        self.records.extend(sealed.iter().cloned());
        Ok(sealed)
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `sequence >= from`
    pub fn since(&self, from: u64) -> &[EventRecord] {
        let start = usize::try_from(from)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check every record hash and every link of the chain
    pub fn verify_chain(&self) -> Result<bool> {
        let mut previous_hash: Option<[u8; 32]> = None;

        for (position, record) in self.records.iter().enumerate() {
            if record.sequence != position as u64 || record.previous_hash != previous_hash {
                return Ok(false);
            }

            if !record.verify_integrity()? {
                return Ok(false);
            }

            previous_hash = Some(record.hash);
        }

        Ok(true)
    }
}
