use crate::*;
use indexmap::IndexMap;

/// Lifecycle of an election
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ElectionStatus {
    Open,
    Closed,
}

impl std::fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ElectionStatus::Open => "open",
            ElectionStatus::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// Hash of a ballot's private payload
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct BallotHash(#[serde(with = "hex_serde")] pub Vec<u8>);

/// An election, stored in public state under its name
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Election {
    pub name: String,

    /// Exactly three candidates, in creation order
    pub candidates: [String; 3],

    /// Display name of the identity that created the election
    pub organizer: String,

    pub status: ElectionStatus,

    /// Ballots linked to this election by SubmitVote, with their commitment hashes
    pub submitted: IndexMap<TransactionId, BallotHash>,
}

impl Election {
    /// Create a new open election
    pub fn new(
        name: &str,
        candidates: [String; 3],
        organizer: String,
    ) -> Result<Self, ValidationError> {
        validate_name("election name", name)?;
        for candidate in candidates.iter() {
            validate_name("candidate name", candidate)?;
        }
        if candidates[0] == candidates[1]
            || candidates[0] == candidates[2]
            || candidates[1] == candidates[2]
        {
            return Err(ValidationError::InvalidArgument(
                "candidates must be distinct".into(),
            ));
        }

        Ok(Election {
            name: name.to_owned(),
            candidates,
            organizer,
            status: ElectionStatus::Open,
            submitted: IndexMap::new(),
        })
    }

    /// Creation transition: fails if an election is already stored under the name
    pub fn create(
        existing: Option<&Election>,
        name: &str,
        candidates: [String; 3],
        organizer: String,
    ) -> Result<Self, ValidationError> {
        if existing.is_some() {
            return Err(ValidationError::ElectionAlreadyExists(name.to_owned()));
        }
        Election::new(name, candidates, organizer)
    }

    pub fn is_open(&self) -> bool {
        self.status == ElectionStatus::Open
    }

    pub fn require_status(&self, required: ElectionStatus) -> Result<(), ValidationError> {
        if self.status != required {
            return Err(ValidationError::InvalidState {
                election: self.name.clone(),
                status: self.status,
                required,
            });
        }
        Ok(())
    }

    /// Position of a candidate in creation order
    pub fn candidate_index(&self, candidate: &str) -> Option<usize> {
        self.candidates.iter().position(|c| c == candidate)
    }

    pub fn require_candidate(&self, candidate: &str) -> Result<(), ValidationError> {
        match self.candidate_index(candidate) {
            Some(_) => Ok(()),
            None => Err(ValidationError::InvalidCandidate(candidate.to_owned())),
        }
    }

    /// Close transition
    pub fn close(&self) -> Result<Self, ValidationError> {
        self.require_status(ElectionStatus::Open)?;

        let mut closed = self.clone();
        closed.status = ElectionStatus::Closed;
        Ok(closed)
    }

    /// SubmitVote transition: record that a committed ballot belongs to this election
    pub fn link_ballot(
        &self,
        transaction_id: TransactionId,
        hash: BallotHash,
    ) -> Result<Self, ValidationError> {
        self.require_status(ElectionStatus::Open)?;
        if self.submitted.contains_key(&transaction_id) {
            return Err(ValidationError::AlreadySubmitted(transaction_id));
        }

        let mut linked = self.clone();
        linked.submitted.insert(transaction_id, hash);
        Ok(linked)
    }

    /// Commitment hash of a linked ballot
    pub fn submitted_hash(&self, transaction_id: &TransactionId) -> Option<&BallotHash> {
        self.submitted.get(transaction_id)
    }
}

fn validate_name(what: &str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidArgument(format!("{} is empty", what)));
    }
    if name.contains('\u{0}') {
        return Err(ValidationError::InvalidArgument(format!(
            "{} contains a NUL character",
            what
        )));
    }
    Ok(())
}
