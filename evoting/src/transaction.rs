use crate::*;
use content_inspector::ContentType;
use digest::Digest;
use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Key of the transient field carrying a private vote payload
pub const TRANSIENT_VOTE_KEY: &str = "vote";

/// Transient arguments. These reach the endorsing peers but never the ledger.
pub type TransientMap = BTreeMap<String, Vec<u8>>;

/// A contract operation
///
/// This is the closed set of everything a client can ask of the contract.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateElection {
        name: String,
        candidates: [String; 3],
    },
    QueryElection {
        name: String,
    },
    CloseElection {
        name: String,
    },
    QueryIdentity,
    AddVote {
        election: String,
    },
    SubmitVote {
        election: String,
        transaction_id: TransactionId,
    },
    DisplayVote {
        election: String,
        transaction_id: TransactionId,
    },
    QueryVote {
        election: String,
        transaction_id: TransactionId,
    },
    EvaluateElection {
        election: String,
    },
}

impl Operation {
    /// Get the operation type
    pub fn operation_type(&self) -> OperationType {
        match self {
            Operation::CreateElection { .. } => OperationType::CreateElection,
            Operation::QueryElection { .. } => OperationType::QueryElection,
            Operation::CloseElection { .. } => OperationType::CloseElection,
            Operation::QueryIdentity => OperationType::QueryIdentity,
            Operation::AddVote { .. } => OperationType::AddVote,
            Operation::SubmitVote { .. } => OperationType::SubmitVote,
            Operation::DisplayVote { .. } => OperationType::DisplayVote,
            Operation::QueryVote { .. } => OperationType::QueryVote,
            Operation::EvaluateElection { .. } => OperationType::EvaluateElection,
        }
    }

    /// Resolve a named invocation with positional string arguments
    pub fn from_invocation(name: &str, args: &[String]) -> Result<Self, Error> {
        let operation_type: OperationType = name.parse()?;

        let expected = operation_type.arity();
        if args.len() != expected {
            return Err(Error::WrongArgumentCount(
                operation_type,
                expected,
                args.len(),
            ));
        }

        let arg = |i: usize| args[i].clone();
        let tx_arg = |i: usize| -> Result<TransactionId, Error> { args[i].parse() };

        let operation = match operation_type {
            OperationType::CreateElection => Operation::CreateElection {
                name: arg(0),
                candidates: [arg(1), arg(2), arg(3)],
            },
            OperationType::QueryElection => Operation::QueryElection { name: arg(0) },
            OperationType::CloseElection => Operation::CloseElection { name: arg(0) },
            OperationType::QueryIdentity => Operation::QueryIdentity,
            OperationType::AddVote => Operation::AddVote { election: arg(0) },
            OperationType::SubmitVote => Operation::SubmitVote {
                election: arg(0),
                transaction_id: tx_arg(1)?,
            },
            OperationType::DisplayVote => Operation::DisplayVote {
                election: arg(0),
                transaction_id: tx_arg(1)?,
            },
            OperationType::QueryVote => Operation::QueryVote {
                election: arg(0),
                transaction_id: tx_arg(1)?,
            },
            OperationType::EvaluateElection => Operation::EvaluateElection { election: arg(0) },
        };

        Ok(operation)
    }

    /// Pack into bytes
    pub fn as_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(self).expect("evoting: Unexpected error packing operation")
    }

    /// Unpack from JSON or CBOR bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        // Small CBOR maps carry no NUL bytes and inspect as text
        let is_json = bytes.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{');

        match content_inspector::inspect(bytes) {
            ContentType::UTF_8 if is_json => Ok(serde_json::from_slice(bytes)?),
            ContentType::UTF_8 | ContentType::BINARY => Ok(serde_cbor::from_slice(bytes)?),
            _ => Err(Error::DeserializationUnknownFormat),
        }
    }
}

/// Whether an operation is ordered onto the ledger or only evaluated
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperationClass {
    Submit,
    Evaluate,
}

/// An operation type
#[derive(Serialize, Deserialize, Copy, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    CreateElection,
    QueryElection,
    CloseElection,
    QueryIdentity,
    AddVote,
    SubmitVote,
    DisplayVote,
    QueryVote,
    EvaluateElection,
}

impl OperationType {
    pub const ALL: [OperationType; 9] = [
        OperationType::CreateElection,
        OperationType::QueryElection,
        OperationType::CloseElection,
        OperationType::QueryIdentity,
        OperationType::AddVote,
        OperationType::SubmitVote,
        OperationType::DisplayVote,
        OperationType::QueryVote,
        OperationType::EvaluateElection,
    ];

    /// The contract function name
    pub fn name(&self) -> &'static str {
        match self {
            OperationType::CreateElection => "CreateElection",
            OperationType::QueryElection => "QueryElection",
            OperationType::CloseElection => "CloseElection",
            OperationType::QueryIdentity => "QueryIdentity",
            OperationType::AddVote => "AddVote",
            OperationType::SubmitVote => "SubmitVote",
            OperationType::DisplayVote => "DisplayVote",
            OperationType::QueryVote => "QueryVote",
            OperationType::EvaluateElection => "EvaluateElection",
        }
    }

    pub fn class(&self) -> OperationClass {
        match self {
            OperationType::CreateElection
            | OperationType::CloseElection
            | OperationType::AddVote
            | OperationType::SubmitVote
            | OperationType::DisplayVote => OperationClass::Submit,
            OperationType::QueryElection
            | OperationType::QueryIdentity
            | OperationType::QueryVote
            | OperationType::EvaluateElection => OperationClass::Evaluate,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.class() == OperationClass::Evaluate
    }

    /// Number of positional (public) arguments
    pub fn arity(&self) -> usize {
        match self {
            OperationType::QueryIdentity => 0,
            OperationType::QueryElection
            | OperationType::CloseElection
            | OperationType::AddVote
            | OperationType::EvaluateElection => 1,
            OperationType::SubmitVote | OperationType::DisplayVote | OperationType::QueryVote => 2,
            OperationType::CreateElection => 4,
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OperationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationType::ALL
            .iter()
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| Error::UnknownOperation(s.to_owned()))
    }
}

/// Transaction identifier
///
/// Assigned by the substrate: the SHA-256 of a random nonce and the creator's identity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId([u8; 32]);

impl TransactionId {
    pub fn new(nonce: &[u8], creator: &Identity) -> Self {
        let mut sha = sha2::Sha256::new();
        sha.update(nonce);
        sha.update(creator.msp_id.as_str().as_bytes());
        sha.update(creator.id.as_bytes());

        let mut id = [0; 32];
        id.copy_from_slice(&sha.finalize());
        TransactionId(id)
    }

    /// Create a new transaction identifier with a fresh nonce
    pub fn generate(creator: &Identity) -> Self {
        let mut csprng = rand::rngs::OsRng {};
        let nonce: [u8; 24] = csprng.gen();
        Self::new(&nonce, creator)
    }
}

impl FromStr for TransactionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| Error::TransactionIdBadHex)?;
        if bytes.len() != 32 {
            return Err(Error::TransactionIdBadLen);
        }

        let mut id = [0; 32];
        id.copy_from_slice(&bytes);
        Ok(TransactionId(id))
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for TransactionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// A transaction proposal, as sent by a client to the endorsing peers
#[derive(Clone, Debug)]
pub struct Proposal {
    pub tx_id: TransactionId,
    pub creator: Identity,
    pub operation: Operation,
    pub transient: TransientMap,
    pub endorsing_orgs: BTreeSet<OrgId>,
}

impl Proposal {
    pub fn new(creator: Identity, operation: Operation) -> Self {
        Proposal {
            tx_id: TransactionId::generate(&creator),
            creator,
            operation,
            transient: TransientMap::new(),
            endorsing_orgs: BTreeSet::new(),
        }
    }

    /// Attach a transient field
    pub fn with_transient(mut self, key: &str, value: Vec<u8>) -> Self {
        self.transient.insert(key.to_owned(), value);
        self
    }

    /// Attach a private vote payload under the `vote` transient key
    pub fn with_vote(self, vote: &VotePayload) -> Self {
        let bytes = vote.canonical_bytes();
        self.with_transient(TRANSIENT_VOTE_KEY, bytes)
    }

    /// Ask these organizations' peers to endorse the proposal
    pub fn endorsed_by<I: IntoIterator<Item = OrgId>>(mut self, orgs: I) -> Self {
        self.endorsing_orgs.extend(orgs);
        self
    }
}

/// The result of an invocation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", content = "value")]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Empty,
    Election(Election),
    Identity(String),
    TransactionId(TransactionId),
    Vote(DisclosedVote),
    Winner(String),
}

impl Response {
    pub fn election(&self) -> Option<&Election> {
        match self {
            Response::Election(e) => Some(e),
            _ => None,
        }
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            Response::TransactionId(id) => Some(*id),
            _ => None,
        }
    }

    pub fn vote(&self) -> Option<&DisclosedVote> {
        match self {
            Response::Vote(v) => Some(v),
            _ => None,
        }
    }

    pub fn winner(&self) -> Option<&str> {
        match self {
            Response::Winner(w) => Some(w),
            _ => None,
        }
    }
}
