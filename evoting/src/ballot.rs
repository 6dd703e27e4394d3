use crate::*;

/// Object type of private ballot keys
pub const BALLOT_OBJECT_TYPE: &str = "vote";

/// Object type of disclosed vote keys
pub const DISCLOSED_OBJECT_TYPE: &str = "disclosed";

/// The private content of a ballot
///
/// Sent through the transient channel at AddVote and again at DisplayVote.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VotePayload {
    /// Raw identity of the voter
    pub vote_from: String,

    /// Chosen candidate
    pub vote_to: String,
}

impl VotePayload {
    pub fn new(vote_from: impl Into<String>, vote_to: impl Into<String>) -> Self {
        VotePayload {
            vote_from: vote_from.into(),
            vote_to: vote_to.into(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(bytes).map_err(|e| ValidationError::MalformedPayload(e.to_string()))
    }

    /// Canonical encoding. Commitments are computed over these bytes, so a
    /// payload resubmitted with different whitespace or field order still matches.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("evoting: Unexpected error serializing vote payload")
    }

    pub fn commitment(&self) -> BallotHash {
        BallotHash(sha256(&self.canonical_bytes()))
    }
}

/// A vote made public by DisplayVote
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DisclosedVote {
    pub transaction_id: TransactionId,
    pub election_name: String,

    /// Normalized identity of the voter
    pub vote_from: String,

    pub vote_to: String,
}

/// Key of a ballot in its organization's private collection
pub fn ballot_key(election: &str, transaction_id: &TransactionId) -> String {
    composite_key(BALLOT_OBJECT_TYPE, &[election, &transaction_id.to_string()])
}

/// Key of a disclosed vote in public state
pub fn disclosed_key(election: &str, transaction_id: &TransactionId) -> String {
    composite_key(
        DISCLOSED_OBJECT_TYPE,
        &[election, &transaction_id.to_string()],
    )
}

/// Key range holding every disclosed vote of an election
pub fn disclosed_range(election: &str) -> (String, String) {
    composite_key_range(DISCLOSED_OBJECT_TYPE, &[election])
}

/// Read the vote payload out of the transient channel
pub fn transient_vote(transient: Option<&[u8]>) -> Result<VotePayload, ValidationError> {
    let bytes =
        transient.ok_or_else(|| ValidationError::MissingTransient(TRANSIENT_VOTE_KEY.into()))?;
    VotePayload::from_bytes(bytes)
}

/// AddVote transition: validate a ballot against its election and return its commitment
///
/// Nothing about the payload leaves this function except the hash.
pub fn commit_ballot(
    election: &Election,
    caller: &Identity,
    payload: &VotePayload,
) -> Result<BallotHash, ValidationError> {
    election.require_status(ElectionStatus::Open)?;
    election.require_candidate(&payload.vote_to)?;

    if payload.vote_from != caller.id {
        return Err(ValidationError::NotBallotOwner);
    }

    Ok(payload.commitment())
}

/// DisplayVote transition: turn a linked ballot into a disclosed vote
///
/// `transient` is the re-supplied payload. It must hash to the commitment
/// recorded when the ballot was linked.
pub fn disclose_ballot(
    election: &Election,
    transaction_id: TransactionId,
    caller: &Identity,
    transient: Option<&[u8]>,
    already_disclosed: bool,
    require_closed: bool,
) -> Result<DisclosedVote, ValidationError> {
    let linked_hash = election.submitted_hash(&transaction_id).ok_or_else(|| {
        ValidationError::BallotNotFound {
            election: election.name.clone(),
            transaction_id,
        }
    })?;

    if already_disclosed {
        return Err(ValidationError::AlreadyDisclosed(transaction_id));
    }

    if require_closed {
        election.require_status(ElectionStatus::Closed)?;
    }

    let payload = transient_vote(transient)?;
    if payload.commitment() != *linked_hash {
        return Err(ValidationError::CommitmentMismatch(transaction_id));
    }

    if payload.vote_from != caller.id {
        return Err(ValidationError::NotBallotOwner);
    }

    election.require_candidate(&payload.vote_to)?;

    Ok(DisclosedVote {
        transaction_id,
        election_name: election.name.clone(),
        vote_from: normalize_identity(&payload.vote_from),
        vote_to: payload.vote_to.clone(),
    })
}

#[cfg(test)]
mod tests {

    use super::*;

    fn setup() -> (Election, Identity, TransactionId) {
        let election = Election::new(
            "E1",
            ["A".into(), "B".into(), "C".into()],
            "organizer".into(),
        )
        .unwrap();
        let voter = Identity::x509(OrgId::new("Org1MSP"), "voter1");
        let tx_id = TransactionId::generate(&voter);
        (election, voter, tx_id)
    }

    #[test]
    fn test_commitment_is_canonical() {
        let payload = VotePayload::new("v1", "A");
        let reordered = br#"{ "voteTo": "A",   "voteFrom": "v1" }"#;
        let parsed = VotePayload::from_bytes(reordered).unwrap();

        assert_eq!(parsed, payload);
        assert_eq!(parsed.commitment(), payload.commitment());
        assert_ne!(VotePayload::new("v1", "B").commitment(), payload.commitment());

        let err = VotePayload::from_bytes(b"{\"voteTo\": 1}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = transient_vote(None).unwrap_err();
        assert!(matches!(err, ValidationError::MissingTransient(_)));
    }

    #[test]
    fn test_commit_ballot() {
        let (election, voter, _) = setup();

        let payload = VotePayload::new(voter.id.clone(), "B");
        assert_eq!(
            commit_ballot(&election, &voter, &payload).unwrap(),
            payload.commitment()
        );

        let bad_candidate = VotePayload::new(voter.id.clone(), "Z");
        assert_eq!(
            commit_ballot(&election, &voter, &bad_candidate)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidCandidate
        );

        let impostor = VotePayload::new("someone else", "B");
        assert!(matches!(
            commit_ballot(&election, &voter, &impostor),
            Err(ValidationError::NotBallotOwner)
        ));

        let closed = election.close().unwrap();
        assert_eq!(
            commit_ballot(&closed, &voter, &payload).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
    }

    #[test]
    fn test_disclose_ballot() {
        let (election, voter, tx_id) = setup();
        let payload = VotePayload::new(voter.id.clone(), "C");
        let bytes = payload.canonical_bytes();
        let resupplied = Some(bytes.as_slice());

        // Not linked yet
        let err = disclose_ballot(&election, tx_id, &voter, resupplied, false, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let election = election.link_ballot(tx_id, payload.commitment()).unwrap();

        // Disclosure does not require a closed election by default
        let disclosed = disclose_ballot(&election, tx_id, &voter, resupplied, false, false).unwrap();
        assert_eq!(disclosed.vote_from, "voter1");
        assert_eq!(disclosed.vote_to, "C");
        assert_eq!(disclosed.election_name, "E1");
        assert_eq!(disclosed.transaction_id, tx_id);

        // ...unless configured to
        let err = disclose_ballot(&election, tx_id, &voter, resupplied, false, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let err = disclose_ballot(&election, tx_id, &voter, resupplied, true, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyDisclosed);

        let err = disclose_ballot(&election, tx_id, &voter, None, false, false).unwrap_err();
        assert!(matches!(err, ValidationError::MissingTransient(_)));

        let tampered = VotePayload::new(voter.id.clone(), "A").canonical_bytes();
        let err = disclose_ballot(&election, tx_id, &voter, Some(&tampered), false, false)
            .unwrap_err();
        assert!(matches!(err, ValidationError::CommitmentMismatch(_)));

        let other = Identity::x509(OrgId::new("Org2MSP"), "voter2");
        let err = disclose_ballot(&election, tx_id, &other, resupplied, false, false).unwrap_err();
        assert!(matches!(err, ValidationError::NotBallotOwner));
    }
}
