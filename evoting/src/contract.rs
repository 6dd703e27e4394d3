use crate::*;

/// Switches for behavior that deployments disagree on
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractConfig {
    /// Refuse DisplayVote while the election is still open
    #[serde(default)]
    pub disclose_requires_closed: bool,

    /// Only the organizer may close an election
    #[serde(default)]
    pub organizer_only_close: bool,
}

/// The election contract
///
/// Runs one invocation against a [`TxContext`]. It never touches committed
/// state directly: every read and write goes through the context, and nothing
/// is applied unless the ledger later validates and commits the read/write set.
#[derive(Clone, Debug, Default)]
pub struct ElectionContract {
    config: ContractConfig,
}

impl ElectionContract {
    pub fn new(config: ContractConfig) -> Self {
        ElectionContract { config }
    }

    /// Dispatch an operation
    pub fn invoke<S: Store>(
        &self,
        ctx: &mut TxContext<S>,
        operation: &Operation,
    ) -> Result<Response, Error> {
        debug!(
            "invoking {} for {} on a peer of {}",
            operation.operation_type(),
            ctx.creator(),
            ctx.peer_org()
        );

        match operation {
            Operation::CreateElection { name, candidates } => {
                self.create_election(ctx, name, candidates.clone())
            }
            Operation::QueryElection { name } => {
                let election = load_election(ctx, name)?;
                Ok(Response::Election(election))
            }
            Operation::CloseElection { name } => self.close_election(ctx, name),
            Operation::QueryIdentity => Ok(Response::Identity(ctx.creator().id.clone())),
            Operation::AddVote { election } => self.add_vote(ctx, election),
            Operation::SubmitVote {
                election,
                transaction_id,
            } => self.submit_vote(ctx, election, transaction_id),
            Operation::DisplayVote {
                election,
                transaction_id,
            } => self.display_vote(ctx, election, transaction_id),
            Operation::QueryVote {
                election,
                transaction_id,
            } => self.query_vote(ctx, election, transaction_id),
            Operation::EvaluateElection { election } => {
                let result = self.tally_election(ctx, election)?;
                Ok(Response::Winner(result.winner))
            }
        }
    }

    fn create_election<S: Store>(
        &self,
        ctx: &mut TxContext<S>,
        name: &str,
        candidates: [String; 3],
    ) -> Result<Response, Error> {
        let existing: Option<Election> = read_election(ctx, name)?;
        let organizer = ctx.creator().display_name();
        let election = Election::create(existing.as_ref(), name, candidates, organizer)?;

        ctx.put_record(election.name.clone(), &election)?;
        Ok(Response::Empty)
    }

    fn close_election<S: Store>(
        &self,
        ctx: &mut TxContext<S>,
        name: &str,
    ) -> Result<Response, Error> {
        let election = load_election(ctx, name)?;

        if self.config.organizer_only_close && election.organizer != ctx.creator().display_name()
        {
            return Err(ValidationError::NotOrganizer(election.name).into());
        }

        let closed = election.close()?;
        ctx.put_record(closed.name.clone(), &closed)?;
        Ok(Response::Empty)
    }

    /// Commit a ballot to the caller's own private collection
    ///
    /// The ballot is keyed by this transaction's id, which is returned so the
    /// voter can later link it with SubmitVote.
    fn add_vote<S: Store>(&self, ctx: &mut TxContext<S>, name: &str) -> Result<Response, Error> {
        let election = load_election(ctx, name)?;
        election.require_status(ElectionStatus::Open)?;

        // Only the client's own organization may hold its ballot
        let client = &ctx.creator().msp_id;
        if client != ctx.peer_org() {
            return Err(ValidationError::OrganizationMismatch {
                client: client.clone(),
                peer: ctx.peer_org().clone(),
            }
            .into());
        }

        let payload = transient_vote(ctx.transient(TRANSIENT_VOTE_KEY))?;
        commit_ballot(&election, ctx.creator(), &payload)?;

        let tx_id = ctx.tx_id();
        let collection = client.implicit_collection();
        ctx.put_private_data(
            &collection,
            ballot_key(&election.name, &tx_id),
            payload.canonical_bytes(),
        );

        Ok(Response::TransactionId(tx_id))
    }

    /// Link a committed private ballot to its election
    ///
    /// Only the ballot's hash is read, so every organization can endorse this.
    fn submit_vote<S: Store>(
        &self,
        ctx: &mut TxContext<S>,
        name: &str,
        transaction_id: &TransactionId,
    ) -> Result<Response, Error> {
        let election = load_election(ctx, name)?;
        election.require_status(ElectionStatus::Open)?;

        let collection = ctx.creator().msp_id.implicit_collection();
        let key = ballot_key(&election.name, transaction_id);
        let hash = ctx
            .get_private_data_hash(&collection, &key)
            .ok_or_else(|| ValidationError::BallotNotFound {
                election: election.name.clone(),
                transaction_id: *transaction_id,
            })?;

        let linked = election.link_ballot(*transaction_id, BallotHash(hash))?;
        ctx.put_record(linked.name.clone(), &linked)?;
        Ok(Response::Empty)
    }

    fn display_vote<S: Store>(
        &self,
        ctx: &mut TxContext<S>,
        name: &str,
        transaction_id: &TransactionId,
    ) -> Result<Response, Error> {
        let election = load_election(ctx, name)?;

        let key = disclosed_key(&election.name, transaction_id);
        let already_disclosed = ctx.get_state(&key).is_some();

        let disclosed = disclose_ballot(
            &election,
            *transaction_id,
            ctx.creator(),
            ctx.transient(TRANSIENT_VOTE_KEY),
            already_disclosed,
            self.config.disclose_requires_closed,
        )?;

        ctx.put_record(key, &disclosed)?;
        Ok(Response::Empty)
    }

    fn query_vote<S: Store>(
        &self,
        ctx: &mut TxContext<S>,
        name: &str,
        transaction_id: &TransactionId,
    ) -> Result<Response, Error> {
        let election = load_election(ctx, name)?;

        let key = disclosed_key(&election.name, transaction_id);
        match ctx.get_record::<DisclosedVote>(&key)? {
            Some(vote) => Ok(Response::Vote(vote)),
            None => Err(ValidationError::DisclosedVoteNotFound {
                election: election.name,
                transaction_id: *transaction_id,
            }
            .into()),
        }
    }

    /// Count every disclosed vote of a closed election
    pub fn tally_election<S: Store>(
        &self,
        ctx: &mut TxContext<S>,
        name: &str,
    ) -> Result<TallyResult, Error> {
        let election = load_election(ctx, name)?;
        election.require_status(ElectionStatus::Closed)?;

        let (start, end) = disclosed_range(&election.name);
        let votes = ctx
            .get_state_range(&start, &end)
            .into_iter()
            .map(|(_, packed)| serde_cbor::from_slice::<DisclosedVote>(&packed))
            .collect::<Result<Vec<_>, _>>()?;

        let result = TallyResult::tally(&election, &votes)?;
        debug!(
            "election {:?}: {} counted vote(s), winner {}",
            result.election, result.num_votes, result.winner
        );
        Ok(result)
    }
}

/// Read an election record, if one exists
///
/// Names holding NUL could alias composite keys, so they never resolve.
fn read_election<S: Store>(ctx: &mut TxContext<S>, name: &str) -> Result<Option<Election>, Error> {
    if name.contains('\u{0}') {
        return Ok(None);
    }
    ctx.get_record(name)
}

fn load_election<S: Store>(ctx: &mut TxContext<S>, name: &str) -> Result<Election, Error> {
    match read_election(ctx, name)? {
        Some(election) => Ok(election),
        None => Err(ValidationError::ElectionNotFound(name.to_owned()).into()),
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn candidates() -> [String; 3] {
        ["A".into(), "B".into(), "C".into()]
    }

    fn run(
        contract: &ElectionContract,
        store: &mut MemStore,
        creator: &Identity,
        operation: Operation,
        transient: &TransientMap,
    ) -> Result<Response, Error> {
        let tx_id = TransactionId::generate(creator);
        let peer = creator.msp_id.clone();
        let (response, rwset) = {
            let mut ctx = TxContext::new(&*store, tx_id, creator, &peer, transient);
            let response = contract.invoke(&mut ctx, &operation)?;
            (response, ctx.into_rwset())
        };
        store.apply(&rwset, Version::new(store.len() as u64 + 1, 0));
        Ok(response)
    }

    #[test]
    fn test_create_and_close() {
        let contract = ElectionContract::default();
        let mut store = MemStore::default();
        let organizer = Identity::x509(OrgId::new("Org1MSP"), "admin");
        let none = TransientMap::new();

        let create = Operation::CreateElection {
            name: "E1".into(),
            candidates: candidates(),
        };
        run(&contract, &mut store, &organizer, create.clone(), &none).unwrap();

        let err = run(&contract, &mut store, &organizer, create, &none).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let query = Operation::QueryElection { name: "E1".into() };
        let response = run(&contract, &mut store, &organizer, query.clone(), &none).unwrap();
        let election = response.election().unwrap();
        assert_eq!(election.organizer, "admin");
        assert!(election.is_open());

        let missing = Operation::QueryElection { name: "E2".into() };
        let err = run(&contract, &mut store, &organizer, missing, &none).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let close = Operation::CloseElection { name: "E1".into() };
        run(&contract, &mut store, &organizer, close.clone(), &none).unwrap();
        let err = run(&contract, &mut store, &organizer, close, &none).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_organizer_only_close() {
        let contract = ElectionContract::new(ContractConfig {
            organizer_only_close: true,
            ..Default::default()
        });
        let mut store = MemStore::default();
        let organizer = Identity::x509(OrgId::new("Org1MSP"), "admin");
        let other = Identity::x509(OrgId::new("Org2MSP"), "user1");
        let none = TransientMap::new();

        let create = Operation::CreateElection {
            name: "E1".into(),
            candidates: candidates(),
        };
        run(&contract, &mut store, &organizer, create, &none).unwrap();

        let close = Operation::CloseElection { name: "E1".into() };
        let err = run(&contract, &mut store, &other, close.clone(), &none).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::NotOrganizer(_))
        ));
        run(&contract, &mut store, &organizer, close, &none).unwrap();
    }

    #[test]
    fn test_add_vote_keeps_ballot_private() {
        let contract = ElectionContract::default();
        let mut store = MemStore::default();
        let voter = Identity::new(OrgId::new("Org1MSP"), "v1");
        let none = TransientMap::new();

        let create = Operation::CreateElection {
            name: "E1".into(),
            candidates: candidates(),
        };
        run(&contract, &mut store, &voter, create, &none).unwrap();
        let public_keys = store.len();

        let add = Operation::AddVote {
            election: "E1".into(),
        };

        // No payload
        let err = run(&contract, &mut store, &voter, add.clone(), &none).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingTransient(_))
        ));

        let mut transient = TransientMap::new();
        transient.insert(
            TRANSIENT_VOTE_KEY.into(),
            VotePayload::new("v1", "B").canonical_bytes(),
        );
        let tx_id = run(&contract, &mut store, &voter, add, &transient)
            .unwrap()
            .transaction_id()
            .unwrap();

        assert_eq!(store.len(), public_keys);
        let key = ballot_key("E1", &tx_id);
        assert_eq!(
            store.get_private_data("_implicit_org_Org1MSP", &key),
            Some(VotePayload::new("v1", "B").canonical_bytes().as_slice())
        );
    }

    #[test]
    fn test_add_vote_on_closed_election() {
        let contract = ElectionContract::default();
        let mut store = MemStore::default();
        let voter = Identity::new(OrgId::new("Org1MSP"), "v1");
        let none = TransientMap::new();

        let create = Operation::CreateElection {
            name: "E1".into(),
            candidates: candidates(),
        };
        run(&contract, &mut store, &voter, create, &none).unwrap();
        let close = Operation::CloseElection { name: "E1".into() };
        run(&contract, &mut store, &voter, close, &none).unwrap();

        let add = Operation::AddVote {
            election: "E1".into(),
        };

        // The closed election is reported before the payload is looked at
        let err = run(&contract, &mut store, &voter, add.clone(), &none).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let mut garbage = TransientMap::new();
        garbage.insert(TRANSIENT_VOTE_KEY.into(), b"not json".to_vec());
        let err = run(&contract, &mut store, &voter, add, &garbage).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_add_vote_on_foreign_peer() {
        let contract = ElectionContract::default();
        let mut store = MemStore::default();
        let voter = Identity::new(OrgId::new("Org1MSP"), "v1");
        let none = TransientMap::new();

        let create = Operation::CreateElection {
            name: "E1".into(),
            candidates: candidates(),
        };
        run(&contract, &mut store, &voter, create, &none).unwrap();

        let mut transient = TransientMap::new();
        transient.insert(
            TRANSIENT_VOTE_KEY.into(),
            VotePayload::new("v1", "A").canonical_bytes(),
        );

        let foreign = OrgId::new("Org2MSP");
        let tx_id = TransactionId::generate(&voter);
        let mut ctx = TxContext::new(&store, tx_id, &voter, &foreign, &transient);
        let add = Operation::AddVote {
            election: "E1".into(),
        };
        let err = contract.invoke(&mut ctx, &add).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(ctx.into_rwset().is_read_only());
    }

    #[test]
    fn test_query_identity() {
        let contract = ElectionContract::default();
        let mut store = MemStore::default();
        let user = Identity::x509(OrgId::new("Org2MSP"), "user7");

        let response = run(
            &contract,
            &mut store,
            &user,
            Operation::QueryIdentity,
            &TransientMap::new(),
        )
        .unwrap();
        assert_eq!(response, Response::Identity(user.id.clone()));
    }

    #[test]
    fn test_names_with_nul_never_resolve() {
        let contract = ElectionContract::default();
        let mut store = MemStore::default();
        let user = Identity::new(OrgId::new("Org1MSP"), "v1");

        let query = Operation::QueryElection {
            name: "\u{0}disclosed\u{0}".into(),
        };
        let err = run(&contract, &mut store, &user, query, &TransientMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
