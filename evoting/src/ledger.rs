use crate::*;
use std::collections::BTreeSet;

/// A proposal that every requested peer simulated with identical results
///
/// Holds the agreed read/write set. Nothing has been applied yet.
#[derive(Clone, Debug)]
pub struct EndorsedTransaction {
    pub tx_id: TransactionId,
    pub operation_type: OperationType,
    pub creator: Identity,
    pub endorsers: BTreeSet<OrgId>,
    pub rwset: ReadWriteSet,
    pub response: Response,
}

/// An in-process permissioned ledger: one channel, one peer per organization
///
/// Submit transactions go through endorse (simulate on each endorsing peer),
/// then commit (MVCC-validate reads and apply writes). Evaluate transactions
/// run on the caller's own peer and are never ordered.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Ledger {
    organizations: BTreeSet<OrgId>,
    store: MemStore,
    height: u64,
    committed: BTreeSet<TransactionId>,

    #[serde(default)]
    config: ContractConfig,

    #[serde(default)]
    policies: PolicyTable,
}

impl Ledger {
    pub fn new<I: IntoIterator<Item = OrgId>>(organizations: I) -> Self {
        Ledger {
            organizations: organizations.into_iter().collect(),
            store: MemStore::default(),
            height: 0,
            committed: BTreeSet::new(),
            config: ContractConfig::default(),
            policies: PolicyTable::default(),
        }
    }

    pub fn with_config(mut self, config: ContractConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ContractConfig) {
        self.config = config;
    }

    /// Replace the endorsement policy of an operation
    pub fn set_policy(&mut self, operation: OperationType, policy: EndorsementPolicy) {
        self.policies.set(operation, policy);
    }

    pub fn policy(&self, operation: OperationType) -> &EndorsementPolicy {
        self.policies.get(operation)
    }

    pub fn organizations(&self) -> &BTreeSet<OrgId> {
        &self.organizations
    }

    /// Number of committed blocks
    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn store(&self) -> &MemStore {
        &self.store
    }

    /// Organizations that must endorse an operation submitted by `caller`
    pub fn required_endorsers(&self, operation: OperationType, caller: &OrgId) -> BTreeSet<OrgId> {
        self.policies
            .get(operation)
            .required(caller, &self.organizations)
    }

    fn check_member(&self, org: &OrgId) -> Result<(), Error> {
        if !self.organizations.contains(org) {
            return Err(Error::UnknownOrganization(org.clone()));
        }
        Ok(())
    }

    /// Run an operation on the caller's own peer without ordering it
    pub fn evaluate(&self, creator: &Identity, operation: &Operation) -> Result<Response, Error> {
        self.evaluate_proposal(&Proposal::new(creator.clone(), operation.clone()))
    }

    /// Run a read-only proposal on the caller's own peer
    pub fn evaluate_proposal(&self, proposal: &Proposal) -> Result<Response, Error> {
        let operation_type = proposal.operation.operation_type();
        if !operation_type.is_read_only() {
            return Err(Error::NotEvaluable(operation_type));
        }
        self.check_member(&proposal.creator.msp_id)?;
        let (response, _) = self.simulate(proposal, &proposal.creator.msp_id)?;
        Ok(response)
    }

    fn simulate(
        &self,
        proposal: &Proposal,
        peer_org: &OrgId,
    ) -> Result<(Response, ReadWriteSet), Error> {
        let contract = ElectionContract::new(self.config.clone());
        let mut ctx = TxContext::new(
            &self.store,
            proposal.tx_id,
            &proposal.creator,
            peer_org,
            &proposal.transient,
        );
        let response = contract.invoke(&mut ctx, &proposal.operation)?;
        Ok((response, ctx.into_rwset()))
    }

    /// Collect endorsements for a submit proposal
    ///
    /// Fails if the endorsing organizations do not satisfy the operation's
    /// policy, if any peer rejects the proposal, or if the peers disagree.
    pub fn endorse(&self, proposal: &Proposal) -> Result<EndorsedTransaction, Error> {
        let operation_type = proposal.operation.operation_type();
        if operation_type.is_read_only() {
            return Err(Error::NotSubmittable(operation_type));
        }

        self.check_member(&proposal.creator.msp_id)?;
        for org in proposal.endorsing_orgs.iter() {
            self.check_member(org)?;
        }

        self.policies.get(operation_type).evaluate(
            operation_type,
            &proposal.creator.msp_id,
            &self.organizations,
            &proposal.endorsing_orgs,
        )?;

        let mut agreed: Option<(Response, ReadWriteSet)> = None;
        for org in proposal.endorsing_orgs.iter() {
            let (response, rwset) = self.simulate(proposal, org)?;
            debug!("{} endorsed by {}", proposal.tx_id, org);

            match &agreed {
                Some((first_response, first_rwset)) => {
                    if *first_response != response || *first_rwset != rwset {
                        return Err(Error::EndorsementMismatch(proposal.tx_id));
                    }
                }
                None => agreed = Some((response, rwset)),
            }
        }

        let (response, rwset) = match agreed {
            Some(agreed) => agreed,
            None => {
                return Err(ValidationError::EndorsementPolicyViolation {
                    operation: operation_type,
                    missing: "at least one organization".into(),
                }
                .into())
            }
        };

        Ok(EndorsedTransaction {
            tx_id: proposal.tx_id,
            operation_type,
            creator: proposal.creator.clone(),
            endorsers: proposal.endorsing_orgs.clone(),
            rwset,
            response,
        })
    }

    /// Validate an endorsed transaction against current state and apply it
    pub fn commit(&mut self, transaction: EndorsedTransaction) -> Result<Response, Error> {
        if self.committed.contains(&transaction.tx_id) {
            return Err(Error::DuplicateTransaction(transaction.tx_id));
        }

        if let Err(e) = self.validate_reads(&transaction) {
            warn!(
                "rejecting {} {}: {}",
                transaction.operation_type, transaction.tx_id, e
            );
            return Err(e);
        }

        self.height += 1;
        self.store
            .apply(&transaction.rwset, Version::new(self.height, 0));
        self.committed.insert(transaction.tx_id);

        info!(
            "committed {} {} from {} at block {}",
            transaction.operation_type, transaction.tx_id, transaction.creator, self.height
        );
        Ok(transaction.response)
    }

    /// MVCC check: every version read during simulation must still be current
    fn validate_reads(&self, transaction: &EndorsedTransaction) -> Result<(), Error> {
        let conflict = |key: &str| Error::MvccReadConflict {
            tx_id: transaction.tx_id,
            key: key.to_owned(),
        };

        for (key, version) in transaction.rwset.reads.iter() {
            let current = self.store.get_state(key).map(|v| v.version);
            if current != *version {
                return Err(conflict(key));
            }
        }

        for (collection, reads) in transaction.rwset.hash_reads.iter() {
            for (key, version) in reads.iter() {
                let current = self
                    .store
                    .get_private_data_hash(collection, key)
                    .map(|v| v.version);
                if current != *version {
                    return Err(conflict(key));
                }
            }
        }

        // Phantom check: the range must hold exactly what it held at simulation
        for range in transaction.rwset.range_reads.iter() {
            let current: Vec<(String, Version)> = self
                .store
                .range(&range.start, &range.end)
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.version))
                .collect();
            if current != range.results {
                return Err(conflict(&range.start));
            }
        }

        Ok(())
    }

    /// Endorse and commit in one step
    pub fn submit(&mut self, proposal: Proposal) -> Result<Response, Error> {
        let transaction = match self.endorse(&proposal) {
            Ok(transaction) => transaction,
            Err(e) => {
                warn!(
                    "endorsement failed for {} {}: {}",
                    proposal.operation.operation_type(),
                    proposal.tx_id,
                    e
                );
                return Err(e);
            }
        };
        self.commit(transaction)
    }

    /// Full tally of a closed election, computed on the caller's peer
    pub fn tally(&self, creator: &Identity, election: &str) -> Result<TallyResult, Error> {
        self.check_member(&creator.msp_id)?;

        let contract = ElectionContract::new(self.config.clone());
        let transient = TransientMap::new();
        let mut ctx = TxContext::new(
            &self.store,
            TransactionId::generate(creator),
            creator,
            &creator.msp_id,
            &transient,
        );
        contract.tally_election(&mut ctx, election)
    }

    /// Read a ballot out of an organization's private collection
    ///
    /// Only that organization's peer holds the plaintext.
    pub fn private_ballot(
        &self,
        org: &OrgId,
        election: &str,
        transaction_id: &TransactionId,
    ) -> Result<Option<VotePayload>, Error> {
        self.check_member(org)?;

        let key = ballot_key(election, transaction_id);
        match self
            .store
            .get_private_data(&org.implicit_collection(), &key)
        {
            Some(bytes) => Ok(Some(VotePayload::from_bytes(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
