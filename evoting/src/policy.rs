use crate::*;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Membership service provider id of an organization
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct OrgId(String);

impl OrgId {
    pub fn new(msp_id: impl Into<String>) -> Self {
        OrgId(msp_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the private collection that only this organization's peers hold
    pub fn implicit_collection(&self) -> String {
        format!("_implicit_org_{}", self.0)
    }

    /// `Org1MSP` -> `org1`
    pub(crate) fn domain_label(&self) -> String {
        self.0.trim_end_matches("MSP").to_lowercase()
    }
}

impl std::fmt::Display for OrgId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrgId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::InvalidArgument("empty organization id".into()).into());
        }
        Ok(OrgId(s.to_owned()))
    }
}

impl From<&str> for OrgId {
    fn from(s: &str) -> Self {
        OrgId(s.to_owned())
    }
}

/// The set of organizations whose peers must sign a transaction
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignerSet {
    /// Nobody; the operation is evaluated but never committed
    Nobody,

    /// The organization of the submitting client
    CallerOrg,

    /// Every organization on the channel
    AllOrgs,

    /// A fixed set of organizations
    Orgs(BTreeSet<OrgId>),
}

/// An endorsement policy, parameterized by its required signer set
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EndorsementPolicy {
    pub signers: SignerSet,
}

impl EndorsementPolicy {
    pub fn new(signers: SignerSet) -> Self {
        EndorsementPolicy { signers }
    }

    /// Resolve the signer set against a caller and a channel
    pub fn required(&self, caller: &OrgId, channel: &BTreeSet<OrgId>) -> BTreeSet<OrgId> {
        match &self.signers {
            SignerSet::Nobody => BTreeSet::new(),
            SignerSet::CallerOrg => {
                let mut required = BTreeSet::new();
                required.insert(caller.clone());
                required
            }
            SignerSet::AllOrgs => channel.clone(),
            SignerSet::Orgs(orgs) => orgs.clone(),
        }
    }

    /// Check that `endorsers` covers every required signer
    pub fn evaluate(
        &self,
        operation: OperationType,
        caller: &OrgId,
        channel: &BTreeSet<OrgId>,
        endorsers: &BTreeSet<OrgId>,
    ) -> Result<(), ValidationError> {
        let required = self.required(caller, channel);
        let missing: Vec<String> = required
            .difference(endorsers)
            .map(|org| org.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ValidationError::EndorsementPolicyViolation {
                operation,
                missing: missing.join(", "),
            });
        }

        Ok(())
    }
}

/// Endorsement policy per operation
///
/// Serialized as a map from operation type to policy. Operations missing
/// from a stored map keep their default policy.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(
    from = "BTreeMap<OperationType, EndorsementPolicy>",
    into = "BTreeMap<OperationType, EndorsementPolicy>"
)]
pub struct PolicyTable {
    policies: BTreeMap<OperationType, EndorsementPolicy>,
}

impl PolicyTable {
    pub fn get(&self, operation: OperationType) -> &EndorsementPolicy {
        // Every operation type is populated by Default and set() only replaces
        &self.policies[&operation]
    }

    pub fn set(&mut self, operation: OperationType, policy: EndorsementPolicy) {
        self.policies.insert(operation, policy);
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        let mut policies = BTreeMap::new();
        for operation in OperationType::ALL.iter().copied() {
            let signers = match operation {
                OperationType::CreateElection | OperationType::AddVote => SignerSet::CallerOrg,
                OperationType::CloseElection
                | OperationType::SubmitVote
                | OperationType::DisplayVote => SignerSet::AllOrgs,
                OperationType::QueryElection
                | OperationType::QueryIdentity
                | OperationType::QueryVote
                | OperationType::EvaluateElection => SignerSet::Nobody,
            };
            policies.insert(operation, EndorsementPolicy::new(signers));
        }
        PolicyTable { policies }
    }
}

impl From<BTreeMap<OperationType, EndorsementPolicy>> for PolicyTable {
    fn from(stored: BTreeMap<OperationType, EndorsementPolicy>) -> Self {
        let mut table = PolicyTable::default();
        table.policies.extend(stored);
        table
    }
}

impl From<PolicyTable> for BTreeMap<OperationType, EndorsementPolicy> {
    fn from(table: PolicyTable) -> Self {
        table.policies
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn channel(orgs: &[&str]) -> BTreeSet<OrgId> {
        orgs.iter().map(|o| OrgId::from(*o)).collect()
    }

    #[test]
    fn test_default_policies() {
        let table = PolicyTable::default();
        assert_eq!(
            table.get(OperationType::AddVote).signers,
            SignerSet::CallerOrg
        );
        assert_eq!(
            table.get(OperationType::SubmitVote).signers,
            SignerSet::AllOrgs
        );
        assert_eq!(
            table.get(OperationType::QueryVote).signers,
            SignerSet::Nobody
        );
    }

    #[test]
    fn test_policy_evaluation() {
        let orgs = channel(&["Org1MSP", "Org2MSP", "Org3MSP"]);
        let caller = OrgId::from("Org2MSP");

        let single = EndorsementPolicy::new(SignerSet::CallerOrg);
        assert!(single
            .evaluate(OperationType::AddVote, &caller, &orgs, &channel(&["Org2MSP"]))
            .is_ok());
        assert!(single
            .evaluate(OperationType::AddVote, &caller, &orgs, &channel(&["Org1MSP"]))
            .is_err());

        let all = EndorsementPolicy::new(SignerSet::AllOrgs);
        let err = all
            .evaluate(
                OperationType::SubmitVote,
                &caller,
                &orgs,
                &channel(&["Org1MSP", "Org2MSP"]),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EndorsementPolicyViolation);
        assert!(err.to_string().contains("Org3MSP"));
        assert!(all
            .evaluate(OperationType::SubmitVote, &caller, &orgs, &orgs)
            .is_ok());

        let fixed = EndorsementPolicy::new(SignerSet::Orgs(channel(&["Org1MSP"])));
        assert!(fixed
            .evaluate(OperationType::CloseElection, &caller, &orgs, &channel(&["Org1MSP"]))
            .is_ok());
    }

    #[test]
    fn test_stored_table_keeps_missing_defaults() {
        let stored = r#"{"close_election":{"signers":"caller_org"}}"#;
        let table: PolicyTable = serde_json::from_str(stored).unwrap();
        assert_eq!(
            table.get(OperationType::CloseElection).signers,
            SignerSet::CallerOrg
        );
        assert_eq!(
            table.get(OperationType::SubmitVote).signers,
            SignerSet::AllOrgs
        );

        let json = serde_json::to_string(&table).unwrap();
        let reloaded: PolicyTable = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, table);
    }
}
