use crate::*;
use indexmap::IndexMap;

/// Plurality result of a closed election
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TallyResult {
    pub election: String,
    pub num_votes: usize,

    /// Votes per candidate, in creation order
    pub totals: IndexMap<String, u64>,

    pub winner: String,

    /// Whether the winner shares the top count with another candidate
    pub tie_broken: bool,
}

impl TallyResult {
    /// Count disclosed votes and pick the winner
    ///
    /// The candidate with the strictly highest count wins. On a tie, the tied
    /// candidate that comes first in creation order wins.
    pub fn tally(election: &Election, votes: &[DisclosedVote]) -> Result<Self, ValidationError> {
        election.require_status(ElectionStatus::Closed)?;

        let mut totals: IndexMap<String, u64> = election
            .candidates
            .iter()
            .map(|c| (c.clone(), 0))
            .collect();

        let mut num_votes = 0;
        for vote in votes.iter().filter(|v| v.election_name == election.name) {
            match totals.get_mut(&vote.vote_to) {
                Some(total) => {
                    *total += 1;
                    num_votes += 1;
                }
                None => warn!(
                    "skipping vote {} for unknown candidate {:?} in election {:?}",
                    vote.transaction_id, vote.vote_to, election.name
                ),
            }
        }

        if num_votes == 0 {
            return Err(ValidationError::NoDisclosedVotes(election.name.clone()));
        }

        // Strictly greater keeps the earliest candidate on ties
        let counts: Vec<u64> = totals.values().copied().collect();
        let mut winner = 0;
        for (i, count) in counts.iter().enumerate() {
            if *count > counts[winner] {
                winner = i;
            }
        }
        let top = counts[winner];
        let tie_broken = counts.iter().filter(|c| **c == top).count() > 1;

        Ok(TallyResult {
            election: election.name.clone(),
            num_votes,
            totals,
            winner: election.candidates[winner].clone(),
            tie_broken,
        })
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn closed_election() -> Election {
        Election::new("E1", ["A".into(), "B".into(), "C".into()], "o".into())
            .unwrap()
            .close()
            .unwrap()
    }

    fn votes(choices: &[&str]) -> Vec<DisclosedVote> {
        let voter = Identity::x509(OrgId::new("Org1MSP"), "voter");
        choices
            .iter()
            .map(|c| DisclosedVote {
                transaction_id: TransactionId::generate(&voter),
                election_name: "E1".into(),
                vote_from: "voter".into(),
                vote_to: (*c).to_owned(),
            })
            .collect()
    }

    #[test]
    fn test_plurality() {
        let election = closed_election();
        let result = TallyResult::tally(&election, &votes(&["B", "A", "B", "C", "B"])).unwrap();

        assert_eq!(result.winner, "B");
        assert_eq!(result.num_votes, 5);
        assert!(!result.tie_broken);

        let totals: Vec<(&str, u64)> = result.totals.iter().map(|(c, t)| (c.as_str(), *t)).collect();
        assert_eq!(totals, vec![("A", 1), ("B", 3), ("C", 1)]);
    }

    #[test]
    fn test_tie_goes_to_first_candidate() {
        let election = closed_election();

        let result = TallyResult::tally(&election, &votes(&["C", "B", "B", "C"])).unwrap();
        assert_eq!(result.winner, "B");
        assert!(result.tie_broken);

        let result = TallyResult::tally(&election, &votes(&["C", "A", "B"])).unwrap();
        assert_eq!(result.winner, "A");
        assert!(result.tie_broken);
    }

    #[test]
    fn test_tally_requires_closed_and_votes() {
        let open = Election::new("E1", ["A".into(), "B".into(), "C".into()], "o".into()).unwrap();
        assert_eq!(
            TallyResult::tally(&open, &votes(&["A"])).unwrap_err().kind(),
            ErrorKind::InvalidState
        );

        let election = closed_election();
        assert!(matches!(
            TallyResult::tally(&election, &[]),
            Err(ValidationError::NoDisclosedVotes(_))
        ));
    }
}
