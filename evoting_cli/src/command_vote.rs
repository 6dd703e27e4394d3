use super::command_election::election_name;
use super::{expand, print_json, submit};
use anyhow::{anyhow, Context, Result};
use evoting::{Identity, Ledger, Operation, TransactionId, VotePayload};

/// AddVote, then SubmitVote unless `--no-submit` is given
pub fn command_add_vote(
    matches: &clap::ArgMatches,
    ledger: &mut Ledger,
    identity: &Identity,
) -> Result<()> {
    let election = election_name(matches);
    let candidate = expand(matches.value_of("CANDIDATE").unwrap_or_default());
    let vote = VotePayload::new(identity.id.clone(), candidate);

    let response = submit(
        ledger,
        identity,
        Operation::AddVote {
            election: election.clone(),
        },
        Some(&vote),
    )?;
    let transaction_id = response
        .transaction_id()
        .ok_or_else(|| anyhow!("AddVote did not return a transaction id"))?;
    info!("ballot {} committed to {}", transaction_id, identity.msp_id);

    if !matches.is_present("no-submit") {
        submit(
            ledger,
            identity,
            Operation::SubmitVote {
                election,
                transaction_id,
            },
            None,
        )?;
    }

    println!("{}", transaction_id);
    Ok(())
}

pub fn command_submit_vote(
    matches: &clap::ArgMatches,
    ledger: &mut Ledger,
    identity: &Identity,
) -> Result<()> {
    let operation = Operation::SubmitVote {
        election: election_name(matches),
        transaction_id: transaction_id(matches)?,
    };
    submit(ledger, identity, operation, None)?;
    Ok(())
}

/// Disclose the caller's ballot, re-reading its payload from the caller's own collection
pub fn command_display_vote(
    matches: &clap::ArgMatches,
    ledger: &mut Ledger,
    identity: &Identity,
) -> Result<()> {
    let election = election_name(matches);
    let transaction_id = transaction_id(matches)?;

    let vote = ledger
        .private_ballot(&identity.msp_id, &election, &transaction_id)?
        .ok_or_else(|| {
            anyhow!(
                "no ballot {} for election {} in the private collection of {}",
                transaction_id,
                election,
                identity.msp_id
            )
        })?;

    let operation = Operation::DisplayVote {
        election,
        transaction_id,
    };
    submit(ledger, identity, operation, Some(&vote))?;
    Ok(())
}

pub fn command_query_vote(
    matches: &clap::ArgMatches,
    ledger: &Ledger,
    identity: &Identity,
) -> Result<()> {
    let operation = Operation::QueryVote {
        election: election_name(matches),
        transaction_id: transaction_id(matches)?,
    };
    let response = ledger.evaluate(identity, &operation)?;
    print_json(&response)
}

fn transaction_id(matches: &clap::ArgMatches) -> Result<TransactionId> {
    let raw = expand(matches.value_of("TRANSACTION-ID").unwrap_or_default());
    raw.parse::<TransactionId>()
        .with_context(|| format!("invalid transaction id {}", raw))
}
