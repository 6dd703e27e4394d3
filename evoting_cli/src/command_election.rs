use super::{expand, print_json, submit};
use anyhow::Result;
use evoting::{Identity, Ledger, Operation};

pub fn command_query_identity(ledger: &Ledger, identity: &Identity) -> Result<()> {
    let response = ledger.evaluate(identity, &Operation::QueryIdentity)?;
    print_json(&response)
}

pub fn command_create_election(
    matches: &clap::ArgMatches,
    ledger: &mut Ledger,
    identity: &Identity,
) -> Result<()> {
    // Positional arguments as a client would pass them: name, then candidates
    let mut args = vec![election_name(matches)];
    if let Some(candidates) = matches.values_of("CANDIDATES") {
        args.extend(candidates.map(expand));
    }
    let operation = Operation::from_invocation("CreateElection", &args)?;

    submit(ledger, identity, operation, None)?;
    println!("created election {}", args[0]);
    Ok(())
}

pub fn command_query_election(
    matches: &clap::ArgMatches,
    ledger: &Ledger,
    identity: &Identity,
) -> Result<()> {
    let operation = Operation::QueryElection {
        name: election_name(matches),
    };
    let response = ledger.evaluate(identity, &operation)?;
    print_json(&response)
}

pub fn command_close_election(
    matches: &clap::ArgMatches,
    ledger: &mut Ledger,
    identity: &Identity,
) -> Result<()> {
    let name = election_name(matches);
    submit(
        ledger,
        identity,
        Operation::CloseElection { name: name.clone() },
        None,
    )?;
    println!("closed election {}", name);
    Ok(())
}

/// Print the full tally report rather than just the winner
pub fn command_evaluate_election(
    matches: &clap::ArgMatches,
    ledger: &Ledger,
    identity: &Identity,
) -> Result<()> {
    let result = ledger.tally(identity, &election_name(matches))?;
    print_json(&result)
}

pub fn election_name(matches: &clap::ArgMatches) -> String {
    // ELECTION is required by clap
    expand(matches.value_of("ELECTION").unwrap_or_default())
}
