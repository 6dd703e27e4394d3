use super::{expand, print_json, submit};
use anyhow::{Context, Result};
use evoting::{Identity, Ledger, Operation, VotePayload};

/// Post an operation file. Read-only operations are evaluated, the rest are submitted.
pub fn command_post(
    matches: &clap::ArgMatches,
    ledger: &mut Ledger,
    identity: &Identity,
) -> Result<()> {
    let filename = expand(matches.value_of("INPUT").unwrap_or_default());
    let file_bytes =
        std::fs::read(&filename).with_context(|| format!("unable to read {}", filename))?;

    let operation = Operation::from_bytes(&file_bytes)
        .with_context(|| format!("unable to read {}", filename))?;

    let vote = match matches.value_of("vote") {
        Some(json) => Some(VotePayload::from_bytes(json.as_bytes())?),
        None => None,
    };

    let response = if operation.operation_type().is_read_only() {
        ledger.evaluate(identity, &operation)?
    } else {
        submit(ledger, identity, operation, vote.as_ref())?
    };

    print_json(&response)
}
