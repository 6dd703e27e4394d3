#[macro_use]
extern crate log;

use anyhow::{anyhow, Result};
use clap::{App, AppSettings, Arg, SubCommand};
use evoting::{Identity, Ledger, OrgId, Operation, Proposal, Response, VotePayload};

mod command_election;
mod command_post;
mod command_vote;
mod config;
mod ledger_file;

fn main() {
    if let Err(e) = run() {
        eprintln!("evoting: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let election_arg = || {
        Arg::with_name("ELECTION")
            .index(1)
            .required(true)
            .help("Election name")
    };
    let tx_id_arg = || {
        Arg::with_name("TRANSACTION-ID")
            .index(2)
            .required(true)
            .help("Transaction id returned by add-vote")
    };

    let matches = App::new("evoting CLI")
        .version("0.1")
        .about("Runs elections on a local permissioned ledger")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("user")
                .long("user")
                .takes_value(true)
                .global(true)
                .help("Enrolled user to act as - can also be set with EVOTING_USER"),
        )
        .arg(
            Arg::with_name("org")
                .long("org")
                .takes_value(true)
                .global(true)
                .help("MSP id of the user's organization - can also be set with EVOTING_ORG"),
        )
        .arg(
            Arg::with_name("ledger")
                .long("ledger")
                .takes_value(true)
                .global(true)
                .help("Ledger snapshot file - can also be set with EVOTING_LEDGER_PATH"),
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Sets the level of verbosity"),
        )
        .subcommand(SubCommand::with_name("query-identity").about("Print the caller's identity"))
        .subcommand(
            SubCommand::with_name("create-election")
                .about("Create an election with three candidates")
                .arg(election_arg())
                .arg(
                    Arg::with_name("CANDIDATES")
                        .index(2)
                        .required(true)
                        .multiple(true)
                        .help("Exactly three candidate names"),
                ),
        )
        .subcommand(
            SubCommand::with_name("query-election")
                .about("Print an election")
                .arg(election_arg()),
        )
        .subcommand(
            SubCommand::with_name("close-election")
                .about("Close an election to new ballots")
                .arg(election_arg()),
        )
        .subcommand(
            SubCommand::with_name("add-vote")
                .about("Commit a private ballot and link it to the election")
                .arg(election_arg())
                .arg(
                    Arg::with_name("CANDIDATE")
                        .index(2)
                        .required(true)
                        .help("Candidate to vote for"),
                )
                .arg(
                    Arg::with_name("no-submit")
                        .long("no-submit")
                        .help("Only commit the ballot; link it later with submit-vote"),
                ),
        )
        .subcommand(
            SubCommand::with_name("submit-vote")
                .about("Link a committed ballot to its election")
                .arg(election_arg())
                .arg(tx_id_arg()),
        )
        .subcommand(
            SubCommand::with_name("display-vote")
                .about("Disclose your own ballot")
                .arg(election_arg())
                .arg(tx_id_arg()),
        )
        .subcommand(
            SubCommand::with_name("query-vote")
                .about("Print a disclosed vote")
                .arg(election_arg())
                .arg(tx_id_arg()),
        )
        .subcommand(
            SubCommand::with_name("evaluate-election")
                .about("Tally the disclosed votes of a closed election")
                .arg(election_arg()),
        )
        .subcommand(
            SubCommand::with_name("post")
                .about("Post an operation")
                .arg(
                    Arg::with_name("INPUT")
                        .index(1)
                        .required(true)
                        .help("Operation file in JSON or CBOR format"),
                )
                .arg(
                    Arg::with_name("vote")
                        .long("vote")
                        .takes_value(true)
                        .help("Vote payload JSON to send through the transient channel"),
                ),
        )
        .get_matches();

    let (name, sub_matches) = matches.subcommand();
    let sub_matches = match sub_matches {
        Some(sub_matches) => sub_matches,
        None => return Err(anyhow!("a subcommand is required")),
    };
    let global = |arg: &str| sub_matches.value_of(arg).or_else(|| matches.value_of(arg));

    let verbosity = matches.occurrences_of("v") + sub_matches.occurrences_of("v");
    init_logger(verbosity);

    let mut config = config::Config::from_env()?;
    if let Some(path) = global("ledger") {
        config.ledger_path = path.to_owned();
    }
    let ledger_path = expand(&config.ledger_path);

    let mut ledger = ledger_file::load(&ledger_path, &config.organizations)?;
    ledger.set_config(config.contract.clone());
    let height = ledger.height();

    let identity = identity(global("user"), global("org"), &config, &ledger)?;
    debug!("acting as {}", identity);

    match name {
        "query-identity" => command_election::command_query_identity(&ledger, &identity)?,
        "create-election" => {
            command_election::command_create_election(sub_matches, &mut ledger, &identity)?
        }
        "query-election" => {
            command_election::command_query_election(sub_matches, &ledger, &identity)?
        }
        "close-election" => {
            command_election::command_close_election(sub_matches, &mut ledger, &identity)?
        }
        "evaluate-election" => {
            command_election::command_evaluate_election(sub_matches, &ledger, &identity)?
        }
        "add-vote" => command_vote::command_add_vote(sub_matches, &mut ledger, &identity)?,
        "submit-vote" => command_vote::command_submit_vote(sub_matches, &mut ledger, &identity)?,
        "display-vote" => {
            command_vote::command_display_vote(sub_matches, &mut ledger, &identity)?
        }
        "query-vote" => command_vote::command_query_vote(sub_matches, &ledger, &identity)?,
        "post" => command_post::command_post(sub_matches, &mut ledger, &identity)?,
        other => return Err(anyhow!("unknown subcommand {}", other)),
    }

    if ledger.height() != height {
        ledger_file::save(&ledger_path, &ledger)?;
    }

    Ok(())
}

fn init_logger(verbosity: u64) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Resolve the caller from flags, then the environment
fn identity(
    user: Option<&str>,
    org: Option<&str>,
    config: &config::Config,
    ledger: &Ledger,
) -> Result<Identity> {
    let user = match user {
        Some(user) => user.to_owned(),
        None => config
            .user
            .clone()
            .ok_or_else(|| anyhow!("Please provide a user either via --user or EVOTING_USER"))?,
    };

    let org: OrgId = match org {
        Some(org) => org.parse()?,
        None => match &config.org {
            Some(org) => org.clone(),
            None => ledger
                .organizations()
                .iter()
                .next()
                .cloned()
                .ok_or_else(|| anyhow!("the ledger has no organizations"))?,
        },
    };

    Ok(Identity::x509(org, &user))
}

pub fn expand(input: &str) -> String {
    match shellexpand::full(input) {
        Ok(expanded) => expanded.into_owned(),
        Err(e) => {
            warn!("unable to expand {}: {}", input, e);
            input.to_owned()
        }
    }
}

/// Endorse a submit operation by every organization its policy requires, then commit it
pub fn submit(
    ledger: &mut Ledger,
    identity: &Identity,
    operation: Operation,
    vote: Option<&VotePayload>,
) -> Result<Response> {
    let endorsers = ledger.required_endorsers(operation.operation_type(), &identity.msp_id);
    let mut proposal = Proposal::new(identity.clone(), operation).endorsed_by(endorsers);
    if let Some(vote) = vote {
        proposal = proposal.with_vote(vote);
    }
    Ok(ledger.submit(proposal)?)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
