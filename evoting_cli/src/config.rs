use anyhow::{anyhow, Context, Result};
use evoting::{ContractConfig, OrgId};
use std::env::var;

pub struct Config {
    pub ledger_path: String,
    pub organizations: Vec<OrgId>,
    pub user: Option<String>,
    pub org: Option<OrgId>,
    pub contract: ContractConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let ledger_path: String = match var("EVOTING_LEDGER_PATH") {
            Ok(val) => val,
            Err(_e) => "./evoting-ledger.json".to_owned(),
        };

        let organizations = match var("EVOTING_ORGS") {
            Ok(val) => val
                .split(',')
                .map(|org| org.trim().parse::<OrgId>())
                .collect::<Result<Vec<_>, _>>()
                .context("EVOTING_ORGS must be a comma-separated list of MSP ids")?,
            Err(_e) => vec![OrgId::new("Org1MSP"), OrgId::new("Org2MSP")],
        };

        let org = match var("EVOTING_ORG") {
            Ok(val) => Some(val.parse().context("invalid EVOTING_ORG")?),
            Err(_e) => None,
        };

        let contract = ContractConfig {
            disclose_requires_closed: flag("EVOTING_DISCLOSE_REQUIRES_CLOSED")?,
            organizer_only_close: flag("EVOTING_ORGANIZER_ONLY_CLOSE")?,
        };

        Ok(Config {
            ledger_path,
            organizations,
            user: var("EVOTING_USER").ok(),
            org,
            contract,
        })
    }
}

fn flag(name: &str) -> Result<bool> {
    match var(name) {
        Ok(val) => match val.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" | "" => Ok(false),
            _ => Err(anyhow!("{} must be true or false, got {:?}", name, val)),
        },
        Err(_e) => Ok(false),
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_flag() {
        std::env::set_var("EVOTING_TEST_FLAG_ON", "True");
        std::env::set_var("EVOTING_TEST_FLAG_BAD", "maybe");

        assert!(flag("EVOTING_TEST_FLAG_ON").unwrap());
        assert!(!flag("EVOTING_TEST_FLAG_UNSET").unwrap());
        assert!(flag("EVOTING_TEST_FLAG_BAD").is_err());
    }
}
