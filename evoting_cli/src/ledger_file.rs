use anyhow::{Context, Result};
use evoting::{Ledger, OrgId};
use std::collections::BTreeSet;
use std::path::Path;

/// Load the ledger snapshot, or start an empty channel if there is none yet
pub fn load(path: &str, organizations: &[OrgId]) -> Result<Ledger> {
    if !Path::new(path).exists() {
        info!(
            "no ledger at {}, starting a new channel for {:?}",
            path, organizations
        );
        return Ok(Ledger::new(organizations.iter().cloned()));
    }

    let bytes = std::fs::read(path).with_context(|| format!("unable to read {}", path))?;
    let ledger =
        Ledger::from_json(&bytes).with_context(|| format!("unable to parse ledger {}", path))?;

    let configured: BTreeSet<OrgId> = organizations.iter().cloned().collect();
    if &configured != ledger.organizations() {
        warn!(
            "ignoring configured organizations {:?}: ledger {} was created for {:?}",
            configured,
            path,
            ledger.organizations()
        );
    }

    Ok(ledger)
}

/// Write the snapshot next to its destination, then move it into place
pub fn save(path: &str, ledger: &Ledger) -> Result<()> {
    let bytes = ledger.to_json()?;
    let tmp = format!("{}.tmp", path);

    std::fs::write(&tmp, &bytes).with_context(|| format!("unable to write {}", tmp))?;
    std::fs::rename(&tmp, path).with_context(|| format!("unable to replace {}", path))?;

    debug!("saved ledger at height {} to {}", ledger.height(), path);
    Ok(())
}
