#[macro_use]
extern crate serde;

#[macro_use]
extern crate log;

mod ballot;
mod context;
mod contract;
mod election;
mod error;
mod identity;
mod ledger;
mod policy;
mod store;
mod tally;
mod transaction;

pub use ballot::*;
pub use context::*;
pub use contract::*;
pub use election::*;
pub use error::*;
pub use identity::*;
pub use ledger::*;
pub use policy::*;
pub use store::*;
pub use tally::*;
pub use transaction::*;
