#[macro_use]
extern crate serde;
#[macro_use]
extern crate log;

mod blinding;
mod coordinator;
mod curve;
mod error;
mod hash;
mod keypair;
mod message;
mod round1;
mod round2;
pub mod serde_bigint;
mod tally;
mod voter;

pub use blinding::*;
pub use coordinator::*;
pub use curve::*;
pub use error::*;
pub use hash::*;
pub use keypair::*;
pub use message::*;
pub use round1::*;
pub use round2::*;
pub use tally::*;
pub use voter::*;
