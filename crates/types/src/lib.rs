//! Wire data model for the transaction simulation core.
//!
//! Every type here is a plain value type: parsing/validation happens at
//! construction (see [`override_::AccountOverride::from_wire`] and
//! [`hexword::HexWord::parse`]), so downstream crates can assume a value of
//! one of these types is already well-formed.

#![warn(missing_docs, unreachable_pub, rust_2018_idioms)]

mod access_list;
mod block;
mod hexword;
mod override_;
mod quantity;
mod result;
mod rules;
mod transaction;

pub use access_list::{AccessList, AccessListEntry};
pub use block::RuntimeBlock;
pub use hexword::HexWord;
pub use override_::{AccountOverride, CallOverride, RawAccountOverride, StorageOverride};
pub use quantity::{ParseQuantityError, Quantity};
pub use result::{EVMResult, Log};
pub use rules::Rules;
pub use transaction::SimulationTransaction;
