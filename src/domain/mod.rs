//! Domain layer: ledger value types.
//!
//! This module contains the core value types shared across the chain,
//! persistence, and service layers: typed row identifiers, normalized
//! chain addresses, decimal-string token amounts, string chain ids, and
//! the stake event shapes that flow from the decoder to the journal.

pub mod address;
pub mod amount;
pub mod chain_id;
pub mod ids;
pub mod stake_event;

pub use address::ChainAddress;
pub use amount::TokenAmount;
pub use chain_id::ChainId;
pub use ids::{PoolId, WalletId};
pub use stake_event::{AppliedStakeEvent, DecodedStakeEvent, StakeApplication, StakeEventKind};
