//! SST Ledger Protocol Types
//!
//! Wire-level definitions shared by every node: the canonical codec, asset
//! symbols, account names, unit targets and the automated action catalog with
//! its stateless validation rules.
//!
//! # Action Wire Format
//!
//! ```text
//! action   := varint(ordinal) fields
//! ordinal  := position of the action within its family (append-only)
//! fields   := canonical encoding of the action struct, in declaration order
//! id       := keccak256(action)
//! ```
//!
//! Two nodes given the same action value produce the same bytes, and every
//! decode failure surfaces as a [`CodecError`].

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
mod macros;

pub mod actions;
pub mod asset;
pub mod codec;
pub mod constants;
/// Reward curve identifiers.
pub mod curve;
pub mod schema;
pub mod types;
pub mod unit_target;
pub mod validation;

pub use actions::{
    AutomatedAction, ContributionPayout, ContributorPayoutAction, FounderPayoutAction,
    IcoEvaluationAction, IcoLaunchAction, OptionalActionKind, OptionalAutomatedAction, RefundAction,
    RequiredActionKind, RequiredAutomatedAction, TokenEmissionAction, TokenLaunchAction,
};
pub use asset::{Asset, AssetError, AssetSymbol, SymbolSpace};
pub use codec::{
    decode_exact, encode, pack_to_buffer, unpack_from_buffer, Buffer, CodecError, Decodable,
    Encodable,
};
pub use curve::CurveId;
pub use schema::{Reflect, ReflectFamily};
pub use types::{AccountName, Extensions, TimePointSec};
pub use unit_target::{EmissionsUnit, GenerationUnit, UnitTarget};
pub use validation::{Validate, ValidationError};
