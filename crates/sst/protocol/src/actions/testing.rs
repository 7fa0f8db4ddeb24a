//! Test-only automated actions.
//!
//! These live in their own catalog with their own ordinal space. They are
//! never members of [`RequiredAutomatedAction`](super::RequiredAutomatedAction)
//! or [`OptionalAutomatedAction`](super::OptionalAutomatedAction), so a node
//! built with or without them decodes production actions identically.

use crate::{
    types::AccountName,
    validation::{validate_account_name, Validate, ValidationError},
};
use serde::{Deserialize, Serialize};

wire_struct! {
    /// Required action that does nothing.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ExampleRequiredAction {
        /// Any valid account.
        pub account: AccountName,
    }
}

wire_struct! {
    /// Optional action that does nothing.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ExampleOptionalAction {
        /// Any valid account.
        pub account: AccountName,
    }
}

impl Validate for ExampleRequiredAction {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account)
    }
}

impl Validate for ExampleOptionalAction {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account)
    }
}

action_family! {
    /// Test-only required actions.
    pub enum TestingRequiredAction / TestingRequiredActionKind ("testing_required") {
        /// No-op.
        ExampleRequired(ExampleRequiredAction) = 0 as "example_required",
    }
}

action_family! {
    /// Test-only optional actions.
    pub enum TestingOptionalAction / TestingOptionalActionKind ("testing_optional") {
        /// No-op.
        ExampleOptional(ExampleOptionalAction) = 0 as "example_optional",
    }
}
