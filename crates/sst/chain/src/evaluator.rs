//! Action to evaluator dispatch.
//!
//! Every family has one [`EvaluatorTable`], a fixed array indexed by wire
//! ordinal. The array length is the number of kinds in the family, so a new
//! action without a registration does not compile, and a registration filed
//! under the wrong ordinal surfaces as [`ConsensusInvariantViolation`] instead
//! of running the wrong evaluator.
//!
//! ```text
//! action ──ordinal──> entries[ordinal] ──kind check──> evaluate(action, ledger)
//! ```
//!
//! The test-only families get their own tables under [`testing`]; they never
//! share an ordinal space with the production families.

use crate::{
    error::{ActionError, ConsensusInvariantViolation},
    optional_evaluators, required_evaluators,
    state::LedgerStore,
};
use sst_protocol::{
    OptionalActionKind, OptionalAutomatedAction, RequiredActionKind, RequiredAutomatedAction,
};
use std::fmt;
use strum::EnumCount;

/// A closed family of actions with a wire ordinal per member.
pub trait ActionFamily: fmt::Debug {
    /// Kind enum of the family.
    type Kind: Copy + Eq + fmt::Debug + Into<&'static str>;

    /// Family name used in errors.
    const FAMILY: &'static str;

    /// Kind of this action.
    fn kind(&self) -> Self::Kind;

    /// Wire ordinal of this action.
    fn ordinal(&self) -> u32;
}

macro_rules! impl_action_family {
    ($($family:ty => $kind:ty),+ $(,)?) => {
        $(
            impl ActionFamily for $family {
                type Kind = $kind;
                const FAMILY: &'static str = <$kind>::FAMILY;

                fn kind(&self) -> Self::Kind {
                    <$family>::kind(self)
                }

                fn ordinal(&self) -> u32 {
                    <$family>::ordinal(self)
                }
            }
        )+
    };
}

impl_action_family! {
    RequiredAutomatedAction => RequiredActionKind,
    OptionalAutomatedAction => OptionalActionKind,
}

/// Evaluator signature shared by every family.
pub type Evaluator<A> = fn(&A, &mut dyn LedgerStore) -> Result<(), ActionError>;

/// One table entry: the kind the evaluator handles and the evaluator.
pub struct Registration<A: ActionFamily> {
    /// Kind this entry is registered for.
    pub kind: A::Kind,
    /// Evaluator to run.
    pub evaluate: Evaluator<A>,
}

impl<A: ActionFamily> fmt::Debug for Registration<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &'static str = self.kind.into();
        f.debug_struct("Registration").field("kind", &name).finish_non_exhaustive()
    }
}

/// Evaluators of one family, indexed by ordinal.
#[derive(Debug)]
pub struct EvaluatorTable<A: ActionFamily, const N: usize> {
    entries: [Registration<A>; N],
}

impl<A: ActionFamily, const N: usize> EvaluatorTable<A, N> {
    /// Table over `entries`, which must be in ordinal order.
    pub const fn new(entries: [Registration<A>; N]) -> Self {
        Self { entries }
    }

    /// Entry stored at `ordinal`.
    pub fn registration(&self, ordinal: u32) -> Option<&Registration<A>> {
        self.entries.get(ordinal as usize)
    }

    /// Every entry in ordinal order.
    pub fn registrations(&self) -> &[Registration<A>] {
        &self.entries
    }

    /// Runs the evaluator registered for `action`.
    pub fn evaluate(&self, action: &A, ledger: &mut dyn LedgerStore) -> Result<(), ActionError> {
        let ordinal = action.ordinal();
        let Some(entry) = self.registration(ordinal) else {
            return Err(mismatch::<A>(ordinal, "nothing").into());
        };
        if entry.kind != action.kind() {
            return Err(mismatch::<A>(ordinal, entry.kind.into()).into());
        }
        (entry.evaluate)(action, ledger)
    }
}

const fn mismatch<A: ActionFamily>(
    ordinal: u32,
    registered: &'static str,
) -> ConsensusInvariantViolation {
    ConsensusInvariantViolation::DispatchMismatch { family: A::FAMILY, ordinal, registered }
}

/// Generates adapters that unwrap one family variant each and forward it to
/// its evaluator.
macro_rules! evaluators {
    ($family:ident / $kind:ident { $($name:ident: $variant:ident => $evaluate:path),+ $(,)? }) => {
        $(
            #[allow(unreachable_patterns)]
            fn $name(action: &$family, ledger: &mut dyn LedgerStore) -> Result<(), ActionError> {
                match action {
                    $family::$variant(action) => $evaluate(action, ledger),
                    other => Err(ConsensusInvariantViolation::DispatchMismatch {
                        family: $kind::FAMILY,
                        ordinal: other.ordinal(),
                        registered: $kind::$variant.name(),
                    }
                    .into()),
                }
            }
        )+
    };
}

evaluators! {
    RequiredAutomatedAction / RequiredActionKind {
        evaluate_ico_launch: IcoLaunch => required_evaluators::ico_launch,
        evaluate_ico_evaluation: IcoEvaluation => required_evaluators::ico_evaluation,
        evaluate_token_launch: TokenLaunch => required_evaluators::token_launch,
        evaluate_refund: Refund => required_evaluators::refund,
        evaluate_contributor_payout: ContributorPayout => required_evaluators::contributor_payout,
        evaluate_founder_payout: FounderPayout => required_evaluators::founder_payout,
    }
}

evaluators! {
    OptionalAutomatedAction / OptionalActionKind {
        evaluate_token_emission: TokenEmission => optional_evaluators::token_emission,
    }
}

/// Table of the required family.
pub type RequiredTable = EvaluatorTable<RequiredAutomatedAction, { RequiredActionKind::COUNT }>;

/// Table of the optional family.
pub type OptionalTable = EvaluatorTable<OptionalAutomatedAction, { OptionalActionKind::COUNT }>;

/// Evaluators of both production families.
#[derive(Debug)]
pub struct DispatchTable {
    required: RequiredTable,
    optional: OptionalTable,
}

static STANDARD: DispatchTable = DispatchTable {
    required: EvaluatorTable::new([
        Registration { kind: RequiredActionKind::IcoLaunch, evaluate: evaluate_ico_launch },
        Registration { kind: RequiredActionKind::IcoEvaluation, evaluate: evaluate_ico_evaluation },
        Registration { kind: RequiredActionKind::TokenLaunch, evaluate: evaluate_token_launch },
        Registration { kind: RequiredActionKind::Refund, evaluate: evaluate_refund },
        Registration {
            kind: RequiredActionKind::ContributorPayout,
            evaluate: evaluate_contributor_payout,
        },
        Registration { kind: RequiredActionKind::FounderPayout, evaluate: evaluate_founder_payout },
    ]),
    optional: EvaluatorTable::new([Registration {
        kind: OptionalActionKind::TokenEmission,
        evaluate: evaluate_token_emission,
    }]),
};

impl DispatchTable {
    /// The production table.
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    /// Required-family evaluators.
    pub const fn required(&self) -> &RequiredTable {
        &self.required
    }

    /// Optional-family evaluators.
    pub const fn optional(&self) -> &OptionalTable {
        &self.optional
    }

    /// Applies a required action.
    pub fn apply_required(
        &self,
        action: &RequiredAutomatedAction,
        ledger: &mut dyn LedgerStore,
    ) -> Result<(), ActionError> {
        self.required.evaluate(action, ledger)
    }

    /// Applies an optional action.
    pub fn apply_optional(
        &self,
        action: &OptionalAutomatedAction,
        ledger: &mut dyn LedgerStore,
    ) -> Result<(), ActionError> {
        self.optional.evaluate(action, ledger)
    }
}

/// Tables for the test-only families.
#[cfg(any(test, feature = "testnet"))]
pub mod testing {
    use super::*;
    use crate::error::ApplyError;
    use sst_protocol::{
        actions::testing::{
            ExampleOptionalAction, ExampleRequiredAction, TestingOptionalAction,
            TestingOptionalActionKind, TestingRequiredAction, TestingRequiredActionKind,
        },
        AccountName,
    };

    impl_action_family! {
        TestingRequiredAction => TestingRequiredActionKind,
        TestingOptionalAction => TestingOptionalActionKind,
    }

    fn require_account(ledger: &dyn LedgerStore, account: &AccountName) -> Result<(), ActionError> {
        ledger.account(account).ok_or_else(|| ApplyError::UnknownAccount(account.clone()))?;
        Ok(())
    }

    fn example_required(
        action: &ExampleRequiredAction,
        ledger: &mut dyn LedgerStore,
    ) -> Result<(), ActionError> {
        require_account(ledger, &action.account)
    }

    fn example_optional(
        action: &ExampleOptionalAction,
        ledger: &mut dyn LedgerStore,
    ) -> Result<(), ActionError> {
        require_account(ledger, &action.account)
    }

    evaluators! {
        TestingRequiredAction / TestingRequiredActionKind {
            evaluate_example_required: ExampleRequired => example_required,
        }
    }

    evaluators! {
        TestingOptionalAction / TestingOptionalActionKind {
            evaluate_example_optional: ExampleOptional => example_optional,
        }
    }

    /// Table of the test-only required family.
    pub type RequiredTable =
        EvaluatorTable<TestingRequiredAction, { TestingRequiredActionKind::COUNT }>;

    /// Table of the test-only optional family.
    pub type OptionalTable =
        EvaluatorTable<TestingOptionalAction, { TestingOptionalActionKind::COUNT }>;

    /// Evaluators of the test-only required family.
    pub static REQUIRED: RequiredTable = EvaluatorTable::new([Registration {
        kind: TestingRequiredActionKind::ExampleRequired,
        evaluate: evaluate_example_required,
    }]);

    /// Evaluators of the test-only optional family.
    pub static OPTIONAL: OptionalTable = EvaluatorTable::new([Registration {
        kind: TestingOptionalActionKind::ExampleOptional,
        evaluate: evaluate_example_optional,
    }]);
}
