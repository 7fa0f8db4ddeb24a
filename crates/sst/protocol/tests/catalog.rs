//! Wire stability of the automated action catalog.

use assert_matches::assert_matches;
use proptest::prelude::*;
use sst_protocol::{
    decode_exact, encode, Asset, AssetSymbol, CodecError, ContributionPayout,
    ContributorPayoutAction, Extensions, FounderPayoutAction, IcoEvaluationAction, IcoLaunchAction,
    OptionalActionKind, OptionalAutomatedAction, RefundAction, RequiredActionKind,
    RequiredAutomatedAction, TimePointSec, TokenEmissionAction, TokenLaunchAction, UnitTarget,
};
use std::collections::BTreeMap;
use strum::{EnumCount, IntoEnumIterator};

const SYMBOL_BYTES: [u8; 4] = [0x13, 0xd0, 0x12, 0x13];

fn symbol() -> AssetSymbol {
    AssetSymbol::from_nai_data(10_000_000, 3).unwrap()
}

#[test]
fn golden_ico_launch() {
    let action = RequiredAutomatedAction::from(IcoLaunchAction {
        control_account: "alice".into(),
        symbol: symbol(),
    });
    let mut expected = vec![0x00, 0x05, b'a', b'l', b'i', b'c', b'e'];
    expected.extend_from_slice(&SYMBOL_BYTES);
    assert_eq!(encode(&action), expected);
}

#[test]
fn golden_refund() {
    let action = RequiredAutomatedAction::from(RefundAction {
        contributor: "bob".into(),
        symbol: symbol(),
        contribution_id: 7,
        refund: Asset::core(1_000),
    });
    let mut expected = vec![0x03, 0x03, b'b', b'o', b'b'];
    expected.extend_from_slice(&SYMBOL_BYTES);
    expected.extend_from_slice(&[7, 0, 0, 0]);
    expected.extend_from_slice(&1_000i64.to_le_bytes());
    expected.extend_from_slice(&[3, b'S', b'T', b'E', b'E', b'M', 0, 0]);
    assert_eq!(encode(&action), expected);
}

#[test]
fn golden_token_emission() {
    let action = OptionalAutomatedAction::from(TokenEmissionAction {
        control_account: "alice".into(),
        symbol: symbol(),
        emission_time: TimePointSec::from_secs(1_000),
        emissions: BTreeMap::from([(UnitTarget::from("$rewards"), 50)]),
        extensions: Extensions::new(),
    });
    let mut expected = vec![0x00, 0x05, b'a', b'l', b'i', b'c', b'e'];
    expected.extend_from_slice(&SYMBOL_BYTES);
    expected.extend_from_slice(&[0xe8, 0x03, 0, 0]);
    expected.push(1);
    expected.push(8);
    expected.extend_from_slice(b"$rewards");
    expected.extend_from_slice(&50i64.to_le_bytes());
    expected.push(0);
    assert_eq!(encode(&action), expected);
}

#[test]
fn ordinal_table_is_locked() {
    let required: Vec<_> = RequiredActionKind::iter().map(|k| (k.ordinal(), k.name())).collect();
    assert_eq!(
        required,
        [
            (0, "sst_ico_launch"),
            (1, "sst_ico_evaluation"),
            (2, "sst_token_launch"),
            (3, "sst_refund"),
            (4, "sst_contributor_payout"),
            (5, "sst_founder_payout"),
        ]
    );
    assert_eq!(RequiredActionKind::COUNT, 6);

    let optional: Vec<_> = OptionalActionKind::iter().map(|k| (k.ordinal(), k.name())).collect();
    assert_eq!(optional, [(0, "sst_token_emission")]);
}

#[test]
fn unknown_ordinal_is_rejected() {
    assert_matches!(
        decode_exact::<RequiredAutomatedAction>(&[6]),
        Err(CodecError::UnknownActionType { family: "required", ordinal: 6 })
    );
    assert_matches!(
        decode_exact::<OptionalAutomatedAction>(&[1]),
        Err(CodecError::UnknownActionType { family: "optional", ordinal: 1 })
    );
}

#[test]
fn truncated_action_is_malformed() {
    let action = RequiredAutomatedAction::from(TokenLaunchAction {
        control_account: "alice".into(),
        symbol: symbol(),
    });
    let bytes = encode(&action);
    for cut in 0..bytes.len() {
        assert!(decode_exact::<RequiredAutomatedAction>(&bytes[..cut]).is_err(), "cut at {cut}");
    }
}

fn arb_account() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{1,13}[a-z0-9]"
}

fn arb_symbol() -> impl Strategy<Value = AssetSymbol> {
    prop_oneof![
        Just(AssetSymbol::CORE),
        Just(AssetSymbol::DOLLAR),
        Just(AssetSymbol::VESTS),
        (1u32..=99_999_999, 0u8..=12)
            .prop_map(|(data, dec)| AssetSymbol::from_nai_data(data, dec).unwrap()),
    ]
}

fn arb_asset() -> impl Strategy<Value = Asset> {
    (any::<i64>(), arb_symbol()).prop_map(|(amount, symbol)| Asset::new(amount, symbol))
}

fn arb_payouts() -> impl Strategy<Value = Vec<ContributionPayout>> {
    prop::collection::vec(
        (arb_asset(), any::<bool>())
            .prop_map(|(payout, to_vesting)| ContributionPayout { payout, to_vesting }),
        0..4,
    )
}

fn arb_required() -> impl Strategy<Value = RequiredAutomatedAction> {
    prop_oneof![
        (arb_account(), arb_symbol()).prop_map(|(a, s)| {
            IcoLaunchAction { control_account: a.as_str().into(), symbol: s }.into()
        }),
        (arb_account(), arb_symbol()).prop_map(|(a, s)| {
            IcoEvaluationAction { control_account: a.as_str().into(), symbol: s }.into()
        }),
        (arb_account(), arb_symbol()).prop_map(|(a, s)| {
            TokenLaunchAction { control_account: a.as_str().into(), symbol: s }.into()
        }),
        (arb_account(), arb_symbol(), any::<u32>(), arb_asset()).prop_map(
            |(a, s, id, refund)| {
                RefundAction {
                    contributor: a.as_str().into(),
                    symbol: s,
                    contribution_id: id,
                    refund,
                }
                .into()
            }
        ),
        (arb_account(), arb_symbol(), any::<u32>(), arb_asset(), arb_payouts()).prop_map(
            |(a, s, id, contribution, payouts)| ContributorPayoutAction {
                contributor: a.as_str().into(),
                symbol: s,
                contribution_id: id,
                contribution,
                payouts,
            }
            .into()
        ),
        (
            arb_symbol(),
            prop::collection::btree_map(arb_account(), arb_payouts(), 0..3),
            any::<i64>(),
            any::<i64>(),
            any::<i64>()
        )
            .prop_map(|(s, payouts, core, tokens, rewards)| FounderPayoutAction {
                symbol: s,
                account_payouts: payouts.into_iter().map(|(k, v)| (k.as_str().into(), v)).collect(),
                market_maker_core: core,
                market_maker_tokens: tokens,
                reward_balance: rewards,
            }
            .into()),
    ]
}

fn arb_optional() -> impl Strategy<Value = OptionalAutomatedAction> {
    (
        arb_account(),
        arb_symbol(),
        any::<u32>(),
        prop::collection::btree_map("\\$?[a-z][a-z_.]{2,20}", any::<i64>(), 0..5),
    )
        .prop_map(|(a, s, t, emissions)| {
            TokenEmissionAction {
                control_account: a.as_str().into(),
                symbol: s,
                emission_time: TimePointSec::from_secs(t),
                emissions: emissions.into_iter().map(|(k, v)| (UnitTarget::new(k), v)).collect(),
                extensions: Extensions::new(),
            }
            .into()
        })
}

proptest! {
    #[test]
    fn required_actions_round_trip(action in arb_required()) {
        let bytes = encode(&action);
        prop_assert_eq!(bytes.len(), sst_protocol::Encodable::length(&action));
        prop_assert_eq!(decode_exact::<RequiredAutomatedAction>(&bytes).unwrap(), action);
    }

    #[test]
    fn optional_actions_round_trip(action in arb_optional()) {
        let bytes = encode(&action);
        prop_assert_eq!(bytes.len(), sst_protocol::Encodable::length(&action));
        prop_assert_eq!(decode_exact::<OptionalAutomatedAction>(&bytes).unwrap(), action);
    }
}
