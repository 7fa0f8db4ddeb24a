//! Settlement behaviour across whole maintenance intervals.

use assert_matches::assert_matches;
use proptest::prelude::*;
use sst_protocol::{Asset, AssetSymbol, CurveId, TimePointSec};
use sst_rewards::{
    settle, settle_funds, CuratorClaim, FundId, PendingClaim, RewardError, RewardFundContext,
    RewardParams,
};

const NOW: TimePointSec = TimePointSec::from_secs(1_000_000);
const HOUR: u32 = 3_600;
const WINDOW: u32 = 1_296_000;

fn later(secs: u32) -> TimePointSec {
    TimePointSec::from_secs(NOW.secs() + secs)
}

fn fund(recent_claims: u128, balance: i64, curve: CurveId) -> RewardFundContext {
    let mut fund = RewardFundContext::new(FundId(0), Asset::core(balance), NOW);
    fund.recent_claims = recent_claims;
    fund.author_reward_curve = curve;
    fund.percent_curation_rewards = 0;
    fund
}

#[test]
fn linear_split_is_exact() {
    let mut fund = fund(1_000, 100, CurveId::Linear);
    let claims = [PendingClaim::new("alice", 300), PendingClaim::new("bob", 700)];
    let report = settle(&mut fund, &claims, NOW, &RewardParams::default()).unwrap();

    let totals: Vec<_> = report.payouts.iter().map(|p| p.total()).collect();
    assert_eq!(totals, [30, 70]);
    assert_eq!(report.paid, 100);
    assert_eq!(fund.reward_balance.amount, 0);
    assert_eq!(fund.tokens_awarded, 100);
    assert_eq!(report.decayed_claims, 1_000);
    // the interval's claims carry into the next one
    assert_eq!(fund.recent_claims, 2_000);
}

#[test]
fn empty_history_pays_nothing() {
    let mut fund = fund(0, 100, CurveId::Linear);
    let claims = [PendingClaim::new("alice", 300), PendingClaim::new("bob", 700)];
    let report = settle(&mut fund, &claims, later(HOUR), &RewardParams::default()).unwrap();

    assert!(report.payouts.iter().all(|p| p.total() == 0));
    assert_eq!(report.paid, 0);
    assert_eq!(fund.reward_balance.amount, 100);
    assert_eq!(fund.tokens_awarded, 0);
    assert_eq!(fund.recent_claims, 1_000);

    // the next interval pays against the history the first one built
    let report = settle(&mut fund, &claims, later(2 * HOUR), &RewardParams::default()).unwrap();
    assert_eq!(report.decayed_claims, 998);
    let totals: Vec<_> = report.payouts.iter().map(|p| p.total()).collect();
    assert_eq!(totals, [30, 70]);
    assert_eq!(fund.recent_claims, 1_998);
}

#[test]
fn claims_accumulate_after_decay() {
    let mut fund = fund(1_000, 100, CurveId::Linear);
    let claims = [PendingClaim::new("alice", 500)];
    let report = settle(&mut fund, &claims, later(WINDOW / 2), &RewardParams::default()).unwrap();

    assert_eq!(report.decayed_claims, 500);
    assert_eq!(report.recent_claims, 1_000);
    assert_eq!(fund.recent_claims, 1_000);
    assert_eq!(fund.last_update, later(WINDOW / 2));
    assert_eq!(report.paid, 100);
}

#[test]
fn steady_claims_pay_a_decaying_share() {
    let mut fund = fund(1_000_000, 1_000_000, CurveId::Linear);
    let claims = [PendingClaim::new("alice", 2_800)];
    let report = settle(&mut fund, &claims, later(HOUR), &RewardParams::default()).unwrap();

    // about dt / window of the balance, not all of it
    assert_eq!(report.decayed_claims, 997_223);
    assert_eq!(report.paid, 2_807);
    assert_eq!(fund.recent_claims, 1_000_023);
}

#[test]
fn seeded_convergent_fund_pays_every_interval() {
    for curve in [CurveId::ConvergentLinear, CurveId::ConvergentSquareRoot] {
        let mut fund = fund(0, 1_000_000, curve);
        assert!(fund.seed_recent_claims(1_000_000));
        let claims = [PendingClaim::new("alice", 1_000_000)];
        let mut balance = fund.reward_balance.amount;
        for interval in 1..=10 {
            let now = later(interval * HOUR);
            let report = settle(&mut fund, &claims, now, &RewardParams::default()).unwrap();
            assert!(report.paid > 0, "{curve} paid nothing in interval {interval}");
            assert!(fund.recent_claims > 0);
            balance -= report.paid;
            assert_eq!(fund.reward_balance.amount, balance);
        }
    }
}

#[test]
fn curation_split_follows_curator_weight() {
    let mut fund = fund(1_000, 1_000, CurveId::Linear);
    fund.percent_curation_rewards = 2_500;
    let mut claim = PendingClaim::new("alice", 1_000);
    claim.curators = vec![
        CuratorClaim { curator: "carol".into(), weight: 1 },
        CuratorClaim { curator: "dave".into(), weight: 3 },
    ];
    let report = settle(&mut fund, &[claim], NOW, &RewardParams::default()).unwrap();

    let payout = &report.payouts[0];
    assert_eq!(payout.author_tokens, 750);
    let curators: Vec<_> = payout.curators.iter().map(|c| c.amount).collect();
    assert_eq!(curators, [62, 187]);
    // one token of curation dust stays behind
    assert_eq!(fund.reward_balance.amount, 1);
}

#[test]
fn unclaimed_curation_stays_in_fund() {
    let mut fund = fund(1_000, 1_000, CurveId::Linear);
    fund.percent_curation_rewards = 2_500;
    let claims = [PendingClaim::new("alice", 1_000)];
    let report = settle(&mut fund, &claims, NOW, &RewardParams::default()).unwrap();
    assert_eq!(report.paid, 750);
    assert_eq!(fund.reward_balance.amount, 250);
}

#[test]
fn bounded_curve_caps_single_payout() {
    let mut fund = fund(1, 10_000, CurveId::Bounded);
    fund.content_constant = 0;
    let claims = [PendingClaim::new("alice", 1_000_000)];
    let report = settle(&mut fund, &claims, NOW, &RewardParams::default()).unwrap();
    assert_eq!(report.paid, 1_000);
}

#[test]
fn reward_weight_scales_claim() {
    let mut fund = fund(1_000, 100, CurveId::Linear);
    let mut half = PendingClaim::new("alice", 600);
    half.reward_weight = 5_000;
    let claims = [half, PendingClaim::new("bob", 700)];
    let report = settle(&mut fund, &claims, NOW, &RewardParams::default()).unwrap();
    let totals: Vec<_> = report.payouts.iter().map(|p| p.total()).collect();
    assert_eq!(totals, [30, 70]);
}

#[test]
fn rejects_bad_fund_parameters() {
    let mut vesting = fund(1_000, 100, CurveId::Linear);
    vesting.reward_balance.symbol = AssetSymbol::VESTS;
    assert_matches!(
        settle(&mut vesting, &[], NOW, &RewardParams::default()),
        Err(RewardError::UnsupportedSymbol(_))
    );

    let mut greedy = fund(1_000, 100, CurveId::Linear);
    greedy.percent_curation_rewards = 10_001;
    assert_matches!(
        settle(&mut greedy, &[], NOW, &RewardParams::default()),
        Err(RewardError::InvalidCurationPercent(10_001))
    );
}

#[test]
fn failed_pass_leaves_funds_untouched() {
    let mut funds = vec![fund(1_000, 100, CurveId::Linear), fund(1_000, -1, CurveId::Linear)];
    funds[1].id = FundId(1);
    let before = funds.clone();
    let claims = vec![vec![PendingClaim::new("alice", 500)], vec![]];
    assert_matches!(
        settle_funds(&mut funds, &claims, NOW, &RewardParams::default()),
        Err(RewardError::NegativeBalance(-1))
    );
    assert_eq!(funds, before);
}

#[test]
fn parallel_pass_settles_every_fund() {
    let mut funds: Vec<_> = (0..8u16)
        .map(|i| {
            let mut f = fund(1_000, 100, CurveId::Linear);
            f.id = FundId(i);
            f
        })
        .collect();
    let claims: Vec<_> = (0..4).map(|_| vec![PendingClaim::new("alice", 500)]).collect();
    let reports = settle_funds(&mut funds, &claims, NOW, &RewardParams::default()).unwrap();

    assert_eq!(reports.len(), 8);
    for (i, report) in reports.iter().enumerate() {
        assert_eq!(report.fund, FundId(i as u16));
        assert_eq!(report.paid, if i < 4 { 50 } else { 0 });
    }
}

fn arb_curve() -> impl Strategy<Value = CurveId> {
    prop_oneof![
        Just(CurveId::Quadratic),
        Just(CurveId::Bounded),
        Just(CurveId::Linear),
        Just(CurveId::SquareRoot),
        Just(CurveId::ConvergentLinear),
        Just(CurveId::ConvergentSquareRoot),
    ]
}

fn arb_claim() -> impl Strategy<Value = PendingClaim> {
    (
        any::<u64>(),
        0u16..=10_000,
        prop::collection::vec(any::<u64>(), 0..4),
    )
        .prop_map(|(weight, reward_weight, curators)| PendingClaim {
            author: "alice".into(),
            weight: u128::from(weight),
            reward_weight,
            curators: curators
                .into_iter()
                .map(|w| CuratorClaim { curator: "carol".into(), weight: u128::from(w) })
                .collect(),
        })
}

proptest! {
    #[test]
    fn settlement_conserves_balance(
        recent in any::<u64>(),
        balance in 0i64..=i64::MAX / 2,
        curve in arb_curve(),
        curation in 0u16..=10_000,
        elapsed in 0u32..2_000_000,
        claims in prop::collection::vec(arb_claim(), 0..6),
    ) {
        let mut fund = fund(u128::from(recent), balance, curve);
        fund.percent_curation_rewards = curation;
        let now = TimePointSec::from_secs(NOW.secs() + elapsed);
        let report = settle(&mut fund, &claims, now, &RewardParams::default()).unwrap();

        let sum: i64 = report.payouts.iter().map(|p| p.total()).sum();
        prop_assert_eq!(sum, report.paid);
        prop_assert!(sum <= balance);
        prop_assert_eq!(fund.reward_balance.amount, balance - sum);
        prop_assert!(report.payouts.iter().all(|p| p.total() >= 0));
    }
}
