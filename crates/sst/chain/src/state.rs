//! Ledger state accessed by the evaluators.
//!
//! [`LedgerStore`] is the accessor boundary: the evaluators read and mutate
//! state only through it. [`MemoryLedger`] is the reference implementation,
//! built from ordered maps so that iteration, serialization and equality are
//! deterministic.

use crate::{
    error::{ActionError, ApplyError, ConsensusInvariantViolation},
    ico::IcoRecord,
    sst::{EmissionSchedule, SstToken},
};
use serde::{Deserialize, Serialize};
use sst_protocol::{
    AccountName, Asset, AssetSymbol, OptionalAutomatedAction, RequiredAutomatedAction,
    TimePointSec,
};
use sst_rewards::{FundId, PendingClaim, RewardFundContext};
use std::collections::BTreeMap;

/// Serializes maps with non-string keys as a list of `[key, value]` pairs.
pub mod map_as_pairs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    /// Writes the entries in key order.
    pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    /// Reads a pair list. Later duplicates replace earlier ones.
    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Vec::<(K, V)>::deserialize(deserializer).map(|pairs| pairs.into_iter().collect())
    }
}

/// A ledger account and its balances. Vesting balances live under the vesting
/// symbol of their token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account name.
    pub name: AccountName,
    /// Balance per symbol.
    #[serde(default, with = "map_as_pairs")]
    pub balances: BTreeMap<AssetSymbol, i64>,
}

impl Account {
    /// Account with no balances.
    pub fn new(name: impl Into<AccountName>) -> Self {
        Self { name: name.into(), balances: BTreeMap::new() }
    }

    /// Balance of `symbol`, zero if never credited.
    pub fn balance(&self, symbol: AssetSymbol) -> i64 {
        self.balances.get(&symbol).copied().unwrap_or_default()
    }
}

/// Key of a contribution: the order contributions are paid out or refunded in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContributionKey {
    /// Token contributed to.
    pub symbol: AssetSymbol,
    /// Contributing account.
    pub contributor: AccountName,
    /// Contributor-chosen id.
    pub contribution_id: u32,
}

/// One ICO contribution awaiting payout or refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    /// Token contributed to.
    pub symbol: AssetSymbol,
    /// Contributing account.
    pub contributor: AccountName,
    /// Contributor-chosen id.
    pub contribution_id: u32,
    /// Core tokens contributed.
    pub contribution: Asset,
}

impl Contribution {
    /// Storage key.
    pub fn key(&self) -> ContributionKey {
        ContributionKey {
            symbol: self.symbol,
            contributor: self.contributor.clone(),
            contribution_id: self.contribution_id,
        }
    }
}

/// A queued automated action. Queues are ordered by `(execution_time, seq)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction<A> {
    /// Insertion counter, unique across both queues.
    pub seq: u64,
    /// Earliest block time the action may be included at.
    pub execution_time: TimePointSec,
    /// The action.
    pub action: A,
}

impl<A> PendingAction<A> {
    /// Whether the action may be included in a block at `time`.
    pub fn is_due(&self, time: TimePointSec) -> bool {
        self.execution_time <= time
    }
}

/// Queued required action.
pub type PendingRequiredAction = PendingAction<RequiredAutomatedAction>;

/// Queued optional action.
pub type PendingOptionalAction = PendingAction<OptionalAutomatedAction>;

/// Accessor for everything the evaluators read and write.
///
/// Object safe, so evaluators take `&mut dyn LedgerStore` and never depend on
/// the storage behind it.
pub trait LedgerStore {
    /// Time of the block being applied.
    fn head_time(&self) -> TimePointSec;

    /// Advances the head time.
    fn set_head_time(&mut self, time: TimePointSec);

    /// Time of the last reward maintenance pass.
    fn last_maintenance(&self) -> TimePointSec;

    /// Records a reward maintenance pass.
    fn set_last_maintenance(&mut self, time: TimePointSec);

    /// Account by name.
    fn account(&self, name: &AccountName) -> Option<&Account>;

    /// Mutable account by name.
    fn account_mut(&mut self, name: &AccountName) -> Option<&mut Account>;

    /// Inserts a new account.
    fn create_account(&mut self, account: Account) -> Result<(), ApplyError>;

    /// Token by liquid symbol.
    fn token(&self, symbol: AssetSymbol) -> Option<&SstToken>;

    /// Mutable token by liquid symbol.
    fn token_mut(&mut self, symbol: AssetSymbol) -> Option<&mut SstToken>;

    /// Inserts a new token.
    fn create_token(&mut self, token: SstToken) -> Result<(), ApplyError>;

    /// Liquid symbols of every token, ascending.
    fn token_symbols(&self) -> Vec<AssetSymbol>;

    /// ICO record by liquid symbol.
    fn ico(&self, symbol: AssetSymbol) -> Option<&IcoRecord>;

    /// Mutable ICO record by liquid symbol.
    fn ico_mut(&mut self, symbol: AssetSymbol) -> Option<&mut IcoRecord>;

    /// Inserts a new ICO record.
    fn create_ico(&mut self, ico: IcoRecord) -> Result<(), ApplyError>;

    /// Deletes an ICO record.
    fn remove_ico(&mut self, symbol: AssetSymbol) -> Option<IcoRecord>;

    /// Contribution by key.
    fn contribution(&self, key: &ContributionKey) -> Option<&Contribution>;

    /// First contribution to `symbol` in key order.
    fn first_contribution(&self, symbol: AssetSymbol) -> Option<&Contribution>;

    /// Inserts a new contribution.
    fn create_contribution(&mut self, contribution: Contribution) -> Result<(), ApplyError>;

    /// Deletes a contribution.
    fn remove_contribution(&mut self, key: &ContributionKey) -> Option<Contribution>;

    /// Reward fund by id.
    fn reward_fund(&self, id: FundId) -> Option<&RewardFundContext>;

    /// Mutable reward fund by id.
    fn reward_fund_mut(&mut self, id: FundId) -> Option<&mut RewardFundContext>;

    /// Inserts a new reward fund.
    fn create_reward_fund(&mut self, fund: RewardFundContext) -> Result<(), ApplyError>;

    /// Deletes a reward fund and its queued claims.
    fn remove_reward_fund(&mut self, id: FundId) -> Option<RewardFundContext>;

    /// Ids of every reward fund, ascending.
    fn reward_fund_ids(&self) -> Vec<FundId>;

    /// Claims queued against a fund since the last maintenance pass.
    fn queued_claims(&self, id: FundId) -> &[PendingClaim];

    /// Queues a claim against a fund.
    fn push_claim(&mut self, id: FundId, claim: PendingClaim);

    /// Removes and returns the claims queued against a fund.
    fn take_claims(&mut self, id: FundId) -> Vec<PendingClaim>;

    /// Emission schedules of a token, in setup order.
    fn emission_schedules(&self, symbol: AssetSymbol) -> &[EmissionSchedule];

    /// Appends an emission schedule.
    fn add_emission_schedule(&mut self, schedule: EmissionSchedule);

    /// Pending required actions in execution order.
    fn pending_required(&self) -> &[PendingRequiredAction];

    /// Mutable pending required queue. Callers keep it sorted.
    fn pending_required_mut(&mut self) -> &mut Vec<PendingRequiredAction>;

    /// Pending optional actions in execution order.
    fn pending_optional(&self) -> &[PendingOptionalAction];

    /// Mutable pending optional queue. Callers keep it sorted.
    fn pending_optional_mut(&mut self) -> &mut Vec<PendingOptionalAction>;

    /// Sequence number the next queued action will receive.
    fn peek_pending_seq(&self) -> u64;

    /// Takes the next sequence number.
    fn next_pending_seq(&mut self) -> u64;
}

/// In-memory ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryLedger {
    head_time: TimePointSec,
    last_maintenance: TimePointSec,
    accounts: BTreeMap<AccountName, Account>,
    #[serde(with = "map_as_pairs")]
    tokens: BTreeMap<AssetSymbol, SstToken>,
    #[serde(with = "map_as_pairs")]
    icos: BTreeMap<AssetSymbol, IcoRecord>,
    #[serde(with = "map_as_pairs")]
    contributions: BTreeMap<ContributionKey, Contribution>,
    #[serde(with = "map_as_pairs")]
    reward_funds: BTreeMap<FundId, RewardFundContext>,
    #[serde(with = "map_as_pairs")]
    claims: BTreeMap<FundId, Vec<PendingClaim>>,
    #[serde(with = "map_as_pairs")]
    emissions: BTreeMap<AssetSymbol, Vec<EmissionSchedule>>,
    pending_required: Vec<PendingRequiredAction>,
    pending_optional: Vec<PendingOptionalAction>,
    next_seq: u64,
}

impl MemoryLedger {
    /// Empty ledger with its head at `head_time`.
    pub fn new(head_time: TimePointSec) -> Self {
        Self { head_time, last_maintenance: head_time, ..Default::default() }
    }

    /// Number of accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Number of open contributions across all tokens.
    pub fn contribution_count(&self) -> usize {
        self.contributions.len()
    }
}

impl LedgerStore for MemoryLedger {
    fn head_time(&self) -> TimePointSec {
        self.head_time
    }

    fn set_head_time(&mut self, time: TimePointSec) {
        self.head_time = time;
    }

    fn last_maintenance(&self) -> TimePointSec {
        self.last_maintenance
    }

    fn set_last_maintenance(&mut self, time: TimePointSec) {
        self.last_maintenance = time;
    }

    fn account(&self, name: &AccountName) -> Option<&Account> {
        self.accounts.get(name)
    }

    fn account_mut(&mut self, name: &AccountName) -> Option<&mut Account> {
        self.accounts.get_mut(name)
    }

    fn create_account(&mut self, account: Account) -> Result<(), ApplyError> {
        if self.accounts.contains_key(&account.name) {
            return Err(ApplyError::AccountExists(account.name));
        }
        self.accounts.insert(account.name.clone(), account);
        Ok(())
    }

    fn token(&self, symbol: AssetSymbol) -> Option<&SstToken> {
        self.tokens.get(&symbol)
    }

    fn token_mut(&mut self, symbol: AssetSymbol) -> Option<&mut SstToken> {
        self.tokens.get_mut(&symbol)
    }

    fn create_token(&mut self, token: SstToken) -> Result<(), ApplyError> {
        if self.tokens.contains_key(&token.liquid_symbol) {
            return Err(ApplyError::TokenExists(token.liquid_symbol));
        }
        self.tokens.insert(token.liquid_symbol, token);
        Ok(())
    }

    fn token_symbols(&self) -> Vec<AssetSymbol> {
        self.tokens.keys().copied().collect()
    }

    fn ico(&self, symbol: AssetSymbol) -> Option<&IcoRecord> {
        self.icos.get(&symbol)
    }

    fn ico_mut(&mut self, symbol: AssetSymbol) -> Option<&mut IcoRecord> {
        self.icos.get_mut(&symbol)
    }

    fn create_ico(&mut self, ico: IcoRecord) -> Result<(), ApplyError> {
        if self.icos.contains_key(&ico.symbol) {
            return Err(ApplyError::IcoExists(ico.symbol));
        }
        self.icos.insert(ico.symbol, ico);
        Ok(())
    }

    fn remove_ico(&mut self, symbol: AssetSymbol) -> Option<IcoRecord> {
        self.icos.remove(&symbol)
    }

    fn contribution(&self, key: &ContributionKey) -> Option<&Contribution> {
        self.contributions.get(key)
    }

    fn first_contribution(&self, symbol: AssetSymbol) -> Option<&Contribution> {
        let start =
            ContributionKey { symbol, contributor: AccountName::default(), contribution_id: 0 };
        self.contributions
            .range(start..)
            .next()
            .map(|(_, contribution)| contribution)
            .filter(|contribution| contribution.symbol == symbol)
    }

    fn create_contribution(&mut self, contribution: Contribution) -> Result<(), ApplyError> {
        let key = contribution.key();
        if self.contributions.contains_key(&key) {
            return Err(ApplyError::DuplicateContribution {
                symbol: key.symbol,
                contributor: key.contributor,
                contribution_id: key.contribution_id,
            });
        }
        self.contributions.insert(key, contribution);
        Ok(())
    }

    fn remove_contribution(&mut self, key: &ContributionKey) -> Option<Contribution> {
        self.contributions.remove(key)
    }

    fn reward_fund(&self, id: FundId) -> Option<&RewardFundContext> {
        self.reward_funds.get(&id)
    }

    fn reward_fund_mut(&mut self, id: FundId) -> Option<&mut RewardFundContext> {
        self.reward_funds.get_mut(&id)
    }

    fn create_reward_fund(&mut self, fund: RewardFundContext) -> Result<(), ApplyError> {
        if self.reward_funds.contains_key(&fund.id) {
            return Err(ApplyError::RewardFundExists(fund.id));
        }
        self.reward_funds.insert(fund.id, fund);
        Ok(())
    }

    fn remove_reward_fund(&mut self, id: FundId) -> Option<RewardFundContext> {
        self.claims.remove(&id);
        self.reward_funds.remove(&id)
    }

    fn reward_fund_ids(&self) -> Vec<FundId> {
        self.reward_funds.keys().copied().collect()
    }

    fn queued_claims(&self, id: FundId) -> &[PendingClaim] {
        self.claims.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    fn push_claim(&mut self, id: FundId, claim: PendingClaim) {
        self.claims.entry(id).or_default().push(claim);
    }

    fn take_claims(&mut self, id: FundId) -> Vec<PendingClaim> {
        self.claims.remove(&id).unwrap_or_default()
    }

    fn emission_schedules(&self, symbol: AssetSymbol) -> &[EmissionSchedule] {
        self.emissions.get(&symbol).map(Vec::as_slice).unwrap_or_default()
    }

    fn add_emission_schedule(&mut self, schedule: EmissionSchedule) {
        self.emissions.entry(schedule.symbol).or_default().push(schedule);
    }

    fn pending_required(&self) -> &[PendingRequiredAction] {
        &self.pending_required
    }

    fn pending_required_mut(&mut self) -> &mut Vec<PendingRequiredAction> {
        &mut self.pending_required
    }

    fn pending_optional(&self) -> &[PendingOptionalAction] {
        &self.pending_optional
    }

    fn pending_optional_mut(&mut self) -> &mut Vec<PendingOptionalAction> {
        &mut self.pending_optional
    }

    fn peek_pending_seq(&self) -> u64 {
        self.next_seq
    }

    fn next_pending_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

/// Credits (or, for a negative amount, debits) an account.
pub fn adjust_balance(
    ledger: &mut dyn LedgerStore,
    account: &AccountName,
    delta: Asset,
) -> Result<(), ApplyError> {
    let entry = ledger
        .account_mut(account)
        .ok_or_else(|| ApplyError::UnknownAccount(account.clone()))?;
    let balance = entry.balance(delta.symbol);
    let updated = balance.checked_add(delta.amount).ok_or(ApplyError::Overflow("account balance"))?;
    if updated < 0 {
        return Err(ApplyError::InsufficientFunds {
            account: account.clone(),
            symbol: delta.symbol,
            balance,
            required: -delta.amount,
        });
    }
    entry.balances.insert(delta.symbol, updated);
    Ok(())
}

/// Converts liquid tokens into vesting shares for `account`, one share per
/// token. Token vesting totals follow when the symbol belongs to an issued
/// token. Returns the vesting amount credited.
pub fn create_vesting(
    ledger: &mut dyn LedgerStore,
    account: &AccountName,
    liquid: Asset,
) -> Result<Asset, ApplyError> {
    if liquid.amount < 0 || liquid.symbol.is_vesting() {
        return Err(ApplyError::InvalidAmount(liquid));
    }
    let vesting = Asset::new(liquid.amount, liquid.symbol.vesting_symbol());
    if ledger.account(account).is_none() {
        return Err(ApplyError::UnknownAccount(account.clone()));
    }
    if let Some(token) = ledger.token_mut(liquid.symbol) {
        token.total_vesting_fund = token
            .total_vesting_fund
            .checked_add(liquid.amount)
            .ok_or(ApplyError::Overflow("total vesting fund"))?;
        token.total_vesting_shares = token
            .total_vesting_shares
            .checked_add(vesting.amount)
            .ok_or(ApplyError::Overflow("total vesting shares"))?;
    }
    adjust_balance(ledger, account, vesting)?;
    Ok(vesting)
}

/// Raises the circulating supply of a token.
pub fn adjust_supply(
    ledger: &mut dyn LedgerStore,
    symbol: AssetSymbol,
    delta: i64,
) -> Result<(), ActionError> {
    let token = ledger.token_mut(symbol).ok_or(ApplyError::UnknownToken(symbol))?;
    let supply = token
        .current_supply
        .checked_add(delta)
        .ok_or(ConsensusInvariantViolation::SupplyOverflow(symbol))?;
    if supply < 0 {
        return Err(ConsensusInvariantViolation::SupplyOverflow(symbol).into());
    }
    if supply > token.max_supply {
        return Err(ApplyError::MaxSupplyExceeded { symbol, max_supply: token.max_supply }.into());
    }
    token.current_supply = supply;
    Ok(())
}
