use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use backoffice_core::{DomainError, DomainResult, EntryId, PostingId, TransferId};

use crate::account::{AccountCode, AccountKind};
use crate::command::LedgerOperation;
use crate::entry::{LedgerEntry, Posting};

/// Decide the posting for an operation: one debit leg, one credit leg.
///
/// Pure; nothing is written. `linked_transfer` tags both legs with the
/// transfer an exchange operation created (settlements carry their own id).
pub fn prepare_posting(
    op: &LedgerOperation,
    linked_transfer: Option<TransferId>,
    now: DateTime<Utc>,
) -> DomainResult<Posting> {
    let movement = op.movement();
    if movement.amount_cents <= 0 {
        return Err(DomainError::invalid_amount("amount must be greater than zero"));
    }

    let transfer_id = op.closes_transfer().or(linked_transfer);

    let (debit, credit) = op.legs();
    let posting_id = PostingId::new();
    let action = op.action();

    let leg = |account: AccountCode, amount_cents: i64| LedgerEntry {
        id: EntryId::new(),
        posting_id,
        account,
        amount_cents,
        action,
        details: movement.details.clone(),
        transfer_id,
        created_at: now,
    };

    let posting = Posting {
        id: posting_id,
        action,
        entries: vec![
            leg(debit, movement.amount_cents),
            leg(credit, -movement.amount_cents),
        ],
    };

    if !posting.is_balanced() {
        return Err(DomainError::invalid_operation("posting does not balance"));
    }
    Ok(posting)
}

/// Running balances per account (debit-positive), derived from entries only.
///
/// Accumulates in `i128`; reads saturate at the `i64` bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balances(BTreeMap<AccountCode, i128>);

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        let mut balances = Self::new();
        for entry in entries {
            balances.apply_entry(entry);
        }
        balances
    }

    /// For stores that aggregate balances themselves (e.g. `SUM ... GROUP BY`).
    pub fn from_totals(totals: impl IntoIterator<Item = (AccountCode, i64)>) -> Self {
        Self(totals.into_iter().map(|(a, v)| (a, i128::from(v))).collect())
    }

    pub fn apply_entry(&mut self, entry: &LedgerEntry) {
        *self.0.entry(entry.account).or_insert(0) += i128::from(entry.amount_cents);
    }

    pub fn apply(&mut self, posting: &Posting) {
        for entry in &posting.entries {
            self.apply_entry(entry);
        }
    }

    pub fn get(&self, account: AccountCode) -> i64 {
        self.0.get(&account).copied().map(saturate).unwrap_or(0)
    }

    /// Sum over every account. Zero whenever only balanced postings were applied.
    pub fn total(&self) -> i128 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AccountCode, i64)> + '_ {
        self.0.iter().map(|(a, b)| (*a, saturate(*b)))
    }
}

fn saturate(cents: i128) -> i64 {
    i64::try_from(cents).unwrap_or(if cents < 0 { i64::MIN } else { i64::MAX })
}

/// Read model: one account's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account: AccountCode,
    pub name: String,
    pub kind: AccountKind,
    /// Signed, debit-positive.
    pub balance_cents: i64,
}

/// Balances plus the most recent entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub accounts: Vec<AccountBalance>,
    pub recent_entries: Vec<LedgerEntry>,
    pub entry_count: u64,
}

impl LedgerSummary {
    /// Fixed accounts are always listed (in display order); expense accounts
    /// only once they have activity.
    pub fn build(balances: &Balances, recent_entries: Vec<LedgerEntry>, entry_count: u64) -> Self {
        let expense_accounts = balances
            .iter()
            .map(|(account, _)| account)
            .filter(|a| matches!(a, AccountCode::Expense(_)));

        let accounts = AccountCode::FIXED
            .into_iter()
            .chain(expense_accounts)
            .map(|account| AccountBalance {
                account,
                name: account.name(),
                kind: account.kind(),
                balance_cents: balances.get(account),
            })
            .collect();

        Self {
            accounts,
            recent_entries,
            entry_count,
        }
    }

    pub fn balance_of(&self, account: AccountCode) -> i64 {
        self.accounts
            .iter()
            .find(|a| a.account == account)
            .map(|a| a.balance_cents)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::ExpenseCategory;
    use crate::command::{LedgerAction, Movement, PaidFrom};
    use crate::entry::EntryDetails;
    use proptest::prelude::*;

    fn movement(amount_cents: i64) -> Movement {
        Movement {
            amount_cents,
            details: EntryDetails::default(),
        }
    }

    fn post(balances: &mut Balances, op: LedgerOperation) -> Posting {
        let posting = prepare_posting(&op, None, Utc::now()).unwrap();
        balances.apply(&posting);
        posting
    }

    #[test]
    fn cash_income_debits_cash_and_credits_revenue() {
        let mut balances = Balances::new();
        let mut op_movement = movement(50_000);
        op_movement.details.client_name = Some("Acme".to_string());
        let posting = post(&mut balances, LedgerOperation::CashIncome(op_movement));

        assert_eq!(posting.entries.len(), 2);
        assert_eq!(posting.entries[0].account, AccountCode::CashOnHand);
        assert_eq!(posting.entries[0].amount_cents, 50_000);
        assert_eq!(posting.entries[1].account, AccountCode::Revenue);
        assert_eq!(posting.entries[1].amount_cents, -50_000);
        assert!(posting.entries.iter().all(|e| e.posting_id == posting.id));
        assert!(posting
            .entries
            .iter()
            .all(|e| e.details.client_name.as_deref() == Some("Acme")));

        assert_eq!(balances.get(AccountCode::CashOnHand), 50_000);
        assert_eq!(balances.total(), 0);
    }

    #[test]
    fn owner_draw_may_overdraw_cash() {
        let mut balances = Balances::new();
        post(&mut balances, LedgerOperation::OwnerDraw(movement(1_000)));
        assert_eq!(balances.get(AccountCode::CashOnHand), -1_000);
        assert_eq!(balances.get(AccountCode::OwnerEquity), 1_000);
    }

    #[test]
    fn exchange_transfer_moves_bank_into_pending_and_tags_transfer() {
        let transfer_id = TransferId::new();
        let posting = prepare_posting(
            &LedgerOperation::WireToKraken(movement(2_500)),
            Some(transfer_id),
            Utc::now(),
        )
        .unwrap();

        let mut balances = Balances::new();
        balances.apply(&posting);
        assert_eq!(balances.get(AccountCode::KrakenPending), 2_500);
        assert_eq!(balances.get(AccountCode::BankFulton), -2_500);
        assert!(posting.entries.iter().all(|e| e.transfer_id == Some(transfer_id)));
    }

    #[test]
    fn settlement_clears_pending_into_kraken() {
        let transfer_id = TransferId::new();
        let mut balances = Balances::new();
        post(&mut balances, LedgerOperation::AchToKraken(movement(700)));
        let posting = post(
            &mut balances,
            LedgerOperation::SettleTransfer {
                transfer_id,
                movement: movement(700),
            },
        );

        assert_eq!(balances.get(AccountCode::KrakenPending), 0);
        assert_eq!(balances.get(AccountCode::Kraken), 700);
        assert!(posting.entries.iter().all(|e| e.transfer_id == Some(transfer_id)));
    }

    #[test]
    fn reversal_returns_pending_funds_to_the_bank() {
        let transfer_id = TransferId::new();
        let mut balances = Balances::new();
        post(&mut balances, LedgerOperation::AchToKraken(movement(900)));
        let posting = post(
            &mut balances,
            LedgerOperation::ReverseTransfer {
                transfer_id,
                movement: movement(900),
            },
        );

        assert_eq!(balances.get(AccountCode::KrakenPending), 0);
        assert_eq!(balances.get(AccountCode::BankFulton), 0);
        assert_eq!(posting.action, LedgerAction::CancelTransfer);
        assert!(posting.entries.iter().all(|e| e.transfer_id == Some(transfer_id)));
    }

    #[test]
    fn balances_do_not_wrap_near_the_i64_bounds() {
        let mut balances = Balances::new();
        for _ in 0..3 {
            post(&mut balances, LedgerOperation::CashIncome(movement(i64::MAX / 2)));
        }
        assert_eq!(balances.get(AccountCode::CashOnHand), i64::MAX);
        assert_eq!(balances.get(AccountCode::Revenue), i64::MIN);
        assert_eq!(balances.total(), 0);
    }

    #[test]
    fn expense_posts_to_category_account() {
        let mut balances = Balances::new();
        post(
            &mut balances,
            LedgerOperation::Expense {
                movement: movement(4_200),
                category: ExpenseCategory::Travel,
                paid_from: PaidFrom::Bank,
            },
        );
        assert_eq!(balances.get(AccountCode::Expense(ExpenseCategory::Travel)), 4_200);
        assert_eq!(balances.get(AccountCode::BankFulton), -4_200);
    }

    #[test]
    fn non_positive_amounts_never_post() {
        for amount in [0, -1] {
            let err = prepare_posting(&LedgerOperation::CashIncome(movement(amount)), None, Utc::now())
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidAmount(_)));
        }
    }

    #[test]
    fn summary_lists_fixed_accounts_then_active_expenses() {
        let mut balances = Balances::new();
        post(
            &mut balances,
            LedgerOperation::Expense {
                movement: movement(100),
                category: ExpenseCategory::Software,
                paid_from: PaidFrom::Cash,
            },
        );

        let summary = LedgerSummary::build(&balances, vec![], 2);
        let codes: Vec<String> = summary.accounts.iter().map(|a| a.account.code()).collect();
        assert_eq!(
            codes,
            vec![
                "CASH_ON_HAND",
                "BANK_FULTON",
                "KRAKEN_PENDING",
                "KRAKEN",
                "OWNER_EQUITY",
                "REVENUE",
                "EXPENSE:SOFTWARE",
            ]
        );
        assert_eq!(summary.balance_of(AccountCode::CashOnHand), -100);
        assert_eq!(summary.balance_of(AccountCode::Revenue), 0);
    }

    fn arb_operation() -> impl Strategy<Value = LedgerOperation> {
        let amount = 1i64..10_000_000i64;
        prop_oneof![
            amount.clone().prop_map(|a| LedgerOperation::CashIncome(movement(a))),
            amount.clone().prop_map(|a| LedgerOperation::OwnerDraw(movement(a))),
            amount.clone().prop_map(|a| LedgerOperation::CapitalContribution(movement(a))),
            amount.clone().prop_map(|a| LedgerOperation::DepositCashToBank(movement(a))),
            amount.clone().prop_map(|a| LedgerOperation::AchToKraken(movement(a))),
            amount.clone().prop_map(|a| LedgerOperation::WireToKraken(movement(a))),
            (amount.clone(), 0usize..ExpenseCategory::ALL.len(), any::<bool>()).prop_map(
                |(a, c, bank)| LedgerOperation::Expense {
                    movement: movement(a),
                    category: ExpenseCategory::ALL[c],
                    paid_from: if bank { PaidFrom::Bank } else { PaidFrom::Cash },
                }
            ),
            amount.clone().prop_map(|a| LedgerOperation::SettleTransfer {
                transfer_id: TransferId::new(),
                movement: movement(a),
            }),
            amount.prop_map(|a| LedgerOperation::ReverseTransfer {
                transfer_id: TransferId::new(),
                movement: movement(a),
            }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of operations, all entries sum to zero.
        #[test]
        fn ledger_always_sums_to_zero(ops in prop::collection::vec(arb_operation(), 0..40)) {
            let mut balances = Balances::new();
            let mut entries = Vec::new();
            for op in ops {
                let posting = prepare_posting(&op, None, Utc::now()).unwrap();
                prop_assert!(posting.is_balanced());
                balances.apply(&posting);
                entries.extend(posting.entries);
                prop_assert_eq!(balances.total(), 0);
            }
            prop_assert_eq!(Balances::from_entries(&entries), balances);
        }

        /// Property: cash income raises cash by exactly the amount.
        #[test]
        fn cash_income_raises_cash_exactly(
            prior in prop::collection::vec(arb_operation(), 0..10),
            amount in 1i64..10_000_000i64,
        ) {
            let mut balances = Balances::new();
            for op in prior {
                balances.apply(&prepare_posting(&op, None, Utc::now()).unwrap());
            }
            let before = balances.clone();
            balances.apply(
                &prepare_posting(&LedgerOperation::CashIncome(movement(amount)), None, Utc::now()).unwrap(),
            );

            prop_assert_eq!(
                balances.get(AccountCode::CashOnHand) - before.get(AccountCode::CashOnHand),
                amount
            );
            let decreased: i64 = AccountCode::FIXED
                .into_iter()
                .map(|a| (before.get(a) - balances.get(a)).max(0))
                .sum();
            prop_assert!(decreased <= amount);
        }
    }
}
