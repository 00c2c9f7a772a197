use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use backoffice_core::DomainError;

/// High-level account kind (determines normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Equity,
    Revenue,
    Expense,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Asset => "asset",
            AccountKind::Equity => "equity",
            AccountKind::Revenue => "revenue",
            AccountKind::Expense => "expense",
        }
    }
}

/// Closed set of expense categories. Each one is its own `EXPENSE:{category}` account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExpenseCategory {
    Software,
    Hardware,
    Travel,
    Meals,
    Office,
    ProfessionalServices,
    Marketing,
    BankFees,
    Taxes,
    Insurance,
    Contractors,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 12] = [
        ExpenseCategory::Software,
        ExpenseCategory::Hardware,
        ExpenseCategory::Travel,
        ExpenseCategory::Meals,
        ExpenseCategory::Office,
        ExpenseCategory::ProfessionalServices,
        ExpenseCategory::Marketing,
        ExpenseCategory::BankFees,
        ExpenseCategory::Taxes,
        ExpenseCategory::Insurance,
        ExpenseCategory::Contractors,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Software => "SOFTWARE",
            ExpenseCategory::Hardware => "HARDWARE",
            ExpenseCategory::Travel => "TRAVEL",
            ExpenseCategory::Meals => "MEALS",
            ExpenseCategory::Office => "OFFICE",
            ExpenseCategory::ProfessionalServices => "PROFESSIONAL_SERVICES",
            ExpenseCategory::Marketing => "MARKETING",
            ExpenseCategory::BankFees => "BANK_FEES",
            ExpenseCategory::Taxes => "TAXES",
            ExpenseCategory::Insurance => "INSURANCE",
            ExpenseCategory::Contractors => "CONTRACTORS",
            ExpenseCategory::Other => "OTHER",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            ExpenseCategory::Software => "Software",
            ExpenseCategory::Hardware => "Hardware",
            ExpenseCategory::Travel => "Travel",
            ExpenseCategory::Meals => "Meals",
            ExpenseCategory::Office => "Office",
            ExpenseCategory::ProfessionalServices => "Professional Services",
            ExpenseCategory::Marketing => "Marketing",
            ExpenseCategory::BankFees => "Bank Fees",
            ExpenseCategory::Taxes => "Taxes",
            ExpenseCategory::Insurance => "Insurance",
            ExpenseCategory::Contractors => "Contractors",
            ExpenseCategory::Other => "Other",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = DomainError;

    /// Case-insensitive; spaces and dashes are read as underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        ExpenseCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                let allowed = ExpenseCategory::ALL
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                DomainError::invalid_category(format!(
                    "unknown expense category '{}'. Allowed: {allowed}",
                    s.trim()
                ))
            })
    }
}

/// A ledger account. The set is closed: six fixed accounts plus one expense
/// account per [`ExpenseCategory`].
///
/// Serialized as its code string (`CASH_ON_HAND`, `EXPENSE:SOFTWARE`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountCode {
    CashOnHand,
    BankFulton,
    KrakenPending,
    Kraken,
    OwnerEquity,
    Revenue,
    Expense(ExpenseCategory),
}

impl AccountCode {
    /// Accounts always shown in a summary, in display order.
    pub const FIXED: [AccountCode; 6] = [
        AccountCode::CashOnHand,
        AccountCode::BankFulton,
        AccountCode::KrakenPending,
        AccountCode::Kraken,
        AccountCode::OwnerEquity,
        AccountCode::Revenue,
    ];

    const EXPENSE_PREFIX: &'static str = "EXPENSE:";

    pub fn code(&self) -> String {
        match self {
            AccountCode::CashOnHand => "CASH_ON_HAND".to_string(),
            AccountCode::BankFulton => "BANK_FULTON".to_string(),
            AccountCode::KrakenPending => "KRAKEN_PENDING".to_string(),
            AccountCode::Kraken => "KRAKEN".to_string(),
            AccountCode::OwnerEquity => "OWNER_EQUITY".to_string(),
            AccountCode::Revenue => "REVENUE".to_string(),
            AccountCode::Expense(c) => format!("{}{}", Self::EXPENSE_PREFIX, c.as_str()),
        }
    }

    pub fn name(&self) -> String {
        match self {
            AccountCode::CashOnHand => "Cash on Hand".to_string(),
            AccountCode::BankFulton => "Fulton Bank".to_string(),
            AccountCode::KrakenPending => "Kraken (pending)".to_string(),
            AccountCode::Kraken => "Kraken".to_string(),
            AccountCode::OwnerEquity => "Owner Equity".to_string(),
            AccountCode::Revenue => "Revenue".to_string(),
            AccountCode::Expense(c) => format!("Expense: {}", c.display_name()),
        }
    }

    pub fn kind(&self) -> AccountKind {
        match self {
            AccountCode::CashOnHand
            | AccountCode::BankFulton
            | AccountCode::KrakenPending
            | AccountCode::Kraken => AccountKind::Asset,
            AccountCode::OwnerEquity => AccountKind::Equity,
            AccountCode::Revenue => AccountKind::Revenue,
            AccountCode::Expense(_) => AccountKind::Expense,
        }
    }
}

impl fmt::Display for AccountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl FromStr for AccountCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(category) = s.strip_prefix(Self::EXPENSE_PREFIX) {
            return Ok(AccountCode::Expense(category.parse()?));
        }
        AccountCode::FIXED
            .into_iter()
            .find(|a| a.code() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown account '{s}'")))
    }
}

impl Serialize for AccountCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

impl<'de> Deserialize<'de> for AccountCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_parse_back() {
        for account in AccountCode::FIXED {
            assert_eq!(account.code().parse::<AccountCode>().unwrap(), account);
        }
        for category in ExpenseCategory::ALL {
            let account = AccountCode::Expense(category);
            assert_eq!(account.code().parse::<AccountCode>().unwrap(), account);
        }
    }

    #[test]
    fn category_parsing_is_lenient_about_case_and_separators() {
        assert_eq!(
            "professional services".parse::<ExpenseCategory>().unwrap(),
            ExpenseCategory::ProfessionalServices
        );
        assert_eq!("bank-fees".parse::<ExpenseCategory>().unwrap(), ExpenseCategory::BankFees);
        assert_eq!(" software ".parse::<ExpenseCategory>().unwrap(), ExpenseCategory::Software);
    }

    #[test]
    fn unknown_category_lists_allowed_values() {
        let err = "yachts".parse::<ExpenseCategory>().unwrap_err();
        match err {
            DomainError::InvalidCategory(msg) => {
                assert!(msg.contains("yachts"));
                assert!(msg.contains("SOFTWARE"));
            }
            other => panic!("expected InvalidCategory, got {other:?}"),
        }
    }

    #[test]
    fn kinds() {
        assert_eq!(AccountCode::KrakenPending.kind(), AccountKind::Asset);
        assert_eq!(AccountCode::OwnerEquity.kind(), AccountKind::Equity);
        assert_eq!(AccountCode::Expense(ExpenseCategory::Meals).kind(), AccountKind::Expense);
    }
}
