// 📒 Core data model - people, expenses, monthly ledgers
//
// A person is just a display name. Expenses reference people by name, so a
// rename has to touch every expense (see roster.rs).

use crate::error::{Result, SplitError};
use chrono::{Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// MONTH TOKEN
// ============================================================================

/// "YYYY-MM" partition key for ledgers.
///
/// Stored as the first day of the month, so ordering is chronological and
/// matches the lexicographic order of the textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthToken(NaiveDate);

impl MonthToken {
    pub fn parse(token: &str) -> Result<Self> {
        let bytes = token.as_bytes();
        let well_formed = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || b.is_ascii_digit());

        if !well_formed {
            return Err(SplitError::InvalidMonthToken(token.to_string()));
        }

        NaiveDate::parse_from_str(&format!("{}-01", token), "%Y-%m-%d")
            .map(MonthToken)
            .map_err(|_| SplitError::InvalidMonthToken(token.to_string()))
    }

    /// Month containing `date`
    pub fn from_date(date: NaiveDate) -> Self {
        MonthToken(date - Days::new(u64::from(date.day0())))
    }

    /// Current calendar month (UTC)
    pub fn current() -> Self {
        Self::from_date(Utc::now().date_naive())
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::from_date(date) == *self
    }

    /// Human label, e.g. "August 2024"
    pub fn label(&self) -> String {
        self.0.format("%B %Y").to_string()
    }

    pub fn next(&self) -> Self {
        MonthToken(self.0 + chrono::Months::new(1))
    }

    pub fn previous(&self) -> Self {
        MonthToken(self.0 - chrono::Months::new(1))
    }
}

impl fmt::Display for MonthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl FromStr for MonthToken {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self> {
        MonthToken::parse(s)
    }
}

impl TryFrom<String> for MonthToken {
    type Error = SplitError;

    fn try_from(value: String) -> Result<Self> {
        MonthToken::parse(&value)
    }
}

impl From<MonthToken> for String {
    fn from(token: MonthToken) -> Self {
        token.to_string()
    }
}

// ============================================================================
// EXPENSE
// ============================================================================

/// One shared expense.
///
/// Only constructed through `ExpenseDraft::validate` (or loaded from storage),
/// so `amount > 0`, `split_with` is non-empty and `paid_by` is a known person
/// at the time it entered the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub paid_by: String,
    pub split_with: Vec<String>,
    pub date: NaiveDate,
}

impl Expense {
    /// Equal share of this expense per participant
    pub fn per_head(&self) -> Option<f64> {
        if self.split_with.is_empty() {
            None
        } else {
            Some(self.amount / self.split_with.len() as f64)
        }
    }

    pub fn involves(&self, person: &str) -> bool {
        self.paid_by == person || self.split_with.iter().any(|p| p == person)
    }
}

/// Expense as found in storage. Records written before dates were tracked
/// have no `date`; it is filled in on load.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredExpense {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub paid_by: String,
    pub split_with: Vec<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl StoredExpense {
    pub(crate) fn into_expense(self, month: MonthToken) -> Expense {
        Expense {
            id: self.id,
            description: self.description,
            amount: self.amount,
            paid_by: self.paid_by,
            split_with: self.split_with,
            date: self.date.unwrap_or_else(|| month.first_day()),
        }
    }
}

// ============================================================================
// MONTH LEDGER
// ============================================================================

/// People roster and expenses for one month
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthLedger {
    pub people: Vec<String>,
    pub expenses: Vec<Expense>,
}

impl MonthLedger {
    pub fn new(people: Vec<String>) -> Self {
        MonthLedger {
            people,
            expenses: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.expenses.is_empty()
    }

    pub fn has_person(&self, name: &str) -> bool {
        self.people.iter().any(|p| p == name)
    }

    pub fn total(&self) -> f64 {
        self.expenses.iter().map(|e| e.amount).sum()
    }
}

/// Ledger payload as stored under `expense_data_<token>`. Both fields are
/// required; a payload missing either one is treated as absent.
#[derive(Debug, Deserialize)]
pub(crate) struct LedgerRecord {
    pub people: Vec<String>,
    pub expenses: Vec<StoredExpense>,
}

impl LedgerRecord {
    pub(crate) fn into_ledger(self, month: MonthToken) -> MonthLedger {
        MonthLedger {
            people: self.people,
            expenses: self
                .expenses
                .into_iter()
                .map(|e| e.into_expense(month))
                .collect(),
        }
    }
}

// ============================================================================
// SETTLEMENT
// ============================================================================

/// Suggested transfer that moves a debtor towards zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub from: String,
    pub to: String,
    pub amount: f64,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_token_parse() {
        let token = MonthToken::parse("2024-08").unwrap();
        assert_eq!(token.year(), 2024);
        assert_eq!(token.month(), 8);
        assert_eq!(token.to_string(), "2024-08");
        assert_eq!(token.first_day(), date(2024, 8, 1));
    }

    #[test]
    fn test_month_token_rejects_garbage() {
        for bad in ["2024-13", "2024-00", "24-08", "2024/08", "2024-8", "2024-08-01", ""] {
            assert_eq!(
                MonthToken::parse(bad),
                Err(SplitError::InvalidMonthToken(bad.to_string())),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_month_token_ordering_is_chronological() {
        let mut tokens: Vec<MonthToken> = ["2024-11", "2023-12", "2024-02"]
            .iter()
            .map(|t| t.parse().unwrap())
            .collect();
        tokens.sort();

        let text: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(text, vec!["2023-12", "2024-02", "2024-11"]);
    }

    #[test]
    fn test_month_token_from_date_and_navigation() {
        let token = MonthToken::from_date(date(2024, 12, 31));
        assert_eq!(token.to_string(), "2024-12");
        assert!(token.contains(date(2024, 12, 1)));
        assert!(!token.contains(date(2025, 1, 1)));
        assert_eq!(token.next().to_string(), "2025-01");
        assert_eq!(token.previous().to_string(), "2024-11");
        assert_eq!(token.label(), "December 2024");
    }

    #[test]
    fn test_month_token_serde_as_string() {
        let token = MonthToken::parse("2024-06").unwrap();
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"2024-06\"");

        let parsed: Vec<MonthToken> = serde_json::from_str(r#"["2024-06","2023-01"]"#).unwrap();
        assert_eq!(parsed[1].to_string(), "2023-01");

        assert!(serde_json::from_str::<MonthToken>("\"June\"").is_err());
    }

    #[test]
    fn test_expense_json_field_names() {
        let expense = Expense {
            id: "e1".to_string(),
            description: "Dinner".to_string(),
            amount: 450.5,
            paid_by: "Pranjal".to_string(),
            split_with: vec!["Pranjal".to_string(), "Vishal".to_string()],
            date: date(2024, 8, 3),
        };

        let json = serde_json::to_value(&expense).unwrap();
        assert_eq!(json["paidBy"], "Pranjal");
        assert_eq!(json["splitWith"][1], "Vishal");
        assert_eq!(json["date"], "2024-08-03");
    }

    #[test]
    fn test_stored_expense_without_date_is_backfilled() {
        let raw = r#"{"id":"x","description":"Fuel","amount":90,"paidBy":"A","splitWith":["A"]}"#;
        let stored: StoredExpense = serde_json::from_str(raw).unwrap();
        let expense = stored.into_expense(MonthToken::parse("2023-05").unwrap());

        assert_eq!(expense.date, date(2023, 5, 1));
        assert_eq!(expense.amount, 90.0);
    }

    #[test]
    fn test_ledger_record_requires_both_fields() {
        assert!(serde_json::from_str::<LedgerRecord>(r#"{"people":["A"]}"#).is_err());
        assert!(serde_json::from_str::<LedgerRecord>(r#"{"expenses":[]}"#).is_err());
        assert!(serde_json::from_str::<LedgerRecord>(r#"{"people":[],"expenses":[]}"#).is_ok());
    }

    #[test]
    fn test_per_head() {
        let mut expense = Expense {
            id: "e".to_string(),
            description: "Rent".to_string(),
            amount: 300.0,
            paid_by: "A".to_string(),
            split_with: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            date: date(2024, 1, 1),
        };
        assert_eq!(expense.per_head(), Some(100.0));
        assert!(expense.involves("C"));

        expense.split_with.clear();
        assert_eq!(expense.per_head(), None);
    }
}
