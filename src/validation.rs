// ✅ Input boundary - the only way a collaborator builds an Expense
//
// A draft carries raw form state; validate() either returns an Expense that
// satisfies the ledger invariants or the first problem found, phrased for
// the user.

use crate::error::{ExpenseIssue, Result, SplitError};
use crate::model::Expense;
use crate::session::Session;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    pub description: String,
    pub amount: Option<f64>,
    pub paid_by: Option<String>,
    pub split_with: Vec<String>,
    pub date: Option<NaiveDate>,
}

impl ExpenseDraft {
    pub fn new(description: impl Into<String>, amount: f64) -> Self {
        ExpenseDraft {
            description: description.into(),
            amount: Some(amount),
            ..Default::default()
        }
    }

    pub fn paid_by(mut self, person: impl Into<String>) -> Self {
        self.paid_by = Some(person.into());
        self
    }

    pub fn split_with<I, T>(mut self, people: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.split_with = people.into_iter().map(Into::into).collect();
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Check the draft against `people` and mint a new Expense (fresh id,
    /// trimmed description, `today` when no date was picked).
    pub fn validate(&self, people: &[String], today: NaiveDate) -> Result<Expense> {
        let (description, amount, paid_by, split_with) = self.checked_fields(people)?;

        Ok(Expense {
            id: uuid::Uuid::new_v4().to_string(),
            description,
            amount,
            paid_by,
            split_with,
            date: self.date.unwrap_or(today),
        })
    }

    pub(crate) fn checked_fields(
        &self,
        people: &[String],
    ) -> Result<(String, f64, String, Vec<String>)> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(invalid(ExpenseIssue::MissingDescription));
        }

        let amount = check_amount(self.amount)?;

        let paid_by = self.paid_by.as_deref().unwrap_or_default();
        if !people.iter().any(|p| p == paid_by) {
            return Err(invalid(ExpenseIssue::UnknownPayer(paid_by.to_string())));
        }

        let split_with = check_split(&self.split_with, people)?;

        Ok((description.to_string(), amount, paid_by.to_string(), split_with))
    }
}

fn invalid(issue: ExpenseIssue) -> SplitError {
    SplitError::InvalidExpense(issue)
}

pub(crate) fn check_amount(amount: Option<f64>) -> Result<f64> {
    match amount {
        Some(a) if a.is_finite() && a > 0.0 => Ok(a),
        _ => Err(invalid(ExpenseIssue::InvalidAmount)),
    }
}

/// De-duplicated participant list (first occurrence wins), all on the roster
pub(crate) fn check_split(split_with: &[String], people: &[String]) -> Result<Vec<String>> {
    let mut unique: Vec<String> = Vec::with_capacity(split_with.len());
    for name in split_with {
        if !people.iter().any(|p| p == name) {
            return Err(invalid(ExpenseIssue::UnknownParticipant(name.clone())));
        }
        if !unique.contains(name) {
            unique.push(name.clone());
        }
    }

    if unique.is_empty() {
        return Err(invalid(ExpenseIssue::EmptySplit));
    }

    Ok(unique)
}

/// Who the payer picker should start on: the logged-in person if they are on
/// this month's roster, otherwise the first person.
pub fn default_payer<'a>(people: &'a [String], session: &Session) -> Option<&'a str> {
    if let Some(user) = session.current_user() {
        if let Some(person) = people.iter().find(|p| p.as_str() == user) {
            return Some(person.as_str());
        }
    }

    people.first().map(String::as_str)
}
