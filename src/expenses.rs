// 🧾 Expense operations on a month ledger

use crate::error::{ExpenseIssue, Result, SplitError};
use crate::model::{Expense, MonthLedger};
use crate::validation::{check_amount, check_split, ExpenseDraft};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Partial update for an existing expense; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub paid_by: Option<String>,
    pub split_with: Option<Vec<String>>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "person", rename_all = "camelCase")]
pub enum ExpenseFilter {
    #[default]
    All,
    PaidBy(String),
    SplitWith(String),
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        match self {
            ExpenseFilter::All => true,
            ExpenseFilter::PaidBy(person) => &expense.paid_by == person,
            ExpenseFilter::SplitWith(person) => expense.split_with.contains(person),
        }
    }
}

impl MonthLedger {
    /// Validate `draft` against this month's people and append it
    pub fn add_expense(&mut self, draft: &ExpenseDraft, today: NaiveDate) -> Result<&Expense> {
        let expense = draft.validate(&self.people, today)?;
        self.expenses.push(expense);
        Ok(&self.expenses[self.expenses.len() - 1])
    }

    pub fn expense(&self, id: &str) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    /// Returns false if no expense has that id
    pub fn remove_expense(&mut self, id: &str) -> bool {
        let before = self.expenses.len();
        self.expenses.retain(|e| e.id != id);
        self.expenses.len() != before
    }

    /// Apply `patch` to the expense with `id`. The merged expense must pass
    /// the same checks as a new one; on failure nothing changes.
    pub fn edit_expense(&mut self, id: &str, patch: ExpensePatch) -> Result<&Expense> {
        let position = self
            .expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| SplitError::ExpenseNotFound(id.to_string()))?;

        let current = &self.expenses[position];
        let description = patch
            .description
            .map(|d| d.trim().to_string())
            .unwrap_or_else(|| current.description.clone());
        if description.is_empty() {
            return Err(SplitError::InvalidExpense(ExpenseIssue::MissingDescription));
        }

        let amount = check_amount(Some(patch.amount.unwrap_or(current.amount)))?;

        let paid_by = patch.paid_by.unwrap_or_else(|| current.paid_by.clone());
        if !self.has_person(&paid_by) {
            return Err(SplitError::InvalidExpense(ExpenseIssue::UnknownPayer(paid_by)));
        }

        let split_with = check_split(
            patch.split_with.as_deref().unwrap_or(&current.split_with),
            &self.people,
        )?;
        let date = patch.date.unwrap_or(current.date);

        let expense = &mut self.expenses[position];
        expense.description = description;
        expense.amount = amount;
        expense.paid_by = paid_by;
        expense.split_with = split_with;
        expense.date = date;

        Ok(&self.expenses[position])
    }

    pub fn filter_expenses(&self, filter: &ExpenseFilter) -> Vec<&Expense> {
        self.expenses.iter().filter(|e| filter.matches(e)).collect()
    }
}
