// 🕰️ Month history - per-month overview with expenses grouped by day

use crate::model::{Expense, MonthLedger, MonthToken};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub expenses: Vec<Expense>,
}

impl DayGroup {
    pub fn total(&self) -> f64 {
        self.expenses.iter().map(|e| e.amount).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthHistory {
    pub token: MonthToken,
    pub people: Vec<String>,
    pub expense_count: usize,
    pub total: f64,
    /// Most recent day first; insertion order within a day
    pub days: Vec<DayGroup>,
}

impl MonthHistory {
    pub fn from_ledger(token: MonthToken, ledger: &MonthLedger) -> Self {
        MonthHistory {
            token,
            people: ledger.people.clone(),
            expense_count: ledger.expenses.len(),
            total: ledger.total(),
            days: group_by_day(&ledger.expenses),
        }
    }

    pub fn label(&self) -> String {
        self.token.label()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{} expenses • {}",
            self.expense_count,
            crate::report::format_inr(self.total)
        )
    }
}

pub fn group_by_day(expenses: &[Expense]) -> Vec<DayGroup> {
    let mut days: Vec<DayGroup> = Vec::new();

    for expense in expenses {
        match days.iter_mut().find(|d| d.date == expense.date) {
            Some(day) => day.expenses.push(expense.clone()),
            None => days.push(DayGroup {
                date: expense.date,
                expenses: vec![expense.clone()],
            }),
        }
    }

    // Stable, so equal dates keep first-seen order
    days.sort_by(|a, b| b.date.cmp(&a.date));
    days
}
