// 👥 Roster mutation - add / remove / rename people in a month
//
// Names are the only identity, so every change cascades through paidBy and
// splitWith of the month's expenses.
//
// Rules:
// - removing a person drops every expense they paid for, and any expense
//   left with nobody to split between
// - renaming onto another existing person's name is rejected

use crate::error::{Result, SplitError};
use crate::model::MonthLedger;
use log::debug;
use serde::Serialize;

/// What a removal did to the expense list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Removal {
    /// Ids of expenses deleted by the cascade
    pub dropped_expenses: Vec<String>,
    /// Expenses that only lost this person from their split
    pub reshared_expenses: usize,
}

impl MonthLedger {
    /// Append a person. Returns false for a blank name or one already present
    /// (exact, case-sensitive match after trimming).
    pub fn add_person(&mut self, name: &str) -> bool {
        self.try_add_person(name).is_ok()
    }

    /// Like `add_person`, but says why nothing was added
    pub fn try_add_person(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SplitError::BlankName);
        }
        if self.has_person(name) {
            return Err(SplitError::DuplicatePerson(name.to_string()));
        }

        self.people.push(name.to_string());
        Ok(())
    }

    pub fn remove_person(&mut self, name: &str) -> Result<Removal> {
        if !self.has_person(name) {
            return Err(SplitError::UnknownPerson(name.to_string()));
        }

        self.people.retain(|p| p != name);

        let mut removal = Removal::default();
        self.expenses.retain_mut(|expense| {
            let before = expense.split_with.len();
            expense.split_with.retain(|p| p != name);

            if expense.paid_by == name || expense.split_with.is_empty() {
                removal.dropped_expenses.push(expense.id.clone());
                return false;
            }

            if expense.split_with.len() != before {
                removal.reshared_expenses += 1;
            }
            true
        });

        debug!(
            "Removed {}: {} expenses dropped, {} re-shared",
            name,
            removal.dropped_expenses.len(),
            removal.reshared_expenses
        );

        Ok(removal)
    }

    /// Rename `old` to the trimmed `new` everywhere. Returns false (and
    /// changes nothing) when the trimmed name is blank or unchanged.
    pub fn rename_person(&mut self, old: &str, new: &str) -> Result<bool> {
        let new = new.trim();
        if new.is_empty() || new == old {
            return Ok(false);
        }
        if !self.has_person(old) {
            return Err(SplitError::UnknownPerson(old.to_string()));
        }
        if self.has_person(new) {
            return Err(SplitError::DuplicatePerson(new.to_string()));
        }

        for person in self.people.iter_mut().filter(|p| p.as_str() == old) {
            *person = new.to_string();
        }

        for expense in &mut self.expenses {
            if expense.paid_by == old {
                expense.paid_by = new.to_string();
            }
            for participant in expense.split_with.iter_mut().filter(|p| p.as_str() == old) {
                *participant = new.to_string();
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Expense;
    use chrono::NaiveDate;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn expense(id: &str, amount: f64, paid_by: &str, split_with: &[&str]) -> Expense {
        Expense {
            id: id.to_string(),
            description: id.to_string(),
            amount,
            paid_by: paid_by.to_string(),
            split_with: names(split_with),
            date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
        }
    }

    fn ids(ledger: &MonthLedger) -> Vec<&str> {
        ledger.expenses.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_add_person() {
        let mut ledger = MonthLedger::new(names(&["A"]));

        assert!(ledger.add_person("  Bea  "));
        assert!(!ledger.add_person("Bea"));
        assert!(!ledger.add_person("   "));
        assert!(ledger.add_person("bea"));

        assert_eq!(ledger.people, names(&["A", "Bea", "bea"]));
    }

    #[test]
    fn test_try_add_person_reports_reason() {
        let mut ledger = MonthLedger::new(names(&["A"]));

        assert_eq!(ledger.try_add_person("  "), Err(SplitError::BlankName));
        assert_eq!(
            ledger.try_add_person(" A "),
            Err(SplitError::DuplicatePerson("A".to_string()))
        );
        assert_eq!(ledger.try_add_person("B"), Ok(()));
        assert_eq!(ledger.people, names(&["A", "B"]));
    }

    #[test]
    fn test_remove_payer_of_solo_expense_deletes_it() {
        let mut ledger = MonthLedger::new(names(&["A", "B"]));
        ledger.expenses.push(expense("solo", 40.0, "B", &["B"]));
        ledger.expenses.push(expense("keep", 10.0, "A", &["A"]));

        let removal = ledger.remove_person("B").unwrap();

        assert_eq!(removal.dropped_expenses, vec!["solo".to_string()]);
        assert_eq!(ids(&ledger), vec!["keep"]);
        assert_eq!(ledger.people, names(&["A"]));
    }

    #[test]
    fn test_remove_payer_drops_shared_expense() {
        let mut ledger = MonthLedger::new(names(&["A", "B", "C"]));
        ledger.expenses.push(expense("paid-by-b", 90.0, "B", &["A", "B", "C"]));

        let removal = ledger.remove_person("B").unwrap();
        assert_eq!(removal.dropped_expenses, vec!["paid-by-b".to_string()]);
        assert!(ledger.expenses.is_empty());
    }

    #[test]
    fn test_remove_participant_reshares() {
        let mut ledger = MonthLedger::new(names(&["A", "B", "C"]));
        ledger.expenses.push(expense("shared", 90.0, "A", &["A", "B", "C"]));
        ledger.expenses.push(expense("only-b", 15.0, "A", &["B"]));
        ledger.expenses.push(expense("untouched", 5.0, "C", &["A"]));

        let removal = ledger.remove_person("B").unwrap();

        assert_eq!(removal.dropped_expenses, vec!["only-b".to_string()]);
        assert_eq!(removal.reshared_expenses, 1);
        assert_eq!(ids(&ledger), vec!["shared", "untouched"]);
        assert_eq!(ledger.expenses[0].split_with, names(&["A", "C"]));
        assert!(ledger
            .expenses
            .iter()
            .all(|e| !e.split_with.is_empty() && e.paid_by != "B"));
    }

    #[test]
    fn test_remove_unknown_person() {
        let mut ledger = MonthLedger::new(names(&["A"]));
        assert_eq!(
            ledger.remove_person("Z"),
            Err(SplitError::UnknownPerson("Z".to_string()))
        );
    }

    #[test]
    fn test_rename_updates_every_reference() {
        let mut ledger = MonthLedger::new(names(&["Ann", "Sam", "Tom"]));
        ledger.expenses.push(expense("e1", 120.0, "Sam", &["Ann", "Sam"]));
        ledger.expenses.push(expense("e2", 30.5, "Ann", &["Sam", "Tom"]));
        ledger.expenses.push(expense("e3", 7.0, "Tom", &["Tom"]));
        let before = ledger.clone();

        assert_eq!(ledger.rename_person("Sam", " Samir "), Ok(true));

        assert_eq!(ledger.people, names(&["Ann", "Samir", "Tom"]));
        assert_eq!(ledger.expenses[0].paid_by, "Samir");
        assert_eq!(ledger.expenses[0].split_with, names(&["Ann", "Samir"]));
        assert_eq!(ledger.expenses[1].split_with, names(&["Samir", "Tom"]));
        assert_eq!(ledger.expenses[2], before.expenses[2]);

        for (after, before) in ledger.expenses.iter().zip(&before.expenses) {
            assert_eq!(after.id, before.id);
            assert_eq!(after.amount, before.amount);
            assert_eq!(after.date, before.date);
        }
        assert!(!ledger.expenses.iter().any(|e| e.involves("Sam")));
    }

    #[test]
    fn test_rename_noops() {
        let mut ledger = MonthLedger::new(names(&["Sam"]));
        assert_eq!(ledger.rename_person("Sam", "   "), Ok(false));
        assert_eq!(ledger.rename_person("Sam", " Sam "), Ok(false));
        assert_eq!(ledger.people, names(&["Sam"]));
    }

    #[test]
    fn test_rename_collision_rejected() {
        let mut ledger = MonthLedger::new(names(&["Sam", "Tom"]));
        ledger.expenses.push(expense("e1", 10.0, "Sam", &["Tom"]));
        let before = ledger.clone();

        assert_eq!(
            ledger.rename_person("Sam", "Tom"),
            Err(SplitError::DuplicatePerson("Tom".to_string()))
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_rename_unknown_person() {
        let mut ledger = MonthLedger::new(names(&["Sam"]));
        assert_eq!(
            ledger.rename_person("Ghost", "Casper"),
            Err(SplitError::UnknownPerson("Ghost".to_string()))
        );
    }
}
