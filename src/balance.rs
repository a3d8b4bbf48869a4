// ⚖️ Balance Engine - who paid, who owes, who pays whom
//
// Pure transform from (people, expenses) to a Summary:
//   balance = paid - share
//   positive = owed money (creditor), negative = owes money (debtor)
//
// Settlements are produced greedily: the largest debtor pays the largest
// creditor until one side is cleared, then the next in line steps up. This
// yields at most |debtors| + |creditors| - 1 transfers.

use crate::error::{ExpenseIssue, Result, SplitError};
use crate::model::{Expense, Settlement};
use serde::Serialize;
use std::collections::HashMap;

/// Balances within this distance of zero count as settled (one paisa)
pub const SETTLEMENT_TOLERANCE: f64 = 0.01;

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonStats {
    pub name: String,
    pub paid: f64,
    pub share: f64,
}

impl PersonStats {
    fn new(name: &str) -> Self {
        PersonStats {
            name: name.to_string(),
            paid: 0.0,
            share: 0.0,
        }
    }

    pub fn balance(&self) -> f64 {
        self.paid - self.share
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// One entry per person, in roster order
    pub per_person: Vec<PersonStats>,
    pub settlements: Vec<Settlement>,
    pub total: f64,
}

impl Summary {
    pub fn stats_for(&self, name: &str) -> Option<&PersonStats> {
        self.per_person.iter().find(|s| s.name == name)
    }

    pub fn balance_of(&self, name: &str) -> Option<f64> {
        self.stats_for(name).map(PersonStats::balance)
    }

    /// Largest credit first, largest debt last; roster order on ties
    pub fn ranked_balances(&self) -> Vec<&PersonStats> {
        let mut ranked: Vec<&PersonStats> = self.per_person.iter().collect();
        ranked.sort_by(|a, b| b.balance().total_cmp(&a.balance()));
        ranked
    }

    pub fn is_settled(&self) -> bool {
        self.settlements.is_empty()
    }

    pub fn settlements_from(&self, name: &str) -> Vec<&Settlement> {
        self.settlements.iter().filter(|s| s.from == name).collect()
    }

    pub fn settlements_to(&self, name: &str) -> Vec<&Settlement> {
        self.settlements.iter().filter(|s| s.to == name).collect()
    }
}

// ============================================================================
// BALANCE ENGINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct BalanceEngine {
    pub tolerance: f64,
}

impl BalanceEngine {
    pub fn new() -> Self {
        BalanceEngine {
            tolerance: SETTLEMENT_TOLERANCE,
        }
    }

    /// Falls back to `SETTLEMENT_TOLERANCE` unless `tolerance` is finite and
    /// positive
    pub fn with_tolerance(tolerance: f64) -> Self {
        let tolerance = if tolerance.is_finite() && tolerance > 0.0 {
            tolerance
        } else {
            SETTLEMENT_TOLERANCE
        };
        BalanceEngine { tolerance }
    }

    /// Paid/share per person, suggested settlements and the month total.
    ///
    /// Expenses that mention people no longer on the roster still count
    /// towards `total`; the unknown payer or participant is simply skipped.
    /// An expense with no participants or a non-finite amount is rejected
    /// rather than divided through.
    pub fn compute_summary(&self, people: &[String], expenses: &[Expense]) -> Result<Summary> {
        let mut per_person: Vec<PersonStats> = Vec::with_capacity(people.len());
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(people.len());

        for name in people {
            if !index.contains_key(name.as_str()) {
                index.insert(name.as_str(), per_person.len());
                per_person.push(PersonStats::new(name));
            }
        }

        let mut total = 0.0;

        for expense in expenses {
            if !expense.amount.is_finite() {
                return Err(SplitError::InvalidExpense(ExpenseIssue::InvalidAmount));
            }
            let per_head = expense
                .per_head()
                .ok_or(SplitError::InvalidExpense(ExpenseIssue::EmptySplit))?;

            if let Some(&i) = index.get(expense.paid_by.as_str()) {
                per_person[i].paid += expense.amount;
            }

            for participant in &expense.split_with {
                if let Some(&i) = index.get(participant.as_str()) {
                    per_person[i].share += per_head;
                }
            }

            total += expense.amount;
        }

        let settlements = self.settle(&per_person);

        Ok(Summary {
            per_person,
            settlements,
            total,
        })
    }

    fn settle(&self, stats: &[PersonStats]) -> Vec<Settlement> {
        // (name, outstanding magnitude)
        let mut debtors: Vec<(&str, f64)> = stats
            .iter()
            .filter(|s| s.balance() < -self.tolerance)
            .map(|s| (s.name.as_str(), -s.balance()))
            .collect();
        let mut creditors: Vec<(&str, f64)> = stats
            .iter()
            .filter(|s| s.balance() > self.tolerance)
            .map(|s| (s.name.as_str(), s.balance()))
            .collect();

        // Stable sorts: roster order breaks ties
        debtors.sort_by(|a, b| b.1.total_cmp(&a.1));
        creditors.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut settlements = Vec::new();
        let (mut d, mut c) = (0, 0);

        while d < debtors.len() && c < creditors.len() {
            let amount = debtors[d].1.min(creditors[c].1);
            if amount <= 0.0 {
                break;
            }

            settlements.push(Settlement {
                from: debtors[d].0.to_string(),
                to: creditors[c].0.to_string(),
                amount,
            });

            debtors[d].1 -= amount;
            creditors[c].1 -= amount;

            if debtors[d].1 <= self.tolerance {
                d += 1;
            }
            if creditors[c].1 <= self.tolerance {
                c += 1;
            }
        }

        settlements
    }
}

impl Default for BalanceEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// `BalanceEngine::new().compute_summary(..)`
pub fn compute_summary(people: &[String], expenses: &[Expense]) -> Result<Summary> {
    BalanceEngine::new().compute_summary(people, expenses)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn expense(amount: f64, paid_by: &str, split_with: &[&str]) -> Expense {
        Expense {
            id: uuid::Uuid::new_v4().to_string(),
            description: "test".to_string(),
            amount,
            paid_by: paid_by.to_string(),
            split_with: names(split_with),
            date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
        }
    }

    fn settlement(from: &str, to: &str, amount: f64) -> Settlement {
        Settlement {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        }
    }

    #[test]
    fn test_empty_inputs() {
        let summary = compute_summary(&[], &[]).unwrap();
        assert!(summary.per_person.is_empty());
        assert!(summary.settlements.is_empty());
        assert_eq!(summary.total, 0.0);

        let summary = compute_summary(&names(&["A", "B"]), &[]).unwrap();
        assert_eq!(summary.per_person.len(), 2);
        assert!(summary.per_person.iter().all(|s| s.paid == 0.0 && s.share == 0.0));
        assert!(summary.is_settled());
    }

    #[test]
    fn test_three_way_split() {
        let people = names(&["A", "B", "C"]);
        let expenses = vec![expense(300.0, "A", &["A", "B", "C"])];

        let summary = compute_summary(&people, &expenses).unwrap();

        assert_eq!(summary.stats_for("A").unwrap().paid, 300.0);
        for name in ["A", "B", "C"] {
            assert_eq!(summary.stats_for(name).unwrap().share, 100.0);
        }
        assert_eq!(summary.balance_of("A"), Some(200.0));
        assert_eq!(summary.balance_of("B"), Some(-100.0));
        assert_eq!(summary.balance_of("C"), Some(-100.0));
        assert_eq!(
            summary.settlements,
            vec![settlement("B", "A", 100.0), settlement("C", "A", 100.0)]
        );
        assert_eq!(summary.total, 300.0);
    }

    #[test]
    fn test_largest_debtor_pays_largest_creditor_first() {
        let people = names(&["A", "B", "C", "D"]);
        let expenses = vec![
            expense(100.0, "A", &["C", "D"]),
            expense(60.0, "B", &["C"]),
        ];
        // A +100, B +60, C -110, D -50
        let summary = compute_summary(&people, &expenses).unwrap();

        assert_eq!(
            summary.settlements,
            vec![
                settlement("C", "A", 100.0),
                settlement("C", "B", 10.0),
                settlement("D", "B", 50.0),
            ]
        );
    }

    #[test]
    fn test_equal_balances_keep_roster_order() {
        let expenses = vec![expense(100.0, "A", &["B", "C"])];

        let summary = compute_summary(&names(&["A", "C", "B"]), &expenses).unwrap();
        assert_eq!(summary.settlements[0].from, "C");
        assert_eq!(summary.settlements[1].from, "B");

        let summary = compute_summary(&names(&["A", "B", "C"]), &expenses).unwrap();
        assert_eq!(summary.settlements[0].from, "B");
        assert_eq!(summary.settlements[1].from, "C");
    }

    #[test]
    fn test_unknown_people_are_ignored_but_counted_in_total() {
        let people = names(&["A", "B"]);
        let expenses = vec![
            expense(90.0, "Gone", &["A", "B", "Gone"]),
            expense(10.0, "A", &["B"]),
        ];

        let summary = compute_summary(&people, &expenses).unwrap();

        assert_eq!(summary.total, 100.0);
        assert_eq!(summary.stats_for("A").unwrap().paid, 10.0);
        assert_eq!(summary.stats_for("A").unwrap().share, 30.0);
        assert_eq!(summary.stats_for("B").unwrap().share, 40.0);
        assert!(summary.stats_for("Gone").is_none());
    }

    #[test]
    fn test_small_balances_are_settled() {
        let people = names(&["A", "B"]);
        let expenses = vec![expense(0.01, "A", &["B"])];

        let summary = compute_summary(&people, &expenses).unwrap();
        assert!(summary.is_settled());
        assert_eq!(summary.total, 0.01);
    }

    #[test]
    fn test_empty_split_is_rejected() {
        let people = names(&["A"]);
        let expenses = vec![expense(50.0, "A", &[])];

        assert_eq!(
            compute_summary(&people, &expenses),
            Err(SplitError::InvalidExpense(ExpenseIssue::EmptySplit))
        );
    }

    #[test]
    fn test_non_finite_amount_is_rejected() {
        let people = names(&["A"]);
        let expenses = vec![expense(f64::NAN, "A", &["A"])];

        assert_eq!(
            compute_summary(&people, &expenses),
            Err(SplitError::InvalidExpense(ExpenseIssue::InvalidAmount))
        );
    }

    #[test]
    fn test_duplicate_roster_names_counted_once() {
        let people = names(&["A", "B", "A"]);
        let expenses = vec![expense(20.0, "A", &["A", "B"])];

        let summary = compute_summary(&people, &expenses).unwrap();
        assert_eq!(summary.per_person.len(), 2);
        assert_eq!(summary.stats_for("A").unwrap().paid, 20.0);
    }

    #[test]
    fn test_compute_summary_is_idempotent() {
        let people = names(&["A", "B", "C"]);
        let expenses = vec![
            expense(120.0, "A", &["A", "B", "C"]),
            expense(45.5, "B", &["A", "C"]),
            expense(10.0, "C", &["B"]),
        ];

        let first = compute_summary(&people, &expenses).unwrap();
        let second = compute_summary(&people, &expenses).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ranked_balances() {
        let people = names(&["A", "B", "C"]);
        let expenses = vec![expense(90.0, "B", &["A", "B", "C"])];

        let summary = compute_summary(&people, &expenses).unwrap();
        let ranked: Vec<&str> = summary
            .ranked_balances()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(ranked, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_custom_tolerance() {
        let people = names(&["A", "B"]);
        let expenses = vec![expense(1.0, "A", &["B"])];

        let strict = BalanceEngine::new().compute_summary(&people, &expenses).unwrap();
        assert_eq!(strict.settlements.len(), 1);

        let loose = BalanceEngine::with_tolerance(5.0)
            .compute_summary(&people, &expenses)
            .unwrap();
        assert!(loose.is_settled());
    }

    #[test]
    fn test_unusable_tolerance_falls_back_to_default() {
        for tolerance in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert_eq!(BalanceEngine::with_tolerance(tolerance).tolerance, SETTLEMENT_TOLERANCE);
        }
    }

    #[test]
    fn test_zero_tolerance_engine_terminates() {
        let people = names(&["A", "B", "C"]);
        let expenses = vec![
            expense(10.0, "A", &["A", "B"]),
            expense(30.0, "C", &["A", "B", "C"]),
        ];
        // A +(10-5-10) = -5, B -15, C +20

        let engine = BalanceEngine { tolerance: 0.0 };
        let summary = engine.compute_summary(&people, &expenses).unwrap();

        assert_eq!(
            summary.settlements,
            vec![settlement("B", "C", 15.0), settlement("A", "C", 5.0)]
        );
    }

    #[test]
    fn test_settlements_by_person() {
        let people = names(&["A", "B", "C"]);
        let expenses = vec![expense(300.0, "A", &["A", "B", "C"])];
        let summary = compute_summary(&people, &expenses).unwrap();

        assert_eq!(summary.settlements_from("B"), vec![&settlement("B", "A", 100.0)]);
        assert!(summary.settlements_from("A").is_empty());
        assert_eq!(summary.settlements_to("A").len(), 2);
        assert!(summary.settlements_to("B").is_empty());
    }

    /// Deterministic pseudo-random months: settlements must clear every
    /// balance and never exceed debtors + creditors - 1 transfers.
    #[test]
    fn test_settlements_clear_all_balances() {
        let roster = names(&["A", "B", "C", "D", "E", "F"]);
        let mut seed: u64 = 0x5eed;
        let mut next = move |bound: u64| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) % bound
        };

        for _ in 0..200 {
            let mut expenses = Vec::new();
            for _ in 0..(1 + next(12)) {
                let amount = (1 + next(500_00)) as f64 / 100.0;
                let payer = &roster[next(roster.len() as u64) as usize];
                let split: Vec<&str> = roster
                    .iter()
                    .filter(|_| next(2) == 0)
                    .map(|s| s.as_str())
                    .collect();
                let split = if split.is_empty() { vec![payer.as_str()] } else { split };
                expenses.push(expense(amount, payer, &split));
            }

            let summary = compute_summary(&roster, &expenses).unwrap();
            let bound = SETTLEMENT_TOLERANCE * roster.len() as f64;

            let positive: f64 = summary
                .per_person
                .iter()
                .map(|s| s.balance())
                .filter(|b| *b > SETTLEMENT_TOLERANCE)
                .sum();
            let negative = summary
                .per_person
                .iter()
                .filter(|s| s.balance() < -SETTLEMENT_TOLERANCE)
                .count();
            let positive_count = summary
                .per_person
                .iter()
                .filter(|s| s.balance() > SETTLEMENT_TOLERANCE)
                .count();
            let settled: f64 = summary.settlements.iter().map(|s| s.amount).sum();

            assert!((settled - positive).abs() <= bound, "{} vs {}", settled, positive);
            assert!(summary.settlements.len() <= (negative + positive_count).saturating_sub(1));

            let mut adjusted: HashMap<&str, f64> = summary
                .per_person
                .iter()
                .map(|s| (s.name.as_str(), s.balance()))
                .collect();
            for s in &summary.settlements {
                *adjusted.get_mut(s.from.as_str()).unwrap() += s.amount;
                *adjusted.get_mut(s.to.as_str()).unwrap() -= s.amount;
            }
            for (name, balance) in adjusted {
                assert!(balance.abs() <= bound, "{} left with {}", name, balance);
            }

            let total: f64 = expenses.iter().map(|e| e.amount).sum();
            assert!((summary.total - total).abs() < 1e-9);
        }
    }
}
