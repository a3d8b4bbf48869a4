// 📚 Ledger Store - month-keyed ledgers over a key-value store
//
// Layout:
//   expense_months          -> ["2024-08", "2024-06", ...] (descending)
//   expense_data_<YYYY-MM>  -> {"people": [...], "expenses": [...]}
//   people / expenses       -> legacy unkeyed data, migrated once then deleted
//
// Unreadable payloads are never surfaced: they are logged and treated as
// absent, so a corrupt month degrades to inheritance/defaults.

use crate::history::MonthHistory;
use crate::model::{Expense, LedgerRecord, MonthLedger, MonthToken, StoredExpense};
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::BTreeSet;

pub const MONTHS_KEY: &str = "expense_months";
pub const LEGACY_PEOPLE_KEY: &str = "people";
pub const LEGACY_EXPENSES_KEY: &str = "expenses";

const MONTH_KEY_PREFIX: &str = "expense_data_";

pub fn month_key(token: MonthToken) -> String {
    format!("{}{}", MONTH_KEY_PREFIX, token)
}

/// Roster used when a month has nothing to inherit from
pub fn default_roster() -> Vec<String> {
    ["Shubham P.", "Shubham R.", "Pranjal", "Vishal", "Piyush J."]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// Empty ledger over existing data; nothing written
    Skipped,
}

pub struct LedgerStore<S: KeyValueStore> {
    store: S,
    default_roster: Vec<String>,
}

impl<S: KeyValueStore> LedgerStore<S> {
    /// Wrap a store without touching it
    pub fn new(store: S, default_roster: Vec<String>) -> Self {
        LedgerStore {
            store,
            default_roster,
        }
    }

    /// Wrap a store and run the one-time legacy migration into `today`'s month
    pub fn open(store: S, default_roster: Vec<String>, today: NaiveDate) -> Result<Self> {
        let mut ledgers = Self::new(store, default_roster);
        ledgers.migrate_legacy(MonthToken::from_date(today))?;
        Ok(ledgers)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn default_roster(&self) -> &[String] {
        &self.default_roster
    }

    // ========================================================================
    // MONTH INDEX
    // ========================================================================

    /// Known months, most recent first
    pub fn list_months(&self) -> Result<Vec<MonthToken>> {
        let raw = match self.store.get(MONTHS_KEY)? {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };

        let tokens: Vec<String> = match serde_json::from_str(&raw) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Unreadable month index, rebuilding from stored months: {}", e);
                return self.months_from_keys();
            }
        };

        let months: BTreeSet<MonthToken> = tokens
            .iter()
            .filter_map(|t| match MonthToken::parse(t) {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!("Dropping month index entry: {}", e);
                    None
                }
            })
            .collect();

        Ok(months.into_iter().rev().collect())
    }

    /// Every month with a stored payload, most recent first
    fn months_from_keys(&self) -> Result<Vec<MonthToken>> {
        let months: BTreeSet<MonthToken> = self
            .store
            .keys()?
            .iter()
            .filter_map(|key| key.strip_prefix(MONTH_KEY_PREFIX))
            .filter_map(|token| MonthToken::parse(token).ok())
            .collect();

        Ok(months.into_iter().rev().collect())
    }

    fn write_index(&mut self, months: &[MonthToken]) -> Result<()> {
        let json = serde_json::to_string(months).context("Failed to serialize month index")?;
        self.store.set(MONTHS_KEY, &json)
    }

    /// Month to show first: newest indexed month, else the month of `today`
    pub fn initial_month(&self, today: NaiveDate) -> Result<MonthToken> {
        Ok(self
            .list_months()?
            .first()
            .copied()
            .unwrap_or_else(|| MonthToken::from_date(today)))
    }

    // ========================================================================
    // LOAD / SAVE
    // ========================================================================

    /// Stored ledger for `token`, or None if absent or unreadable
    fn read_ledger(&self, token: MonthToken) -> Result<Option<MonthLedger>> {
        let raw = match self.store.get(&month_key(token))? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        match serde_json::from_str::<LedgerRecord>(&raw) {
            Ok(record) => Ok(Some(record.into_ledger(token))),
            Err(e) => {
                warn!("Treating unreadable ledger for {} as missing: {}", token, e);
                Ok(None)
            }
        }
    }

    /// Ledger for `token`. A month without a readable ledger starts with the
    /// people of the nearest earlier indexed month (or the default roster)
    /// and no expenses.
    pub fn load_month(&self, token: MonthToken) -> Result<MonthLedger> {
        if let Some(ledger) = self.read_ledger(token)? {
            return Ok(ledger);
        }

        Ok(MonthLedger::new(self.inherited_people(token)?))
    }

    fn inherited_people(&self, token: MonthToken) -> Result<Vec<String>> {
        let previous = self.list_months()?.into_iter().find(|m| *m < token);

        if let Some(previous) = previous {
            if let Some(ledger) = self.read_ledger(previous)? {
                if !ledger.people.is_empty() {
                    debug!("{} inherits {} people from {}", token, ledger.people.len(), previous);
                    return Ok(ledger.people);
                }
            }
        }

        Ok(self.default_roster.clone())
    }

    /// Persist `ledger` under `token` and make sure the month is indexed.
    ///
    /// An empty ledger (no people, no expenses) never overwrites an existing
    /// one.
    pub fn save_month(&mut self, token: MonthToken, ledger: &MonthLedger) -> Result<SaveOutcome> {
        let key = month_key(token);

        if ledger.is_empty() && self.store.contains(&key)? {
            debug!("Skipping save of empty ledger over existing {}", token);
            return Ok(SaveOutcome::Skipped);
        }

        let json = serde_json::to_string(ledger)
            .with_context(|| format!("Failed to serialize ledger for {}", token))?;
        self.store.set(&key, &json)?;

        let mut months = self.list_months()?;
        if !months.contains(&token) {
            months.push(token);
            months.sort_by(|a, b| b.cmp(a));
            self.write_index(&months)?;
            info!("Started ledger for {}", token);
        }

        Ok(SaveOutcome::Written)
    }

    // ========================================================================
    // LEGACY MIGRATION
    // ========================================================================

    /// Move unkeyed `people` / `expenses` entries into `month`.
    ///
    /// Legacy data is merged into an existing ledger for that month (people
    /// appended if missing, expenses appended unless their id is already
    /// there). Returns the month written, or None when there was nothing to
    /// migrate. Runs at most once: both legacy keys are deleted afterwards.
    pub fn migrate_legacy(&mut self, month: MonthToken) -> Result<Option<MonthToken>> {
        let people_raw = self.store.get(LEGACY_PEOPLE_KEY)?;
        let expenses_raw = self.store.get(LEGACY_EXPENSES_KEY)?;

        if people_raw.is_none() && expenses_raw.is_none() {
            return Ok(None);
        }

        let legacy_people: Vec<String> = people_raw
            .as_deref()
            .map(|raw| parse_legacy(raw, LEGACY_PEOPLE_KEY))
            .unwrap_or_default();
        let legacy_expenses: Vec<Expense> = expenses_raw
            .as_deref()
            .map(|raw| parse_legacy::<Vec<StoredExpense>>(raw, LEGACY_EXPENSES_KEY))
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.into_expense(month))
            .collect();

        let mut ledger = self
            .read_ledger(month)?
            .unwrap_or_else(|| MonthLedger::new(Vec::new()));

        for name in legacy_people {
            if !ledger.has_person(&name) {
                ledger.people.push(name);
            }
        }

        let mut migrated = 0;
        for expense in legacy_expenses {
            if ledger.expenses.iter().any(|e| e.id == expense.id) {
                continue;
            }

            // Payers and participants must be on the roster
            for name in std::iter::once(&expense.paid_by).chain(expense.split_with.iter()) {
                if !name.is_empty() && !ledger.has_person(name) {
                    ledger.people.push(name.clone());
                }
            }

            ledger.expenses.push(expense);
            migrated += 1;
        }

        let written = if ledger.is_empty() {
            None
        } else {
            self.save_month(month, &ledger)?;
            Some(month)
        };

        self.store.remove(LEGACY_PEOPLE_KEY)?;
        self.store.remove(LEGACY_EXPENSES_KEY)?;

        info!(
            "Migrated legacy data into {}: {} people, {} expenses",
            month,
            ledger.people.len(),
            migrated
        );

        Ok(written)
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    /// Per-month overview for every indexed month, most recent first.
    /// Months whose ledger is missing or unreadable are left out.
    pub fn history(&self) -> Result<Vec<MonthHistory>> {
        let mut history = Vec::new();

        for token in self.list_months()? {
            match self.read_ledger(token)? {
                Some(ledger) => history.push(MonthHistory::from_ledger(token, &ledger)),
                None => warn!("No readable ledger for indexed month {}", token),
            }
        }

        Ok(history)
    }
}

fn parse_legacy<T: serde::de::DeserializeOwned + Default>(raw: &str, key: &str) -> T {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Discarding unreadable legacy '{}' entry: {}", key, e);
        T::default()
    })
}

// ============================================================================
// TESTS
// ============================================================================
