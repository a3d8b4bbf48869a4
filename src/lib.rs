// Split Ledger - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod model;
pub mod store;      // Key-value backends (memory, SQLite)
pub mod ledger;     // Month-keyed ledgers, inheritance, legacy migration
pub mod balance;    // Balance Engine - paid/share/settlements
pub mod roster;     // Add / remove / rename people
pub mod expenses;   // Add / remove / edit / filter expenses
pub mod validation; // Expense drafts -> Expense
pub mod session;
pub mod history;
pub mod report;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{ExpenseIssue, SplitError};
pub use model::{Expense, MonthLedger, MonthToken, Settlement};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use ledger::{default_roster, month_key, LedgerStore, SaveOutcome};
pub use balance::{compute_summary, BalanceEngine, PersonStats, Summary, SETTLEMENT_TOLERANCE};
pub use roster::Removal;
pub use expenses::{ExpenseFilter, ExpensePatch};
pub use validation::{default_payer, ExpenseDraft};
pub use session::{Session, Theme};
pub use history::{DayGroup, MonthHistory};
pub use report::{export_csv, format_inr, settlement_report, share_url, Payee, PaymentRequest};
pub use config::AppConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
