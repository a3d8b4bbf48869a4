// ⚠️ Domain errors
//
// Storage and IO plumbing uses anyhow (see store.rs); everything a user can
// trigger through the ledger, roster or validation layer is a SplitError.

use thiserror::Error;

/// Why an expense was rejected at the input boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseIssue {
    MissingDescription,
    InvalidAmount,
    UnknownPayer(String),
    EmptySplit,
    UnknownParticipant(String),
}

impl std::fmt::Display for ExpenseIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpenseIssue::MissingDescription => write!(f, "description is required"),
            ExpenseIssue::InvalidAmount => write!(f, "amount must be a positive number"),
            ExpenseIssue::UnknownPayer(name) if name.is_empty() => {
                write!(f, "select who paid")
            }
            ExpenseIssue::UnknownPayer(name) => write!(f, "'{}' is not in this month's people", name),
            ExpenseIssue::EmptySplit => write!(f, "select at least one person to split with"),
            ExpenseIssue::UnknownParticipant(name) => {
                write!(f, "'{}' is not in this month's people", name)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplitError {
    #[error("invalid expense: {0}")]
    InvalidExpense(ExpenseIssue),

    #[error("unknown person: {0}")]
    UnknownPerson(String),

    #[error("'{0}' is already in the list")]
    DuplicatePerson(String),

    #[error("name cannot be empty")]
    BlankName,

    #[error("expense not found: {0}")]
    ExpenseNotFound(String),

    #[error("invalid month token '{0}' (expected YYYY-MM)")]
    InvalidMonthToken(String),

    #[error("incorrect password for {0}")]
    LoginRejected(String),
}

pub type Result<T> = std::result::Result<T, SplitError>;
