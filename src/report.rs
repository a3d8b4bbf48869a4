// 📤 Reports & hand-offs - text the outside world consumes
//
// - format_inr: ₹ amounts with Indian digit grouping
// - PaymentRequest: upi:// deep link for one settlement
// - settlement_report / share_url: the message shared with the group
// - export_csv: one row per expense

use crate::balance::Summary;
use crate::model::{Expense, MonthLedger};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Amount as rupees, two decimals, lakh/crore grouping: `₹1,23,456.70`
pub fn format_inr(amount: f64) -> String {
    let amount = if amount.is_finite() { amount } else { 0.0 };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}₹{}.{}", sign, group_indian(whole), fraction)
}

/// "1234567" -> "12,34,567"
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, last_three) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), last_three)
}

// ============================================================================
// PAYMENT LINKS
// ============================================================================

/// Who receives payments made through generated links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payee {
    /// Payment address, e.g. a UPI VPA
    pub id: String,
    pub name: String,
    pub currency: String,
}

impl Default for Payee {
    fn default() -> Self {
        Payee {
            id: "shubhamredekar9@okhdfcbank".to_string(),
            name: "Shubham Redekar".to_string(),
            currency: "INR".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub payee_id: String,
    pub payee_name: String,
    pub amount: f64,
    pub currency: String,
}

impl PaymentRequest {
    pub fn new(payee: &Payee, amount: f64) -> Self {
        PaymentRequest {
            payee_id: payee.id.clone(),
            payee_name: payee.name.clone(),
            amount,
            currency: payee.currency.clone(),
        }
    }

    /// `upi://pay?pa=..&pn=..&am=..&cu=..` with the amount at exactly two decimals
    pub fn to_uri(&self) -> String {
        format!(
            "upi://pay?pa={}&pn={}&am={:.2}&cu={}",
            self.payee_id,
            urlencoding::encode(&self.payee_name),
            self.amount,
            self.currency
        )
    }
}

// ============================================================================
// SHARED REPORT
// ============================================================================

pub fn settlement_report(expenses: &[Expense], summary: &Summary, payee: &Payee) -> String {
    let mut message = String::from("*Expense Total Breakdown*\n\n");

    for expense in expenses {
        message.push_str(&format!(
            "*{}*: {} (split between {} people)\n",
            expense.description,
            format_inr(expense.amount),
            expense.split_with.len()
        ));
        if let Some(per_head) = expense.per_head() {
            for person in &expense.split_with {
                message.push_str(&format!(" › {}: {}\n", person, format_inr(per_head)));
            }
        }
        message.push('\n');
    }

    message.push_str("*--- Total per Person ---*\n");
    for stats in &summary.per_person {
        message.push_str(&format!("{}: {}\n", stats.name, format_inr(stats.share)));
    }

    if summary.settlements.is_empty() {
        message.push_str("\nAll settled up! 🎉\n");
    } else {
        message.push_str("\n*--- How to Settle ---*\n");
        for settlement in &summary.settlements {
            let link = PaymentRequest::new(payee, settlement.amount).to_uri();
            message.push_str(&format!(
                "✅ *{}* pays *{}*: {}\n",
                settlement.from,
                settlement.to,
                format_inr(settlement.amount)
            ));
            message.push_str(&format!("🔗 Pay now: {}\n\n", link));
        }
    }

    message
}

/// Link that opens `message` in WhatsApp's share dialog
pub fn share_url(message: &str) -> String {
    format!(
        "https://api.whatsapp.com/send?text={}",
        urlencoding::encode(message)
    )
}

// ============================================================================
// CSV EXPORT
// ============================================================================

#[derive(Debug, Serialize)]
struct ExpenseRow<'a> {
    id: &'a str,
    date: String,
    description: &'a str,
    amount: f64,
    paid_by: &'a str,
    split_with: String,
}

pub fn export_csv<W: Write>(ledger: &MonthLedger, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for expense in &ledger.expenses {
        wtr.serialize(ExpenseRow {
            id: &expense.id,
            date: expense.date.format("%Y-%m-%d").to_string(),
            description: &expense.description,
            amount: expense.amount,
            paid_by: &expense.paid_by,
            split_with: expense.split_with.join(";"),
        })
        .with_context(|| format!("Failed to write expense {}", expense.id))?;
    }

    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}
