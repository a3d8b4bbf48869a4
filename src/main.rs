// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use log::debug;
use std::env;
use std::fs::File;
use std::io;

use split_ledger::{
    default_payer, export_csv, format_inr, logging, settlement_report, share_url, AppConfig,
    BalanceEngine, ExpenseDraft, LedgerStore, MonthLedger, MonthToken, SaveOutcome, Session,
    SqliteStore, Theme,
};

const USAGE: &str = "\
split-ledger - shared expenses, split by month

USAGE:
    split-ledger [--month YYYY-MM] <command> [args]

COMMANDS:
    ui                                      Interactive view (default)
    months                                  List months with data
    show [YYYY-MM]                          People and expenses of the month
    summary [YYYY-MM]                       Balances and settlements
    add-person <name>
    remove-person <name>
    rename-person <old> <new>
    add-expense <description> <amount> <split,with,...> [paid-by] [YYYY-MM-DD]
    remove-expense <id>
    history                                 All months at a glance
    report [YYYY-MM]                        Shareable settlement message
    export [YYYY-MM] [file.csv]             Expenses as CSV (stdout by default)
    login <name> <password> | logout | whoami
    theme [dark|light]
";

struct Cli {
    config: AppConfig,
    ledgers: LedgerStore<SqliteStore>,
    today: NaiveDate,
    month: MonthToken,
}

fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.log_level);

    let mut args: Vec<String> = env::args().skip(1).collect();
    let month_arg = take_month_flag(&mut args)?;

    if matches!(args.first().map(String::as_str), Some("help" | "--help" | "-h")) {
        print!("{}", USAGE);
        return Ok(());
    }

    let today = Utc::now().date_naive();
    let store = SqliteStore::open(&config.storage_path)?;
    debug!("Using store at {}", config.storage_path.display());
    let ledgers = LedgerStore::open(store, config.default_roster.clone(), today)?;
    let month = match month_arg {
        Some(month) => month,
        None => ledgers.initial_month(today)?,
    };

    let mut cli = Cli {
        config,
        ledgers,
        today,
        month,
    };

    let command = args.first().cloned().unwrap_or_else(|| "ui".to_string());
    let mut rest = args.get(1..).unwrap_or(&[]);

    // Read-only commands also take the month positionally: `summary 2024-06`
    if matches!(command.as_str(), "show" | "summary" | "report" | "export") {
        if let Some(month) = rest.first().and_then(|m| MonthToken::parse(m).ok()) {
            cli.month = month;
            rest = &rest[1..];
        }
    }

    match command.as_str() {
        "ui" => run_ui_mode(cli),
        "months" => cli.months(),
        "show" => cli.show(),
        "summary" => cli.summary(),
        "add-person" => cli.add_person(rest),
        "remove-person" => cli.remove_person(rest),
        "rename-person" => cli.rename_person(rest),
        "add-expense" => cli.add_expense(rest),
        "remove-expense" => cli.remove_expense(rest),
        "history" => cli.history(),
        "report" => cli.report(),
        "export" => cli.export(rest),
        "login" => cli.login(rest),
        "logout" => cli.logout(),
        "whoami" => cli.whoami(),
        "theme" => cli.theme(rest),
        other => {
            eprint!("Unknown command '{}'\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }
}

/// Pull `--month YYYY-MM` out of the argument list
fn take_month_flag(args: &mut Vec<String>) -> Result<Option<MonthToken>> {
    let Some(pos) = args.iter().position(|a| a == "--month") else {
        return Ok(None);
    };

    if pos + 1 >= args.len() {
        bail!("--month needs a YYYY-MM value");
    }

    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(MonthToken::parse(&value)?))
}

fn arg<'a>(rest: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    rest.get(index)
        .map(String::as_str)
        .with_context(|| format!("missing <{}>\n\n{}", name, USAGE))
}

impl Cli {
    fn ledger(&self) -> Result<MonthLedger> {
        self.ledgers.load_month(self.month)
    }

    fn save(&mut self, ledger: &MonthLedger) -> Result<()> {
        if self.ledgers.save_month(self.month, ledger)? == SaveOutcome::Skipped {
            println!("(nothing to save for {})", self.month);
        }
        Ok(())
    }

    fn session(&self) -> Result<Session> {
        Session::load(self.ledgers.store())
    }

    fn engine(&self) -> BalanceEngine {
        BalanceEngine::with_tolerance(self.config.tolerance)
    }

    fn months(&self) -> Result<()> {
        let months = self.ledgers.list_months()?;
        if months.is_empty() {
            println!("No months yet - {} will be created on first change", self.month);
        }
        for month in months {
            let marker = if month == self.month { "*" } else { " " };
            println!("{} {}  {}", marker, month, month.label());
        }
        Ok(())
    }

    fn show(&self) -> Result<()> {
        let ledger = self.ledger()?;
        let session = self.session()?;

        println!("📅 {}", self.month.label());
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("\n👥 People");
        for person in &ledger.people {
            let me = if session.is_current(person) { " (Me)" } else { "" };
            println!("   {}{}", person, me);
        }

        println!("\n🧾 Expenses");
        if ledger.expenses.is_empty() {
            println!("   No expenses added yet.");
        }
        for expense in &ledger.expenses {
            println!(
                "   {}  {:<24} {:>14}  paid by {:<12} split: {}",
                expense.date,
                expense.description,
                format_inr(expense.amount),
                expense.paid_by,
                expense.split_with.join(", ")
            );
            println!("      id {}", expense.id);
        }
        Ok(())
    }

    fn summary(&self) -> Result<()> {
        let ledger = self.ledger()?;
        let summary = self.engine().compute_summary(&ledger.people, &ledger.expenses)?;

        println!("📊 {} - total {}", self.month.label(), format_inr(summary.total));
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        for stats in summary.ranked_balances() {
            let balance = stats.balance();
            let (sign, kind) = if balance >= 0.0 { ('+', "credit") } else { ('-', "debt") };
            println!(
                "   {:<14} paid {:>14}  share {:>14}  {}{} {}",
                stats.name,
                format_inr(stats.paid),
                format_inr(stats.share),
                sign,
                format_inr(balance.abs()),
                kind
            );
        }

        if summary.is_settled() {
            println!("\n✅ All settled up!");
        } else {
            println!("\n💸 How to settle");
            for s in &summary.settlements {
                println!("   {} → {}: {}", s.from, s.to, format_inr(s.amount));
            }
        }

        let session = self.session()?;
        if let Some(me) = session.current_user() {
            let to_pay = summary.settlements_from(me);
            let to_receive = summary.settlements_to(me);
            if !to_pay.is_empty() || !to_receive.is_empty() {
                println!("\n👤 {}", me);
            }
            for s in to_pay {
                println!("   you pay {} {}", s.to, format_inr(s.amount));
            }
            for s in to_receive {
                println!("   {} pays you {}", s.from, format_inr(s.amount));
            }
        }
        Ok(())
    }

    fn add_person(&mut self, rest: &[String]) -> Result<()> {
        let name = arg(rest, 0, "name")?;
        let mut ledger = self.ledger()?;

        if ledger.add_person(name) {
            self.save(&ledger)?;
            println!("✓ Added {} to {}", name.trim(), self.month);
        } else {
            println!("'{}' is blank or already in the list", name.trim());
        }
        Ok(())
    }

    fn remove_person(&mut self, rest: &[String]) -> Result<()> {
        let name = arg(rest, 0, "name")?;
        let mut ledger = self.ledger()?;

        let removal = ledger.remove_person(name)?;
        self.save(&ledger)?;

        let mut session = self.session()?;
        session.on_person_removed(name);
        session.save(self.ledgers.store_mut())?;

        println!("✓ Removed {}", name);
        if !removal.dropped_expenses.is_empty() {
            println!("  {} expense(s) deleted with them", removal.dropped_expenses.len());
        }
        Ok(())
    }

    fn rename_person(&mut self, rest: &[String]) -> Result<()> {
        let old = arg(rest, 0, "old")?;
        let new = arg(rest, 1, "new")?;
        let mut ledger = self.ledger()?;

        if ledger.rename_person(old, new)? {
            self.save(&ledger)?;

            let mut session = self.session()?;
            session.on_person_renamed(old, new.trim());
            session.save(self.ledgers.store_mut())?;

            println!("✓ Renamed {} to {}", old, new.trim());
        } else {
            println!("Nothing to rename");
        }
        Ok(())
    }

    fn add_expense(&mut self, rest: &[String]) -> Result<()> {
        let description = arg(rest, 0, "description")?;
        let amount: f64 = arg(rest, 1, "amount")?
            .parse()
            .context("amount must be a number")?;
        let split_with: Vec<String> = arg(rest, 2, "split,with")?
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let mut ledger = self.ledger()?;
        let session = self.session()?;

        let paid_by = match rest.get(3) {
            Some(name) => Some(name.clone()),
            None => default_payer(&ledger.people, &session).map(str::to_string),
        };
        let date = rest
            .get(4)
            .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
            .transpose()
            .context("date must be YYYY-MM-DD")?;

        let draft = ExpenseDraft {
            description: description.to_string(),
            amount: Some(amount),
            paid_by,
            split_with,
            date,
        };

        // Expenses added without a date land on today, or the 1st of a past month
        let default_day = if self.month.contains(self.today) {
            self.today
        } else {
            self.month.first_day()
        };

        let expense = ledger.add_expense(&draft, default_day)?.clone();
        self.save(&ledger)?;
        println!(
            "✓ Added {} ({}) paid by {}, split {} ways",
            expense.description,
            format_inr(expense.amount),
            expense.paid_by,
            expense.split_with.len()
        );
        println!("  id {}", expense.id);
        Ok(())
    }

    fn remove_expense(&mut self, rest: &[String]) -> Result<()> {
        let id = arg(rest, 0, "id")?;
        let mut ledger = self.ledger()?;

        if ledger.remove_expense(id) {
            self.save(&ledger)?;
            println!("✓ Removed expense {}", id);
            Ok(())
        } else {
            bail!("no expense with id {} in {}", id, self.month)
        }
    }

    fn history(&self) -> Result<()> {
        let history = self.ledgers.history()?;
        if history.is_empty() {
            println!("No historical data found.");
        }

        for month in history {
            println!("\n📅 {}  ({})", month.label(), month.summary_line());
            for day in &month.days {
                println!("   {}", day.date.format("%A, %B %-d, %Y"));
                for expense in &day.expenses {
                    println!(
                        "      {:<24} {:>14}  paid by {}",
                        expense.description,
                        format_inr(expense.amount),
                        expense.paid_by
                    );
                }
            }
        }
        Ok(())
    }

    fn report(&self) -> Result<()> {
        let ledger = self.ledger()?;
        let summary = self.engine().compute_summary(&ledger.people, &ledger.expenses)?;

        let message = settlement_report(&ledger.expenses, &summary, &self.config.payee);
        println!("{}", message);
        println!("Share: {}", share_url(&message));
        Ok(())
    }

    fn export(&self, rest: &[String]) -> Result<()> {
        let ledger = self.ledger()?;

        match rest.first() {
            Some(path) => {
                let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
                export_csv(&ledger, file)?;
                eprintln!("✓ Wrote {} expenses to {}", ledger.expenses.len(), path);
            }
            None => export_csv(&ledger, io::stdout().lock())?,
        }
        Ok(())
    }

    fn login(&mut self, rest: &[String]) -> Result<()> {
        let name = arg(rest, 0, "name")?;
        let password = arg(rest, 1, "password")?;
        let ledger = self.ledger()?;

        let mut session = Session::default();
        if let Err(e) = session.login(&ledger.people, name, password) {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
        session.save(self.ledgers.store_mut())?;
        println!("✓ Logged in as {}", name);
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        let mut session = self.session()?;
        session.logout();
        session.save(self.ledgers.store_mut())?;
        println!("✓ Logged out");
        Ok(())
    }

    fn whoami(&self) -> Result<()> {
        match self.session()?.current_user() {
            Some(name) => println!("{}", name),
            None => println!("Not logged in"),
        }
        Ok(())
    }

    fn theme(&mut self, rest: &[String]) -> Result<()> {
        let current = Theme::load(self.ledgers.store())?;
        let theme = match rest.first().map(String::as_str) {
            None => {
                println!("{}", current.as_str());
                return Ok(());
            }
            Some("dark") => Theme::Dark,
            Some("light") => Theme::Light,
            Some("toggle") => current.toggled(),
            Some(other) => bail!("unknown theme '{}' (dark, light or toggle)", other),
        };
        theme.save(self.ledgers.store_mut())?;
        println!("✓ Theme set to {}", theme.as_str());
        Ok(())
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(cli: Cli) -> Result<()> {
    let session = cli.session()?;
    let mut app = ui::App::new(
        cli.ledgers,
        cli.month,
        session,
        BalanceEngine::with_tolerance(cli.config.tolerance),
    )?;
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_cli: Cli) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin split-server --features server");
    std::process::exit(1);
}
