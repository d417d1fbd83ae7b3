//! Command dispatcher
//!
//! Turns one inbound chat message into exactly one reply plus any record
//! changes. Literal commands (`report`, `reset`, `undo`, `help`) are matched
//! first; everything else goes through the intent classifier.
//!
//! Handling is split in two steps so each can be driven on its own:
//! 1. [`Dispatcher::ensure_user`] creates unknown users and welcomes them
//! 2. [`Dispatcher::dispatch`] acts on the text

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::ai::{Intent, IntentClassifier};
use crate::budget::{self, BudgetAlert};
use crate::chart::ChartRenderer;
use crate::config::BudgetConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Category, NewSubscription, NewTransaction, Transaction, User};
use crate::notify::Notifier;
use crate::report::{self, MonthlyReport, NO_REPORT_DATA};

pub const WELCOME: &str = "Hello! Type 'Help' for commands.";
pub const RESET_DONE: &str = "All your data has been reset.";
pub const NOTHING_TO_UNDO: &str = "No transactions found to undo.";
pub const NOT_UNDERSTOOD: &str = "Sorry, I didn't catch that. Try: 'Taxi 10$'.";
pub const HELP_TEXT: &str = "Commands:\n\
- 'KFC 10': log an expense\n\
- 'Set limit 500': set a weekly spending limit\n\
- 'Add sub Netflix 15': add a monthly subscription\n\
- 'Report': this month's spending by category\n\
- 'Undo': remove the last transaction\n\
- 'Reset': delete all your data";

/// Literal commands, matched case-insensitively against the whole message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Report,
    Reset,
    Undo,
    Help,
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "report" => Some(Self::Report),
            "reset" => Some(Self::Reset),
            "undo" => Some(Self::Undo),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// What handling a message did
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    ReportSent(MonthlyReport),
    NoReportData,
    Reset {
        transactions: usize,
        subscriptions: usize,
    },
    Undone {
        transaction: Transaction,
        alert: Option<BudgetAlert>,
    },
    NothingToUndo,
    Help,
    /// The classifier produced nothing usable (or failed)
    Unclassified,
    /// The classifier's amount could not be used
    InvalidAmount(String),
    LimitSet {
        limit: f64,
        alert: Option<BudgetAlert>,
    },
    SubscriptionAdded {
        subscription_id: i64,
        transaction_id: i64,
    },
    ExpenseLogged {
        transaction_id: i64,
        alert: Option<BudgetAlert>,
    },
}

impl DispatchOutcome {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::ReportSent(_) => "report",
            Self::NoReportData => "report_empty",
            Self::Reset { .. } => "reset",
            Self::Undone { .. } => "undo",
            Self::NothingToUndo => "undo_empty",
            Self::Help => "help",
            Self::Unclassified => "unclassified",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::LimitSet { .. } => "set_limit",
            Self::SubscriptionAdded { .. } => "add_sub",
            Self::ExpenseLogged { .. } => "expense",
        }
    }

    /// The budget alert sent while handling, if any
    pub fn alert(&self) -> Option<&BudgetAlert> {
        match self {
            Self::Undone { alert, .. }
            | Self::LimitSet { alert, .. }
            | Self::ExpenseLogged { alert, .. } => alert.as_ref(),
            _ => None,
        }
    }
}

/// Routes messages to the record store and the external collaborators
#[derive(Clone)]
pub struct Dispatcher {
    db: Database,
    classifier: Arc<dyn IntentClassifier>,
    notifier: Arc<dyn Notifier>,
    charts: Arc<dyn ChartRenderer>,
    config: BudgetConfig,
}

impl Dispatcher {
    pub fn new(
        db: Database,
        classifier: Arc<dyn IntentClassifier>,
        notifier: Arc<dyn Notifier>,
        charts: Arc<dyn ChartRenderer>,
        config: BudgetConfig,
    ) -> Self {
        Self {
            db,
            classifier,
            notifier,
            charts,
            config,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn classifier(&self) -> &dyn IntentClassifier {
        self.classifier.as_ref()
    }

    fn money(&self, amount: f64) -> String {
        format!("{}{:.2}", self.config.currency_symbol, amount)
    }

    /// Handle a message at the current local time
    pub async fn handle_message(&self, psid: &str, text: &str) -> Result<DispatchOutcome> {
        self.handle_message_at(psid, text, &Local::now()).await
    }

    /// Handle a message as if received at `now`
    pub async fn handle_message_at<Tz>(
        &self,
        psid: &str,
        text: &str,
        now: &DateTime<Tz>,
    ) -> Result<DispatchOutcome>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let text = text.trim();
        let user = self.ensure_user(psid, now).await?;
        let outcome = self.dispatch(&user, text, now).await?;
        info!(psid, outcome = outcome.label(), "Handled message");
        Ok(outcome)
    }

    /// Look up a user, creating and welcoming them on first contact
    pub async fn ensure_user<Tz: TimeZone>(&self, psid: &str, now: &DateTime<Tz>) -> Result<User> {
        if let Some(user) = self.db.get_user(psid)? {
            return Ok(user);
        }

        let user = self.db.insert_user(psid, now.with_timezone(&Utc))?;
        info!(psid, "New user");
        self.notifier.send_text(psid, WELCOME).await;
        Ok(user)
    }

    /// Act on a message for an existing user
    pub async fn dispatch<Tz>(
        &self,
        user: &User,
        text: &str,
        now: &DateTime<Tz>,
    ) -> Result<DispatchOutcome>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        match Command::parse(text) {
            Some(Command::Report) => self.send_report(&user.psid, now).await,
            Some(Command::Reset) => self.reset(user).await,
            Some(Command::Undo) => self.undo(user, now).await,
            Some(Command::Help) => {
                self.notifier.send_text(&user.psid, HELP_TEXT).await;
                Ok(DispatchOutcome::Help)
            }
            None => self.classify_and_apply(user, text, now).await,
        }
    }

    /// Send the monthly report text, then the chart
    ///
    /// A chart failure is logged; the text reply has already gone out.
    pub async fn send_report<Tz>(&self, psid: &str, now: &DateTime<Tz>) -> Result<DispatchOutcome>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let Some(report) = report::build_monthly_report(&self.db, psid, now)? else {
            self.notifier.send_text(psid, NO_REPORT_DATA).await;
            return Ok(DispatchOutcome::NoReportData);
        };

        self.notifier
            .send_text(psid, &report.message(&self.config.currency_symbol))
            .await;

        match self.charts.render(&report.categories).await {
            Ok(png) => self.notifier.send_image(psid, png).await,
            Err(e) => warn!(psid, error = %e, "Chart rendering failed"),
        }

        Ok(DispatchOutcome::ReportSent(report))
    }

    async fn reset(&self, user: &User) -> Result<DispatchOutcome> {
        let transactions = self.db.delete_transactions_for_user(&user.psid)?;
        let subscriptions = self.db.delete_subscriptions_for_user(&user.psid)?;
        self.db.save_user(&User {
            weekly_limit: 0.0,
            ..user.clone()
        })?;

        info!(psid = %user.psid, transactions, subscriptions, "Reset user data");
        self.notifier.send_text(&user.psid, RESET_DONE).await;
        Ok(DispatchOutcome::Reset {
            transactions,
            subscriptions,
        })
    }

    async fn undo<Tz: TimeZone>(&self, user: &User, now: &DateTime<Tz>) -> Result<DispatchOutcome> {
        let Some(transaction) = self.db.latest_transaction(&user.psid)? else {
            self.notifier.send_text(&user.psid, NOTHING_TO_UNDO).await;
            return Ok(DispatchOutcome::NothingToUndo);
        };

        self.db.delete_transaction(transaction.id)?;
        let reply = format!(
            "Last transaction '{} ({})' has been removed.",
            transaction.item_name,
            self.money(transaction.amount)
        );
        self.notifier.send_text(&user.psid, &reply).await;

        let alert = self.evaluate_budget(&user.psid, user.weekly_limit, now).await?;
        Ok(DispatchOutcome::Undone { transaction, alert })
    }

    async fn classify_and_apply<Tz: TimeZone>(
        &self,
        user: &User,
        text: &str,
        now: &DateTime<Tz>,
    ) -> Result<DispatchOutcome> {
        let classified = match self.classifier.classify(text).await {
            Ok(Some(classified)) => classified,
            Ok(None) => {
                debug!(psid = %user.psid, "Classifier returned nothing");
                self.notifier.send_text(&user.psid, NOT_UNDERSTOOD).await;
                return Ok(DispatchOutcome::Unclassified);
            }
            Err(e) => {
                warn!(psid = %user.psid, error = %e, "Classification failed");
                self.notifier.send_text(&user.psid, NOT_UNDERSTOOD).await;
                return Ok(DispatchOutcome::Unclassified);
            }
        };

        let intent = match classified.resolve() {
            Ok(intent) => intent,
            Err(Error::InvalidAmount(reason)) => {
                warn!(psid = %user.psid, %reason, "Unusable amount from classifier");
                self.notifier.send_text(&user.psid, NOT_UNDERSTOOD).await;
                return Ok(DispatchOutcome::InvalidAmount(reason));
            }
            Err(e) => return Err(e),
        };

        match intent {
            Intent::SetLimit { amount } => self.set_limit(user, amount, now).await,
            Intent::AddSubscription { service, amount } => {
                self.add_subscription(user, &service, amount, now).await
            }
            Intent::Expense {
                item,
                amount,
                category,
            } => self.log_expense(user, &item, amount, category, now).await,
        }
    }

    async fn set_limit<Tz: TimeZone>(
        &self,
        user: &User,
        limit: f64,
        now: &DateTime<Tz>,
    ) -> Result<DispatchOutcome> {
        self.db.save_user(&User {
            weekly_limit: limit,
            ..user.clone()
        })?;

        let reply = format!("Weekly limit set to {}", self.money(limit));
        self.notifier.send_text(&user.psid, &reply).await;

        let alert = self.evaluate_budget(&user.psid, limit, now).await?;
        Ok(DispatchOutcome::LimitSet { limit, alert })
    }

    /// Record a subscription and its first month as a transaction
    ///
    /// Does not evaluate the budget.
    async fn add_subscription<Tz: TimeZone>(
        &self,
        user: &User,
        service: &str,
        amount: f64,
        now: &DateTime<Tz>,
    ) -> Result<DispatchOutcome> {
        let now = now.with_timezone(&Utc);
        let next_billing_date = next_billing_date(&now, self.config.billing_cycle_days)?;
        let subscription_id = self.db.insert_subscription(&NewSubscription {
            psid: user.psid.clone(),
            service_name: service.to_string(),
            amount,
            next_billing_date,
            created_at: now,
        })?;
        let transaction_id = self.db.insert_transaction(&NewTransaction {
            psid: user.psid.clone(),
            amount,
            category: Category::Subscription,
            item_name: format!("{} (1st month)", service),
            date: now,
        })?;

        let reply = format!(
            "Subscription added: {} ({}/mo)",
            service,
            self.money(amount)
        );
        self.notifier.send_text(&user.psid, &reply).await;

        Ok(DispatchOutcome::SubscriptionAdded {
            subscription_id,
            transaction_id,
        })
    }

    async fn log_expense<Tz: TimeZone>(
        &self,
        user: &User,
        item: &str,
        amount: f64,
        category: Category,
        now: &DateTime<Tz>,
    ) -> Result<DispatchOutcome> {
        let transaction_id = self.db.insert_transaction(&NewTransaction {
            psid: user.psid.clone(),
            amount,
            category,
            item_name: item.to_string(),
            date: now.with_timezone(&Utc),
        })?;

        let reply = format!("Logged: {} ({}) - {}", item, self.money(amount), category);
        self.notifier.send_text(&user.psid, &reply).await;

        let alert = if user.has_limit() {
            self.evaluate_budget(&user.psid, user.weekly_limit, now).await?
        } else {
            None
        };
        Ok(DispatchOutcome::ExpenseLogged {
            transaction_id,
            alert,
        })
    }

    /// Run the budget evaluator and send its alert, if any
    pub async fn evaluate_budget<Tz: TimeZone>(
        &self,
        psid: &str,
        limit: f64,
        now: &DateTime<Tz>,
    ) -> Result<Option<BudgetAlert>> {
        let alert = budget::evaluate(&self.db, psid, limit, now)?;
        if let Some(ref alert) = alert {
            info!(psid, total = alert.total, limit = alert.limit, "Weekly limit exceeded");
            self.notifier
                .send_text(psid, &alert.message(&self.config.currency_symbol))
                .await;
        }
        Ok(alert)
    }
}

/// One billing cycle after `now`
///
/// `BudgetConfig` can be built by hand, so out-of-range cycles are an error
/// here as well as at config load.
fn next_billing_date(now: &DateTime<Utc>, cycle_days: i64) -> Result<DateTime<Utc>> {
    Duration::try_days(cycle_days)
        .and_then(|cycle| now.checked_add_signed(cycle))
        .ok_or_else(|| Error::Config(format!("billing cycle of {} days is out of range", cycle_days)))
}
