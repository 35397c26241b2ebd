//! # Emergency Fund Service
//!
//! Moves money into and out of the emergency fund and toggles the salary-day
//! auto-invest.
//!
//! The fund amount on the profile is the source of truth. Each movement is
//! mirrored into the ledger as a transaction on a best-effort basis: if the
//! mirror cannot be written the fund change still stands and the caller gets a
//! warning.
//!
//! Deposits are capped by what is left once budgets and the existing fund are
//! accounted for: `max(0, balance_after_budget - current_fund)`, computed over
//! all transactions and all budgets. Withdrawals are capped by the fund itself.

use chrono::Utc;
use shared::{Budget, Category, FundUpdate, NewTransaction, Profile, Transaction, UserId};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::aggregator::calculate_balance_after_budget;
use super::commands::emergency_fund::{
    AutoInvestResult, AvailableFunds, FundMovementCommand, FundMovementResult, SetAutoInvestCommand,
};
use super::errors::FundError;
use crate::storage::{BudgetStorage, ProfileStorage, TransactionStorage};

pub const DEPOSIT_TITLE: &str = "Emergency Fund Deposit";
pub const WITHDRAWAL_TITLE: &str = "Emergency Fund Withdrawal";

const MIRROR_WARNING: &str = "Emergency fund updated, but the transaction record could not be saved";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Movement {
    Deposit,
    Withdrawal,
}

/// Largest amount that may be deposited given the ledger and the current fund
pub fn deposit_ceiling(transactions: &[Transaction], budgets: &[Budget], current_fund: f64) -> f64 {
    let after_budget = calculate_balance_after_budget(transactions, budgets).balance_after_budget;
    if after_budget <= 0.0 {
        return 0.0;
    }
    (after_budget - current_fund).max(0.0)
}

/// Largest amount that may be withdrawn
pub fn withdraw_ceiling(current_fund: f64) -> f64 {
    current_fund.max(0.0)
}

fn validate_amount(amount: f64) -> Result<(), FundError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(FundError::InvalidAmount)
    }
}

#[derive(Clone)]
pub struct EmergencyFundService {
    transactions: Arc<dyn TransactionStorage>,
    budgets: Arc<dyn BudgetStorage>,
    profiles: Arc<dyn ProfileStorage>,
}

impl EmergencyFundService {
    pub fn new(
        transactions: Arc<dyn TransactionStorage>,
        budgets: Arc<dyn BudgetStorage>,
        profiles: Arc<dyn ProfileStorage>,
    ) -> Self {
        Self {
            transactions,
            budgets,
            profiles,
        }
    }

    async fn load_profile(&self, user: &UserId) -> Result<Profile, FundError> {
        self.profiles
            .get_profile(user)
            .await
            .map_err(FundError::StoreUnavailable)?
            .ok_or(FundError::ProfileNotFound)
    }

    async fn deposit_ceiling_for(&self, user: &UserId, current_fund: f64) -> Result<f64, FundError> {
        let transactions = self
            .transactions
            .list_transactions(user)
            .await
            .map_err(FundError::StoreUnavailable)?;
        let budgets = self
            .budgets
            .list_budgets(user)
            .await
            .map_err(FundError::StoreUnavailable)?;
        Ok(deposit_ceiling(&transactions, &budgets, current_fund))
    }

    /// Current fund and both movement ceilings
    pub async fn available_funds(&self, user: &UserId) -> Result<AvailableFunds, FundError> {
        let profile = self.load_profile(user).await?;
        let available_to_deposit = self
            .deposit_ceiling_for(user, profile.emergency_fund_amount)
            .await?;

        Ok(AvailableFunds {
            emergency_fund_amount: profile.emergency_fund_amount,
            available_to_deposit,
            available_to_withdraw: withdraw_ceiling(profile.emergency_fund_amount),
        })
    }

    pub async fn deposit(&self, command: FundMovementCommand) -> Result<FundMovementResult, FundError> {
        info!("Depositing {} to emergency fund for user {}", command.amount, command.user);
        validate_amount(command.amount)?;

        let profile = self.load_profile(&command.user).await?;
        let current = profile.emergency_fund_amount;
        let available = self.deposit_ceiling_for(&command.user, current).await?;

        if available <= 0.0 {
            return Err(FundError::NoAvailableFunds);
        }
        if command.amount > available {
            return Err(FundError::InsufficientFunds { available });
        }

        self.apply(&command.user, &profile, current + command.amount, command.amount, Movement::Deposit)
            .await
    }

    pub async fn withdraw(&self, command: FundMovementCommand) -> Result<FundMovementResult, FundError> {
        info!("Withdrawing {} from emergency fund for user {}", command.amount, command.user);
        validate_amount(command.amount)?;

        let profile = self.load_profile(&command.user).await?;
        let current = profile.emergency_fund_amount;
        let available = withdraw_ceiling(current);

        let new_amount = current - command.amount;
        if command.amount > available || new_amount < 0.0 {
            return Err(FundError::InsufficientFunds { available });
        }

        self.apply(&command.user, &profile, new_amount, command.amount, Movement::Withdrawal)
            .await
    }

    async fn apply(
        &self,
        user: &UserId,
        profile: &Profile,
        new_amount: f64,
        amount: f64,
        movement: Movement,
    ) -> Result<FundMovementResult, FundError> {
        match self
            .profiles
            .update_emergency_fund(user, profile.version, new_amount)
            .await
        {
            Ok(FundUpdate::Applied { .. }) => {}
            Ok(FundUpdate::Conflict { current_version }) => {
                warn!(
                    "Emergency fund for user {} changed underneath us (expected version {}, found {})",
                    user, profile.version, current_version
                );
                return Err(FundError::ConcurrentModification);
            }
            Err(e) => {
                error!("Failed to update emergency fund for user {}: {}", user, e);
                return Err(FundError::WriteFailure(e));
            }
        }

        let mirror = match movement {
            Movement::Deposit => NewTransaction::expense(DEPOSIT_TITLE, amount, Category::EmergencyFund, Utc::now())
                .with_notes("Deposited to emergency fund"),
            Movement::Withdrawal => {
                NewTransaction::income(WITHDRAWAL_TITLE, amount, Category::EmergencyFund, Utc::now())
                    .with_notes("Withdrawn from emergency fund")
            }
        };

        let mut warnings = Vec::new();
        let mirror_transaction_id = match self.transactions.insert_transaction(user, &mirror).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Emergency fund updated but mirror transaction failed for user {}: {}", user, e);
                warnings.push(MIRROR_WARNING.to_string());
                None
            }
        };

        let success_message = match movement {
            Movement::Deposit => format!("Successfully deposited AED {:.2} to your emergency fund", amount),
            Movement::Withdrawal => format!("Successfully withdrew AED {:.2} from your emergency fund", amount),
        };
        info!("{} (user {}, new balance {:.2})", success_message, user, new_amount);

        Ok(FundMovementResult {
            emergency_fund_amount: new_amount,
            mirror_transaction_id,
            success_message,
            warnings,
        })
    }

    /// Turn salary-day auto-invest on (positive amount) or off (`None`).
    /// Never creates or reverses any transaction.
    pub async fn set_auto_invest(&self, command: SetAutoInvestCommand) -> Result<AutoInvestResult, FundError> {
        let amount = command.amount;
        if let Some(amount) = amount {
            validate_amount(amount)?;
        }

        self.load_profile(&command.user).await?;
        self.profiles
            .set_auto_invest(&command.user, amount)
            .await
            .map_err(FundError::WriteFailure)?;

        let success_message = match amount {
            Some(amount) => format!(
                "Auto-invest enabled: AED {:.2} will move to your emergency fund on salary day",
                amount
            ),
            None => "Auto-invest disabled".to_string(),
        };
        info!("{} (user {})", success_message, command.user);

        Ok(AutoInvestResult {
            emergency_fund_auto_invest: amount,
            success_message,
        })
    }
}
