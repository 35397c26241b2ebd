//! SQLite implementations of the ledger, budget and profile stores.

pub mod budget_repository;
pub mod connection;
pub mod profile_repository;
pub mod transaction_repository;

pub use budget_repository::BudgetRepository;
pub use connection::DbConnection;
pub use profile_repository::ProfileRepository;
pub use transaction_repository::TransactionRepository;
