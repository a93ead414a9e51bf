//! Data models for Campus Exchange

pub mod enums;
pub mod item;
pub mod message;
pub mod penalty;
pub mod rating;
pub mod transaction;
pub mod user;

// Re-export commonly used types
pub use enums::{
    AccountStatus, AccountType, AvailabilityMode, ItemStatus, PenaltyStatus, RaterRole,
    TransactionStatus, TransactionType,
};
pub use item::Item;
pub use message::{Conversation, Message};
pub use penalty::Penalty;
pub use rating::Rating;
pub use transaction::{Transaction, TransactionDetails};
pub use user::{Actor, User, UserShort};
