//! Shared domain enums, stored as lowercase TEXT columns

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Implements string conversion and SQLx TEXT encoding for a fieldless enum
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: &str = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Whether an item is offered for lending, selling, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityMode {
    Lend,
    Sell,
    Both,
}

text_enum!(AvailabilityMode {
    Lend => "lend",
    Sell => "sell",
    Both => "both",
});

impl AvailabilityMode {
    pub fn allows_lending(&self) -> bool {
        matches!(self, AvailabilityMode::Lend | AvailabilityMode::Both)
    }

    pub fn allows_selling(&self) -> bool {
        matches!(self, AvailabilityMode::Sell | AvailabilityMode::Both)
    }

    pub fn allows(&self, kind: TransactionType) -> bool {
        match kind {
            TransactionType::Lend => self.allows_lending(),
            TransactionType::Sell => self.allows_selling(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Available,
    Reserved,
    Borrowed,
    Sold,
}

text_enum!(ItemStatus {
    Available => "available",
    Reserved => "reserved",
    Borrowed => "borrowed",
    Sold => "sold",
});

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Lend,
    Sell,
}

text_enum!(TransactionType {
    Lend => "lend",
    Sell => "sell",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Active,
    Completed,
    Late,
    Cancelled,
}

text_enum!(TransactionStatus {
    Pending => "pending",
    Active => "active",
    Completed => "completed",
    Late => "late",
    Cancelled => "cancelled",
});

impl TransactionStatus {
    /// Pending and active transactions hold their item
    pub fn is_open(&self) -> bool {
        matches!(self, TransactionStatus::Pending | TransactionStatus::Active)
    }

    /// Ratings are accepted once the exchange has ended normally or late
    pub fn is_ratable(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Late)
    }

    /// An admin penalty needs a loan that actually went out
    pub fn accepts_manual_penalty(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Active | TransactionStatus::Late | TransactionStatus::Completed
        )
    }
}

// ---------------------------------------------------------------------------
// Penalties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PenaltyStatus {
    Pending,
    Paid,
    Waived,
}

text_enum!(PenaltyStatus {
    Pending => "pending",
    Paid => "paid",
    Waived => "waived",
});

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// Which side of the transaction wrote a rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RaterRole {
    Owner,
    Borrower,
}

text_enum!(RaterRole {
    Owner => "owner",
    Borrower => "borrower",
});

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Student,
    Admin,
}

text_enum!(AccountType {
    Student => "student",
    Admin => "admin",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Blocked,
}

text_enum!(AccountStatus {
    Active => "active",
    Blocked => "blocked",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_allows() {
        assert!(AvailabilityMode::Lend.allows(TransactionType::Lend));
        assert!(!AvailabilityMode::Lend.allows(TransactionType::Sell));
        assert!(AvailabilityMode::Both.allows(TransactionType::Sell));
        assert!(!AvailabilityMode::Sell.allows(TransactionType::Lend));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("LATE".parse::<TransactionStatus>(), Ok(TransactionStatus::Late));
        assert!("returned".parse::<TransactionStatus>().is_err());
        assert_eq!(ItemStatus::Borrowed.to_string(), "borrowed");
    }

    #[test]
    fn test_open_and_ratable() {
        assert!(TransactionStatus::Pending.is_open());
        assert!(TransactionStatus::Active.is_open());
        assert!(!TransactionStatus::Late.is_open());
        assert!(TransactionStatus::Late.is_ratable());
        assert!(!TransactionStatus::Cancelled.is_ratable());
    }

    #[test]
    fn test_manual_penalty_needs_a_loan_that_went_out() {
        assert!(TransactionStatus::Active.accepts_manual_penalty());
        assert!(TransactionStatus::Late.accepts_manual_penalty());
        assert!(TransactionStatus::Completed.accepts_manual_penalty());
        assert!(!TransactionStatus::Pending.accepts_manual_penalty());
        assert!(!TransactionStatus::Cancelled.accepts_manual_penalty());
    }
}
