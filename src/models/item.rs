//! Item (listing) model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{AvailabilityMode, ItemStatus};
use crate::error::{AppError, AppResult};

/// Item model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    pub id: i32,
    pub owner_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub availability_mode: AvailabilityMode,
    /// Sale price, set when the mode allows selling
    pub price: Option<Decimal>,
    /// Loan length in days, set when the mode allows lending
    pub lending_duration_days: Option<i32>,
    pub status: ItemStatus,
    pub pickup_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ItemQuery {
    /// Search in title and description
    pub q: Option<String>,
    pub status: Option<ItemStatus>,
    pub availability_mode: Option<AvailabilityMode>,
    pub owner_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub availability_mode: AvailabilityMode,
    pub price: Option<Decimal>,
    #[validate(range(min = 1, max = 365, message = "Lending duration must be 1 to 365 days"))]
    pub lending_duration_days: Option<i32>,
    #[validate(length(max = 200))]
    pub pickup_location: Option<String>,
}

/// Update item request (status is never set directly)
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateItem {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub availability_mode: Option<AvailabilityMode>,
    pub price: Option<Decimal>,
    #[validate(range(min = 1, max = 365, message = "Lending duration must be 1 to 365 days"))]
    pub lending_duration_days: Option<i32>,
    #[validate(length(max = 200))]
    pub pickup_location: Option<String>,
}

/// Check that price and lending duration match the availability mode
pub fn check_offer_terms(
    mode: AvailabilityMode,
    price: Option<Decimal>,
    lending_duration_days: Option<i32>,
) -> AppResult<()> {
    if mode.allows_selling() {
        match price {
            Some(p) if p > Decimal::ZERO => {}
            Some(_) => return Err(AppError::Validation("Price must be positive".to_string())),
            None => {
                return Err(AppError::Validation(
                    "Price is required when the item is for sale".to_string(),
                ))
            }
        }
    }
    if mode.allows_lending() && lending_duration_days.is_none() {
        return Err(AppError::Validation(
            "Lending duration is required when the item can be borrowed".to_string(),
        ));
    }
    Ok(())
}

impl UpdateItem {
    /// Merge the update over the current item and re-check the offer terms
    pub fn merged_terms(&self, item: &Item) -> AppResult<(AvailabilityMode, Option<Decimal>, Option<i32>)> {
        let mode = self.availability_mode.unwrap_or(item.availability_mode);
        let price = self.price.or(item.price);
        let duration = self.lending_duration_days.or(item.lending_duration_days);
        check_offer_terms(mode, price, duration)?;
        Ok((mode, price, duration))
    }
}
