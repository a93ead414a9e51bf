//! CSV exports for the back-office

use std::str::FromStr;

use chrono::Utc;
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{item::Item, penalty::Penalty, rating::Rating, transaction::Transaction, user::Actor},
    repository::Repository,
};

/// Exportable resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportResource {
    Items,
    Transactions,
    Penalties,
    Ratings,
}

impl ExportResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportResource::Items => "items",
            ExportResource::Transactions => "transactions",
            ExportResource::Penalties => "penalties",
            ExportResource::Ratings => "ratings",
        }
    }

    /// Header line, fixed even when there are no rows
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            ExportResource::Items => &[
                "id", "owner_id", "title", "availability_mode", "price",
                "lending_duration_days", "status", "pickup_location", "created_at",
            ],
            ExportResource::Transactions => &[
                "id", "item_id", "borrower_id", "owner_id", "type", "status", "start_date",
                "due_date", "return_date", "deposit_amount", "final_price", "created_at",
            ],
            ExportResource::Penalties => &[
                "id", "transaction_id", "days_late", "amount", "status", "auto_created",
                "reason", "created_at", "resolved_at",
            ],
            ExportResource::Ratings => &[
                "id", "transaction_id", "rater_id", "rated_user_id", "rater_role", "rating",
                "comment", "created_at",
            ],
        }
    }
}

impl FromStr for ExportResource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "items" => Ok(ExportResource::Items),
            "transactions" => Ok(ExportResource::Transactions),
            "penalties" => Ok(ExportResource::Penalties),
            "ratings" => Ok(ExportResource::Ratings),
            other => Err(AppError::BadRequest(format!("Unknown export resource: {}", other))),
        }
    }
}

/// A generated CSV file
#[derive(Debug)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

#[derive(Serialize)]
struct ItemCsvRow {
    id: i32,
    owner_id: i32,
    title: String,
    availability_mode: String,
    price: String,
    lending_duration_days: String,
    status: String,
    pickup_location: String,
    created_at: String,
}

impl From<&Item> for ItemCsvRow {
    fn from(item: &Item) -> Self {
        ItemCsvRow {
            id: item.id,
            owner_id: item.owner_id,
            title: item.title.clone(),
            availability_mode: item.availability_mode.to_string(),
            price: item.price.map(|p| p.to_string()).unwrap_or_default(),
            lending_duration_days: item
                .lending_duration_days
                .map(|d| d.to_string())
                .unwrap_or_default(),
            status: item.status.to_string(),
            pickup_location: item.pickup_location.clone().unwrap_or_default(),
            created_at: item.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct TransactionCsvRow {
    id: i32,
    item_id: i32,
    borrower_id: i32,
    owner_id: i32,
    kind: String,
    status: String,
    start_date: String,
    due_date: String,
    return_date: String,
    deposit_amount: String,
    final_price: String,
    created_at: String,
}

impl From<&Transaction> for TransactionCsvRow {
    fn from(tx: &Transaction) -> Self {
        TransactionCsvRow {
            id: tx.id,
            item_id: tx.item_id,
            borrower_id: tx.borrower_id,
            owner_id: tx.owner_id,
            kind: tx.kind.to_string(),
            status: tx.status.to_string(),
            start_date: tx.start_date.map(|d| d.to_rfc3339()).unwrap_or_default(),
            due_date: tx.due_date.map(|d| d.to_rfc3339()).unwrap_or_default(),
            return_date: tx.return_date.map(|d| d.to_rfc3339()).unwrap_or_default(),
            deposit_amount: tx.deposit_amount.map(|d| d.to_string()).unwrap_or_default(),
            final_price: tx.final_price.map(|p| p.to_string()).unwrap_or_default(),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct PenaltyCsvRow {
    id: i32,
    transaction_id: i32,
    days_late: i32,
    amount: String,
    status: String,
    auto_created: bool,
    reason: String,
    created_at: String,
    resolved_at: String,
}

impl From<&Penalty> for PenaltyCsvRow {
    fn from(p: &Penalty) -> Self {
        PenaltyCsvRow {
            id: p.id,
            transaction_id: p.transaction_id,
            days_late: p.days_late,
            amount: p.amount.to_string(),
            status: p.status.to_string(),
            auto_created: p.auto_created,
            reason: p.reason.clone().unwrap_or_default(),
            created_at: p.created_at.to_rfc3339(),
            resolved_at: p.resolved_at.map(|d| d.to_rfc3339()).unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct RatingCsvRow {
    id: i32,
    transaction_id: i32,
    rater_id: i32,
    rated_user_id: i32,
    rater_role: String,
    rating: i16,
    comment: String,
    created_at: String,
}

impl From<&Rating> for RatingCsvRow {
    fn from(r: &Rating) -> Self {
        RatingCsvRow {
            id: r.id,
            transaction_id: r.transaction_id,
            rater_id: r.rater_id,
            rated_user_id: r.rated_user_id,
            rater_role: r.rater_role.to_string(),
            rating: r.rating,
            comment: r.comment.clone().unwrap_or_default(),
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

/// Serialize rows under a fixed header line
fn write_csv<R: Serialize>(headers: &[&str], rows: impl IntoIterator<Item = R>) -> AppResult<String> {
    let csv_err = |e: csv::Error| AppError::Internal(format!("CSV encoding failed: {}", e));

    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(vec![]);
    wtr.write_record(headers).map_err(csv_err)?;
    for row in rows {
        wtr.serialize(row).map_err(csv_err)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV is not UTF-8: {}", e)))
}

#[derive(Clone)]
pub struct ExportService {
    repository: Repository,
}

impl ExportService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Export a whole table as CSV (admin only)
    pub async fn export(&self, actor: &Actor, resource: ExportResource) -> AppResult<CsvExport> {
        actor.require_admin()?;
        let headers = resource.headers();

        let content = match resource {
            ExportResource::Items => {
                let rows = self.repository.items.list_all().await?;
                write_csv(headers, rows.iter().map(ItemCsvRow::from))?
            }
            ExportResource::Transactions => {
                let rows = self.repository.transactions.list_all().await?;
                write_csv(headers, rows.iter().map(TransactionCsvRow::from))?
            }
            ExportResource::Penalties => {
                let rows = self.repository.penalties.list_all().await?;
                write_csv(headers, rows.iter().map(PenaltyCsvRow::from))?
            }
            ExportResource::Ratings => {
                let rows = self.repository.ratings.list_all().await?;
                write_csv(headers, rows.iter().map(RatingCsvRow::from))?
            }
        };

        tracing::info!(admin_id = actor.user_id, resource = resource.as_str(), "CSV export generated");
        Ok(CsvExport {
            filename: format!("{}_{}.csv", resource.as_str(), Utc::now().format("%Y-%m-%d")),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{PenaltyStatus, TransactionStatus, TransactionType};
    use rust_decimal::Decimal;

    #[test]
    fn test_resource_from_str() {
        assert_eq!("items".parse::<ExportResource>().unwrap(), ExportResource::Items);
        assert_eq!("ratings".parse::<ExportResource>().unwrap(), ExportResource::Ratings);
        assert!(matches!(
            "users".parse::<ExportResource>(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_empty_export_keeps_headers() {
        let csv = write_csv(ExportResource::Penalties.headers(), Vec::<PenaltyCsvRow>::new()).unwrap();
        assert_eq!(
            csv,
            "id,transaction_id,days_late,amount,status,auto_created,reason,created_at,resolved_at\n"
        );
    }

    #[test]
    fn test_penalty_row() {
        let penalty = Penalty {
            id: 7,
            transaction_id: 3,
            days_late: 3,
            amount: Decimal::new(150, 0),
            status: PenaltyStatus::Pending,
            auto_created: true,
            reason: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        let csv = write_csv(ExportResource::Penalties.headers(), [PenaltyCsvRow::from(&penalty)]).unwrap();
        let line = csv.lines().nth(1).unwrap();
        assert!(line.starts_with("7,3,3,150,pending,true,,"));
        assert!(line.ends_with(','));
    }

    #[test]
    fn test_transaction_row_columns_match_headers() {
        let now = Utc::now();
        let tx = Transaction {
            id: 1,
            item_id: 2,
            borrower_id: 3,
            owner_id: 4,
            kind: TransactionType::Sell,
            status: TransactionStatus::Completed,
            start_date: Some(now),
            due_date: None,
            return_date: None,
            deposit_amount: None,
            final_price: Some(Decimal::new(20, 0)),
            message: Some("hello, world".to_string()),
            created_at: now,
            updated_at: now,
        };
        let csv = write_csv(ExportResource::Transactions.headers(), [TransactionCsvRow::from(&tx)]).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers = reader.headers().unwrap().clone();
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(headers.len(), record.len());
        assert_eq!(&record[4], "sell");
        assert_eq!(&record[5], "completed");
        assert_eq!(&headers[10], "final_price");
        assert_eq!(&record[10], "20");
    }
}
