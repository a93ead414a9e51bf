//! Statistics service

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use sqlx::Row;

use crate::{
    api::stats::{
        AmountEntry, DashboardStats, Interval, ItemStats, PenaltyStats, RatingStats, StatEntry,
        TimeSeriesEntry, TransactionStats, TrendsResponse, UserStats,
    },
    error::AppResult,
    models::user::Actor,
    repository::Repository,
};

/// Platform health in 0..=100.
///
/// Late and cancelled ratios are taken over closed transactions (completed,
/// late, cancelled); the unpaid ratio over all penalties.
pub fn health_score(late: i64, cancelled: i64, closed: i64, unpaid: i64, penalties: i64) -> f64 {
    let ratio = |n: i64, d: i64| if d > 0 { n as f64 / d as f64 } else { 0.0 };
    let score = 100.0
        - 50.0 * ratio(late, closed)
        - 30.0 * ratio(cancelled, closed)
        - 20.0 * ratio(unpaid, penalties);
    score.clamp(0.0, 100.0)
}

fn count_of(entries: &[StatEntry], label: &str) -> i64 {
    entries
        .iter()
        .find(|e| e.label == label)
        .map(|e| e.value)
        .unwrap_or(0)
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Run a `label, value` grouping query
    async fn grouped(&self, sql: &str) -> AppResult<Vec<StatEntry>> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.repository.pool)
            .await?
            .into_iter()
            .map(|row| StatEntry {
                label: row.get("label"),
                value: row.get("value"),
            })
            .collect();
        Ok(rows)
    }

    /// Admin dashboard
    pub async fn dashboard(&self, actor: &Actor) -> AppResult<DashboardStats> {
        actor.require_admin()?;
        let pool = &self.repository.pool;

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        let items_by_status = self
            .grouped("SELECT status AS label, COUNT(*) AS value FROM items GROUP BY status ORDER BY value DESC")
            .await?;
        let items_by_mode = self
            .grouped(
                "SELECT availability_mode AS label, COUNT(*) AS value FROM items GROUP BY availability_mode ORDER BY value DESC",
            )
            .await?;

        let tx_by_status = self
            .grouped("SELECT status AS label, COUNT(*) AS value FROM transactions GROUP BY status ORDER BY value DESC")
            .await?;
        let tx_by_type = self
            .grouped("SELECT kind AS label, COUNT(*) AS value FROM transactions GROUP BY kind ORDER BY value DESC")
            .await?;
        let overdue: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE status = 'active' AND kind = 'lend' AND due_date < NOW()",
        )
        .fetch_one(pool)
        .await?;

        let penalties_by_status: Vec<AmountEntry> = sqlx::query(
            r#"
            SELECT status AS label, COUNT(*) AS count, COALESCE(SUM(amount), 0) AS amount
            FROM penalties
            GROUP BY status
            ORDER BY count DESC
            "#,
        )
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| AmountEntry {
            label: row.get("label"),
            count: row.get("count"),
            amount: row.get("amount"),
        })
        .collect();

        let (ratings_total, ratings_average): (i64, Option<f64>) =
            sqlx::query_as("SELECT COUNT(*), AVG(rating)::float8 FROM ratings")
                .fetch_one(pool)
                .await?;

        let late = count_of(&tx_by_status, "late");
        let cancelled = count_of(&tx_by_status, "cancelled");
        let closed = late + cancelled + count_of(&tx_by_status, "completed");
        let penalties_total: i64 = penalties_by_status.iter().map(|e| e.count).sum();
        let unpaid = penalties_by_status
            .iter()
            .find(|e| e.label == "pending")
            .map(|e| e.count)
            .unwrap_or(0);

        Ok(DashboardStats {
            users,
            items: ItemStats {
                total: items_by_status.iter().map(|e| e.value).sum(),
                by_status: items_by_status,
                by_mode: items_by_mode,
            },
            transactions: TransactionStats {
                total: tx_by_status.iter().map(|e| e.value).sum(),
                overdue,
                by_status: tx_by_status,
                by_type: tx_by_type,
            },
            penalties: PenaltyStats {
                total: penalties_total,
                by_status: penalties_by_status,
            },
            ratings: RatingStats {
                total: ratings_total,
                average: ratings_average,
            },
            health_score: health_score(late, cancelled, closed, unpaid, penalties_total),
        })
    }

    /// Transactions and penalties created per period (admin only)
    pub async fn trends(
        &self,
        actor: &Actor,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        interval: Interval,
    ) -> AppResult<TrendsResponse> {
        actor.require_admin()?;
        let pool = &self.repository.pool;

        // Default date range: last 30 days
        let end = end_date.unwrap_or_else(Utc::now);
        let start = start_date.unwrap_or_else(|| end - Duration::days(30));

        let date_trunc = match interval {
            Interval::Day => "DATE_TRUNC('day', created_at)",
            Interval::Week => "DATE_TRUNC('week', created_at)",
            Interval::Month => "DATE_TRUNC('month', created_at)",
            Interval::Year => "DATE_TRUNC('year', created_at)",
        };
        let date_format = match interval {
            Interval::Day => "YYYY-MM-DD",
            Interval::Week => "IYYY-\"W\"IW",
            Interval::Month => "YYYY-MM",
            Interval::Year => "YYYY",
        };

        let mut series: BTreeMap<String, TimeSeriesEntry> = BTreeMap::new();

        for (table, is_penalty) in [("transactions", false), ("penalties", true)] {
            let q = format!(
                r#"
                SELECT TO_CHAR({trunc}, '{fmt}') AS period, COUNT(*) AS count
                FROM {table}
                WHERE created_at >= $1 AND created_at <= $2
                GROUP BY {trunc}
                ORDER BY {trunc}
                "#,
                trunc = date_trunc,
                fmt = date_format,
                table = table,
            );
            let rows = sqlx::query(&q).bind(start).bind(end).fetch_all(pool).await?;
            for row in rows {
                let period: String = row.get("period");
                let count: i64 = row.get("count");
                let entry = series.entry(period.clone()).or_insert_with(|| TimeSeriesEntry {
                    period,
                    transactions: 0,
                    penalties: 0,
                });
                if is_penalty {
                    entry.penalties = count;
                } else {
                    entry.transactions = count;
                }
            }
        }

        Ok(TrendsResponse {
            interval,
            start_date: start,
            end_date: end,
            series: series.into_values().collect(),
        })
    }

    /// Per-user figures (the user themself or an admin)
    pub async fn user_stats(&self, actor: &Actor, user_id: i32) -> AppResult<UserStats> {
        actor.require_self_or_admin(user_id, "view these statistics")?;
        self.repository.users.get_by_id(user_id).await?;

        let stats = sqlx::query_as::<_, UserStats>(
            r#"
            SELECT
                $1::int4 AS user_id,
                (SELECT COUNT(*) FROM items WHERE owner_id = $1) AS items_listed,
                (SELECT COUNT(*) FROM transactions WHERE borrower_id = $1) AS transactions_as_borrower,
                (SELECT COUNT(*) FROM transactions WHERE owner_id = $1) AS transactions_as_owner,
                (SELECT COUNT(*) FROM transactions WHERE borrower_id = $1 AND status = 'late') AS late_returns,
                (SELECT COALESCE(SUM(p.amount), 0)
                   FROM penalties p JOIN transactions t ON t.id = p.transaction_id
                  WHERE t.borrower_id = $1 AND p.status = 'pending') AS pending_penalty_total,
                (SELECT COUNT(*) FROM ratings WHERE rated_user_id = $1) AS ratings_count,
                (SELECT AVG(rating)::float8 FROM ratings WHERE rated_user_id = $1) AS average_rating
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.repository.pool)
        .await?;

        Ok(stats)
    }
}
