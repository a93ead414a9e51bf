//! Service tests against a migrated database
//!
//! The clock is driven through `apply_action(now)`, so late returns can be
//! replayed. Needs `DATABASE_URL`:
//! `cargo test --test service_tests -- --ignored`.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration, SubsecRound, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;

use campus_exchange_server::{
    config::{AuthConfig, ExchangeConfig},
    error::AppError,
    models::{
        enums::{AccountStatus, AccountType, AvailabilityMode, ItemStatus, PenaltyStatus, TransactionStatus, TransactionType},
        item::CreateItem,
        message::{SendMessage, StartConversation},
        penalty::CreatePenalty,
        rating::CreateRating,
        transaction::{RequestItem, TransactionAction},
        user::{Actor, CreateUser},
    },
    repository::Repository,
    services::Services,
};

static NEXT_LOGIN: AtomicUsize = AtomicUsize::new(0);

struct Fixture {
    repository: Repository,
    services: Services,
    rate: Decimal,
}

async fn setup() -> Fixture {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let repository = Repository::new(pool);
    let exchange = ExchangeConfig::default();
    let rate = exchange.penalty_rate_per_day;
    let services = Services::new(repository.clone(), AuthConfig::default(), exchange);
    Fixture { repository, services, rate }
}

async fn create_user(fx: &Fixture, prefix: &str, account_type: AccountType) -> Actor {
    let login = format!(
        "{}_{}_{}",
        prefix,
        Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        NEXT_LOGIN.fetch_add(1, Ordering::Relaxed)
    );
    let user = fx
        .repository
        .users
        .create(
            &CreateUser {
                login,
                password: "password123".into(),
                firstname: None,
                lastname: None,
                email: None,
            },
            "not-a-real-hash",
            account_type,
        )
        .await
        .expect("Failed to create user");
    Actor { user_id: user.id, account_type }
}

fn lend_listing(title: &str) -> CreateItem {
    CreateItem {
        title: title.into(),
        description: None,
        availability_mode: AvailabilityMode::Lend,
        price: None,
        lending_duration_days: Some(7),
        pickup_location: None,
    }
}

fn lend_request() -> RequestItem {
    RequestItem {
        kind: TransactionType::Lend,
        deposit_amount: None,
        message: None,
    }
}

/// Owner, borrower and a 7-day loan returned 10 days after approval
struct LateLoan {
    owner: Actor,
    borrower: Actor,
    item_id: i32,
    transaction_id: i32,
}

async fn late_loan(fx: &Fixture) -> LateLoan {
    let owner = create_user(fx, "owner", AccountType::Student).await;
    let borrower = create_user(fx, "borrower", AccountType::Student).await;
    let item = fx
        .services
        .items
        .create(&owner, lend_listing("Calculus textbook"))
        .await
        .expect("Failed to list item");
    let requested = fx
        .services
        .transactions
        .request(&borrower, item.id, lend_request())
        .await
        .expect("Failed to request item");
    let transaction_id = requested.transaction.id;

    let returned = Utc::now().trunc_subsecs(0);
    let approved = returned - Duration::days(10);
    fx.repository
        .transactions
        .apply_action(transaction_id, TransactionAction::Approve, &owner, fx.rate, approved)
        .await
        .expect("Failed to approve");
    fx.repository
        .transactions
        .apply_action(transaction_id, TransactionAction::MarkReturned, &borrower, fx.rate, returned)
        .await
        .expect("Failed to return");

    LateLoan { owner, borrower, item_id: item.id, transaction_id }
}

#[tokio::test]
#[ignore]
async fn test_late_return_persists_status_penalty_and_item() {
    let fx = setup().await;
    let owner = create_user(&fx, "owner", AccountType::Student).await;
    let borrower = create_user(&fx, "borrower", AccountType::Student).await;
    let item = fx
        .services
        .items
        .create(&owner, lend_listing("Graphing calculator"))
        .await
        .expect("Failed to list item");
    let tx_id = fx
        .services
        .transactions
        .request(&borrower, item.id, lend_request())
        .await
        .expect("Failed to request item")
        .transaction
        .id;

    let returned = Utc::now().trunc_subsecs(0);
    let approved = returned - Duration::days(10);
    let (active, _) = fx
        .repository
        .transactions
        .apply_action(tx_id, TransactionAction::Approve, &owner, fx.rate, approved)
        .await
        .expect("Failed to approve");
    assert_eq!(active.due_date, Some(approved + Duration::days(7)));

    let (late, penalty) = fx
        .repository
        .transactions
        .apply_action(tx_id, TransactionAction::MarkReturned, &borrower, fx.rate, returned)
        .await
        .expect("Failed to return");
    assert_eq!(late.status, TransactionStatus::Late);
    assert_eq!(late.return_date, Some(returned));

    let penalty = penalty.expect("A late return creates a penalty");
    assert_eq!(penalty.days_late, 3);
    assert_eq!(penalty.amount, Decimal::from(150));
    assert_eq!(penalty.status, PenaltyStatus::Pending);
    assert!(penalty.auto_created);

    let stored = fx
        .repository
        .penalties
        .list_for_transaction(tx_id)
        .await
        .expect("Failed to list penalties");
    assert_eq!(stored.len(), 1);

    let item = fx.repository.items.get_by_id(item.id).await.expect("Failed to load item");
    assert_eq!(item.status, ItemStatus::Available);
    assert!(fx
        .repository
        .penalties
        .has_pending_for_borrower(borrower.user_id)
        .await
        .expect("Failed to check penalties"));

    // Returning twice neither succeeds nor adds a penalty
    let again = fx
        .repository
        .transactions
        .apply_action(tx_id, TransactionAction::MarkReturned, &borrower, fx.rate, returned)
        .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
    let stored = fx
        .repository
        .penalties
        .list_for_transaction(tx_id)
        .await
        .expect("Failed to list penalties");
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_second_request_on_open_item_conflicts() {
    let fx = setup().await;
    let owner = create_user(&fx, "owner", AccountType::Student).await;
    let first = create_user(&fx, "first", AccountType::Student).await;
    let second = create_user(&fx, "second", AccountType::Student).await;
    let item = fx
        .services
        .items
        .create(&owner, lend_listing("Lab coat"))
        .await
        .expect("Failed to list item");

    fx.services
        .transactions
        .request(&first, item.id, lend_request())
        .await
        .expect("Failed to request item");
    let result = fx.services.transactions.request(&second, item.id, lend_request()).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
#[ignore]
async fn test_pending_penalty_blocks_item_creation() {
    let fx = setup().await;
    let loan = late_loan(&fx).await;

    let result = fx.services.items.create(&loan.borrower, lend_listing("Desk lamp")).await;
    assert!(matches!(result, Err(AppError::Authorization(_))));
}

#[tokio::test]
#[ignore]
async fn test_item_with_history_keeps_penalties_and_ratings() {
    let fx = setup().await;
    let loan = late_loan(&fx).await;
    let admin = create_user(&fx, "admin", AccountType::Admin).await;

    fx.services
        .ratings
        .create(
            &loan.borrower,
            loan.transaction_id,
            CreateRating { rating: 1, comment: Some("Rude".into()) },
        )
        .await
        .expect("Failed to rate");

    let result = fx.services.items.delete(&loan.owner, loan.item_id).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let bulk = fx
        .services
        .items
        .bulk_delete(&admin, &[loan.item_id])
        .await
        .expect("Failed to bulk delete");
    assert!(bulk.deleted.is_empty());
    assert_eq!(bulk.skipped, vec![loan.item_id]);

    // The schema refuses it as well
    let raw = sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(loan.item_id)
        .execute(&fx.repository.pool)
        .await;
    assert!(matches!(raw, Err(sqlx::Error::Database(ref db)) if db.is_foreign_key_violation()));

    let penalties = fx
        .repository
        .penalties
        .list_for_transaction(loan.transaction_id)
        .await
        .expect("Failed to list penalties");
    assert_eq!(penalties.len(), 1);
    assert_eq!(penalties[0].status, PenaltyStatus::Pending);

    let (count, _) = fx
        .repository
        .ratings
        .summary(loan.owner.user_id)
        .await
        .expect("Failed to summarize ratings");
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore]
async fn test_manual_penalty_needs_a_loan_that_went_out() {
    let fx = setup().await;
    let owner = create_user(&fx, "owner", AccountType::Student).await;
    let borrower = create_user(&fx, "borrower", AccountType::Student).await;
    let admin = create_user(&fx, "admin", AccountType::Admin).await;
    let item = fx
        .services
        .items
        .create(&owner, lend_listing("Soldering iron"))
        .await
        .expect("Failed to list item");
    let tx_id = fx
        .services
        .transactions
        .request(&borrower, item.id, lend_request())
        .await
        .expect("Failed to request item")
        .transaction
        .id;

    let manual = || CreatePenalty { days_late: 2, reason: "Broken tip".into() };

    let result = fx.services.penalties.create_manual(&admin, tx_id, manual()).await;
    assert!(matches!(result, Err(AppError::BusinessRule(_))));

    fx.services
        .transactions
        .apply(&owner, tx_id, TransactionAction::Approve)
        .await
        .expect("Failed to approve");
    let penalty = fx
        .services
        .penalties
        .create_manual(&admin, tx_id, manual())
        .await
        .expect("Failed to create penalty");
    assert_eq!(penalty.amount, Decimal::from(100));
    assert!(!penalty.auto_created);
}

#[tokio::test]
#[ignore]
async fn test_blocked_user_cannot_act_rate_or_message() {
    let fx = setup().await;
    let loan = late_loan(&fx).await;
    let admin = create_user(&fx, "admin", AccountType::Admin).await;

    fx.services
        .users
        .set_status(&admin, loan.borrower.user_id, AccountStatus::Blocked)
        .await
        .expect("Failed to block user");

    let rating = fx
        .services
        .ratings
        .create(&loan.borrower, loan.transaction_id, CreateRating { rating: 3, comment: None })
        .await;
    assert!(matches!(rating, Err(AppError::Authorization(_))));

    let conversation = fx
        .services
        .messages
        .start(
            &loan.borrower,
            StartConversation {
                recipient_id: loan.owner.user_id,
                item_id: None,
                body: Some("Sorry for the delay".into()),
            },
        )
        .await;
    assert!(matches!(conversation, Err(AppError::Authorization(_))));

    let penalties = fx
        .repository
        .penalties
        .list_for_transaction(loan.transaction_id)
        .await
        .expect("Failed to list penalties");
    let pay = fx
        .services
        .penalties
        .pay(&loan.borrower, loan.transaction_id, penalties[0].id)
        .await;
    assert!(matches!(pay, Err(AppError::Authorization(_))));

    let action = fx
        .services
        .transactions
        .apply(&loan.borrower, loan.transaction_id, TransactionAction::Cancel)
        .await;
    assert!(matches!(action, Err(AppError::Authorization(_))));

    // The owner is unaffected
    let conversation = fx
        .services
        .messages
        .start(
            &loan.owner,
            StartConversation { recipient_id: loan.borrower.user_id, item_id: None, body: None },
        )
        .await
        .expect("Failed to start conversation");
    let reply = fx
        .services
        .messages
        .send(&loan.borrower, conversation.id, SendMessage { body: "hello".into() })
        .await;
    assert!(matches!(reply, Err(AppError::Authorization(_))));
}
