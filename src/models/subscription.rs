//! Subscription (lending) model and related types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::book::validate_non_negative;

/// Subscription model from database.
///
/// A null `return_date` means the copy is still checked out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Subscription {
    pub subscription_id: i32,
    pub library_id: i32,
    pub book_id: i32,
    pub reader_id: i32,
    pub issue_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub deposit: Decimal,
}

/// Lending state derived from `return_date`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanState {
    /// The copy is out; it holds one unit of the book's quantity
    Active,
    /// The copy came back; inventory was already restored
    Returned { on: NaiveDate },
}

impl Subscription {
    pub fn state(&self) -> LoanState {
        match self.return_date {
            None => LoanState::Active,
            Some(on) => LoanState::Returned { on },
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), LoanState::Active)
    }
}

/// Create subscription request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_subscription"))]
pub struct CreateSubscription {
    pub library_id: i32,
    pub book_id: i32,
    pub reader_id: i32,
    /// Defaults to the current date
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub deposit: Decimal,
}

fn validate_create_subscription(request: &CreateSubscription) -> Result<(), ValidationError> {
    validate_non_negative(&request.deposit)
}

/// Row handed to the store when issuing; the date is already resolved
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub library_id: i32,
    pub book_id: i32,
    pub reader_id: i32,
    pub issue_date: NaiveDate,
    pub deposit: Decimal,
}

/// Sortable subscription columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionSortField {
    #[default]
    SubscriptionId,
    IssueDate,
    ReturnDate,
    Deposit,
}

impl SubscriptionSortField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::SubscriptionId => "subscription_id",
            Self::IssueDate => "issue_date",
            Self::ReturnDate => "return_date",
            Self::Deposit => "deposit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    /// Most recently issued first
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Subscription listing query
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubscriptionQuery {
    pub reader_id: Option<i32>,
    pub library_id: Option<i32>,
    pub book_id: Option<i32>,
    /// Only subscriptions whose book is still out
    #[serde(default)]
    pub active_only: bool,
    #[serde(default)]
    pub sort_by: SubscriptionSortField,
    #[serde(default)]
    pub order: SortOrder,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl SubscriptionQuery {
    pub fn matches(&self, subscription: &Subscription) -> bool {
        self.reader_id.map_or(true, |id| subscription.reader_id == id)
            && self.library_id.map_or(true, |id| subscription.library_id == id)
            && self.book_id.map_or(true, |id| subscription.book_id == id)
            && (!self.active_only || subscription.is_active())
    }
}

/// Active subscription joined with reader, book and library names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ActiveSubscriptionDetails {
    pub subscription_id: i32,
    pub reader_id: i32,
    pub reader_name: String,
    pub book_id: i32,
    pub book_title: String,
    pub library_id: i32,
    pub library_name: String,
    pub issue_date: NaiveDate,
    pub deposit: Decimal,
}

/// Any subscription, returned or not, joined with reader, book and library names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SubscriptionDetails {
    pub subscription_id: i32,
    pub issue_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub deposit: Decimal,
    pub book_title: String,
    pub reader_name: String,
    pub library_name: String,
}

/// Status computed from the return date relative to a reference day.
///
/// `is_overdue` reads `return_date` as a due date: a date already in the past
/// counts as overdue, even when it records an actual return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SubscriptionStatus {
    pub subscription_id: i32,
    pub is_active: bool,
    pub is_overdue: bool,
    /// Null while no return date is set
    pub days_remaining: Option<i64>,
    pub days_overdue: i64,
}

impl SubscriptionStatus {
    pub fn at(subscription: &Subscription, today: NaiveDate) -> Self {
        let (is_overdue, days_remaining, days_overdue) = match subscription.state() {
            LoanState::Active => (false, None, 0),
            LoanState::Returned { on } if on < today => (true, Some(0), (today - on).num_days()),
            LoanState::Returned { on } => (false, Some((on - today).num_days()), 0),
        };

        Self {
            subscription_id: subscription.subscription_id,
            is_active: subscription.is_active(),
            is_overdue,
            days_remaining,
            days_overdue,
        }
    }
}

/// Outcome of deleting a subscription
#[derive(Debug, Clone, PartialEq)]
pub struct Deletion {
    pub subscription: Subscription,
    /// Book quantity after compensation, when the loan was still active
    pub restored_quantity: Option<i32>,
}
