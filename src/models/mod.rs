//! Data models for the lending ledger

pub mod book;
pub mod directory;
pub mod stats;
pub mod subscription;

// Re-export commonly used types
pub use book::{Book, BookDetails, CreateBook};
pub use stats::{AuthorStats, LibraryStats};
pub use subscription::{
    ActiveSubscriptionDetails, CreateSubscription, Deletion, LoanState, NewSubscription,
    Subscription, SubscriptionDetails, SubscriptionQuery, SubscriptionStatus,
};
