//! `SeaORM` Entity prelude

pub use super::deal_documents::Entity as DealDocuments;
pub use super::deal_events::Entity as DealEvents;
pub use super::deals::Entity as Deals;
pub use super::listings::Entity as Listings;
pub use super::scheduled_calls::Entity as ScheduledCalls;
pub use super::users::Entity as Users;
