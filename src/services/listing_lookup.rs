//! Listing lookup
//!
//! The deal pipeline only needs four facts about a listing: who sells it,
//! whether it is live, and its id and title.

use sea_orm::{ConnectionTrait, EntityTrait};
use serde::Serialize;

use crate::entities::listings::ListingStatus;
use crate::entities::prelude::Listings;
use crate::error::PipelineResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub id: i32,
    pub seller_id: i32,
    pub status: ListingStatus,
    pub title: String,
}

pub async fn find<C: ConnectionTrait>(
    conn: &C,
    listing_id: i32,
) -> PipelineResult<Option<ListingSummary>> {
    let listing = Listings::find_by_id(listing_id).one(conn).await?;

    Ok(listing.map(|l| ListingSummary {
        id: l.id,
        seller_id: l.seller_id,
        status: l.status,
        title: l.title,
    }))
}
