//! Remote rows and the validated activity item
//!
//! [`RawRecord`] mirrors what the remote store returns, with every nullable
//! column explicit. [`ActivityItem::from_raw`] is the single place rows are
//! checked and joined with their owner.

use crate::error::RecordError;
use crate::friend::FriendRef;
use crate::ids::{ItemId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Highest accepted rating
pub const MAX_RATING: f32 = 10.0;

/// Category used when a row has none
pub const UNCATEGORIZED: &str = "Other";

/// One place row as stored remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Record id
    pub id: ItemId,
    /// Friend who owns the record
    pub owner_id: UserId,
    /// Place name
    pub name: Option<String>,
    /// Cuisine or place category
    pub category: Option<String>,
    /// Rating in `0..=MAX_RATING`
    pub rating: Option<f32>,
    /// Street address
    pub address: Option<String>,
    /// City
    pub city: Option<String>,
    /// Country
    pub country: Option<String>,
    /// Price tier (number of currency signs)
    pub price_tier: Option<u8>,
    /// Guide distinction level (stars)
    pub distinction_level: Option<u8>,
    /// Date of the visit
    pub visited_on: Option<NaiveDate>,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Photo storage references; empty when the projection skips photos
    #[serde(default)]
    pub photo_refs: Vec<String>,
    /// Saved for later rather than rated
    #[serde(default)]
    pub is_wishlist: bool,
}

impl RawRecord {
    /// Minimal rated row, mostly for fixtures
    #[must_use]
    pub fn new(owner_id: UserId, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ItemId::new(),
            owner_id,
            name: Some(name.into()),
            category: None,
            rating: None,
            address: None,
            city: None,
            country: None,
            price_tier: None,
            distinction_level: None,
            visited_on: None,
            created_at,
            notes: None,
            photo_refs: Vec::new(),
            is_wishlist: false,
        }
    }

    /// Whether the row counts as rated
    #[inline]
    #[must_use]
    pub fn is_rated(&self) -> bool {
        !self.is_wishlist && self.rating.is_some()
    }
}

/// Lightweight projection used for corpus-wide counting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRow {
    /// Owner of the counted row
    pub owner_id: UserId,
    /// Category
    pub category: Option<String>,
    /// City
    pub city: Option<String>,
    /// Wishlist flag
    pub is_wishlist: bool,
    /// Whether a rating is present
    pub has_rating: bool,
}

impl From<&RawRecord> for CountRow {
    fn from(raw: &RawRecord) -> Self {
        Self {
            owner_id: raw.owner_id,
            category: raw.category.clone(),
            city: raw.city.clone(),
            is_wishlist: raw.is_wishlist,
            has_rating: raw.rating.is_some(),
        }
    }
}

/// One rated-or-wishlisted place, joined with its owner
///
/// Immutable once built; a page is replaced wholesale on re-fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    /// Record id
    pub id: ItemId,
    /// Place name
    pub name: String,
    /// Category, [`UNCATEGORIZED`] when absent
    pub category: String,
    /// Rating
    pub rating: Option<f32>,
    /// Street address, possibly empty
    pub address: String,
    /// City, possibly empty
    pub city: String,
    /// Country
    pub country: Option<String>,
    /// Price tier
    pub price_tier: Option<u8>,
    /// Distinction level
    pub distinction_level: Option<u8>,
    /// Visit date
    pub visited_on: Option<NaiveDate>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Notes
    pub notes: Option<String>,
    /// Photo references
    pub photo_refs: Vec<String>,
    /// Wishlist flag
    pub is_wishlist: bool,
    /// Owner display info
    pub owner: FriendRef,
}

impl ActivityItem {
    /// Validate a raw row and attach its owner
    ///
    /// # Errors
    /// - `RecordError::UnknownOwner` if `owner.id` does not match the row
    /// - `RecordError::MissingField` if the name is absent or blank
    /// - `RecordError::InvalidRating` if the rating is not finite or out of range
    pub fn from_raw(raw: RawRecord, owner: &FriendRef) -> Result<Self, RecordError> {
        if raw.owner_id != owner.id {
            return Err(RecordError::UnknownOwner { id: raw.id });
        }

        let name = match raw.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(RecordError::MissingField {
                    id: raw.id,
                    field: "name",
                })
            }
        };

        if let Some(rating) = raw.rating {
            if !rating.is_finite() || !(0.0..=MAX_RATING).contains(&rating) {
                return Err(RecordError::InvalidRating { id: raw.id, rating });
            }
        }

        let category = raw
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());

        Ok(Self {
            id: raw.id,
            name,
            category,
            rating: raw.rating,
            address: raw.address.unwrap_or_default(),
            city: raw.city.map(|c| c.trim().to_string()).unwrap_or_default(),
            country: raw.country,
            price_tier: raw.price_tier,
            distinction_level: raw.distinction_level,
            visited_on: raw.visited_on,
            created_at: raw.created_at,
            notes: raw.notes,
            photo_refs: raw.photo_refs,
            is_wishlist: raw.is_wishlist,
            owner: owner.clone(),
        })
    }

    /// Whether the item counts as rated
    #[inline]
    #[must_use]
    pub fn is_rated(&self) -> bool {
        !self.is_wishlist && self.rating.is_some()
    }
}
