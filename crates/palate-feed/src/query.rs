//! Query construction with predicate pushdown
//!
//! [`QueryBuilder::build`] turns owner ids plus a [`FilterState`] into a
//! [`RemoteQuery`]. Predicates are emitted in a fixed precedence:
//!
//! 1. owner scope (the roster)
//! 2. status (`rated` / `wishlist`)
//! 3. search, a case-insensitive OR across name, category and city
//! 4. membership on categories, cities and owners
//!
//! The builder is a pure function of its inputs, so the query for a
//! prefetch at `offset + page_size` differs from the foreground query only
//! in its offset.

use palate_model::{ActivityItem, FilterState, RawRecord, SortKey, StatusFilter, UserId, UNCATEGORIZED};
use serde::Serialize;
use std::cmp::Ordering;

/// Column names understood by the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Record id
    Id,
    /// Owner id
    OwnerId,
    /// Place name
    Name,
    /// Category
    Category,
    /// City
    City,
    /// Rating
    Rating,
    /// Wishlist flag
    IsWishlist,
    /// Creation time
    CreatedAt,
}

impl Field {
    /// Text value of a record for text-comparable fields
    #[must_use]
    pub fn text<'a>(&self, record: &'a RawRecord) -> Option<&'a str> {
        match self {
            Self::Name => record.name.as_deref(),
            Self::Category => Some(
                record
                    .category
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .unwrap_or(UNCATEGORIZED),
            ),
            Self::City => record.city.as_deref().map(str::trim),
            _ => None,
        }
    }
}

/// One conjunct of a remote query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Predicate {
    /// `owner_id IN (...)`
    OwnerIn {
        /// Accepted owners
        owners: Vec<UserId>,
    },
    /// `is_wishlist = value`
    IsWishlist {
        /// Required flag
        value: bool,
    },
    /// `rating IS NOT NULL`
    RatingPresent,
    /// `field IN (...)`
    FieldIn {
        /// Compared column
        field: Field,
        /// Accepted values
        values: Vec<String>,
    },
    /// `lower(f1) LIKE %needle% OR lower(f2) LIKE %needle% ...`
    AnyContains {
        /// Searched columns
        fields: Vec<Field>,
        /// Lowercase needle
        needle: String,
    },
}

impl Predicate {
    /// Evaluate against a record, with the same semantics a store must apply
    #[must_use]
    pub fn matches(&self, record: &RawRecord) -> bool {
        match self {
            Self::OwnerIn { owners } => owners.contains(&record.owner_id),
            Self::IsWishlist { value } => record.is_wishlist == *value,
            Self::RatingPresent => record.rating.is_some(),
            Self::FieldIn { field, values } => field
                .text(record)
                .is_some_and(|v| values.iter().any(|accepted| accepted == v)),
            Self::AnyContains { fields, needle } => fields.iter().any(|field| {
                field
                    .text(record)
                    .is_some_and(|v| v.to_lowercase().contains(needle.as_str()))
            }),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

/// One ordering term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    /// Sorted column
    pub field: Field,
    /// Direction
    pub direction: Direction,
    /// Whether nulls sort after every value regardless of direction
    pub nulls_last: bool,
}

impl SortSpec {
    const fn desc(field: Field) -> Self {
        Self {
            field,
            direction: Direction::Desc,
            nulls_last: true,
        }
    }

    const fn asc(field: Field) -> Self {
        Self {
            field,
            direction: Direction::Asc,
            nulls_last: true,
        }
    }

    /// Compare two records under this term
    #[must_use]
    pub fn compare(&self, a: &RawRecord, b: &RawRecord) -> Ordering {
        let directed = |o: Ordering| match self.direction {
            Direction::Asc => o,
            Direction::Desc => o.reverse(),
        };
        match self.field {
            Field::Rating => match (a.rating, b.rating) {
                (Some(x), Some(y)) => directed(x.total_cmp(&y)),
                (Some(_), None) if self.nulls_last => Ordering::Less,
                (None, Some(_)) if self.nulls_last => Ordering::Greater,
                (x, y) => directed(x.is_some().cmp(&y.is_some())),
            },
            Field::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
            Field::Id => directed(a.id.cmp(&b.id)),
            Field::OwnerId => directed(a.owner_id.cmp(&b.owner_id)),
            Field::IsWishlist => directed(a.is_wishlist.cmp(&b.is_wishlist)),
            Field::Name | Field::Category | Field::City => {
                let x = self.field.text(a).map(str::to_lowercase);
                let y = self.field.text(b).map(str::to_lowercase);
                directed(x.cmp(&y))
            }
        }
    }
}

/// Which record columns a page query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Projection {
    /// Whether photo references are included
    pub include_photos: bool,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            include_photos: true,
        }
    }
}

/// Columns read by the counting query; never full records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountProjection {
    /// Projected columns
    pub fields: Vec<Field>,
}

impl Default for CountProjection {
    fn default() -> Self {
        Self {
            fields: vec![Field::Category, Field::City, Field::IsWishlist, Field::Rating],
        }
    }
}

/// A remote page query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteQuery {
    /// Conjunction of predicates
    pub predicates: Vec<Predicate>,
    /// Ordering terms, most significant first
    pub sort: Vec<SortSpec>,
    /// Rows to skip
    pub offset: usize,
    /// Maximum rows to return
    pub limit: usize,
    /// Returned columns
    pub projection: Projection,
}

impl RemoteQuery {
    /// Whether a record satisfies every predicate
    #[must_use]
    pub fn matches(&self, record: &RawRecord) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }

    /// Total order over records defined by the sort terms
    #[must_use]
    pub fn compare(&self, a: &RawRecord, b: &RawRecord) -> Ordering {
        self.sort
            .iter()
            .map(|spec| spec.compare(a, b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// A remote query plus the ordering to finish after owner enrichment
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// What is sent to the store
    pub query: RemoteQuery,
    /// Client-side ordering applied to the fetched page, if any
    pub client_sort: Option<SortKey>,
}

/// Builds [`RemoteQuery`]s from filter state
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder {
    projection: Projection,
}

impl QueryBuilder {
    /// Create a builder with a fixed projection
    #[inline]
    #[must_use]
    pub fn new(projection: Projection) -> Self {
        Self { projection }
    }

    /// Build the query for one page window
    #[must_use]
    pub fn build(
        &self,
        owner_ids: &[UserId],
        filter: &FilterState,
        offset: usize,
        limit: usize,
    ) -> QueryPlan {
        let mut predicates = vec![Predicate::OwnerIn {
            owners: owner_ids.to_vec(),
        }];

        match filter.status {
            StatusFilter::All => {}
            StatusFilter::Rated => {
                predicates.push(Predicate::IsWishlist { value: false });
                predicates.push(Predicate::RatingPresent);
            }
            StatusFilter::Wishlist => predicates.push(Predicate::IsWishlist { value: true }),
        }

        if let Some(needle) = filter.search_needle() {
            predicates.push(Predicate::AnyContains {
                fields: vec![Field::Name, Field::Category, Field::City],
                needle,
            });
        }

        if !filter.cities.is_empty() {
            predicates.push(Predicate::FieldIn {
                field: Field::City,
                values: filter.cities.iter().cloned().collect(),
            });
        }
        if !filter.categories.is_empty() {
            predicates.push(Predicate::FieldIn {
                field: Field::Category,
                values: filter.categories.iter().cloned().collect(),
            });
        }
        if !filter.owners.is_empty() {
            predicates.push(Predicate::OwnerIn {
                owners: filter.owners.iter().copied().collect(),
            });
        }

        let mut sort = match filter.sort_key {
            SortKey::Rating => vec![SortSpec::desc(Field::Rating), SortSpec::desc(Field::CreatedAt)],
            SortKey::Recent | SortKey::Alphabetical | SortKey::Owner => {
                vec![SortSpec::desc(Field::CreatedAt)]
            }
        };
        // Unique tie-break keeps offset windows disjoint.
        sort.push(SortSpec::asc(Field::Id));

        QueryPlan {
            query: RemoteQuery {
                predicates,
                sort,
                offset,
                limit,
                projection: self.projection,
            },
            client_sort: filter.sort_key.needs_client_sort().then_some(filter.sort_key),
        }
    }
}

/// Finish an ordering that needs owner display names
pub fn sort_client_side(items: &mut [ActivityItem], key: SortKey) {
    match key {
        SortKey::Alphabetical => items.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortKey::Owner => items.sort_by(|a, b| {
            a.owner
                .label()
                .to_lowercase()
                .cmp(&b.owner.label().to_lowercase())
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortKey::Recent | SortKey::Rating => {}
    }
}
