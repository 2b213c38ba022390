//! Shareable feed locations
//!
//! A [`FeedLocation`] is a filter state plus a page number, encoded as a URL
//! query string so a view can be deep-linked:
//!
//! ```text
//! q=ramen&sort=rating&status=rated&categories=Japanese,Korean&cities=Oslo&owners=<uuid>,<uuid>&page=2
//! ```
//!
//! Every key is optional and omitted keys take their defaults. Sets are
//! comma-joined, so set members cannot themselves contain commas.

use crate::error::LocationError;
use crate::filter::{FilterState, SortKey, StatusFilter};
use crate::ids::UserId;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;

/// A filtered, paginated view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLocation {
    /// Filter state
    pub filter: FilterState,
    /// 1-based page number
    pub page: usize,
}

impl FeedLocation {
    /// Create a location; page 0 is treated as page 1
    #[must_use]
    pub fn new(filter: FilterState, page: usize) -> Self {
        Self {
            filter,
            page: page.max(1),
        }
    }

    /// Encode as a query string without the leading `?`
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        let f = &self.filter;

        let search = f.search_text.trim();
        if !search.is_empty() {
            out.append_pair("q", search);
        }
        if f.sort_key != SortKey::default() {
            out.append_pair("sort", f.sort_key.as_str());
        }
        if f.status != StatusFilter::default() {
            out.append_pair("status", f.status.as_str());
        }
        if !f.categories.is_empty() {
            out.append_pair("categories", &join(f.categories.iter()));
        }
        if !f.cities.is_empty() {
            out.append_pair("cities", &join(f.cities.iter()));
        }
        if !f.owners.is_empty() {
            out.append_pair("owners", &join(f.owners.iter().map(ToString::to_string)));
        }
        if self.page > 1 {
            out.append_pair("page", &self.page.to_string());
        }

        out.finish()
    }
}

impl Default for FeedLocation {
    fn default() -> Self {
        Self::new(FilterState::default(), 1)
    }
}

impl fmt::Display for FeedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl FromStr for FeedLocation {
    type Err = LocationError;

    /// Decode a query string; a leading `?` is accepted and unknown keys are ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let query = s.trim().trim_start_matches('?');
        let mut filter = FilterState::default();
        let mut page = 1;

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "q" => filter.search_text = value.trim().to_string(),
                "sort" => {
                    filter.sort_key = value.parse().map_err(LocationError::UnknownSort)?;
                }
                "status" => {
                    filter.status = value.parse().map_err(LocationError::UnknownStatus)?;
                }
                "categories" => filter.categories = split(&value).collect(),
                "cities" => filter.cities = split(&value).collect(),
                "owners" => filter.owners = parse_owners(&value)?,
                "page" => {
                    page = value
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .filter(|p| *p >= 1)
                        .ok_or_else(|| LocationError::InvalidPage(value.to_string()))?;
                }
                _ => {}
            }
        }

        Ok(Self { filter, page })
    }
}

fn join<I, S>(parts: I) -> String
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn split(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
}

fn parse_owners(value: &str) -> Result<BTreeSet<UserId>, LocationError> {
    split(value)
        .map(|part| {
            part.parse::<UserId>()
                .map_err(|_| LocationError::InvalidOwner(part))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterPatch;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_location_is_empty_string() {
        assert_eq!(FeedLocation::default().to_query_string(), "");
        assert_eq!("".parse::<FeedLocation>().unwrap(), FeedLocation::default());
    }

    #[test]
    fn full_location_survives_encoding() {
        let owner = UserId::new();
        let mut filter = FilterState::new();
        filter.apply(
            FilterPatch::new()
                .search("dim sum & tea")
                .sort(SortKey::Owner)
                .status(StatusFilter::Rated)
                .categories(["Chinese", "Tea House"])
                .cities(["São Paulo"])
                .owners([owner]),
        );
        let location = FeedLocation::new(filter, 3);

        let encoded = location.to_query_string();
        assert!(encoded.contains("page=3"));
        assert!(encoded.contains("sort=owner"));

        let decoded: FeedLocation = format!("?{encoded}").parse().unwrap();
        assert_eq!(decoded, location);
    }

    #[test]
    fn sets_tolerate_blank_members() {
        let loc: FeedLocation = "cities=Oslo,,%20Bergen%20".parse().unwrap();
        let cities: Vec<_> = loc.filter.cities.into_iter().collect();
        assert_eq!(cities, vec!["Bergen".to_string(), "Oslo".to_string()]);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert_eq!(
            "sort=spiciest".parse::<FeedLocation>(),
            Err(LocationError::UnknownSort("spiciest".into()))
        );
        assert!(matches!(
            "owners=nope".parse::<FeedLocation>(),
            Err(LocationError::InvalidOwner(_))
        ));
        assert!(matches!(
            "page=0".parse::<FeedLocation>(),
            Err(LocationError::InvalidPage(_))
        ));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let loc: FeedLocation = "utm_source=mail&status=wishlist".parse().unwrap();
        assert_eq!(loc.filter.status, StatusFilter::Wishlist);
    }
}
