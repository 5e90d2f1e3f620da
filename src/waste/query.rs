//! Turns raw listing parameters into bounded store criteria. Nothing here
//! rejects input: malformed numbers fall back to defaults, malformed dates are
//! dropped.

use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{policy::scope_filter, principal::Principal};
use crate::store::{DateRange, Page, WasteCriteria};
use crate::validation::parse_date;
use crate::waste::model::WasteType;

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
pub const MAX_RECENT_LIMIT: u64 = 50;
/// Largest page whose offset still fits a signed 64-bit `OFFSET`.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_LIMIT + 1;

/// Query string of `GET /waste`, kept as raw text so nothing is rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub waste_type: Option<String>,
    #[serde(alias = "userId")]
    pub owner_id: Option<String>,
    #[serde(alias = "from")]
    pub date_from: Option<String>,
    #[serde(alias = "to")]
    pub date_to: Option<String>,
    #[serde(alias = "q")]
    pub text_query: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub skip: u64,
}

impl Pagination {
    /// `page` below 1 or unparsable becomes 1 and is capped at `MAX_PAGE`;
    /// `limit` is clamped into `[1, MAX_LIMIT]` and defaults to `DEFAULT_LIMIT`.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = parse_int(page)
            .filter(|p| *p >= 1)
            .map_or(1, |p| (p as u64).min(MAX_PAGE));
        let limit = parse_int(limit)
            .map(|l| l.clamp(1, MAX_LIMIT as i64) as u64)
            .unwrap_or(DEFAULT_LIMIT);
        Self {
            page,
            limit,
            skip: (page - 1) * limit,
        }
    }

    pub fn as_page(&self) -> Page {
        Page {
            skip: self.skip,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub criteria: WasteCriteria,
    pub pagination: Pagination,
}

/// Reads the leading integer of `raw`, so `"2.5"` is 2 and `"20abc"` is 20.
/// Digits past the range of `i64` saturate.
fn parse_int(raw: Option<&str>) -> Option<i64> {
    let s = raw?.trim();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

pub(crate) fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Canonical waste type name for a filter. The legacy `Radio Active`
/// spelling maps to `RadioActive`; unknown names are kept and match nothing.
pub(crate) fn waste_type_filter(raw: Option<&str>) -> Option<String> {
    non_blank(raw).map(|raw| {
        WasteType::parse(raw).map_or_else(|| raw.to_string(), |t| t.as_str().to_string())
    })
}

/// `from` starts at 00:00:00.000 UTC of its day, `to` ends at 23:59:59.999.
pub fn day_range(from: Option<&str>, to: Option<&str>) -> DateRange {
    DateRange {
        from: non_blank(from)
            .and_then(parse_date)
            .map(|d| d.midnight().assume_utc()),
        to: non_blank(to)
            .and_then(parse_date)
            .and_then(|d| d.with_hms_milli(23, 59, 59, 999).ok())
            .map(|dt| dt.assume_utc()),
    }
}

/// Limit for `GET /waste/recent`: `[1, MAX_RECENT_LIMIT]`, default `DEFAULT_LIMIT`.
pub fn recent_limit(raw: Option<&str>) -> u64 {
    parse_int(raw)
        .map(|l| l.clamp(1, MAX_RECENT_LIMIT as i64) as u64)
        .unwrap_or(DEFAULT_LIMIT)
}

/// Builds listing criteria. The owner scope is resolved last through the
/// access policy, so a non-admin never widens it with `ownerId`.
pub fn normalize(principal: &Principal, params: &WasteListParams) -> NormalizedQuery {
    let pagination = Pagination::from_raw(params.page.as_deref(), params.limit.as_deref());

    let mut criteria = WasteCriteria {
        category: non_blank(params.category.as_deref()).map(str::to_string),
        waste_type: waste_type_filter(params.waste_type.as_deref()),
        date_range: day_range(params.date_from.as_deref(), params.date_to.as_deref()),
        owner_username_contains: non_blank(params.text_query.as_deref()).map(str::to_string),
        ..Default::default()
    };

    // An unparsable owner id matches no account
    let requested_owner = non_blank(params.owner_id.as_deref())
        .map(|raw| Uuid::parse_str(raw).unwrap_or_else(|_| Uuid::nil()));
    criteria.owner = scope_filter(principal, requested_owner);

    NormalizedQuery {
        criteria,
        pagination,
    }
}
