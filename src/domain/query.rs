// src/domain/query.rs

use crate::domain::lead::{City, PropertyType, Status, Timeline};
use crate::errors::ServerError;
use serde::Serialize;
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Exact-match filters plus free-text search. `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFilter {
    pub city: Option<City>,
    pub property_type: Option<PropertyType>,
    pub status: Option<Status>,
    pub timeline: Option<Timeline>,
    /// Case-insensitive substring over full name, phone and email.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    FullName,
    Phone,
    Email,
    City,
    PropertyType,
    Status,
    Timeline,
    BudgetMin,
    BudgetMax,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::FullName => "full_name",
            SortField::Phone => "phone",
            SortField::Email => "email",
            SortField::City => "city",
            SortField::PropertyType => "property_type",
            SortField::Status => "status",
            SortField::Timeline => "timeline",
            SortField::BudgetMin => "budget_min",
            SortField::BudgetMax => "budget_max",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

impl FromStr for SortField {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "fullName" => SortField::FullName,
            "phone" => SortField::Phone,
            "email" => SortField::Email,
            "city" => SortField::City,
            "propertyType" => SortField::PropertyType,
            "status" => SortField::Status,
            "timeline" => SortField::Timeline,
            "budgetMin" => SortField::BudgetMin,
            "budgetMax" => SortField::BudgetMax,
            "createdAt" => SortField::CreatedAt,
            "updatedAt" => SortField::UpdatedAt,
            other => {
                return Err(ServerError::BadRequest(format!(
                    "cannot sort by '{other}'"
                )))
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "asc" => Ok(SortOrder::Asc),
            "-1" | "desc" => Ok(SortOrder::Desc),
            other => Err(ServerError::BadRequest(format!(
                "sortOrder must be 1, -1, asc or desc, got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeadQuery {
    pub filter: LeadFilter,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    /// 1-based.
    pub page: i64,
    pub limit: i64,
}

impl Default for LeadQuery {
    fn default() -> Self {
        Self {
            filter: LeadFilter::default(),
            sort_by: SortField::UpdatedAt,
            sort_order: SortOrder::Desc,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl LeadQuery {
    /// Parses `?city=..&status=..&search=..&sortBy=..&sortOrder=..&page=..&limit=..`.
    /// Blank parameters are treated as absent; unknown parameters are ignored.
    pub fn from_query_string(query: Option<&str>) -> Result<Self, ServerError> {
        let mut parsed = LeadQuery::default();
        let Some(query) = query else {
            return Ok(parsed);
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "city" => parsed.filter.city = Some(parse_enum("city", value)?),
                "propertyType" => {
                    parsed.filter.property_type = Some(parse_enum("propertyType", value)?)
                }
                "status" => parsed.filter.status = Some(parse_enum("status", value)?),
                "timeline" => parsed.filter.timeline = Some(parse_enum("timeline", value)?),
                "search" => parsed.filter.search = Some(value.to_string()),
                "sortBy" => parsed.sort_by = value.parse()?,
                "sortOrder" => parsed.sort_order = value.parse()?,
                "page" => parsed.page = parse_number("page", value)?.max(1),
                "limit" => parsed.limit = parse_number("limit", value)?.clamp(1, MAX_PAGE_SIZE),
                _ => {}
            }
        }

        Ok(parsed)
    }

    /// Rows to skip. Saturates, so an absurd page reads past the end.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn parse_enum<T: FromStr<Err = String>>(name: &str, value: &str) -> Result<T, ServerError> {
    value
        .parse()
        .map_err(|e| ServerError::BadRequest(format!("{name}: {e}")))
}

fn parse_number(name: &str, value: &str) -> Result<i64, ServerError> {
    value
        .parse()
        .map_err(|_| ServerError::BadRequest(format!("{name} must be a whole number")))
}

/// `ceil(total / limit)`; zero results means zero pages.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// One page of results plus the counts a list view needs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub count: usize,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, query: &LeadQuery) -> Self {
        Self {
            count: data.len(),
            total,
            total_pages: total_pages(total, query.limit),
            current_page: query.page,
            data,
        }
    }
}
