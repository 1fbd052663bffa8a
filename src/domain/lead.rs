// src/domain/lead.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

string_enum!(City {
    Chandigarh => "Chandigarh",
    Mohali => "Mohali",
    Zirakpur => "Zirakpur",
    Panchkula => "Panchkula",
    Other => "Other",
});

string_enum!(PropertyType {
    Apartment => "Apartment",
    Villa => "Villa",
    Plot => "Plot",
    Office => "Office",
    Retail => "Retail",
});

string_enum!(Bhk {
    One => "1",
    Two => "2",
    Three => "3",
    Four => "4",
    Studio => "Studio",
});

string_enum!(Purpose {
    Buy => "Buy",
    Rent => "Rent",
});

string_enum!(Timeline {
    UpToThreeMonths => "0-3m",
    ThreeToSixMonths => "3-6m",
    OverSixMonths => ">6m",
    Exploring => "Exploring",
});

string_enum!(Source {
    Website => "Website",
    Referral => "Referral",
    WalkIn => "Walk-in",
    Call => "Call",
    Other => "Other",
});

string_enum!(
    /// Position of a lead in the sales pipeline.
    Status {
        New => "New",
        Qualified => "Qualified",
        Contacted => "Contacted",
        Visited => "Visited",
        Negotiation => "Negotiation",
        Converted => "Converted",
        Dropped => "Dropped",
    }
);

impl PropertyType {
    /// Only residential units are described by a BHK count.
    pub fn allows_bhk(self) -> bool {
        matches!(self, PropertyType::Apartment | PropertyType::Villa)
    }
}

/// A validated, normalized buyer lead that has not been stored yet.
///
/// Produced only by [`crate::domain::schema::validate`], so every value here
/// already satisfies the field and cross-field rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDraft {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub city: City,
    pub property_type: PropertyType,
    pub bhk: Option<Bhk>,
    pub purpose: Purpose,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub timeline: Timeline,
    pub source: Source,
    pub status: Status,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub owner_id: String,
}

/// A buyer lead as stored in the `buyers` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    #[serde(flatten)]
    pub fields: LeadDraft,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Assigns a fresh identifier and stamps both timestamps with `now`.
    pub fn new(fields: LeadDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// The lead's attributes keyed by wire name, `null` for absent values.
    pub fn attributes(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(&self.fields)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}
