use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::model::User;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WasteType {
    Biodegradable,
    #[serde(rename = "Non-Biodegradable")]
    NonBiodegradable,
    Hazardous,
    #[serde(rename = "RadioActive", alias = "Radio Active")]
    RadioActive,
}

impl WasteType {
    pub const ALL: [WasteType; 4] = [
        WasteType::Biodegradable,
        WasteType::NonBiodegradable,
        WasteType::Hazardous,
        WasteType::RadioActive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WasteType::Biodegradable => "Biodegradable",
            WasteType::NonBiodegradable => "Non-Biodegradable",
            WasteType::Hazardous => "Hazardous",
            WasteType::RadioActive => "RadioActive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Radio Active" => Some(WasteType::RadioActive),
            other => Self::ALL.into_iter().find(|t| t.as_str() == other),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Compostable,
    Recycle,
    Trash,
    Hazard,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Compostable,
        Category::Recycle,
        Category::Trash,
        Category::Hazard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Compostable => "Compostable",
            Category::Recycle => "Recycle",
            Category::Trash => "Trash",
            Category::Hazard => "Hazard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }
}

/// A single disposal event.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WasteLog {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_username: String, // snapshot taken at creation, not kept in sync
    pub waste_type: WasteType,
    pub category: Category,
    pub amount: f64,
    pub total_weight: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub date_logged: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Input for creating a log on behalf of its owner.
#[derive(Debug, Clone)]
pub struct NewWasteLog {
    pub waste_type: WasteType,
    pub category: Category,
    pub amount: f64,
    pub date_logged: Option<OffsetDateTime>,
}

impl NewWasteLog {
    /// Builds the record. `total_weight` starts equal to `amount` and is never
    /// derived again; `date_logged` falls back to the creation time.
    pub fn build(self, owner: &User) -> WasteLog {
        let now = OffsetDateTime::now_utc();
        WasteLog {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            owner_username: owner.username.clone(),
            waste_type: self.waste_type,
            category: self.category,
            amount: self.amount,
            total_weight: self.amount,
            date_logged: self.date_logged.unwrap_or(now),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Mutable subset of a log. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct WasteLogChanges {
    pub waste_type: Option<WasteType>,
    pub category: Option<Category>,
    pub amount: Option<f64>,
    pub date_logged: Option<OffsetDateTime>,
}

impl WasteLog {
    pub fn apply(&mut self, changes: WasteLogChanges) {
        if let Some(waste_type) = changes.waste_type {
            self.waste_type = waste_type;
        }
        if let Some(category) = changes.category {
            self.category = category;
        }
        if let Some(amount) = changes.amount {
            self.amount = amount;
        }
        if let Some(date_logged) = changes.date_logged {
            self.date_logged = date_logged;
        }
        self.updated_at = OffsetDateTime::now_utc();
    }
}
