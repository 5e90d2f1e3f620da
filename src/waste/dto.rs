use serde::{Deserialize, Serialize};

use super::model::{Category, NewWasteLog, WasteLog, WasteLogChanges, WasteType};
use crate::error::FieldError;
use crate::validation::{parse_timestamp, Validate};

/// Body of `POST /waste`. Fields stay raw until validated so each bad field is
/// reported by name.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWasteRequest {
    pub waste_type: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub date_logged: Option<String>,
}

/// Body of `PUT /waste/:id`. Ownership fields are not accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWasteRequest {
    pub waste_type: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub date_logged: Option<String>,
}

fn check_waste_type(raw: &str, errors: &mut Vec<FieldError>) -> Option<WasteType> {
    let parsed = WasteType::parse(raw);
    if parsed.is_none() {
        errors.push(FieldError::new("wasteType", "Invalid wasteType"));
    }
    parsed
}

fn check_category(raw: &str, errors: &mut Vec<FieldError>) -> Option<Category> {
    let parsed = Category::parse(raw);
    if parsed.is_none() {
        errors.push(FieldError::new("category", "Invalid category"));
    }
    parsed
}

fn check_amount(amount: f64, errors: &mut Vec<FieldError>) -> Option<f64> {
    if amount.is_finite() && amount > 0.0 {
        Some(amount)
    } else {
        errors.push(FieldError::new("amount", "Amount must be > 0"));
        None
    }
}

fn check_date(raw: &str, errors: &mut Vec<FieldError>) -> Option<time::OffsetDateTime> {
    let parsed = parse_timestamp(raw);
    if parsed.is_none() {
        errors.push(FieldError::new("dateLogged", "Invalid dateLogged"));
    }
    parsed
}

impl CreateWasteRequest {
    pub fn parse(&self) -> Result<NewWasteLog, Vec<FieldError>> {
        let mut errors = Vec::new();
        let waste_type = match self.waste_type.as_deref() {
            Some(raw) => check_waste_type(raw, &mut errors),
            None => {
                errors.push(FieldError::new("wasteType", "Invalid wasteType"));
                None
            }
        };
        let category = match self.category.as_deref() {
            Some(raw) => check_category(raw, &mut errors),
            None => {
                errors.push(FieldError::new("category", "Invalid category"));
                None
            }
        };
        let amount = check_amount(self.amount.unwrap_or(0.0), &mut errors);
        let date_logged = self
            .date_logged
            .as_deref()
            .and_then(|raw| check_date(raw, &mut errors));

        match (waste_type, category, amount) {
            (Some(waste_type), Some(category), Some(amount)) if errors.is_empty() => Ok(NewWasteLog {
                waste_type,
                category,
                amount,
                date_logged,
            }),
            _ => Err(errors),
        }
    }
}

impl Validate for CreateWasteRequest {
    fn validate(&self) -> Vec<FieldError> {
        self.parse().err().unwrap_or_default()
    }
}

impl UpdateWasteRequest {
    pub fn parse(&self) -> Result<WasteLogChanges, Vec<FieldError>> {
        let mut errors = Vec::new();
        let changes = WasteLogChanges {
            waste_type: self
                .waste_type
                .as_deref()
                .and_then(|raw| check_waste_type(raw, &mut errors)),
            category: self
                .category
                .as_deref()
                .and_then(|raw| check_category(raw, &mut errors)),
            amount: self.amount.and_then(|a| check_amount(a, &mut errors)),
            date_logged: self
                .date_logged
                .as_deref()
                .and_then(|raw| check_date(raw, &mut errors)),
        };
        if errors.is_empty() {
            Ok(changes)
        } else {
            Err(errors)
        }
    }
}

impl Validate for UpdateWasteRequest {
    fn validate(&self) -> Vec<FieldError> {
        self.parse().err().unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub log: WasteLog,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<WasteLog>,
}

/// One page of a listing plus the independently counted total.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WastePage {
    pub logs: Vec<WasteLog>,
    pub total: u64,
    pub page: u64,
    pub page_size: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    pub limit: Option<String>,
}
