//! Dashboard statistics and the per-type breakdown report.
//!
//! The store does the grouping; the functions here only shape its output, so
//! they can be tested without a database.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::store::{Page, RecordStore, StoreError, WasteCriteria, WasteTypeTotal};
use crate::waste::model::{WasteLog, WasteType};
use crate::waste::query::{day_range, waste_type_filter};

pub const DASHBOARD_RECENT: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownEntry {
    pub waste_type: WasteType,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownReport {
    pub breakdown: Vec<BreakdownEntry>,
    pub grand_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEntry {
    pub owner_username: String,
    pub waste_type: WasteType,
    #[serde(with = "time::serde::rfc3339")]
    pub date_logged: OffsetDateTime,
    pub amount: f64,
}

impl From<WasteLog> for RecentEntry {
    fn from(log: WasteLog) -> Self {
        Self {
            owner_username: log.owner_username,
            waste_type: log.waste_type,
            date_logged: log.date_logged,
            amount: log.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_entries: u64,
    pub total_reports: u64,
    pub total_waste: f64,
    pub recent: Vec<RecentEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
    #[serde(alias = "from")]
    pub date_from: Option<String>,
    #[serde(alias = "to")]
    pub date_to: Option<String>,
    pub category: Option<String>,
}

/// `category` filters on the waste type, not on the disposal category.
pub fn report_criteria(params: &ReportParams) -> WasteCriteria {
    WasteCriteria {
        waste_type: waste_type_filter(params.category.as_deref()),
        date_range: day_range(params.date_from.as_deref(), params.date_to.as_deref()),
        ..Default::default()
    }
}

// `Sum for f64` starts from -0.0, so an empty input would serialize as `-0.0`
fn total_of(amounts: impl Iterator<Item = f64>) -> f64 {
    amounts.fold(0.0, |acc, x| acc + x)
}

/// Drops empty groups and orders the rest by waste type name.
pub fn build_breakdown(totals: Vec<WasteTypeTotal>) -> BreakdownReport {
    let mut breakdown: Vec<BreakdownEntry> = totals
        .into_iter()
        .filter(|t| t.entries > 0)
        .map(|t| BreakdownEntry {
            waste_type: t.waste_type,
            total_amount: t.total_amount,
        })
        .collect();
    breakdown.sort_by(|a, b| a.waste_type.as_str().cmp(b.waste_type.as_str()));

    let grand_total = total_of(breakdown.iter().map(|e| e.total_amount));
    BreakdownReport {
        breakdown,
        grand_total,
    }
}

pub fn assemble_dashboard(
    total_entries: u64,
    totals: &[WasteTypeTotal],
    recent: Vec<WasteLog>,
) -> DashboardStats {
    DashboardStats {
        total_entries,
        total_reports: total_entries,
        total_waste: total_of(totals.iter().map(|t| t.total_amount)),
        recent: recent.into_iter().map(RecentEntry::from).collect(),
    }
}

pub async fn dashboard_stats(store: &dyn RecordStore) -> Result<DashboardStats, StoreError> {
    let all = WasteCriteria::default();
    let (count, totals, recent) = tokio::try_join!(
        store.count_waste_logs(&all),
        store.waste_totals_by_type(&all),
        store.find_waste_logs(
            &all,
            Some(Page {
                skip: 0,
                limit: DASHBOARD_RECENT,
            }),
        ),
    )?;
    Ok(assemble_dashboard(count, &totals, recent))
}

pub async fn breakdown_report(
    store: &dyn RecordStore,
    params: &ReportParams,
) -> Result<BreakdownReport, StoreError> {
    let criteria = report_criteria(params);
    debug!(criteria = ?criteria, "building breakdown report");
    let totals = store.waste_totals_by_type(&criteria).await?;
    Ok(build_breakdown(totals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::users::model::{NewUser, Role, User};
    use crate::waste::model::{Category, NewWasteLog};
    use time::macros::datetime;
    use time::Duration;

    fn total(waste_type: WasteType, amount: f64, entries: u64) -> WasteTypeTotal {
        WasteTypeTotal {
            waste_type,
            total_amount: amount,
            entries,
        }
    }

    async fn seed(store: &MemoryStore, logs: &[(WasteType, f64, OffsetDateTime)]) -> User {
        let owner = store
            .insert_user(
                NewUser {
                    username: "dana".into(),
                    email: "dana@example.com".into(),
                    password_hash: "x".into(),
                    role: Role::User,
                }
                .build(),
            )
            .await
            .unwrap();
        for &(waste_type, amount, when) in logs {
            let log = NewWasteLog {
                waste_type,
                category: Category::Trash,
                amount,
                date_logged: Some(when),
            }
            .build(&owner);
            store.insert_waste(log).await.unwrap();
        }
        owner
    }

    #[test]
    fn breakdown_skips_empty_groups_and_sorts_by_name() {
        let report = build_breakdown(vec![
            total(WasteType::RadioActive, 1.0, 1),
            total(WasteType::Hazardous, 0.0, 0),
            total(WasteType::Biodegradable, 2.5, 3),
        ]);
        let names: Vec<&str> = report.breakdown.iter().map(|e| e.waste_type.as_str()).collect();
        assert_eq!(names, vec!["Biodegradable", "RadioActive"]);
        assert_eq!(report.grand_total, 3.5);
    }

    #[test]
    fn empty_totals_give_empty_report() {
        let report = build_breakdown(Vec::new());
        assert!(report.breakdown.is_empty());
        assert_eq!(report.grand_total, 0.0);

        let stats = assemble_dashboard(0, &[], Vec::new());
        assert_eq!(stats.total_waste, 0.0);
        assert_eq!(stats.total_reports, 0);
    }

    #[test]
    fn empty_totals_are_positive_zero() {
        let report = build_breakdown(Vec::new());
        assert!(report.grand_total.is_sign_positive());
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"breakdown":[],"grandTotal":0.0}"#
        );

        let stats = assemble_dashboard(0, &[], Vec::new());
        assert!(stats.total_waste.is_sign_positive());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalWaste"].to_string(), "0.0");
    }

    #[test]
    fn legacy_radio_active_spelling_filters_reports() {
        let params = ReportParams {
            category: Some("Radio Active".into()),
            ..Default::default()
        };
        assert_eq!(report_criteria(&params).waste_type.as_deref(), Some("RadioActive"));
    }

    #[tokio::test]
    async fn deleting_an_owner_leaves_reports_untouched() {
        let store = MemoryStore::new();
        let owner = seed(&store, &[(WasteType::Hazardous, 7.0, datetime!(2024-04-01 10:00 UTC))]).await;

        let before = dashboard_stats(&store).await.unwrap();
        assert!(store.delete_user(owner.id).await.unwrap());
        let after = dashboard_stats(&store).await.unwrap();

        assert_eq!(after, before);
        assert_eq!(after.total_waste, 7.0);
        let report = breakdown_report(&store, &ReportParams::default()).await.unwrap();
        assert_eq!(report.grand_total, 7.0);
    }

    #[test]
    fn category_param_filters_waste_type() {
        let params = ReportParams {
            category: Some("Hazardous".into()),
            date_from: Some("2024-01-01".into()),
            ..Default::default()
        };
        let criteria = report_criteria(&params);
        assert_eq!(criteria.waste_type.as_deref(), Some("Hazardous"));
        assert_eq!(criteria.category, None);
        assert_eq!(criteria.date_range.from, Some(datetime!(2024-01-01 0:00 UTC)));
    }

    #[tokio::test]
    async fn breakdown_groups_by_type_within_range() {
        let store = MemoryStore::new();
        seed(
            &store,
            &[
                (WasteType::Biodegradable, 5.0, datetime!(2024-03-01 9:00 UTC)),
                (WasteType::Biodegradable, 10.0, datetime!(2024-03-02 23:59:59.999 UTC)),
                (WasteType::Hazardous, 3.0, datetime!(2024-03-02 12:00 UTC)),
                (WasteType::Hazardous, 7.0, datetime!(2024-03-03 0:00 UTC)),
            ],
        )
        .await;

        let params = ReportParams {
            date_from: Some("2024-03-01".into()),
            date_to: Some("2024-03-02".into()),
            ..Default::default()
        };
        let report = breakdown_report(&store, &params).await.unwrap();
        assert_eq!(
            report.breakdown,
            vec![
                BreakdownEntry {
                    waste_type: WasteType::Biodegradable,
                    total_amount: 15.0,
                },
                BreakdownEntry {
                    waste_type: WasteType::Hazardous,
                    total_amount: 3.0,
                },
            ]
        );
        assert_eq!(report.grand_total, 18.0);
    }

    #[tokio::test]
    async fn dashboard_counts_sums_and_lists_recent() {
        let store = MemoryStore::new();
        let start = datetime!(2024-05-01 8:00 UTC);
        let logs: Vec<_> = (0..12)
            .map(|day| (WasteType::Biodegradable, 1.5, start + Duration::days(day)))
            .collect();
        seed(&store, &logs).await;

        let stats = dashboard_stats(&store).await.unwrap();
        assert_eq!(stats.total_entries, 12);
        assert_eq!(stats.total_reports, 12);
        assert_eq!(stats.total_waste, 18.0);
        assert_eq!(stats.recent.len(), 10);
        assert_eq!(stats.recent[0].date_logged, start + Duration::days(11));
        assert_eq!(stats.recent[0].owner_username, "dana");
    }
}
