use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiResult;
use super::models::{decode, DeleteOutcome};
use super::transport::{ApiRequest, Transport};

pub const RECORD_PATH: &str = "/api/budget/record";
pub const RECORD_DELETE_PATH: &str = "/api/budget/record/delete";
pub const RECORDS_PATH: &str = "/api/budget/records";
pub const SUMMARY_PATH: &str = "/api/budget/summary";
pub const ANALYZE_PATH: &str = "/api/budget/analyze";
pub const REALLOCATE_PATH: &str = "/api/budget/reallocate";
pub const DAY_UPDATE_PATH: &str = "/api/budget/day/update";
pub const DAY_ADJUST_PATH: &str = "/api/budget/day/adjust";
pub const DAY_RESET_PATH: &str = "/api/budget/day/reset";

/// A single expense (negative amount) or income entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub category: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itinerary_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddRecordOutcome {
    pub status: String,
    #[serde(default)]
    pub record: Option<BudgetRecord>,
}

#[derive(Debug, Deserialize)]
struct RecordsPage {
    #[serde(default)]
    records: Vec<BudgetRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    #[default]
    Equal,
    Proportional,
    Ai,
}

impl AllocationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationMode::Equal => "equal",
            AllocationMode::Proportional => "proportional",
            AllocationMode::Ai => "ai",
        }
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "equal" => Ok(AllocationMode::Equal),
            "proportional" => Ok(AllocationMode::Proportional),
            "ai" => Ok(AllocationMode::Ai),
            other => Err(format!("unknown allocation mode: {other}")),
        }
    }
}

/// Identifies one day of an itinerary, by 1-based index or by calendar date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl DayTarget {
    pub fn index(day_index: u32) -> Self {
        Self {
            day_index: Some(day_index),
            date: None,
        }
    }

    pub fn date(date: NaiveDate) -> Self {
        Self {
            day_index: None,
            date: Some(date),
        }
    }
}

/// Client-held figures for an AI reallocation. Any field left as `None`
/// falls back to what the backend has stored for the itinerary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiReallocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_budget: Option<f64>,
    /// Only expenses (negative amounts) with a date count toward a day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<BudgetRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_budgets: Option<Vec<f64>>,
}

impl AiReallocation {
    pub fn is_empty(&self) -> bool {
        self.total_budget.is_none() && self.records.is_none() && self.day_budgets.is_none()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReallocateRequest<'a> {
    itinerary_id: &'a str,
    mode: AllocationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_total: Option<f64>,
    #[serde(flatten)]
    data: Option<&'a AiReallocation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DayRequest<'a, T: Serialize> {
    itinerary_id: &'a str,
    #[serde(flatten)]
    target: &'a DayTarget,
    #[serde(flatten)]
    change: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewBudget {
    new_budget: f64,
}

#[derive(Debug, Serialize)]
struct Delta {
    delta: f64,
}

#[derive(Debug, Serialize)]
struct Mode {
    mode: AllocationMode,
}

/// Expense records and per-day budget endpoints. Summaries, analyses and
/// reallocations are backend-defined and returned as JSON.
#[derive(Clone)]
pub struct BudgetClient {
    transport: Arc<dyn Transport>,
}

impl BudgetClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn add_record(&self, record: &BudgetRecord) -> ApiResult<AddRecordOutcome> {
        let request = ApiRequest::post(RECORD_PATH).json(record)?;
        decode(self.transport.send(request).await?)
    }

    pub async fn delete_record(&self, id: &str) -> ApiResult<DeleteOutcome> {
        let request = ApiRequest::delete(RECORD_DELETE_PATH).query("id", id);
        decode(self.transport.send(request).await?)
    }

    pub async fn list_records(&self, itinerary_id: Option<&str>) -> ApiResult<Vec<BudgetRecord>> {
        let request = ApiRequest::get(RECORDS_PATH).optional_query("itineraryId", itinerary_id);
        let page: RecordsPage = decode(self.transport.send(request).await?)?;
        Ok(page.records)
    }

    pub async fn summary(&self, itinerary_id: &str) -> ApiResult<Value> {
        let request = ApiRequest::get(SUMMARY_PATH).query("itineraryId", itinerary_id);
        self.transport.send(request).await
    }

    /// Analysis across all records, or for one itinerary.
    pub async fn analyze(&self, itinerary_id: Option<&str>) -> ApiResult<Value> {
        let request = ApiRequest::get(ANALYZE_PATH).optional_query("itineraryId", itinerary_id);
        self.transport.send(request).await
    }

    pub async fn reallocate(
        &self,
        itinerary_id: &str,
        mode: AllocationMode,
        new_total: Option<f64>,
    ) -> ApiResult<Value> {
        let request = ApiRequest::post(REALLOCATE_PATH).json(&ReallocateRequest {
            itinerary_id,
            mode,
            new_total,
            data: None,
        })?;
        self.transport.send(request).await
    }

    /// AI reallocation computed from the figures in `data` rather than only
    /// from stored records.
    pub async fn reallocate_with_data(
        &self,
        itinerary_id: &str,
        data: &AiReallocation,
    ) -> ApiResult<Value> {
        let request = ApiRequest::post(REALLOCATE_PATH).json(&ReallocateRequest {
            itinerary_id,
            mode: AllocationMode::Ai,
            new_total: None,
            data: Some(data),
        })?;
        self.transport.send(request).await
    }

    pub async fn update_day(
        &self,
        itinerary_id: &str,
        target: &DayTarget,
        new_budget: f64,
    ) -> ApiResult<Value> {
        self.day_call(DAY_UPDATE_PATH, itinerary_id, target, NewBudget { new_budget })
            .await
    }

    /// Adds `delta` (which may be negative) to one day's budget.
    pub async fn adjust_day(
        &self,
        itinerary_id: &str,
        target: &DayTarget,
        delta: f64,
    ) -> ApiResult<Value> {
        self.day_call(DAY_ADJUST_PATH, itinerary_id, target, Delta { delta })
            .await
    }

    pub async fn reset_day(
        &self,
        itinerary_id: &str,
        target: &DayTarget,
        mode: AllocationMode,
    ) -> ApiResult<Value> {
        self.day_call(DAY_RESET_PATH, itinerary_id, target, Mode { mode })
            .await
    }

    async fn day_call<T: Serialize>(
        &self,
        path: &'static str,
        itinerary_id: &str,
        target: &DayTarget,
        change: T,
    ) -> ApiResult<Value> {
        let request = ApiRequest::post(path).json(&DayRequest {
            itinerary_id,
            target,
            change,
        })?;
        self.transport.send(request).await
    }
}
