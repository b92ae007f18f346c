use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::error::ApiResult;

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> ApiResult<T> {
    Ok(serde_json::from_value(value)?)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// The map provider sends `[]` instead of a string for blank text fields.
fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) if !text.is_empty() => Some(text),
        _ => None,
    })
}

/// Input of the primary planning call. Field validation is left to the
/// backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub destination: String,
    pub start_date: NaiveDate,
    pub days: u32,
    pub budget: f64,
    pub people_count: u32,
    #[serde(default)]
    pub preferences: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PlanRequest {
    pub fn new(
        destination: impl Into<String>,
        start_date: NaiveDate,
        days: u32,
        budget: f64,
        people_count: u32,
    ) -> Self {
        Self {
            destination: destination.into(),
            start_date,
            days,
            budget,
            people_count,
            preferences: BTreeSet::new(),
            notes: None,
        }
    }

    pub fn with_preference(mut self, tag: impl Into<String>) -> Self {
        self.preferences.insert(tag.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VoicePlanRequest<'a> {
    pub voice_text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TranscribeRequest<'a> {
    pub audio_base64: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveRequest<'a> {
    pub user_id: &'a str,
    pub itinerary: &'a ItineraryPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Place {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lng?, self.lat?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    #[serde(default)]
    pub day_index: Option<u32>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub daily_budget: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub places: Vec<Place>,
}

/// Typed view of an itinerary body. Generated itineraries and stored ones
/// share this shape; the stored form also carries `id`, `userId` and
/// `summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub summary: Option<String>,
    pub schedule: Vec<ItineraryDay>,
}

impl Itinerary {
    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.schedule.iter().flat_map(|day| day.places.iter())
    }

    pub fn scheduled_budget(&self) -> f64 {
        self.schedule
            .iter()
            .filter_map(|day| day.daily_budget)
            .sum()
    }
}

/// Itinerary body as returned by the backend. `Structured` is used when the
/// body carries a `schedule`; anything else stays `Opaque`. Both variants
/// serialize back to exactly the body they were built from.
#[derive(Debug, Clone, PartialEq)]
pub enum ItineraryPayload {
    Structured { itinerary: Itinerary, raw: Value },
    Opaque(Value),
}

impl ItineraryPayload {
    pub fn from_value(raw: Value) -> Self {
        match serde_json::from_value::<Itinerary>(raw.clone()) {
            Ok(itinerary) if raw.is_object() => ItineraryPayload::Structured { itinerary, raw },
            _ => ItineraryPayload::Opaque(raw),
        }
    }

    pub fn itinerary(&self) -> Option<&Itinerary> {
        match self {
            ItineraryPayload::Structured { itinerary, .. } => Some(itinerary),
            ItineraryPayload::Opaque(_) => None,
        }
    }

    pub fn as_value(&self) -> &Value {
        match self {
            ItineraryPayload::Structured { raw, .. } => raw,
            ItineraryPayload::Opaque(raw) => raw,
        }
    }

    /// The backend answers an unknown id with an empty object.
    pub fn is_empty(&self) -> bool {
        match self.as_value() {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl Serialize for ItineraryPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ItineraryPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ItineraryPayload::from_value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    #[serde(default, deserialize_with = "text_or_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "text_or_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub location: Option<String>,
}

impl Poi {
    /// Parses a `"lng,lat"` location string.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let (lng, lat) = self.location.as_deref()?.split_once(',')?;
        Some((lng.trim().parse().ok()?, lat.trim().parse().ok()?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiSearch {
    #[serde(default, deserialize_with = "text_or_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub count: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub info: Option<String>,
    pub pois: Vec<Poi>,
}

/// POI search body. The backend relays the map provider's JSON text, which
/// may arrive either as an object or as a JSON-encoded string.
#[derive(Debug, Clone, PartialEq)]
pub enum PoiPayload {
    Structured { search: PoiSearch, raw: Value },
    Opaque(Value),
}

impl PoiPayload {
    pub fn from_value(raw: Value) -> Self {
        let candidate = match &raw {
            Value::String(text) => serde_json::from_str::<Value>(text).ok(),
            other => Some(other.clone()),
        };
        match candidate
            .filter(Value::is_object)
            .map(serde_json::from_value::<PoiSearch>)
        {
            Some(Ok(search)) => PoiPayload::Structured { search, raw },
            _ => PoiPayload::Opaque(raw),
        }
    }

    pub fn search(&self) -> Option<&PoiSearch> {
        match self {
            PoiPayload::Structured { search, .. } => Some(search),
            PoiPayload::Opaque(_) => None,
        }
    }

    pub fn as_value(&self) -> &Value {
        match self {
            PoiPayload::Structured { raw, .. } => raw,
            PoiPayload::Opaque(raw) => raw,
        }
    }
}

impl Serialize for PoiPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_value().serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItinerarySummary {
    pub id: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SaveOutcome {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeleteOutcome {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plan_request_serializes_camel_case_without_missing_notes() {
        let request = PlanRequest::new(
            "Kyoto",
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            3,
            5000.0,
            2,
        )
        .with_preference("food")
        .with_preference("anime")
        .with_preference("food");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "destination": "Kyoto",
                "startDate": "2025-04-01",
                "days": 3,
                "budget": 5000.0,
                "peopleCount": 2,
                "preferences": ["anime", "food"],
            })
        );
    }

    #[test]
    fn stored_itinerary_is_structured_and_keeps_raw_body() {
        let body = json!({
            "id": "it-1",
            "userId": "u-1",
            "destination": "Hangzhou",
            "startDate": "2025-05-01",
            "days": 2,
            "budget": 3000,
            "summary": null,
            "schedule": [
                {"dayIndex": 1, "summary": "West Lake", "dailyBudget": 1500, "places": [
                    {"name": "Broken Bridge", "type": "sight", "address": null, "lat": 30.26, "lng": 120.15, "notes": null}
                ]},
                {"dayIndex": 2, "summary": "Tea", "dailyBudget": 1200.5, "places": null}
            ]
        });
        let payload = ItineraryPayload::from_value(body.clone());
        let itinerary = payload.itinerary().expect("structured");
        assert_eq!(itinerary.id.as_deref(), Some("it-1"));
        assert_eq!(itinerary.schedule.len(), 2);
        assert!(itinerary.schedule[1].places.is_empty());
        assert_eq!(itinerary.places().count(), 1);
        assert_eq!(itinerary.scheduled_budget(), 2700.5);
        assert_eq!(
            itinerary.schedule[0].places[0].coordinates(),
            Some((120.15, 30.26))
        );
        assert_eq!(serde_json::to_value(&payload).unwrap(), body);
    }

    #[test]
    fn unknown_shapes_stay_opaque() {
        let empty = ItineraryPayload::from_value(json!({}));
        assert!(empty.itinerary().is_none());
        assert!(empty.is_empty());

        let text = ItineraryPayload::from_value(json!("generation failed"));
        assert_eq!(text, ItineraryPayload::Opaque(json!("generation failed")));
        assert!(!text.is_empty());
    }

    #[test]
    fn poi_payload_accepts_encoded_string_body() {
        let inner = json!({
            "status": "1",
            "count": "1",
            "info": "OK",
            "pois": [{"id": "B0", "name": "Palace Museum", "type": "museum", "address": [], "location": "116.397,39.918"}]
        });
        let raw = Value::String(inner.to_string());
        let payload = PoiPayload::from_value(raw.clone());
        let search = payload.search().expect("structured");
        assert_eq!(search.pois[0].address, None);
        assert_eq!(search.pois[0].coordinates(), Some((116.397, 39.918)));
        assert_eq!(payload.as_value(), &raw);
    }

    #[test]
    fn poi_payload_without_pois_is_opaque() {
        let payload = PoiPayload::from_value(json!({"status": "0", "info": "INVALID_USER_KEY"}));
        assert!(payload.search().is_none());
    }

    #[test]
    fn outcomes_report_status() {
        let saved: SaveOutcome = decode(json!({"status": "ok", "id": "it-9"})).unwrap();
        assert!(saved.is_ok());
        let failed: SaveOutcome = decode(json!({"status": "error", "message": "missing"})).unwrap();
        assert!(!failed.is_ok());
        assert_eq!(failed.message.as_deref(), Some("missing"));
    }
}
