use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;

use super::error::{ApiError, ApiResult};
use super::models::{
    decode, DeleteOutcome, ItineraryPayload, ItinerarySummary, PlanRequest, PoiPayload,
    SaveOutcome, SaveRequest, TranscribeRequest, VoicePlanRequest,
};
use super::transport::{ApiRequest, Transport};

pub const GENERATE_PATH: &str = "/api/itinerary/generate";
pub const PLAN_PATH: &str = "/api/planner/plan";
pub const POIS_PATH: &str = "/api/planner/pois";
pub const TRANSCRIBE_PATH: &str = "/api/planner/voice/transcribe";
pub const SAVE_PATH: &str = "/api/itinerary/save";
pub const LIST_PATH: &str = "/api/itinerary/list";
pub const GET_PATH: &str = "/api/itinerary/get";
pub const DELETE_PATH: &str = "/api/itinerary/delete";

/// Itinerary planning, POI search and voice endpoints. Each call is one
/// request; failures are returned as-is.
#[derive(Clone)]
pub struct PlannerClient {
    transport: Arc<dyn Transport>,
}

impl PlannerClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn plan_itinerary(&self, request: &PlanRequest) -> ApiResult<ItineraryPayload> {
        let body = self
            .transport
            .send(ApiRequest::post(GENERATE_PATH).json(request)?)
            .await?;
        Ok(ItineraryPayload::from_value(body))
    }

    /// Same generation as [`PlannerClient::plan_itinerary`], through the
    /// planner endpoint that checks the request first. A rejected request
    /// comes back as a 400 [`ApiError::Status`].
    pub async fn plan_validated(&self, request: &PlanRequest) -> ApiResult<ItineraryPayload> {
        let body = self
            .transport
            .send(ApiRequest::post(PLAN_PATH).json(request)?)
            .await?;
        Ok(ItineraryPayload::from_value(body))
    }

    pub async fn search_pois(&self, keywords: &str, city: Option<&str>) -> ApiResult<PoiPayload> {
        let request = ApiRequest::get(POIS_PATH)
            .query("keywords", keywords)
            .optional_query("city", city);
        let body = self.transport.send(request).await?;
        Ok(PoiPayload::from_value(body))
    }

    /// Returns only the `text` field of the transcription response.
    pub async fn transcribe_audio(&self, audio_base64: &str) -> ApiResult<String> {
        let request = ApiRequest::post(TRANSCRIBE_PATH).json(&TranscribeRequest { audio_base64 })?;
        let body = self.transport.send(request).await?;
        match body.get("text") {
            Some(Value::String(text)) => Ok(text.clone()),
            _ => Err(ApiError::MissingField("text")),
        }
    }

    pub async fn transcribe_audio_bytes(&self, audio: &[u8]) -> ApiResult<String> {
        self.transcribe_audio(&STANDARD.encode(audio)).await
    }

    pub async fn save_itinerary(
        &self,
        user_id: &str,
        itinerary: &ItineraryPayload,
    ) -> ApiResult<SaveOutcome> {
        let request = ApiRequest::post(SAVE_PATH).json(&SaveRequest { user_id, itinerary })?;
        decode(self.transport.send(request).await?)
    }

    /// Summaries in the order the backend returns them.
    pub async fn list_itineraries(&self, user_id: &str) -> ApiResult<Vec<ItinerarySummary>> {
        let request = ApiRequest::get(LIST_PATH).query("userId", user_id);
        decode(self.transport.send(request).await?)
    }

    pub async fn get_itinerary(&self, id: &str) -> ApiResult<ItineraryPayload> {
        let body = self
            .transport
            .send(ApiRequest::get(GET_PATH).query("id", id))
            .await?;
        Ok(ItineraryPayload::from_value(body))
    }

    pub async fn delete_itinerary(&self, id: &str) -> ApiResult<DeleteOutcome> {
        let request = ApiRequest::delete(DELETE_PATH).query("id", id);
        decode(self.transport.send(request).await?)
    }

    /// Generates an itinerary from a free-text transcript through the same
    /// endpoint as [`PlannerClient::plan_itinerary`].
    pub async fn voice_plan(&self, text: &str) -> ApiResult<ItineraryPayload> {
        let request = ApiRequest::post(GENERATE_PATH).json(&VoicePlanRequest { voice_text: text })?;
        let body = self.transport.send(request).await?;
        Ok(ItineraryPayload::from_value(body))
    }
}
