pub mod budget;
pub mod error;
pub mod models;
pub mod planner;
pub mod transport;
pub mod user;

pub use budget::{
    AddRecordOutcome, AiReallocation, AllocationMode, BudgetClient, BudgetRecord, DayTarget,
};
pub use error::{ApiError, ApiResult};
pub use models::{
    DeleteOutcome, Itinerary, ItineraryDay, ItineraryPayload, ItinerarySummary, Place,
    PlanRequest, Poi, PoiPayload, PoiSearch, SaveOutcome,
};
pub use planner::PlannerClient;
pub use transport::{ApiRequest, HttpTransport, Method, Transport};
pub use user::{AuthOutcome, RegisterRequest, UserClient};
