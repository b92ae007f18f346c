pub mod api;
pub mod config;
pub mod error;
pub mod router;
pub mod testing;

pub use api::{
    AddRecordOutcome, AiReallocation, AllocationMode, ApiError, ApiRequest, ApiResult,
    AuthOutcome, BudgetClient, BudgetRecord, DayTarget, DeleteOutcome, HttpTransport, Itinerary,
    ItineraryDay, ItineraryPayload, ItinerarySummary, Method, Place, PlanRequest, PlannerClient,
    Poi, PoiPayload, PoiSearch, RegisterRequest, SaveOutcome, Transport, UserClient,
};
pub use config::{load_tripplan_config, TripplanConfig};
pub use error::{ConfigError, Result};
pub use router::{Resolution, RouteError, RouteName, RouteTable};
