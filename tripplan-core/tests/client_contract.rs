use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tripplan_core::testing::ScriptedTransport;
use tripplan_core::{
    ItineraryPayload, Method, PlanRequest, PlannerClient, RouteName, RouteTable, Transport,
};

#[tokio::test]
async fn plan_save_list_get_delete_round() {
    let transport = Arc::new(ScriptedTransport::new());
    let generated = json!({
        "destination": "Chengdu",
        "startDate": "2025-10-01",
        "days": 2,
        "budget": 2000,
        "schedule": [
            {"dayIndex": 1, "summary": "Pandas", "dailyBudget": 900, "places": []},
            {"dayIndex": 2, "summary": "Hotpot", "dailyBudget": 1100, "places": []}
        ]
    });
    transport.respond(generated.clone());
    transport.respond(json!({"status": "ok", "id": "it-1"}));
    transport.respond(json!([{"id": "it-1", "destination": "Chengdu", "startDate": "2025-10-01", "days": 2, "summary": "Pandas"}]));
    transport.respond(json!({"id": "it-1", "schedule": []}));
    transport.respond(json!({"status": "ok"}));

    let shared: Arc<dyn Transport> = transport.clone();
    let planner = PlannerClient::new(shared);
    let request = PlanRequest::new(
        "Chengdu",
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
        2,
        2000.0,
        2,
    )
    .with_preference("food");

    let itinerary = planner.plan_itinerary(&request).await.unwrap();
    assert_eq!(itinerary.itinerary().unwrap().scheduled_budget(), 2000.0);

    let saved = planner.save_itinerary("user-1", &itinerary).await.unwrap();
    let id = saved.id.clone().unwrap();
    let listed = planner.list_itineraries("user-1").await.unwrap();
    assert_eq!(listed[0].id, id);
    let fetched = planner.get_itinerary(&id).await.unwrap();
    assert!(matches!(fetched, ItineraryPayload::Structured { .. }));
    assert!(planner.delete_itinerary(&id).await.unwrap().is_ok());

    let sent = transport.requests();
    let methods: Vec<Method> = sent.iter().map(|request| request.method).collect();
    assert_eq!(
        methods,
        vec![
            Method::Post,
            Method::Post,
            Method::Get,
            Method::Get,
            Method::Delete
        ]
    );
    assert_eq!(
        sent[1].body,
        Some(json!({"userId": "user-1", "itinerary": generated}))
    );
}

#[test]
fn landing_on_root_opens_planner_view() {
    let routes = RouteTable::standard(|name: RouteName| name.component().to_string());
    let (resolution, view) = routes.navigate("/").unwrap();
    assert_eq!(resolution.name, RouteName::Planner);
    assert_eq!(view, "Planner");
}
