use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fleetmeter API",
        version = "0.1.0",
        description = r#"
# Fleetmeter API

Back-office service for copier fleets.

- **Readings**: capture monthly mono, colour and scan meter values per branch.
  Exporting a month locks it for that branch until an administrator unlocks it.
- **Consumables**: record part orders, bill yield shortfalls and list parts
  that are due for replacement.

## Authentication

Requests arrive through the gateway, which forwards the caller in the
`x-user-id` and `x-user-roles` headers.

## Branches

Branch query parameters take `JHB` or `CT`. An empty value, `null` or `all`
selects every branch.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    tags(
        (name = "readings", description = "Monthly meter readings and month locks"),
        (name = "consumables", description = "Part orders and yield compliance"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::readings::get_readings,
        crate::handlers::readings::submit_readings,
        crate::handlers::readings::clear_reading,
        crate::handlers::readings::export_readings,
        crate::handlers::readings::unlock_month,
        crate::handlers::readings::import_readings,
        crate::handlers::consumables::record_part_order,
        crate::handlers::consumables::import_part_orders,
        crate::handlers::consumables::get_consumable_summary,
        crate::handlers::consumables::get_toner_alerts,
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::handlers::readings::SubmitReadingsRequest,
            crate::handlers::readings::UnlockMonthRequest,
            crate::services::reading_validation::ReadingViolation,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Serves the generated document as JSON.
pub fn routes() -> Router<AppState> {
    Router::new().route(OPENAPI_JSON_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}
