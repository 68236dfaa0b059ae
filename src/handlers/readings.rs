use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    handlers::common::{billing_period, branch_filter, csv_response, no_content_response, required_branch},
    models::{Branch, BranchFilter},
    services::{
        imports::{self, ImportReport},
        reading_validation::ReadingSubmission,
        readings::{ReadingsExport, ReadingsView, SplitReadingsView, SubmitResult, UnlockResult},
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReadingsQuery {
    pub year: i32,
    pub month: i32,
    /// Branch code; empty, `null` or `all` means every branch
    pub branch: Option<String>,
    #[serde(default)]
    pub include_decommissioned: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    pub year: i32,
    pub month: i32,
    pub branch: Option<String>,
}

/// One branch, or every branch side by side.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ReadingsResponse {
    Branch(ReadingsView),
    Split(SplitReadingsView),
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "year": 2024,
    "month": 3,
    "branch": "JHB",
    "readings": [
        {"machine_id": "550e8400-e29b-41d4-a716-446655440000", "mono": 1050, "colour": null, "scan": 210, "note": null}
    ]
}))]
pub struct SubmitReadingsRequest {
    pub year: i32,
    pub month: i32,
    pub branch: Branch,
    pub readings: Vec<ReadingSubmission>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UnlockMonthRequest {
    pub year: i32,
    pub month: i32,
    pub branch: Branch,
}

#[utoipa::path(
    get,
    path = "/api/v1/readings",
    params(ReadingsQuery),
    responses(
        (status = 200, description = "Readings for the month", body = ApiResponse<ReadingsResponse>),
        (status = 400, description = "Invalid period or branch", body = crate::errors::ErrorResponse)
    ),
    tag = "readings"
)]
pub async fn get_readings(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ReadingsQuery>,
) -> ApiResult<ReadingsResponse> {
    let period = billing_period(query.year, query.month)?;
    let readings = &state.services.readings;

    let view = match branch_filter(query.branch.as_deref())? {
        BranchFilter::Specific(branch) => ReadingsResponse::Branch(
            readings
                .get_readings(period, branch, query.include_decommissioned)
                .await?,
        ),
        BranchFilter::All => ReadingsResponse::Split(
            readings
                .get_readings_split(period, query.include_decommissioned)
                .await?,
        ),
    };
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    post,
    path = "/api/v1/readings/submit",
    request_body = SubmitReadingsRequest,
    responses(
        (status = 200, description = "Readings saved", body = ApiResponse<SubmitResult>),
        (status = 400, description = "One or more rows rejected", body = crate::errors::ErrorResponse),
        (status = 403, description = "Month locked or machine in another branch", body = crate::errors::ErrorResponse)
    ),
    tag = "readings"
)]
pub async fn submit_readings(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SubmitReadingsRequest>,
) -> ApiResult<SubmitResult> {
    let period = billing_period(payload.year, payload.month)?;
    let result = state
        .services
        .readings
        .submit_readings(period, payload.branch, payload.readings, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/readings/:machine_id",
    params(
        ("machine_id" = Uuid, Path, description = "Machine ID"),
        PeriodQuery
    ),
    responses(
        (status = 204, description = "Reading cleared"),
        (status = 403, description = "Month locked", body = crate::errors::ErrorResponse),
        (status = 404, description = "No reading for the month", body = crate::errors::ErrorResponse)
    ),
    tag = "readings"
)]
pub async fn clear_reading(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(machine_id): Path<Uuid>,
    Query(query): Query<PeriodQuery>,
) -> Result<Response, crate::errors::ServiceError> {
    let period = billing_period(query.year, query.month)?;
    let branch = required_branch(query.branch.as_deref())?;
    state
        .services
        .readings
        .clear_reading(period, branch, machine_id)
        .await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/readings/export",
    params(PeriodQuery),
    responses(
        (status = 200, description = "CSV sheet for one branch, or every branch's sheet as JSON", body = ApiResponse<Vec<ReadingsExport>>)
    ),
    tag = "readings"
)]
pub async fn export_readings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PeriodQuery>,
) -> Result<Response, crate::errors::ServiceError> {
    let period = billing_period(query.year, query.month)?;
    let readings = &state.services.readings;

    match branch_filter(query.branch.as_deref())? {
        BranchFilter::Specific(branch) => {
            let sheet = readings.export_readings(period, branch, user.user_id).await?;
            Ok(csv_response(&sheet.filename, sheet.content))
        }
        BranchFilter::All => {
            let sheets = readings.export_readings_split(period, user.user_id).await?;
            Ok(Json(ApiResponse::success(sheets)).into_response())
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/readings/unlock",
    request_body = UnlockMonthRequest,
    responses(
        (status = 200, description = "Month reopened", body = ApiResponse<UnlockResult>),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse)
    ),
    tag = "readings"
)]
pub async fn unlock_month(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UnlockMonthRequest>,
) -> ApiResult<UnlockResult> {
    user.require_admin()?;
    let period = billing_period(payload.year, payload.month)?;
    let result = state
        .services
        .readings
        .unlock_month(period, payload.branch)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    post,
    path = "/api/v1/readings/import",
    params(PeriodQuery),
    request_body(content = String, content_type = "text/csv", description = "serial_number,mono,colour,scan,note"),
    responses(
        (status = 200, description = "Per-row import outcome", body = ApiResponse<ImportReport>),
        (status = 403, description = "Month locked", body = crate::errors::ErrorResponse)
    ),
    tag = "readings"
)]
pub async fn import_readings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PeriodQuery>,
    body: Bytes,
) -> ApiResult<ImportReport> {
    let period = billing_period(query.year, query.month)?;
    let branch = required_branch(query.branch.as_deref())?;
    let rows = imports::parse_reading_rows(&body)?;
    let report = state
        .services
        .readings
        .import_readings(period, branch, rows, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}
