use axum::{
    body::Bytes,
    extract::{Query, State},
    response::Response,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{branch_filter, created_response},
    models::{ComplianceStatus, PartType},
    services::{
        consumables::{
            ConsumableSummary, ConsumableSummaryFilter, PartOrderResult, RecordPartOrder,
            TonerAlertsReport,
        },
        imports::{self, ImportReport},
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    pub branch: Option<String>,
    /// Substring of the machine model name
    pub model: Option<String>,
    /// `general` or `toner`
    pub part_type: Option<String>,
    /// `met` or `shortfall`
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BranchQuery {
    pub branch: Option<String>,
}

fn optional<T: std::str::FromStr>(raw: Option<&str>) -> Result<Option<T>, ServiceError>
where
    ServiceError: From<T::Err>,
{
    match raw.map(str::trim).filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all")) {
        Some(value) => Ok(Some(value.parse::<T>()?)),
        None => Ok(None),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/consumables/orders",
    request_body = RecordPartOrder,
    responses(
        (status = 201, description = "Part order recorded", body = ApiResponse<PartOrderResult>),
        (status = 404, description = "Machine or part not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Part belongs to a different machine model", body = crate::errors::ErrorResponse)
    ),
    tag = "consumables"
)]
pub async fn record_part_order(
    State(state): State<AppState>,
    user: AuthUser,
    axum::Json(payload): axum::Json<RecordPartOrder>,
) -> Result<Response, ServiceError> {
    let result = state
        .services
        .consumables
        .record_part_order(payload, user.user_id)
        .await?;
    Ok(created_response(ApiResponse::success(result)))
}

#[utoipa::path(
    post,
    path = "/api/v1/consumables/orders/import",
    request_body(
        content = String,
        content_type = "text/csv",
        description = "serial_number,item_code,part_name,order_date,current_reading,remaining_toner_percent"
    ),
    responses(
        (status = 200, description = "Per-row import outcome", body = ApiResponse<ImportReport>)
    ),
    tag = "consumables"
)]
pub async fn import_part_orders(
    State(state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> ApiResult<ImportReport> {
    let rows = imports::parse_part_order_rows(&body)?;
    let report = state
        .services
        .consumables
        .import_part_orders(rows, user.user_id)
        .await?;
    Ok(axum::Json(ApiResponse::success(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/consumables/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Latest replacement per machine and part", body = ApiResponse<ConsumableSummary>)
    ),
    tag = "consumables"
)]
pub async fn get_consumable_summary(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<ConsumableSummary> {
    let filter = ConsumableSummaryFilter {
        branch: branch_filter(query.branch.as_deref())?,
        model: query.model,
        part_type: optional::<PartType>(query.part_type.as_deref())?,
        status: optional::<ComplianceStatus>(query.status.as_deref())?,
    };
    let summary = state
        .services
        .consumables
        .get_consumable_summary(filter)
        .await?;
    Ok(axum::Json(ApiResponse::success(summary)))
}

#[utoipa::path(
    get,
    path = "/api/v1/consumables/toner-alerts",
    params(BranchQuery),
    responses(
        (status = 200, description = "Parts due for replacement, by customer", body = ApiResponse<TonerAlertsReport>)
    ),
    tag = "consumables"
)]
pub async fn get_toner_alerts(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<BranchQuery>,
) -> ApiResult<TonerAlertsReport> {
    let branch = branch_filter(query.branch.as_deref())?;
    let report = state
        .services
        .consumables
        .get_toner_alerts_by_customer(branch)
        .await?;
    Ok(axum::Json(ApiResponse::success(report)))
}
