use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::ServiceError;
use crate::models::{BillingPeriod, Branch, BranchFilter};

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// A CSV download with the given file name.
pub fn csv_response(filename: &str, content: String) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response()
}

pub fn billing_period(year: i32, month: i32) -> Result<BillingPeriod, ServiceError> {
    Ok(BillingPeriod::new(year, month)?)
}

/// Collapses every spelling of "all branches" at the HTTP boundary.
pub fn branch_filter(raw: Option<&str>) -> Result<BranchFilter, ServiceError> {
    Ok(BranchFilter::from_param(raw)?)
}

/// Operations that write into one branch's scope need that branch named.
pub fn required_branch(raw: Option<&str>) -> Result<Branch, ServiceError> {
    match branch_filter(raw)? {
        BranchFilter::Specific(branch) => Ok(branch),
        BranchFilter::All => Err(ServiceError::ValidationError(
            "A specific branch is required".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn all_branch_spellings_collapse() {
        for raw in [None, Some(""), Some("null"), Some("all")] {
            assert_eq!(branch_filter(raw).unwrap(), BranchFilter::All);
        }
        assert_eq!(
            branch_filter(Some("ct")).unwrap(),
            BranchFilter::Specific(Branch::Ct)
        );
    }

    #[test]
    fn writes_need_a_named_branch() {
        assert_matches!(required_branch(Some("all")), Err(ServiceError::ValidationError(_)));
        assert_eq!(required_branch(Some("JHB")).unwrap(), Branch::Jhb);
    }

    #[test]
    fn month_out_of_range_is_a_validation_error() {
        assert_matches!(billing_period(2024, 13), Err(ServiceError::ValidationError(_)));
    }
}
