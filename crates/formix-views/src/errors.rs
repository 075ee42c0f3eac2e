//! Error-to-JSON translation for view handlers.

use http::StatusCode;

use formix_core::FormixError;

use crate::response::{HttpResponse, JsonResponse};

/// Renders an error as a `{"error": message}` JSON response with the
/// status code the error maps to.
pub fn error_response(err: &FormixError) -> HttpResponse {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    JsonResponse::with_status(status, &serde_json::json!({"error": err.to_string()}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = error_response(&FormixError::NotFound("thing 9 does not exist".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.json().unwrap();
        assert!(body["error"].as_str().unwrap().contains("thing 9"));
    }

    #[test]
    fn test_permission_denied_maps_to_403() {
        let response = error_response(&FormixError::PermissionDenied("no".into()));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_database_error_maps_to_500() {
        let response = error_response(&FormixError::DatabaseError("boom".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
