//! HTTP layer for formix: request/response types, the error-to-JSON
//! translator, and the class-based form-group view.

pub mod errors;
pub mod group_view;
pub mod request;
pub mod response;

pub use errors::error_response;
pub use group_view::FormGroupView;
pub use request::{AuthUser, HttpRequest};
pub use response::{HttpResponse, JsonResponse};
