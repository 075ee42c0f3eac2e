//! The class-based view serving a form group over JSON.
//!
//! Implementors provide the group configuration and a few knobs; the
//! trait supplies GET (serialize) and POST (deserialize, validate, save)
//! with the POST write path wrapped in a transaction.

use async_trait::async_trait;
use http::Method;
use tracing::{error, info};

use formix_core::{FormixError, FormixResult};
use formix_db::executor::{get_instance, DbExecutor};
use formix_db::{Instance, Value};
use formix_forms::group::FormGroup;

use crate::errors::error_response;
use crate::request::HttpRequest;
use crate::response::{HttpResponse, JsonResponse};

/// A view exposing one form group.
///
/// `group()` must return a freshly configured group per call; binding is
/// per-request state.
#[async_trait]
pub trait FormGroupView: Send + Sync {
    /// Builds the form group this view serves.
    fn group(&self) -> FormGroup;

    /// The human-readable name of the main record, used in messages.
    fn noun(&self) -> &str;

    /// The query parameter carrying the main record id.
    fn id_param(&self) -> &str {
        "id"
    }

    /// Whether GET without an id serves an empty (create) payload.
    fn create_if_no_id(&self) -> bool {
        false
    }

    /// Permission required to POST, when set.
    fn change_permission(&self) -> Option<&str> {
        None
    }

    /// The database the view works against.
    fn db(&self) -> &dyn DbExecutor;

    /// Hook invoked after a successful save, inside the transaction.
    async fn post_save(&self, _db: &dyn DbExecutor, _obj: &Instance) -> FormixResult<()> {
        Ok(())
    }

    /// Dispatches by HTTP method.
    async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        match *request.method() {
            Method::GET => self.get(request).await,
            Method::POST => self.post(request).await,
            ref method => error_response(&FormixError::MethodNotAllowed(format!(
                "method {method} is not allowed"
            ))),
        }
    }

    /// Serves the serialized group as `{contents, schema, order}`.
    async fn get(&self, request: HttpRequest) -> HttpResponse {
        match self.handle_get(&request).await {
            Ok(response) => response,
            Err(err) => {
                error!(noun = self.noun(), error = %err, "form group GET failed");
                error_response(&err)
            }
        }
    }

    /// Accepts a submitted payload: create or modify the main record and
    /// its children.
    ///
    /// On success the response carries a message and the saved id; on
    /// validation failure a 400 with the collected form errors.
    async fn post(&self, request: HttpRequest) -> HttpResponse {
        match self.handle_post(&request).await {
            Ok(response) => response,
            Err(err) => {
                error!(noun = self.noun(), error = %err, "form group POST failed");
                error_response(&err)
            }
        }
    }

    /// GET implementation; errors bubble to the translator.
    async fn handle_get(&self, request: &HttpRequest) -> FormixResult<HttpResponse> {
        let db = self.db();
        let group = self.group();

        let obj = match request.get_param(self.id_param()) {
            Some(raw_id) => {
                let pk = parse_id(raw_id);
                let obj = get_instance(db, group.meta(), pk).await.map_err(|e| match e {
                    FormixError::DoesNotExist(_) => FormixError::NotFound(format!(
                        "{} {raw_id} does not exist",
                        self.noun()
                    )),
                    other => other,
                })?;
                Some(obj)
            }
            None if self.create_if_no_id() => None,
            None => {
                return Err(FormixError::NotFound(format!(
                    "No {} id given",
                    self.noun().to_lowercase()
                )))
            }
        };

        let (contents, schema, order) = group.serialize(db, obj.as_ref(), &[], &[]).await?;
        Ok(JsonResponse::new(&serde_json::json!({
            "contents": contents,
            "schema": schema,
            "order": order,
        })))
    }

    /// POST implementation; the whole write path runs in one
    /// transaction.
    async fn handle_post(&self, request: &HttpRequest) -> FormixResult<HttpResponse> {
        if !request.is_ajax() {
            return Ok(HttpResponse::bad_request("Expected an XMLHttpRequest"));
        }

        if let Some(permission) = self.change_permission() {
            let permitted = request
                .auth_user()
                .is_some_and(|user| user.has_perm(permission));
            if !permitted {
                return Err(FormixError::PermissionDenied(format!(
                    "Sorry, you are not permitted to add or change a {}",
                    self.noun().to_lowercase()
                )));
            }
        }

        let payload = request.json_body()?;
        let serde_json::Value::Object(payload) = payload else {
            return Err(FormixError::BadRequest(
                "expected a JSON object".to_string(),
            ));
        };
        info!(noun = self.noun(), "in_data: {}", serde_json::Value::Object(payload.clone()));

        let db = self.db();
        db.begin_transaction().await?;
        match self.process_post(db, &payload).await {
            Ok(response) => {
                db.commit().await?;
                Ok(response)
            }
            Err(err) => {
                if let Err(rollback_err) = db.rollback().await {
                    error!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// The in-transaction part of POST.
    async fn process_post(
        &self,
        db: &dyn DbExecutor,
        payload: &serde_json::Map<String, serde_json::Value>,
    ) -> FormixResult<HttpResponse> {
        let mut group = self.group();
        group.deserialize(db, payload).await?;

        if group.is_valid().await {
            let obj = group.save(db, true).await?;
            self.post_save(db, &obj).await?;
            let message = format!("Saved {}", self.noun().to_lowercase());
            Ok(JsonResponse::new(&serde_json::json!({
                "message": message,
                "id": obj.pk().map(Value::to_json),
            })))
        } else {
            let errors = group.errors();
            error!(noun = self.noun(), errors = %serde_json::Value::Object(errors.clone()), "form group validation failed");
            Ok(JsonResponse::with_status(
                http::StatusCode::BAD_REQUEST,
                &serde_json::json!({"form_errors": errors}),
            ))
        }
    }
}

fn parse_id(raw: &str) -> Value {
    raw.parse::<i64>()
        .map_or_else(|_| Value::String(raw.to_string()), Value::Int)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AuthUser;
    use formix_db::fields::{FieldDef, FieldType};
    use formix_db::sql::create_table_sql;
    use formix_db::sqlite::SqliteBackend;
    use formix_db::ModelMeta;
    use formix_forms::form::FormConfig;
    use std::sync::LazyLock;

    static NOTE_META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
        app_label: "desk",
        model_name: "note",
        db_table: "desk_note".to_string(),
        verbose_name: "note".to_string(),
        fields: vec![
            FieldDef::new("id", FieldType::AutoField).primary_key(),
            FieldDef::new("body", FieldType::CharField).max_length(100),
        ],
    });

    struct NoteView {
        db: SqliteBackend,
        create_if_no_id: bool,
        permission: Option<&'static str>,
    }

    impl NoteView {
        async fn new() -> Self {
            let db = SqliteBackend::memory().unwrap();
            db.execute(&create_table_sql(&NOTE_META), &[]).await.unwrap();
            Self {
                db,
                create_if_no_id: true,
                permission: None,
            }
        }
    }

    #[async_trait]
    impl FormGroupView for NoteView {
        fn group(&self) -> FormGroup {
            FormGroup::new(FormConfig::new(&NOTE_META, vec!["body"]))
        }

        fn noun(&self) -> &str {
            "Note"
        }

        fn create_if_no_id(&self) -> bool {
            self.create_if_no_id
        }

        fn change_permission(&self) -> Option<&str> {
            self.permission
        }

        fn db(&self) -> &dyn DbExecutor {
            &self.db
        }
    }

    fn ajax_post(payload: serde_json::Value) -> HttpRequest {
        HttpRequest::new(Method::POST, "/notes/")
            .header("X-Requested-With", "XMLHttpRequest")
            .json(&payload)
    }

    #[tokio::test]
    async fn test_get_without_id_serves_create_payload() {
        let view = NoteView::new().await;
        let response = view.dispatch(HttpRequest::new(Method::GET, "/notes/")).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        let body = response.json().unwrap();
        assert!(body["schema"]["body"].is_object());
        assert_eq!(body["order"], serde_json::json!(["body"]));
        assert_eq!(body["contents"]["formsets"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_get_without_id_rejected_when_disabled() {
        let mut view = NoteView::new().await;
        view.create_if_no_id = false;
        let response = view.dispatch(HttpRequest::new(Method::GET, "/notes/")).await;
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
        assert!(response.json().unwrap()["error"]
            .as_str()
            .unwrap()
            .contains("No note id given"));
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_404() {
        let view = NoteView::new().await;
        let request = HttpRequest::new(Method::GET, "/notes/").query_param("id", "99");
        let response = view.dispatch(request).await;
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
        assert!(response.json().unwrap()["error"]
            .as_str()
            .unwrap()
            .contains("Note 99 does not exist"));
    }

    #[tokio::test]
    async fn test_post_requires_ajax() {
        let view = NoteView::new().await;
        let request = HttpRequest::new(Method::POST, "/notes/")
            .json(&serde_json::json!({"body": "hi"}));
        let response = view.dispatch(request).await;
        assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(response.body(), "Expected an XMLHttpRequest");
    }

    #[tokio::test]
    async fn test_post_permission_gate() {
        let mut view = NoteView::new().await;
        view.permission = Some("desk.change_note");

        let response = view.dispatch(ajax_post(serde_json::json!({"body": "hi"}))).await;
        assert_eq!(response.status(), http::StatusCode::FORBIDDEN);

        let request = ajax_post(serde_json::json!({"body": "hi"}))
            .user(AuthUser::new("kim").with_permission("desk.change_note"));
        let response = view.dispatch(request).await;
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_create_and_fetch() {
        let view = NoteView::new().await;
        let response = view.dispatch(ajax_post(serde_json::json!({"body": "hello"}))).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        let body = response.json().unwrap();
        assert_eq!(body["message"], "Saved note");
        assert_eq!(body["id"], 1);

        let request = HttpRequest::new(Method::GET, "/notes/").query_param("id", "1");
        let response = view.dispatch(request).await;
        let body = response.json().unwrap();
        assert_eq!(body["contents"]["body"], "hello");
    }

    #[tokio::test]
    async fn test_post_invalid_payload_returns_form_errors() {
        let view = NoteView::new().await;
        let response = view.dispatch(ajax_post(serde_json::json!({"body": ""}))).await;
        assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
        let body = response.json().unwrap();
        assert_eq!(
            body["form_errors"]["body"],
            serde_json::json!(["This field is required."])
        );
    }

    #[tokio::test]
    async fn test_post_malformed_json_is_400() {
        let view = NoteView::new().await;
        let request = HttpRequest::new(Method::POST, "/notes/")
            .header("X-Requested-With", "XMLHttpRequest")
            .body("{not json");
        let response = view.dispatch(request).await;
        assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unsupported_method_is_405() {
        let view = NoteView::new().await;
        let response = view.dispatch(HttpRequest::new(Method::DELETE, "/notes/")).await;
        assert_eq!(response.status(), http::StatusCode::METHOD_NOT_ALLOWED);
    }
}
