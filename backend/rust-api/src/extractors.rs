use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// JSON extractor whose rejections use the same `{error, message}` body as `ApiError`
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let path = req.uri().path().to_string();
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = rejection_message(&rejection);
                tracing::warn!(path = %path, "Rejected quiz request body: {}", message);
                Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "bad_request",
                        "message": message,
                    })),
                )
                    .into_response())
            }
        }
    }
}

fn rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Quiz requests must be sent as application/json".to_string()
        }
        // Well-formed JSON that does not fit the request, e.g. no `username` or `option`
        JsonRejection::JsonDataError(err) => {
            format!("Request body is missing a field or has a wrong type: {}", err.body_text())
        }
        JsonRejection::JsonSyntaxError(err) => {
            format!("Request body is not valid JSON: {}", err.body_text())
        }
        other => format!("Failed to read request body: {}", other.body_text()),
    }
}
