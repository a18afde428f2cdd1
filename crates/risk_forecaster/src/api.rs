//! JSON request boundary.
//!
//! Handlers take a decoded JSON payload and always produce a response:
//! either the result or `{"error": message}` with a 4xx or 5xx status.
//! Server-side failures are logged and reported with a generic message.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::predict::predict_payload;
use crate::recommend::{RecommendationRequest, recommend};
use crate::{PredictionContext, RecommendationContext, ServiceError, StatusClass};

/// Status and JSON body of a handled request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: &impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self::from_error(&ServiceError::Internal(e.to_string())),
        }
    }

    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusClass::ClientError.status_code(),
            body: json!({ "error": message }),
        }
    }

    fn from_error(err: &ServiceError) -> Self {
        let class = err.status_class();
        match class {
            StatusClass::ClientError => warn!(error = %err, "Rejected request"),
            StatusClass::ServerError => error!(error = %err, "Request failed"),
        }

        Self {
            status: class.status_code(),
            body: json!({ "error": err.public_message() }),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status < 400
    }
}

fn is_empty(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Handles a prediction payload `{watch_data, user_data}`.
pub fn handle_prediction(context: &PredictionContext, payload: &Value) -> ApiResponse {
    if is_empty(payload) {
        return ApiResponse::bad_request("No input data provided");
    }
    if is_blank(payload.get("watch_data")) || is_blank(payload.get("user_data")) {
        return ApiResponse::bad_request("Missing 'watch_data' or 'user_data' in JSON payload");
    }

    match predict_payload(context, payload) {
        Ok(result) => ApiResponse::ok(&result),
        Err(err) => ApiResponse::from_error(&err),
    }
}

#[derive(Serialize)]
struct RecommendationBody {
    recommendation: String,
}

/// Handles a recommendation payload `{user_context, original_meal}`.
pub async fn handle_recommendation(
    context: &RecommendationContext,
    payload: &Value,
) -> ApiResponse {
    if is_empty(payload) {
        return ApiResponse::bad_request("No input data provided");
    }

    let request = match RecommendationRequest::deserialize(payload) {
        Ok(request) => request,
        Err(e) => {
            return ApiResponse::from_error(&ServiceError::Validation(format!(
                "Invalid or missing key in JSON payload: {e}"
            )));
        }
    };

    match recommend(context, &request).await {
        Ok(recommendation) => ApiResponse::ok(&RecommendationBody { recommendation }),
        Err(err) => ApiResponse::from_error(&err),
    }
}
