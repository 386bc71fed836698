// Unified JSON envelope for the health server's API routes
// Provides HandlerResponse and the middleware that wraps every response

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, response::Parts, HeaderValue, Request, Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use tracing::{debug, error};

/// Standard JSON response format for all API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseFormat {
    pub status: String,        // HTTP status text (e.g. "OK", "NOT_FOUND")
    pub code: u16,             // HTTP status code
    pub data: Value,           // Response payload
    pub messages: Vec<String>, // Informational messages
    pub date: String,          // ISO timestamp
}

/// Convenience struct for building responses in handlers
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    pub status_code: StatusCode,
    pub data: Value,
    pub messages: Vec<String>,
}

impl HandlerResponse {
    /// Creates a new response with specified status code
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            data: Value::Null,
            messages: Vec::new(),
        }
    }

    /// Adds JSON data payload to the response
    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Adds an informational message to the response
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> axum::response::Response {
        let mut response: Response<Body> = Json(json!({
            "data": self.data,
            "messages": self.messages
        }))
        .into_response();

        *response.status_mut() = self.status_code;

        // Store HandlerResponse in extensions for middleware processing
        response.extensions_mut().insert(self);
        response
    }
}

/// "Not Found" -> "NOT_FOUND"
fn status_label(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("UNKNOWN STATUS")
        .to_uppercase()
        .replace(' ', "_")
}

fn wrap(parts: &Parts, handler: Option<&HandlerResponse>) -> ResponseFormat {
    let (messages, data): (Vec<String>, Value) = match handler {
        Some(r) => (r.messages.clone(), r.data.clone()),
        None => (Vec::new(), Value::Null),
    };

    ResponseFormat {
        status: status_label(parts.status),
        code: parts.status.as_u16(),
        data,
        messages,
        date: Utc::now().to_rfc3339(),
    }
}

/// Middleware that wraps all responses in the standard ResponseFormat structure
pub async fn response_wrapper(req: Request<Body>, next: Next) -> Result<Response<Body>, Infallible> {
    let response: Response<Body> = next.run(req).await;
    let handler: Option<HandlerResponse> = response.extensions().get::<HandlerResponse>().cloned();
    let (mut parts, _) = response.into_parts();

    let wrapped: ResponseFormat = wrap(&parts, handler.as_ref());

    match serde_json::to_string_pretty(&wrapped) {
        Ok(pretty) => debug!("\nFinal response:\n{}", pretty),
        Err(err) => error!("Failed to format response JSON: {:?}", err),
    }

    let json_body: Vec<u8> = serde_json::to_vec(&wrapped).unwrap_or_else(|_| b"{}".to_vec());
    parts.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);

    Ok(Response::from_parts(parts, Body::from(json_body)))
}
