// Maps errors raised by tower layers to HTTP responses

use axum::{http::StatusCode, BoxError};
use std::error::Error;
// tower's error type for timeouts
use tower::timeout::error::Elapsed;
// Axum uses http_body_util for length-limiting
use http_body_util::LengthLimitError;
use tracing::warn;

use crate::utils::response_handler::HandlerResponse;

/// Turns a layer error into a response the envelope middleware can wrap
pub async fn handle_global_error(err: BoxError) -> HandlerResponse {
    let (status, message): (StatusCode, &str) = classify(&*err);
    warn!(status = status.as_u16(), "Request failed in a layer: {}", err);

    HandlerResponse::new(status).message(message)
}

fn classify(err: &(dyn Error + 'static)) -> (StatusCode, &'static str) {
    if err.is::<LengthLimitError>() || find_cause::<LengthLimitError>(err).is_some() {
        return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
    }

    if err.is::<Elapsed>() || find_cause::<Elapsed>(err).is_some() {
        return (StatusCode::REQUEST_TIMEOUT, "Request timed out");
    }

    (StatusCode::INTERNAL_SERVER_ERROR, "Unhandled internal error")
}

/// Walks the source chain looking for a specific error type
pub fn find_cause<T: Error + 'static>(err: &dyn Error) -> Option<&T> {
    let mut source: Option<&dyn Error> = err.source();

    while let Some(s) = source {
        if let Some(typed) = s.downcast_ref::<T>() {
            return Some(typed);
        }
        source = s.source();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("wrapped")]
    struct Wrapper(#[source] Elapsed);

    #[test]
    fn timeouts_map_to_408_even_when_wrapped() {
        let direct: BoxError = Box::new(Elapsed::new());
        let wrapped: BoxError = Box::new(Wrapper(Elapsed::new()));

        assert_eq!(classify(&*direct).0, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(classify(&*wrapped).0, StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn unknown_errors_map_to_500() {
        let err: BoxError = "boom".into();
        assert_eq!(classify(&*err).0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
