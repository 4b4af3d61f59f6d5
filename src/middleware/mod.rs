/// Middleware module
///
/// The request interceptor chain. Applied outermost first:
/// `RequestIdMiddleware → LoggerMiddleware → Recoverer → Cors`, with
/// `JwtMiddleware` wrapped only around routes that require authentication.

mod context;
mod cors;
mod jwt_middleware;
mod logger;
mod recoverer;
mod request_id;

use actix_web::error::InternalError;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::Error;

pub use context::{authenticated_user, request_id, AuthenticatedUser, RequestId};
pub use cors::{Cors, CorsPolicy};
pub use jwt_middleware::JwtMiddleware;
pub use logger::LoggerMiddleware;
pub use recoverer::{abort_handler, ConnectionAborted, Recoverer};
pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER};

/// Render `err` now and stamp `headers` onto the response it produces.
///
/// Interceptors that decorate responses use this on the error path, where
/// no `ServiceResponse` exists yet.
pub(crate) fn with_error_headers(err: Error, headers: Vec<(HeaderName, HeaderValue)>) -> Error {
    if headers.is_empty() {
        return err;
    }

    let mut response = err.error_response();
    for (name, value) in headers {
        response.headers_mut().insert(name, value);
    }
    InternalError::from_response(err, response).into()
}
