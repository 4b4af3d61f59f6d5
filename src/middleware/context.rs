/// Request-scoped context
///
/// Typed values attached to a request by the interceptor chain and read by
/// everything downstream. Each value is set once per request.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::error::InternalError;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};

use crate::error::{AppError, AuthError, ErrorHandler};

/// Identifier assigned by the request id interceptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subject of a validated access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl AuthenticatedUser {
    pub fn user_id(&self) -> &str {
        &self.0
    }
}

/// Request id of `req`, if the request id interceptor has run.
pub fn request_id<R: HttpMessage>(req: &R) -> Option<String> {
    req.extensions().get::<RequestId>().map(|id| id.0.clone())
}

/// User id of `req`, if the request passed the auth gate.
pub fn authenticated_user<R: HttpMessage>(req: &R) -> Option<String> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.0.clone())
}

/// Attach `value` unless one of the same type is already present.
pub(crate) fn attach_once<R: HttpMessage, T: 'static>(req: &R, value: T) {
    let mut extensions = req.extensions_mut();
    if !extensions.contains::<T>() {
        extensions.insert(value);
    }
}

impl FromRequest for RequestId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    /// Never fails; yields an empty id when the interceptor is not installed.
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(RequestId(request_id(req).unwrap_or_default())))
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match authenticated_user(req) {
            Some(user_id) => Ok(AuthenticatedUser(user_id)),
            None => {
                let error = AppError::from(AuthError::MissingAuthorization);
                let response = error.to_http_response(&request_id(req).unwrap_or_default());
                Err(InternalError::from_response(error, response).into())
            }
        };
        ready(result)
    }
}
