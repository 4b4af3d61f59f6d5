/// JWT Authentication Middleware
///
/// Requires `Authorization: Bearer <token>`, validates the access token and
/// injects the subject into the request context for route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    http::header::AUTHORIZATION,
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::TokenSigner;
use crate::error::{AppError, AuthError, ErrorHandler};
use crate::middleware::context::{attach_once, request_id, AuthenticatedUser};

/// JWT middleware for protecting routes
///
/// Must be applied to routes that require authentication.
pub struct JwtMiddleware {
    signer: TokenSigner,
}

impl JwtMiddleware {
    /// Create new JWT middleware instance
    pub fn new(signer: TokenSigner) -> Self {
        Self { signer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            signer: self.signer.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    signer: TokenSigner,
}

/// Pull the token out of a `Bearer <token>` header value.
fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = match header {
        None | Some("") => return Err(AuthError::MissingAuthorization),
        Some(header) => header,
    };

    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] => Ok(token),
        _ => Err(AuthError::MalformedAuthorization),
    }
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let outcome = match req.headers().get(AUTHORIZATION) {
            None => bearer_token(None),
            Some(value) => match value.to_str() {
                Ok(value) => bearer_token(Some(value)),
                Err(_) => Err(AuthError::MalformedAuthorization),
            },
        }
        .and_then(|token| self.signer.validate_access_token(token));

        match outcome {
            Ok(user_id) => {
                tracing::debug!(user_id = %user_id, "JWT validated successfully");
                attach_once(&req, AuthenticatedUser(user_id));

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                let request_id = request_id(&req).unwrap_or_default();
                let error = AppError::from(e);
                error.log_error(&request_id);
                let response = error.to_http_response(&request_id);

                Box::pin(async move { Err(InternalError::from_response(error, response).into()) })
            }
        }
    }
}
