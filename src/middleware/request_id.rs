/// Request ID Middleware
///
/// Reuses an inbound `X-Request-ID` or generates a UUID, attaches it to the
/// request context and echoes it on every response, error responses included.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use uuid::Uuid;

use crate::middleware::context::{attach_once, RequestId};
use crate::middleware::with_error_headers;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Outermost interceptor; never fails on its own.
pub struct RequestIdMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RequestIdMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestIdMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequestIdMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestIdMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestIdMiddlewareService<S>
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
        let inbound = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|id| !id.is_empty())
            .map(str::to_owned);

        let request_id = inbound.unwrap_or_else(|| Uuid::new_v4().to_string());
        attach_once(&req, RequestId(request_id.clone()));

        // Inbound values already passed header validation; UUIDs always do.
        let header = HeaderValue::from_str(&request_id)
            .ok()
            .map(|value| (HeaderName::from_static("x-request-id"), value));

        let service = self.service.clone();

        Box::pin(async move {
            match service.call(req).await {
                Ok(mut res) => {
                    if let Some((name, value)) = header {
                        res.headers_mut().insert(name, value);
                    }
                    Ok(res)
                }
                Err(err) => Err(with_error_headers(err, header.into_iter().collect())),
            }
        })
    }
}
