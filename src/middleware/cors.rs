/// CORS Middleware
///
/// Origin policy from a comma separated allow-list, or `*` for any origin.
/// Permitted origins get the access-control headers; every `OPTIONS`
/// pre-flight is answered with an empty 204 here, permitted or not. The
/// browser enforces the block from the missing headers.

use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        header::{
            HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS,
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ORIGIN,
        },
        Method,
    },
    Error, HttpResponse,
};
use futures::future::LocalBoxFuture;

use crate::middleware::with_error_headers;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS";
const ALLOWED_HEADERS: &str =
    "Accept, Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, Authorization, X-Request-ID";
const MAX_AGE_SECONDS: &str = "300";

/// Parsed allow-list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    allow_any: bool,
    origins: Vec<String>,
}

impl CorsPolicy {
    /// Parse `"*"` or `"http://a.test, http://b.test"`.
    pub fn parse(allowed_origins: &str) -> Self {
        let allowed_origins = allowed_origins.trim();
        Self {
            allow_any: allowed_origins == "*",
            origins: allowed_origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        }
    }

    /// Exact string match, or anything under the wildcard.
    pub fn allows(&self, origin: &str) -> bool {
        self.allow_any || self.origins.iter().any(|allowed| allowed == origin)
    }

    fn headers_for(&self, origin: &HeaderValue) -> Vec<(HeaderName, HeaderValue)> {
        vec![
            (ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone()),
            (
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            ),
            (
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_HEADERS),
            ),
            (
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            ),
            (ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECONDS)),
        ]
    }
}

/// Origin policy interceptor
pub struct Cors {
    policy: Rc<CorsPolicy>,
}

impl Cors {
    pub fn new(policy: CorsPolicy) -> Self {
        Self {
            policy: Rc::new(policy),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Cors
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = CorsService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(CorsService {
            service: Rc::new(service),
            policy: self.policy.clone(),
        }))
    }
}

pub struct CorsService<S> {
    service: Rc<S>,
    policy: Rc<CorsPolicy>,
}

impl<S, B> Service<ServiceRequest> for CorsService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let origin = match req.headers().get(ORIGIN) {
            Some(origin) if !origin.is_empty() => origin.clone(),
            _ => {
                let service = self.service.clone();
                return Box::pin(async move {
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                });
            }
        };

        let allowed = origin
            .to_str()
            .map(|origin| self.policy.allows(origin))
            .unwrap_or(false);
        let headers = if allowed {
            self.policy.headers_for(&origin)
        } else {
            tracing::debug!(origin = ?origin, "Origin not in CORS allow-list");
            Vec::new()
        };

        if req.method() == Method::OPTIONS {
            let mut preflight = HttpResponse::NoContent();
            for header in headers {
                preflight.insert_header(header);
            }
            let response = req.into_response(preflight.finish()).map_into_right_body();
            return Box::pin(async move { Ok(response) });
        }

        let service = self.service.clone();

        Box::pin(async move {
            match service.call(req).await {
                Ok(mut res) => {
                    for (name, value) in headers {
                        res.headers_mut().insert(name, value);
                    }
                    Ok(res.map_into_left_body())
                }
                Err(err) => Err(with_error_headers(err, headers)),
            }
        })
    }
}
