/// Panic Recovery Middleware
///
/// Contains panics raised anywhere further down the chain, logs them with the
/// backtrace captured at the panic site and answers with a plain 500. A panic
/// carrying [`ConnectionAborted`] is re-raised instead: the client is gone and
/// there is nothing to answer.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Once;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    http::header::ContentType,
    Error, HttpResponse,
};
use futures::future::{FutureExt, LocalBoxFuture};

use crate::middleware::context::request_id;

/// Panic payload meaning "abort this response".
///
/// Raise it with [`abort_handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionAborted;

/// Unwind out of the current handler without producing a response.
pub fn abort_handler() -> ! {
    panic::panic_any(ConnectionAborted)
}

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

/// Chain a panic hook that records the backtrace of each panic on its thread.
fn install_backtrace_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            // aborts are expected control flow
            if info.payload().is::<ConnectionAborted>() {
                return;
            }
            let backtrace = Backtrace::force_capture().to_string();
            LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
            previous(info);
        }));
    });
}

fn take_backtrace() -> String {
    LAST_BACKTRACE
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_else(|| "<backtrace unavailable>".to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Panic guard for everything wrapped inside it
pub struct Recoverer;

impl<S, B> Transform<S, ServiceRequest> for Recoverer
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RecovererService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        install_backtrace_hook();
        std::future::ready(Ok(RecovererService {
            service: Rc::new(service),
        }))
    }
}

pub struct RecovererService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RecovererService<S>
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
        let request_id = request_id(&req).unwrap_or_default();
        let method = req.method().to_string();
        let path = req.path().to_string();

        let service = self.service.clone();

        Box::pin(async move {
            // `call` itself runs inside the guard so synchronous panics are caught too
            let outcome = AssertUnwindSafe(async move { service.call(req).await })
                .catch_unwind()
                .await;

            match outcome {
                Ok(result) => result,
                Err(payload) => {
                    if payload.is::<ConnectionAborted>() {
                        panic::resume_unwind(payload);
                    }

                    tracing::error!(
                        error = %panic_message(payload.as_ref()),
                        backtrace = %take_backtrace(),
                        request_id = %request_id,
                        method = %method,
                        path = %path,
                        "panic recovered"
                    );

                    let response = HttpResponse::InternalServerError()
                        .content_type(ContentType::plaintext())
                        .body("Internal Server Error");
                    Err(InternalError::from_response("panic recovered", response).into())
                }
            }
        })
    }
}
