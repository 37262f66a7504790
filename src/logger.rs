use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::Instant;

use crate::middleware::AuthenticatedUser;

/// Request logging middleware
///
/// One structured line per request. Headers are never logged, they carry tokens;
/// the verified user id is logged instead when the route required one.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequestLoggerService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestLoggerService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerService<S>
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
        let start_time = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();

        let service = self.service.clone();

        Box::pin(async move {
            let res = service.call(req).await;
            let elapsed_ms = start_time.elapsed().as_millis() as u64;

            match &res {
                Ok(response) => {
                    let user_id = response
                        .request()
                        .extensions()
                        .get::<AuthenticatedUser>()
                        .map(|user| user.0.to_string());
                    tracing::info!(
                        method = %method,
                        path = %path,
                        user_id = user_id.as_deref().unwrap_or("-"),
                        status = response.status().as_u16(),
                        elapsed_ms,
                        "Request completed"
                    );
                }
                Err(e) => {
                    tracing::info!(
                        method = %method,
                        path = %path,
                        status = e.as_response_error().status_code().as_u16(),
                        elapsed_ms,
                        "Request failed"
                    );
                }
            }

            res
        })
    }
}
