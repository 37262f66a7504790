/// Access Token Middleware
///
/// Verifies the `Authorization: Bearer <access token>` header and injects the
/// caller's `AuthenticatedUser` into request extensions for route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use uuid::Uuid;

use crate::auth::{authorization_header, SessionService};
use crate::error::AppError;

/// Identity resolved from a verified access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

/// Middleware for routes that require an access token
pub struct RequireAccessToken {
    sessions: web::Data<SessionService>,
}

impl RequireAccessToken {
    pub fn new(sessions: web::Data<SessionService>) -> Self {
        Self { sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireAccessToken
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAccessTokenService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequireAccessTokenService {
            service: Rc::new(service),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct RequireAccessTokenService<S> {
    service: Rc<S>,
    sessions: web::Data<SessionService>,
}

impl<S, B> Service<ServiceRequest> for RequireAccessTokenService<S>
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
        let authenticated = authorization_header(req.request())
            .map_err(AppError::from)
            .and_then(|header| self.sessions.authenticate_request(header));

        match authenticated {
            Ok(user_id) => {
                req.extensions_mut().insert(AuthenticatedUser(user_id));
                tracing::debug!(user_id = %user_id, "Access token verified");

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => Box::pin(async move { Err(e.into()) }),
        }
    }
}
