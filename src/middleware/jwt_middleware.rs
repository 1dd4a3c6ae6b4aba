//! Bearer-token authentication middleware.
//!
//! Extracts the `Authorization: Bearer` header, verifies the token as an
//! access token, and injects the resulting [`Identity`] into request
//! extensions for route handlers and guards.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{verify_token, TokenKind};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Must be applied to routes that require authentication.
pub struct JwtMiddleware {
    jwt_config: JwtSettings,
}

impl JwtMiddleware {
    pub fn new(jwt_config: JwtSettings) -> Self {
        Self { jwt_config }
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
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
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
        let bearer = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string);

        let token = match bearer {
            Some(token) => token,
            None => {
                tracing::warn!("Missing or malformed Authorization header");
                let err = AppError::Auth(AuthError::MissingToken);
                return Box::pin(async move { Err(err.into()) });
            }
        };

        match verify_token(&token, TokenKind::Access, &self.jwt_config) {
            Ok(claims) => {
                let identity = claims.identity();
                tracing::debug!(
                    subject = %identity.subject,
                    role = %identity.role,
                    "Access token verified"
                );
                req.extensions_mut().insert(identity);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(err) => Box::pin(async move { Err(err.into()) }),
        }
    }
}
