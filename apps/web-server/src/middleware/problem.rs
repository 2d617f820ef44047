//! Not-found middleware - every 404 leaves as a problem document that names
//! the requested path.

use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::StatusCode,
};
use postboard_shared::ErrorResponse;
use std::future::{Future, Ready, ready};
use std::pin::Pin;

use crate::observability::RequestId;

const DEFAULT_DETAIL: &str = "The requested resource was not found.";

/// Rewrites 404 responses (unknown routes, bad path parameters, missing
/// entities) into RFC 7807 documents with `instance` set to the request path.
pub struct NotFoundMiddleware;

impl<S, B> Transform<S, ServiceRequest> for NotFoundMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = NotFoundMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(NotFoundMiddlewareService { service }))
    }
}

pub struct NotFoundMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for NotFoundMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            if res.status() != StatusCode::NOT_FOUND {
                return Ok(res.map_into_left_body());
            }

            let detail = res
                .response()
                .error()
                .map(|e| e.to_string())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| DEFAULT_DETAIL.to_string());

            let (http_req, _res) = res.into_parts();
            let mut error = ErrorResponse::not_found(detail).with_instance(http_req.path());
            if let Some(id) = http_req.extensions().get::<RequestId>() {
                error = error.with_request_id(id.as_str());
            }
            tracing::debug!(path = %http_req.path(), "Not found");

            let response = HttpResponse::NotFound().json(error);
            Ok(ServiceResponse::new(http_req, response).map_into_right_body())
        })
    }
}
