use crate::error::HttpRejection;
use crate::http_adapter::RequestPrincipalSlot;
use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use auth_guard::GuardError;
use request_context::AuthenticatedPrincipal;
use std::future::{ready, Ready};
use std::ops::Deref;

/// Principal attached by [`AccessGuard`](crate::AccessGuard)
///
/// Extraction fails with 401 on public handlers or routes without a guard.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub AuthenticatedPrincipal);

impl CurrentPrincipal {
    pub fn into_inner(self) -> AuthenticatedPrincipal {
        self.0
    }
}

impl Deref for CurrentPrincipal {
    type Target = AuthenticatedPrincipal;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for CurrentPrincipal {
    type Error = HttpRejection;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let principal = req
            .extensions()
            .get::<RequestPrincipalSlot>()
            .and_then(|slot| slot.0.read().clone());

        ready(principal.map(CurrentPrincipal).ok_or_else(|| {
            GuardError::unauthenticated("handler requires a principal but none was attached").into()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_adapter::HttpAdapter;
    use actix_web::test::TestRequest;
    use request_context::ExecutionContextAdapter;

    #[actix_web::test]
    async fn test_extracts_attached_principal() {
        let (req, mut payload) = TestRequest::get().uri("/me").to_http_parts();
        HttpAdapter
            .extract_raw_request(&req)
            .attach_principal(AuthenticatedPrincipal::new("u1", "ext-1", "a@b.c", "client"));

        let principal = CurrentPrincipal::from_request(&req, &mut payload)
            .await
            .expect("principal");
        assert_eq!(principal.id, "u1");
        assert_eq!(principal.role, "client");
    }

    #[actix_web::test]
    async fn test_missing_principal_is_unauthenticated() {
        let (req, mut payload) = TestRequest::get().uri("/me").to_http_parts();
        let err = CurrentPrincipal::from_request(&req, &mut payload)
            .await
            .expect_err("no principal");
        assert!(matches!(err.guard_error(), GuardError::Unauthenticated { .. }));
    }
}
