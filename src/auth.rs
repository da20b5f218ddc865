use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use http::HeaderName;

use crate::AppState;
use crate::error::ApiError;
use crate::models::TenantContext;
use crate::settings::Settings;

pub const TENANT_HEADER: HeaderName = HeaderName::from_static("x-tenant-id");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Tenant,
    Superuser,
}

#[derive(Debug, Default, serde::Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

pub fn verify_token(
    settings: &Settings,
    auth: Option<Authorization<Bearer>>,
    query_token: Option<&str>,
) -> Result<Caller, ApiError> {
    let provided_token = auth
        .map(|a| a.token().to_string())
        .or_else(|| query_token.map(|s| s.to_string()));
    match provided_token {
        Some(token) if settings.admin_token.as_deref() == Some(token.as_str()) => {
            Ok(Caller::Superuser)
        }
        Some(token) if token == settings.auth_token => Ok(Caller::Tenant),
        _ => Err(ApiError::Unauthorized(
            "Invalid authentication token".into(),
        )),
    }
}

pub fn tenant_from_parts(parts: &Parts) -> Result<String, ApiError> {
    parts
        .headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|tenant| !tenant.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("Missing x-tenant-id header".into()))
}

impl FromRequestParts<AppState> for TenantContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = parts.headers.typed_get::<Authorization<Bearer>>();
        let query = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();
        let caller = verify_token(&state.settings, bearer, query.token.as_deref())?;
        let tenant_id = tenant_from_parts(parts)?;

        Ok(match caller {
            Caller::Tenant => TenantContext::tenant(tenant_id),
            Caller::Superuser => TenantContext::superuser(tenant_id),
        })
    }
}
