// web-server/src/api/auth.rs
use std::collections::BTreeMap;

use actix::Addr;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header;
use actix_web::{get, post, web, HttpMessage, HttpRequest, HttpResponse};
use common::auth::{IdentityAssertion, SignatureVerifier, VerifyReason};
use common::models::{VisitorIdentity, VisitorResponse};
use common::Config;
use serde_json::json;

use super::{current_session, SESSION_COOKIE_NAME};
use crate::error::ApiError;
use crate::session_registry::{AuthenticateSession, SessionRegistryActor};

/// Widget redirect flow. Fields arrive in the query string and the browser
/// is sent back to the chat page.
#[get("/callback")]
pub async fn callback_redirect(
    req: HttpRequest,
    verifier: web::Data<SignatureVerifier>,
    registry: web::Data<Addr<SessionRegistryActor>>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let assertion = parse_query(req.query_string())?;
    let (cookie, _) = login(&req, assertion, &verifier, &registry, &config).await?;

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, "/"))
        .cookie(cookie)
        .finish())
}

/// Script callback flow. Fields arrive as a JSON object or a form body;
/// query-string fields are accepted too, with the body taking precedence.
#[post("/callback")]
pub async fn callback_submit(
    req: HttpRequest,
    body: web::Bytes,
    verifier: web::Data<SignatureVerifier>,
    registry: web::Data<Addr<SessionRegistryActor>>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let mut assertion = parse_query(req.query_string())?;
    assertion.merge(parse_body(&req, &body)?);

    let (cookie, visitor) = login(&req, assertion, &verifier, &registry, &config).await?;

    let user = VisitorResponse {
        id: visitor.user_id,
        username: visitor.username,
        first_name: visitor.first_name,
    };
    Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "success": true,
        "message": VerifyReason::Ok.message(),
        "user": user,
    })))
}

#[get("/check-auth")]
pub async fn check_auth(
    req: HttpRequest,
    registry: web::Data<Addr<SessionRegistryActor>>,
) -> Result<HttpResponse, ApiError> {
    let body = match current_session(&req, &registry).await? {
        Some(session) => json!({
            "success": true,
            "authenticated": true,
            "user": VisitorResponse::from(&session),
        }),
        None => json!({
            "success": true,
            "authenticated": false,
        }),
    };
    Ok(HttpResponse::Ok().json(body))
}

/// Verify the assertion, store the visitor and build the session cookie
async fn login(
    req: &HttpRequest,
    assertion: IdentityAssertion,
    verifier: &SignatureVerifier,
    registry: &Addr<SessionRegistryActor>,
    config: &Config,
) -> Result<(Cookie<'static>, VisitorIdentity), ApiError> {
    let verdict = verifier.verify(&assertion);
    if verdict.reason == VerifyReason::BadSecret {
        return Err(ApiError::Configuration(verdict.reason.message().to_string()));
    }
    if !verdict.valid {
        tracing::warn!(reason = %verdict.reason, "Rejected login assertion");
        return Err(ApiError::Auth(verdict.reason));
    }

    let visitor = VisitorIdentity::from_assertion(&assertion);
    let previous_token = req.cookie(SESSION_COOKIE_NAME).map(|c| c.value().to_string());
    let session_token = registry
        .send(AuthenticateSession { previous_token, visitor: visitor.clone() })
        .await?;

    let cookie = Cookie::build(SESSION_COOKIE_NAME, session_token)
        .path("/")
        .secure(config.session.secure_cookie)
        .http_only(true)
        // Lax so the cookie survives the widget's top-level redirect
        .same_site(SameSite::Lax)
        .finish();

    Ok((cookie, visitor))
}

fn parse_query(query: &str) -> Result<IdentityAssertion, ApiError> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .map(|pairs| pairs.into_iter().collect())
        .map_err(|_| ApiError::Auth(VerifyReason::MissingFields))
}

fn parse_body(req: &HttpRequest, body: &[u8]) -> Result<IdentityAssertion, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(IdentityAssertion::new());
    }

    if req.content_type() == "application/x-www-form-urlencoded" {
        return serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
            .map(|pairs| pairs.into_iter().collect())
            .map_err(|_| ApiError::Auth(VerifyReason::MissingFields));
    }

    serde_json::from_slice::<BTreeMap<String, serde_json::Value>>(body)
        .map(IdentityAssertion::from_json)
        .map_err(|_| ApiError::Auth(VerifyReason::MissingFields))
}
