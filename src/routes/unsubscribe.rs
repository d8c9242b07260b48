use actix_web::{web, HttpResponse, Responder};
use serde_json::Value;
use validator::Validate;

use crate::models::{ErrorResponse, UnsubscribeQuery, UnsubscribeResponse};
use crate::routes::matches::AppState;
use crate::token::{consume_jti, record_jti_consumed, TokenError};

/// Configure the unsubscribe route (outside the API scope; the URL lands in
/// email clients)
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/unsubscribe", web::get().to(unsubscribe));
}

/// One-click unsubscribe endpoint
///
/// GET /unsubscribe?token=...
///
/// The token carries the email address and a one-time `jti`. A replayed
/// token succeeds idempotently with `alreadyProcessed` set.
async fn unsubscribe(
    state: web::Data<AppState>,
    query: web::Query<UnsubscribeQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let claims = match state.tokens.verify(&query.token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::info!("unsubscribe token rejected: {}", e);
            let (error, status) = match e {
                TokenError::Expired => ("This link has expired", 410),
                _ => ("Invalid unsubscribe link", 400),
            };
            return HttpResponse::build(
                actix_web::http::StatusCode::from_u16(status)
                    .unwrap_or(actix_web::http::StatusCode::BAD_REQUEST),
            )
            .json(ErrorResponse {
                error: error.to_string(),
                message: e.to_string(),
                status_code: status,
            });
        }
    };

    let Some(email) = claims.get("email").and_then(Value::as_str) else {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid unsubscribe link".to_string(),
            message: "token is missing the email claim".to_string(),
            status_code: 400,
        });
    };
    let user_id = claims.get("sub").and_then(Value::as_str);
    let jti = claims.get("jti").and_then(Value::as_str);

    // Replay check is best-effort; an unreachable log never blocks the
    // opt-out itself
    if let Some(jti) = jti {
        let check = consume_jti(state.postgres.as_ref(), jti).await;
        if check.already_used {
            return HttpResponse::Ok().json(UnsubscribeResponse {
                success: true,
                already_processed: true,
                message: "You were already unsubscribed.".to_string(),
            });
        }
    }

    let newly_opted_out = match state.postgres.record_opt_out(email).await {
        Ok(newly) => newly,
        Err(e) => {
            tracing::error!("failed to record opt-out for {}: {}", email, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Unsubscribe failed".to_string(),
                message: "could not record the opt-out, please try again".to_string(),
                status_code: 500,
            });
        }
    };

    if let Some(jti) = jti {
        record_jti_consumed(state.postgres.as_ref(), jti, user_id, "unsubscribe").await;
    }

    HttpResponse::Ok().json(UnsubscribeResponse {
        success: true,
        already_processed: !newly_opted_out,
        message: "You have been unsubscribed.".to_string(),
    })
}
