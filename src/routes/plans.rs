use actix_web::{web, HttpResponse, Responder};

use crate::models::ErrorResponse;
use crate::plans::PlanReconciler;
use crate::routes::matches::AppState;
use crate::services::{PostgresClient, StripeClient};

/// Configure plan reconciliation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/plans/consistency", web::get().to(check_consistency))
        .route("/plans/sync", web::post().to(sync_plans));
}

fn reconciler(state: &AppState) -> PlanReconciler<PostgresClient, StripeClient> {
    PlanReconciler::new(
        state.postgres.clone(),
        state.stripe.clone(),
        state.plan_tolerance_secs,
    )
}

/// Read-only consistency report against the billing provider
///
/// GET /api/v1/plans/consistency
async fn check_consistency(state: web::Data<AppState>) -> impl Responder {
    match reconciler(&state).validate_consistency().await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            tracing::error!("consistency check failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Consistency check failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Corrective sync: adopt the billing provider's values for drifted records
///
/// POST /api/v1/plans/sync
async fn sync_plans(state: web::Data<AppState>) -> impl Responder {
    match reconciler(&state).sync_all_plans().await {
        Ok(report) => {
            tracing::info!(
                "plan sync: {} checked, {} updated, {} failed",
                report.checked,
                report.updated,
                report.failed
            );
            HttpResponse::Ok().json(report)
        }
        Err(e) => {
            tracing::error!("plan sync failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Plan sync failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}
