use actix_web::HttpResponse;

/// GET /health_check
///
/// Liveness only: touches neither the catalog nor the token store.
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}
