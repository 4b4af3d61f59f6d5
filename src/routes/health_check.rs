use actix_web::HttpResponse;

pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().body("OK")
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().body("Social Media App API is running!")
}
