use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::{RefreshSessionManager, TokenSigner};
use crate::middleware::{
    Cors, CorsPolicy, JwtMiddleware, LoggerMiddleware, Recoverer, RequestIdMiddleware,
};
use crate::routes::{get_current_user, health_check, index, logout, refresh};

pub fn run(
    listener: TcpListener,
    signer: TokenSigner,
    sessions: RefreshSessionManager,
    cors: CorsPolicy,
) -> Result<Server, std::io::Error> {
    let signer_data = web::Data::new(signer.clone());
    let sessions_data = web::Data::new(sessions);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware, innermost first
            .wrap(Cors::new(cors.clone()))
            .wrap(Recoverer)
            .wrap(LoggerMiddleware)
            .wrap(RequestIdMiddleware)

            // Shared state
            .app_data(signer_data.clone())
            .app_data(sessions_data.clone())

            // Public routes (no authentication required)
            .route("/", web::get().to(index))
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/auth")
                            .route("/refresh", web::post().to(refresh))
                            .route("/logout", web::post().to(logout)),
                    )
                    // Protected routes (require JWT authentication)
                    .service(
                        web::resource("/me")
                            .wrap(JwtMiddleware::new(signer.clone()))
                            .route(web::get().to(get_current_user)),
                    ),
            )
    })
    .shutdown_timeout(5)
    .listen(listener)?
    .run();

    Ok(server)
}
