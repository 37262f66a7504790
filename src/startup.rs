use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::SessionService;
use crate::configuration::ApplicationSettings;
use crate::logger::RequestLogger;
use crate::middleware::RequireAccessToken;
use crate::routes::{health_check, login, refresh, reset, revoke, update_password};

/// Start serving on `listener`.
///
/// All state is built by the caller and handed in here.
pub fn run(
    listener: TcpListener,
    sessions: SessionService,
    application: ApplicationSettings,
) -> Result<Server, std::io::Error> {
    let sessions = web::Data::new(sessions);
    let application = web::Data::new(application);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(sessions.clone())
            .app_data(application.clone())
            // Public routes
            .route("/api/healthz", web::get().to(health_check))
            .route("/api/login", web::post().to(login))
            .route("/api/refresh", web::post().to(refresh))
            .route("/api/revoke", web::post().to(revoke))
            // Routes that require an access token
            .service(
                web::scope("/api/users")
                    .wrap(RequireAccessToken::new(sessions.clone()))
                    .route("", web::put().to(update_password)),
            )
            .route("/admin/reset", web::post().to(reset))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
