use actix_web::{middleware::Logger, web, App, HttpServer};
use actix_web::dev::Server;
use std::net::TcpListener;

use crate::configuration::Settings;
use crate::lifecycle::AccountLifecycle;
use crate::middleware::{JwtMiddleware, RateLimit, RateLimiter};
use crate::routes::{
    approve_registration, get_current_user, health_check, login, pending_registrations, refresh,
    register, reject_registration,
};

pub fn run(
    listener: TcpListener,
    lifecycle: AccountLifecycle,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let jwt_settings = settings.jwt.clone();
    let limits = settings.rate_limit;

    // One limiter per policed route, shared across workers.
    let login_limiter = RateLimiter::per_minute(limits.login_per_minute, limits.enabled);
    let registration_limiter =
        RateLimiter::per_minute(limits.registration_per_minute, limits.enabled);
    let health_limiter = RateLimiter::per_minute(limits.health_per_minute, limits.enabled);

    let lifecycle = web::Data::new(lifecycle);
    let jwt_data = web::Data::new(settings.jwt);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(lifecycle.clone())
            .app_data(jwt_data.clone())
            // Public routes, throttled
            .service(
                web::resource("/health_check")
                    .wrap(RateLimit::new(health_limiter.clone()))
                    .route(web::get().to(health_check)),
            )
            .service(
                web::resource("/auth/login")
                    .wrap(RateLimit::new(login_limiter.clone()))
                    .route(web::post().to(login)),
            )
            .service(
                web::resource("/register")
                    .wrap(RateLimit::new(registration_limiter.clone()))
                    .route(web::post().to(register)),
            )
            // Public, unthrottled
            .route("/auth/refresh", web::post().to(refresh))
            // Protected routes (bearer access token required)
            .service(
                web::scope("/auth")
                    .wrap(JwtMiddleware::new(jwt_settings.clone()))
                    .route("/me", web::get().to(get_current_user)),
            )
            .service(
                web::scope("/admin")
                    .wrap(JwtMiddleware::new(jwt_settings.clone()))
                    .route("/pending-registrations", web::get().to(pending_registrations))
                    .route("/registrations/{id}/approve", web::post().to(approve_registration))
                    .route("/registrations/{id}/reject", web::post().to(reject_registration)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
