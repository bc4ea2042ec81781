#[macro_use]
extern crate rocket;

use std::process;
use std::sync::Arc;

use rocket::figment::Figment;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Build, Request, Rocket};
use serde_json::{json, Value};

mod boot;
mod config;
mod cors;
mod email;
mod error;
mod models;
mod rate_limit;
mod report;
mod routes;
mod validate;


use config::Config;
use cors::Cors;
use email::smtp::SmtpMailer;
use email::MailTransport;
use rate_limit::SendLimiter;

fn error_body(message: &str) -> Json<Value> {
    Json(json!({ "success": false, "error": message }))
}

#[catch(400)]
fn bad_request() -> Json<Value> {
    error_body("Invalid JSON in request body")
}

// A body that parses as JSON but not as a report is still a framing error.
#[catch(422)]
fn unprocessable() -> (Status, Json<Value>) {
    (Status::BadRequest, error_body("Invalid JSON in request body"))
}

#[catch(404)]
fn not_found() -> Json<Value> {
    error_body("Not found")
}

#[catch(413)]
fn payload_too_large() -> Json<Value> {
    error_body("Request body too large")
}

#[catch(500)]
fn server_error() -> Json<Value> {
    error_body("Internal server error")
}

#[catch(default)]
fn any_error(status: Status, _req: &Request) -> (Status, Json<Value>) {
    (status, error_body(status.reason().unwrap_or("Request failed")))
}

/// Assemble the application around an already-validated configuration and
/// a mail transport.
pub fn build(figment: Figment, config: Config, mailer: Arc<dyn MailTransport>) -> Rocket<Build> {
    let limiter = SendLimiter::new(config.max_sends, config.window);
    let cors = Cors::new(&config.cors_origin);

    rocket::custom(figment)
        .manage(config)
        .manage(mailer)
        .manage(limiter)
        .attach(cors)
        .mount("/api", routes::api::routes())
        .register("/", catchers![
            bad_request,
            unprocessable,
            not_found,
            payload_too_large,
            server_error,
            any_error
        ])
}

#[launch]
fn rocket() -> _ {
    env_logger::init();

    let figment = config::figment();

    // Exits when mail credentials are missing or unusable
    let config = boot::run(&figment);

    let mailer: Arc<dyn MailTransport> = match SmtpMailer::new(&config) {
        Ok(m) => Arc::new(m),
        Err(e) => {
            log::error!("Failed to set up SMTP transport: {}", e);
            process::exit(1);
        }
    };

    log::info!("API endpoints:");
    log::info!("  GET  /api/test                      liveness");
    log::info!("  GET  /api/test-email-config         verify SMTP credentials");
    log::info!("  GET  /api/send-test-email?email=... send a test email");
    log::info!("  POST /api/send-report               email a report");

    build(figment, config, mailer)
}
