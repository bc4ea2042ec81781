use std::net::IpAddr;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use log::{error, info, warn};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde_json::{json, Value};

use crate::config::Config;
use crate::email::{MailTransport, OutgoingMail};
use crate::error::ApiError;
use crate::models::report::{Report, ReportRequest};
use crate::rate_limit::SendLimiter;
use crate::report;
use crate::validate::is_valid_recipient;

const DEFAULT_TEST_RECIPIENT: &str = "test@example.com";
const TEST_SUBJECT: &str = "Test Email from Derma Analyzer";

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Throttle outbound mail per client. Clients Rocket cannot identify share one bucket.
fn throttle(limiter: &SendLimiter, client_ip: Option<IpAddr>) -> Result<(), ApiError> {
    let key = client_ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    if limiter.check_and_record(&key) {
        Ok(())
    } else {
        warn!("[mail] Send limit reached for {}", key);
        Err(ApiError::Throttled)
    }
}

// ── Liveness ───────────────────────────────────────────

#[get("/test")]
pub fn test() -> Json<Value> {
    let timestamp = now_iso();
    info!("Test route hit at {}", timestamp);
    Json(json!({
        "success": true,
        "message": "Server is running!",
        "timestamp": timestamp,
    }))
}

// ── SMTP diagnostics ───────────────────────────────────

#[get("/test-email-config")]
pub async fn test_email_config(
    mailer: &State<Arc<dyn MailTransport>>,
    config: &State<Config>,
) -> Result<Json<Value>, ApiError> {
    info!("[mail] Verifying SMTP configuration for {}", config.masked_user());

    match mailer.verify().await {
        Ok(()) => {
            info!("[mail] SMTP configuration verified");
            Ok(Json(json!({
                "success": true,
                "message": "Email configuration is valid",
                "emailUser": config.masked_user(),
            })))
        }
        Err(e) => {
            error!("[mail] SMTP configuration check failed: {}", e);
            Err(ApiError::Verify(e.to_string()))
        }
    }
}

#[get("/send-test-email?<email>")]
pub async fn send_test_email(
    email: Option<String>,
    mailer: &State<Arc<dyn MailTransport>>,
    config: &State<Config>,
    limiter: &State<SendLimiter>,
    client_ip: Option<IpAddr>,
) -> Result<Json<Value>, ApiError> {
    let recipient = email
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_TEST_RECIPIENT.to_string());

    if !is_valid_recipient(&recipient) {
        warn!("[mail] Rejected test email to malformed address {:?}", recipient);
        return Err(ApiError::BadRequest("Invalid email format"));
    }
    throttle(limiter, client_ip)?;

    info!("[mail] Sending test email to {}", recipient);
    let mail = OutgoingMail::new(&recipient, TEST_SUBJECT, report::test_email_html(Utc::now()))
        .with_sender_name(format!("{} Test", config.from_name));

    match mailer.send(mail).await {
        Ok(message_id) => {
            info!("[mail] Test email sent, Message-ID {}", message_id);
            Ok(Json(json!({
                "success": true,
                "messageId": message_id,
                "message": format!("Test email sent to {}", recipient),
            })))
        }
        Err(e) => {
            error!("[mail] Failed to send test email to {}: {}", recipient, e);
            Err(ApiError::Delivery(e.to_string()))
        }
    }
}

// ── Report delivery ────────────────────────────────────

#[post("/send-report", data = "<request>")]
pub async fn send_report(
    request: Json<ReportRequest>,
    mailer: &State<Arc<dyn MailTransport>>,
    limiter: &State<SendLimiter>,
    client_ip: Option<IpAddr>,
) -> Result<Json<Value>, ApiError> {
    let ReportRequest { email, report_data } = request.into_inner();

    let email = match email.filter(|e| !e.is_empty()) {
        Some(e) => e,
        None => {
            warn!("[report] Rejected request without email");
            return Err(ApiError::BadRequest("Email is required"));
        }
    };
    if !is_valid_recipient(&email) {
        warn!("[report] Rejected malformed email {:?}", email);
        return Err(ApiError::BadRequest("Invalid email format"));
    }
    let report = match report_data.and_then(Report::from_data) {
        Some(r) => r,
        None => {
            warn!("[report] Rejected request without report data for {}", email);
            return Err(ApiError::BadRequest("Report data is required"));
        }
    };
    throttle(limiter, client_ip)?;

    info!(
        "[report] Rendering report for {} (disease name {}, {} treatment(s))",
        email,
        if report.diagnosis.disease_name.is_some() { "present" } else { "absent" },
        report.treatments.len(),
    );
    let html = report::render_report(&report, Utc::now());
    let mail = OutgoingMail::new(&email, report::report_subject(&report), html);

    match mailer.send(mail).await {
        Ok(message_id) => {
            info!("[report] Report sent to {}, Message-ID {}", email, message_id);
            Ok(Json(json!({
                "success": true,
                "messageId": message_id,
            })))
        }
        Err(e) => {
            error!("[report] Failed to send report to {}: {}", email, e);
            Err(ApiError::Delivery(format!("Email sending failed: {}", e)))
        }
    }
}

// ── CORS preflight ─────────────────────────────────────

#[options("/<_..>")]
pub fn preflight() -> Status {
    Status::NoContent
}

pub fn routes() -> Vec<rocket::Route> {
    routes![test, test_email_config, send_test_email, send_report, preflight]
}
