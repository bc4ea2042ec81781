use log::{error, info, warn};
use std::path::Path;
use std::process;

use rocket::figment::Figment;

use crate::config::Config;

/// Run all boot checks. Call this before Rocket launches.
/// Builds the validated configuration, warns about loose settings, and
/// aborts if mail credentials are missing or unusable.
pub fn run(figment: &Figment) -> Config {
    info!("dermamail boot check starting...");

    let mut warnings = 0u32;

    // ── 1. Mail configuration ──────────────────────────
    let config = match Config::from_figment(figment) {
        Ok(c) => c,
        Err(e) => {
            error!("  {}", e);
            error!("Boot check FAILED. Set EMAIL_USER and EMAIL_PASS (or [default.mail] in Rocket.toml). Aborting.");
            process::exit(1);
        }
    };
    info!(
        "  Mail relay {}:{} as {}",
        config.smtp_host,
        config.smtp_port,
        config.masked_user()
    );

    // ── 2. CORS posture ────────────────────────────────
    if config.cors_origin == "*" {
        warn!("  CORS allows any origin (mail.cors_origin = \"*\"), tighten before production");
        warnings += 1;
    }

    // ── 3. Outbound throttling ─────────────────────────
    if config.max_sends == 0 {
        warn!("  Outbound mail is not throttled (mail.max_sends = 0)");
        warnings += 1;
    } else {
        info!(
            "  Outbound mail limited to {} per client every {}s",
            config.max_sends,
            config.window.as_secs()
        );
    }

    // ── 4. Rocket.toml exists ───────────────────────────
    let rocket_toml = std::env::var("ROCKET_CONFIG").unwrap_or_else(|_| "Rocket.toml".to_string());
    if !Path::new(&rocket_toml).exists() {
        warn!("  {} not found, using defaults and environment", rocket_toml);
        warnings += 1;
    }

    // ── Summary ─────────────────────────────────────────
    if warnings > 0 {
        warn!("Boot check passed with {} warning(s).", warnings);
    } else {
        info!("Boot check passed. All systems go.");
    }

    config
}
