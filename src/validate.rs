use std::sync::OnceLock;

use lettre::message::Mailbox;
use lettre::Address;
use regex::Regex;

/// Shape check only: `local@domain.tld` with no whitespace and a single `@`.
/// Says nothing about deliverability.
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex compiles"))
        .is_match(email)
}

/// Shape check plus the relay's own address grammar. Anything that passes
/// here can be put on an envelope.
pub fn is_valid_recipient(email: &str) -> bool {
    is_valid_email(email)
        && email.parse::<Address>().is_ok()
        && email.parse::<Mailbox>().is_ok()
}
