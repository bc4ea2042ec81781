use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Request, Response};

/// Adds CORS headers to every `/api` response.
pub struct Cors {
    origin: String,
}

impl Cors {
    pub fn new(origin: &str) -> Self {
        Cors {
            origin: origin.to_string(),
        }
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS Headers",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        if !req.uri().path().starts_with("/api") {
            return;
        }
        res.set_header(Header::new("Access-Control-Allow-Origin", self.origin.clone()));
        res.set_header(Header::new("Access-Control-Allow-Methods", "GET, POST, OPTIONS"));
        res.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type"));
        // Credentials are only allowed alongside an explicit origin.
        if self.origin != "*" {
            res.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
            res.set_header(Header::new("Vary", "Origin"));
        }
    }
}
