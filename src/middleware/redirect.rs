use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::uri::Origin;
use rocket::http::Method;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest};
use rocket::response::Redirect;
use rocket::{Data, Request};

use crate::config::HostRedirect;

/// Internal route requests for a redirected host are rewritten to.
pub const CANONICAL_REDIRECT_PATH: &str = "/__canonical-host";

/// Permanently redirects requests for the bare domain to the canonical `https://www.` host.
#[derive(Debug, Clone)]
pub struct CanonicalHost {
    redirect: HostRedirect,
}

impl CanonicalHost {
    pub fn new(redirect: HostRedirect) -> CanonicalHost {
        CanonicalHost { redirect }
    }

    /// Redirect target for a request to `host` with `origin` (path and query), if any.
    pub fn target(&self, host: &str, origin: &Origin<'_>) -> Option<String> {
        if host.eq_ignore_ascii_case(&self.redirect.from) {
            Some(format!("https://{}{}", self.redirect.to, origin))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RedirectTarget(Option<String>);

#[rocket::async_trait]
impl Fairing for CanonicalHost {
    fn info(&self) -> Info {
        Info {
            name: "Canonical host redirect",
            kind: Kind::Request,
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _: &mut Data<'_>) {
        let host = req
            .host()
            .map(|it| it.domain().as_str().to_string())
            .or_else(|| {
                req.headers()
                    .get_one("Host")
                    .and_then(|it| it.split(':').next())
                    .map(str::to_string)
            });
        let target = host.and_then(|host| self.target(&host, req.uri()));

        if let Some(target) = target {
            tracing::debug!("redirecting {} to {}", req.uri(), target);
            req.local_cache(|| RedirectTarget(Some(target)));
            req.set_method(Method::Get);
            if let Ok(uri) = Origin::parse(CANONICAL_REDIRECT_PATH) {
                req.set_uri(uri);
            }
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for &'r RedirectTarget {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let target = req.local_cache(RedirectTarget::default);
        match target.0 {
            Some(_) => Outcome::Success(target),
            None => Outcome::Forward(rocket::http::Status::NotFound),
        }
    }
}

#[get("/__canonical-host")]
pub fn canonical_redirect(target: &RedirectTarget) -> Option<Redirect> {
    target.0.clone().map(Redirect::moved)
}
