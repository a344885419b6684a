use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;

pub const COOKIE_NAME: &str = "estop_flash";

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone)]
pub struct Flash {
    pub kind: String,
    pub message: String,
}

/// Queue a flash message. The cookie value is a single url-encoded
/// `kind=message` pair.
pub fn set(jar: CookieJar, kind: &str, message: &str) -> CookieJar {
    let value = form_urlencoded::Serializer::new(String::new())
        .append_pair(kind, message)
        .finish();
    jar.add(
        Cookie::build((COOKIE_NAME, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::minutes(5))
            .build(),
    )
}

/// Read and clear the pending flash message, if any.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let flash = jar.get(COOKIE_NAME).and_then(|cookie| {
        form_urlencoded::parse(cookie.value().as_bytes())
            .next()
            .map(|(kind, message)| Flash {
                kind: kind.into_owned(),
                message: message.into_owned(),
            })
    });

    if flash.is_none() {
        return (jar, None);
    }

    let jar = jar.remove(Cookie::build(COOKIE_NAME).path("/").build());
    (jar, flash)
}
