pub mod auth;
pub mod catalog;
pub mod comments;
pub mod error;
pub mod reviews;
pub mod titles;
pub mod users;

use actix_web::web;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Versioned prefix for every route.
pub static API_PREFIX: &str = "/api/v1";

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut web::ServiceConfig) {
    conf.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
        .service(
            // Order is important. Route resolution will stop at the first match,
            // so /users/me is registered ahead of /users/{username}.
            web::scope(API_PREFIX)
                .configure(auth::configure)
                .configure(users::configure)
                .configure(catalog::configure)
                .configure(titles::configure)
                .configure(reviews::configure)
                .configure(comments::configure),
        );
}

/// Timestamps are stored naive in UTC and rendered as RFC 3339.
pub(crate) fn utc(dt: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&dt)
}
