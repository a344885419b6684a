pub mod admin;
pub mod devices;
pub mod records;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::SharedState;

/// JSON endpoints. These answer 401 instead of redirecting.
pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/devices/{machine_id}", get(devices::list_by_machine))
        .route("/test", post(records::record))
        .route("/delete_user/{username}", delete(admin::delete_user))
}

/// A registered route, as listed on the debug page.
pub struct RouteInfo {
    pub path: &'static str,
    pub methods: &'static str,
    pub handler: &'static str,
}

/// Every route `build_app` mounts. Keep in step with the routers.
pub static ROUTE_CATALOG: &[RouteInfo] = &[
    RouteInfo { path: "/", methods: "GET", handler: "views::machines::index" },
    RouteInfo { path: "/add_user", methods: "POST", handler: "views::admin::add_user" },
    RouteInfo { path: "/api/devices/{machine_id}", methods: "GET", handler: "routes::devices::list_by_machine" },
    RouteInfo { path: "/debug", methods: "GET", handler: "views::debug::index" },
    RouteInfo { path: "/delete_user/{username}", methods: "DELETE", handler: "routes::admin::delete_user" },
    RouteInfo { path: "/edit_report/{id}", methods: "GET", handler: "views::reports::edit_page" },
    RouteInfo { path: "/health", methods: "GET", handler: "health" },
    RouteInfo { path: "/history", methods: "GET", handler: "views::history::index" },
    RouteInfo { path: "/login", methods: "GET, POST", handler: "views::auth::login_page / login_submit" },
    RouteInfo { path: "/logout", methods: "GET", handler: "views::auth::logout" },
    RouteInfo { path: "/report_summary", methods: "GET", handler: "views::reports::summary_page" },
    RouteInfo { path: "/reports", methods: "GET", handler: "views::reports::list_page" },
    RouteInfo { path: "/save_report", methods: "POST", handler: "views::reports::save" },
    RouteInfo { path: "/static/{*path}", methods: "GET", handler: "static files" },
    RouteInfo { path: "/test", methods: "POST", handler: "routes::records::record" },
    RouteInfo { path: "/user_admin", methods: "GET", handler: "views::admin::users_page" },
    RouteInfo { path: "/view_report/{id}", methods: "GET", handler: "views::reports::view_page" },
];
