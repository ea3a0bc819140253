//! Reservation API
//!
//! | Path | Method | Access |
//! |------|--------|--------|
//! | /api/reservation | GET | admin |
//! | /api/reservation | POST | authenticated |
//! | /api/reservation/my-reservation | GET | authenticated |
//! | /api/reservation/{id} | GET, PUT, DELETE | owner or admin |

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/reservation", routes())
}

fn routes() -> Router<ServerState> {
    let member_routes = Router::new()
        .route("/", axum::routing::post(handler::create))
        .route("/my-reservation", get(handler::mine))
        .route(
            "/{id}",
            get(handler::get_by_id)
                .put(handler::update)
                .delete(handler::delete),
        );

    let admin_routes = Router::new()
        .route("/", get(handler::list))
        .route_layer(middleware::from_fn(require_admin));

    member_routes.merge(admin_routes)
}
