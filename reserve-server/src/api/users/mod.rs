//! User API

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/users", routes())
}

fn routes() -> Router<ServerState> {
    // self or admin, checked by the manager
    let member_routes = Router::new().route(
        "/{id}",
        get(handler::get_by_id).put(handler::update),
    );

    let admin_routes = Router::new()
        .route("/", get(handler::list))
        .route("/{id}", delete(handler::delete))
        .route_layer(middleware::from_fn(require_admin));

    member_routes.merge(admin_routes)
}
