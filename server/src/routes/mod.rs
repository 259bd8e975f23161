use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{checkins, events, health_check, reservations, staff, tickets};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events", post(events::create_event).get(events::list_events))
        .route("/events/:id", get(events::get_event))
        .route(
            "/events/:id/ticket-types",
            post(events::create_ticket_type).get(events::list_ticket_types),
        )
        .route(
            "/events/:id/checkins",
            post(checkins::check_in).get(checkins::history),
        )
        .route("/events/:id/checkins/summary", get(checkins::summary))
        .route(
            "/events/:id/staff",
            post(staff::create_staff).get(staff::list_staff),
        )
        .route("/ticket-types/:id", get(events::get_ticket_type))
        .route(
            "/ticket-types/:id/quantity",
            post(reservations::increase_quantity),
        )
        .route(
            "/ticket-types/:id/reservations",
            post(reservations::reserve),
        )
        .route("/reservations/:token", get(reservations::get_reservation))
        .route("/reservations/:token/confirm", post(reservations::confirm))
        .route("/reservations/:token/release", post(reservations::release))
        // the validation segment carries a ticket code, the cancel segment a ticket id
        .route("/tickets/:id/validation", get(tickets::validate))
        .route("/tickets/:id/cancel", post(tickets::cancel))
        .route("/users/:id/tickets", get(tickets::tickets_for_owner))
        .route("/staff/login", post(staff::login))
        .route(
            "/staff/:id",
            get(staff::get_staff).patch(staff::update_staff),
        )
        .route("/staff/:id/deactivate", post(staff::deactivate))
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(&config.cors_allowed_origins))
        .with_state(state)
}
