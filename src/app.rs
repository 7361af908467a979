use crate::handlers;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/navigate", get(handlers::navigate))
        .route("/driver", get(handlers::driver_page))
        .route("/vehicle", get(handlers::vehicle_page))
        .route("/companyVehicle/:company_id", get(handlers::company_vehicle_page))
        .route("/routes/:company_id", get(handlers::routes_page))
        .route("/dispatch/:company_id", get(handlers::dispatch_page))
        .route("/api/drivers", get(handlers::get_drivers))
        .route("/api/vehicles", get(handlers::get_vehicles))
        .route("/api/companies", get(handlers::get_companies))
        .route("/api/companies/:company_id/vehicles", get(handlers::get_company_vehicles))
        .route("/api/companies/:company_id/routes", get(handlers::get_routes))
        .route("/api/companies/:company_id/dispatched", get(handlers::get_dispatched))
        .with_state(state)
}
