use crate::errors::{AppError, InputError};
use crate::models::{Company, CompanyId};
use crate::navigation::Section;
use crate::state::AppState;
use crate::ui::{render_company_vehicles, render_drivers, render_home, render_routes, render_vehicles};
use crate::views::{ViewHandle, ViewState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    pub company: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NavigateQuery {
    pub section: String,
    pub company: Option<String>,
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<HomeQuery>,
) -> Html<String> {
    let companies = company_directory(&state).await;
    Html(render_home(&companies, query.company.as_deref(), None))
}

pub async fn navigate(
    State(state): State<AppState>,
    Query(query): Query<NavigateQuery>,
) -> Result<Response, AppError> {
    let section: Section = query.section.parse()?;
    let company = optional_company(query.company.as_deref())?;
    match section.target(company.as_ref()) {
        Ok(target) => Ok(Redirect::to(&target).into_response()),
        Err(InputError::CompanyRequired) => {
            let companies = company_directory(&state).await;
            let warning = InputError::CompanyRequired.to_string();
            Ok(Html(render_home(&companies, None, Some(&warning))).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn driver_page(State(state): State<AppState>) -> Html<String> {
    let view = settle(state.client.drivers(), state.view_timeout).await;
    Html(render_drivers(&view))
}

pub async fn vehicle_page(State(state): State<AppState>) -> Html<String> {
    let view = settle(state.client.vehicles(), state.view_timeout).await;
    Html(render_vehicles(&view))
}

pub async fn company_vehicle_page(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let company = CompanyId::parse(&company_id)?;
    let view = settle(state.client.company_vehicles(&company), state.view_timeout).await;
    Ok(Html(render_company_vehicles(&view)))
}

pub async fn routes_page(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let company = CompanyId::parse(&company_id)?;
    let view = settle(state.client.routes(&company), state.view_timeout).await;
    Ok(Html(render_routes("Active Routes", &view)))
}

pub async fn dispatch_page(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let company = CompanyId::parse(&company_id)?;
    let view = settle(state.client.dispatched(&company), state.view_timeout).await;
    Ok(Html(render_routes("Dispatched Routes", &view)))
}

pub async fn get_drivers(State(state): State<AppState>) -> Response {
    view_response(settle(state.client.drivers(), state.view_timeout).await)
}

pub async fn get_vehicles(State(state): State<AppState>) -> Response {
    view_response(settle(state.client.vehicles(), state.view_timeout).await)
}

pub async fn get_companies(State(state): State<AppState>) -> Result<Json<Vec<Company>>, AppError> {
    Ok(Json(state.client.companies().await?))
}

pub async fn get_company_vehicles(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Response, AppError> {
    let company = CompanyId::parse(&company_id)?;
    let view = settle(state.client.company_vehicles(&company), state.view_timeout).await;
    Ok(view_response(view))
}

pub async fn get_routes(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Response, AppError> {
    let company = CompanyId::parse(&company_id)?;
    Ok(view_response(settle(state.client.routes(&company), state.view_timeout).await))
}

pub async fn get_dispatched(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Response, AppError> {
    let company = CompanyId::parse(&company_id)?;
    Ok(view_response(settle(state.client.dispatched(&company), state.view_timeout).await))
}

/// Waits for the view's first result, bounded by `limit`; the view is torn
/// down when this returns.
async fn settle<T: Clone>(mut view: ViewHandle<T>, limit: Duration) -> ViewState<T> {
    let settled = tokio::time::timeout(limit, view.settled()).await;
    match settled {
        Ok(state) => state,
        Err(_) => {
            debug!("view still loading after {limit:?}");
            view.current()
        }
    }
}

fn view_response<T: Serialize>(view: ViewState<T>) -> Response {
    let status = if view.is_failed() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    (status, Json(view)).into_response()
}

fn optional_company(raw: Option<&str>) -> Result<Option<CompanyId>, InputError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => CompanyId::parse(raw).map(Some),
        None => Ok(None),
    }
}

async fn company_directory(state: &AppState) -> Vec<Company> {
    match state.client.companies().await {
        Ok(companies) => companies,
        Err(err) => {
            warn!("failed to list companies: {err}");
            Vec::new()
        }
    }
}
