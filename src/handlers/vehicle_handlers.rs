//! Fleet catalog endpoints. Reads are public, writes need an admin session.

use crate::{
    access::{self, Policy},
    errors::AppError,
    handlers::session::CurrentSession,
    models::vehicle::VehicleFilter,
    state::AppState,
    wire::{Envelope, IdQuery, VehicleBody, VehicleData, VehicleListData, VehicleQuery, VehicleView},
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};

/// `GET /vehicles`
pub async fn list_vehicles(
    State(state): State<AppState>,
    query: Result<Query<VehicleQuery>, QueryRejection>,
) -> Result<Json<Envelope<VehicleListData>>, AppError> {
    let Query(query) = query?;
    let filter = VehicleFilter::from(query);

    let vehicles = state.catalog.list_vehicles(&filter).await?;
    Ok(Json(Envelope::ok(VehicleListData::new(&vehicles))))
}

/// `GET /vehicles/{id}`
pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<VehicleData>>, AppError> {
    let id = id
        .trim()
        .parse()
        .map_err(|_| AppError::not_found("Vehicle not found"))?;

    let vehicle = state.catalog.get_vehicle(id).await?;
    Ok(Json(Envelope::ok(VehicleData {
        vehicle: VehicleView::from(&vehicle),
        message: None,
    })))
}

/// `POST /vehicles` (admin)
pub async fn create_vehicle(
    State(state): State<AppState>,
    session: CurrentSession,
    body: Result<Json<VehicleBody>, JsonRejection>,
) -> Result<Json<Envelope<VehicleData>>, AppError> {
    access::authorize(session.identity(), Policy::AdminOnly)?;
    let Json(body) = body?;

    let vehicle = state.catalog.create_vehicle(body.into_new_vehicle()?).await?;
    Ok(Json(Envelope::ok(VehicleData {
        vehicle: VehicleView::from(&vehicle),
        message: Some("Vehicle created successfully"),
    })))
}

/// `PUT /vehicles` (admin). The target id travels in the body.
pub async fn update_vehicle(
    State(state): State<AppState>,
    session: CurrentSession,
    body: Result<Json<VehicleBody>, JsonRejection>,
) -> Result<Json<Envelope<VehicleData>>, AppError> {
    access::authorize(session.identity(), Policy::AdminOnly)?;
    let Json(body) = body?;
    let (id, patch) = body.into_patch()?;

    let vehicle = state.catalog.update_vehicle(id, patch).await?;
    Ok(Json(Envelope::ok(VehicleData {
        vehicle: VehicleView::from(&vehicle),
        message: Some("Vehicle updated successfully"),
    })))
}

/// `DELETE /vehicles?id=` (admin)
pub async fn delete_vehicle(
    State(state): State<AppState>,
    session: CurrentSession,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<Envelope<()>>, AppError> {
    access::authorize(session.identity(), Policy::AdminOnly)?;
    let Query(query) = query?;
    let id = query.require("Vehicle")?;

    state.catalog.delete_vehicle(id).await?;
    Ok(Json(Envelope::message("Vehicle deleted successfully")))
}
