use actix_web::{delete, get, web, HttpResponse, Result};
use serde::Serialize;
use tracing::info;

use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::devices::unique_devices,
    model::Device,
    types::DevicesQuery,
};

#[get("/devices")]
pub async fn get_index(
    state: web::Data<AppState<State>>,
    data: web::Query<DevicesQuery>,
) -> Result<HttpResponse, Error> {
    let user_id = data.into_inner().user_id.filter(|u| !u.is_empty());
    let rows = state.database.subscription.get_devices(user_id).await?;

    Ok(HttpResponse::Ok().json(Response {
        devices: unique_devices(rows),
    }))
}

#[delete("/devices/{device_id}")]
pub async fn delete_index(
    state: web::Data<AppState<State>>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let device_id = path.into_inner();
    if device_id.trim().is_empty() {
        return Err(Error::MissingParams(String::from("Device ID is required")));
    }

    let result = state
        .database
        .subscription
        .delete_by_device_id(device_id.to_owned())
        .await?;
    let deleted_count = result.rows_affected();

    if deleted_count == 0 {
        return Err(Error::NotFound(String::from("Device not found")));
    }

    info!("Removed {} subscription(s) of device {}", deleted_count, device_id);

    Ok(HttpResponse::Ok().json(DeleteResponse {
        message: "Device deleted successfully",
        deleted_count,
    }))
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub devices: Vec<Device>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub message: &'static str,
    pub deleted_count: u64,
}
