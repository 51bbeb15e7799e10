use actix_web::{post, web, HttpResponse, Result};
use serde::Serialize;

use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::send_push::{send, Dispatcher, PushResult, Summary},
    types::{NotifyTarget, NotifyTargeted},
};

#[post("/notify-targeted")]
pub async fn index(
    state: web::Data<AppState<State>>,
    data: web::Json<NotifyTargeted>,
) -> Result<HttpResponse, Error> {
    let message = data.message()?;
    let target = data.target()?;
    let table = &state.database.subscription;

    let subscriptions = match &target {
        NotifyTarget::All => table.get_active().await?,
        NotifyTarget::Devices(ids) => table.get_active_by_device_ids(ids).await?,
        NotifyTarget::Users(ids) => table.get_active_by_user_ids(ids).await?,
    };

    if subscriptions.is_empty() {
        return Ok(HttpResponse::Ok().json(EmptyResponse {
            message: "No active subscriptions found",
        }));
    }

    let report =
        send(Dispatcher::from_state(&state), subscriptions, &message).await?;

    Ok(HttpResponse::Ok().json(Response {
        message: format!(
            "Sent to {} devices, {} failed",
            report.summary.success, report.summary.failed
        ),
        results: report.results,
        summary: report.summary,
    }))
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub message: String,
    pub results: Vec<PushResult>,
    pub summary: Summary,
}

#[derive(Debug, Serialize)]
pub struct EmptyResponse {
    pub message: &'static str,
}
