use actix_web::{post, web, HttpResponse, Result};
use serde::Serialize;

use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::send_push::{send, Dispatcher, PushResult, Summary},
    types::Notify,
};

/// Broadcasts to every stored subscription.
#[post("/notify")]
pub async fn index(
    state: web::Data<AppState<State>>,
    data: web::Json<Notify>,
) -> Result<HttpResponse, Error> {
    let message = data.message()?;
    let subscriptions = state.database.subscription.get_all().await?;

    let report =
        send(Dispatcher::from_state(&state), subscriptions, &message).await?;

    Ok(HttpResponse::Ok().json(Response {
        results: report.results,
        summary: report.summary,
    }))
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub results: Vec<PushResult>,
    pub summary: Summary,
}
