use actix_web::{
    delete, http::header, post, web, HttpRequest, HttpResponse, Result,
};
use serde::Serialize;
use tracing::info;

use crate::{
    configuration::{AppState, State},
    error::Error,
    types,
};

#[post("/subscribe")]
pub async fn post_index(
    state: web::Data<AppState<State>>,
    subscription: web::Json<types::Subscription>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|item| item.to_str().ok())
        .map(str::to_owned);

    let data = subscription.into_inner().into_new(user_agent)?;
    let item = state.database.subscription.upsert(&data).await?;

    info!(
        "Subscription {} stored for device {}",
        item.id,
        item.device_id.as_deref().unwrap_or("-")
    );

    Ok(HttpResponse::Created().json(Response {
        message: "Subscribed",
    }))
}

#[delete("/subscribe")]
pub async fn delete_index(
    state: web::Data<AppState<State>>,
    data: web::Json<types::Unsubscribe>,
) -> Result<HttpResponse, Error> {
    let endpoint = data
        .into_inner()
        .endpoint
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| Error::MissingParams(String::from("endpoint")))?;

    let result = state
        .database
        .subscription
        .delete_by_endpoint(endpoint)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(String::from("Subscription not found")));
    }

    Ok(HttpResponse::Ok().json(Response {
        message: "Unsubscribed",
    }))
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub message: &'static str,
}
