use actix_web::{get, web, Responder};
use serde::Serialize;

use crate::{
    configuration::{AppState, State},
    error::Error,
};

/// Application server key for `pushManager.subscribe`.
#[get("/vapid-public-key")]
pub async fn index(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    let keys = state.config.vapid_keys()?;

    Ok(web::Json(Response {
        public_key: keys.public_key().to_owned(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub public_key: String,
}
