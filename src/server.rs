use actix_cors::Cors;
use actix_files::Files;
use actix_web::{dev::Server, http::header, middleware, web, App, HttpServer};
use tracing::info;

use crate::{
    configuration::{AppState, State},
    controller::{devices, notify, notify_targeted, subscribe, vapid, version},
    error::Error,
};

pub async fn server_task(app_state: &AppState<State>) -> Result<(), Error> {
    let app = app_state.clone();
    tokio::spawn(async move {
        let server = init_server(app)?;
        server.await?;
        Ok(())
    })
    .await?
}

/// API routes, mounted under `/api`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(subscribe::post_index)
            .service(subscribe::delete_index)
            .service(devices::get_index)
            .service(devices::delete_index)
            .service(notify::index)
            .service(notify_targeted::index)
            .service(vapid::index)
            .service(version::index),
    );
}

fn init_server(app_state: AppState<State>) -> Result<Server, Error> {
    let host = app_state.config.server_host.to_owned();
    let port = app_state.config.port;

    info!("Listening on {}:{}", host, port);

    let server = HttpServer::new(move || {
        let app = app_state.clone();
        let static_dir = app_state.config.static_dir.to_owned();
        let allowed_cors = String::from("*");
        let cors_access_all =
            app.config.allowed_origins.contains(&allowed_cors);
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                if cors_access_all {
                    return true;
                }
                let allowed = &app.config.allowed_origins;
                if let Ok(origin) = origin.to_str() {
                    return allowed.contains(&origin.to_owned());
                }
                false
            })
            .allowed_methods(vec!["GET", "POST", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT])
            .allowed_header(header::CONTENT_TYPE);

        App::new()
            .wrap(cors)
            .wrap(middleware::Compress::default())
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(8192))
            .configure(routes)
            .service(Files::new("/", static_dir).index_file("index.html"))
    })
    .bind((host, port))?
    .run();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{
        http::{
            header::{self, HeaderValue},
            StatusCode,
        },
        test, web, App,
    };
    use serde_json::{json, Value};

    use super::routes;
    use crate::{
        configuration::{test_config, AppState, State},
        dao::PoolType,
        provider::DatabasePool,
        push::tests::TEST_PUBLIC_KEY,
        testing::{database, new_subscription, FakeDelivery},
    };

    fn test_state(delivery: Arc<FakeDelivery>) -> AppState<State> {
        let config = test_config();
        let database = DatabasePool::new_lazy(&config).unwrap();
        AppState::new(State::from_parts(config, database, delivery))
    }

    #[actix_web::test]
    async fn notify_without_body_is_rejected_before_sending() {
        let delivery = Arc::new(FakeDelivery::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(delivery.clone())))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/notify")
            .set_json(json!({"title": "Hello"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], 400);
        assert_eq!(delivery.attempts(), 0);
    }

    #[actix_web::test]
    async fn targeted_notify_requires_a_selector() {
        let delivery = Arc::new(FakeDelivery::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(delivery.clone())))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/notify-targeted")
            .set_json(json!({"title": "Hello", "body": "World", "deviceIds": []}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(delivery.attempts(), 0);
    }

    #[actix_web::test]
    async fn subscribe_without_keys_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(Arc::default())))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/subscribe")
            .set_json(json!({"endpoint": "https://push.example.com/1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn serves_vapid_public_key() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(Arc::default())))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/vapid-public-key")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["publicKey"], TEST_PUBLIC_KEY);
    }

    async fn stored_state(pool: PoolType) -> AppState<State> {
        let database = database(pool).await;
        AppState::new(State::from_parts(
            test_config(),
            database,
            Arc::new(FakeDelivery::default()),
        ))
    }

    fn subscribe_request(auth: &str) -> test::TestRequest {
        test::TestRequest::post().uri("/api/subscribe").set_json(json!({
            "endpoint": "https://push.example.com/1",
            "keys": {"p256dh": format!("p256dh-{}", auth), "auth": auth},
            "deviceId": "phone",
        }))
    }

    #[sqlx::test(migrations = false)]
    async fn subscribe_ignores_undecodable_user_agent(pool: PoolType) {
        let state = stored_state(pool).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(routes),
        )
        .await;

        let req = subscribe_request("a1")
            .insert_header((
                header::USER_AGENT,
                HeaderValue::from_bytes(b"Mozilla/5.0 (Caf\xe9)").unwrap(),
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let rows = state.database.subscription.get_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_agent, None);
    }

    #[sqlx::test(migrations = false)]
    async fn subscribing_twice_keeps_one_row_with_latest_keys(pool: PoolType) {
        let state = stored_state(pool).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(routes),
        )
        .await;

        for auth in ["a1", "a2"] {
            let req = subscribe_request(auth)
                .insert_header((header::USER_AGENT, "curl/8"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let rows = state.database.subscription.get_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].keys_auth, "a2");
        assert_eq!(rows[0].keys_p256dh, "p256dh-a2");
        assert_eq!(rows[0].user_agent.as_deref(), Some("curl/8"));
        assert!(rows[0].is_active);
    }

    #[sqlx::test(migrations = false)]
    async fn deleting_a_device_removes_all_its_subscriptions(pool: PoolType) {
        let state = stored_state(pool).await;
        for (endpoint, device) in [
            ("https://push.example.com/1", "phone"),
            ("https://push.example.com/2", "phone"),
            ("https://push.example.com/3", "laptop"),
        ] {
            state
                .database
                .subscription
                .upsert(&new_subscription(endpoint, 1, Some(device), None))
                .await
                .unwrap();
        }
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/devices").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["devices"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::delete()
            .uri("/api/devices/phone")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["deletedCount"], 2);

        let req = test::TestRequest::delete()
            .uri("/api/devices/phone")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let rows = state.database.subscription.get_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].device_id.as_deref(), Some("laptop"));
    }

    #[actix_web::test]
    async fn reports_version() {
        let app = test::init_service(App::new().configure(routes)).await;

        let req = test::TestRequest::get().uri("/api/version").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
