use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::post;

use xfabric_api::{FabricError, Schema, SchemaKey};
use xfabric_engine::{MessageDecoder, SchemaCache};
use xfabric_transport::headers::SYSTEM_TOPICS;
use xfabric_transport::inbound::is_authorized_request;
use xfabric_transport::{InboundMessage, TransportError};

use crate::config::{ServeArgs, ServeConfig, TopicBinding};
use crate::error::CliError;

#[derive(Clone)]
struct AppState {
    token: Arc<str>,
    decoder: MessageDecoder,
    /// Reader schema per accepted topic path.
    readers: Arc<HashMap<String, Arc<Schema>>>,
}

pub async fn run(args: ServeArgs) -> Result<(), CliError> {
    let config = ServeConfig::load(&args.config)?;
    let token = args
        .token
        .or(config.bearer_token)
        .filter(|t| !t.trim().is_empty())
        .ok_or(CliError::Usage(
            "a bearer token is required: --token, XFABRIC_TOKEN or bearer_token in the config",
        ))?;

    let cache = xfabric_engine::global::init(&config.engine)?;
    let readers = reader_schemas(&cache, &config.topics)?;
    let state = AppState {
        token: Arc::from(token),
        decoder: MessageDecoder::new(cache),
        readers: Arc::new(readers),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .map_err(|e| CliError::Config {
            context: "bind",
            detail: format!("{}: {e}", config.bind),
        })?;
    tracing::info!(bind = %config.bind, topics = state.readers.len(), "accepting fabric messages");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("stopped");
    Ok(())
}

fn reader_schemas<F>(
    cache: &SchemaCache<F>,
    topics: &[TopicBinding],
) -> Result<HashMap<String, Arc<Schema>>, CliError> {
    topics
        .iter()
        .map(|binding| {
            let key = SchemaKey::new(&binding.name, &binding.reader_version);
            let schema = cache.get(&key).ok_or_else(|| CliError::Config {
                context: "topics",
                detail: format!("no schema for {key} in the configured bundles"),
            })?;
            Ok((binding.name.clone(), schema))
        })
        .collect()
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/{*topic}", post(handle_message))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}

// --- POST /{topic} ---

async fn handle_message(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if !is_authorized_request(&headers, &state.token) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let topic = uri.path();
    let system = SYSTEM_TOPICS.contains(&topic);
    let reader = state.readers.get(topic);
    if reader.is_none() && !system {
        tracing::debug!(topic, "message for unconfigured topic");
        return StatusCode::NOT_FOUND.into_response();
    }

    let message = match InboundMessage::from_parts(topic, &headers, body) {
        Ok(message) => message,
        Err(
            e @ (TransportError::MissingHeader("content-type")
            | TransportError::Fabric(FabricError::UnknownContentType(_))),
        ) => {
            return (StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string()).into_response();
        }
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let Some(reader) = reader else {
        match message.raw_json_string() {
            Ok(json) => tracing::info!(topic, tenant = ?message.tenant_id, %json, "fabric system message"),
            Err(_) => tracing::info!(
                topic,
                tenant = ?message.tenant_id,
                bytes = message.payload.len(),
                "fabric system message"
            ),
        }
        return StatusCode::OK.into_response();
    };

    match message.as_json_string(&state.decoder, reader).await {
        Ok(json) => {
            tracing::info!(
                topic,
                tenant = ?message.tenant_id,
                guid = ?message.message_guid,
                %json,
                "message received"
            );
            StatusCode::OK.into_response()
        }
        Err(e) => {
            tracing::warn!(topic, error = %e, "message rejected");
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;
    use xfabric_engine::EngineConfig;

    const ORDERS: &str = r#"{
        "type": "record", "name": "Created", "namespace": "orders",
        "topic": "/orders/created", "version": "1",
        "fields": [{"name": "id", "type": "string"}]
    }"#;

    async fn spawn() -> SocketAddr {
        let cache = Arc::new(SchemaCache::from_config(&EngineConfig::default()).unwrap());
        let schema = Arc::new(Schema::parse_str(ORDERS).unwrap());
        cache.put(schema.key().unwrap(), Arc::clone(&schema));

        let readers = reader_schemas(
            &cache,
            &[TopicBinding {
                name: "/orders/created".into(),
                reader_version: "1".into(),
            }],
        )
        .unwrap();
        let state = AppState {
            token: Arc::from("s3cret"),
            decoder: MessageDecoder::new(cache),
            readers: Arc::new(readers),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        addr
    }

    async fn send(
        addr: SocketAddr,
        topic: &str,
        headers: &[(&str, &str)],
        body: &'static str,
    ) -> u16 {
        let mut request = reqwest::Client::new()
            .post(format!("http://{addr}{topic}"))
            .body(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        request.send().await.unwrap().status().as_u16()
    }

    const AUTH: (&str, &str) = ("authorization", "Bearer s3cret");
    const JSON: (&str, &str) = ("content-type", "avro/json");
    const V1: (&str, &str) = ("x-xc-schema-version", "1");

    #[tokio::test]
    async fn accepts_decodable_message() {
        let addr = spawn().await;
        let status = send(addr, "/orders/created", &[AUTH, JSON, V1], r#"{"id": "o-1"}"#).await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn status_codes_follow_checks_in_order() {
        let addr = spawn().await;

        let wrong_token = ("authorization", "Bearer nope");
        assert_eq!(send(addr, "/orders/created", &[wrong_token, JSON, V1], "{}").await, 401);
        assert_eq!(send(addr, "/orders/created", &[JSON, V1], "{}").await, 401);
        assert_eq!(send(addr, "/orders/deleted", &[AUTH, JSON, V1], "{}").await, 404);

        let other = ("content-type", "application/json");
        assert_eq!(send(addr, "/orders/created", &[AUTH, other, V1], "{}").await, 415);
        assert_eq!(send(addr, "/orders/created", &[AUTH, V1], "{}").await, 415);

        assert_eq!(send(addr, "/orders/created", &[AUTH, JSON, V1], r#"{"id": 7}"#).await, 422);
        assert_eq!(send(addr, "/orders/created", &[AUTH, JSON], r#"{"id": "o-1"}"#).await, 422);
    }

    #[tokio::test]
    async fn system_topics_are_accepted_without_binding() {
        let addr = spawn().await;
        let status = send(addr, "/xfabric/tenant/updated", &[AUTH, JSON], r#"{"tenant": "t-1"}"#).await;
        assert_eq!(status, 200);
    }

    #[test]
    fn unknown_reader_binding_is_a_config_error() {
        let cache = SchemaCache::from_config(&EngineConfig::default()).unwrap();
        let err = reader_schemas(
            &cache,
            &[TopicBinding {
                name: "/orders/created".into(),
                reader_version: "9".into(),
            }],
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Config { context: "topics", .. }));
    }
}
