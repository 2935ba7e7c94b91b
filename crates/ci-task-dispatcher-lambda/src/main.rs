//! Lambda entry point for the CI task dispatcher.
//!
//! Configuration and AWS clients are built once per cold start; every
//! invocation is then handed to the shared [`Dispatcher`]. A configuration
//! error aborts startup before any event is accepted.

use std::sync::Arc;

use anyhow::Context;
use ci_task_dispatcher::platform::EcsPlatform;
use ci_task_dispatcher::secrets::SsmSecretStore;
use ci_task_dispatcher::store::DynamoDbPipelineTaskStore;
use ci_task_dispatcher::{DispatchResponse, Dispatcher, DispatcherConfig};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use tracing_subscriber::EnvFilter;

/// Builds the dispatcher from the environment and the AWS config chain.
async fn build_dispatcher() -> anyhow::Result<Dispatcher> {
    let config = DispatcherConfig::from_env().context("invalid dispatcher configuration")?;
    tracing::info!(
        table = %config.table_name,
        cluster = %config.cluster_name,
        family = %config.task_family,
        "configuration loaded"
    );

    let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let secrets = SsmSecretStore::from_conf(&aws);
    let platform = EcsPlatform::from_conf(&aws);
    let store = DynamoDbPipelineTaskStore::from_conf(&aws, &config.table_name);

    Ok(Dispatcher::new(
        config,
        Arc::new(secrets),
        Arc::new(platform),
        Arc::new(store),
    ))
}

fn body_bytes(body: &Body) -> &[u8] {
    match body {
        Body::Text(s) => s.as_bytes(),
        Body::Binary(b) => b.as_slice(),
        Body::Empty => &[],
    }
}

fn into_lambda_response(response: &DispatchResponse) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(response.status)
        .header("content-type", "application/json")
        .body(Body::Text(response.body_json()))?)
}

/// Lambda handler: one webhook per invocation.
async fn handler(dispatcher: &Dispatcher, event: Request) -> Result<Response<Body>, Error> {
    let response = dispatcher
        .handle(event.headers(), body_bytes(event.body()))
        .await;
    into_lambda_response(&response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging for Lambda
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false) // Clean CloudWatch logs
        .with_target(false)
        .without_time()
        .json()
        .init();

    let dispatcher = build_dispatcher().await?;
    tracing::info!("Starting CI task dispatcher Lambda");

    run(service_fn(move |event: Request| {
        let dispatcher = dispatcher.clone();
        async move { handler(&dispatcher, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ci_task_dispatcher::error::DispatchError;
    use pretty_assertions::assert_eq;

    #[test]
    fn body_bytes_covers_every_encoding() {
        assert_eq!(body_bytes(&Body::Text("{}".to_string())), b"{}");
        assert_eq!(body_bytes(&Body::Binary(b"[1]".to_vec())), b"[1]");
        assert!(body_bytes(&Body::Empty).is_empty());
    }

    #[test]
    fn responses_are_json() {
        let response =
            into_lambda_response(&DispatchResponse::from(&DispatchError::Unauthorized)).unwrap();
        assert_eq!(response.status(), 401);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        match response.body() {
            Body::Text(text) => assert_eq!(text, r#"{"message":"Unauthorized"}"#),
            other => panic!("unexpected body: {other:?}"),
        }
    }
}
