use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use conveyor_core::chain::{
    ChainBuilder, Dispatch, Handler, HandlerChain, Instrumented, Message, SnsUnwrap,
};
use conveyor_core::impls::{InMemoryQueue, SqsGateway};
use conveyor_core::{Envelope, ProcessingError, Worker, WorkerBuilder, WorkerConfig};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// SNS 経由のメッセージを受ける場合は true にする
const UNWRAP_SNS_VAR: &str = "CONVEYOR_UNWRAP_SNS";

#[derive(Debug, Deserialize)]
struct Hello {
    name: String,
}

impl Message for Hello {
    const TYPE: &'static str = "demo.hello.v1";
}

struct HelloHandler {
    remaining_failures: AtomicU32,
}

impl HelloHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl Handler<Hello> for HelloHandler {
    async fn handle(&self, hello: &Hello) -> Result<(), ProcessingError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(ProcessingError::handler(format!(
                "intentional failure (left={left})"
            )));
        }

        tracing::info!("Hello, {}!", hello.name);
        Ok(())
    }
}

/// type attribute の無いメッセージはログに出すだけ
struct Unrouted;

#[async_trait]
impl Handler<Envelope> for Unrouted {
    async fn handle(&self, envelope: &Envelope) -> Result<(), ProcessingError> {
        tracing::warn!(
            message_id = envelope.message_id(),
            body = envelope.body(),
            "unrouted message"
        );
        Ok(())
    }
}

fn dispatch(failures: u32) -> anyhow::Result<Dispatch<Envelope>> {
    Ok(Dispatch::by_attribute("type")
        .register::<Hello, _>(HelloHandler::new(failures))?
        .fallback(Unrouted))
}

fn build_chain(unwrap_sns: bool, failures: u32) -> anyhow::Result<HandlerChain> {
    let chain = ChainBuilder::new(dispatch(failures)?);
    Ok(if unwrap_sns {
        chain
            .wrap(SnsUnwrap::new)
            .wrap(Instrumented::layer("message"))
            .build()
    } else {
        chain.wrap(Instrumented::layer("message")).build()
    })
}

fn env_flag(name: &str) -> anyhow::Result<bool> {
    match std::env::var(name) {
        Ok(v) if v.trim().is_empty() => Ok(false),
        Ok(v) => v
            .trim()
            .parse::<bool>()
            .with_context(|| format!("{name} must be true or false")),
        Err(_) => Ok(false),
    }
}

async fn run_until_interrupted(worker: &Worker) -> anyhow::Result<()> {
    tokio::select! {
        result = worker.run() => match result {
            Ok(never) => match never {},
            Err(err) => Err(err.into()),
        },
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("interrupted; exiting");
            Ok(())
        }
    }
}

/// SQS のキューを処理する（設定は環境変数から）
async fn run_sqs() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    let gateway = SqsGateway::connect(&config).await;
    tracing::info!(
        queue_url = gateway.queue_url(),
        ack_mode = %config.ack_mode,
        "initialized sqs gateway"
    );

    let worker = WorkerBuilder::from_config(&config)
        .gateway(gateway)
        .chain(build_chain(env_flag(UNWRAP_SNS_VAR)?, 0)?)
        .build()?;

    run_until_interrupted(&worker).await
}

/// InMemoryQueue に 2 件投入して処理する（1 件目は 1 回失敗して再配送される）
async fn demo() -> anyhow::Result<()> {
    let queue = Arc::new(InMemoryQueue::new().with_visibility_timeout(Duration::from_secs(2)));

    let attrs = HashMap::from([("type".to_string(), Hello::TYPE.to_string())]);
    let id = queue
        .send_with_attributes(serde_json::json!({ "name": "conveyor" }).to_string(), attrs)
        .await;
    tracing::info!(message_id = %id, "enqueued");
    queue.send("no type attribute").await;

    let worker = WorkerBuilder::new()
        .queue_url("memory://demo")
        .region("local")
        .gateway(queue.clone())
        .chain(build_chain(false, 1)?)
        .build()?;

    let drained = async {
        loop {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let counts = queue.counts().await;
            if counts.visible == 0 && counts.in_flight == 0 {
                return counts;
            }
        }
    };

    tokio::select! {
        result = run_until_interrupted(&worker) => result,
        counts = drained => {
            tracing::info!(?counts, "queue drained");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_line_number(true)
        .init();

    match std::env::args().nth(1).as_deref() {
        None | Some("run") => run_sqs().await,
        Some("demo") => demo().await,
        Some(other) => anyhow::bail!("unknown command {other:?} (expected `run` or `demo`)"),
    }
}
