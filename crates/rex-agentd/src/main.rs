mod config;

use std::{sync::Arc, time::Duration};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use rex_core::TaskRegistry;
use rex_exec::{ContainerRuntime, FileTransport, HttpTransport, LocalRuntime, RunOnceHandler};
use rex_model::{ExecutorAction, FetchResultArgs, Limits, LogSource, RunArgs, RunOnce};
use rex_observe::init_logger;
use rex_store::{ExecutorBbs, InMemoryStore, StoreAdapter};

use crate::config::AgentConfig;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let config = AgentConfig::from_env()?;
    init_logger(&config.logger)?;
    info!(
        executor_id = %config.executor_id,
        stack = %config.stack,
        memory_mb = config.capacity.memory_mb,
        disk_mb = config.capacity.disk_mb,
        "rex agent starting"
    );

    tokio::fs::create_dir_all(&config.temp_dir).await?;
    tokio::fs::create_dir_all(&config.container_dir).await?;

    let store: Arc<dyn StoreAdapter> = Arc::new(InMemoryStore::new());
    let bbs = Arc::new(ExecutorBbs::new(Arc::clone(&store)));
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(LocalRuntime::new(&config.container_dir));
    let transport: Arc<dyn FileTransport> = Arc::new(HttpTransport::new());
    let registry = Arc::new(TaskRegistry::new(config.capacity));

    let handler = Arc::new(RunOnceHandler::new(
        Arc::clone(&bbs),
        runtime,
        transport,
        registry,
        config.stack.clone(),
        config.temp_dir.clone(),
    ));

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested, cancelling in-flight tasks");
                shutdown.cancel();
            }
        });
    }

    let mut watch = bbs.watch_desired().await?;

    if config.demo {
        let demo = demo_run_once();
        info!(guid = %demo.guid, "seeding demo task");
        bbs.desire_run_once(&demo).await?;
    }

    let mut tasks = JoinSet::new();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            desired = watch.next() => match desired {
                Some(run_once) => {
                    let handler = Arc::clone(&handler);
                    let bbs = Arc::clone(&bbs);
                    let executor_id = config.executor_id.clone();
                    let cancel = shutdown.clone();
                    tasks.spawn(async move {
                        let guid = run_once.guid.clone();
                        match handler.run_once(run_once, &executor_id, &cancel).await {
                            Ok(()) => match bbs.get_run_once(&guid).await {
                                Ok(record) => info!(
                                    guid = %guid,
                                    state = %record.state,
                                    failed = record.failed,
                                    result = %record.result,
                                    "task finished"
                                ),
                                Err(e) => warn!(guid = %guid, error = %e, "task record unreadable"),
                            },
                            Err(e) if e.is_cancelled() => {
                                info!(guid = %guid, "task cancelled")
                            }
                            Err(e) => error!(guid = %guid, error = %e, "task failed"),
                        }
                    });
                }
                None => break,
            },
        }
    }

    watch.stop();
    info!(in_flight = tasks.len(), "draining task handlers");
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "task handler panicked");
        }
    }

    // give the demo a beat so log output lands before exit
    if config.demo {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    info!("rex agent stopped");
    Ok(())
}

fn demo_run_once() -> RunOnce {
    RunOnce::new(
        format!("demo-{}", uuid::Uuid::new_v4()),
        Limits::new(64, 64),
        vec![
            ExecutorAction::Run(RunArgs {
                script: "echo hello from rex; printf 42 > result.txt".into(),
                timeout: Duration::from_secs(10),
                env: [("WHO", "rex")].into_iter().collect(),
            }),
            ExecutorAction::FetchResult(FetchResultArgs {
                file: "/result.txt".into(),
            }),
        ],
    )
    .with_log(LogSource {
        guid: "demo-log".into(),
        source_name: "DEMO".into(),
    })
}
