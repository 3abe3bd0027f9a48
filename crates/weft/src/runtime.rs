//! Weft node runtime.
//!
//! A node discovers which partitions it owns, then runs one processor per
//! owned partition until it is asked to stop.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use weft_core::cluster::{PartitionAssignment, PartitionId, TopologyClient};
use weft_core::config::WeftConfig;
use weft_core::error::{Result, WeftError};
use weft_core::model::ExecutableWorkflow;
use weft_runtime::cluster::{HttpTopologyClient, PartitionHolder};
use weft_runtime::command::CommandExecutor;
use weft_runtime::processor::{PartitionProcessor, StepHandlerRegistry, StreamProcessor};
use weft_runtime::stream::InMemoryLogStream;
use weft_runtime::workflow::WorkflowRepository;

use crate::observability;

/// Prelude module for common imports.
pub mod prelude {
    pub use weft_core::cluster::{PartitionAssignment, PartitionId, Topology, TopologyClient};
    pub use weft_core::command::{
        BackoffConfig, BackoffPolicy, BackoffStrategy, CommandError, CommandFailure, CommandState,
    };
    pub use weft_core::config::WeftConfig;
    pub use weft_core::error::{Result, WeftError};
    pub use weft_core::model::{
        ElementKind, ExecutableCatchEventElement, ExecutableElement,
        ExecutableFlowElementContainer, ExecutableWorkflow,
    };
    pub use weft_core::record::{
        PendingRecord, Record, WorkflowInstanceIntent, WorkflowInstanceRecord,
    };
    pub use weft_runtime::cluster::{HttpTopologyClient, OwnedPartitions, PartitionHolder};
    pub use weft_runtime::command::{
        execute_command, Command, CommandExecutor, CommandFuture, CommandHandle,
        DefaultCommandExceptionHandlingStrategy, TokioScheduler,
    };
    pub use weft_runtime::processor::{BpmnStepContext, BpmnStepHandler, StepHandlerRegistry};
    pub use weft_runtime::stream::{InMemoryLogStream, RecordStream};
    pub use weft_runtime::workflow::WorkflowRepository;

    pub use crate::{LogStreams, Weft, WeftBuilder};
}

/// Creates the log of a partition.
pub type LogStreamFactory = Arc<dyn Fn(PartitionId) -> InMemoryLogStream + Send + Sync>;

/// The partition logs of a node, created on first use.
#[derive(Clone)]
pub struct LogStreams {
    factory: LogStreamFactory,
    streams: Arc<Mutex<HashMap<PartitionId, InMemoryLogStream>>>,
}

impl LogStreams {
    pub fn new(factory: LogStreamFactory) -> Self {
        Self {
            factory,
            streams: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The log of a partition, creating it if needed.
    pub fn get_or_create(&self, partition_id: PartitionId) -> InMemoryLogStream {
        self.lock()
            .entry(partition_id)
            .or_insert_with(|| (self.factory)(partition_id))
            .clone()
    }

    /// The log of a partition, if it was created.
    pub fn get(&self, partition_id: PartitionId) -> Option<InMemoryLogStream> {
        self.lock().get(&partition_id).cloned()
    }

    /// Partitions whose log exists, in ascending order.
    pub fn partition_ids(&self) -> Vec<PartitionId> {
        let mut ids: Vec<_> = self.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PartitionId, InMemoryLogStream>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LogStreams {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryLogStream::new))
    }
}

impl fmt::Debug for LogStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStreams")
            .field("partitions", &self.partition_ids())
            .finish_non_exhaustive()
    }
}

/// A weft node.
pub struct Weft<C: TopologyClient = HttpTopologyClient> {
    config: WeftConfig,
    topology_client: C,
    repository: Arc<WorkflowRepository>,
    handlers: Arc<StepHandlerRegistry>,
    log_streams: LogStreams,
    shutdown: CancellationToken,
}

impl Weft {
    /// Create a new builder.
    pub fn builder() -> WeftBuilder {
        WeftBuilder::new()
    }
}

impl<C: TopologyClient> Weft<C> {
    pub fn config(&self) -> &WeftConfig {
        &self.config
    }

    pub fn workflow_repository(&self) -> &WorkflowRepository {
        &self.repository
    }

    pub fn handler_registry(&self) -> &StepHandlerRegistry {
        &self.handlers
    }

    /// Partition logs, for writing commands while the node runs.
    pub fn log_streams(&self) -> LogStreams {
        self.log_streams.clone()
    }

    /// Token that stops the node when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Request shutdown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Executor for remote commands, configured by the `[command]` section.
    ///
    /// Retries are scheduled on the runtime of the calling task.
    pub fn command_executor(&self) -> Result<CommandExecutor> {
        CommandExecutor::from_config(&self.config.command)
    }

    /// Run the node (blocks until shutdown).
    pub async fn run(self) -> anyhow::Result<()> {
        observability::init_tracing(&self.config.observability.logging);

        let node = self.config.node.name.clone();
        let cluster = &self.config.cluster;
        tracing::info!(node = %node, cluster = %cluster.name, "Starting weft node");

        let holder = PartitionHolder::new(
            self.topology_client,
            PartitionAssignment::from_config(&cluster.partitions),
        );
        let partitions = holder
            .resolve_with_cancel(cluster.wait_time(), cluster.max_retries, &self.shutdown)
            .await;

        if partitions.is_empty() {
            if self.shutdown.is_cancelled() {
                tracing::info!(node = %node, "Shutdown requested before partitions were resolved");
                return Ok(());
            }
            tracing::warn!(
                node = %node,
                "Node owns no partitions, no records will be processed until restart"
            );
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut processors = Vec::with_capacity(partitions.len());
        for &partition_id in partitions.ids() {
            let stream = self.log_streams.get_or_create(partition_id);
            let processor =
                StreamProcessor::new(stream, self.repository.clone(), self.handlers.clone());
            processors.push(tokio::spawn(
                PartitionProcessor::new(processor).run(shutdown_rx.clone()),
            ));
        }

        tracing::info!(
            node = %node,
            partitions = ?partitions.ids(),
            workflows = self.repository.len(),
            "Weft node started"
        );

        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received shutdown signal");
            }
            _ = self.shutdown.cancelled() => {
                tracing::info!("Received shutdown notification");
            }
        }

        tracing::info!("Stopping partition processors...");
        let _ = shutdown_tx.send(true);

        for joined in futures::future::join_all(processors).await {
            joined.context("Partition processor task failed")?;
        }

        tracing::info!(node = %node, "Weft node stopped");
        Ok(())
    }
}

impl<C: TopologyClient> fmt::Debug for Weft<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Weft")
            .field("node", &self.config.node.name)
            .field("workflows", &self.repository.len())
            .field("handlers", &self.handlers)
            .field("log_streams", &self.log_streams)
            .finish_non_exhaustive()
    }
}

/// Builder for configuring a weft node.
pub struct WeftBuilder<C: TopologyClient = HttpTopologyClient> {
    config: Option<WeftConfig>,
    topology_client: Option<C>,
    repository: WorkflowRepository,
    handlers: StepHandlerRegistry,
    log_streams: LogStreams,
}

impl WeftBuilder {
    /// Create a new builder with the built-in step handlers.
    pub fn new() -> Self {
        Self {
            config: None,
            topology_client: None,
            repository: WorkflowRepository::new(),
            handlers: StepHandlerRegistry::with_defaults(),
            log_streams: LogStreams::default(),
        }
    }

    /// Use an HTTP topology client built from the `[cluster]` configuration.
    pub fn http_topology_client(mut self) -> Result<Self> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| WeftError::Config("Configuration is required".to_string()))?;
        self.topology_client = Some(HttpTopologyClient::from_config(&config.cluster)?);
        Ok(self)
    }
}

impl Default for WeftBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: TopologyClient> WeftBuilder<C> {
    /// Set the configuration.
    pub fn config(mut self, config: WeftConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the source of cluster topology.
    pub fn topology_client<T: TopologyClient>(self, client: T) -> WeftBuilder<T> {
        WeftBuilder {
            config: self.config,
            topology_client: Some(client),
            repository: self.repository,
            handlers: self.handlers,
            log_streams: self.log_streams,
        }
    }

    /// Deploy a workflow.
    pub fn deploy(mut self, workflow: ExecutableWorkflow) -> Result<Self> {
        self.repository.deploy(workflow)?;
        Ok(self)
    }

    /// Get mutable access to the workflow repository.
    pub fn workflow_repository_mut(&mut self) -> &mut WorkflowRepository {
        &mut self.repository
    }

    /// Get mutable access to the step handler registry.
    pub fn handler_registry_mut(&mut self) -> &mut StepHandlerRegistry {
        &mut self.handlers
    }

    /// Create partition logs with `factory`.
    pub fn log_stream_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(PartitionId) -> InMemoryLogStream + Send + Sync + 'static,
    {
        self.log_streams = LogStreams::new(Arc::new(factory));
        self
    }

    /// Build the node.
    pub fn build(self) -> Result<Weft<C>> {
        let config = self
            .config
            .ok_or_else(|| WeftError::Config("Configuration is required".to_string()))?;
        let topology_client = self
            .topology_client
            .ok_or_else(|| WeftError::Config("Topology client is required".to_string()))?;

        Ok(Weft {
            config,
            topology_client,
            repository: Arc::new(self.repository),
            handlers: Arc::new(self.handlers),
            log_streams: self.log_streams,
            shutdown: CancellationToken::new(),
        })
    }
}

impl<C: TopologyClient> fmt::Debug for WeftBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeftBuilder")
            .field("config", &self.config)
            .field("has_topology_client", &self.topology_client.is_some())
            .field("workflows", &self.repository.len())
            .field("handlers", &self.handlers)
            .field("log_streams", &self.log_streams)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};
    use tonic::Code;
    use weft_core::command::{CommandError, CommandFailure};
    use weft_core::config::PartitionsConfig;
    use weft_core::model::ExecutableCatchEventElement;
    use weft_core::record::UNSET_KEY;
    use weft_core::{Topology, WorkflowInstanceIntent, WorkflowInstanceRecord};

    use super::*;
    use weft_runtime::command::{Command, CommandFuture};

    struct FixedTopology(Option<u32>);

    impl TopologyClient for FixedTopology {
        async fn topology(&self) -> Result<Topology> {
            self.0
                .map(Topology::with_partitions)
                .ok_or_else(|| WeftError::Topology("unreachable".into()))
        }
    }

    fn config(partition_ids: Vec<PartitionId>) -> WeftConfig {
        let mut config = WeftConfig::default();
        config.cluster.wait_time_ms = 10;
        config.cluster.max_retries = 1;
        config.cluster.partitions = PartitionsConfig {
            partition_ids,
            ..Default::default()
        };
        config
    }

    fn workflow() -> ExecutableWorkflow {
        ExecutableWorkflow::builder(1, "invoice", 1)
            .process(vec![ExecutableCatchEventElement::none("start")])
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_config() {
        let result = Weft::builder().topology_client(FixedTopology(Some(1))).build();
        assert!(matches!(result, Err(WeftError::Config(_))));
    }

    #[test]
    fn test_build_requires_topology_client() {
        let result = Weft::builder().config(WeftConfig::default()).build();
        assert!(matches!(result, Err(WeftError::Config(_))));
    }

    #[test]
    fn test_http_topology_client_needs_endpoint() {
        assert_err!(Weft::builder()
            .config(WeftConfig::default())
            .http_topology_client());

        let mut config = WeftConfig::default();
        config.cluster.topology_endpoint = Some("http://gateway:9600".into());
        let weft = assert_ok!(assert_ok!(Weft::builder().config(config).http_topology_client()).build());
        assert_eq!(weft.handler_registry().len(), StepHandlerRegistry::with_defaults().len());
    }

    #[test]
    fn test_log_streams_are_shared() {
        let streams = LogStreams::default();
        let stream = streams.get_or_create(3);
        assert_eq!(streams.get(3).map(|s| s.len()), Some(0));
        stream
            .write_command(
                WorkflowInstanceIntent::ElementActivating,
                WorkflowInstanceRecord::default(),
            )
            .unwrap();
        assert_eq!(streams.get_or_create(3).len(), 1);
        assert!(streams.get(1).is_none());
        assert_eq!(streams.partition_ids(), vec![3]);
    }

    #[tokio::test]
    async fn test_runs_owned_partitions_until_shutdown() {
        let weft = Weft::builder()
            .config(config(vec![2]))
            .topology_client(FixedTopology(Some(2)))
            .deploy(workflow())
            .unwrap()
            .build()
            .unwrap();
        let streams = weft.log_streams();
        let shutdown = weft.shutdown_token();
        let node = tokio::spawn(weft.run());

        let stream = streams.get_or_create(2);
        stream
            .write_command(
                WorkflowInstanceIntent::ElementActivating,
                WorkflowInstanceRecord::new("invoice", 1, UNSET_KEY).with_element_id("invoice"),
            )
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while stream.len() < 4 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        shutdown.cancel();
        assert_ok!(node.await.unwrap());
        assert_eq!(streams.partition_ids(), vec![2]);
        assert_eq!(
            stream.records().last().map(|r| r.intent),
            Some(WorkflowInstanceIntent::EventTriggered)
        );
    }

    #[tokio::test]
    async fn test_misconfigured_node_stays_up_without_partitions() {
        let mut config = config(vec![]);
        config.cluster.partitions.node_count = Some(3);
        config.cluster.partitions.current_node_id = Some(5);
        let weft = Weft::builder()
            .config(config)
            .topology_client(FixedTopology(Some(3)))
            .build()
            .unwrap();
        let streams = weft.log_streams();
        let shutdown = weft.shutdown_token();
        let node = tokio::spawn(weft.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!node.is_finished());

        shutdown.cancel();
        assert_ok!(node.await.unwrap());
        assert!(streams.partition_ids().is_empty());
    }

    struct Unavailable(AtomicU32);

    impl Command for Unavailable {
        fn describe(&self) -> String {
            "PublishMessage{name=paid}".to_string()
        }

        fn execute(&self) -> CommandFuture<'_> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(CommandFailure::status(Code::Unavailable, "gateway down")) })
        }
    }

    #[tokio::test]
    async fn test_command_executor_follows_config() {
        let mut config = config(vec![1]);
        config.command.max_retries = 0;
        let weft = Weft::builder()
            .config(config)
            .topology_client(FixedTopology(Some(1)))
            .build()
            .unwrap();

        let executor = assert_ok!(weft.command_executor());
        assert_eq!(executor.max_retries(), 0);

        let command = Arc::new(Unavailable(AtomicU32::new(0)));
        let err = executor.execute(command.clone()).outcome().await.unwrap_err();
        assert!(matches!(err, CommandError::RetriesExhausted { .. }));
        assert_eq!(command.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_during_discovery() {
        let mut config = config(vec![]);
        config.cluster.max_retries = 1000;
        let weft = Weft::builder()
            .config(config)
            .topology_client(FixedTopology(None))
            .build()
            .unwrap();
        weft.shutdown();

        assert_ok!(weft.run().await);
    }
}
