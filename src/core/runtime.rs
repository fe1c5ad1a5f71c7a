//! Runtime orchestration.
//!
//! The [`Runtime`] wires the pieces together from configuration: cluster
//! view, id generator, timer store, and the dispatch loop. The HTTP surface
//! and the replication transport are injected as sinks by the embedding
//! binary.

use crate::cluster::id::IdGenerator;
use crate::cluster::view::ClusterView;
use crate::core::config::Config;
use crate::core::time::{Clock, SystemClock};
use crate::dispatch::dispatcher::{CallbackSink, Dispatcher, ReplicationSink};
use crate::ops::observability::ServiceStats;
use crate::store::timer_store::TimerStore;
use anyhow::Result;
use std::sync::Arc;

/// Component health used by readiness reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentHealth {
    /// Not yet started.
    Pending,
    /// Running normally.
    Healthy,
}

/// Health snapshot across runtime components.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeHealth {
    /// Cluster view constructed.
    pub cluster: ComponentHealth,
    /// Store initialised.
    pub store: ComponentHealth,
    /// Dispatcher thread running.
    pub dispatcher: ComponentHealth,
}

impl RuntimeHealth {
    fn pending() -> Self {
        Self {
            cluster: ComponentHealth::Pending,
            store: ComponentHealth::Pending,
            dispatcher: ComponentHealth::Pending,
        }
    }

    /// Ready once every component is healthy.
    pub fn is_ready(&self) -> bool {
        [self.cluster, self.store, self.dispatcher]
            .iter()
            .all(|c| *c == ComponentHealth::Healthy)
    }
}

/// The assembled timer service.
pub struct Runtime {
    config: Config,
    view: ClusterView,
    ids: Arc<IdGenerator>,
    store: Arc<TimerStore>,
    dispatcher: Dispatcher,
    health: RuntimeHealth,
}

impl Runtime {
    /// Build a runtime from configuration and injected sinks, using the
    /// system clock.
    pub fn new(
        config: Config,
        callbacks: Arc<dyn CallbackSink>,
        replication: Arc<dyn ReplicationSink>,
    ) -> Result<Self> {
        Self::with_clock(config, callbacks, replication, Arc::new(SystemClock))
    }

    /// Build a runtime with an explicit clock.
    pub fn with_clock(
        config: Config,
        callbacks: Arc<dyn CallbackSink>,
        replication: Arc<dyn ReplicationSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        tracing::debug!("constructing cluster view");
        let view = ClusterView::from_config(&config);
        tracing::info!(
            local = %view.local_address(),
            nodes = view.size(),
            bind_port = view.bind_port(),
            "cluster view constructed"
        );

        let ids = Arc::new(IdGenerator::new(config.identity, Arc::clone(&clock)));

        let store = Arc::new(TimerStore::new(view.clone(), clock.as_ref()));
        tracing::info!("timer store initialised");

        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            callbacks,
            replication,
            config.timers.dispatch_interval_ms,
        );

        let mut health = RuntimeHealth::pending();
        health.cluster = ComponentHealth::Healthy;
        health.store = ComponentHealth::Healthy;

        Ok(Self {
            config,
            view,
            ids,
            store,
            dispatcher,
            health,
        })
    }

    /// Start the dispatch loop.
    pub fn start(&mut self) {
        self.dispatcher.start();
        self.health.dispatcher = ComponentHealth::Healthy;
        tracing::info!("chime runtime started");
    }

    /// Stop the dispatch loop and wait for it to exit.
    pub fn shutdown(&mut self) {
        tracing::info!("shutdown requested");
        self.dispatcher.shutdown();
        self.health.dispatcher = ComponentHealth::Pending;
    }

    /// The runtime's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The cluster view the service schedules against.
    pub fn view(&self) -> &ClusterView {
        &self.view
    }

    /// The id generator for new timers.
    pub fn ids(&self) -> &Arc<IdGenerator> {
        &self.ids
    }

    /// The timer store.
    pub fn store(&self) -> &Arc<TimerStore> {
        &self.store
    }

    /// Current health snapshot.
    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    /// Check if every component is up.
    pub fn is_ready(&self) -> bool {
        self.health.is_ready()
    }

    /// Aggregate service statistics.
    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            store: self.store.stats(),
            dispatch: self.dispatcher.stats(),
        }
    }
}
