//! # Supervisor: launches monitor chains, relaunches them forever, shuts down gracefully.
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   Vec<TaskSpec>  ──►  Supervisor::run(specs)
//!
//! Preparation:
//!   - ShutdownSignal::install()                          (SIGINT/SIGTERM)
//!   - listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!
//! Control loop (single owner of the Registry):
//!   launch every spec ──► RetryChain on child token
//!   loop select {
//!     shutdown            ─► break
//!     registry.next_exit  ─► Completed / Escalated / Cancelled / Panicked
//!                              └─► registry.relaunch(name)   (fresh RetryState)
//!   }
//!
//! Shutdown path:
//!   publish ShutdownRequested
//!   runtime_token.cancel() ─► every chain and attempt token
//!   drain within cfg.grace:
//!     ├─ all joined  → publish AllStoppedWithin, Ok(())
//!     └─ timeout     → publish GraceExceeded, Err(GraceExceeded { stuck })
//! ```
//!
//! A monitor is never abandoned by the supervisor: whatever ends a chain, a new
//! chain for the same name starts immediately, unless shutdown is in progress.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::{
    chain::ChainExit,
    config::SupervisorConfig,
    registry::{Exit, Registry},
    shutdown::ShutdownSignal,
};
use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    subscribers::{Subscribe, SubscriberSet},
    tasks::TaskSpec,
};

/// Coordinates monitor chains, event delivery and graceful shutdown.
///
/// A supervisor runs once: [`run`](Supervisor::run) consumes it.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Supervisor {
    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        Self {
            cfg,
            bus,
            subscribers,
        }
    }

    /// Runtime configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Event bus; subscribe before calling `run` to observe every event.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs the monitors until SIGINT or SIGTERM.
    pub async fn run(self, specs: Vec<TaskSpec>) -> Result<(), RuntimeError> {
        let mut signal = ShutdownSignal::install().map_err(RuntimeError::Signal)?;
        self.run_until(specs, async move { signal.recv().await }).await
    }

    /// Runs the monitors until `shutdown` completes.
    pub async fn run_until<F>(self, specs: Vec<TaskSpec>, shutdown: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()>,
    {
        let listener_stop = CancellationToken::new();
        let listener = self.subscriber_listener(listener_stop.clone());

        let runtime_token = CancellationToken::new();
        let mut registry = Registry::new(self.bus.clone(), runtime_token.clone());
        self.launch_all(&mut registry, specs);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                exit = registry.next_exit() => match exit {
                    Some(exit) => self.handle_exit(&mut registry, exit),
                    None => {
                        (&mut shutdown).await;
                        break;
                    }
                },
            }
        }

        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        runtime_token.cancel();
        let res = self.wait_all_with_grace(&mut registry).await;

        listener_stop.cancel();
        let _ = listener.await;
        res
    }

    /// Registers every spec; duplicate names are rejected and reported.
    fn launch_all(&self, registry: &mut Registry, specs: Vec<TaskSpec>) {
        for spec in specs {
            let name = spec.name().to_string();
            if !registry.launch(spec) {
                self.bus.publish(
                    Event::new(EventKind::MonitorRejected)
                        .with_task(name)
                        .with_reason("duplicate monitor name"),
                );
            }
        }
    }

    /// Reports how a chain ended and starts a fresh one under the same name.
    fn handle_exit(&self, registry: &mut Registry, exit: Exit) {
        if !registry.is_current(&exit) {
            return;
        }

        match &exit.outcome {
            ChainExit::Completed { attempts } => {
                self.bus.publish(
                    Event::new(EventKind::MonitorCompleted)
                        .with_task(Arc::clone(&exit.name))
                        .with_attempt(*attempts),
                );
            }
            ChainExit::Panicked { info } => {
                self.bus.publish(
                    Event::new(EventKind::ChainEscalated)
                        .with_task(Arc::clone(&exit.name))
                        .with_reason(format!("chain panicked: {info}")),
                );
            }
            // The chain already published ChainEscalated.
            ChainExit::Escalated { .. } | ChainExit::Cancelled => {}
        }

        if let Some(generation) = registry.relaunch(&exit.name) {
            self.bus.publish(
                Event::new(EventKind::MonitorRelaunched)
                    .with_task(exit.name)
                    .with_attempt(generation),
            );
        }
    }

    /// Forwards bus events to the subscriber set until `stop` fires, then
    /// drains what is already queued and lets every subscriber finish.
    fn subscriber_listener(&self, stop: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let set = SubscriberSet::new(self.subscribers.clone(), self.bus.clone());

        tokio::spawn(async move {
            use tokio::sync::broadcast::error::{RecvError, TryRecvError};

            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => set.emit(&ev),
                                Err(TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        })
    }

    /// Waits for all chains to unwind within the configured grace period.
    async fn wait_all_with_grace(&self, registry: &mut Registry) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        registry.cancel_all();

        match tokio::time::timeout(grace, registry.drain()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let stuck = registry.names();
                registry.abort_all();
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
                );
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}
