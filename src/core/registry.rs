//! # Registry of in-flight monitor chains.
//!
//! Owned by the supervisor's control loop and mutated only from there, so it
//! carries no lock. Each monitor name maps to exactly one [`Slot`]; a relaunch
//! replaces the slot and bumps its generation.
//!
//! ```text
//! launch(spec)  ──► Slot { spec, cancel, generation: 1 } + JoinSet::spawn(chain)
//! next_exit()   ──► JoinSet::join_next() → Exit { name, generation, outcome }
//! relaunch(name)──► Slot.generation += 1, fresh RetryChain on a new child token
//! drain()       ──► awaits every chain, removing slots as they finish
//! ```

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::core::chain::{ChainExit, RetryChain};
use crate::core::runner::panic_message;
use crate::events::Bus;
use crate::tasks::TaskSpec;

/// Registry entry for one monitor.
struct Slot {
    spec: TaskSpec,
    cancel: CancellationToken,
    generation: u32,
}

/// A chain that finished.
#[derive(Debug)]
pub struct Exit {
    /// Monitor name.
    pub name: Arc<str>,
    /// Launch generation the chain belonged to.
    pub generation: u32,
    /// How the chain ended.
    pub outcome: ChainExit,
}

/// Name-keyed map of in-flight chains plus the join set driving them.
pub struct Registry {
    slots: HashMap<Arc<str>, Slot>,
    chains: JoinSet<Exit>,
    bus: Bus,
    runtime_token: CancellationToken,
}

impl Registry {
    /// Creates an empty registry whose chains inherit `runtime_token`.
    pub fn new(bus: Bus, runtime_token: CancellationToken) -> Self {
        Self {
            slots: HashMap::new(),
            chains: JoinSet::new(),
            bus,
            runtime_token,
        }
    }

    /// Registers and starts a monitor. Returns `false` if the name is taken.
    pub fn launch(&mut self, spec: TaskSpec) -> bool {
        let name: Arc<str> = Arc::from(spec.name());
        if self.slots.contains_key(&name) {
            return false;
        }
        let cancel = self.spawn_chain(Arc::clone(&name), &spec, 1);
        self.slots.insert(
            name,
            Slot {
                spec,
                cancel,
                generation: 1,
            },
        );
        true
    }

    /// Starts a fresh chain for a registered monitor, replacing its slot.
    ///
    /// Returns the new generation, or `None` for an unknown name.
    pub fn relaunch(&mut self, name: &str) -> Option<u32> {
        let slot = self.slots.remove(name)?;
        let name: Arc<str> = Arc::from(name);
        let generation = slot.generation.saturating_add(1);
        let cancel = self.spawn_chain(Arc::clone(&name), &slot.spec, generation);
        self.slots.insert(
            name,
            Slot {
                spec: slot.spec,
                cancel,
                generation,
            },
        );
        Some(generation)
    }

    /// Waits for the next chain to finish.
    ///
    /// Returns `None` once no chain is running. Cancel-safe.
    pub async fn next_exit(&mut self) -> Option<Exit> {
        loop {
            match self.chains.join_next().await? {
                Ok(exit) => return Some(exit),
                Err(err) => {
                    // Chains catch their own panics; only an abort lands here.
                    error!(error = %err, "monitor chain aborted");
                }
            }
        }
    }

    /// Current generation of a monitor, if registered.
    pub fn generation(&self, name: &str) -> Option<u32> {
        self.slots.get(name).map(|s| s.generation)
    }

    /// Returns `true` if `exit` belongs to the slot's current chain.
    pub fn is_current(&self, exit: &Exit) -> bool {
        self.generation(&exit.name) == Some(exit.generation)
    }

    /// Sorted names of registered monitors.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.keys().map(|n| n.to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Requests cooperative cancellation of every chain.
    pub fn cancel_all(&self) {
        for slot in self.slots.values() {
            slot.cancel.cancel();
        }
    }

    /// Awaits every running chain, dropping slots as their chains finish.
    ///
    /// Whatever is left in the registry afterwards never finished.
    pub async fn drain(&mut self) {
        while let Some(exit) = self.next_exit().await {
            if self.is_current(&exit) {
                self.slots.remove(&exit.name);
            }
        }
    }

    /// Aborts whatever is still running.
    pub fn abort_all(&mut self) {
        self.chains.abort_all();
    }

    fn spawn_chain(&mut self, name: Arc<str>, spec: &TaskSpec, generation: u32) -> CancellationToken {
        let token = self.runtime_token.child_token();
        let chain = RetryChain::new(self.bus.clone(), Arc::clone(spec.task()), spec.retry());
        let chain_token = token.clone();

        self.chains.spawn(async move {
            let outcome = AssertUnwindSafe(chain.run(chain_token))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| ChainExit::Panicked {
                    info: panic_message(panic.as_ref()),
                });
            Exit {
                name,
                generation,
                outcome,
            }
        });
        token
    }
}
