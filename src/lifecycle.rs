//! Lifecycle Orchestrator (§4.D): `CONFIGURING -> INITIALISING -> READY -> SERVING ->
//! DRAINING -> STOPPED`, with INIT/BOOT/SHUTDOWN hook registries and signal-driven
//! shutdown.
//!
//! Grounded in the sibling example's `AppBuilder` startup/shutdown hook vectors
//! (`builder.rs`: `startup_hooks`, `shutdown_hooks`, run in registration order before/
//! after serving) generalised onto the spec's explicit three-event, priority-ordered
//! hook registry and re-expressed as an owned state machine rather than a type-level
//! builder phase. Signal handling uses `signal-hook`'s iterator API (already a teacher
//! dependency) instead of `tokio::signal`, since the orchestrator itself is transport-
//! agnostic and must not assume an async runtime is driving it.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use crate::error::LifecycleError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Configuring,
    Initialising,
    Ready,
    Serving,
    Draining,
    Stopped,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            State::Configuring => "CONFIGURING",
            State::Initialising => "INITIALISING",
            State::Ready => "READY",
            State::Serving => "SERVING",
            State::Draining => "DRAINING",
            State::Stopped => "STOPPED",
        }
    }

    /// The single legal next state, or `None` if `self` is terminal.
    fn next(self) -> Option<State> {
        match self {
            State::Configuring => Some(State::Initialising),
            State::Initialising => Some(State::Ready),
            State::Ready => Some(State::Serving),
            State::Serving => Some(State::Draining),
            State::Draining => Some(State::Stopped),
            State::Stopped => None,
        }
    }
}

type HookFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

struct Hook {
    name: String,
    priority: Option<i32>,
    call: HookFn,
}

/// A registered INIT/BOOT/SHUTDOWN callback, in declaration order.
#[derive(Default)]
struct HookRegistry {
    hooks: Vec<Hook>,
}

impl HookRegistry {
    /// Hooks run in registration order; an explicit `priority` overrides that order
    /// (lower runs earlier), stable among hooks sharing a priority (§4.D Hook registry).
    fn push(&mut self, name: impl Into<String>, priority: Option<i32>, call: HookFn) {
        self.hooks.push(Hook { name: name.into(), priority, call });
    }

    fn ordered(&self) -> Vec<&Hook> {
        let mut indexed: Vec<(i32, &Hook)> = self
            .hooks
            .iter()
            .enumerate()
            .map(|(i, h)| (h.priority.unwrap_or(i as i32), h))
            .collect();
        indexed.sort_by_key(|(p, _)| *p);
        indexed.into_iter().map(|(_, h)| h).collect()
    }
}

/// Runs registered INIT / BOOT / SHUTDOWN hooks in order; drives the state machine;
/// wires signal-based shutdown (§4.D).
pub struct Lifecycle {
    state: Mutex<State>,
    init_hooks: Mutex<HookRegistry>,
    boot_hooks: Mutex<HookRegistry>,
    shutdown_hooks: Mutex<HookRegistry>,
    shutdown_requested: Arc<AtomicBool>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Configuring),
            init_hooks: Mutex::new(HookRegistry::default()),
            boot_hooks: Mutex::new(HookRegistry::default()),
            shutdown_hooks: Mutex::new(HookRegistry::default()),
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn state(&self) -> State {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn require(&self, expected: State, operation: &str) -> Result<(), LifecycleError> {
        let current = self.state();
        if current != expected {
            return Err(LifecycleError::IllegalInState {
                operation: operation.to_string(),
                state: current.name().to_string(),
            });
        }
        Ok(())
    }

    /// Register an INIT hook. Legal only in `CONFIGURING` (route/provider registration
    /// is open at the same time).
    pub fn on_init(
        &self,
        name: impl Into<String>,
        priority: Option<i32>,
        hook: impl Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync + 'static,
    ) -> Result<(), LifecycleError> {
        self.require(State::Configuring, "register INIT hook")?;
        self.init_hooks.lock().unwrap_or_else(|e| e.into_inner()).push(name, priority, Arc::new(hook));
        Ok(())
    }

    pub fn on_boot(
        &self,
        name: impl Into<String>,
        priority: Option<i32>,
        hook: impl Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync + 'static,
    ) -> Result<(), LifecycleError> {
        self.require(State::Configuring, "register BOOT hook")?;
        self.boot_hooks.lock().unwrap_or_else(|e| e.into_inner()).push(name, priority, Arc::new(hook));
        Ok(())
    }

    pub fn on_shutdown(
        &self,
        name: impl Into<String>,
        priority: Option<i32>,
        hook: impl Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync + 'static,
    ) -> Result<(), LifecycleError> {
        self.require(State::Configuring, "register SHUTDOWN hook")?;
        self.shutdown_hooks.lock().unwrap_or_else(|e| e.into_inner()).push(name, priority, Arc::new(hook));
        Ok(())
    }

    fn transition_to(&self, target: State) -> Result<(), LifecycleError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.next() {
            Some(next) if next == target => {
                info!(from = state.name(), to = target.name(), "lifecycle transition");
                *state = target;
                Ok(())
            }
            _ => Err(LifecycleError::IllegalTransition {
                from: state.name().to_string(),
                to: target.name().to_string(),
            }),
        }
    }

    /// Run INIT hooks, then transition `CONFIGURING -> INITIALISING -> READY`. INIT
    /// failures are fatal (§7: "Init-hook failure ... Fatal; abort startup").
    pub async fn initialise(&self) -> Result<(), LifecycleError> {
        self.transition_to(State::Initialising)?;
        let hooks: Vec<Hook> = {
            let registry = self.init_hooks.lock().unwrap_or_else(|e| e.into_inner());
            registry.ordered().into_iter().map(|h| Hook { name: h.name.clone(), priority: h.priority, call: h.call.clone() }).collect()
        };
        for hook in hooks {
            if let Err(message) = (hook.call)().await {
                error!(hook = %hook.name, %message, "INIT hook failed");
                return Err(LifecycleError::InitHookFailed { hook: hook.name, message });
            }
            info!(hook = %hook.name, "INIT hook completed");
        }
        self.transition_to(State::Ready)
    }

    /// Transition `READY -> SERVING`, then run BOOT hooks. BOOT failures are logged,
    /// not fatal (§7).
    pub async fn serve(&self) -> Result<(), LifecycleError> {
        self.transition_to(State::Serving)?;
        let hooks: Vec<Hook> = {
            let registry = self.boot_hooks.lock().unwrap_or_else(|e| e.into_inner());
            registry.ordered().into_iter().map(|h| Hook { name: h.name.clone(), priority: h.priority, call: h.call.clone() }).collect()
        };
        for hook in hooks {
            if let Err(message) = (hook.call)().await {
                warn!(hook = %hook.name, %message, "BOOT hook failed, continuing");
            } else {
                info!(hook = %hook.name, "BOOT hook completed");
            }
        }
        Ok(())
    }

    /// Dispatch is only legal while `SERVING` (§4.D).
    pub fn check_can_dispatch(&self) -> Result<(), LifecycleError> {
        self.require(State::Serving, "dispatch request")
    }

    /// `SERVING -> DRAINING -> STOPPED`, running SHUTDOWN hooks. Failures are logged,
    /// not fatal (§7).
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        self.transition_to(State::Draining)?;
        let hooks: Vec<Hook> = {
            let registry = self.shutdown_hooks.lock().unwrap_or_else(|e| e.into_inner());
            registry.ordered().into_iter().map(|h| Hook { name: h.name.clone(), priority: h.priority, call: h.call.clone() }).collect()
        };
        for hook in hooks {
            if let Err(message) = (hook.call)().await {
                warn!(hook = %hook.name, %message, "SHUTDOWN hook failed, continuing");
            } else {
                info!(hook = %hook.name, "SHUTDOWN hook completed");
            }
        }
        self.transition_to(State::Stopped)
    }

    /// Returns a flag flipped by the signal handler thread spawned by
    /// [`Lifecycle::spawn_signal_listener`]; callers poll this at suspension points to
    /// begin a graceful shutdown (§6 Exit conditions: SIGTERM/SIGINT trigger shutdown).
    #[must_use]
    pub fn shutdown_requested(&self) -> Arc<AtomicBool> {
        self.shutdown_requested.clone()
    }

    /// Spawn a background thread that sets `shutdown_requested` on SIGTERM/SIGINT.
    #[cfg(unix)]
    pub fn spawn_signal_listener(&self) -> std::io::Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGTERM, SIGINT])?;
        let flag = self.shutdown_requested.clone();
        std::thread::spawn(move || {
            for signal in signals.forever() {
                info!(signal, "shutdown signal received");
                flag.store(true, Ordering::SeqCst);
                break;
            }
        });
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
