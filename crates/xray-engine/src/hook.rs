//! Process-wide failure handler slots.
//!
//! Hosts register the diagnostic layer as a last-resort handler for the main
//! execution context and, separately, for secondary contexts (spawned
//! threads), since runtimes route those failures differently. Registration
//! is explicit, idempotent, and reversible: slots, not monkey-patching.

use std::sync::Mutex;

use xray_model::{ColorMode, HookTargets, ReportConfig};

use crate::error::ScriptError;
use crate::report;

/// Which execution context observed the escaping error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionContext {
    Main,
    /// A spawned thread, identified by name when it has one.
    Secondary { thread: String },
}

impl ExecutionContext {
    /// Classify the calling thread. The Rust runtime names the initial
    /// thread `main`; unnamed spawned threads report their debug id.
    pub fn current() -> Self {
        let current = std::thread::current();
        match current.name() {
            Some("main") => ExecutionContext::Main,
            Some(name) => ExecutionContext::Secondary {
                thread: name.to_string(),
            },
            None => ExecutionContext::Secondary {
                thread: format!("{:?}", current.id()),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct HookState {
    targets: HookTargets,
    config: ReportConfig,
}

static HOOK: Mutex<Option<HookState>> = Mutex::new(None);

fn hook_state() -> std::sync::MutexGuard<'static, Option<HookState>> {
    HOOK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Install (or re-install) the global handler slots described by
/// `config.hooks`. Idempotent: installing twice simply replaces the stored
/// configuration. Honors the `NO_COLOR` convention.
pub fn install(config: &ReportConfig) {
    let mut config = config.clone();
    if std::env::var_os("NO_COLOR").is_some() {
        config.color = ColorMode::Never;
    }
    *hook_state() = Some(HookState {
        targets: config.hooks,
        config,
    });
}

/// Remove every installed slot. Idempotent.
pub fn uninstall() {
    *hook_state() = None;
}

/// Targets currently installed, if any.
pub fn installed_targets() -> Option<HookTargets> {
    hook_state().as_ref().map(|state| state.targets)
}

fn handles(targets: HookTargets, ctx: &ExecutionContext) -> bool {
    match targets {
        HookTargets::Both => true,
        HookTargets::None => false,
        HookTargets::Main => matches!(ctx, ExecutionContext::Main),
        HookTargets::Secondary => matches!(ctx, ExecutionContext::Secondary { .. }),
    }
}

/// Last-resort entry point: render a report for an error escaping in `ctx`.
///
/// Returns `None` when no slot covers the context. The error itself is left
/// untouched either way; callers re-raise or return it unchanged.
pub fn handle_escaping_error(err: &ScriptError, ctx: &ExecutionContext) -> Option<String> {
    let state = hook_state().as_ref().cloned()?;
    if !handles(state.targets, ctx) {
        return None;
    }
    Some(report::render(err, &state.config))
}
