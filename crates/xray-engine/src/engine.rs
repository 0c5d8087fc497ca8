//! Engine facade: module loading (the instrumentation installer), calls,
//! and report generation.

use std::sync::Arc;

use ahash::AHashMap;
use xray_model::{ErrorKind, ReportConfig, SourceFile, Span, Value};

use crate::ast::FnDecl;
use crate::capture::CaptureStore;
use crate::decompose::{decompose_unit, DecomposedUnit};
use crate::error::{DecomposeError, LoadError, ScriptError};
use crate::eval::{call_function, EvalContext, FnBody, FnEntry};
use crate::hook::{self, ExecutionContext};
use crate::parser::parse_module;
use crate::report;

/// Name under which a module's top-level statements are installed.
const MODULE_BODY: &str = "<module>";

struct ModuleEntry {
    functions: Vec<String>,
    body: Option<Arc<FnEntry>>,
}

/// Loads script modules, installs their instrumented bodies, runs calls, and
/// renders diagnostic reports for escaping errors.
///
/// Loading takes `&mut self`; calls take `&self` and may run concurrently
/// from many threads; every invocation owns its own capture slice.
pub struct Engine {
    config: ReportConfig,
    store: CaptureStore,
    functions: AHashMap<String, Arc<FnEntry>>,
    modules: AHashMap<String, ModuleEntry>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(ReportConfig::default())
    }

    pub fn with_config(config: ReportConfig) -> Self {
        Self {
            config,
            store: CaptureStore::new(),
            functions: AHashMap::new(),
            modules: AHashMap::new(),
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Parse `source`, decompose every unit, and install the rewritten
    /// bodies. A unit whose decomposition fails is installed uninstrumented
    /// (direct evaluation) and logged; other units are unaffected.
    ///
    /// Reloading a module name replaces its previous installation.
    pub fn load_module(&mut self, name: &str, source: &str) -> Result<(), LoadError> {
        self.load_module_impl(name, source, true)
    }

    /// Install a module without decomposition: every unit runs through the
    /// direct evaluator and reports carry location-only frames. Useful for
    /// overhead comparisons and as the oracle in equivalence tests.
    pub fn load_module_uninstrumented(&mut self, name: &str, source: &str) -> Result<(), LoadError> {
        self.load_module_impl(name, source, false)
    }

    fn load_module_impl(
        &mut self,
        name: &str,
        source: &str,
        instrument: bool,
    ) -> Result<(), LoadError> {
        let module = parse_module(source).map_err(|err| LoadError::Parse {
            module: name.to_string(),
            source: err,
        })?;

        // Replace semantics for the same module; collisions with functions
        // installed by *other* modules are load errors.
        let replaced: Vec<String> = self
            .modules
            .get(name)
            .map(|entry| entry.functions.clone())
            .unwrap_or_default();
        let mut seen = Vec::new();
        for decl in &module.functions {
            let clashes_elsewhere = self.functions.contains_key(&decl.name)
                && !replaced.contains(&decl.name);
            if clashes_elsewhere || seen.contains(&decl.name) {
                return Err(LoadError::DuplicateFunction {
                    name: decl.name.clone(),
                });
            }
            seen.push(decl.name.clone());
        }
        self.unload_module(name);

        let source = Arc::new(SourceFile::new(name, source));
        let decomposed = if instrument {
            decompose_functions(&module.functions)
        } else {
            Vec::new()
        };

        let mut installed = Vec::with_capacity(module.functions.len());
        let mut results = decomposed.into_iter();
        for decl in &module.functions {
            let body = if instrument {
                match results.next() {
                    Some(result) => instrument_or_fall_back(&decl.name, decl, result),
                    None => FnBody::Direct(Arc::new(decl.body.clone())),
                }
            } else {
                FnBody::Direct(Arc::new(decl.body.clone()))
            };
            let entry = Arc::new(FnEntry {
                name: decl.name.clone(),
                name_span: decl.name_span,
                params: decl.params.clone(),
                body,
                source: Arc::clone(&source),
            });
            self.functions.insert(decl.name.clone(), entry);
            installed.push(decl.name.clone());
        }

        let body = if module.body.is_empty() {
            None
        } else {
            let body = if !instrument {
                FnBody::Direct(Arc::new(module.body.clone()))
            } else {
                match decompose_unit(&module.body) {
                    Ok(unit) => FnBody::Instrumented(Arc::new(unit)),
                    Err(err) => {
                        log::warn!("instrumentation disabled for module body of `{name}`: {err}");
                        FnBody::Direct(Arc::new(module.body.clone()))
                    }
                }
            };
            Some(Arc::new(FnEntry {
                name: MODULE_BODY.to_string(),
                name_span: Span::new(0, 0),
                params: Vec::new(),
                body,
                source: Arc::clone(&source),
            }))
        };

        self.modules.insert(
            name.to_string(),
            ModuleEntry {
                functions: installed,
                body,
            },
        );
        Ok(())
    }

    /// Remove a module and everything it installed. Idempotent.
    pub fn unload_module(&mut self, name: &str) -> bool {
        match self.modules.remove(name) {
            Some(entry) => {
                for function in &entry.functions {
                    self.functions.remove(function);
                }
                true
            }
            None => false,
        }
    }

    /// Call an installed function. Signature and return behavior are those
    /// of the original source; instrumentation only adds capture writes.
    pub fn call(&self, function: &str, args: &[Value]) -> Result<Value, ScriptError> {
        let Some(entry) = self.functions.get(function) else {
            return Err(ScriptError::new(
                ErrorKind::UndefinedFunction,
                format!("undefined function `{function}`"),
                Span::new(0, 0),
            ));
        };
        let ctx = EvalContext {
            functions: &self.functions,
            store: &self.store,
        };
        call_function(ctx, entry, args.to_vec(), entry.name_span, 0)
    }

    /// Execute a module's top-level statements.
    pub fn run_module(&self, name: &str) -> Result<Value, ScriptError> {
        let Some(entry) = self.modules.get(name).and_then(|m| m.body.clone()) else {
            return Err(ScriptError::new(
                ErrorKind::UndefinedFunction,
                format!("module `{name}` has no executable body"),
                Span::new(0, 0),
            ));
        };
        let ctx = EvalContext {
            functions: &self.functions,
            store: &self.store,
        };
        call_function(ctx, &entry, Vec::new(), entry.name_span, 0)
    }

    /// Like [`Engine::call`], but an escaping error is first routed through
    /// the installed global hook (which prints the report to stderr). The
    /// error is returned unchanged either way.
    pub fn call_reported(&self, function: &str, args: &[Value]) -> Result<Value, ScriptError> {
        self.call(function, args).map_err(|err| {
            if let Some(text) = hook::handle_escaping_error(&err, &ExecutionContext::current()) {
                eprintln!("{text}");
            }
            err
        })
    }

    /// Programmatic boundary: render a report for an already-caught error
    /// without installing any hooks.
    pub fn diagnose(&self, err: &ScriptError) -> String {
        report::render(err, &self.config)
    }

    /// Register this engine's configuration in the process-wide hook slots.
    pub fn install_hooks(&self) {
        hook::install(&self.config);
    }

    /// Number of in-flight capture slices; zero whenever no call is active,
    /// regardless of how calls ended.
    pub fn active_invocations(&self) -> usize {
        self.store.active()
    }
}

/// Decompose all function bodies of a module. Units are independent, so the
/// work fans out across threads when the `parallel` feature is enabled.
#[cfg(feature = "parallel")]
fn decompose_functions(functions: &[FnDecl]) -> Vec<Result<DecomposedUnit, DecomposeError>> {
    use rayon::prelude::*;
    functions
        .par_iter()
        .map(|decl| decompose_unit(&decl.body))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn decompose_functions(functions: &[FnDecl]) -> Vec<Result<DecomposedUnit, DecomposeError>> {
    functions
        .iter()
        .map(|decl| decompose_unit(&decl.body))
        .collect()
}

fn instrument_or_fall_back(
    name: &str,
    decl: &FnDecl,
    result: Result<DecomposedUnit, DecomposeError>,
) -> FnBody {
    match result {
        Ok(unit) => FnBody::Instrumented(Arc::new(unit)),
        Err(err) => {
            log::warn!("instrumentation disabled for `{name}`: {err}");
            FnBody::Direct(Arc::new(decl.body.clone()))
        }
    }
}
