//! Module and include resolution
//!
//! Before compilation every module controller is replaced by a copy of the
//! element it points at, and every include controller by the plan loaded from
//! its file. Both become simple controllers with the spliced subtree as their
//! only child.

use crate::error::{ControlError, ControlResult, LoadError};
use crate::plan::{NodeKind, PlanNode};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Addressable tree that module controllers resolve their targets against
pub trait TreeProvider: Send + Sync {
    /// Look up an element by names from the root down
    fn find(&self, path: &[String]) -> Option<PlanNode>;
}

impl TreeProvider for PlanNode {
    fn find(&self, path: &[String]) -> Option<PlanNode> {
        self.find_path(path).cloned()
    }
}

/// Loads the plan an include controller refers to
pub trait PlanLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<PlanNode, LoadError>;
}

/// Loads YAML (`.yaml`, `.yml`) or JSON (`.json`) plan files
#[derive(Debug, Clone, Default)]
pub struct FilePlanLoader {
    base_dir: Option<PathBuf>,
}

impl FilePlanLoader {
    /// Relative include paths are resolved against `base_dir` when set
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl PlanLoader for FilePlanLoader {
    fn load(&self, path: &str) -> Result<PlanNode, LoadError> {
        if path.trim().is_empty() {
            return Err(LoadError::EmptyPath);
        }
        let full = self.full_path(path.trim());
        if !full.exists() {
            return Err(LoadError::NotFound(full));
        }

        let extension = full
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let is_json = match extension.as_deref() {
            Some("yaml") | Some("yml") => false,
            Some("json") => true,
            _ => return Err(LoadError::UnsupportedFormat(full)),
        };

        let content = fs::read_to_string(&full).map_err(|e| LoadError::Io {
            path: full.clone(),
            message: e.to_string(),
        })?;

        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| LoadError::Parse {
            path: full.clone(),
            message,
        })
    }
}

/// Include results kept for the duration of one test
#[derive(Debug, Default)]
pub struct IncludeCache {
    entries: Mutex<HashMap<String, Result<PlanNode, LoadError>>>,
}

impl IncludeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for `path`, loading it on first request
    pub fn get_or_load(&self, path: &str, loader: &dyn PlanLoader) -> Result<PlanNode, LoadError> {
        let mut entries = self.entries.lock();
        if let Some(cached) = entries.get(path) {
            debug!(path, "Include served from cache");
            return cached.clone();
        }
        let loaded = loader.load(path);
        entries.insert(path.to_string(), loaded.clone());
        loaded
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Whether resolution failures should abort (running) or only be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    Running,
    Validating,
}

/// User-facing messages collected during resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ResolutionReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }
}

/// Splices module targets and included plans into a tree
pub struct Resolver<'a> {
    tree: &'a dyn TreeProvider,
    loader: &'a dyn PlanLoader,
    cache: Option<&'a IncludeCache>,
    mode: ResolveMode,
}

impl<'a> Resolver<'a> {
    pub fn new(tree: &'a dyn TreeProvider, loader: &'a dyn PlanLoader, mode: ResolveMode) -> Self {
        Self {
            tree,
            loader,
            cache: None,
            mode,
        }
    }

    /// Load every include file at most once through `cache`
    pub fn with_cache(mut self, cache: &'a IncludeCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Resolve every module and include below `root` and prune disabled elements
    pub fn resolve(&self, root: &PlanNode) -> ControlResult<(PlanNode, ResolutionReport)> {
        let mut report = ResolutionReport::default();
        let mut trail = Vec::new();
        let resolved = self.resolve_node(root, &mut trail, &mut report)?;
        let pruned = prune_disabled(&resolved).ok_or_else(|| {
            ControlError::InvalidPlan(format!("root element '{}' is disabled", root.name))
        })?;
        Ok((pruned, report))
    }

    fn resolve_node(
        &self,
        node: &PlanNode,
        trail: &mut Vec<String>,
        report: &mut ResolutionReport,
    ) -> ControlResult<PlanNode> {
        if !node.enabled {
            return Ok(node.clone());
        }
        match &node.kind {
            NodeKind::Module(cfg) => self.resolve_module(node, &cfg.path, trail, report),
            NodeKind::Include(cfg) => self.resolve_include(node, &cfg.path, trail, report),
            _ => {
                let mut resolved = node.clone();
                resolved.children = node
                    .children
                    .iter()
                    .map(|child| self.resolve_node(child, trail, report))
                    .collect::<ControlResult<Vec<_>>>()?;
                Ok(resolved)
            }
        }
    }

    fn resolve_module(
        &self,
        node: &PlanNode,
        path: &[String],
        trail: &mut Vec<String>,
        report: &mut ResolutionReport,
    ) -> ControlResult<PlanNode> {
        let joined = path.join("/");
        let key = format!("module:{}", joined);
        if trail.contains(&key) {
            let chain = format!("{} -> {}", trail.join(" -> "), key);
            return self.fail(
                node,
                ControlError::ReplacementCycle {
                    node: node.name.clone(),
                    chain,
                },
                report,
            );
        }

        let target = match self.tree.find(path) {
            Some(target) => target,
            None => {
                return self.fail(
                    node,
                    ControlError::ModuleTargetNotFound {
                        node: node.name.clone(),
                        path: joined,
                    },
                    report,
                );
            }
        };
        if matches!(target.kind, NodeKind::Module(_)) {
            return self.fail(
                node,
                ControlError::RecursiveModule {
                    node: node.name.clone(),
                    target: target.name,
                },
                report,
            );
        }

        let mut target = target;
        target.enabled = true;
        debug!(module = %node.name, target = %joined, "Resolving module controller");

        trail.push(key);
        let resolved = self.resolve_node(&target, trail, report);
        trail.pop();
        Ok(spliced(node, prune_disabled(&resolved?)))
    }

    fn resolve_include(
        &self,
        node: &PlanNode,
        path: &str,
        trail: &mut Vec<String>,
        report: &mut ResolutionReport,
    ) -> ControlResult<PlanNode> {
        let key = format!("include:{}", path.trim());
        let loaded = if path.trim().is_empty() {
            Err(LoadError::EmptyPath)
        } else if trail.contains(&key) {
            Err(LoadError::Recursive(path.to_string()))
        } else {
            match self.cache {
                Some(cache) => cache.get_or_load(path.trim(), self.loader),
                None => self.loader.load(path.trim()),
            }
        };

        let loaded = match loaded {
            Ok(plan) => plan,
            Err(e) => {
                warn!(include = %node.name, error = %e, "Include contributes nothing");
                report
                    .warnings
                    .push(format!("Include controller '{}': {}", node.name, e));
                return Ok(spliced(node, None));
            }
        };

        debug!(include = %node.name, path, "Resolving include controller");
        trail.push(key);
        let resolved = self.resolve_node(&loaded, trail, report);
        trail.pop();
        Ok(spliced(node, prune_disabled(&resolved?)))
    }

    /// Abort when running, otherwise record the error and contribute nothing
    fn fail(
        &self,
        node: &PlanNode,
        err: ControlError,
        report: &mut ResolutionReport,
    ) -> ControlResult<PlanNode> {
        match self.mode {
            ResolveMode::Running => {
                error!(node = %node.name, error = %err, "Replacement resolution failed");
                Err(err)
            }
            ResolveMode::Validating => {
                report.errors.push(err.to_string());
                Ok(spliced(node, None))
            }
        }
    }
}

/// Simple controller standing in for a replaceable controller
fn spliced(node: &PlanNode, subtree: Option<PlanNode>) -> PlanNode {
    PlanNode {
        name: node.name.clone(),
        enabled: true,
        weight: node.weight.clone(),
        kind: NodeKind::Simple,
        children: subtree.into_iter().collect(),
    }
}

/// Copy of `node` without its disabled descendants; `None` if `node` is disabled
pub fn prune_disabled(node: &PlanNode) -> Option<PlanNode> {
    if !node.enabled {
        return None;
    }
    Some(PlanNode {
        name: node.name.clone(),
        enabled: true,
        weight: node.weight.clone(),
        kind: node.kind.clone(),
        children: node.children.iter().filter_map(prune_disabled).collect(),
    })
}
