//! Test plan tree as produced by a plan builder or loaded from disk
//!
//! A [`PlanNode`] tree is plain data: it is resolved (module and include
//! indirection), pruned of disabled elements and then compiled into an
//! immutable [`CompiledPlan`](crate::compile::CompiledPlan) before any
//! traversal happens.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One element of a test plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub name: String,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,

    /// Weight used by a weighted-distribution parent; may hold `${VAR}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,

    #[serde(flatten)]
    pub kind: NodeKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PlanNode>,
}

/// Element type and its configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Sampler(SamplerConfig),
    Simple,
    Loop(LoopConfig),
    Interleave(InterleaveConfig),
    Switch(SwitchConfig),
    WeightedDistribution(WeightedConfig),
    OnceOnly,
    Throughput(ThroughputConfig),
    CriticalSection(CriticalSectionConfig),
    Module(ModuleConfig),
    Include(IncludeConfig),
    Foreach(ForeachConfig),
    RandomOrder,
    If(IfConfig),
    While(WhileConfig),
}

impl NodeKind {
    /// Short lowercase label used in logs and tree dumps
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Sampler(_) => "sampler",
            NodeKind::Simple => "simple",
            NodeKind::Loop(_) => "loop",
            NodeKind::Interleave(_) => "interleave",
            NodeKind::Switch(_) => "switch",
            NodeKind::WeightedDistribution(_) => "weighted_distribution",
            NodeKind::OnceOnly => "once_only",
            NodeKind::Throughput(_) => "throughput",
            NodeKind::CriticalSection(_) => "critical_section",
            NodeKind::Module(_) => "module",
            NodeKind::Include(_) => "include",
            NodeKind::Foreach(_) => "foreach",
            NodeKind::RandomOrder => "random_order",
            NodeKind::If(_) => "if",
            NodeKind::While(_) => "while",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

/// Repeat the children `loops` times; a negative count loops forever.
///
/// With `continue_forever` the controller rearms after reaching the bound
/// (it ends the pass but is never done). Without it, it becomes done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    pub loops: i64,
    #[serde(default = "default_true")]
    pub continue_forever: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterleaveStyle {
    /// A sub-controller contributes one item per visit, then the slot advances
    #[default]
    IgnoreSubControllers,
    /// A sub-controller keeps the slot until it is exhausted
    UseSubControllers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterleaveConfig {
    #[serde(default)]
    pub style: InterleaveStyle,
    /// Start each thread at `thread_num % children` instead of 0
    #[serde(default)]
    pub across_threads: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Child index, may hold `${VAR}`
    #[serde(default)]
    pub selection: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedConfig {
    /// Generator seed, 0 means unseeded
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThroughputStyle {
    /// Run the subtree on at most `max_throughput` iterations
    #[default]
    ByNumber,
    /// Run the subtree on `max_throughput` percent of iterations
    ByPercent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputConfig {
    #[serde(default)]
    pub style: ThroughputStyle,
    pub max_throughput: f64,
    /// Count per virtual user instead of across all of them
    #[serde(default = "default_true")]
    pub per_thread: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalSectionConfig {
    #[serde(default)]
    pub lock_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Names from the plan root down to the target element
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncludeConfig {
    #[serde(default)]
    pub path: String,
}

/// Iterate over variables `{input_var}{separator}{n}` publishing each as `return_var`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeachConfig {
    pub input_var: String,
    pub return_var: String,
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Exclusive start: the first variable read is `start_index + 1`
    #[serde(default)]
    pub start_index: i64,
    /// Inclusive end index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IfConfig {
    pub condition: String,
    /// Re-evaluate before every child instead of once per pass
    #[serde(default)]
    pub evaluate_all: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhileConfig {
    /// Empty: loop until a sample fails. `LAST`: also check before starting.
    #[serde(default)]
    pub condition: String,
}

impl PlanNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            weight: None,
            kind,
            children: Vec::new(),
        }
    }

    pub fn sampler(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Sampler(SamplerConfig::default()))
    }

    pub fn simple(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Simple)
    }

    pub fn loop_controller(name: impl Into<String>, loops: i64, continue_forever: bool) -> Self {
        Self::new(
            name,
            NodeKind::Loop(LoopConfig {
                loops,
                continue_forever,
            }),
        )
    }

    pub fn interleave(name: impl Into<String>, style: InterleaveStyle) -> Self {
        Self::new(
            name,
            NodeKind::Interleave(InterleaveConfig {
                style,
                across_threads: false,
            }),
        )
    }

    pub fn switch(name: impl Into<String>, selection: impl Into<String>) -> Self {
        Self::new(
            name,
            NodeKind::Switch(SwitchConfig {
                selection: selection.into(),
            }),
        )
    }

    pub fn weighted(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::WeightedDistribution(WeightedConfig::default()))
    }

    pub fn once_only(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::OnceOnly)
    }

    pub fn throughput(
        name: impl Into<String>,
        style: ThroughputStyle,
        max_throughput: f64,
        per_thread: bool,
    ) -> Self {
        Self::new(
            name,
            NodeKind::Throughput(ThroughputConfig {
                style,
                max_throughput,
                per_thread,
            }),
        )
    }

    pub fn critical_section(name: impl Into<String>, lock_name: impl Into<String>) -> Self {
        Self::new(
            name,
            NodeKind::CriticalSection(CriticalSectionConfig {
                lock_name: lock_name.into(),
            }),
        )
    }

    pub fn module<I, S>(name: impl Into<String>, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            NodeKind::Module(ModuleConfig {
                path: path.into_iter().map(Into::into).collect(),
            }),
        )
    }

    pub fn include(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Include(IncludeConfig { path: path.into() }))
    }

    pub fn foreach(
        name: impl Into<String>,
        input_var: impl Into<String>,
        return_var: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            NodeKind::Foreach(ForeachConfig {
                input_var: input_var.into(),
                return_var: return_var.into(),
                separator: default_separator(),
                start_index: 0,
                end_index: None,
            }),
        )
    }

    pub fn random_order(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::RandomOrder)
    }

    pub fn if_controller(name: impl Into<String>, condition: impl Into<String>) -> Self {
        Self::new(
            name,
            NodeKind::If(IfConfig {
                condition: condition.into(),
                evaluate_all: false,
            }),
        )
    }

    pub fn while_controller(name: impl Into<String>, condition: impl Into<String>) -> Self {
        Self::new(
            name,
            NodeKind::While(WhileConfig {
                condition: condition.into(),
            }),
        )
    }

    /// Append a child (builder style)
    pub fn with_child(mut self, child: PlanNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append children (builder style)
    pub fn with_children(mut self, children: impl IntoIterator<Item = PlanNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Set the weight read by a weighted-distribution parent
    pub fn with_weight(mut self, weight: impl Into<String>) -> Self {
        self.weight = Some(weight.into());
        self
    }

    /// Mark the element disabled (builder style)
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self.kind, NodeKind::Sampler(_))
    }

    /// Find a descendant by a path of names starting with this node's own name
    pub fn find_path(&self, path: &[String]) -> Option<&PlanNode> {
        let (first, rest) = path.split_first()?;
        if *first != self.name {
            return None;
        }
        let mut node = self;
        for name in rest {
            node = node.children.iter().find(|c| c.name == *name)?;
        }
        Some(node)
    }

    /// Number of elements in this subtree, including this one
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(PlanNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn default_separator() -> String {
    "_".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> PlanNode {
        PlanNode::simple("plan").with_children([
            PlanNode::sampler("home"),
            PlanNode::loop_controller("browse", 3, true)
                .with_child(PlanNode::sampler("list"))
                .with_child(PlanNode::simple("details").with_child(PlanNode::sampler("item"))),
        ])
    }

    #[test]
    fn test_find_path() {
        let plan = sample_plan();
        let path: Vec<String> = ["plan", "browse", "details"].iter().map(|s| s.to_string()).collect();
        assert_eq!(plan.find_path(&path).map(|n| n.name.as_str()), Some("details"));

        let wrong_root = vec!["other".to_string()];
        assert!(plan.find_path(&wrong_root).is_none());
        assert!(plan.find_path(&[]).is_none());
    }

    #[test]
    fn test_len_counts_subtree() {
        assert_eq!(sample_plan().len(), 6);
    }

    #[test]
    fn test_yaml_plan_parses_kinds() {
        let yaml = r#"
name: root
type: simple
children:
  - name: login
    type: sampler
    properties:
      url: /login
  - name: repeat
    type: loop
    loops: 2
    continue_forever: false
    children:
      - name: poll
        type: sampler
  - name: mix
    type: interleave
    style: use_sub_controllers
  - name: gated
    type: throughput
    style: by_percent
    max_throughput: 33.33
    per_thread: false
  - name: rarely
    type: sampler
    enabled: false
    weight: "${W}"
"#;
        let plan: PlanNode = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(plan.kind, NodeKind::Simple);
        assert_eq!(plan.children.len(), 5);

        let login = &plan.children[0];
        match &login.kind {
            NodeKind::Sampler(cfg) => assert_eq!(cfg.properties.get("url").unwrap(), "/login"),
            other => panic!("unexpected kind {:?}", other),
        }

        assert_eq!(
            plan.children[1].kind,
            NodeKind::Loop(LoopConfig {
                loops: 2,
                continue_forever: false
            })
        );
        assert_eq!(
            plan.children[2].kind,
            NodeKind::Interleave(InterleaveConfig {
                style: InterleaveStyle::UseSubControllers,
                across_threads: false
            })
        );
        match &plan.children[3].kind {
            NodeKind::Throughput(cfg) => {
                assert_eq!(cfg.style, ThroughputStyle::ByPercent);
                assert!((cfg.max_throughput - 33.33).abs() < f64::EPSILON);
                assert!(!cfg.per_thread);
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(!plan.children[4].enabled);
        assert_eq!(plan.children[4].weight.as_deref(), Some("${W}"));
    }

    #[test]
    fn test_loop_defaults_to_continue_forever() {
        let node: PlanNode = serde_json::from_str(r#"{"name":"l","type":"loop","loops":4}"#).unwrap();
        assert_eq!(
            node.kind,
            NodeKind::Loop(LoopConfig {
                loops: 4,
                continue_forever: true
            })
        );
    }

    #[test]
    fn test_json_round_trip_preserves_tree() {
        let plan = sample_plan().with_child(PlanNode::sampler("bye").with_weight("3").disabled());
        let json = serde_json::to_string(&plan).unwrap();
        let parsed: PlanNode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, plan);
    }
}
