//! Compilation of a resolved plan tree into an immutable arena
//!
//! Every element gets a stable [`NodeId`]. The arena is shared read-only by
//! all virtual users; per-thread traversal state lives in
//! [`Traversal`](crate::traversal::Traversal), indexed by the same ids.

use crate::error::{ControlError, ControlResult};
use crate::plan::{
    CriticalSectionConfig, ForeachConfig, IfConfig, InterleaveConfig, LoopConfig, NodeKind,
    PlanNode, SwitchConfig, ThroughputConfig, WeightedConfig, WhileConfig,
};
use std::fmt::{self, Write as _};
use std::sync::Arc;
use volley_core::WorkItem;

/// Stable index of a node inside a [`CompiledPlan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Controller configuration after module/include resolution
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerKind {
    Simple,
    Loop(LoopConfig),
    Interleave(InterleaveConfig),
    Switch(SwitchConfig),
    WeightedDistribution(WeightedConfig),
    OnceOnly,
    Throughput(ThroughputConfig),
    CriticalSection(CriticalSectionConfig),
    Foreach(ForeachConfig),
    RandomOrder,
    If(IfConfig),
    While(WhileConfig),
}

#[derive(Debug, Clone)]
pub enum NodeBody {
    Sampler(Arc<WorkItem>),
    Controller(ControllerKind),
}

#[derive(Debug, Clone)]
pub struct CompiledNode {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Raw weight text, read by a weighted-distribution parent
    pub weight: Option<String>,
    pub body: NodeBody,
    /// Nodes notified when this controller starts a pass
    pub listeners: Vec<NodeId>,
}

impl CompiledNode {
    pub fn is_sampler(&self) -> bool {
        matches!(self.body, NodeBody::Sampler(_))
    }

    pub fn controller(&self) -> Option<&ControllerKind> {
        match &self.body {
            NodeBody::Controller(kind) => Some(kind),
            NodeBody::Sampler(_) => None,
        }
    }
}

/// Immutable arena of compiled nodes; the root is always `NodeId(0)`
#[derive(Debug, Clone)]
pub struct CompiledPlan {
    nodes: Vec<CompiledNode>,
}

impl CompiledPlan {
    /// Compile a resolved tree. Disabled elements are skipped.
    pub fn compile(root: &PlanNode) -> ControlResult<Self> {
        if !root.enabled {
            return Err(ControlError::InvalidPlan(format!(
                "root element '{}' is disabled",
                root.name
            )));
        }
        if root.is_sampler() {
            return Err(ControlError::InvalidPlan(format!(
                "root element '{}' must be a controller",
                root.name
            )));
        }

        let mut plan = Self { nodes: Vec::new() };
        plan.add(root, None)?;
        plan.register_listeners();
        Ok(plan)
    }

    fn add(&mut self, node: &PlanNode, parent: Option<NodeId>) -> ControlResult<NodeId> {
        let id = NodeId(self.nodes.len() as u32);
        let body = match &node.kind {
            NodeKind::Sampler(cfg) => {
                if !node.children.is_empty() {
                    return Err(ControlError::InvalidPlan(format!(
                        "sampler '{}' cannot have children",
                        node.name
                    )));
                }
                let mut item = WorkItem::new(node.name.clone());
                item.properties = cfg.properties.clone();
                NodeBody::Sampler(Arc::new(item))
            }
            NodeKind::Simple => NodeBody::Controller(ControllerKind::Simple),
            NodeKind::Loop(cfg) => NodeBody::Controller(ControllerKind::Loop(cfg.clone())),
            NodeKind::Interleave(cfg) => {
                NodeBody::Controller(ControllerKind::Interleave(cfg.clone()))
            }
            NodeKind::Switch(cfg) => NodeBody::Controller(ControllerKind::Switch(cfg.clone())),
            NodeKind::WeightedDistribution(cfg) => {
                NodeBody::Controller(ControllerKind::WeightedDistribution(cfg.clone()))
            }
            NodeKind::OnceOnly => NodeBody::Controller(ControllerKind::OnceOnly),
            NodeKind::Throughput(cfg) => {
                NodeBody::Controller(ControllerKind::Throughput(cfg.clone()))
            }
            NodeKind::CriticalSection(cfg) => {
                NodeBody::Controller(ControllerKind::CriticalSection(cfg.clone()))
            }
            NodeKind::Foreach(cfg) => NodeBody::Controller(ControllerKind::Foreach(cfg.clone())),
            NodeKind::RandomOrder => NodeBody::Controller(ControllerKind::RandomOrder),
            NodeKind::If(cfg) => NodeBody::Controller(ControllerKind::If(cfg.clone())),
            NodeKind::While(cfg) => NodeBody::Controller(ControllerKind::While(cfg.clone())),
            NodeKind::Module(_) | NodeKind::Include(_) => {
                return Err(ControlError::InvalidPlan(format!(
                    "{} controller '{}' was not resolved before compilation",
                    node.kind.label(),
                    node.name
                )));
            }
        };

        self.nodes.push(CompiledNode {
            id,
            name: node.name.clone(),
            parent,
            children: Vec::new(),
            weight: node.weight.clone(),
            body,
            listeners: Vec::new(),
        });

        for child in node.children.iter().filter(|c| c.enabled) {
            let child_id = self.add(child, Some(id))?;
            self.nodes[id.index()].children.push(child_id);
        }
        Ok(id)
    }

    /// Throughput controllers listen for pass starts of their enclosing controller
    fn register_listeners(&mut self) {
        let pairs: Vec<(NodeId, NodeId)> = self
            .nodes
            .iter()
            .filter(|n| matches!(n.controller(), Some(ControllerKind::Throughput(_))))
            .filter_map(|n| n.parent.map(|p| (p, n.id)))
            .collect();
        for (parent, listener) in pairs {
            self.nodes[parent.index()].listeners.push(listener);
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &CompiledNode {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&CompiledNode> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledNode> {
        self.nodes.iter()
    }

    /// First node (in depth-first order) with the given name
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.name == name).map(|n| n.id)
    }

    /// Indented one-line-per-node dump of the tree
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.render_node(self.root(), 0, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        let label = match &node.body {
            NodeBody::Sampler(_) => "sampler",
            NodeBody::Controller(kind) => kind.label(),
        };
        let _ = write!(out, "{}{} [{}]", "  ".repeat(depth), node.name, label);
        if let Some(weight) = &node.weight {
            let _ = write!(out, " weight={}", weight);
        }
        out.push('\n');
        for child in &node.children {
            self.render_node(*child, depth + 1, out);
        }
    }
}

impl ControllerKind {
    pub fn label(&self) -> &'static str {
        match self {
            ControllerKind::Simple => "simple",
            ControllerKind::Loop(_) => "loop",
            ControllerKind::Interleave(_) => "interleave",
            ControllerKind::Switch(_) => "switch",
            ControllerKind::WeightedDistribution(_) => "weighted_distribution",
            ControllerKind::OnceOnly => "once_only",
            ControllerKind::Throughput(_) => "throughput",
            ControllerKind::CriticalSection(_) => "critical_section",
            ControllerKind::Foreach(_) => "foreach",
            ControllerKind::RandomOrder => "random_order",
            ControllerKind::If(_) => "if",
            ControllerKind::While(_) => "while",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ThroughputStyle;

    #[test]
    fn test_compile_assigns_depth_first_ids() {
        let plan = PlanNode::simple("root").with_children([
            PlanNode::sampler("a"),
            PlanNode::loop_controller("loop", 2, true).with_child(PlanNode::sampler("b")),
            PlanNode::sampler("c"),
        ]);
        let compiled = CompiledPlan::compile(&plan).unwrap();

        assert_eq!(compiled.len(), 5);
        assert_eq!(compiled.find("loop"), Some(NodeId(2)));
        assert_eq!(compiled.node(NodeId(3)).parent, Some(NodeId(2)));
        assert_eq!(
            compiled.node(compiled.root()).children,
            vec![NodeId(1), NodeId(2), NodeId(4)]
        );
        assert!(compiled.node(NodeId(1)).is_sampler());
    }

    #[test]
    fn test_disabled_children_are_skipped() {
        let plan = PlanNode::simple("root")
            .with_children([PlanNode::sampler("a").disabled(), PlanNode::sampler("b")]);
        let compiled = CompiledPlan::compile(&plan).unwrap();
        assert_eq!(compiled.len(), 2);
        assert!(compiled.find("a").is_none());
    }

    #[test]
    fn test_throughput_registers_on_parent() {
        let plan = PlanNode::simple("root").with_child(
            PlanNode::loop_controller("outer", 3, true).with_child(
                PlanNode::throughput("gate", ThroughputStyle::ByNumber, 1.0, true)
                    .with_child(PlanNode::sampler("x")),
            ),
        );
        let compiled = CompiledPlan::compile(&plan).unwrap();
        let outer = compiled.find("outer").unwrap();
        let gate = compiled.find("gate").unwrap();
        assert_eq!(compiled.node(outer).listeners, vec![gate]);
        assert!(compiled.node(compiled.root()).listeners.is_empty());
    }

    #[test]
    fn test_invalid_roots_and_unresolved_modules() {
        assert!(matches!(
            CompiledPlan::compile(&PlanNode::sampler("s")),
            Err(ControlError::InvalidPlan(_))
        ));
        assert!(matches!(
            CompiledPlan::compile(&PlanNode::simple("r").disabled()),
            Err(ControlError::InvalidPlan(_))
        ));
        let unresolved = PlanNode::simple("r").with_child(PlanNode::include("inc", "x.yaml"));
        assert!(matches!(
            CompiledPlan::compile(&unresolved),
            Err(ControlError::InvalidPlan(_))
        ));
    }

    #[test]
    fn test_render_tree() {
        let plan = PlanNode::weighted("mix")
            .with_child(PlanNode::sampler("a").with_weight("3"))
            .with_child(PlanNode::sampler("b"));
        let rendered = CompiledPlan::compile(&plan).unwrap().render_tree();
        assert_eq!(
            rendered,
            "mix [weighted_distribution]\n  a [sampler] weight=3\n  b [sampler]\n"
        );
    }
}
