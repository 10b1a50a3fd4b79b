//! # 诊断模块
//!
//! 提供对话图静态检查和诊断 API，不依赖 IO 或引擎。
//!
//! ## 设计原则
//!
//! - 纯函数 API，可在无 IO 环境下运行
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - 不修改图；需要修复的数据见 [`crate::validate`]

use std::collections::{HashSet, VecDeque};

use crate::graph::{DialogueGraph, NodeId, NodeKind};
use crate::validate::is_aligned;

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 对话图名称
    pub graph: String,
    /// 节点（如果可定位）
    pub node: Option<NodeId>,
    /// 诊断消息
    pub message: String,
    /// 诊断详情（可选）
    pub detail: Option<String>,
}

impl Diagnostic {
    fn with_level(
        level: DiagnosticLevel,
        graph: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            graph: graph.into(),
            node: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 创建错误诊断
    pub fn error(graph: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Error, graph, message)
    }

    /// 创建警告诊断
    pub fn warn(graph: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Warn, graph, message)
    }

    /// 创建信息诊断
    pub fn info(graph: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Info, graph, message)
    }

    /// 设置节点
    pub fn with_node(mut self, node: &NodeId) -> Self {
        self.node = Some(node.clone());
        self
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.graph)?;
        if let Some(node) = &self.node {
            write!(f, "#{}", node)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {}", detail)?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    /// 诊断条目列表
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    /// 创建空结果
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加诊断
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// 获取错误数量
    pub fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    /// 获取警告数量
    pub fn warn_count(&self) -> usize {
        self.count(DiagnosticLevel::Warn)
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 按级别过滤
    pub fn filter_by_level(&self, min_level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level >= min_level)
            .collect()
    }
}

//=============================================================================
// 对话图分析 API
//=============================================================================

/// 分析对话图，返回诊断结果
///
/// 执行以下检查：
/// - 起始节点未设置或不存在（Error）
/// - 重复的节点 id（Error）
/// - 连接指向不存在的节点（Error）
/// - 出示节点中重复的物品反应（Warn，先注册的生效）
/// - 选项平行数组长度不一致（Warn，开始对话时会被修复）
/// - 条件节点未连接的分支（Warn，求值到该分支时对话结束）
/// - 从起始节点不可达的节点（Info）
pub fn analyze_graph(graph: &DialogueGraph) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    let name = graph.name();

    match graph.start() {
        None => result.push(Diagnostic::error(name, "未设置起始节点")),
        Some(start) if !graph.contains(start) => result.push(
            Diagnostic::error(name, format!("起始节点不存在: {}", start)).with_node(start),
        ),
        Some(_) => {}
    }

    let mut seen = HashSet::new();
    for node in graph.nodes() {
        if !seen.insert(&node.id) {
            result.push(
                Diagnostic::error(name, "重复的节点 id")
                    .with_node(&node.id)
                    .with_detail("只有先注册的节点可被访问"),
            );
        }

        for target in node.connections() {
            if !graph.contains(target) {
                result.push(
                    Diagnostic::error(name, format!("连接指向不存在的节点: {}", target))
                        .with_node(&node.id),
                );
            }
        }

        match &node.kind {
            NodeKind::Presentation(p) => {
                let mut items = HashSet::new();
                for reaction in &p.reactions {
                    if !items.insert(reaction.item_id.as_str()) {
                        result.push(
                            Diagnostic::warn(
                                name,
                                format!("重复的物品反应: {}", reaction.item_id),
                            )
                            .with_node(&node.id)
                            .with_detail("先注册的反应生效"),
                        );
                    }
                }
            }
            NodeKind::Condition(c) => {
                for (label, branch) in [("true", &c.true_branch), ("false", &c.false_branch)] {
                    if branch.is_none() {
                        result.push(
                            Diagnostic::warn(name, format!("条件的 {} 分支未连接", label))
                                .with_node(&node.id)
                                .with_detail(format!("求值为 {} 时对话结束", label)),
                        );
                    }
                }
            }
            NodeKind::Dialogue(_) | NodeKind::Event(_) => {}
        }

        if let Some(choice) = node.choice()
            && !is_aligned(choice)
        {
            result.push(
                Diagnostic::warn(name, "选项数组长度不一致")
                    .with_node(&node.id)
                    .with_detail(format!("以 {} 个选项为准对齐", choice.len())),
            );
        }
    }

    if let Some(start) = graph.start().filter(|s| graph.contains(s)) {
        let reachable = reachable_from(graph, start);
        for node in graph.nodes() {
            if !reachable.contains(&node.id) {
                result.push(Diagnostic::info(name, "节点从起始节点不可达").with_node(&node.id));
            }
        }
    }

    result
}

/// 从指定节点出发可达的所有节点（包含自身）
pub fn reachable_from(graph: &DialogueGraph, start: &NodeId) -> HashSet<NodeId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([start.clone()]);

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }
        if let Some(node) = graph.node(&id) {
            queue.extend(node.connections().into_iter().cloned());
        }
    }

    visited.retain(|id| graph.contains(id));
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        Condition, ConditionNode, DialogueNode, EventNode, Node, OptionEffects, PresentationNode,
    };

    fn sound_graph() -> DialogueGraph {
        let mut graph = DialogueGraph::new("intro")
            .with_node(Node::new("d1", DialogueNode::line(None, "Hello").with_next("d2")))
            .with_node(Node::new(
                "d2",
                DialogueNode::choice(None, "?")
                    .with_option("Yes", Some("e1"), OptionEffects::none())
                    .with_option("No", Some("d3"), OptionEffects::none()),
            ))
            .with_node(Node::new("e1", EventNode::give_item("key").with_next("d3")))
            .with_node(Node::new("d3", DialogueNode::line(None, "Bye").end()));
        graph.set_start("d1");
        graph
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error("intro", "连接指向不存在的节点")
            .with_node(&"d1".into())
            .with_detail("next -> missing");

        let display = format!("{}", diag);
        assert!(display.contains("[ERROR]"));
        assert!(display.contains("intro#d1"));
        assert!(display.contains("next -> missing"));
    }

    #[test]
    fn test_sound_graph_is_clean() {
        let result = analyze_graph(&sound_graph());
        assert!(result.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn test_missing_start_node() {
        let graph = DialogueGraph::new("empty")
            .with_node(Node::new("d1", DialogueNode::line(None, "Hi")));
        let result = analyze_graph(&graph);

        assert_eq!(result.error_count(), 1);
        assert!(result.diagnostics[0].message.contains("起始节点"));
    }

    #[test]
    fn test_dangling_reference_and_unreachable() {
        let mut graph = sound_graph();
        graph.remove_node(&"e1".into());
        graph
            .add_node(Node::new("orphan", DialogueNode::line(None, "...")))
            .unwrap();

        let result = analyze_graph(&graph);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.diagnostics[0].node, Some(NodeId::from("d2")));
        assert!(result.diagnostics[0].message.contains("e1"));

        let infos = result
            .diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Info)
            .collect::<Vec<_>>();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].node, Some(NodeId::from("orphan")));
    }

    #[test]
    fn test_duplicate_ids_and_reactions() {
        let mut graph = DialogueGraph::from_nodes(
            "dup",
            Some("p".into()),
            vec![
                Node::new(
                    "p",
                    PresentationNode::new(None, "Show me.")
                        .with_reaction("badge", "p")
                        .with_reaction("badge", "p"),
                ),
                Node::new("p", DialogueNode::line(None, "shadow")),
            ],
        );
        graph.set_start("p");

        let result = analyze_graph(&graph);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warn_count(), 1);
    }

    #[test]
    fn test_condition_branch_warnings() {
        let graph = DialogueGraph::from_nodes(
            "cond",
            Some("c".into()),
            vec![
                Node::new(
                    "c",
                    ConditionNode::new(Condition::HasItem {
                        item_id: "key".into(),
                    })
                    .on_true("d"),
                ),
                Node::new("d", DialogueNode::line(None, "open")),
            ],
        );

        let result = analyze_graph(&graph);
        assert!(!result.has_errors());
        assert_eq!(result.warn_count(), 1);
        assert!(result.diagnostics[0].message.contains("false"));
    }

    #[test]
    fn test_misaligned_choice_warning() {
        let mut graph = sound_graph();
        graph
            .node_mut(&"d2".into())
            .and_then(|n| n.choice_mut())
            .unwrap()
            .voices
            .clear();

        let result = analyze_graph(&graph);
        assert_eq!(result.warn_count(), 1);
        assert_eq!(
            result.filter_by_level(DiagnosticLevel::Warn)[0].node,
            Some(NodeId::from("d2"))
        );
    }

    #[test]
    fn test_reachable_from_handles_cycles() {
        let graph = DialogueGraph::from_nodes(
            "loop",
            None,
            vec![
                Node::new("a", DialogueNode::line(None, "A").with_next("b")),
                Node::new("b", DialogueNode::line(None, "B").with_next("a")),
                Node::new("c", DialogueNode::line(None, "C").with_next("missing")),
            ],
        );

        let reachable = reachable_from(&graph, &"a".into());
        assert_eq!(reachable.len(), 2);
        assert!(!reachable.contains(&NodeId::from("c")));
    }
}
