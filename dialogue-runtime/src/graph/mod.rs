//! # Graph 模块
//!
//! 对话图：节点集合、起始节点与运行时游标。
//!
//! ## 模块结构
//!
//! - [`node`]：节点及四种变体
//! - [`effects`]：节点参数类型
//!
//! ## 设计说明
//!
//! - 图是所有节点的所有者，节点不跨图共享
//! - 游标（当前节点、是否活跃）只在运行时存在，不参与序列化
//! - 游标只能由执行引擎修改

pub mod effects;
pub mod node;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

pub use effects::*;
pub use node::*;

/// 节点标识符
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 对话图的序列化形式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    /// 图名称（参与一次性完成记录的键）
    pub name: String,
    /// 起始节点
    #[serde(default)]
    pub start: Option<NodeId>,
    /// 节点列表
    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// 遍历游标
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Cursor {
    current: Option<NodeId>,
    active: bool,
}

/// 对话图
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "GraphDocument", into = "GraphDocument")]
pub struct DialogueGraph {
    name: String,
    start: Option<NodeId>,
    nodes: Vec<Node>,
    /// id 到节点下标的映射；重复 id 只索引首次出现的节点
    index: HashMap<NodeId, usize>,
    cursor: Cursor,
}

impl From<GraphDocument> for DialogueGraph {
    fn from(doc: GraphDocument) -> Self {
        Self::from_nodes(doc.name, doc.start, doc.nodes)
    }
}

impl From<DialogueGraph> for GraphDocument {
    fn from(graph: DialogueGraph) -> Self {
        Self {
            name: graph.name,
            start: graph.start,
            nodes: graph.nodes,
        }
    }
}

impl DialogueGraph {
    /// 创建空图
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_nodes(name, None, Vec::new())
    }

    /// 由节点列表创建图（不检查重复 id，见 [`crate::diagnostic::analyze_graph`]）
    pub fn from_nodes(name: impl Into<String>, start: Option<NodeId>, nodes: Vec<Node>) -> Self {
        let mut graph = Self {
            name: name.into(),
            start,
            nodes,
            index: HashMap::new(),
            cursor: Cursor::default(),
        };
        graph.build_index();
        graph
    }

    /// 从 JSON 文档加载
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json).map_err(|e| GraphError::InvalidDocument(e.to_string()))
    }

    /// 导出为 JSON 文档
    pub fn to_json(&self) -> Result<String, GraphError> {
        serde_json::to_string_pretty(self).map_err(|e| GraphError::InvalidDocument(e.to_string()))
    }

    fn build_index(&mut self) {
        self.index.clear();
        for (i, node) in self.nodes.iter().enumerate() {
            self.index.entry(node.id.clone()).or_insert(i);
        }
    }

    /// 图名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 起始节点
    pub fn start(&self) -> Option<&NodeId> {
        self.start.as_ref()
    }

    /// 设置起始节点
    pub fn set_start(&mut self, id: impl Into<NodeId>) {
        self.start = Some(id.into());
    }

    /// 添加节点
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.index.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode {
                graph: self.name.clone(),
                node: node.id,
            });
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// 链式添加节点，重复 id 时保留先注册的节点
    pub fn with_node(mut self, node: Node) -> Self {
        if let Err(e) = self.add_node(node) {
            tracing::warn!(error = %e, "忽略重复节点");
        }
        self
    }

    /// 移除节点
    ///
    /// 指向它的连接不会被清理，遍历到悬空引用时引擎会中止对话。
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        let pos = *self.index.get(id)?;
        let node = self.nodes.remove(pos);
        self.build_index();
        Some(node)
    }

    /// 查找节点
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// 可变查找节点
    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        let i = *self.index.get(id)?;
        self.nodes.get_mut(i)
    }

    /// 节点是否属于本图
    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// 所有节点（按注册顺序）
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    /// 节点数量
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 当前节点
    pub fn current_node(&self) -> Option<&NodeId> {
        self.cursor.current.as_ref()
    }

    /// 是否有正在进行的遍历
    pub fn is_active(&self) -> bool {
        self.cursor.active
    }

    pub(crate) fn begin(&mut self, start: NodeId) {
        self.cursor = Cursor {
            current: Some(start),
            active: true,
        };
    }

    pub(crate) fn move_to(&mut self, id: NodeId) {
        self.cursor.current = Some(id);
    }

    pub(crate) fn reset_cursor(&mut self) {
        self.cursor = Cursor::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DialogueGraph {
        DialogueGraph::new("village")
            .with_node(Node::new("d1", DialogueNode::line(Some("Elder"), "Welcome.")).with_name("greet"))
            .with_node(Node::new(
                "q1",
                DialogueNode::choice(Some("Elder"), "Will you help?")
                    .with_option("Yes", Some("e1"), OptionEffects::none())
                    .with_option("No", None, OptionEffects::none()),
            ))
            .with_node(Node::new("e1", EventNode::give_item("map").with_next("d1")))
    }

    #[test]
    fn test_add_and_lookup() {
        let graph = sample();
        assert_eq!(graph.len(), 3);
        assert!(graph.contains(&"q1".into()));
        assert_eq!(graph.node(&"d1".into()).unwrap().name, "greet");
        assert!(graph.node(&"zzz".into()).is_none());
        assert!(!graph.is_active());
        assert!(graph.current_node().is_none());
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut graph = sample();
        let result = graph.add_node(Node::new("d1", DialogueNode::line(None, "dup")));
        assert!(matches!(result, Err(GraphError::DuplicateNode { .. })));

        // 链式添加保留原节点
        let graph = graph.with_node(Node::new("d1", DialogueNode::line(None, "dup")));
        assert_eq!(
            graph.node(&"d1".into()).and_then(|n| n.as_dialogue()).map(|d| d.text.as_str()),
            Some("Welcome.")
        );
    }

    #[test]
    fn test_remove_node_reindexes() {
        let mut graph = sample();
        let removed = graph.remove_node(&"d1".into()).unwrap();
        assert_eq!(removed.id, NodeId::from("d1"));
        assert!(!graph.contains(&"d1".into()));
        assert_eq!(graph.node(&"e1".into()).unwrap().id, NodeId::from("e1"));
    }

    #[test]
    fn test_cursor_lifecycle() {
        let mut graph = sample();
        graph.begin("d1".into());
        assert!(graph.is_active());
        assert_eq!(graph.current_node(), Some(&NodeId::from("d1")));

        graph.move_to("q1".into());
        assert_eq!(graph.current_node(), Some(&NodeId::from("q1")));

        graph.reset_cursor();
        assert!(!graph.is_active());
        assert!(graph.current_node().is_none());
    }

    #[test]
    fn test_document_roundtrip_skips_cursor() {
        let mut graph = sample();
        graph.set_start("d1");
        graph.begin("q1".into());

        let json = graph.to_json().unwrap();
        assert!(!json.contains("cursor"));

        let loaded = DialogueGraph::from_json(&json).unwrap();
        assert_eq!(loaded.name(), "village");
        assert_eq!(loaded.start(), Some(&NodeId::from("d1")));
        assert_eq!(loaded.nodes(), graph.nodes());
        assert!(!loaded.is_active());
    }

    #[test]
    fn test_invalid_document() {
        let result = DialogueGraph::from_json("{ \"nodes\": 3 }");
        assert!(matches!(result, Err(GraphError::InvalidDocument(_))));
    }
}
