//! # Node 模块
//!
//! 对话图的节点定义。
//!
//! ## 设计说明
//!
//! 节点是一个带标签的联合体：[`Node`] 保存公共字段（id、名称），
//! [`NodeKind`] 保存四种变体的负载。
//!
//! 每个变体都带有"已解析的选择状态"（选中的选项、条件结果、出示的物品），
//! 这些字段只在运行时存在，不参与序列化。[`Node::next_node`] 是这些状态的纯函数。

use serde::{Deserialize, Serialize};

use super::effects::{
    ActorRef, AnimType, CompareOp, ItemId, OptionEffects, QuestAction, QuestStatus, ShakeLevel,
    SoundSource,
};
use super::{DialogueGraph, NodeId};

/// 节点变体标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeVariant {
    Dialogue,
    Condition,
    Event,
    Presentation,
}

impl std::fmt::Display for NodeVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dialogue => write!(f, "对话"),
            Self::Condition => write!(f, "条件"),
            Self::Event => write!(f, "事件"),
            Self::Presentation => write!(f, "出示"),
        }
    }
}

/// 对话图节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// 图内唯一的稳定标识符
    pub id: NodeId,
    /// 节点名称（参与一次性完成记录的键）
    #[serde(default)]
    pub name: String,
    /// 变体负载
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// 节点变体负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Dialogue(DialogueNode),
    Condition(ConditionNode),
    Event(EventNode),
    Presentation(PresentationNode),
}

impl From<DialogueNode> for NodeKind {
    fn from(node: DialogueNode) -> Self {
        Self::Dialogue(node)
    }
}

impl From<ConditionNode> for NodeKind {
    fn from(node: ConditionNode) -> Self {
        Self::Condition(node)
    }
}

impl From<EventNode> for NodeKind {
    fn from(node: EventNode) -> Self {
        Self::Event(node)
    }
}

impl From<PresentationNode> for NodeKind {
    fn from(node: PresentationNode) -> Self {
        Self::Presentation(node)
    }
}

impl Node {
    /// 创建节点
    pub fn new(id: impl Into<NodeId>, kind: impl Into<NodeKind>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind: kind.into(),
        }
    }

    /// 设置节点名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 变体标签
    pub fn variant(&self) -> NodeVariant {
        match &self.kind {
            NodeKind::Dialogue(_) => NodeVariant::Dialogue,
            NodeKind::Condition(_) => NodeVariant::Condition,
            NodeKind::Event(_) => NodeVariant::Event,
            NodeKind::Presentation(_) => NodeVariant::Presentation,
        }
    }

    /// 显示名称（仅用于展示）
    ///
    /// 有名称时返回名称，否则由变体内容派生。
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        match &self.kind {
            NodeKind::Dialogue(d) => format!(
                "{}: {}",
                d.speaker.as_deref().unwrap_or("旁白"),
                preview(&d.text)
            ),
            NodeKind::Presentation(p) => format!("出示: {}", preview(&p.text)),
            NodeKind::Condition(c) => format!("条件: {}", c.condition),
            NodeKind::Event(e) => format!("事件: {}", e.event),
        }
    }

    /// 是否为静默节点（条件/事件），处理后自动推进
    pub fn is_silent(&self) -> bool {
        matches!(self.kind, NodeKind::Condition(_) | NodeKind::Event(_))
    }

    /// 是否为选项模式的对话节点
    pub fn is_choice(&self) -> bool {
        matches!(
            &self.kind,
            NodeKind::Dialogue(DialogueNode {
                mode: DialogueMode::Choice(_),
                ..
            })
        )
    }

    /// 是否为一次性节点
    pub fn is_one_time(&self) -> bool {
        match &self.kind {
            NodeKind::Dialogue(d) => d.one_time,
            NodeKind::Presentation(p) => p.one_time,
            NodeKind::Condition(_) | NodeKind::Event(_) => false,
        }
    }

    /// 计算后继节点
    ///
    /// 只依赖节点已解析的选择状态，`None` 表示没有后继（对话结束）。
    /// 出示节点在尚未收到物品时返回自身，表示"仍在等待"。
    pub fn next_node(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Dialogue(d) => match &d.mode {
                DialogueMode::Linear { next } => next.clone(),
                DialogueMode::Choice(choice) => choice.selected_target(),
            },
            NodeKind::Condition(c) => c.resolved_branch(),
            NodeKind::Event(e) => {
                if e.end_event {
                    None
                } else {
                    e.next.clone()
                }
            }
            NodeKind::Presentation(p) => match &p.offer {
                ItemOffer::Pending => Some(self.id.clone()),
                ItemOffer::Declined => p.default_output.clone(),
                ItemOffer::Presented(item) => p.reaction_target(item),
            },
        }
    }

    /// 是否为结束节点
    ///
    /// 显式标记，或者（仅对话/出示节点）唯一的前进路径指向不存在的连接。
    /// 静默节点不适用派生规则。
    pub fn is_end_node(&self, graph: &DialogueGraph) -> bool {
        let connected = |target: &Option<NodeId>| target.as_ref().is_some_and(|id| graph.contains(id));
        match &self.kind {
            NodeKind::Dialogue(d) => {
                d.end_node
                    || match &d.mode {
                        DialogueMode::Linear { next } => !connected(next),
                        DialogueMode::Choice(choice) => {
                            let count = choice.options.len();
                            !choice.targets.iter().take(count).any(connected)
                        }
                    }
            }
            NodeKind::Presentation(p) => {
                p.end_node
                    || (!connected(&p.default_output)
                        && !p.reactions.iter().any(|r| connected(&r.target)))
            }
            NodeKind::Event(e) => e.end_event,
            NodeKind::Condition(_) => false,
        }
    }

    /// 所有出边（不含未连接的端口）
    pub fn connections(&self) -> Vec<&NodeId> {
        match &self.kind {
            NodeKind::Dialogue(d) => match &d.mode {
                DialogueMode::Linear { next } => next.iter().collect(),
                DialogueMode::Choice(choice) => choice.targets.iter().flatten().collect(),
            },
            NodeKind::Condition(c) => c.true_branch.iter().chain(c.false_branch.iter()).collect(),
            NodeKind::Event(e) => e.next.iter().collect(),
            NodeKind::Presentation(p) => p
                .reactions
                .iter()
                .filter_map(|r| r.target.as_ref())
                .chain(p.default_output.iter())
                .collect(),
        }
    }

    /// 作为对话节点访问
    pub fn as_dialogue(&self) -> Option<&DialogueNode> {
        match &self.kind {
            NodeKind::Dialogue(d) => Some(d),
            _ => None,
        }
    }

    /// 作为出示节点访问
    pub fn as_presentation(&self) -> Option<&PresentationNode> {
        match &self.kind {
            NodeKind::Presentation(p) => Some(p),
            _ => None,
        }
    }

    /// 作为选项数据可变访问
    pub fn choice_mut(&mut self) -> Option<&mut ChoiceData> {
        match &mut self.kind {
            NodeKind::Dialogue(DialogueNode {
                mode: DialogueMode::Choice(choice),
                ..
            }) => Some(choice),
            _ => None,
        }
    }

    /// 作为选项数据访问
    pub fn choice(&self) -> Option<&ChoiceData> {
        match &self.kind {
            NodeKind::Dialogue(DialogueNode {
                mode: DialogueMode::Choice(choice),
                ..
            }) => Some(choice),
            _ => None,
        }
    }
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 16;
    if text.chars().count() <= MAX_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_CHARS).collect();
    format!("{}…", head)
}

//=============================================================================
// 对话节点
//=============================================================================

/// 对话节点
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DialogueNode {
    /// 说话者（None 表示旁白）
    #[serde(default)]
    pub speaker: Option<ActorRef>,
    /// 对话文本
    #[serde(default)]
    pub text: String,
    /// 推进模式
    #[serde(default)]
    pub mode: DialogueMode,
    /// 首次完整访问后永久标记完成
    #[serde(default)]
    pub one_time: bool,
    /// 显式结束标记
    #[serde(default)]
    pub end_node: bool,
}

impl DialogueNode {
    /// 创建线性对话
    pub fn line(speaker: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.map(str::to_string),
            text: text.into(),
            ..Self::default()
        }
    }

    /// 创建选项对话
    pub fn choice(speaker: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.map(str::to_string),
            text: text.into(),
            mode: DialogueMode::Choice(ChoiceData::default()),
            ..Self::default()
        }
    }

    /// 设置线性后继
    pub fn with_next(mut self, next: impl Into<NodeId>) -> Self {
        self.mode = DialogueMode::Linear {
            next: Some(next.into()),
        };
        self
    }

    /// 追加选项（仅选项模式有效，线性模式会先切换为选项模式）
    pub fn with_option(
        mut self,
        label: impl Into<String>,
        target: Option<&str>,
        effects: OptionEffects,
    ) -> Self {
        if !matches!(self.mode, DialogueMode::Choice(_)) {
            self.mode = DialogueMode::Choice(ChoiceData::default());
        }
        if let DialogueMode::Choice(choice) = &mut self.mode {
            choice.push_option(label, target.map(NodeId::from), effects);
        }
        self
    }

    /// 标记为一次性节点
    pub fn one_time(mut self) -> Self {
        self.one_time = true;
        self
    }

    /// 标记为结束节点
    pub fn end(mut self) -> Self {
        self.end_node = true;
        self
    }
}

/// 对话推进模式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogueMode {
    /// 单一后继，等待"继续"
    Linear {
        #[serde(default)]
        next: Option<NodeId>,
    },
    /// 等待玩家选择选项
    Choice(ChoiceData),
}

impl Default for DialogueMode {
    fn default() -> Self {
        Self::Linear { next: None }
    }
}

/// 选项数据
///
/// 以平行数组保存，`options` 的长度是权威长度；
/// 其余数组由 [`crate::validate::repair_choice`] 对齐。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChoiceData {
    /// 选项文本
    #[serde(default)]
    pub options: Vec<String>,
    /// 选项目标
    #[serde(default)]
    pub targets: Vec<Option<NodeId>>,
    /// 时间轴 id（空串表示无）
    #[serde(default)]
    pub timelines: Vec<String>,
    #[serde(default)]
    pub wait_for_timeline: Vec<bool>,
    #[serde(default)]
    pub anim_types: Vec<AnimType>,
    #[serde(default)]
    pub anim_names: Vec<String>,
    #[serde(default)]
    pub shake_enabled: Vec<bool>,
    #[serde(default)]
    pub shake_levels: Vec<ShakeLevel>,
    #[serde(default)]
    pub voices: Vec<Option<String>>,

    #[serde(skip)]
    selected: Option<usize>,
    #[serde(skip)]
    awaiting_timeline: Option<String>,
}

/// 单个选项的完整视图
#[derive(Debug, Clone, PartialEq)]
pub struct OptionEntry {
    pub label: String,
    pub target: Option<NodeId>,
    pub effects: OptionEffects,
}

impl ChoiceData {
    /// 追加一个选项，所有平行数组同步增长
    pub fn push_option(
        &mut self,
        label: impl Into<String>,
        target: Option<NodeId>,
        effects: OptionEffects,
    ) {
        self.options.push(label.into());
        self.targets.push(target);
        self.timelines.push(effects.timeline.unwrap_or_default());
        self.wait_for_timeline.push(effects.wait_for_timeline);
        self.anim_types.push(effects.anim_type);
        self.anim_names.push(effects.anim_name);
        self.shake_enabled.push(effects.shake_enabled);
        self.shake_levels.push(effects.shake_level);
        self.voices.push(effects.voice);
    }

    /// 选项数量
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// 是否没有选项
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// 按索引组装选项视图，越界返回 `None`
    ///
    /// 未对齐的平行数组按中性默认值补齐读取。
    pub fn option(&self, index: usize) -> Option<OptionEntry> {
        let label = self.options.get(index)?.clone();
        let defaults = OptionEffects::default();
        let timeline = self
            .timelines
            .get(index)
            .filter(|t| !t.is_empty())
            .cloned();
        Some(OptionEntry {
            label,
            target: self.targets.get(index).cloned().flatten(),
            effects: OptionEffects {
                timeline,
                wait_for_timeline: self
                    .wait_for_timeline
                    .get(index)
                    .copied()
                    .unwrap_or(defaults.wait_for_timeline),
                anim_type: self.anim_types.get(index).copied().unwrap_or_default(),
                anim_name: self.anim_names.get(index).cloned().unwrap_or_default(),
                shake_enabled: self.shake_enabled.get(index).copied().unwrap_or(false),
                shake_level: self.shake_levels.get(index).copied().unwrap_or_default(),
                voice: self.voices.get(index).cloned().flatten(),
            },
        })
    }

    /// 当前选中的索引
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// 正在等待完成的时间轴
    pub fn awaiting_timeline(&self) -> Option<&str> {
        self.awaiting_timeline.as_deref()
    }

    pub(crate) fn select(&mut self, index: usize) {
        self.selected = Some(index);
    }

    pub(crate) fn await_timeline(&mut self, timeline: String) {
        self.awaiting_timeline = Some(timeline);
    }

    pub(crate) fn finish_timeline(&mut self) {
        self.awaiting_timeline = None;
    }

    pub(crate) fn reset(&mut self) {
        self.selected = None;
        self.awaiting_timeline = None;
    }

    /// 选中索引对应的目标；越界或未连接返回 `None`
    fn selected_target(&self) -> Option<NodeId> {
        let index = self.selected?;
        if index >= self.options.len() {
            return None;
        }
        self.targets.get(index).cloned().flatten()
    }
}

//=============================================================================
// 条件节点
//=============================================================================

/// 条件判定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Condition {
    /// 背包中是否有指定物品
    HasItem { item_id: ItemId },
    /// 标记值是否等于期望值
    CheckFlag {
        flag: String,
        #[serde(default = "default_true")]
        expected: bool,
    },
    /// 数值变量比较
    CompareValue {
        variable: String,
        op: CompareOp,
        threshold: f64,
    },
    /// 任务状态是否等于期望值
    CheckQuestStatus {
        quest_id: String,
        expected: QuestStatus,
    },
    /// 注入的具名谓词
    Custom { predicate: String },
}

fn default_true() -> bool {
    true
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HasItem { item_id } => write!(f, "持有 {}", item_id),
            Self::CheckFlag { flag, expected } => write!(f, "{} == {}", flag, expected),
            Self::CompareValue {
                variable,
                op,
                threshold,
            } => write!(f, "{} {} {}", variable, op, threshold),
            Self::CheckQuestStatus { quest_id, expected } => {
                write!(f, "任务 {} 为 {:?}", quest_id, expected)
            }
            Self::Custom { predicate } => write!(f, "自定义 {}", predicate),
        }
    }
}

/// 条件节点（静默，自动推进）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionNode {
    #[serde(flatten)]
    pub condition: Condition,
    #[serde(default)]
    pub true_branch: Option<NodeId>,
    #[serde(default)]
    pub false_branch: Option<NodeId>,

    #[serde(skip)]
    result: Option<bool>,
}

impl ConditionNode {
    pub fn new(condition: Condition) -> Self {
        Self {
            condition,
            true_branch: None,
            false_branch: None,
            result: None,
        }
    }

    pub fn on_true(mut self, target: impl Into<NodeId>) -> Self {
        self.true_branch = Some(target.into());
        self
    }

    pub fn on_false(mut self, target: impl Into<NodeId>) -> Self {
        self.false_branch = Some(target.into());
        self
    }

    /// 最近一次求值结果
    pub fn result(&self) -> Option<bool> {
        self.result
    }

    pub(crate) fn resolve(&mut self, result: bool) {
        self.result = Some(result);
    }

    fn resolved_branch(&self) -> Option<NodeId> {
        match self.result? {
            true => self.true_branch.clone(),
            false => self.false_branch.clone(),
        }
    }
}

//=============================================================================
// 事件节点
//=============================================================================

/// 事件副作用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    GiveItem {
        item_id: ItemId,
    },
    PlaySound {
        source: SoundSource,
        #[serde(default = "default_volume")]
        volume: f32,
    },
    QuestAction(QuestAction),
    /// 注入的具名动作
    Custom {
        action: String,
    },
}

fn default_volume() -> f32 {
    1.0
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GiveItem { item_id } => write!(f, "给予 {}", item_id),
            Self::PlaySound { source, volume } => write!(f, "播放 {} ({})", source, volume),
            Self::QuestAction(action) => write!(f, "{:?} {}", action.kind, action.quest_id),
            Self::Custom { action } => write!(f, "自定义 {}", action),
        }
    }
}

/// 事件节点（静默，执行副作用后自动推进）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventNode {
    #[serde(flatten)]
    pub event: EventKind,
    #[serde(default)]
    pub next: Option<NodeId>,
    /// 显式结束标记
    #[serde(default)]
    pub end_event: bool,
}

impl EventNode {
    pub fn new(event: EventKind) -> Self {
        Self {
            event,
            next: None,
            end_event: false,
        }
    }

    pub fn give_item(item_id: impl Into<ItemId>) -> Self {
        Self::new(EventKind::GiveItem {
            item_id: item_id.into(),
        })
    }

    pub fn with_next(mut self, next: impl Into<NodeId>) -> Self {
        self.next = Some(next.into());
        self
    }

    pub fn end(mut self) -> Self {
        self.end_event = true;
        self
    }
}

//=============================================================================
// 出示节点
//=============================================================================

/// 物品反应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub item_id: ItemId,
    #[serde(default)]
    pub target: Option<NodeId>,
}

/// 出示状态
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ItemOffer {
    /// 尚未收到物品
    #[default]
    Pending,
    /// 玩家放弃出示
    Declined,
    /// 玩家出示了物品
    Presented(ItemId),
}

/// 出示节点：根据外部提供的物品分支
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PresentationNode {
    #[serde(default)]
    pub speaker: Option<ActorRef>,
    #[serde(default)]
    pub text: String,
    /// 按注册顺序匹配，首个匹配生效
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub default_output: Option<NodeId>,
    #[serde(default)]
    pub one_time: bool,
    #[serde(default)]
    pub end_node: bool,

    #[serde(skip)]
    offer: ItemOffer,
}

impl PresentationNode {
    pub fn new(speaker: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.map(str::to_string),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_reaction(mut self, item_id: impl Into<ItemId>, target: impl Into<NodeId>) -> Self {
        self.reactions.push(Reaction {
            item_id: item_id.into(),
            target: Some(target.into()),
        });
        self
    }

    pub fn with_default(mut self, target: impl Into<NodeId>) -> Self {
        self.default_output = Some(target.into());
        self
    }

    pub fn one_time(mut self) -> Self {
        self.one_time = true;
        self
    }

    /// 当前出示状态
    pub fn offer(&self) -> &ItemOffer {
        &self.offer
    }

    pub(crate) fn set_offer(&mut self, offer: ItemOffer) {
        self.offer = offer;
    }

    /// 物品对应的目标：首个同名反应生效；未匹配或未连接时回退到默认输出
    fn reaction_target(&self, item: &str) -> Option<NodeId> {
        self.reactions
            .iter()
            .find(|r| r.item_id == item)
            .and_then(|r| r.target.clone())
            .or_else(|| self.default_output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(nodes: Vec<Node>) -> DialogueGraph {
        DialogueGraph::from_nodes("test", None, nodes)
    }

    #[test]
    fn test_linear_next_and_end_rule() {
        let graph = graph_with(vec![
            Node::new("a", DialogueNode::line(None, "A").with_next("b")),
            Node::new("b", DialogueNode::line(None, "B")),
            Node::new("c", DialogueNode::line(None, "C").with_next("missing")),
        ]);

        let a = graph.node(&"a".into()).unwrap();
        assert_eq!(a.next_node(), Some(NodeId::from("b")));
        assert!(!a.is_end_node(&graph));

        // 无后继 / 后继不存在都视为结束节点
        assert!(graph.node(&"b".into()).unwrap().is_end_node(&graph));
        assert!(graph.node(&"c".into()).unwrap().is_end_node(&graph));
    }

    #[test]
    fn test_choice_selection_bounds() {
        let mut node = Node::new(
            "q",
            DialogueNode::choice(Some("Guard"), "Pass?")
                .with_option("Yes", Some("y"), OptionEffects::none())
                .with_option("No", None, OptionEffects::none()),
        );

        assert_eq!(node.next_node(), None);

        let choice = node.choice_mut().unwrap();
        choice.select(0);
        assert_eq!(node.next_node(), Some(NodeId::from("y")));

        // 未连接的选项
        node.choice_mut().unwrap().select(1);
        assert_eq!(node.next_node(), None);

        // 越界
        node.choice_mut().unwrap().select(2);
        assert_eq!(node.next_node(), None);
    }

    #[test]
    fn test_choice_end_rule_requires_some_connection() {
        let graph = graph_with(vec![
            Node::new(
                "open",
                DialogueNode::choice(None, "?").with_option("go", Some("open"), OptionEffects::none()),
            ),
            Node::new(
                "closed",
                DialogueNode::choice(None, "?").with_option("go", Some("nowhere"), OptionEffects::none()),
            ),
        ]);

        assert!(!graph.node(&"open".into()).unwrap().is_end_node(&graph));
        assert!(graph.node(&"closed".into()).unwrap().is_end_node(&graph));
    }

    #[test]
    fn test_silent_nodes_never_implicit_end() {
        let graph = graph_with(vec![
            Node::new("c", ConditionNode::new(Condition::HasItem { item_id: "x".into() })),
            Node::new("e", EventNode::give_item("x")),
            Node::new("e_end", EventNode::give_item("x").with_next("c").end()),
        ]);

        assert!(!graph.node(&"c".into()).unwrap().is_end_node(&graph));
        assert!(!graph.node(&"e".into()).unwrap().is_end_node(&graph));
        assert!(graph.node(&"e_end".into()).unwrap().is_end_node(&graph));
        // 显式结束事件没有后继
        assert_eq!(graph.node(&"e_end".into()).unwrap().next_node(), None);
    }

    #[test]
    fn test_condition_branch_resolution() {
        let mut node = ConditionNode::new(Condition::CheckFlag {
            flag: "door_open".into(),
            expected: true,
        })
        .on_true("t");

        assert_eq!(node.resolved_branch(), None);
        node.resolve(true);
        assert_eq!(node.resolved_branch(), Some(NodeId::from("t")));
        node.resolve(false);
        assert_eq!(node.resolved_branch(), None);
    }

    #[test]
    fn test_presentation_pending_returns_self() {
        let mut node = Node::new(
            "p",
            PresentationNode::new(Some("Inspector"), "Show me proof.")
                .with_reaction("badge", "ok")
                .with_reaction("badge", "shadowed")
                .with_default("default"),
        );

        assert_eq!(node.next_node(), Some(NodeId::from("p")));

        let NodeKind::Presentation(p) = &mut node.kind else {
            unreachable!()
        };
        p.set_offer(ItemOffer::Presented("badge".into()));
        assert_eq!(node.next_node(), Some(NodeId::from("ok")));

        let NodeKind::Presentation(p) = &mut node.kind else {
            unreachable!()
        };
        p.set_offer(ItemOffer::Presented("apple".into()));
        assert_eq!(node.next_node(), Some(NodeId::from("default")));

        let NodeKind::Presentation(p) = &mut node.kind else {
            unreachable!()
        };
        p.set_offer(ItemOffer::Declined);
        assert_eq!(node.next_node(), Some(NodeId::from("default")));
    }

    #[test]
    fn test_node_json_shape() {
        let json = r#"{
            "id": "c1",
            "name": "has_key",
            "type": "condition",
            "check": "compare_value",
            "variable": "trust",
            "op": ">=",
            "threshold": 3.0,
            "true_branch": "d1"
        }"#;

        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.variant(), NodeVariant::Condition);
        assert_eq!(node.name, "has_key");
        assert!(matches!(
            &node.kind,
            NodeKind::Condition(ConditionNode {
                condition: Condition::CompareValue { op: CompareOp::GreaterOrEqual, .. },
                false_branch: None,
                ..
            })
        ));
    }

    #[test]
    fn test_display_name_derived() {
        let named = Node::new("a", DialogueNode::line(None, "Hi")).with_name("greeting");
        assert_eq!(named.display_name(), "greeting");

        let derived = Node::new("b", DialogueNode::line(Some("Mia"), "Hi"));
        assert_eq!(derived.display_name(), "Mia: Hi");
    }
}
