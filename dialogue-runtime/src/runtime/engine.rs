//! # Engine 模块
//!
//! 对话图遍历引擎。
//!
//! ## 执行模型
//!
//! ```text
//! Idle --start_dialogue--> Active --end_dialogue--> Idle
//! ```
//!
//! 1. 处理当前节点（展示或副作用）
//! 2. 静默节点（条件/事件）在同一次调用中继续推进
//! 3. 遇到需要外部输入的节点时返回，调用方通过具名重入方法继续
//!    （`next` / `select_option` / `present_item` / `timeline_finished`）
//!
//! 引擎不保存独立的等待状态：等待什么由当前节点及其已解析的选择状态推导，
//! 见 [`DialogueRunner::waiting`]。

use tracing::{debug, error, info, warn};

use crate::completion::{CompletionKey, CompletionStore, MemoryCompletionStore};
use crate::error::RuntimeError;
use crate::graph::{DialogueGraph, DialogueMode, ItemOffer, Node, NodeId, NodeKind};
use crate::history::{History, HistoryEvent};
use crate::input::DialogueInput;
use crate::presenter::Presenter;
use crate::runtime::executor::{Executor, Flow};
use crate::services::Services;
use crate::state::{RunnerConfig, WaitingFor};
use crate::validate::repair_graph;

/// 开始对话的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// 对话已开始（可能已经在同一次调用中结束）
    Started,
    /// 起始节点是已完成的一次性节点，对话没有开始，展示层未被调用
    AlreadyCompleted,
}

/// 游标推进的结果
enum Step {
    Moved,
    /// 出示节点仍在等待物品
    Stay,
    Ended,
}

/// 对话图遍历引擎
///
/// 一个引擎拥有一张对话图，同一时间最多进行一次遍历。
///
/// # 使用示例
///
/// ```ignore
/// let mut runner = DialogueRunner::new(graph)
///     .with_presenter(presenter)
///     .with_services(world.install(Services::new()));
///
/// runner.start_dialogue()?;
/// while runner.is_active() {
///     // 根据 runner.waiting() 采集输入...
///     runner.handle_input(input)?;
/// }
/// ```
pub struct DialogueRunner {
    graph: DialogueGraph,
    presenter: Option<Box<dyn Presenter>>,
    store: Box<dyn CompletionStore>,
    executor: Executor,
    history: History,
    config: RunnerConfig,
}

impl DialogueRunner {
    /// 创建引擎，使用内存完成记录、无外部协作者、默认配置
    pub fn new(graph: DialogueGraph) -> Self {
        let config = RunnerConfig::default();
        Self {
            graph,
            presenter: None,
            store: Box::new(MemoryCompletionStore::new()),
            executor: Executor::default(),
            history: History::new().with_max_entries(config.history_limit),
            config,
        }
    }

    pub fn with_presenter(mut self, presenter: impl Presenter + 'static) -> Self {
        self.set_presenter(presenter);
        self
    }

    pub fn with_store(mut self, store: impl CompletionStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    pub fn with_services(mut self, services: Services) -> Self {
        self.executor = Executor::new(services);
        self
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.history = History::new().with_max_entries(config.history_limit);
        self.config = config;
        self
    }

    /// 替换展示层
    pub fn set_presenter(&mut self, presenter: impl Presenter + 'static) {
        self.presenter = Some(Box::new(presenter));
    }

    pub fn graph(&self) -> &DialogueGraph {
        &self.graph
    }

    /// 可变访问对话图
    ///
    /// 遍历进行中修改连接属于未定义行为；遍历到悬空引用时引擎会中止对话。
    pub fn graph_mut(&mut self) -> &mut DialogueGraph {
        &mut self.graph
    }

    pub fn services(&self) -> &Services {
        self.executor.services()
    }

    /// 用于在构造后注册谓词和动作
    pub fn services_mut(&mut self) -> &mut Services {
        self.executor.services_mut()
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current_node(&self) -> Option<&NodeId> {
        self.graph.current_node()
    }

    pub fn is_active(&self) -> bool {
        self.graph.is_active()
    }

    /// 当前等待的外部输入
    pub fn waiting(&self) -> WaitingFor {
        if !self.graph.is_active() {
            return WaitingFor::Nothing;
        }
        let Some(node) = self.graph.current_node().and_then(|id| self.graph.node(id)) else {
            return WaitingFor::Nothing;
        };
        match &node.kind {
            NodeKind::Dialogue(dialogue) => match &dialogue.mode {
                DialogueMode::Linear { .. } => WaitingFor::Continue,
                DialogueMode::Choice(choice) => match choice.awaiting_timeline() {
                    Some(timeline) => WaitingFor::Timeline {
                        timeline: timeline.to_string(),
                    },
                    None => WaitingFor::Option {
                        count: choice.len(),
                    },
                },
            },
            NodeKind::Presentation(_) => WaitingFor::Item,
            NodeKind::Condition(_) | NodeKind::Event(_) => WaitingFor::Nothing,
        }
    }

    //=========================================================================
    // 生命周期
    //=========================================================================

    /// 开始对话
    ///
    /// - 已有遍历进行中时拒绝，原遍历不受影响
    /// - 起始节点是已完成的一次性节点时，不调用展示层，直接返回
    ///   [`StartOutcome::AlreadyCompleted`]
    pub fn start_dialogue(&mut self) -> Result<StartOutcome, RuntimeError> {
        let graph = self.graph.name().to_string();

        if self.graph.is_active() {
            warn!(graph = %graph, "已有正在进行的对话，拒绝开始");
            return Err(RuntimeError::AlreadyActive { graph });
        }
        if self.presenter.is_none() {
            return Err(self.abort(RuntimeError::MissingPresenter { graph }));
        }
        let Some(start) = self.graph.start().cloned() else {
            return Err(self.abort(RuntimeError::MissingStartNode { graph }));
        };
        let Some(start_node) = self.graph.node(&start) else {
            return Err(self.abort(RuntimeError::DanglingNode { graph, node: start }));
        };

        if self.is_completed(start_node) {
            info!(graph = %graph, node = %start, "起始节点已完成，跳过对话");
            return Ok(StartOutcome::AlreadyCompleted);
        }

        if self.config.repair_on_start {
            repair_graph(&mut self.graph);
        }

        debug!(graph = %graph, node = %start, "开始对话");
        self.graph.begin(start);
        self.process_current_node()?;
        Ok(StartOutcome::Started)
    }

    /// 结束对话
    ///
    /// 可在任何状态调用；空闲时调用不做任何事。
    pub fn end_dialogue(&mut self) {
        if !self.graph.is_active() && self.graph.current_node().is_none() {
            return;
        }

        self.graph.reset_cursor();
        if let Some(presenter) = self.presenter.as_deref_mut() {
            presenter.on_dialogue_ended();
        }
        self.history.push(HistoryEvent::Ended {
            graph: self.graph.name().to_string(),
        });
        debug!(graph = %self.graph.name(), "对话结束");
    }

    //=========================================================================
    // 重入方法
    //=========================================================================

    /// 继续（玩家点击"下一句"）
    ///
    /// - 当前节点是结束节点时结束对话
    /// - 选项节点忽略此调用
    /// - 出示节点在收到物品前保持不动
    pub fn next(&mut self) -> Result<(), RuntimeError> {
        if !self.graph.is_active() {
            return Ok(());
        }
        let Some(id) = self.graph.current_node().cloned() else {
            self.end_dialogue();
            return Ok(());
        };
        let Some(node) = self.graph.node(&id) else {
            return Err(self.dangling(id));
        };

        if node.is_end_node(&self.graph) {
            self.end_dialogue();
            return Ok(());
        }
        if node.is_choice() {
            debug!(node = %id, "选项节点只能通过选择推进，忽略继续");
            return Ok(());
        }
        self.process_next_node()
    }

    /// 选择选项
    ///
    /// 越界的索引不是错误：没有后继，对话结束。
    /// 选项要求等待时间轴时挂起，直到 [`timeline_finished`](Self::timeline_finished)。
    pub fn select_option(&mut self, index: usize) -> Result<(), RuntimeError> {
        if !self.graph.is_active() {
            return Ok(());
        }
        let Some(id) = self.graph.current_node().cloned() else {
            self.end_dialogue();
            return Ok(());
        };
        let Some(node) = self.graph.node_mut(&id) else {
            return Err(self.dangling(id));
        };
        let variant = node.variant();
        let Some(choice) = node.choice_mut() else {
            return Err(RuntimeError::StateMismatch {
                expected: "选项节点".to_string(),
                actual: format!("{}节点 '{}'", variant, id),
            });
        };
        if let Some(timeline) = choice.awaiting_timeline() {
            debug!(node = %id, timeline, "正在等待时间轴，忽略选择");
            return Ok(());
        }

        choice.select(index);
        let entry = choice.option(index);
        debug!(node = %id, index, label = ?entry.as_ref().map(|e| &e.label), "选择选项");

        self.history.push(HistoryEvent::OptionChosen {
            node: id.clone(),
            label: entry.as_ref().map(|e| e.label.clone()),
            index,
        });
        if let Some(presenter) = self.presenter.as_deref_mut() {
            presenter.hide_options();
        }

        if let Some(entry) = entry
            && let Some(timeline) = self.executor.dispatch_option(&entry.effects)
        {
            if let Some(choice) = self.graph.node_mut(&id).and_then(Node::choice_mut) {
                debug!(node = %id, timeline = %timeline, "等待时间轴完成");
                choice.await_timeline(timeline);
            }
            return Ok(());
        }

        self.process_next_node()
    }

    /// 出示物品（`None` 表示放弃出示）
    pub fn present_item(&mut self, item: Option<&str>) -> Result<(), RuntimeError> {
        if !self.graph.is_active() {
            return Ok(());
        }
        let Some(id) = self.graph.current_node().cloned() else {
            self.end_dialogue();
            return Ok(());
        };
        let Some(node) = self.graph.node_mut(&id) else {
            return Err(self.dangling(id));
        };
        let variant = node.variant();
        let NodeKind::Presentation(presentation) = &mut node.kind else {
            return Err(RuntimeError::StateMismatch {
                expected: "出示节点".to_string(),
                actual: format!("{}节点 '{}'", variant, id),
            });
        };

        presentation.set_offer(match item {
            Some(item) => ItemOffer::Presented(item.to_string()),
            None => ItemOffer::Declined,
        });
        debug!(node = %id, item, "出示物品");

        self.history.push(HistoryEvent::ItemPresented {
            node: id,
            item: item.map(str::to_string),
        });
        if let Some(presenter) = self.presenter.as_deref_mut() {
            presenter.disable_item_presentation();
        }

        self.process_next_node()
    }

    /// 外部时间轴播放完毕
    ///
    /// 与正在等待的时间轴不匹配时忽略。
    pub fn timeline_finished(&mut self, timeline: &str) -> Result<(), RuntimeError> {
        if !self.graph.is_active() {
            return Ok(());
        }
        let Some(id) = self.graph.current_node().cloned() else {
            self.end_dialogue();
            return Ok(());
        };
        let resumed = match self.graph.node_mut(&id).and_then(Node::choice_mut) {
            Some(choice) if choice.awaiting_timeline() == Some(timeline) => {
                choice.finish_timeline();
                true
            }
            _ => false,
        };

        if !resumed {
            debug!(timeline, "没有等待此时间轴，忽略");
            return Ok(());
        }
        self.process_next_node()
    }

    /// 统一的输入入口，返回处理后的等待状态
    pub fn handle_input(&mut self, input: DialogueInput) -> Result<WaitingFor, RuntimeError> {
        match input {
            DialogueInput::Continue => self.next()?,
            DialogueInput::OptionSelected { index } => self.select_option(index)?,
            DialogueInput::ItemPresented { item } => self.present_item(item.as_deref())?,
            DialogueInput::TimelineFinished { timeline } => self.timeline_finished(&timeline)?,
        }
        Ok(self.waiting())
    }

    //=========================================================================
    // 遍历
    //=========================================================================

    /// 推进到后继节点并处理
    fn process_next_node(&mut self) -> Result<(), RuntimeError> {
        if !self.graph.is_active() {
            return Ok(());
        }
        match self.step()? {
            Step::Moved => self.process_current_node(),
            Step::Stay | Step::Ended => Ok(()),
        }
    }

    /// 处理当前节点；静默节点处理后继续推进，直到需要外部输入或对话结束
    fn process_current_node(&mut self) -> Result<(), RuntimeError> {
        let mut silent_chain = 0;

        loop {
            if !self.graph.is_active() {
                return Ok(());
            }
            let Some(id) = self.graph.current_node().cloned() else {
                self.end_dialogue();
                return Ok(());
            };

            match self.process_node(&id)? {
                Flow::Await => return Ok(()),
                Flow::Advance => {
                    silent_chain += 1;
                    if silent_chain > self.config.max_silent_chain {
                        return Err(self.abort(RuntimeError::SilentChainTooLong {
                            graph: self.graph.name().to_string(),
                            node: id,
                            limit: self.config.max_silent_chain,
                        }));
                    }
                    match self.step()? {
                        Step::Moved => continue,
                        Step::Stay | Step::Ended => return Ok(()),
                    }
                }
            }
        }
    }

    /// 处理单个节点：报告结束标记、执行、写入一次性完成记录
    fn process_node(&mut self, id: &NodeId) -> Result<Flow, RuntimeError> {
        if self.presenter.is_none() {
            return Err(self.abort(RuntimeError::MissingPresenter {
                graph: self.graph.name().to_string(),
            }));
        }
        let Some(node) = self.graph.node(id) else {
            return Err(self.dangling(id.clone()));
        };

        let is_end = node.is_end_node(&self.graph);
        let key = node
            .is_one_time()
            .then(|| CompletionKey::for_node(self.graph.name(), node));
        let line = match &node.kind {
            NodeKind::Dialogue(d) => Some((d.speaker.clone(), d.text.clone())),
            NodeKind::Presentation(p) => Some((p.speaker.clone(), p.text.clone())),
            NodeKind::Condition(_) | NodeKind::Event(_) => None,
        };
        debug!(node = %id, variant = %node.variant(), is_end, "处理节点");

        let flow = match (self.graph.node_mut(id), self.presenter.as_deref_mut()) {
            (Some(node), Some(presenter)) => {
                presenter.set_end_node_flag(is_end);
                self.executor.execute(node, presenter)
            }
            _ => Flow::Await,
        };

        if let Some((speaker, text)) = line {
            self.history.push(HistoryEvent::Line {
                node: id.clone(),
                speaker,
                text,
            });
        }
        if let Some(key) = key {
            self.mark_complete(&key);
        }

        Ok(flow)
    }

    /// 移动游标到当前节点的后继
    ///
    /// 进入已完成的一次性节点时结束对话（包括自身重入）；
    /// 等待物品的出示节点保持不动。
    fn step(&mut self) -> Result<Step, RuntimeError> {
        let Some(current) = self.graph.current_node().cloned() else {
            self.end_dialogue();
            return Ok(Step::Ended);
        };
        let Some(node) = self.graph.node(&current) else {
            return Err(self.dangling(current));
        };

        let pending = node
            .as_presentation()
            .is_some_and(|p| *p.offer() == ItemOffer::Pending);
        let Some(next) = node.next_node() else {
            self.end_dialogue();
            return Ok(Step::Ended);
        };

        if next == current && pending {
            return Ok(Step::Stay);
        }
        let Some(target) = self.graph.node(&next) else {
            return Err(self.dangling(next));
        };
        if self.is_completed(target) {
            info!(graph = %self.graph.name(), node = %next, "一次性节点已完成，结束对话");
            self.end_dialogue();
            return Ok(Step::Ended);
        }

        self.graph.move_to(next);
        Ok(Step::Moved)
    }

    //=========================================================================
    // 辅助
    //=========================================================================

    fn is_completed(&self, node: &Node) -> bool {
        node.is_one_time()
            && self
                .store
                .is_complete(&CompletionKey::for_node(self.graph.name(), node))
    }

    fn mark_complete(&mut self, key: &CompletionKey) {
        if self.store.is_complete(key) {
            return;
        }
        match self.store.mark_complete(key) {
            Ok(()) => info!(key = %key, "一次性节点标记完成"),
            Err(e) => warn!(key = %key, error = %e, "写入完成记录失败"),
        }
    }

    fn dangling(&mut self, node: NodeId) -> RuntimeError {
        self.abort(RuntimeError::DanglingNode {
            graph: self.graph.name().to_string(),
            node,
        })
    }

    /// 记录错误并把遍历中止到空闲状态
    fn abort(&mut self, err: RuntimeError) -> RuntimeError {
        error!(error = %err, "对话中止");
        self.end_dialogue();
        err
    }
}

impl std::fmt::Debug for DialogueRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueRunner")
            .field("graph", &self.graph.name())
            .field("current_node", &self.graph.current_node())
            .field("active", &self.graph.is_active())
            .field("presenter", &self.presenter.is_some())
            .field("executor", &self.executor)
            .field("config", &self.config)
            .finish()
    }
}
