//! # Dialogue Runtime
//!
//! 分支对话节点图的核心运行时库。
//!
//! ## 架构概述
//!
//! `dialogue-runtime` 是纯逻辑核心，不依赖任何 IO、渲染引擎或时钟。
//! 宿主层（Host）通过 **具名重入方法** 驱动引擎，引擎通过注入的协作者产生效果：
//!
//! ```text
//! Host                                   Runtime
//!   │                                       │
//!   │──── DialogueInput / next() ... ──────►│ 处理节点、推进游标
//!   │◄─── Presenter 调用 ───────────────────│
//!   │◄─── Services 调用（背包/任务/演出）────│
//!   │◄─── WaitingFor ───────────────────────│
//!   │                                       │
//! ```
//!
//! ## 核心类型
//!
//! - [`DialogueGraph`]：节点集合、起始节点与运行时游标
//! - [`Node`]：四种变体（对话、条件、事件、出示）的带标签联合体
//! - [`DialogueRunner`]：遍历状态机
//! - [`Presenter`]：展示层契约
//! - [`CompletionStore`]：一次性节点的完成记录契约
//! - [`Services`]：条件与事件依赖的外部协作者
//!
//! ## 使用示例
//!
//! ```ignore
//! use dialogue_runtime::{DialogueGraph, DialogueRunner, DialogueInput, WaitingFor};
//!
//! let graph = DialogueGraph::from_json(&text)?;
//! let mut runner = DialogueRunner::new(graph)
//!     .with_presenter(presenter)
//!     .with_services(world.install(Services::new()));
//!
//! runner.start_dialogue()?;
//! while runner.is_active() {
//!     let input = match runner.waiting() {
//!         WaitingFor::Continue => DialogueInput::next(),
//!         WaitingFor::Option { count } => DialogueInput::option(ask(count)),
//!         WaitingFor::Item => DialogueInput::item(pick_item()),
//!         WaitingFor::Timeline { timeline } => DialogueInput::timeline_finished(timeline),
//!         WaitingFor::Nothing => break,
//!     };
//!     runner.handle_input(input)?;
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`graph`]：节点与对话图
//! - [`runtime`]：遍历引擎
//! - [`presenter`]：展示层契约与记录实现
//! - [`services`]：外部协作者契约
//! - [`completion`]：一次性完成记录
//! - [`validate`]：选项数组修复
//! - [`diagnostic`]：静态检查
//! - [`world`]：内存世界
//! - [`history`]：对话回看
//! - [`input`] / [`state`]：输入与等待模型
//! - [`error`]：错误类型定义

pub mod completion;
pub mod diagnostic;
pub mod error;
pub mod graph;
pub mod history;
pub mod input;
pub mod presenter;
pub mod runtime;
pub mod services;
pub mod state;
pub mod validate;
pub mod world;

// 重导出核心类型
pub use completion::{
    CompletionFile, CompletionKey, CompletionStore, FormatVersion, MemoryCompletionStore,
};
pub use diagnostic::{Diagnostic, DiagnosticLevel, DiagnosticResult, analyze_graph, reachable_from};
pub use error::{DialogueError, DialogueResult, GraphError, RuntimeError, StoreError};
pub use graph::{
    ChoiceData, Condition, ConditionNode, DialogueGraph, DialogueMode, DialogueNode, EventKind,
    EventNode, GraphDocument, ItemOffer, Node, NodeId, NodeKind, NodeVariant, OptionEffects,
    OptionEntry, PresentationNode, Reaction,
};
pub use history::{History, HistoryEntry, HistoryEvent};
pub use input::DialogueInput;
pub use presenter::{Presenter, PresenterEvent, RecordingPresenter};
pub use runtime::{DialogueRunner, StartOutcome};
pub use services::{AudioSink, Cinematics, FlagStore, Inventory, QuestLog, Services};
pub use state::{RunnerConfig, WaitingFor};
pub use validate::{RepairReport, repair_choice, repair_graph};
pub use world::{MemoryWorld, WorldEffect, WorldState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        // 验证所有公共类型都可以正常使用
        let mut graph = DialogueGraph::new("main")
            .with_node(Node::new("d1", DialogueNode::line(Some("Test"), "Hello")));
        graph.set_start("d1");

        let _input = DialogueInput::next();
        let _waiting = WaitingFor::Continue;

        let mut runner = DialogueRunner::new(graph).with_presenter(RecordingPresenter::new());
        assert_eq!(runner.start_dialogue(), Ok(StartOutcome::Started));
        assert!(analyze_graph(runner.graph()).is_empty());
    }

    #[test]
    fn test_error_conversion() {
        let err: DialogueError = RuntimeError::AlreadyActive {
            graph: "main".to_string(),
        }
        .into();
        assert!(matches!(err, DialogueError::Runtime(_)));
    }
}
