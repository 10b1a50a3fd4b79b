//! # Effects 模块
//!
//! 节点携带的参数类型：选项副作用、条件比较运算、事件参数、任务状态。
//!
//! 这些类型只描述"做什么"，具体执行由外部协作者（见 [`crate::services`]）负责。

use serde::{Deserialize, Serialize};

/// 物品标识符
pub type ItemId = String;

/// 角色引用（`None` 表示旁白）
pub type ActorRef = String;

/// 角色动画参数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimType {
    /// 不播放动画
    #[default]
    None,
    /// 触发器参数
    Trigger,
    /// 直接切换到指定状态
    State,
}

/// 镜头震动强度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShakeLevel {
    #[default]
    Light,
    Medium,
    Heavy,
}

/// 单个选项的副作用
///
/// 由 [`ChoiceData`](super::ChoiceData) 的平行数组按索引组装而成。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionEffects {
    /// 选择后播放的时间轴（可选）
    pub timeline: Option<String>,
    /// 是否等待时间轴播放完毕再推进
    pub wait_for_timeline: bool,
    /// 动画参数类型
    pub anim_type: AnimType,
    /// 动画名称
    pub anim_name: String,
    /// 是否震动镜头
    pub shake_enabled: bool,
    /// 震动强度
    pub shake_level: ShakeLevel,
    /// 选项语音（可选）
    pub voice: Option<String>,
}

impl Default for OptionEffects {
    fn default() -> Self {
        Self {
            timeline: None,
            wait_for_timeline: true,
            anim_type: AnimType::None,
            anim_name: String::new(),
            shake_enabled: false,
            shake_level: ShakeLevel::Light,
            voice: None,
        }
    }
}

impl OptionEffects {
    /// 创建无副作用的选项配置
    pub fn none() -> Self {
        Self::default()
    }

    /// 设置时间轴
    pub fn with_timeline(mut self, timeline: impl Into<String>, wait: bool) -> Self {
        self.timeline = Some(timeline.into());
        self.wait_for_timeline = wait;
        self
    }

    /// 设置动画
    pub fn with_animation(mut self, anim_type: AnimType, name: impl Into<String>) -> Self {
        self.anim_type = anim_type;
        self.anim_name = name.into();
        self
    }

    /// 启用镜头震动
    pub fn with_shake(mut self, level: ShakeLevel) -> Self {
        self.shake_enabled = true;
        self.shake_level = level;
        self
    }

    /// 设置语音
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// 是否没有任何副作用
    pub fn is_empty(&self) -> bool {
        self.timeline.is_none()
            && self.anim_type == AnimType::None
            && !self.shake_enabled
            && self.voice.is_none()
    }
}

/// 数值比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
}

/// `=` / `!=` 的容差
pub const EQ_TOLERANCE: f64 = 1e-6;

impl CompareOp {
    /// 计算 `lhs op rhs`
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Equal => (lhs - rhs).abs() < EQ_TOLERANCE,
            Self::NotEqual => (lhs - rhs).abs() >= EQ_TOLERANCE,
            Self::Greater => lhs > rhs,
            Self::Less => lhs < rhs,
            Self::GreaterOrEqual => lhs >= rhs,
            Self::LessOrEqual => lhs <= rhs,
        }
    }

    /// 运算符符号
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "≠",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterOrEqual => "≥",
            Self::LessOrEqual => "≤",
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

/// 任务操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestActionKind {
    CompleteObjective,
    AcceptQuest,
    CompleteQuest,
    FailQuest,
}

/// 任务操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestAction {
    pub kind: QuestActionKind,
    pub quest_id: String,
    /// 仅 `CompleteObjective` 使用
    #[serde(default)]
    pub objective_id: Option<String>,
}

impl QuestAction {
    pub fn accept(quest_id: impl Into<String>) -> Self {
        Self {
            kind: QuestActionKind::AcceptQuest,
            quest_id: quest_id.into(),
            objective_id: None,
        }
    }

    pub fn complete(quest_id: impl Into<String>) -> Self {
        Self {
            kind: QuestActionKind::CompleteQuest,
            quest_id: quest_id.into(),
            objective_id: None,
        }
    }

    pub fn fail(quest_id: impl Into<String>) -> Self {
        Self {
            kind: QuestActionKind::FailQuest,
            quest_id: quest_id.into(),
            objective_id: None,
        }
    }

    pub fn complete_objective(quest_id: impl Into<String>, objective_id: impl Into<String>) -> Self {
        Self {
            kind: QuestActionKind::CompleteObjective,
            quest_id: quest_id.into(),
            objective_id: Some(objective_id.into()),
        }
    }
}

/// 音效来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundSource {
    /// 已注册的音效片段
    Clip(String),
    /// 资源路径
    Path(String),
}

impl std::fmt::Display for SoundSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clip(clip) => write!(f, "clip:{}", clip),
            Self::Path(path) => write!(f, "path:{}", path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_op_apply() {
        assert!(CompareOp::Equal.apply(1.0, 1.0 + 1e-9));
        assert!(!CompareOp::Equal.apply(1.0, 1.1));
        assert!(CompareOp::NotEqual.apply(1.0, 1.1));
        assert!(CompareOp::Greater.apply(2.0, 1.0));
        assert!(!CompareOp::Less.apply(2.0, 1.0));
        assert!(CompareOp::GreaterOrEqual.apply(1.0, 1.0));
        assert!(CompareOp::LessOrEqual.apply(0.5, 1.0));
    }

    #[test]
    fn test_compare_op_serde_symbols() {
        let op: CompareOp = serde_json::from_str("\">=\"").unwrap();
        assert_eq!(op, CompareOp::GreaterOrEqual);
        assert_eq!(serde_json::to_string(&CompareOp::NotEqual).unwrap(), "\"!=\"");
        assert_eq!(op.to_string(), "≥");
    }

    #[test]
    fn test_option_effects_default_waits() {
        let effects = OptionEffects::default();
        assert!(effects.wait_for_timeline);
        assert!(effects.is_empty());

        let effects = OptionEffects::none().with_shake(ShakeLevel::Heavy);
        assert!(!effects.is_empty());
    }
}
