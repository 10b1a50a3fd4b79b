//! # Validate 模块
//!
//! 选项平行数组的结构修复。
//!
//! `options` 的长度是权威长度：较短的数组用中性默认值补齐，较长的截断。
//! 修复是幂等的，对已对齐的节点再次修复不会产生任何变更。

use tracing::warn;

use crate::graph::{AnimType, ChoiceData, DialogueGraph, NodeId, ShakeLevel};

/// 单个数组的修复记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayFix {
    pub field: &'static str,
    pub before: usize,
    pub after: usize,
}

/// 单个节点的修复报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub node: NodeId,
    pub fixes: Vec<ArrayFix>,
}

fn align<T: Clone>(
    field: &'static str,
    values: &mut Vec<T>,
    len: usize,
    fill: T,
    fixes: &mut Vec<ArrayFix>,
) {
    let before = values.len();
    if before != len {
        values.resize(len, fill);
        fixes.push(ArrayFix {
            field,
            before,
            after: len,
        });
    }
}

/// 检查选项数组是否已对齐
pub fn is_aligned(choice: &ChoiceData) -> bool {
    let len = choice.options.len();
    [
        choice.targets.len(),
        choice.timelines.len(),
        choice.wait_for_timeline.len(),
        choice.anim_types.len(),
        choice.anim_names.len(),
        choice.shake_enabled.len(),
        choice.shake_levels.len(),
        choice.voices.len(),
    ]
    .iter()
    .all(|&l| l == len)
}

/// 对齐单个选项节点的平行数组，返回所做的修改
pub fn repair_choice(choice: &mut ChoiceData) -> Vec<ArrayFix> {
    let len = choice.options.len();
    let mut fixes = Vec::new();

    align("targets", &mut choice.targets, len, None, &mut fixes);
    align("timelines", &mut choice.timelines, len, String::new(), &mut fixes);
    align("wait_for_timeline", &mut choice.wait_for_timeline, len, true, &mut fixes);
    align("anim_types", &mut choice.anim_types, len, AnimType::None, &mut fixes);
    align("anim_names", &mut choice.anim_names, len, String::new(), &mut fixes);
    align("shake_enabled", &mut choice.shake_enabled, len, false, &mut fixes);
    align("shake_levels", &mut choice.shake_levels, len, ShakeLevel::default(), &mut fixes);
    align("voices", &mut choice.voices, len, None, &mut fixes);

    fixes
}

/// 修复图中所有选项节点
pub fn repair_graph(graph: &mut DialogueGraph) -> Vec<RepairReport> {
    let graph_name = graph.name().to_string();
    let mut reports = Vec::new();

    for node in graph.nodes_mut() {
        let id = node.id.clone();
        let Some(choice) = node.choice_mut() else {
            continue;
        };
        let fixes = repair_choice(choice);
        if fixes.is_empty() {
            continue;
        }
        for fix in &fixes {
            warn!(
                graph = %graph_name,
                node = %id,
                field = fix.field,
                before = fix.before,
                after = fix.after,
                "选项数组长度不一致，已修复"
            );
        }
        reports.push(RepairReport { node: id, fixes });
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DialogueNode, Node, OptionEffects};

    fn misaligned() -> ChoiceData {
        let mut choice = ChoiceData::default();
        choice.options = vec!["A".into(), "B".into(), "C".into()];
        choice.targets = vec![Some("a".into())];
        choice.timelines = vec!["t1".into(), "".into(), "".into(), "extra".into()];
        choice.voices = vec![None, Some("v".into())];
        choice
    }

    #[test]
    fn test_repair_pads_and_truncates() {
        let mut choice = misaligned();
        assert!(!is_aligned(&choice));

        let fixes = repair_choice(&mut choice);
        assert!(is_aligned(&choice));
        assert!(fixes.contains(&ArrayFix {
            field: "targets",
            before: 1,
            after: 3
        }));
        assert!(fixes.contains(&ArrayFix {
            field: "timelines",
            before: 4,
            after: 3
        }));

        // options 本身不受影响
        assert_eq!(choice.options.len(), 3);
        assert_eq!(choice.targets, vec![Some("a".into()), None, None]);
        assert_eq!(choice.wait_for_timeline, vec![true, true, true]);
        assert_eq!(choice.shake_enabled, vec![false, false, false]);
        assert_eq!(choice.voices, vec![None, Some("v".to_string()), None]);
    }

    #[test]
    fn test_repair_is_fixed_point() {
        let mut choice = misaligned();
        repair_choice(&mut choice);
        let once = choice.clone();

        assert!(repair_choice(&mut choice).is_empty());
        assert_eq!(choice, once);
    }

    #[test]
    fn test_builder_output_is_aligned() {
        let node = DialogueNode::choice(None, "?")
            .with_option("Yes", Some("y"), OptionEffects::none().with_timeline("cut", true))
            .with_option("No", None, OptionEffects::none());
        let mut graph = DialogueGraph::from_nodes("g", None, vec![Node::new("q", node)]);

        assert!(repair_graph(&mut graph).is_empty());
    }

    #[test]
    fn test_repair_graph_reports_nodes() {
        let mut node = Node::new("q", DialogueNode::choice(None, "?"));
        *node.choice_mut().unwrap() = misaligned();
        let mut graph = DialogueGraph::from_nodes(
            "g",
            None,
            vec![Node::new("d", DialogueNode::line(None, "hi")), node],
        );

        let reports = repair_graph(&mut graph);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].node, NodeId::from("q"));
        assert!(is_aligned(graph.node(&"q".into()).unwrap().choice().unwrap()));
    }
}
