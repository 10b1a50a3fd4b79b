//! # Terminal 模块
//!
//! 纯文本展示层与输入解析。

use std::io::Write;

use dialogue_runtime::{DialogueInput, HistoryEntry, HistoryEvent, Presenter, WaitingFor};
use tracing::warn;

/// 终端展示层
///
/// 结束节点的台词末尾带 `■` 标记。写入失败只记录警告，对话继续。
pub struct TerminalPresenter<W: Write> {
    out: W,
    end_node: bool,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            end_node: false,
        }
    }

    fn emit(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            warn!(error = %e, "终端输出失败");
        }
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn show_dialogue(&mut self, speaker: Option<&str>, text: &str) {
        let mark = if self.end_node { " ■" } else { "" };
        match speaker {
            Some(speaker) => self.emit(format_args!("{}: {}{}", speaker, text, mark)),
            None => self.emit(format_args!("{}{}", text, mark)),
        }
    }

    fn show_options(&mut self, labels: &[String]) {
        for (i, label) in labels.iter().enumerate() {
            self.emit(format_args!("  [{}] {}", i + 1, label));
        }
    }

    fn hide_options(&mut self) {}

    fn set_end_node_flag(&mut self, is_end: bool) {
        self.end_node = is_end;
    }

    fn enable_item_presentation(&mut self) {
        self.emit(format_args!("  (出示物品：输入物品 id，留空放弃)"));
    }

    fn disable_item_presentation(&mut self) {}

    fn on_dialogue_ended(&mut self) {
        self.end_node = false;
        self.emit(format_args!("-- 对话结束 --"));
    }
}

/// 等待状态对应的输入提示
pub fn prompt(waiting: &WaitingFor) -> &'static str {
    match waiting {
        WaitingFor::Nothing => "",
        WaitingFor::Continue => "> ",
        WaitingFor::Option { .. } => "选择> ",
        WaitingFor::Item => "出示> ",
        WaitingFor::Timeline { .. } => "演出中，回车结束> ",
    }
}

/// 把一行终端输入解析为对话输入
///
/// 选项按 1 起始编号；无法理解的输入返回 `None`。
pub fn parse_input(line: &str, waiting: &WaitingFor) -> Option<DialogueInput> {
    let line = line.trim();
    match waiting {
        WaitingFor::Nothing => None,
        WaitingFor::Continue => Some(DialogueInput::next()),
        WaitingFor::Option { .. } => {
            let number: usize = line.parse().ok()?;
            number.checked_sub(1).map(DialogueInput::option)
        }
        WaitingFor::Item => match line {
            "" | "-" => Some(DialogueInput::no_item()),
            item => Some(DialogueInput::item(item)),
        },
        WaitingFor::Timeline { timeline } => Some(DialogueInput::timeline_finished(timeline.as_str())),
    }
}

/// 回看记录的单行文本
pub fn format_history(entry: &HistoryEntry) -> String {
    match &entry.event {
        HistoryEvent::Line { speaker, text, .. } => match speaker {
            Some(speaker) => format!("{:>4} {}: {}", entry.seq, speaker, text),
            None => format!("{:>4} {}", entry.seq, text),
        },
        HistoryEvent::OptionChosen { label, index, .. } => format!(
            "{:>4}   -> [{}] {}",
            entry.seq,
            index + 1,
            label.as_deref().unwrap_or("?")
        ),
        HistoryEvent::ItemPresented { item, .. } => format!(
            "{:>4}   -> 出示 {}",
            entry.seq,
            item.as_deref().unwrap_or("(无)")
        ),
        HistoryEvent::Ended { graph } => format!("{:>4} -- {} 结束 --", entry.seq, graph),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presenter_output() {
        let mut presenter = TerminalPresenter::new(Vec::new());
        presenter.show_dialogue(Some("Guard"), "Halt!");
        presenter.show_dialogue(None, "The gate creaks.");
        presenter.show_options(&["Yes".to_string(), "No".to_string()]);
        presenter.set_end_node_flag(true);
        presenter.show_dialogue(Some("Guard"), "Go.");
        presenter.on_dialogue_ended();
        presenter.show_dialogue(None, "Later.");

        let text = String::from_utf8(presenter.out).unwrap();
        assert_eq!(
            text,
            "Guard: Halt!\nThe gate creaks.\n  [1] Yes\n  [2] No\nGuard: Go. ■\n-- 对话结束 --\nLater.\n"
        );
    }

    #[test]
    fn test_format_history() {
        let line = HistoryEntry {
            seq: 1,
            event: HistoryEvent::Line {
                node: "d1".into(),
                speaker: Some("Mia".to_string()),
                text: "Hello".to_string(),
            },
        };
        assert_eq!(format_history(&line), "   1 Mia: Hello");

        let chosen = HistoryEntry {
            seq: 2,
            event: HistoryEvent::OptionChosen {
                node: "d2".into(),
                label: None,
                index: 4,
            },
        };
        assert_eq!(format_history(&chosen), "   2   -> [5] ?");

        let declined = HistoryEntry {
            seq: 3,
            event: HistoryEvent::ItemPresented {
                node: "p1".into(),
                item: None,
            },
        };
        assert_eq!(format_history(&declined), "   3   -> 出示 (无)");
    }

    #[test]
    fn test_parse_option() {
        let waiting = WaitingFor::Option { count: 2 };
        assert_eq!(parse_input(" 2 ", &waiting), Some(DialogueInput::option(1)));
        // 越界编号交给引擎处理（结束对话）
        assert_eq!(parse_input("7", &waiting), Some(DialogueInput::option(6)));
        assert_eq!(parse_input("0", &waiting), None);
        assert_eq!(parse_input("yes", &waiting), None);
    }

    #[test]
    fn test_parse_item_and_continue() {
        assert_eq!(parse_input("", &WaitingFor::Item), Some(DialogueInput::no_item()));
        assert_eq!(parse_input("-", &WaitingFor::Item), Some(DialogueInput::no_item()));
        assert_eq!(
            parse_input(" badge\n", &WaitingFor::Item),
            Some(DialogueInput::item("badge"))
        );
        assert_eq!(
            parse_input("anything", &WaitingFor::Continue),
            Some(DialogueInput::next())
        );
        assert_eq!(parse_input("", &WaitingFor::Nothing), None);
    }

    #[test]
    fn test_parse_timeline_finishes_current() {
        let waiting = WaitingFor::Timeline {
            timeline: "cut_01".to_string(),
        };
        assert_eq!(
            parse_input("", &waiting),
            Some(DialogueInput::timeline_finished("cut_01"))
        );
    }
}
