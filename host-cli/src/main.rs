//! # dialogue-cli
//!
//! 无界面的终端宿主：从 JSON 加载对话图和世界种子，通过标准输入输出驱动对话，
//! 一次性节点的完成记录写入存档目录。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p host-cli -- play assets/dialogue/village_gate.json
//! cargo run -p host-cli -- play assets/dialogue/village_gate.json --world assets/world.json --history
//! cargo run -p host-cli -- check
//! cargo run -p host-cli -- reset
//! cargo run -p host-cli -- init-config
//! ```
//!
//! 对话进行中输入 `:log` 查看回看记录，`:q` 中止对话。

mod config;
mod store;
mod terminal;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use dialogue_runtime::{
    DialogueGraph, DialogueRunner, MemoryWorld, Services, StartOutcome, WorldState, analyze_graph,
};
use tracing::{Level, info, warn};
use walkdir::WalkDir;

use config::AppConfig;
use store::FileCompletionStore;
use terminal::{TerminalPresenter, format_history, parse_input, prompt};

#[derive(Parser)]
#[command(name = "dialogue-cli")]
#[command(about = "分支对话图的终端运行器")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（默认：config.json）
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// 日志级别，覆盖配置文件
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// 存档目录，覆盖配置文件
    #[arg(long, global = true)]
    saves_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行对话图
    Play {
        /// 对话图 JSON
        graph: PathBuf,

        /// 世界种子 JSON（物品、标记、变量、任务）
        #[arg(short, long)]
        world: Option<PathBuf>,

        /// 结束后打印回看记录
        #[arg(long)]
        history: bool,
    },

    /// 静态检查对话图
    ///
    /// 不带参数时检查配置中的对话图目录。
    Check {
        /// 对话图文件
        path: Option<PathBuf>,
    },

    /// 清空一次性节点的完成记录
    Reset,

    /// 写出默认配置文件
    InitConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config);
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(saves_dir) = &cli.saves_dir {
        config.saves_dir = saves_dir.clone();
    }

    // 日志级别无效时直接报错，不静默降级
    init_tracing(config.log_level()?);

    match cli.command {
        Commands::Play {
            graph,
            world,
            history,
        } => {
            config.validate()?;
            let world = world.or_else(|| config.world_seed_full_path());
            play(&config, &graph, world.as_deref(), history || config.show_history)
        }
        Commands::Check { path } => match path {
            Some(path) => check(&[path]),
            None => check(&collect_graph_files(&config.dialogue_full_path())?),
        },
        Commands::Reset => {
            let mut store = FileCompletionStore::open(&config.saves_dir)?;
            if store.is_empty() {
                println!("没有完成记录");
            } else {
                let count = store.len();
                store.reset()?;
                println!("已清空 {} 条完成记录", count);
            }
            Ok(())
        }
        Commands::InitConfig => {
            if cli.config.exists() {
                anyhow::bail!("配置文件已存在: {}", cli.config.display());
            }
            AppConfig::default().save(&cli.config)?;
            println!("已写出默认配置: {}", cli.config.display());
            Ok(())
        }
    }
}

fn init_tracing(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

//=============================================================================
// play
//=============================================================================

fn play(
    config: &AppConfig,
    graph_path: &Path,
    world_path: Option<&Path>,
    show_history: bool,
) -> anyhow::Result<()> {
    let graph = load_graph(graph_path)?;
    for diagnostic in analyze_graph(&graph).diagnostics {
        warn!("{}", diagnostic);
    }

    let world = match world_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("无法读取世界种子: {}", path.display()))?;
            let state: WorldState = serde_json::from_str(&json)
                .with_context(|| format!("世界种子格式错误: {}", path.display()))?;
            MemoryWorld::from_state(state)
        }
        None => MemoryWorld::new(),
    };

    let store = FileCompletionStore::open(&config.saves_dir)?;
    let mut runner = DialogueRunner::new(graph)
        .with_config(config.runner.clone())
        .with_presenter(TerminalPresenter::new(io::stdout()))
        .with_store(store)
        .with_services(world.install(Services::new()));

    if runner.start_dialogue()? == StartOutcome::AlreadyCompleted {
        println!("这段对话已经完成过了");
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while runner.is_active() {
        let waiting = runner.waiting();
        print!("{}", prompt(&waiting));
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            info!("输入结束，中止对话");
            runner.end_dialogue();
            break;
        };
        let line = line?;

        match line.trim() {
            ":q" => {
                runner.end_dialogue();
                break;
            }
            ":log" => {
                for entry in runner.history().entries() {
                    println!("{}", format_history(entry));
                }
                continue;
            }
            _ => {}
        }

        match parse_input(&line, &waiting) {
            Some(input) => {
                runner.handle_input(input)?;
            }
            None => println!("无法识别的输入: {}", line.trim()),
        }
    }

    if show_history {
        println!();
        for entry in runner.history().entries() {
            println!("{}", format_history(entry));
        }
    }

    for effect in world.effects() {
        info!(?effect, "世界变化");
    }

    Ok(())
}

fn load_graph(path: &Path) -> anyhow::Result<DialogueGraph> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("无法读取对话图: {}", path.display()))?;
    DialogueGraph::from_json(&json).with_context(|| format!("对话图格式错误: {}", path.display()))
}

//=============================================================================
// check
//=============================================================================

/// 递归收集目录下的 JSON 文件
fn collect_graph_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("无法读取目录: {}", dir.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

fn check(files: &[PathBuf]) -> anyhow::Result<()> {
    let mut errors = 0;
    let mut warnings = 0;

    for file in files {
        let graph = match load_graph(file) {
            Ok(graph) => graph,
            Err(e) => {
                println!("[ERROR] {:#}", e);
                errors += 1;
                continue;
            }
        };

        let result = analyze_graph(&graph);
        for diagnostic in &result.diagnostics {
            println!("{}", diagnostic);
        }
        errors += result.error_count();
        warnings += result.warn_count();
    }

    println!("检查完成: {} 个对话图, {} 个错误, {} 个警告", files.len(), errors, warnings);
    if errors > 0 {
        anyhow::bail!("对话图检查发现错误");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_runtime::{DialogueInput, RecordingPresenter, WaitingFor, WorldEffect};

    fn asset(path: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../assets").join(path)
    }

    #[test]
    fn test_sample_graph_is_clean() {
        let graph = load_graph(&asset("dialogue/village_gate.json")).unwrap();
        let result = analyze_graph(&graph);
        assert!(result.is_empty(), "{:?}", result.diagnostics);
        assert!(check(&[asset("dialogue/village_gate.json")]).is_ok());
    }

    #[test]
    fn test_sample_graph_letter_route() {
        let graph = load_graph(&asset("dialogue/village_gate.json")).unwrap();
        let json = fs::read_to_string(asset("world.json")).unwrap();
        let world = MemoryWorld::from_state(serde_json::from_str(&json).unwrap());
        let presenter = RecordingPresenter::new();
        let dir = tempfile::tempdir().unwrap();

        let mut runner = DialogueRunner::new(graph)
            .with_presenter(presenter.clone())
            .with_store(FileCompletionStore::open(dir.path()).unwrap())
            .with_services(world.install(Services::new()));

        assert_eq!(runner.start_dialogue(), Ok(StartOutcome::Started));
        assert_eq!(runner.handle_input(DialogueInput::next()), Ok(WaitingFor::Option { count: 3 }));
        assert_eq!(runner.handle_input(DialogueInput::option(0)), Ok(WaitingFor::Item));
        assert_eq!(
            runner.handle_input(DialogueInput::item("letter")),
            Ok(WaitingFor::Continue)
        );
        assert_eq!(
            presenter.last_text().as_deref(),
            Some("A letter from the mayor. Fine, but keep out of trouble.")
        );
        runner.next().unwrap();
        assert_eq!(runner.current_node().map(|id| id.as_str()), Some("farewell"));
        runner.next().unwrap();

        assert!(!runner.is_active());
        assert_eq!(world.effects(), vec![WorldEffect::ItemGiven("gate_pass".into())]);
        assert_eq!(FileCompletionStore::open(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_check_reports_broken_document() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.json");
        fs::write(&broken, r#"{ "name": "x", "start": "missing", "nodes": [] }"#).unwrap();
        assert!(check(&[broken]).is_err());
        assert_eq!(collect_graph_files(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_collect_graph_files_recurses() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("chapter1/side")).unwrap();
        fs::write(dir.path().join("top.json"), "{}").unwrap();
        fs::write(dir.path().join("chapter1/side/nested.json"), "{}").unwrap();
        fs::write(dir.path().join("chapter1/notes.txt"), "").unwrap();

        let files = collect_graph_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("chapter1/side/nested.json"),
                dir.path().join("top.json"),
            ]
        );
        assert!(collect_graph_files(&dir.path().join("missing")).is_err());
    }
}
