//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-runtime`: 运行 dialogue-runtime 覆盖率
//! - `cov-workspace`: 运行 workspace 覆盖率
//! - `graph-check`: 检查对话图文件（格式、引用、可达性）

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use dialogue_runtime::{DialogueGraph, DiagnosticResult, analyze_graph, repair_graph};
use walkdir::WalkDir;

fn run(step: &str, cmd: &mut Command) -> anyhow::Result<()> {
    eprintln!("\n==> {step}");
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("{step} failed with {status}");
    }
    Ok(())
}

fn ensure_cargo_llvm_cov_available() -> anyhow::Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args(["llvm-cov", "--version"]);
    match cmd.status() {
        Ok(s) if s.success() => Ok(()),
        _ => anyhow::bail!(
            "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
        ),
    }
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    match sub.as_str() {
        "check-all" => {
            let mut fmt = Command::new("cargo");
            fmt.args(["fmt", "--all", "--", "--check"]);
            run("cargo fmt --all -- --check", &mut fmt)?;

            let mut clippy = Command::new("cargo");
            clippy.args(["clippy", "--workspace", "--all-targets"]);
            run("cargo clippy --workspace --all-targets", &mut clippy)?;

            let mut test = Command::new("cargo");
            test.args(["test", "--workspace"]);
            run("cargo test --workspace", &mut test)?;
        }
        "cov-runtime" => {
            ensure_cargo_llvm_cov_available()?;

            let mut cov = Command::new("cargo");
            cov.args(["llvm-cov", "-p", "dialogue-runtime", "--all-features", "--html"]);
            run(
                "cargo llvm-cov -p dialogue-runtime --all-features --html",
                &mut cov,
            )?;

            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "cov-workspace" => {
            ensure_cargo_llvm_cov_available()?;

            // 排除 xtask，只统计运行时与宿主
            let mut cov = Command::new("cargo");
            cov.args([
                "llvm-cov",
                "--workspace",
                "--exclude",
                "xtask",
                "--all-features",
                "--html",
            ]);
            run(
                "cargo llvm-cov --workspace --exclude xtask --all-features --html",
                &mut cov,
            )?;

            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "graph-check" => {
            let path = args.next();
            graph_check(path.as_deref())?;
        }
        "help" | "-h" | "--help" => {
            print_help();
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo run -p xtask -- <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查
  cov-runtime     运行 dialogue-runtime 覆盖率报告
  cov-workspace   运行 workspace 覆盖率报告
  graph-check     检查对话图文件

GRAPH-CHECK:
  cargo run -p xtask -- graph-check [path]

  不带参数：检查 assets/dialogue/ 下所有 .json 文件
  带路径参数：检查指定文件或目录

  检查内容：
    - 文档格式错误
    - 起始节点缺失、悬空引用、重复 id
    - 选项平行数组长度不一致（会报告修复结果）
    - 从起始节点不可达的节点
"#
    );
}

//=============================================================================
// graph-check 命令实现
//=============================================================================

/// 默认的对话图目录（相对于 workspace root）
const DEFAULT_DIALOGUE_DIR: &str = "assets/dialogue";

/// 检查结果
#[derive(Default)]
struct GraphCheckResult {
    /// 检查的文件数量
    graphs_checked: usize,
    /// 解析错误数量
    parse_errors: usize,
    /// 需要修复的选项节点数量
    repaired_nodes: usize,
    /// 诊断结果
    diagnostics: DiagnosticResult,
}

/// 执行对话图检查
fn graph_check(path: Option<&str>) -> anyhow::Result<()> {
    let files = match path {
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                collect_graph_files(&path)
            } else {
                anyhow::bail!("路径不存在: {}", p);
            }
        }
        None => {
            let dir = Path::new(DEFAULT_DIALOGUE_DIR);
            if !dir.exists() {
                anyhow::bail!(
                    "默认对话图目录不存在: {}\n请在 workspace 根目录运行，或指定路径",
                    dir.display()
                );
            }
            collect_graph_files(dir)
        }
    };

    if files.is_empty() {
        eprintln!("未找到对话图文件（.json）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个对话图...\n", files.len());

    let mut result = GraphCheckResult::default();
    for file in &files {
        check_graph_file(file, &mut result);
    }

    print_check_result(&result);

    if result.parse_errors > 0 || result.diagnostics.has_errors() {
        anyhow::bail!("对话图检查发现错误");
    }

    Ok(())
}

/// 递归收集目录下的 JSON 文件
fn collect_graph_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

/// 检查单个对话图文件
fn check_graph_file(file: &Path, result: &mut GraphCheckResult) {
    let file_id = file.display().to_string();
    result.graphs_checked += 1;

    let content = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[ERROR] {}: 无法读取文件 - {}", file_id, e);
            result.parse_errors += 1;
            return;
        }
    };

    let mut graph = match DialogueGraph::from_json(&content) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("[ERROR] {}: {}", file_id, e);
            result.parse_errors += 1;
            return;
        }
    };

    // 先诊断原始文档，再演练修复
    result.diagnostics.merge(analyze_graph(&graph));

    for report in repair_graph(&mut graph) {
        result.repaired_nodes += 1;
        for fix in &report.fixes {
            eprintln!(
                "[FIX] {}#{}: {} {} -> {}",
                file_id, report.node, fix.field, fix.before, fix.after
            );
        }
    }
}

/// 输出检查结果
fn print_check_result(result: &GraphCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个对话图", result.graphs_checked);
    eprintln!();

    for diag in &result.diagnostics.diagnostics {
        eprintln!("{}", diag);
    }

    let error_count = result.parse_errors + result.diagnostics.error_count();
    let warn_count = result.diagnostics.warn_count();

    eprintln!();
    if result.repaired_nodes > 0 {
        eprintln!("🔧 {} 个选项节点的数组需要对齐", result.repaired_nodes);
    }
    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}
