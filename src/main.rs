use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use block_attr_editor::editor::FileProgress;
use block_attr_editor::io::{DefaultBlockScanner, DefaultBlockWriter, DefaultLockProbe};
use block_attr_editor::{AttributeChange, AttributeEditor, EditorConfig, RevertTarget, TargetFiles};

#[derive(Parser)]
#[command(name = "block_attr_editor")]
#[command(about = "批量编辑多个文件中的块属性，审阅后统一保存")]
#[command(version)]
struct Cli {
    /// 输入块文件路径（可重复）
    #[arg(short, long, required = true)]
    input: Vec<PathBuf>,

    /// 配置文件（JSON）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 单元格编辑列表（JSON 文件）
    #[arg(long)]
    edits: Option<PathBuf>,

    /// 批量应用：BLOCK:TAG=VALUE（作用于所有已加载文件，可重复）
    #[arg(long)]
    apply: Vec<String>,

    /// 撤回某块名的所有修改（可重复）
    #[arg(long)]
    revert_block: Vec<String>,

    /// 从工作集中移除文件（可重复）
    #[arg(long)]
    remove: Vec<PathBuf>,

    /// 只显示待保存修改，不写入
    #[arg(long)]
    dry_run: bool,

    /// 显示统计信息
    #[arg(long)]
    stats: bool,

    /// 将待保存修改写入 JSON 报告
    #[arg(long)]
    report: Option<PathBuf>,

    /// 静默模式(仅输出错误)
    #[arg(long)]
    quiet: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

/// 单元格编辑
#[derive(Debug, Deserialize)]
struct CellEdit {
    file: String,
    instance_id: String,
    tag: String,
    value: String,
}

/// 批量应用规则
#[derive(Debug, PartialEq)]
struct ApplyRule {
    block_name: String,
    tag: String,
    value: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = load_config(&cli)?;
    let mut editor = AttributeEditor::new(Box::new(DefaultBlockScanner), &config);

    load_inputs(&cli, &mut editor);
    apply_operations(&cli, &mut editor)?;

    if cli.stats {
        println!("{}", editor.stats());
    }

    let pending = editor.pending_changes();
    if let Some(report_path) = &cli.report {
        save_report(&pending, report_path)?;
    }

    if !cli.quiet {
        print_pending_summary(&pending);
    }

    if cli.dry_run || pending.is_empty() {
        return Ok(());
    }

    save_changes(&cli, &config, &mut editor)
}

/// 初始化日志
fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// 加载配置
fn load_config(cli: &Cli) -> Result<EditorConfig> {
    match &cli.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("读取配置文件失败: {:?}", path)),
        None => Ok(EditorConfig::default()),
    }
}

/// 加载输入文件
fn load_inputs(cli: &Cli, editor: &mut AttributeEditor) {
    let files: Vec<String> = cli
        .input
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect();

    let quiet = cli.quiet;
    let report = editor.load_files(&files, &mut |progress: &FileProgress| {
        if !quiet {
            println!("[{}/{}] 扫描 {}", progress.processed, progress.total, progress.current_file);
        }
    });

    for error in &report.errors {
        eprintln!("警告: 无法扫描 {}: {}", error.file_path, error.message);
    }
}

/// 按固定顺序执行操作：单元格编辑、批量应用、撤回、移除
fn apply_operations(cli: &Cli, editor: &mut AttributeEditor) -> Result<()> {
    if let Some(edits_path) = &cli.edits {
        let edits = load_edits(edits_path)?;
        let mut applied = 0;
        for edit in &edits {
            if editor.edit_cell(&edit.file, &edit.instance_id, &edit.tag, &edit.value) {
                applied += 1;
            }
        }
        if !cli.quiet {
            println!("单元格编辑: {} / {} 条生效", applied, edits.len());
        }
    }

    for rule in &cli.apply {
        let rule = parse_apply_rule(rule)?;
        let changed = editor.apply_similar(&rule.block_name, &rule.tag, &rule.value, &TargetFiles::AllLoaded);
        if !cli.quiet {
            println!("批量应用 {}.{} = \"{}\": {} 处变化", rule.block_name, rule.tag, rule.value, changed);
        }
    }

    for block_name in &cli.revert_block {
        let reverted = editor.revert(&RevertTarget::Block(block_name.clone()));
        if !cli.quiet {
            println!("撤回块 {}: {} 处", block_name, reverted);
        }
    }

    if !cli.remove.is_empty() {
        let files: Vec<String> = cli
            .remove
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        if !editor.remove_files(&files) && !cli.quiet {
            println!("提示: 要移除的文件不在工作集中");
        }
    }

    Ok(())
}

/// 加载单元格编辑列表
fn load_edits(path: &PathBuf) -> Result<Vec<CellEdit>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("读取编辑文件失败: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("解析编辑文件失败: {:?}", path))
}

/// 解析 BLOCK:TAG=VALUE
fn parse_apply_rule(text: &str) -> Result<ApplyRule> {
    let Some((target, value)) = text.split_once('=') else {
        bail!("批量应用格式错误（应为 BLOCK:TAG=VALUE）: {}", text);
    };
    let Some((block_name, tag)) = target.split_once(':') else {
        bail!("批量应用格式错误（应为 BLOCK:TAG=VALUE）: {}", text);
    };
    if block_name.trim().is_empty() || tag.trim().is_empty() {
        bail!("块名和标签不能为空: {}", text);
    }

    Ok(ApplyRule {
        block_name: block_name.trim().to_string(),
        tag: tag.trim().to_string(),
        value: value.to_string(),
    })
}

/// 将待保存修改写入 JSON 报告
fn save_report(pending: &[AttributeChange], path: &PathBuf) -> Result<()> {
    let json_output = serde_json::to_string_pretty(pending).context("序列化JSON失败")?;
    std::fs::write(path, json_output).with_context(|| format!("写入报告失败: {:?}", path))
}

/// 打印待保存修改摘要
fn print_pending_summary(pending: &[AttributeChange]) {
    println!("待保存修改: {} 处", pending.len());
    for (i, change) in pending.iter().take(10).enumerate() {
        println!("{}. {}", i + 1, change);
    }
    if pending.len() > 10 {
        println!("... 还有 {} 处修改", pending.len() - 10);
    }
}

/// 保存修改
fn save_changes(cli: &Cli, config: &EditorConfig, editor: &mut AttributeEditor) -> Result<()> {
    let writer = DefaultBlockWriter::new(config.backup_before_save);
    let lock_probe = DefaultLockProbe::new(config.lock_suffix.clone());

    let quiet = cli.quiet;
    let result = editor
        .save(&writer, &lock_probe, &mut |progress: &FileProgress| {
            if !quiet {
                println!("[{}/{}] 保存 {}", progress.processed, progress.total, progress.current_file);
            }
        }, None)
        .context("保存失败")?;

    if !quiet || !result.is_success() {
        println!("{}", result);
    }

    if result.failed_files > 0 {
        bail!("{} 个文件保存失败", result.failed_files);
    }

    Ok(())
}
