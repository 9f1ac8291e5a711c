// ==========================================
// 样品导入系统 - 操作员命令行入口
// ==========================================
// 用法:
//   puck-importer <config.json> validate <file> [--report diags.csv]
//   puck-importer <config.json> commit <file>
//   puck-importer <config.json> export <file> <out.xlsx>
//   puck-importer <config.json> holders <file> [--name holder]
//   puck-importer <config.json> plate <file>
//   puck-importer <config.json> lists show|add|remove [list] [name]
//   puck-importer <config.json> pucks
// ==========================================

use anyhow::{anyhow, bail, Context};
use puck_importer::config::{ContainerLists, ImporterConfig, ListKind, ListSource};
use puck_importer::engine::{
    CancelToken, CommitOrchestrator, CommitProgress, CommitSettings, ContainerStore,
};
use puck_importer::importer::{
    export_diagnostics, export_samples, DqValidator, HolderParser, ImportError, ImportSession,
    PlateParser, SheetSet,
};
use puck_importer::{logging, SqliteTrackingClient, ValidationReport};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

const USAGE: &str = "usage: puck-importer <config.json> \
<validate|commit|export|holders|plate|lists|pucks> [args...]";

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // 操作员输入问题原样展示，不作为系统故障记录
            let user_input = e
                .downcast_ref::<ImportError>()
                .map_or(false, ImportError::is_user_input);
            if user_input {
                eprintln!("{}", e);
            } else {
                error!(error = %format!("{:#}", e), "命令执行失败");
                eprintln!("error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> anyhow::Result<()> {
    let (config_path, command, rest) = match args {
        [config, command, rest @ ..] => (config, command.as_str(), rest),
        _ => bail!(USAGE),
    };
    let config = ImporterConfig::load(config_path)?;
    info!(
        version = puck_importer::VERSION,
        config = %config_path,
        command,
        "puck-importer 启动"
    );

    match command {
        "validate" => {
            let file = positional(rest, 0, "file")?;
            let report_path = option_value(rest, "--report").map(PathBuf::from);
            cmd_validate(&config, file, report_path.as_deref())
        }
        "commit" => cmd_commit(&config, positional(rest, 0, "file")?).await,
        "export" => cmd_export(
            &config,
            positional(rest, 0, "file")?,
            positional(rest, 1, "output")?,
        ),
        "holders" => cmd_holders(positional(rest, 0, "file")?, option_value(rest, "--name")),
        "plate" => cmd_plate(positional(rest, 0, "file")?),
        "lists" => cmd_lists(&config, rest),
        "pucks" => cmd_pucks(&config).await,
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }
}

// ==========================================
// 参数辅助
// ==========================================

/// 第 n 个非选项参数（跳过 --flag value 对）
fn positional<'a>(rest: &'a [String], n: usize, name: &str) -> anyhow::Result<&'a str> {
    let mut plain = Vec::new();
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next();
        } else {
            plain.push(arg.as_str());
        }
    }
    plain
        .get(n)
        .copied()
        .ok_or_else(|| anyhow!("missing argument <{}>\n{}", name, USAGE))
}

fn option_value<'a>(rest: &'a [String], flag: &str) -> Option<&'a str> {
    rest.iter()
        .position(|a| a == flag)
        .and_then(|i| rest.get(i + 1))
        .map(String::as_str)
}

fn load_lists(config: &ImporterConfig) -> anyhow::Result<ContainerLists> {
    let (lists, source) = ContainerLists::load(&config.list_path)?;
    if source == ListSource::Missing {
        eprintln!(
            "warning: container list file {} not found, all lists are empty",
            config.list_path.display()
        );
    }
    Ok(lists)
}

fn open_client(config: &ImporterConfig) -> anyhow::Result<Arc<SqliteTrackingClient>> {
    let db_path = config.db_path_str();
    let client = SqliteTrackingClient::new(&db_path)
        .with_context(|| format!("failed to open tracking database {}", db_path))?;
    Ok(Arc::new(client))
}

/// 打开并校验一个样品表批次
fn validated_session(config: &ImporterConfig, file: &str) -> anyhow::Result<ImportSession> {
    let mut session = ImportSession::open(file)?;
    let lists = load_lists(config)?;
    session.validate(&DqValidator::standard(), &lists, &config.toggles());
    Ok(session)
}

fn print_report(report: &ValidationReport) {
    for d in &report.diagnostics {
        println!(
            "row {:>4}  {:<12} {:<8} {}",
            d.row_number + 1,
            d.field.header(),
            d.severity,
            d.message
        );
    }
    println!(
        "{} error(s), {} warning(s)",
        report.error_count(),
        report.warning_count()
    );
}

// ==========================================
// 命令
// ==========================================

fn cmd_validate(
    config: &ImporterConfig,
    file: &str,
    report_path: Option<&Path>,
) -> anyhow::Result<()> {
    let session = validated_session(config, file)?;
    println!(
        "sheet '{}' (header row {}), {} row(s)",
        session.sheet_name,
        session.header_row + 1,
        session.rows.len()
    );
    print_report(&session.report);

    if let Some(path) = report_path {
        export_diagnostics(&session.report, path)?;
        println!("diagnostics written to {}", path.display());
    }

    session.committable_rows()?;
    println!("batch {} is valid", session.batch_id);
    Ok(())
}

async fn cmd_commit(config: &ImporterConfig, file: &str) -> anyhow::Result<()> {
    let session = validated_session(config, file)?;
    let rows = match session.committable_rows() {
        Ok(rows) => rows,
        Err(e) => {
            print_report(&session.report);
            return Err(e.into());
        }
    };

    let client = open_client(config)?;
    let store = Arc::new(ContainerStore::new(client, &config.owner));
    let orchestrator = CommitOrchestrator::new(store, CommitSettings::from(config));

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let progress = |p: &CommitProgress| {
        eprintln!(
            "[{}/{}] ok={} failed={}{}",
            p.processed,
            p.total,
            p.succeeded,
            p.failed,
            if p.cancelled { " (cancelled)" } else { "" }
        );
    };
    let report = orchestrator.commit(rows, &progress, &cancel).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.cancelled {
        bail!(
            "commit cancelled after {} of {} rows; written slots are kept",
            report.processed(),
            report.total
        );
    }
    if report.failure_count() > 0 {
        bail!("{} row(s) failed to commit", report.failure_count());
    }
    Ok(())
}

fn cmd_export(config: &ImporterConfig, file: &str, output: &str) -> anyhow::Result<()> {
    let session = validated_session(config, file)?;
    export_samples(&session.rows, Some(&session.report), output)?;
    println!("{} row(s) written to {}", session.rows.len(), output);
    Ok(())
}

fn cmd_holders(file: &str, override_name: Option<&str>) -> anyhow::Result<()> {
    let mut sheets = SheetSet::open(file)?;
    let segments = HolderParser::parse(&mut sheets, override_name)?;
    println!("{}", serde_json::to_string_pretty(&segments)?);
    Ok(())
}

fn cmd_plate(file: &str) -> anyhow::Result<()> {
    let mut sheets = SheetSet::open(file)?;
    let layouts = PlateParser::parse(&mut sheets)?;
    for layout in &layouts {
        println!(
            "plate '{}': {} well(s) in {} row group(s)",
            layout.sheet_name,
            layout.well_count(),
            layout.groups.len()
        );
        for d in &layout.diagnostics {
            println!("  row {:>4}  {} {}", d.row_number + 1, d.severity, d.message);
        }
    }
    if layouts.iter().any(|l| l.has_errors()) {
        return Err(ImportError::Validation("Duplicate sample names found in plate".to_string()).into());
    }
    Ok(())
}

fn cmd_lists(config: &ImporterConfig, rest: &[String]) -> anyhow::Result<()> {
    let path = &config.list_path;
    let (mut lists, _) = ContainerLists::load(path)?;
    let action = rest.first().map(String::as_str).unwrap_or("show");

    match action {
        "show" => {
            for kind in [ListKind::Whitelist, ListKind::Blacklist, ListKind::Etched] {
                println!("{}: {}", kind, lists.list(kind).join(", "));
            }
            Ok(())
        }
        "add" | "remove" => {
            let kind_arg = positional(rest, 1, "list")?;
            let kind = ListKind::parse(kind_arg)
                .ok_or_else(|| anyhow!("unknown list '{}'", kind_arg))?;
            let name = positional(rest, 2, "name")?;
            let changed = if action == "add" {
                lists.add(kind, name)?
            } else {
                lists.remove(kind, name)
            };
            if changed {
                lists.save(path)?;
                info!(list = %kind, name, action, "容器名单已更新");
            } else {
                println!("{} unchanged", kind);
            }
            Ok(())
        }
        other => bail!("unknown lists action '{}'", other),
    }
}

async fn cmd_pucks(config: &ImporterConfig) -> anyhow::Result<()> {
    let store = ContainerStore::new(open_client(config)?, &config.owner);
    let pucks = store.all_pucks(&config.owner).await?;
    for puck in &pucks {
        println!(
            "{:<20} {:>2}/{:<2} {}",
            puck.name,
            puck.occupied(),
            puck.capacity(),
            puck.modified_time.to_rfc3339()
        );
    }
    println!("{} puck(s)", pucks.len());
    Ok(())
}
