// 条码扫描监控服务: 从 stdin 读取 BarcodeEvent JSON 行，写入主 dewar 槽位。
//
// Usage:
//   puck-monitor <monitor.json> <importer.json>
//
// 每行一个事件，例如 {"sector": 2, "position": "A", "old_value": "", "new_value": "PUCK01"}
// 事件流在 stdin 关闭时结束。

use anyhow::{bail, Context};
use futures::channel::mpsc;
use puck_importer::config::{ImporterConfig, MonitorConfig};
use puck_importer::engine::{BarcodeReconciler, ContainerStore};
use puck_importer::{logging, BarcodeEvent, SqliteTrackingClient};
use std::io::BufRead;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_json();

    let mut args = std::env::args().skip(1);
    let (monitor_path, importer_path) = match (args.next(), args.next()) {
        (Some(m), Some(i)) => (m, i),
        _ => bail!("usage: puck-monitor <monitor.json> <importer.json>"),
    };

    let monitor = MonitorConfig::load(&monitor_path)?;
    let config = ImporterConfig::load(&importer_path)?;
    info!(
        suffix = %monitor.suffix,
        sector = monitor.sector,
        pucks = ?monitor.pucks,
        beamline = %config.beamline_id,
        "扫描监控服务启动"
    );

    let db_path = config.db_path_str();
    let client = SqliteTrackingClient::new(&db_path)
        .with_context(|| format!("failed to open tracking database {}", db_path))?;
    let store = Arc::new(ContainerStore::new(Arc::new(client), &config.owner));
    let mut reconciler = BarcodeReconciler::new(store, monitor, &config.beamline_id);

    let (tx, rx) = mpsc::unbounded::<BarcodeEvent>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for (line_no, line) in stdin.lock().lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!(error = %e, "stdin 读取失败，停止读取");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<BarcodeEvent>(&line) {
                Ok(event) => {
                    if tx.unbounded_send(event).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(line = line_no + 1, error = %e, "无法解析扫描事件"),
            }
        }
    });

    let stats = reconciler.run(rx).await;
    info!(
        events = stats.events,
        applied = stats.applied,
        dropped = stats.dropped,
        "扫描监控服务退出"
    );
    Ok(())
}
