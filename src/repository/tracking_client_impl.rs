// ==========================================
// 样品导入系统 - 跟踪服务客户端 SQLite 实现
// ==========================================
// 职责: TrackingClient 的本地实现（rusqlite）
// 存储: containers / samples / beamline_info
// content 列以 JSON 数组保存槽位
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::container::{
    Container, ContainerFilter, NewContainer, NewSample, Sample, SampleFilter,
};
use crate::domain::types::ContainerKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::tracking_client::TrackingClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

// ==========================================
// SqliteTrackingClient
// ==========================================
#[derive(Clone)]
pub struct SqliteTrackingClient {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTrackingClient {
    /// 打开数据库文件并建表
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（会执行幂等建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 内存数据库
    pub fn in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

type ContainerRow = (String, String, String, String, String, DateTime<Utc>);

fn to_container(row: ContainerRow) -> RepositoryResult<Container> {
    let (uid, name, owner, kind, content, modified_time) = row;
    Ok(Container {
        uid,
        name,
        owner,
        kind: ContainerKind::parse(&kind),
        content: serde_json::from_str(&content)?,
        modified_time,
    })
}

#[async_trait]
impl TrackingClient for SqliteTrackingClient {
    async fn find_containers(&self, filter: &ContainerFilter) -> RepositoryResult<Vec<Container>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT uid, name, owner, kind, content, modified_time
            FROM containers
            WHERE (?1 IS NULL OR uid = ?1)
              AND (?2 IS NULL OR name = ?2)
              AND (?3 IS NULL OR kind = ?3)
              AND (?4 IS NULL OR owner = ?4)
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![
                    filter.uid,
                    filter.name,
                    filter.kind.as_ref().map(|k| k.as_str().to_string()),
                    filter.owner,
                ],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )?
            .collect::<Result<Vec<ContainerRow>, _>>()?;

        rows.into_iter().map(to_container).collect()
    }

    async fn create_container(&self, fields: NewContainer) -> RepositoryResult<String> {
        let uid = Uuid::new_v4().to_string();
        let content = serde_json::to_string(&vec![String::new(); fields.capacity])?;
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO containers (uid, name, owner, kind, content, modified_time)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                uid,
                fields.name,
                fields.owner,
                fields.kind.as_str(),
                content,
                Utc::now(),
            ],
        )?;
        debug!(uid = %uid, name = %fields.name, kind = %fields.kind, "容器已创建");
        Ok(uid)
    }

    async fn update_container(&self, uid: &str, content: &[String]) -> RepositoryResult<String> {
        let encoded = serde_json::to_string(content)?;
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE containers SET content = ?1, modified_time = ?2 WHERE uid = ?3",
            params![encoded, Utc::now(), uid],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Container".to_string(),
                id: uid.to_string(),
            });
        }
        Ok(uid.to_string())
    }

    async fn find_samples(&self, filter: &SampleFilter) -> RepositoryResult<Vec<Sample>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT uid, name, owner, kind, proposal_id, request_count, model, sequence
            FROM samples
            WHERE (?1 IS NULL OR uid = ?1)
              AND (?2 IS NULL OR name = ?2)
              AND (?3 IS NULL OR owner = ?3)
              AND (?4 IS NULL OR proposal_id = ?4)
            ORDER BY rowid
            "#,
        )?;

        let samples = stmt
            .query_map(
                params![filter.uid, filter.name, filter.owner, filter.proposal_id],
                |row| {
                    Ok(Sample {
                        uid: row.get(0)?,
                        name: row.get(1)?,
                        owner: row.get(2)?,
                        kind: row.get(3)?,
                        proposal_id: row.get(4)?,
                        request_count: row.get(5)?,
                        model: row.get(6)?,
                        sequence: row.get(7)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(samples)
    }

    async fn create_sample(&self, fields: NewSample) -> RepositoryResult<String> {
        let uid = Uuid::new_v4().to_string();
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO samples (uid, name, owner, kind, proposal_id, request_count, model, sequence, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8)
            "#,
            params![
                uid,
                fields.name,
                fields.owner,
                fields.kind,
                fields.proposal_id,
                fields.model,
                fields.sequence,
                Utc::now(),
            ],
        )?;
        debug!(uid = %uid, name = %fields.name, "样品已创建");
        Ok(uid)
    }

    async fn find_config(
        &self,
        beamline_id: &str,
        info_name: &str,
    ) -> RepositoryResult<Option<Value>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT info FROM beamline_info WHERE beamline_id = ?1 AND info_name = ?2",
                params![beamline_id, info_name],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|s| serde_json::from_str(&s).map_err(RepositoryError::from))
            .transpose()
    }

    async fn update_config(
        &self,
        beamline_id: &str,
        info_name: &str,
        info: Value,
    ) -> RepositoryResult<()> {
        let encoded = serde_json::to_string(&info)?;
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO beamline_info (beamline_id, info_name, info)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (beamline_id, info_name) DO UPDATE SET info = excluded.info
            "#,
            params![beamline_id, info_name, encoded],
        )?;
        Ok(())
    }
}
