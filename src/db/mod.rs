mod schema;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::export::{document, DiagnosticRecord, FeatureRecord, ModelDocument, NodeRecord};
use crate::models::*;

/// SQLite-backed store of feature model snapshots.
pub struct ModelStore {
    conn: Arc<Mutex<Connection>>,
}

impl ModelStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "feature-lens")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("models.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Snapshot operations
    // ============================================================

    /// Persist `model` as a new snapshot.
    pub fn save_snapshot(&self, input: CreateSnapshotInput, model: &FeatureModel) -> Result<Snapshot> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let doc = document(model);

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO snapshots (id, label, source, node_count, diagnostic_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.label,
                &input.source,
                doc.nodes.len() as i64,
                doc.diagnostics.len() as i64,
                now.to_rfc3339(),
            ),
        )?;

        let positions: HashMap<NodeKey, usize> = doc
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.key(), i))
            .collect();

        for (i, node) in doc.nodes.iter().enumerate() {
            tx.execute(
                "INSERT INTO nodes (snapshot_id, position, name, granularity) VALUES (?, ?, ?, ?)",
                (id.to_string(), i as i64, &node.name, node.granularity.as_str()),
            )?;
            for (j, member) in node.member_elements.iter().enumerate() {
                tx.execute(
                    "INSERT INTO node_members (snapshot_id, node_position, position, qualified_name)
                     VALUES (?, ?, ?, ?)",
                    (id.to_string(), i as i64, j as i64, member),
                )?;
            }
            for (j, child) in node.children.iter().enumerate() {
                let child_position = positions
                    .get(child)
                    .ok_or_else(|| anyhow::anyhow!("Edge to unknown node {}", child))?;
                tx.execute(
                    "INSERT INTO edges (snapshot_id, parent_position, position, child_position)
                     VALUES (?, ?, ?, ?)",
                    (id.to_string(), i as i64, j as i64, *child_position as i64),
                )?;
            }
        }

        for (i, feature) in doc.features.iter().enumerate() {
            tx.execute(
                "INSERT INTO features (snapshot_id, position, element, name, description, feature_type)
                 VALUES (?, ?, ?, ?, ?, ?)",
                (
                    id.to_string(),
                    i as i64,
                    &feature.element,
                    &feature.name,
                    &feature.description,
                    feature.feature_type.as_str(),
                ),
            )?;
        }

        for (i, diagnostic) in doc.diagnostics.iter().enumerate() {
            tx.execute(
                "INSERT INTO diagnostics (snapshot_id, position, kind, severity, message, elements)
                 VALUES (?, ?, ?, ?, ?, ?)",
                (
                    id.to_string(),
                    i as i64,
                    diagnostic.kind.as_str(),
                    diagnostic.severity.as_str(),
                    &diagnostic.message,
                    serde_json::to_string(&diagnostic.elements)?,
                ),
            )?;
        }

        tx.commit()?;
        tracing::info!("Saved snapshot {} ({})", id, input.label);

        Ok(Snapshot {
            id,
            label: input.label,
            source: input.source,
            node_count: doc.nodes.len(),
            diagnostic_count: doc.diagnostics.len(),
            created_at: now,
        })
    }

    pub fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, label, source, node_count, diagnostic_count, created_at
             FROM snapshots ORDER BY created_at, rowid",
        )?;

        let snapshots = stmt
            .query_map([], row_to_snapshot)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(snapshots)
    }

    pub fn get_snapshot(&self, id: Uuid) -> Result<Option<Snapshot>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let snapshot = conn
            .query_row(
                "SELECT id, label, source, node_count, diagnostic_count, created_at
                 FROM snapshots WHERE id = ?",
                [id.to_string()],
                row_to_snapshot,
            )
            .optional()?;
        Ok(snapshot)
    }

    pub fn delete_snapshot(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM snapshots WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    /// Rebuild the exported document for a snapshot, in the order it was saved.
    pub fn load_document(&self, id: Uuid) -> Result<Option<ModelDocument>> {
        if self.get_snapshot(id)?.is_none() {
            return Ok(None);
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let snapshot_id = id.to_string();

        let mut stmt = conn.prepare(
            "SELECT name, granularity FROM nodes WHERE snapshot_id = ? ORDER BY position",
        )?;
        let raw_nodes = stmt
            .query_map([&snapshot_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut nodes = Vec::with_capacity(raw_nodes.len());
        for (name, granularity) in raw_nodes {
            nodes.push(NodeRecord {
                name,
                granularity: parse_enum(&granularity, Granularity::from_str)?,
                member_elements: Vec::new(),
                children: Vec::new(),
            });
        }

        let mut stmt = conn.prepare(
            "SELECT node_position, qualified_name FROM node_members
             WHERE snapshot_id = ? ORDER BY node_position, position",
        )?;
        let members = stmt
            .query_map([&snapshot_id], |row| {
                Ok((row.get::<_, i64>(0)? as usize, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (node_position, qualified_name) in members {
            if let Some(node) = nodes.get_mut(node_position) {
                node.member_elements.push(qualified_name);
            }
        }

        let mut stmt = conn.prepare(
            "SELECT parent_position, child_position FROM edges
             WHERE snapshot_id = ? ORDER BY parent_position, position",
        )?;
        let edges = stmt
            .query_map([&snapshot_id], |row| {
                Ok((row.get::<_, i64>(0)? as usize, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (parent, child) in edges {
            let child_key = nodes
                .get(child)
                .map(NodeRecord::key)
                .ok_or_else(|| anyhow::anyhow!("Stored edge points at missing node {}", child))?;
            if let Some(node) = nodes.get_mut(parent) {
                node.children.push(child_key);
            }
        }

        let mut stmt = conn.prepare(
            "SELECT element, name, description, feature_type FROM features
             WHERE snapshot_id = ? ORDER BY position",
        )?;
        let raw_features = stmt
            .query_map([&snapshot_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let mut features = Vec::with_capacity(raw_features.len());
        for (element, name, description, feature_type) in raw_features {
            features.push(FeatureRecord {
                element,
                name,
                description,
                feature_type: parse_enum(&feature_type, FeatureType::from_str)?,
            });
        }

        let mut stmt = conn.prepare(
            "SELECT kind, severity, message, elements FROM diagnostics
             WHERE snapshot_id = ? ORDER BY position",
        )?;
        let raw_diagnostics = stmt
            .query_map([&snapshot_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let mut diagnostics = Vec::with_capacity(raw_diagnostics.len());
        for (kind, severity, message, elements) in raw_diagnostics {
            diagnostics.push(DiagnosticRecord {
                kind: parse_enum(&kind, DiagnosticKind::from_str)?,
                severity: parse_enum(&severity, Severity::from_str)?,
                message,
                elements: serde_json::from_str(&elements)?,
            });
        }

        Ok(Some(ModelDocument {
            nodes,
            features,
            diagnostics,
        }))
    }
}

impl Clone for ModelStore {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn row_to_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<Snapshot> {
    Ok(Snapshot {
        id: parse_uuid(row.get::<_, String>(0)?),
        label: row.get(1)?,
        source: row.get(2)?,
        node_count: row.get::<_, i64>(3)? as usize,
        diagnostic_count: row.get::<_, i64>(4)? as usize,
        created_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn parse_enum<T>(s: &str, parse: fn(&str) -> Option<T>) -> Result<T> {
    parse(s).ok_or_else(|| anyhow::anyhow!("Unrecognized stored value '{}'", s))
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
