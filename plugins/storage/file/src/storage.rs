use std::collections::VecDeque;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use rowsplit_api::columns::TIMESTAMP_COLUMN;
use rowsplit_api::error::StoreError;
use rowsplit_api::record::RawRecord;
use rowsplit_api::storage::{RecordGroup, RecordGroups, RecordIter, RecordQuery, RecordStore};

use super::config::{FileStoreConfig, GroupPayload};

// ════════════════════════════════════════════════════════════════
//  FileStore
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct FileStore {
    config: FileStoreConfig,
}

impl FileStore {
    pub fn new(config: FileStoreConfig) -> Self {
        Self { config }
    }

    /// Directory holding one table's files.
    fn table_dir(&self, tenant_id: i64, table: &str) -> PathBuf {
        Path::new(&self.config.data_dir)
            .join(tenant_id.to_string())
            .join(table)
    }

    /// `*.jsonl` files of a table, sorted by name.
    fn table_files(&self, tenant_id: i64, table: &str) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.table_dir(tenant_id, table);
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            StoreError::data_access(format!("table directory {}: {e}", dir.display())).caused_by(e)
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| StoreError::io(format!("read dir {}: {e}", dir.display())).caused_by(e))?
                .path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Deal `files` round-robin into `parts` non-empty groups.
fn deal(files: Vec<PathBuf>, parts: usize) -> Vec<Vec<PathBuf>> {
    if files.is_empty() {
        return Vec::new();
    }
    let parts = parts.clamp(1, files.len());
    let mut out = vec![Vec::new(); parts];
    for (i, file) in files.into_iter().enumerate() {
        out[i % parts].push(file);
    }
    out
}

impl RecordStore for FileStore {
    fn list_record_groups(&self, query: &RecordQuery) -> Result<RecordGroups, StoreError> {
        let files = self
            .table_files(query.tenant_id, &query.table)
            .map_err(|e| e.with_context(format!("store '{}'", self.config.name)))?;

        // Offset and limit span the whole table, so they need a single ordered group.
        let parts = if query.offset > 0 || query.limit.is_some() {
            1
        } else {
            query.partition_hint
        };

        let groups = deal(files, parts)
            .into_iter()
            .enumerate()
            .map(|(i, files)| {
                let payload = GroupPayload {
                    files: files.iter().map(|p| p.display().to_string()).collect(),
                    columns: query.columns.clone(),
                    from_ms: query.from_ms,
                    to_ms: query.to_ms,
                    offset: query.offset,
                    limit: query.limit,
                };
                serde_json::to_value(payload).map(|payload| {
                    RecordGroup::new(format!("{}/{}#{i}", query.tenant_id, query.table), payload)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            store = %self.config.name,
            table = %query.table,
            groups = groups.len(),
            "listed record groups"
        );

        Ok(RecordGroups {
            store_name: self.config.name.clone(),
            groups,
        })
    }

    fn read_records(&self, store_name: &str, group: &RecordGroup) -> Result<RecordIter, StoreError> {
        if store_name != self.config.name {
            return Err(StoreError::config(format!(
                "group '{}' belongs to store '{store_name}', not '{}'",
                group.id, self.config.name
            )));
        }
        let payload: GroupPayload = serde_json::from_value(group.payload.clone())
            .map_err(|e| StoreError::format(format!("group '{}': {e}", group.id)).caused_by(e))?;

        for file in &payload.files {
            if !Path::new(file).is_file() {
                return Err(StoreError::data_access(format!("missing file {file}")));
            }
        }

        Ok(Box::new(FileRecordIter::new(payload)))
    }

    fn locations_of(&self, _group: &RecordGroup) -> Result<Vec<String>, StoreError> {
        Ok(self.config.locations.clone())
    }
}

// ════════════════════════════════════════════════════════════════
//  FileRecordIter
// ════════════════════════════════════════════════════════════════

/// Streams the lines of a group's files, one file open at a time.
struct FileRecordIter {
    pending: VecDeque<String>,
    current: Option<(String, std::io::Lines<std::io::BufReader<std::fs::File>>, usize)>,
    columns: Vec<String>,
    from_ms: i64,
    to_ms: i64,
    skip: usize,
    remaining: Option<usize>,
    failed: bool,
}

impl FileRecordIter {
    fn new(payload: GroupPayload) -> Self {
        Self {
            pending: payload.files.into(),
            current: None,
            columns: payload.columns,
            from_ms: payload.from_ms,
            to_ms: payload.to_ms,
            skip: payload.offset,
            remaining: payload.limit,
            failed: false,
        }
    }

    /// Next non-blank line with its file and line number.
    fn next_line(&mut self) -> Result<Option<(String, usize, String)>, StoreError> {
        loop {
            if let Some((path, lines, line_no)) = self.current.as_mut() {
                match lines.next() {
                    Some(Ok(line)) => {
                        *line_no += 1;
                        if line.trim().is_empty() {
                            continue;
                        }
                        return Ok(Some((path.clone(), *line_no, line)));
                    }
                    Some(Err(e)) => return Err(StoreError::io(format!("read {path}: {e}")).caused_by(e)),
                    None => self.current = None,
                }
            }

            let Some(path) = self.pending.pop_front() else {
                return Ok(None);
            };
            let file = std::fs::File::open(&path)
                .map_err(|e| StoreError::data_access(format!("open {path}: {e}")).caused_by(e))?;
            self.current = Some((path, std::io::BufReader::new(file).lines(), 0));
        }
    }

    fn in_range(&self, record: &RawRecord) -> bool {
        match record.get(TIMESTAMP_COLUMN).and_then(|v| v.as_i64()) {
            Some(ts) => ts >= self.from_ms && ts <= self.to_ms,
            None => true,
        }
    }

    fn next_record(&mut self) -> Result<Option<RawRecord>, StoreError> {
        if self.remaining == Some(0) {
            return Ok(None);
        }
        while let Some((path, line_no, line)) = self.next_line()? {
            let value: serde_json::Value = serde_json::from_str(&line)
                .map_err(|e| StoreError::format(format!("{path}:{line_no}: {e}")).caused_by(e))?;
            let serde_json::Value::Object(map) = value else {
                return Err(StoreError::format(format!("{path}:{line_no}: expected a JSON object")));
            };
            let record = RawRecord::from(map);
            if !self.in_range(&record) {
                continue;
            }
            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }
            if let Some(n) = self.remaining.as_mut() {
                *n -= 1;
            }
            return Ok(Some(record.project(&self.columns)));
        }
        Ok(None)
    }
}

impl Iterator for FileRecordIter {
    type Item = Result<RawRecord, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
