use crate::error::{Result, VocabError};
use crate::index::IndexTables;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Files derived from the configured index path.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    index: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(index_file: P) -> Self {
        Self { index: index_file.as_ref().to_path_buf() }
    }
    /// Canonical bincode snapshot.
    pub fn index(&self) -> &Path { &self.index }
    pub fn temp(&self) -> PathBuf { with_suffix(&self.index, ".tmp") }
    /// Pretty JSON mirror for inspection and as a decode fallback.
    pub fn mirror(&self) -> PathBuf { with_suffix(&self.index, ".json") }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Write the snapshot to a temp file and rename it over the index, then
/// refresh the JSON mirror. Mirror failures are logged only.
pub fn save_snapshot(paths: &IndexPaths, tables: &IndexTables) -> Result<()> {
    if let Some(parent) = paths.index().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| VocabError::io(parent, e))?;
        }
    }

    let bytes = bincode::serialize(tables).map_err(|e| VocabError::Encode(e.to_string()))?;
    let tmp = paths.temp();
    if let Err(e) = write_synced(&tmp, &bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(VocabError::io(&tmp, e));
    }
    if let Err(e) = fs::rename(&tmp, paths.index()) {
        let _ = fs::remove_file(&tmp);
        return Err(VocabError::io(paths.index(), e));
    }

    let mirror = paths.mirror();
    if let Err(err) = save_mirror(&mirror, tables) {
        tracing::warn!(path = %mirror.display(), %err, "failed to write JSON mirror");
    }

    tracing::debug!(
        path = %paths.index().display(),
        bytes = bytes.len(),
        documents = tables.doc_to_terms.len(),
        terms = tables.term_to_docs.len(),
        "saved vocabulary snapshot"
    );
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(bytes)?;
    f.sync_all()
}

fn save_mirror(path: &Path, tables: &IndexTables) -> Result<()> {
    let f = File::create(path).map_err(|e| VocabError::io(path, e))?;
    let mut writer = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut writer, tables).map_err(|e| VocabError::Encode(e.to_string()))?;
    writer.flush().map_err(|e| VocabError::io(path, e))?;
    Ok(())
}

/// Read the snapshot. `Ok(None)` when no index file exists yet.
///
/// A snapshot that fails to decode falls back to the JSON mirror; only when
/// both fail is the index reported corrupt.
pub fn load_snapshot(paths: &IndexPaths) -> Result<Option<IndexTables>> {
    let bytes = match fs::read(paths.index()) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(VocabError::io(paths.index(), e)),
    };

    let binary_err = match bincode::deserialize::<IndexTables>(&bytes) {
        Ok(tables) => return Ok(Some(tables)),
        Err(e) => e.to_string(),
    };
    tracing::warn!(path = %paths.index().display(), err = %binary_err, "snapshot decode failed, trying JSON mirror");

    let mirror = paths.mirror();
    let json_err = match fs::read(&mirror) {
        Ok(raw) => match serde_json::from_slice::<IndexTables>(&raw) {
            Ok(tables) => return Ok(Some(tables)),
            Err(e) => e.to_string(),
        },
        Err(e) => format!("{}: {e}", mirror.display()),
    };
    Err(VocabError::IndexCorrupt {
        path: paths.index().to_path_buf(),
        binary: binary_err,
        json: json_err,
    })
}
