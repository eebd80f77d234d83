use chrono::Local;
use directories::ProjectDirs;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::session::{GameError, SavedState};

/// One save slot. `name` is the unique key; saving under an existing name
/// replaces the record in place, keeps its `id`, and takes the max score.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SaveRecord {
    pub id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "maximo_puntaje")]
    pub best_score: u32,
    #[serde(rename = "estado")]
    pub state: SavedState,
}

/// Gateway to the save file: a single JSON array of records, most recently
/// saved first, replaced wholesale on every write.
#[derive(Debug, Clone)]
pub struct SaveStore {
    path: PathBuf,
}

impl SaveStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "historia") {
            pd.config_dir().join("partidas.json")
        } else {
            PathBuf::from("partidas_guardadas.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, newest first. A missing or malformed file reads as "no
    /// saved games" rather than an error.
    pub fn list(&self) -> Vec<SaveRecord> {
        let Ok(bytes) = fs::read(&self.path) else {
            return Vec::new();
        };
        match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(err) => {
                warn!("ignoring malformed save file {:?}: {err}", self.path);
                Vec::new()
            }
        }
    }

    pub fn find(&self, name: &str) -> Option<SaveRecord> {
        self.list().into_iter().find(|record| record.name == name)
    }

    /// Persist `state` under the named slot and return the stored record.
    pub fn save(&self, name: &str, state: &SavedState) -> Result<SaveRecord, GameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::SaveSlotNameRequired);
        }
        let mut records = self.list();
        let existing = records.iter().find(|record| record.name == name);
        let best_score = existing
            .map(|record| record.best_score)
            .unwrap_or(0)
            .max(state.score);
        let id = existing.map(|record| record.id.clone()).unwrap_or_else(|| {
            rand::thread_rng().gen_range(1000..10000).to_string()
        });
        let record = SaveRecord {
            id,
            name: name.to_string(),
            date: Local::now().format("%d/%m/%Y %H:%M").to_string(),
            best_score,
            state: state.clone(),
        };
        records.retain(|r| r.name != name);
        records.insert(0, record.clone());
        self.write(&records)?;
        Ok(record)
    }

    fn write(&self, records: &[SaveRecord]) -> Result<(), GameError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(records).unwrap_or_default();
        fs::write(&self.path, data)?;
        Ok(())
    }
}
