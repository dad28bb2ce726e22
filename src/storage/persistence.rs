//! Chain persistence layer
//!
//! Saves and loads the whole chain state (ledgers, sales, event log) as JSON.

use crate::core::Chain;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub chain_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".crowdsale_data"),
            chain_file: "chain.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Chain storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    fn chain_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.chain_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.chain_file, index))
    }

    /// Save the chain to disk
    pub fn save(&self, chain: &Chain) -> Result<(), StorageError> {
        let path = self.chain_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Write to temporary file first
        let temp_path = self
            .config
            .data_dir
            .join(format!("{}.tmp", self.config.chain_file));
        let file = fs::File::create(&temp_path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), chain)?;

        fs::rename(&temp_path, &path)?;

        log::debug!("Saved chain at height {} to {}", chain.height(), path.display());
        Ok(())
    }

    /// Load the chain from disk
    pub fn load(&self) -> Result<Chain, StorageError> {
        let path = self.chain_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Chain file not found".to_string(),
            ));
        }

        load_from_file(&path)
    }

    /// Load the saved chain, or start an empty one if nothing was saved yet
    pub fn load_or_default(&self) -> Result<Chain, StorageError> {
        if self.exists() {
            self.load()
        } else {
            Ok(Chain::new())
        }
    }

    /// Check if a saved chain exists
    pub fn exists(&self) -> bool {
        self.chain_path().exists()
    }

    fn rotate_backups(&self) -> Result<(), StorageError> {
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Restore from a backup
    pub fn restore_backup(&self, backup_index: usize) -> Result<Chain, StorageError> {
        let backup_path = self.backup_path(backup_index);

        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }

        load_from_file(&backup_path)
    }

    /// List available backups, newest first
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let path = self.chain_path();

        let file_size = if path.exists() {
            fs::metadata(&path)?.len()
        } else {
            0
        };

        Ok(StorageStats {
            file_size,
            backup_count: self.list_backups().len(),
            data_dir: self.config.data_dir.clone(),
        })
    }
}

/// Storage statistics
#[derive(Debug)]
pub struct StorageStats {
    pub file_size: u64,
    pub backup_count: usize,
    pub data_dir: PathBuf,
}

/// Load a chain from a specific file path
pub fn load_from_file(path: &Path) -> Result<Chain, StorageError> {
    let file = fs::File::open(path)?;
    let chain: Chain = serde_json::from_reader(BufReader::new(file))?;
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Call, Transaction};
    use chrono::Utc;

    fn deploy_token(chain: &mut Chain) -> String {
        chain
            .submit(Transaction::new(
                "deployer",
                Call::DeployToken {
                    name: "Henry token".to_string(),
                    symbol: "HENRY".to_string(),
                    decimals: 18,
                    total_supply: 1_000,
                },
                Utc::now(),
            ))
            .unwrap()
            .created
            .unwrap()
    }

    #[test]
    fn test_save_load_chain() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let storage = Storage::new(config).unwrap();
        let mut chain = Chain::new();
        chain.allocate("alice", 500).unwrap();
        let token = deploy_token(&mut chain);

        storage.save(&chain).unwrap();
        assert!(storage.exists());

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.height(), chain.height());
        assert_eq!(loaded.native_balance("alice"), 500);
        assert_eq!(loaded.token_balance(&token, "deployer").unwrap(), 1_000);
        assert_eq!(loaded.events(), chain.events());
    }

    #[test]
    fn test_load_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let storage = Storage::new(config).unwrap();
        assert!(matches!(storage.load(), Err(StorageError::InvalidData(_))));
        assert_eq!(storage.load_or_default().unwrap().height(), 0);
    }

    #[test]
    fn test_backup_rotation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            max_backups: 3,
            ..Default::default()
        };

        let storage = Storage::new(config).unwrap();
        let mut chain = Chain::new();

        for _ in 0..5 {
            storage.save(&chain).unwrap();
            deploy_token(&mut chain);
        }

        assert_eq!(storage.list_backups(), vec![0, 1, 2]);

        // Backup 0 is the state before the last save
        let restored = storage.restore_backup(0).unwrap();
        assert_eq!(restored.height(), 3);
        assert!(matches!(
            storage.restore_backup(7),
            Err(StorageError::InvalidData(_))
        ));

        let stats = storage.stats().unwrap();
        assert_eq!(stats.backup_count, 3);
        assert!(stats.file_size > 0);
        assert_eq!(stats.data_dir, temp_dir.path());
    }
}
