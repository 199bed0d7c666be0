// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved:
//   1. model_epoch_{n}.mpk  : all learned parameters after epoch n
//   2. latest_epoch.json    : which epoch was last saved
//   3. train_config.json    : the run configuration, written once
//                              before training so `predict` can
//                              rebuild the same architecture
//
// Loading needs a freshly initialised model of the same
// architecture; the record is then loaded into it.

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{ModelError, Result};

const LATEST_EPOCH_FILE: &str = "latest_epoch.json";
const CONFIG_FILE: &str = "train_config.json";

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Opens an existing checkpoint directory without creating it.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(ModelError::checkpoint_not_found(dir.display().to_string()));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the weights file for `epoch`, extension included.
    pub fn model_path<B: Backend>(&self, epoch: usize) -> PathBuf {
        self.dir
            .join(format!("model_epoch_{epoch}"))
            .with_extension(<CompactRecorder as FileRecorder<B>>::file_extension())
    }

    /// Save model weights for `epoch` and point latest_epoch.json at it.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<()> {
        let stem = self.dir.join(format!("model_epoch_{epoch}"));

        model
            .clone()
            .save_file(stem.clone(), &CompactRecorder::new())
            .map_err(|e| ModelError::save_checkpoint(stem.display().to_string(), e.to_string()))?;

        let latest = self.dir.join(LATEST_EPOCH_FILE);
        let json = serde_json::to_string(&epoch)
            .map_err(|e| ModelError::save_checkpoint(latest.display().to_string(), e.to_string()))?;
        fs::write(&latest, json)?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the weights of the latest saved epoch into `model`.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let epoch = self.latest_epoch()?;
        tracing::info!("Loading checkpoint from epoch {}", epoch);
        self.load_epoch(model, epoch, device)
    }

    pub fn load_epoch<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        epoch:  usize,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.model_path::<B>(epoch);
        if !path.exists() {
            return Err(ModelError::checkpoint_not_found(path.display().to_string()));
        }

        model
            .load_file(path.clone(), &CompactRecorder::new(), device)
            .map_err(|e| ModelError::load_checkpoint(path.display().to_string(), e.to_string()))
    }

    /// Read latest_epoch.json. Fails when nothing has been trained yet.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_EPOCH_FILE);
        if !path.exists() {
            return Err(ModelError::checkpoint_not_found(path.display().to_string()));
        }
        let s = fs::read_to_string(&path)?;
        serde_json::from_str::<usize>(s.trim())
            .map_err(|e| ModelError::load_checkpoint(path.display().to_string(), e.to_string()))
    }

    pub fn save_config<C: Serialize>(&self, cfg: &C) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)
            .map_err(|e| ModelError::invalid_config(e.to_string()))?;
        fs::write(&path, json)?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config<C: DeserializeOwned>(&self) -> Result<C> {
        let path = self.dir.join(CONFIG_FILE);
        if !path.exists() {
            return Err(ModelError::checkpoint_not_found(path.display().to_string()));
        }
        let json = fs::read_to_string(&path)?;
        serde_json::from_str(&json).map_err(|e| {
            ModelError::invalid_config(format!("'{}': {e}", path.display()))
        })
    }
}
