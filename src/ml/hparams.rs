// ============================================================
// Layer 5 — Hyperparameters
// ============================================================
// One Config shared by every architecture. Each model config
// has a `from_hparams` constructor that picks the fields it
// needs; fields a model does not use are ignored.
//
// Saved as JSON next to the checkpoints (see infra/checkpoint)
// and loadable from a file with `HParams::load(path)`.

use burn::prelude::*;

use crate::error::{self, ModelError};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug, PartialEq)]
pub struct HParams {
    /// Hidden channel width of the configurable-depth classifier
    #[config(default = 512)]
    pub hidden_dim: usize,

    /// Number of Conv1d blocks in the configurable-depth classifier
    #[config(default = 6)]
    pub num_layers: usize,

    /// Dropout probability inside Conv1d blocks
    #[config(default = 0.3)]
    pub dropout: f64,

    /// Standard-normal columns appended along the feature axis (0 = off)
    #[config(default = 0)]
    pub noise_dim: usize,

    /// Size of each per-feature embedding vector
    #[config(default = 4)]
    pub feature_embed_dim: usize,

    /// Upper bound of the training-time NaN masking probability
    #[config(default = 0.2)]
    pub nan_prob: f64,

    /// Lower bound of the training-time NaN masking probability
    #[config(default = 0.0)]
    pub min_nan_prob: f64,

    /// Statements per customer (sequence length)
    #[config(default = 13)]
    pub time_steps: usize,

    /// Numeric features per statement
    #[config(default = 188)]
    pub num_features: usize,

    /// Side of the square pseudo-image used by the 2D ResNets
    #[config(default = 16)]
    pub image_side: usize,
}

impl HParams {
    /// Check ranges and cross-field constraints.
    pub fn validate(&self) -> error::Result<()> {
        if self.hidden_dim == 0 || self.num_layers == 0 {
            return Err(ModelError::invalid_config(
                "hidden_dim and num_layers must be positive",
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::invalid_config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if self.feature_embed_dim == 0 {
            return Err(ModelError::invalid_config("feature_embed_dim must be positive"));
        }
        if !(0.0..=1.0).contains(&self.nan_prob) || !(0.0..=1.0).contains(&self.min_nan_prob) {
            return Err(ModelError::invalid_config("NaN probabilities must be in [0, 1]"));
        }
        if self.min_nan_prob > self.nan_prob {
            return Err(ModelError::invalid_config(format!(
                "min_nan_prob ({}) exceeds nan_prob ({})",
                self.min_nan_prob, self.nan_prob
            )));
        }
        if self.time_steps == 0 || self.num_features == 0 {
            return Err(ModelError::invalid_config(
                "time_steps and num_features must be positive",
            ));
        }
        Ok(())
    }

    /// Extra check for the pseudo-image models: features must fit in one
    /// `image_side × image_side` plane.
    pub fn validate_image(&self) -> error::Result<()> {
        let capacity = self.image_side * self.image_side;
        if self.num_features > capacity {
            return Err(ModelError::invalid_config(format!(
                "{} features do not fit a {side}x{side} image",
                self.num_features,
                side = self.image_side
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let h = HParams::new();
        assert_eq!(h.hidden_dim, 512);
        assert_eq!(h.num_layers, 6);
        assert_eq!(h.time_steps, 13);
        assert!(h.validate().is_ok());
        assert!(h.validate_image().is_ok());
    }

    #[test]
    fn test_rejects_inverted_nan_range() {
        let h = HParams::new().with_nan_prob(0.1).with_min_nan_prob(0.3);
        assert!(matches!(h.validate(), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_dropout_of_one() {
        let h = HParams::new().with_dropout(1.0);
        assert!(h.validate().is_err());
    }

    #[test]
    fn test_rejects_features_larger_than_image() {
        let h = HParams::new().with_num_features(300).with_image_side(16);
        assert!(h.validate_image().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hparams.json");
        let h = HParams::new().with_hidden_dim(32).with_noise_dim(4);
        h.save(&path).unwrap();
        let loaded = HParams::load(&path).unwrap();
        assert_eq!(loaded, h);
    }
}
