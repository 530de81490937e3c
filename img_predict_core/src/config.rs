use std::path::PathBuf;

use serde::Deserialize;

use crate::classifier::Arch;

pub const DEFAULT_LABELS_URL: &str =
    "https://raw.githubusercontent.com/pytorch/hub/master/imagenet_classes.txt";

/// Runtime settings. Every field has a default, so a config file only needs
/// the keys it overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub arch: Arch,
    /// Width of the classifier head; the label table must have this many lines.
    pub num_classes: usize,
    pub hf_endpoint: String,
    pub hf_repo: String,
    pub hf_revision: String,
    pub labels_url: String,
    /// Prepended to the file names of cached model artifacts.
    pub artifact_prefix: String,
    pub cache_dir: PathBuf,
    pub top_k: usize,
    pub normalize: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            arch: Arch::Resnet152,
            num_classes: 1000,
            hf_endpoint: "https://huggingface.co".to_string(),
            hf_repo: "lmz/candle-resnet".to_string(),
            hf_revision: "main".to_string(),
            labels_url: DEFAULT_LABELS_URL.to_string(),
            artifact_prefix: "full-".to_string(),
            cache_dir: PathBuf::from("."),
            top_k: 5,
            normalize: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let c: Config = toml::from_str("").unwrap();
        assert_eq!(c, Config::default());
        assert_eq!(c.top_k, 5);
        assert_eq!(c.arch, Arch::Resnet152);
    }

    #[test]
    fn overrides() {
        let c: Config = toml::from_str(
            r#"
            arch = "resnet18"
            hf_endpoint = "https://hf-mirror.com"
            cache_dir = "/var/cache/img-predict"
            top_k = 3
            normalize = false
            "#,
        )
        .unwrap();
        assert_eq!(c.arch, Arch::Resnet18);
        assert_eq!(c.hf_endpoint, "https://hf-mirror.com");
        assert_eq!(c.cache_dir, PathBuf::from("/var/cache/img-predict"));
        assert_eq!(c.top_k, 3);
        assert!(!c.normalize);
        assert_eq!(c.artifact_prefix, "full-");
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(toml::from_str::<Config>("topk = 3").is_err());
    }
}
