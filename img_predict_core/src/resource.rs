use anyhow::Result;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;

use rust_embed::Embed;
use tracing::info;

use crate::classifier::ResNetClassifier;
use crate::config::Config;
use crate::fetch::Fetch;
use crate::labels::LabelTable;

#[cfg(feature = "fat")]
#[derive(Embed)]
#[folder = "resource/"]
struct Asset;

#[cfg(not(feature = "fat"))]
struct Asset;
#[cfg(not(feature = "fat"))]
struct FakeEmbedFile<'a> {
    data: &'a [u8],
}
#[cfg(not(feature = "fat"))]
impl Asset {
    fn get(_: &str) -> Option<FakeEmbedFile<'static>> {
        None
    }
}

const LABELS_ASSET: &str = "labels.txt";

pub fn get_labels<F: Fetch>(config: &Config, fetcher: &F) -> Result<LabelTable> {
    if cfg!(feature = "fat") {
        let f = Asset::get(LABELS_ASSET).ok_or(anyhow::format_err!("{LABELS_ASSET} not embedded"))?;
        let text = std::str::from_utf8(&f.data)?;
        return Ok(LabelTable::parse(text));
    }
    let path = fetcher.fetch(&config.labels_url, &config.artifact_prefix)?;
    let labels = LabelTable::from_path(path)?;
    info!("loaded {} labels", labels.len());
    Ok(labels)
}

pub fn get_model(config: &Config) -> Result<ResNetClassifier> {
    let file = config.arch.weights_file();
    let data = if cfg!(feature = "fat") {
        let f = Asset::get(&file).ok_or(anyhow::format_err!("{file} not embedded"))?;
        f.data.to_vec()
    } else {
        let builder = hf_hub::api::sync::ApiBuilder::new();
        let api = builder
            .with_endpoint(config.hf_endpoint.clone())
            .build()?;
        let api = api.repo(hf_hub::Repo::with_revision(
            config.hf_repo.clone(),
            hf_hub::RepoType::Model,
            config.hf_revision.clone(),
        ));
        let v = api.get(&file)?;
        std::fs::read(&v).map_err(|e| anyhow::anyhow!("read file {} err:{}", v.display(), e))?
    };

    let vb = VarBuilder::from_buffered_safetensors(data, DType::F32, &Device::Cpu)?;

    let model = ResNetClassifier::new(config.arch, config.num_classes, vb)?;
    info!("loaded {} with {} classes", config.arch.name(), config.num_classes);
    Ok(model)
}
