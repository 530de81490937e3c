pub mod classifier;
pub mod config;
pub mod error;
pub mod fetch;
pub mod labels;
pub mod preprocess;
pub mod resource;
pub mod session;
pub mod topk;

use tracing::info;

pub use classifier::{Arch, Classifier, Probabilities, ResNetClassifier};
pub use config::Config;
pub use error::ClassifyError;
pub use fetch::{Fetch, Fetcher};
pub use labels::LabelTable;
pub use preprocess::{ChannelOrder, Image, ModelInput, Preprocessor};
pub use session::InferenceSession;
pub use topk::{top_k, Prediction};

/// Fetches labels and weights as configured and bundles them into a session.
pub fn load_session(config: &Config) -> anyhow::Result<InferenceSession<ResNetClassifier>> {
    let start = std::time::Instant::now();
    let fetcher = Fetcher::new(&config.cache_dir);
    let labels = resource::get_labels(config, &fetcher)?;
    let model = resource::get_model(config)?;

    let preprocessor = if config.normalize {
        Preprocessor::imagenet()
    } else {
        Preprocessor::raw()
    };
    let session = InferenceSession::new(model, labels)?
        .with_preprocessor(preprocessor)
        .with_top_k(config.top_k);
    info!("session ready in {:?}", start.elapsed());
    Ok(session)
}
