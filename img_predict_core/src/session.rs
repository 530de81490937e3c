use anyhow::Context;
use tracing::{info, warn};

use crate::classifier::Classifier;
use crate::error::ClassifyError;
use crate::fetch::Fetch;
use crate::labels::LabelTable;
use crate::preprocess::{Image, Preprocessor};
use crate::topk::{top_k, Prediction};

pub const DEFAULT_TOP_K: usize = 5;

/// A classifier bundled with its label table. Built once, then shared by
/// reference across sequential predictions.
pub struct InferenceSession<C> {
    classifier: C,
    labels: LabelTable,
    preprocessor: Preprocessor,
    k: usize,
}

impl<C: Classifier> InferenceSession<C> {
    pub fn new(classifier: C, labels: LabelTable) -> Result<Self, ClassifyError> {
        if classifier.num_classes() != labels.len() {
            return Err(ClassifyError::LabelCountMismatch {
                labels: labels.len(),
                classes: classifier.num_classes(),
            });
        }
        Ok(Self {
            classifier,
            labels,
            preprocessor: Preprocessor::default(),
            k: DEFAULT_TOP_K,
        })
    }

    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn classify(&self, image: &Image) -> anyhow::Result<Vec<Prediction>> {
        let input = self.preprocessor.preprocess(image)?;
        let probs = self.classifier.forward(&input)?;
        Ok(top_k(&probs, &self.labels, self.k)?)
    }

    /// `Ok(None)` when the bytes are not a decodable image.
    pub fn predict_bytes(&self, bytes: &[u8]) -> anyhow::Result<Option<Vec<Prediction>>> {
        let image = match Image::decode(bytes) {
            Ok(image) => image,
            Err(e) => {
                warn!("decode image: {}", e);
                return Ok(None);
            }
        };
        info!("image {}x{}", image.width(), image.height());
        self.classify(&image).map(Some)
    }

    /// Fetches `url` and classifies it. An undecodable download yields
    /// `Ok(None)`; transport and I/O failures are errors.
    pub fn predict<F: Fetch>(
        &self,
        fetcher: &F,
        url: &str,
    ) -> anyhow::Result<Option<Vec<Prediction>>> {
        let path = fetcher.fetch(url, "")?;
        let bytes = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        let res = self.predict_bytes(&bytes)?;
        if res.is_none() {
            warn!("failed to download {}", url);
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::PathBuf;

    use image::RgbImage;

    use super::*;
    use crate::classifier::Probabilities;
    use crate::preprocess::{ModelInput, INPUT_SHAPE};

    struct FixedClassifier {
        probs: Vec<f32>,
        calls: Cell<usize>,
    }

    impl FixedClassifier {
        fn new(probs: Vec<f32>) -> Self {
            Self {
                probs,
                calls: Cell::new(0),
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn num_classes(&self) -> usize {
            self.probs.len()
        }

        fn forward(&self, input: &ModelInput) -> anyhow::Result<Probabilities> {
            assert_eq!(input.tensor().dims(), &INPUT_SHAPE);
            self.calls.set(self.calls.get() + 1);
            Ok(Probabilities::new(self.probs.clone()))
        }
    }

    struct DirFetcher(PathBuf);

    impl Fetch for DirFetcher {
        fn fetch(&self, url: &str, prefix: &str) -> anyhow::Result<PathBuf> {
            let name = crate::fetch::file_name(url)?;
            let path = self.0.join(format!("{prefix}{name}"));
            anyhow::ensure!(path.exists(), "no such file {}", path.display());
            Ok(path)
        }
    }

    fn labels(names: &[&str]) -> LabelTable {
        LabelTable::new(names.iter().map(|s| s.to_string()).collect())
    }

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(w, h, image::Rgb([120, 30, 200]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn mismatched_labels_fail_fast() {
        let c = FixedClassifier::new(vec![0.2; 5]);
        let err = InferenceSession::new(c, labels(&["a", "b", "c"]))
            .err()
            .unwrap();
        assert_eq!(err, ClassifyError::LabelCountMismatch { labels: 3, classes: 5 });
    }

    #[test]
    fn classifies_decoded_image() {
        let c = FixedClassifier::new(vec![0.7, 0.1, 0.2]);
        let session = InferenceSession::new(c, labels(&["cat", "dog", "bird"]))
            .unwrap()
            .with_top_k(2);
        let preds = session.predict_bytes(&png(640, 480)).unwrap().unwrap();
        let pairs: Vec<_> = preds.iter().map(|p| (p.probability, p.label.as_str())).collect();
        assert_eq!(pairs, vec![(0.7, "cat"), (0.2, "bird")]);
        assert_eq!(session.classifier().calls.get(), 1);
    }

    #[test]
    fn undecodable_image_is_no_result() {
        let c = FixedClassifier::new(vec![0.5, 0.5]);
        let session = InferenceSession::new(c, labels(&["a", "b"])).unwrap();
        assert_eq!(session.predict_bytes(b"").unwrap(), None);
        assert_eq!(session.predict_bytes(b"<html>404</html>").unwrap(), None);
        assert_eq!(session.classifier().calls.get(), 0);
    }

    #[test]
    fn classifier_output_length_checked() {
        struct Liar;
        impl Classifier for Liar {
            fn num_classes(&self) -> usize {
                2
            }
            fn forward(&self, _: &ModelInput) -> anyhow::Result<Probabilities> {
                Ok(Probabilities::new(vec![0.1, 0.2, 0.7]))
            }
        }
        let session = InferenceSession::new(Liar, labels(&["a", "b"])).unwrap();
        let err = session.predict_bytes(&png(8, 8)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ClassifyError>(),
            Some(&ClassifyError::LabelCountMismatch { labels: 2, classes: 3 })
        );
    }

    #[test]
    fn predict_through_fetcher() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cat.png"), png(300, 200)).unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"truncated").unwrap();
        let fetcher = DirFetcher(dir.path().to_path_buf());

        let probs = (0..10).map(|i| i as f32 / 45.).collect();
        let names: Vec<String> = (0..10).map(|i| format!("class{i}")).collect();
        let session =
            InferenceSession::new(FixedClassifier::new(probs), LabelTable::new(names)).unwrap();

        let preds = session
            .predict(&fetcher, "http://example.com/pics/cat.png")
            .unwrap()
            .unwrap();
        assert_eq!(preds.len(), DEFAULT_TOP_K);
        assert_eq!(
            preds.iter().map(|p| p.index).collect::<Vec<_>>(),
            vec![9, 8, 7, 6, 5]
        );

        assert_eq!(
            session.predict(&fetcher, "http://example.com/pics/broken.jpg").unwrap(),
            None
        );
        assert!(session.predict(&fetcher, "http://example.com/pics/missing.jpg").is_err());
        assert_eq!(session.classifier().calls.get(), 1);
    }
}
