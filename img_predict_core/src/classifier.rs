use candle_core::{Module, D};
use candle_nn::{ops::softmax, Func, VarBuilder};
use candle_transformers::models::resnet;
use serde::Deserialize;
use tracing::info;

use crate::preprocess::ModelInput;

/// Per-class scores as returned by a classifier, in class-index order.
#[derive(Debug, Clone, PartialEq)]
pub struct Probabilities(Vec<f32>);

impl Probabilities {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for Probabilities {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

pub trait Classifier {
    fn num_classes(&self) -> usize;

    /// Must be deterministic for a given input.
    fn forward(&self, input: &ModelInput) -> anyhow::Result<Probabilities>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Resnet18,
    Resnet34,
    Resnet50,
    Resnet101,
    Resnet152,
}

impl Arch {
    pub fn name(&self) -> &'static str {
        match self {
            Arch::Resnet18 => "resnet18",
            Arch::Resnet34 => "resnet34",
            Arch::Resnet50 => "resnet50",
            Arch::Resnet101 => "resnet101",
            Arch::Resnet152 => "resnet152",
        }
    }

    pub fn weights_file(&self) -> String {
        format!("{}.safetensors", self.name())
    }
}

pub struct ResNetClassifier {
    arch: Arch,
    model: Func<'static>,
    num_classes: usize,
}

impl ResNetClassifier {
    pub fn new(arch: Arch, num_classes: usize, vb: VarBuilder<'static>) -> anyhow::Result<Self> {
        let model = match arch {
            Arch::Resnet18 => resnet::resnet18(num_classes, vb)?,
            Arch::Resnet34 => resnet::resnet34(num_classes, vb)?,
            Arch::Resnet50 => resnet::resnet50(num_classes, vb)?,
            Arch::Resnet101 => resnet::resnet101(num_classes, vb)?,
            Arch::Resnet152 => resnet::resnet152(num_classes, vb)?,
        };
        Ok(Self {
            arch,
            model,
            num_classes,
        })
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }
}

impl Classifier for ResNetClassifier {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn forward(&self, input: &ModelInput) -> anyhow::Result<Probabilities> {
        let start = std::time::Instant::now();
        let logits = self.model.forward(input.tensor())?;
        info!("{} forward costs:{:?}", self.arch.name(), start.elapsed());

        let probs = softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1::<f32>()?;
        Ok(Probabilities(probs))
    }
}
