use std::cmp::Ordering;
use std::fmt;

use crate::classifier::Probabilities;
use crate::error::ClassifyError;
use crate::labels::LabelTable;

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub probability: f32,
    pub label: String,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probability={:.6}, class={}", self.probability, self.label)
    }
}

// NaN ranks below every number.
fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

/// Returns the `k` most probable classes, highest first.
///
/// Equal probabilities keep ascending class-index order. Fails when the
/// vector and the label table disagree on the number of classes.
pub fn top_k(
    probabilities: &Probabilities,
    labels: &LabelTable,
    k: usize,
) -> Result<Vec<Prediction>, ClassifyError> {
    if probabilities.len() != labels.len() {
        return Err(ClassifyError::LabelCountMismatch {
            labels: labels.len(),
            classes: probabilities.len(),
        });
    }
    let probs = probabilities.as_slice();
    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|&a, &b| descending(probs[a], probs[b]));

    Ok(order
        .into_iter()
        .take(k)
        .map(|index| Prediction {
            index,
            probability: probs[index],
            label: labels[index].to_string(),
        })
        .collect())
}
