use burn::config::Config;
use burn::tensor::{Int, Tensor, backend::Backend};

use super::{
    SequenceCrossEntropyLoss, SequenceCrossEntropyLossConfig, SequenceCtcLoss,
    SequenceCtcLossConfig,
};
use crate::{LossError, PhonemeBatch};

/// A loss computed from a batch of model predictions and the batch they were produced from.
pub trait SequenceLoss<B: Backend> {
    /// Compute the loss of the prediction against the targets of the batch.
    ///
    /// # Shapes
    ///
    /// - prediction: `[batch_size, seq_length, num_classes]`
    /// - output: `[1]`, or unreduced with [Reduction::None](super::Reduction::None)
    fn forward(
        &self,
        prediction: Tensor<B, 3>,
        batch: &PhonemeBatch<B>,
    ) -> Result<Tensor<B, 1>, LossError>;
}

/// Configuration selecting one of the sequence losses.
#[derive(Config, Debug)]
pub enum SequenceLossConfig {
    /// Cross entropy on the shifted phoneme targets.
    CrossEntropy(SequenceCrossEntropyLossConfig),
    /// Connectionist temporal classification.
    Ctc(SequenceCtcLossConfig),
}

impl From<SequenceCrossEntropyLossConfig> for SequenceLossConfig {
    fn from(config: SequenceCrossEntropyLossConfig) -> Self {
        Self::CrossEntropy(config)
    }
}

impl From<SequenceCtcLossConfig> for SequenceLossConfig {
    fn from(config: SequenceCtcLossConfig) -> Self {
        Self::Ctc(config)
    }
}

impl SequenceLossConfig {
    /// Initialize the selected loss.
    pub fn init(&self) -> SequenceLossKind {
        match self {
            Self::CrossEntropy(config) => {
                log::debug!("Using sequence cross entropy loss: {config}");
                config.init().into()
            }
            Self::Ctc(config) => {
                log::debug!("Using sequence CTC loss: {config}");
                config.init().into()
            }
        }
    }

    /// Set the number of phoneme classes the prediction is checked against.
    pub fn with_num_classes(self, num_classes: usize) -> Self {
        match self {
            Self::CrossEntropy(config) => config.with_num_classes(Some(num_classes)).into(),
            Self::Ctc(config) => config.with_num_classes(Some(num_classes)).into(),
        }
    }
}

/// One of the sequence losses, selected at runtime.
#[derive(Clone, Debug)]
pub enum SequenceLossKind {
    /// Cross entropy on the shifted phoneme targets.
    CrossEntropy(SequenceCrossEntropyLoss),
    /// Connectionist temporal classification.
    Ctc(SequenceCtcLoss),
}

impl From<SequenceCrossEntropyLoss> for SequenceLossKind {
    fn from(loss: SequenceCrossEntropyLoss) -> Self {
        Self::CrossEntropy(loss)
    }
}

impl From<SequenceCtcLoss> for SequenceLossKind {
    fn from(loss: SequenceCtcLoss) -> Self {
        Self::Ctc(loss)
    }
}

impl<B: Backend> SequenceLoss<B> for SequenceLossKind {
    fn forward(
        &self,
        prediction: Tensor<B, 3>,
        batch: &PhonemeBatch<B>,
    ) -> Result<Tensor<B, 1>, LossError> {
        match self {
            Self::CrossEntropy(loss) => SequenceLoss::forward(loss, prediction, batch),
            Self::Ctc(loss) => SequenceLoss::forward(loss, prediction, batch),
        }
    }
}

/// The family of phonemizer model, which decides the loss it is trained with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Non-autoregressive transformer emitting one distribution per input position.
    Transformer,
    /// Encoder-decoder transformer predicting the next phoneme.
    AutoregTransformer,
}

impl ModelType {
    /// Whether the model decodes phonemes one at a time.
    pub fn is_autoregressive(&self) -> bool {
        matches!(self, Self::AutoregTransformer)
    }

    /// The loss configuration a model of this type is trained with.
    pub fn loss_config(&self) -> SequenceLossConfig {
        match self {
            Self::Transformer => SequenceLossConfig::Ctc(SequenceCtcLossConfig::new()),
            Self::AutoregTransformer => {
                SequenceLossConfig::CrossEntropy(SequenceCrossEntropyLossConfig::new())
            }
        }
    }
}

pub(crate) fn check_batch_size(
    field: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), LossError> {
    if expected != actual {
        return Err(LossError::BatchSizeMismatch {
            field,
            expected,
            actual,
        });
    }

    Ok(())
}

pub(crate) fn check_num_classes(expected: Option<usize>, actual: usize) -> Result<(), LossError> {
    match expected {
        Some(expected) if expected != actual => {
            Err(LossError::ClassCountMismatch { expected, actual })
        }
        _ => Ok(()),
    }
}

/// Read an integer tensor back to the host.
pub(crate) fn int_values<B: Backend, const D: usize>(tensor: &Tensor<B, D, Int>) -> Vec<i64> {
    tensor.to_data().iter::<i64>().collect()
}
