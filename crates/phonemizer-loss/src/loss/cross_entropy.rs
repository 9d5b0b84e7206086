use burn::config::Config;
use burn::tensor::{Int, Tensor, activation::log_softmax, backend::Backend};

use super::{Reduction, SequenceLoss, check_batch_size, check_num_classes, int_values};
use crate::{LossError, PhonemeBatch};

/// Configuration to create a [sequence cross entropy loss](SequenceCrossEntropyLoss).
#[derive(Config, Debug)]
pub struct SequenceCrossEntropyLossConfig {
    /// Target id excluded from the loss, used to pad the phoneme sequences.
    #[config(default = 0)]
    pub ignore_index: usize,
    /// How the per position losses are reduced.
    #[config(default = "Reduction::Mean")]
    pub reduction: Reduction,
    /// Number of phoneme classes the prediction must have, if known.
    pub num_classes: Option<usize>,
}

impl SequenceCrossEntropyLossConfig {
    /// Initialize [sequence cross entropy loss](SequenceCrossEntropyLoss).
    ///
    /// # Panics
    ///
    /// Panics if `ignore_index` isn't a valid class when `num_classes` is set.
    pub fn init(&self) -> SequenceCrossEntropyLoss {
        self.assertions();
        SequenceCrossEntropyLoss {
            ignore_index: self.ignore_index,
            reduction: self.reduction,
            num_classes: self.num_classes,
        }
    }

    fn assertions(&self) {
        if let Some(num_classes) = self.num_classes {
            assert!(
                self.ignore_index < num_classes,
                "Ignore index of cross entropy loss must be one of the {num_classes} classes, got {}.",
                self.ignore_index
            );
        }
    }
}

/// Calculate the cross entropy between predicted phoneme scores and the phoneme sequence
/// shifted past its start token.
///
/// The prediction at position `t` is scored against `phonemes[:, t + 1]`, so the first
/// target column, a start marker, never contributes. Positions whose target equals the
/// ignore index are excluded from the loss and from the mean.
#[derive(Clone, Debug)]
pub struct SequenceCrossEntropyLoss {
    ignore_index: usize,
    reduction: Reduction,
    num_classes: Option<usize>,
}

impl SequenceCrossEntropyLoss {
    /// Compute the criterion on the logits and the full phoneme sequences.
    ///
    /// # Shapes
    ///
    /// - logits: `[batch_size, seq_length, num_classes]`
    /// - phonemes: `[batch_size, seq_length + 1]`
    /// - output: `[1]`, or `[batch_size * seq_length]` with [Reduction::None]
    pub fn forward_targets<B: Backend>(
        &self,
        logits: Tensor<B, 3>,
        phonemes: Tensor<B, 2, Int>,
    ) -> Result<Tensor<B, 1>, LossError> {
        let [batch_size, seq_length, num_classes] = logits.dims();
        let [target_batch_size, target_length] = phonemes.dims();

        check_batch_size("phonemes", batch_size, target_batch_size)?;
        if target_length != seq_length + 1 {
            return Err(LossError::SequenceMismatch {
                prediction: seq_length,
                targets: target_length.saturating_sub(1),
            });
        }
        check_num_classes(self.num_classes, num_classes)?;

        let targets = phonemes.narrow(1, 1, seq_length);
        let num_kept = self.count_kept_targets(&targets, num_classes)?;
        let loss = self.forward_no_reduction(logits, targets);

        let loss = match self.reduction {
            Reduction::Mean if num_kept == 0 => {
                log::warn!("Every target of the batch is ignored, the loss is zero.");
                loss.sum()
            }
            Reduction::Mean => loss.sum().div_scalar(num_kept as f32),
            Reduction::Sum => loss.sum(),
            Reduction::None => loss.reshape([batch_size * seq_length]),
        };

        Ok(loss)
    }

    /// Compute the negative log likelihood of each target, zero where it's ignored.
    ///
    /// Targets must be valid class indices, except at ignored positions.
    ///
    /// # Shapes
    ///
    /// - logits: `[batch_size, seq_length, num_classes]`
    /// - targets: `[batch_size, seq_length]`
    /// - output: `[batch_size, seq_length]`
    pub fn forward_no_reduction<B: Backend>(
        &self,
        logits: Tensor<B, 3>,
        targets: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let [batch_size, seq_length, _] = logits.dims();

        let mask = targets.clone().equal_elem(self.ignore_index as i64);
        // Ignored ids may not be valid classes, gather them at 0 and mask them afterward.
        let indices = targets.mask_fill(mask.clone(), 0).unsqueeze_dim::<3>(1);

        // [batch_size, num_classes, seq_length]
        let log_probs = log_softmax(logits.swap_dims(1, 2), 1);
        let log_likelihood = log_probs
            .gather(1, indices)
            .reshape([batch_size, seq_length]);

        log_likelihood.neg().mask_fill(mask, 0.0)
    }

    fn count_kept_targets<B: Backend>(
        &self,
        targets: &Tensor<B, 2, Int>,
        num_classes: usize,
    ) -> Result<usize, LossError> {
        let ignore_index = self.ignore_index as i64;
        let mut num_kept = 0;

        for target in int_values(targets) {
            if target == ignore_index {
                continue;
            }
            if target < 0 || target >= num_classes as i64 {
                return Err(LossError::TargetOutOfRange {
                    target,
                    num_classes,
                });
            }
            num_kept += 1;
        }

        Ok(num_kept)
    }
}

impl<B: Backend> SequenceLoss<B> for SequenceCrossEntropyLoss {
    fn forward(
        &self,
        prediction: Tensor<B, 3>,
        batch: &PhonemeBatch<B>,
    ) -> Result<Tensor<B, 1>, LossError> {
        self.forward_targets(prediction, batch.phonemes.clone())
    }
}
