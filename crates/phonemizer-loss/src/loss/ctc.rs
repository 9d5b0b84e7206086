use burn::config::Config;
use burn::tensor::{Bool, Int, Tensor, TensorData, activation::log_softmax, backend::Backend};

use super::{Reduction, SequenceLoss, check_batch_size, check_num_classes, int_values};
use crate::{LossError, PhonemeBatch};

// Stands in for log(0) while keeping the recursion free of infinities.
const NEG_INF: f32 = -1e30;

/// Configuration to create a [sequence CTC loss](SequenceCtcLoss).
#[derive(Config, Debug)]
pub struct SequenceCtcLossConfig {
    /// Index of the blank label.
    #[config(default = 0)]
    pub blank: usize,
    /// How the per item losses are reduced.
    ///
    /// With [Reduction::Mean], each item's loss is divided by its target length before
    /// averaging over the batch.
    #[config(default = "Reduction::Mean")]
    pub reduction: Reduction,
    /// Number of phoneme classes the prediction must have, if known.
    pub num_classes: Option<usize>,
}

impl SequenceCtcLossConfig {
    /// Initialize [sequence CTC loss](SequenceCtcLoss).
    ///
    /// # Panics
    ///
    /// Panics if `blank` isn't a valid class when `num_classes` is set.
    pub fn init(&self) -> SequenceCtcLoss {
        self.assertions();
        SequenceCtcLoss {
            blank: self.blank,
            reduction: self.reduction,
            num_classes: self.num_classes,
        }
    }

    fn assertions(&self) {
        if let Some(num_classes) = self.num_classes {
            assert!(
                self.blank < num_classes,
                "Blank index of CTC loss must be one of the {num_classes} classes, got {}.",
                self.blank
            );
        }
    }
}

/// Connectionist temporal classification loss.
///
/// The negative log likelihood of each target sequence is summed over every monotonic
/// alignment of its labels, interleaved with blanks, to the valid input positions. It is
/// computed with the forward (alpha) recursion in log space; gradients are obtained by
/// differentiating through the recursion.
///
/// Inputs that can't be aligned with their target are rejected instead of producing an
/// infinite loss: an input of length `T` fits a target of length `S` with `R` adjacent
/// repeated labels only if `T >= S + R`.
#[derive(Clone, Debug)]
pub struct SequenceCtcLoss {
    blank: usize,
    reduction: Reduction,
    num_classes: Option<usize>,
}

/// Host side view of a validated CTC batch.
struct Alignment {
    input_lengths: Vec<usize>,
    target_lengths: Vec<usize>,
    /// Row major `[batch_size, extended_length]` labels, blanks interleaved.
    extended: Vec<i64>,
    extended_length: usize,
}

impl SequenceCtcLoss {
    /// Compute the criterion on batch-first logits.
    ///
    /// The logits are moved to a time-major layout and normalized with a log softmax over
    /// the classes before [ctc_loss](Self::ctc_loss) is applied.
    ///
    /// # Shapes
    ///
    /// - logits: `[batch_size, seq_length, num_classes]`
    /// - targets: `[batch_size, max_target_length]`
    /// - input_lengths: `[batch_size]`
    /// - target_lengths: `[batch_size]`
    /// - output: `[1]`, or `[batch_size]` with [Reduction::None]
    pub fn forward_logits<B: Backend>(
        &self,
        logits: Tensor<B, 3>,
        targets: Tensor<B, 2, Int>,
        input_lengths: Tensor<B, 1, Int>,
        target_lengths: Tensor<B, 1, Int>,
    ) -> Result<Tensor<B, 1>, LossError> {
        let log_probs = log_softmax(logits.swap_dims(0, 1), 2);

        self.ctc_loss(log_probs, targets, input_lengths, target_lengths)
    }

    /// Compute the criterion on time-major log probabilities.
    ///
    /// Only the first `input_lengths[i]` positions and the first `target_lengths[i]` targets
    /// of item `i` are considered.
    ///
    /// # Shapes
    ///
    /// - log_probs: `[seq_length, batch_size, num_classes]`
    /// - targets: `[batch_size, max_target_length]`
    /// - input_lengths: `[batch_size]`
    /// - target_lengths: `[batch_size]`
    /// - output: `[1]`, or `[batch_size]` with [Reduction::None]
    pub fn ctc_loss<B: Backend>(
        &self,
        log_probs: Tensor<B, 3>,
        targets: Tensor<B, 2, Int>,
        input_lengths: Tensor<B, 1, Int>,
        target_lengths: Tensor<B, 1, Int>,
    ) -> Result<Tensor<B, 1>, LossError> {
        let alignment = self.align(&log_probs, &targets, &input_lengths, &target_lengths)?;
        let neg_log_likelihood = self.neg_log_likelihood(log_probs, &alignment);

        let loss = match self.reduction {
            Reduction::Mean => {
                let [batch_size] = neg_log_likelihood.dims();
                let lengths = alignment
                    .target_lengths
                    .iter()
                    .map(|&length| length.max(1) as f32)
                    .collect::<Vec<_>>();
                let lengths = Tensor::<B, 1>::from_data(
                    TensorData::new(lengths, [batch_size]),
                    &neg_log_likelihood.device(),
                );

                neg_log_likelihood.div(lengths).mean()
            }
            Reduction::Sum => neg_log_likelihood.sum(),
            Reduction::None => neg_log_likelihood,
        };

        Ok(loss)
    }

    fn align<B: Backend>(
        &self,
        log_probs: &Tensor<B, 3>,
        targets: &Tensor<B, 2, Int>,
        input_lengths: &Tensor<B, 1, Int>,
        target_lengths: &Tensor<B, 1, Int>,
    ) -> Result<Alignment, LossError> {
        let [seq_length, batch_size, num_classes] = log_probs.dims();
        let [targets_batch_size, max_targets] = targets.dims();

        check_batch_size("phonemes", batch_size, targets_batch_size)?;
        check_batch_size("text_len", batch_size, input_lengths.dims()[0])?;
        check_batch_size("phonemes_len", batch_size, target_lengths.dims()[0])?;
        check_num_classes(self.num_classes, num_classes)?;
        // The blank must be one of the predicted classes.
        if self.blank >= num_classes {
            return Err(LossError::ClassCountMismatch {
                expected: self.blank + 1,
                actual: num_classes,
            });
        }

        let blank = self.blank as i64;
        let targets = int_values(targets);
        let mut input_lengths_host = Vec::with_capacity(batch_size);
        let mut target_lengths_host = Vec::with_capacity(batch_size);

        for (item, (input_length, target_length)) in int_values(input_lengths)
            .into_iter()
            .zip(int_values(target_lengths))
            .enumerate()
        {
            if input_length < 1 || input_length > seq_length as i64 {
                return Err(LossError::InputLengthOutOfRange {
                    item,
                    length: input_length,
                    max: seq_length,
                });
            }
            if target_length < 0 || target_length > max_targets as i64 {
                return Err(LossError::TargetLengthOutOfRange {
                    item,
                    length: target_length,
                    max: max_targets,
                });
            }

            let (input_length, target_length) = (input_length as usize, target_length as usize);
            let start = item * max_targets;
            let labels = &targets[start..start + target_length];

            for &label in labels {
                if label == blank {
                    return Err(LossError::BlankInTarget {
                        item,
                        blank: self.blank,
                    });
                }
                if label < 0 || label >= num_classes as i64 {
                    return Err(LossError::TargetOutOfRange {
                        target: label,
                        num_classes,
                    });
                }
            }

            // Repeated labels need a blank in between.
            let repeats = labels.windows(2).filter(|pair| pair[0] == pair[1]).count();
            let required = target_length + repeats;
            if input_length < required {
                return Err(LossError::InfeasibleAlignment {
                    item,
                    input_length,
                    required,
                });
            }

            input_lengths_host.push(input_length);
            target_lengths_host.push(target_length);
        }

        let max_target_length = target_lengths_host.iter().copied().max().unwrap_or(0);
        let extended_length = 2 * max_target_length + 1;
        let mut extended = vec![blank; batch_size * extended_length];

        for (item, &target_length) in target_lengths_host.iter().enumerate() {
            let labels = &targets[item * max_targets..item * max_targets + target_length];
            for (position, &label) in labels.iter().enumerate() {
                extended[item * extended_length + 2 * position + 1] = label;
            }
        }

        Ok(Alignment {
            input_lengths: input_lengths_host,
            target_lengths: target_lengths_host,
            extended,
            extended_length,
        })
    }

    /// Run the alpha recursion and return the negative log likelihood of each item.
    fn neg_log_likelihood<B: Backend>(
        &self,
        log_probs: Tensor<B, 3>,
        alignment: &Alignment,
    ) -> Tensor<B, 1> {
        let [_, batch_size, num_classes] = log_probs.dims();
        let device = log_probs.device();
        let length = alignment.extended_length;
        let shape = [batch_size, length];

        let labels = Tensor::<B, 2, Int>::from_data(
            TensorData::new(alignment.extended.clone(), shape),
            &device,
        );
        let skip_forbidden = bool_mask::<B>(shape, &device, |item, s| {
            let row = &alignment.extended[item * length..(item + 1) * length];
            s < 2 || row[s] == self.blank as i64 || row[s] == row[s - 2]
        });
        let not_initial = bool_mask::<B>(shape, &device, |_, s| s >= 2);

        let emissions = |t: usize| {
            log_probs
                .clone()
                .slice([t..t + 1, 0..batch_size, 0..num_classes])
                .reshape([batch_size, num_classes])
                .gather(1, labels.clone())
        };

        let mut alpha = emissions(0).mask_fill(not_initial, NEG_INF);
        let max_input_length = alignment.input_lengths.iter().copied().max().unwrap_or(1);

        for t in 1..max_input_length {
            let stay = alpha.clone();
            let advance = shift_right(alpha.clone(), 1);
            let skip = shift_right(alpha.clone(), 2).mask_fill(skip_forbidden.clone(), NEG_INF);
            let next = log_sum_exp(vec![stay, advance, skip]).add(emissions(t));

            // Items whose input already ended keep their last alpha.
            if alignment.input_lengths.iter().any(|&input_length| t >= input_length) {
                let ended = bool_mask::<B>(shape, &device, |item, _| {
                    t >= alignment.input_lengths[item]
                });
                alpha = next.mask_where(ended, alpha);
            } else {
                alpha = next;
            }
        }

        let end_indices = |offset: usize| {
            let indices = alignment
                .target_lengths
                .iter()
                .map(|&target_length| (2 * target_length).saturating_sub(offset) as i64)
                .collect::<Vec<_>>();
            Tensor::<B, 2, Int>::from_data(TensorData::new(indices, [batch_size, 1]), &device)
        };
        let no_label = bool_mask::<B>([batch_size, 1], &device, |item, _| {
            alignment.target_lengths[item] == 0
        });

        let ends_on_blank = alpha.clone().gather(1, end_indices(0));
        let ends_on_label = alpha
            .gather(1, end_indices(1))
            .mask_fill(no_label, NEG_INF);

        log_sum_exp(vec![ends_on_blank, ends_on_label])
            .reshape([batch_size])
            .neg()
    }
}

impl<B: Backend> SequenceLoss<B> for SequenceCtcLoss {
    fn forward(
        &self,
        prediction: Tensor<B, 3>,
        batch: &PhonemeBatch<B>,
    ) -> Result<Tensor<B, 1>, LossError> {
        self.forward_logits(
            prediction,
            batch.phonemes.clone(),
            batch.text_len.clone(),
            batch.phonemes_len.clone(),
        )
    }
}

fn bool_mask<B: Backend>(
    shape: [usize; 2],
    device: &B::Device,
    predicate: impl Fn(usize, usize) -> bool,
) -> Tensor<B, 2, Bool> {
    let [rows, cols] = shape;
    let values = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .map(|(row, col)| predicate(row, col))
        .collect::<Vec<_>>();

    Tensor::from_data(TensorData::new(values, shape), device)
}

/// Shift the states of each row by `steps`, entering states start at log(0).
fn shift_right<B: Backend>(tensor: Tensor<B, 2>, steps: usize) -> Tensor<B, 2> {
    let [batch_size, length] = tensor.dims();
    let device = tensor.device();

    if steps >= length {
        return Tensor::full([batch_size, length], NEG_INF, &device);
    }

    // Assigned into the constant, the shifted states stay on the autodiff graph.
    Tensor::full([batch_size, length], NEG_INF, &device).slice_assign(
        [0..batch_size, steps..length],
        tensor.narrow(1, 0, length - steps),
    )
}

/// Element-wise log(sum(exp(x))) over tensors of the same shape.
fn log_sum_exp<B: Backend>(tensors: Vec<Tensor<B, 2>>) -> Tensor<B, 2> {
    let [batch_size, length] = tensors[0].dims();
    let stacked: Tensor<B, 3> = Tensor::stack(tensors, 2);
    let max = stacked.clone().detach().max_dim(2);

    let sum = stacked.sub(max.clone()).exp().sum_dim(2).log();
    sum.add(max).reshape([batch_size, length])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TestAutodiffBackend, TestBackend};
    use burn::tensor::{Distribution, ElementConversion, Tolerance, ops::FloatElem};

    type FT = FloatElem<TestBackend>;

    fn ints<const D: usize>(data: impl Into<TensorData>) -> Tensor<TestBackend, D, Int> {
        Tensor::from_data(data.into(), &Default::default())
    }

    fn loss(reduction: Reduction) -> SequenceCtcLoss {
        SequenceCtcLossConfig::new().with_reduction(reduction).init()
    }

    fn values(tensor: Tensor<TestBackend, 1>) -> Vec<f32> {
        tensor.into_data().iter::<f32>().collect()
    }

    /// Sum the probability of every path collapsing to the target.
    fn brute_force_nll(logits: &[Vec<f32>], target: &[usize], blank: usize) -> f32 {
        let num_classes = logits[0].len();
        let probs: Vec<Vec<f32>> = logits
            .iter()
            .map(|row| {
                let sum: f32 = row.iter().map(|x| x.exp()).sum();
                row.iter().map(|x| x.exp() / sum).collect()
            })
            .collect();

        let num_paths = num_classes.pow(probs.len() as u32);
        let mut likelihood = 0.0;

        for code in 0..num_paths {
            let mut rest = code;
            let path: Vec<usize> = (0..probs.len())
                .map(|_| {
                    let class = rest % num_classes;
                    rest /= num_classes;
                    class
                })
                .collect();

            let mut collapsed = Vec::new();
            let mut previous = None;
            for &class in path.iter() {
                if Some(class) != previous && class != blank {
                    collapsed.push(class);
                }
                previous = Some(class);
            }

            if collapsed == target {
                likelihood += path
                    .iter()
                    .enumerate()
                    .map(|(t, &class)| probs[t][class])
                    .product::<f32>();
            }
        }

        -likelihood.ln()
    }

    #[test]
    fn single_frame_single_label() {
        let logits = Tensor::<TestBackend, 3>::zeros([1, 1, 2], &Default::default());

        let loss = loss(Reduction::Mean)
            .forward_logits(logits, ints([[1i64]]), ints([1i64]), ints([1i64]))
            .unwrap();

        loss.into_data()
            .assert_approx_eq::<FT>(&TensorData::from([2f32.ln()]), Tolerance::default());
    }

    #[test]
    fn uniform_scores_sum_every_alignment() {
        // Alignments of "1" over two frames: "11", "01", "10".
        let logits = Tensor::<TestBackend, 3>::zeros([1, 2, 3], &Default::default());

        let loss = loss(Reduction::Sum)
            .forward_logits(logits, ints([[1i64]]), ints([2i64]), ints([1i64]))
            .unwrap();

        loss.into_data()
            .assert_approx_eq::<FT>(&TensorData::from([3f32.ln()]), Tolerance::default());
    }

    #[test]
    fn repeated_labels_require_a_blank() {
        // The only alignment of "11" over three frames is "101".
        let logits = Tensor::<TestBackend, 3>::zeros([1, 3, 2], &Default::default());
        let targets = ints([[1i64, 1]]);

        let sum = loss(Reduction::Sum)
            .forward_logits(logits.clone(), targets.clone(), ints([3i64]), ints([2i64]))
            .unwrap();
        let mean = loss(Reduction::Mean)
            .forward_logits(logits.clone(), targets.clone(), ints([3i64]), ints([2i64]))
            .unwrap();
        let infeasible = loss(Reduction::Mean).forward_logits(
            logits,
            targets,
            ints([2i64]),
            ints([2i64]),
        );

        sum.into_data()
            .assert_approx_eq::<FT>(&TensorData::from([8f32.ln()]), Tolerance::default());
        mean.into_data()
            .assert_approx_eq::<FT>(&TensorData::from([8f32.ln() / 2.0]), Tolerance::default());
        assert_eq!(
            infeasible.unwrap_err(),
            LossError::InfeasibleAlignment {
                item: 0,
                input_length: 2,
                required: 3
            }
        );
    }

    #[test]
    fn empty_target_aligns_with_blanks_only() {
        let logits = Tensor::<TestBackend, 3>::zeros([1, 2, 2], &Default::default());

        let loss = loss(Reduction::Mean)
            .forward_logits(logits, ints([[0i64, 0]]), ints([2i64]), ints([0i64]))
            .unwrap();

        loss.into_data()
            .assert_approx_eq::<FT>(&TensorData::from([4f32.ln()]), Tolerance::default());
    }

    #[test]
    fn matches_enumeration_of_alignments() {
        let logits = vec![
            vec![0.2, 1.1, -0.4, 0.3],
            vec![-0.5, 0.7, 1.6, 0.0],
            vec![1.2, -0.3, 0.4, 0.9],
            vec![0.1, 0.8, 0.2, -1.0],
        ];
        let target = [1usize, 2, 2];
        let flat: Vec<f32> = logits.iter().flatten().copied().collect();
        let tensor = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(flat, [1, 4, 4]),
            &Default::default(),
        );

        let loss = loss(Reduction::Sum)
            .forward_logits(tensor, ints([[1i64, 2, 2]]), ints([4i64]), ints([3i64]))
            .unwrap();

        let expected = brute_force_nll(&logits, &target, 0);
        loss.into_data()
            .assert_approx_eq::<FT>(&TensorData::from([expected]), Tolerance::default());
    }

    #[test]
    fn padding_past_lengths_is_ignored() {
        let device = Default::default();
        let logits =
            Tensor::<TestBackend, 3>::random([2, 5, 4], Distribution::Normal(0., 1.), &device);
        // Scramble the frames past the second item's input length.
        let noise =
            Tensor::<TestBackend, 3>::random([1, 2, 4], Distribution::Normal(0., 5.), &device);
        let scrambled = logits.clone().slice_assign([1..2, 3..5, 0..4], noise);

        let loss = loss(Reduction::None);
        let reference = loss
            .forward_logits(
                logits.clone(),
                ints([[1i64, 2, 3], [3, 1, 0]]),
                ints([5i64, 3]),
                ints([3i64, 2]),
            )
            .unwrap();
        let padded = loss
            .forward_logits(
                scrambled,
                ints([[1i64, 2, 3], [3, 1, 2]]),
                ints([5i64, 3]),
                ints([3i64, 2]),
            )
            .unwrap();
        let alone = loss
            .forward_logits(
                logits.slice([1..2, 0..3, 0..4]),
                ints([[3i64, 1]]),
                ints([3i64]),
                ints([2i64]),
            )
            .unwrap();

        reference
            .clone()
            .into_data()
            .assert_approx_eq::<FT>(&padded.into_data(), Tolerance::default());
        let reference = values(reference);
        assert!((reference[1] - values(alone)[0]).abs() < 1e-4);
    }

    #[test]
    fn loss_is_finite_and_non_negative() {
        let device = Default::default();
        let logits =
            Tensor::<TestBackend, 3>::random([3, 6, 5], Distribution::Normal(0., 2.), &device);

        let losses = loss(Reduction::None)
            .forward_logits(
                logits,
                ints([[1i64, 2, 3, 4], [4, 4, 0, 0], [2, 0, 0, 0]]),
                ints([6i64, 4, 1]),
                ints([4i64, 2, 1]),
            )
            .unwrap();

        for value in values(losses) {
            assert!(value.is_finite(), "loss {value} should be finite");
            assert!(value >= 0.0, "loss {value} should be non-negative");
        }
    }

    #[test]
    fn gradients_vanish_on_padded_frames() {
        let device = Default::default();
        let logits = Tensor::<TestAutodiffBackend, 3>::random(
            [2, 4, 3],
            Distribution::Normal(0., 1.),
            &device,
        )
        .require_grad();
        let int =
            |data: TensorData| Tensor::<TestAutodiffBackend, 1, Int>::from_data(data, &device);

        let loss = SequenceCtcLossConfig::new()
            .init()
            .forward_logits(
                logits.clone(),
                Tensor::from_data(TensorData::from([[1i64, 2], [2, 0]]), &device),
                int(TensorData::from([4i64, 2])),
                int(TensorData::from([2i64, 1])),
            )
            .unwrap();
        let grads = loss.backward();
        let grad = logits.grad(&grads).unwrap();

        grad.clone()
            .slice([1..2, 2..4, 0..3])
            .into_data()
            .assert_approx_eq::<FT>(&TensorData::zeros::<f32, _>([1, 2, 3]), Tolerance::default());
        grad.clone().sum_dim(2).into_data().assert_approx_eq::<FT>(
            &TensorData::zeros::<f32, _>([2, 4, 1]),
            Tolerance::default(),
        );
        let magnitude = grad.abs().sum().into_scalar().elem::<f32>();
        assert!(magnitude.is_finite() && magnitude > 0.0);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let device = Default::default();
        let shape = [2, 4, 3];
        let data: Vec<f32> = (0..24).map(|i| ((i * 7 % 11) as f32 - 5.0) * 0.3).collect();
        let targets = [[1i64, 2], [2, 0]];
        let loss = loss(Reduction::Mean);

        let logits = Tensor::<TestAutodiffBackend, 3>::from_data(
            TensorData::new(data.clone(), shape),
            &device,
        )
        .require_grad();
        let int =
            |data: TensorData| Tensor::<TestAutodiffBackend, 1, Int>::from_data(data, &device);
        let value = loss
            .forward_logits(
                logits.clone(),
                Tensor::from_data(TensorData::from(targets), &device),
                int(TensorData::from([4i64, 3])),
                int(TensorData::from([2i64, 1])),
            )
            .unwrap();
        let grads = value.backward();
        let grad: Vec<f32> = logits
            .grad(&grads)
            .unwrap()
            .into_data()
            .iter::<f32>()
            .collect();

        let forward = |data: Vec<f32>| {
            loss.forward_logits(
                Tensor::<TestBackend, 3>::from_data(TensorData::new(data, shape), &device),
                ints(targets),
                ints([4i64, 3]),
                ints([2i64, 1]),
            )
            .unwrap()
            .into_scalar()
            .elem::<f32>()
        };
        let epsilon = 1e-2;

        for (index, &analytic) in grad.iter().enumerate() {
            let mut plus = data.clone();
            plus[index] += epsilon;
            let mut minus = data.clone();
            minus[index] -= epsilon;
            let numeric = (forward(plus) - forward(minus)) / (2.0 * epsilon);

            assert!(
                (numeric - analytic).abs() < 2e-3,
                "gradient {index}: numeric {numeric}, autodiff {analytic}"
            );
        }
    }

    #[test]
    fn shifted_states_carry_gradient() {
        let states =
            Tensor::<TestAutodiffBackend, 2>::zeros([1, 4], &Default::default()).require_grad();

        let output = log_sum_exp(vec![
            states.clone(),
            shift_right(states.clone(), 1),
            shift_right(states.clone(), 2),
        ]);
        let grads = output.sum().backward();

        // Each output spreads a unit of gradient evenly over the states it reads.
        states.grad(&grads).unwrap().into_data().assert_approx_eq::<FT>(
            &TensorData::from([[11.0f32 / 6.0, 7.0 / 6.0, 2.0 / 3.0, 1.0 / 3.0]]),
            Tolerance::default(),
        );
    }

    #[test]
    fn input_length_beyond_prediction_is_rejected() {
        let logits = Tensor::<TestBackend, 3>::zeros([1, 3, 4], &Default::default());

        let too_long = loss(Reduction::Mean).forward_logits(
            logits.clone(),
            ints([[1i64]]),
            ints([4i64]),
            ints([1i64]),
        );
        let empty = loss(Reduction::Mean).forward_logits(
            logits,
            ints([[1i64]]),
            ints([0i64]),
            ints([1i64]),
        );

        assert_eq!(
            too_long.unwrap_err(),
            LossError::InputLengthOutOfRange {
                item: 0,
                length: 4,
                max: 3
            }
        );
        assert_eq!(
            empty.unwrap_err(),
            LossError::InputLengthOutOfRange {
                item: 0,
                length: 0,
                max: 3
            }
        );
    }

    #[test]
    fn target_length_beyond_targets_is_rejected() {
        let logits = Tensor::<TestBackend, 3>::zeros([1, 5, 4], &Default::default());

        let result = loss(Reduction::Mean).forward_logits(
            logits,
            ints([[1i64, 2]]),
            ints([5i64]),
            ints([3i64]),
        );

        assert_eq!(
            result.unwrap_err(),
            LossError::TargetLengthOutOfRange {
                item: 0,
                length: 3,
                max: 2
            }
        );
    }

    #[test]
    fn input_shorter_than_target_is_rejected() {
        let logits = Tensor::<TestBackend, 3>::zeros([2, 4, 4], &Default::default());

        let result = loss(Reduction::Mean).forward_logits(
            logits,
            ints([[1i64, 2, 3], [1, 2, 3]]),
            ints([4i64, 2]),
            ints([3i64, 3]),
        );

        assert_eq!(
            result.unwrap_err(),
            LossError::InfeasibleAlignment {
                item: 1,
                input_length: 2,
                required: 3
            }
        );
    }

    #[test]
    fn blank_inside_target_is_rejected() {
        let logits = Tensor::<TestBackend, 3>::zeros([1, 4, 4], &Default::default());

        let result = loss(Reduction::Mean).forward_logits(
            logits,
            ints([[1i64, 0, 2]]),
            ints([4i64]),
            ints([3i64]),
        );

        assert_eq!(
            result.unwrap_err(),
            LossError::BlankInTarget { item: 0, blank: 0 }
        );
    }

    #[test]
    fn custom_blank_index() {
        // With blank 2, label 0 is a regular class.
        let logits = Tensor::<TestBackend, 3>::zeros([1, 2, 3], &Default::default());

        let loss = SequenceCtcLossConfig::new()
            .with_blank(2)
            .with_reduction(Reduction::Sum)
            .init()
            .forward_logits(logits, ints([[0i64]]), ints([2i64]), ints([1i64]))
            .unwrap();

        loss.into_data()
            .assert_approx_eq::<FT>(&TensorData::from([3f32.ln()]), Tolerance::default());
    }

    #[test]
    fn blank_outside_predicted_classes_is_rejected() {
        let logits = Tensor::<TestBackend, 3>::zeros([1, 2, 3], &Default::default());

        let result = SequenceCtcLossConfig::new().with_blank(3).init().forward_logits(
            logits,
            ints([[1i64]]),
            ints([2i64]),
            ints([1i64]),
        );

        assert_eq!(
            result.unwrap_err(),
            LossError::ClassCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn length_vectors_must_match_batch() {
        let logits = Tensor::<TestBackend, 3>::zeros([2, 4, 4], &Default::default());

        let result = loss(Reduction::Mean).forward_logits(
            logits,
            ints([[1i64], [2]]),
            ints([4i64]),
            ints([1i64, 1]),
        );

        assert_eq!(
            result.unwrap_err(),
            LossError::BatchSizeMismatch {
                field: "text_len",
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    #[should_panic = "Blank index of CTC loss must be one of the 3 classes"]
    fn blank_outside_vocabulary_panics() {
        SequenceCtcLossConfig::new()
            .with_blank(3)
            .with_num_classes(Some(3))
            .init();
    }
}
