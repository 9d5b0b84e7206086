/// Errors raised while computing a sequence loss.
///
/// All of them point at a malformed batch or a misconfigured model and are not
/// meant to be retried.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LossError {
    /// The prediction and the targets disagree on the sequence length.
    #[error("Sequence mismatch: prediction has {prediction} positions, targets provide {targets}")]
    SequenceMismatch {
        /// Number of positions in the prediction.
        prediction: usize,
        /// Number of usable target positions.
        targets: usize,
    },

    /// A batch field doesn't have one entry per batch item.
    #[error("Batch size mismatch for `{field}`: expected {expected}, got {actual}")]
    BatchSizeMismatch {
        /// Name of the offending batch field.
        field: &'static str,
        /// Batch size of the prediction.
        expected: usize,
        /// Batch size of the field.
        actual: usize,
    },

    /// The class dimension doesn't match the configured number of classes.
    #[error("Class count mismatch: expected {expected} classes, got {actual}")]
    ClassCountMismatch {
        /// Expected number of classes.
        expected: usize,
        /// Number of classes found.
        actual: usize,
    },

    /// A target id doesn't index a valid class.
    #[error("Target id {target} is out of range for {num_classes} classes")]
    TargetOutOfRange {
        /// The offending target id.
        target: i64,
        /// Number of classes of the prediction.
        num_classes: usize,
    },

    /// The blank label appears inside the valid part of a CTC target.
    #[error("Blank index {blank} found in the target of batch item {item}")]
    BlankInTarget {
        /// Batch item holding the blank.
        item: usize,
        /// The blank index.
        blank: usize,
    },

    /// An input length is zero or longer than the prediction.
    #[error("Input length {length} of batch item {item} is out of range 1..={max}")]
    InputLengthOutOfRange {
        /// Batch item with the invalid length.
        item: usize,
        /// The invalid length.
        length: i64,
        /// Number of positions in the prediction.
        max: usize,
    },

    /// A target length is negative or longer than the supplied targets.
    #[error("Target length {length} of batch item {item} is out of range 0..={max}")]
    TargetLengthOutOfRange {
        /// Batch item with the invalid length.
        item: usize,
        /// The invalid length.
        length: i64,
        /// Number of target tokens supplied per item.
        max: usize,
    },

    /// No CTC alignment exists: the input is too short for the target.
    #[error(
        "No alignment for batch item {item}: {required} input positions required, {input_length} available"
    )]
    InfeasibleAlignment {
        /// Batch item without alignment.
        item: usize,
        /// Valid input length of the item.
        input_length: usize,
        /// Minimum input length required by the target.
        required: usize,
    },
}
