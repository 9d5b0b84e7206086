#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Sequence losses for training text-to-phoneme models with Burn.
//!
//! Two criteria are provided behind the [SequenceLoss](loss::SequenceLoss) trait:
//!
//! - [SequenceCrossEntropyLoss](loss::SequenceCrossEntropyLoss) for autoregressive models, where
//!   the targets are the phoneme sequence shifted past its start token.
//! - [SequenceCtcLoss](loss::SequenceCtcLoss) for forward models, aligned with Connectionist
//!   Temporal Classification.
//!
//! A training loop usually builds a [PhonemeBatch](batch::PhonemeBatch) with the
//! [PhonemeBatcher](batch::PhonemeBatcher) and selects the criterion from a
//! [SequenceLossConfig](loss::SequenceLossConfig).

#[macro_use]
extern crate derive_new;

/// Batch records and the batcher producing them.
pub mod batch;

/// Error types.
pub mod error;

/// Loss functions.
pub mod loss;

pub use batch::*;
pub use error::*;

/// Backend for test cases
#[cfg(test)]
pub type TestBackend = burn::backend::NdArray<f32>;

/// Backend for autodiff test cases
#[cfg(test)]
pub type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;
