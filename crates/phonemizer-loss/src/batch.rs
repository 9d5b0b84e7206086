use burn::{
    data::dataloader::batcher::Batcher,
    tensor::{Int, Tensor, TensorData, backend::Backend},
};

/// A tokenized training sample.
///
/// The phoneme sequence is expected to carry its start and end markers already.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct PhonemeItem {
    /// Input token ids.
    pub text: Vec<usize>,
    /// Target phoneme ids.
    pub phonemes: Vec<usize>,
}

/// A padded training batch as consumed by the sequence losses.
#[derive(Debug, Clone, new)]
pub struct PhonemeBatch<B: Backend> {
    /// Padded input token ids.
    ///
    /// Shape: `[batch_size, max_text_length]`
    pub text: Tensor<B, 2, Int>,
    /// Padded target phoneme ids, the first column being the start marker.
    ///
    /// Shape: `[batch_size, max_phoneme_length]`
    pub phonemes: Tensor<B, 2, Int>,
    /// Valid length of each input sequence.
    ///
    /// Shape: `[batch_size]`
    pub text_len: Tensor<B, 1, Int>,
    /// Valid length of each phoneme sequence.
    ///
    /// Shape: `[batch_size]`
    pub phonemes_len: Tensor<B, 1, Int>,
}

/// Collates [phoneme items](PhonemeItem) into a [phoneme batch](PhonemeBatch).
///
/// Sequences are right padded with `pad_index` up to the longest one of the batch.
#[derive(Clone, Debug, new)]
pub struct PhonemeBatcher {
    pad_index: usize,
}

impl Default for PhonemeBatcher {
    fn default() -> Self {
        Self::new(0)
    }
}

impl PhonemeBatcher {
    /// The padding index written past the end of each sequence.
    pub fn pad_index(&self) -> usize {
        self.pad_index
    }

    fn pad<B: Backend>(
        &self,
        sequences: &[&[usize]],
        device: &B::Device,
    ) -> (Tensor<B, 2, Int>, Tensor<B, 1, Int>) {
        let batch_size = sequences.len();
        let max_length = sequences.iter().map(|seq| seq.len()).max().unwrap_or(0);

        let mut values = Vec::with_capacity(batch_size * max_length);
        let mut lengths = Vec::with_capacity(batch_size);

        for seq in sequences {
            values.extend(seq.iter().map(|&id| id as i64));
            values.extend(core::iter::repeat_n(
                self.pad_index as i64,
                max_length - seq.len(),
            ));
            lengths.push(seq.len() as i64);
        }

        let padded = Tensor::from_data(TensorData::new(values, [batch_size, max_length]), device);
        let lengths = Tensor::from_data(TensorData::new(lengths, [batch_size]), device);

        (padded, lengths)
    }
}

impl<B: Backend> Batcher<B, PhonemeItem, PhonemeBatch<B>> for PhonemeBatcher {
    fn batch(&self, items: Vec<PhonemeItem>, device: &B::Device) -> PhonemeBatch<B> {
        let texts: Vec<&[usize]> = items.iter().map(|item| item.text.as_slice()).collect();
        let phonemes: Vec<&[usize]> = items.iter().map(|item| item.phonemes.as_slice()).collect();

        let (text, text_len) = self.pad::<B>(&texts, device);
        let (phonemes, phonemes_len) = self.pad::<B>(&phonemes, device);

        PhonemeBatch {
            text,
            phonemes,
            text_len,
            phonemes_len,
        }
    }
}
