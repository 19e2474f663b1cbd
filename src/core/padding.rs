//! Block-size padding, truncation and mask construction.
//!
//! Mask convention: `false` = active (contributes to the loss),
//! `true` = ignored.

pub use crate::tokenizer::EOT_ID;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Padded {
    pub ids: Vec<u32>,
    pub mask: Vec<bool>,
    /// Input was at least `block_size` long and lost its front.
    pub truncated: bool,
    /// Number of real (non-sentinel) ids kept.
    pub content_len: usize,
}

impl Padded {
    pub fn active_count(&self) -> usize {
        active_count(&self.mask)
    }

    /// Last index whose mask entry is `false`.
    pub fn last_active(&self) -> Option<usize> {
        self.mask.iter().rposition(|&m| !m)
    }
}

/// Pad or truncate `ids` to exactly `block_size`.
///
/// At or over the block: keep the **last** `block_size` ids, nothing masked.
/// Under the block: right-pad with `pad_id`; indices `< len + 1` stay active
/// so the first pad slot remains a next-token target, the rest are masked.
pub fn pad_tokens(ids: &[u32], block_size: usize, pad_id: u32) -> Padded {
    if ids.len() >= block_size {
        let kept = ids[ids.len() - block_size..].to_vec();
        return Padded {
            ids: kept,
            mask: vec![false; block_size],
            truncated: true,
            content_len: block_size,
        };
    }

    let mut padded = vec![pad_id; block_size];
    padded[..ids.len()].copy_from_slice(ids);
    let mask = (0..block_size).map(|i| i >= ids.len() + 1).collect();
    Padded {
        ids: padded,
        mask,
        truncated: false,
        content_len: ids.len(),
    }
}

/// A prompt/response concatenation survives the dataset filter iff it fits
/// in `block_size + 1` (the extra slot is the shifted target).
pub fn fits_block(prompt_len: usize, response_len: usize, block_size: usize) -> bool {
    prompt_len + response_len <= block_size + 1
}

/// A preference pair is kept only if both sides fit.
pub fn keep_pair(prompt_len: usize, chosen_len: usize, rejected_len: usize, block_size: usize) -> bool {
    fits_block(prompt_len, chosen_len, block_size) && fits_block(prompt_len, rejected_len, block_size)
}

/// Right-pad a scalar array with `fill`; anything past the block is cut.
pub fn pad_values<T: Clone>(values: &[T], block_size: usize, fill: T) -> Vec<T> {
    let mut out: Vec<T> = values.iter().take(block_size).cloned().collect();
    out.resize(block_size, fill);
    out
}

/// `true` for generated positions `prompt_len..completion_len`, `false` for
/// prompt and padding.
pub fn action_mask(prompt_len: usize, completion_len: usize, block_size: usize) -> Vec<bool> {
    (0..block_size)
        .map(|i| i >= prompt_len && i < completion_len)
        .collect()
}

/// Number of active (`false`) mask entries.
pub fn active_count(mask: &[bool]) -> usize {
    mask.iter().filter(|&&m| !m).count()
}
