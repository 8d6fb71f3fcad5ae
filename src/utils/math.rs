//! Math utility functions

/// Softmax function
pub fn softmax(x: &[f32]) -> Vec<f32> {
    let max_val = x.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp_vals: Vec<f32> = x.iter().map(|v| (v - max_val).exp()).collect();
    let sum: f32 = exp_vals.iter().sum();
    exp_vals.iter().map(|v| v / sum).collect()
}

/// Argmax - index of the maximum value (first one on ties)
pub fn argmax(x: &[f32]) -> usize {
    x.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (idx, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}
