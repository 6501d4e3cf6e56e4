pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Fraction of correct answers in [0, 1]; 0 when nothing was attempted
pub fn accuracy(correct: u32, total: u32) -> f64 {
    match total {
        0 => 0.0,
        total => (correct.min(total) as f64) / total as f64,
    }
}
