use serde::{Deserialize, Serialize};

/// How display heights are derived from raw counts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StackTransform {
    /// Stacks are incremented together with counts.
    #[default]
    Counts,
    /// `stacks[i]` is the running total of `counts[0..=i]`.
    Cumulative,
    /// Stacks ease towards `count / block_value` once per sample.
    Smoothed { smoothing: f64, block_value: f64 },
}

impl StackTransform {
    /// Smoothing carries state between calls, so it runs after every sample.
    /// The other modes only depend on the counts and run once per frame.
    pub fn per_sample(&self) -> bool {
        matches!(self, StackTransform::Smoothed { .. })
    }

    /// Whether `record` should bump the stack along with the count.
    pub fn tracks_counts(&self) -> bool {
        matches!(self, StackTransform::Counts)
    }

    pub fn apply(&self, counts: &[u64], stacks: &mut [f64]) {
        match *self {
            StackTransform::Counts => {}
            StackTransform::Cumulative => {
                let mut acc = 0u64;
                for (stack, count) in stacks.iter_mut().zip(counts) {
                    acc += count;
                    *stack = acc as f64;
                }
            }
            StackTransform::Smoothed {
                smoothing,
                block_value,
            } => {
                if block_value <= 0.0 {
                    return;
                }
                for (stack, count) in stacks.iter_mut().zip(counts) {
                    let target = *count as f64 / block_value;
                    *stack += (target - *stack) * smoothing;
                }
            }
        }
    }
}
