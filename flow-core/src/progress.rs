//! Completion fraction for the progress indicator.

use crate::config::ProgressIndicatorConfig;

/// Fraction of the flow completed at `current`, in `0.0..=1.0`.
///
/// Only indices in `start..=end` that are not in `skip` count. With fewer than
/// two counted screens the flow is considered complete. A `current` index that
/// is not counted takes the position of the closest counted index before it,
/// so the fraction never decreases while moving forward.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress_fraction(
    current: usize,
    total: usize,
    start: Option<usize>,
    end: Option<usize>,
    skip: &[usize],
) -> f32 {
    let Some(last) = total.checked_sub(1) else {
        return 1.0;
    };
    let start = start.unwrap_or(0);
    let end = end.unwrap_or(last).min(last);
    if start > end {
        return 1.0;
    }

    let counted: Vec<usize> = (start..=end).filter(|i| !skip.contains(i)).collect();
    if counted.len() <= 1 {
        return 1.0;
    }

    let position = counted
        .partition_point(|&i| i <= current)
        .saturating_sub(1);
    position as f32 / (counted.len() - 1) as f32
}

impl ProgressIndicatorConfig {
    /// Fraction to display at `current`, or `None` when the indicator is disabled.
    #[must_use]
    pub fn fraction(&self, current: usize, total: usize) -> Option<f32> {
        self.enabled.then(|| {
            progress_fraction(
                current,
                total,
                self.start_screen,
                self.end_screen,
                &self.skip_screens,
            )
        })
    }
}
