// Copyright (C) 2022-2023 Richard Lincoln

// Solve statistics and the fill estimates used to pick a traversal.

/// Counters accumulated while `collect_statistics` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub ftran_calls: usize,
    pub ftran_input: usize, // nonzeros handed to FTRAN
    pub ftran_after_l: usize,
    pub ftran_after_r: usize,
    pub ftran_after_u: usize,
    pub btran_calls: usize,
    pub btran_input: usize, // nonzeros handed to BTRAN
    pub btran_after_u: usize,
    pub btran_after_r: usize,
    pub btran_after_l: usize,
    pub replace_calls: usize,
    pub time_ftran: f64, // seconds
    pub time_btran: f64,
    pub time_replace: f64,
}

/// Nonzero counts at the stage boundaries of one solve.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StageCounts {
    pub(crate) input: usize,
    pub(crate) first: usize,
    pub(crate) middle: usize,
    pub(crate) last: usize,
}

impl Statistics {
    pub(crate) fn record_ftran(&mut self, counts: &StageCounts, elapsed: f64) {
        self.ftran_calls += 1;
        self.ftran_input += counts.input;
        self.ftran_after_l += counts.first;
        self.ftran_after_r += counts.middle;
        self.ftran_after_u += counts.last;
        self.time_ftran += elapsed;
    }

    pub(crate) fn record_btran(&mut self, counts: &StageCounts, elapsed: f64) {
        self.btran_calls += 1;
        self.btran_input += counts.input;
        self.btran_after_u += counts.first;
        self.btran_after_r += counts.middle;
        self.btran_after_l += counts.last;
        self.time_btran += elapsed;
    }
}

/// Running ratios of stage output to stage input nonzeros. Zero means no
/// solve has been observed yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DensityEstimates {
    pub ftran_after_l: f64,
    pub ftran_after_r: f64,
    pub ftran_after_u: f64,
    pub btran_after_u: f64,
    pub btran_after_l: f64,
}

impl DensityEstimates {
    pub(crate) fn record_ftran(&mut self, counts: &StageCounts) {
        blend(&mut self.ftran_after_l, counts.input, counts.first);
        blend(&mut self.ftran_after_r, counts.first, counts.middle);
        blend(&mut self.ftran_after_u, counts.middle, counts.last);
    }

    pub(crate) fn record_btran(&mut self, counts: &StageCounts) {
        blend(&mut self.btran_after_u, counts.input, counts.first);
        blend(&mut self.btran_after_l, counts.middle, counts.last);
    }
}

fn blend(average: &mut f64, before: usize, after: usize) {
    if before == 0 {
        return;
    }
    let ratio = after as f64 / before as f64;
    *average = if *average == 0.0 {
        ratio
    } else {
        0.9 * *average + 0.1 * ratio
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend() {
        let mut est = DensityEstimates::default();
        let counts = StageCounts {
            input: 2,
            first: 4,
            middle: 4,
            last: 8,
        };
        est.record_ftran(&counts);
        assert_eq!(est.ftran_after_l, 2.0);
        assert_eq!(est.ftran_after_r, 1.0);
        assert_eq!(est.ftran_after_u, 2.0);

        est.record_ftran(&StageCounts::default());
        assert_eq!(est.ftran_after_l, 2.0);

        est.record_ftran(&StageCounts {
            input: 1,
            first: 1,
            middle: 1,
            last: 1,
        });
        assert!((est.ftran_after_l - 1.9).abs() < 1e-15);
    }
}
