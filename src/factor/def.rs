// Bitmap granularity of the sparsish solves: one byte covers eight rows.
pub(crate) const BITS_PER_CHECK: usize = 8;
pub(crate) const CHECK_SHIFT: usize = 3;

/// A replacement pivot at or below this magnitude is always rejected.
pub(crate) const PIVOT_ZERO: f64 = 1.0e-7;

/// The three interchangeable traversals of a triangular solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// sequential pass over every row in range
    Densish,
    /// pass over the bitmap words that have rows marked
    Sparsish,
    /// depth first search over the reachable rows only
    Sparse,
}

/// Outcome of [`Factorization::replace_column`](crate::Factorization::replace_column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStatus {
    /// The pivot was applied and passed the accuracy test.
    Ok,
    /// The pivot was applied but its accuracy is doubtful.
    OkDegraded,
    /// The pivot was rejected; nothing was changed. Refactorize.
    Singular,
    /// The arenas are too small. With `pivot_applied` the replacement went
    /// through but fill has grown enough that refactorizing is advised.
    OutOfSpace { pivot_applied: bool },
    /// No further replacements are possible before a refactorization.
    PivotLimitReached,
}

impl ReplaceStatus {
    /// Integer status code: 0 ok, 1 degraded, 2 singular, 3 out of space,
    /// 5 pivot limit.
    pub fn code(&self) -> i32 {
        match self {
            ReplaceStatus::Ok => 0,
            ReplaceStatus::OkDegraded => 1,
            ReplaceStatus::Singular => 2,
            ReplaceStatus::OutOfSpace { .. } => 3,
            ReplaceStatus::PivotLimitReached => 5,
        }
    }

    /// True if the factorization now represents the updated basis.
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            ReplaceStatus::Ok
                | ReplaceStatus::OkDegraded
                | ReplaceStatus::OutOfSpace {
                    pivot_applied: true
                }
        )
    }
}

/// Result of [`Factorization::ftran_for_update`](crate::Factorization::ftran_for_update).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FtranUpdate {
    /// number of nonzeros in the solution
    pub count: usize,
    /// false if the spike did not fit into the U arena (or no pivot slot is
    /// left); a following `replace_column` then reports `OutOfSpace`
    pub stored: bool,
}

/// Picks the traversal for a stage that receives `number` nonzeros, given the
/// running fill ratio `average` of the stage (zero when unknown) and the
/// stage dimension `size`. A zero `threshold` selects the sequential pass.
pub(crate) fn select_tier(
    number: usize,
    average: f64,
    size: usize,
    threshold: usize,
    threshold2: usize,
) -> Tier {
    if threshold == 0 {
        return Tier::Densish;
    }
    let estimate = if average > 0.0 {
        (number as f64 * average) as usize
    } else {
        number
    };
    if estimate < threshold && 4 * size > estimate {
        Tier::Sparse
    } else if estimate < threshold2 && 2 * size > estimate {
        Tier::Sparsish
    } else {
        Tier::Densish
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_tier() {
        assert_eq!(select_tier(5, 0.0, 100, 0, 0), Tier::Densish);
        assert_eq!(select_tier(5, 0.0, 100, 10, 50), Tier::Sparse);
        assert_eq!(select_tier(5, 4.0, 100, 10, 50), Tier::Sparsish);
        assert_eq!(select_tier(5, 20.0, 100, 10, 50), Tier::Densish);
        // a tiny factor is cheaper to sweep
        assert_eq!(select_tier(5, 0.0, 1, 10, 50), Tier::Densish);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ReplaceStatus::Ok.code(), 0);
        assert_eq!(ReplaceStatus::OkDegraded.code(), 1);
        assert_eq!(ReplaceStatus::Singular.code(), 2);
        assert_eq!(
            ReplaceStatus::OutOfSpace {
                pivot_applied: true
            }
            .code(),
            3
        );
        assert_eq!(ReplaceStatus::PivotLimitReached.code(), 5);
        assert!(!ReplaceStatus::Singular.is_applied());
        assert!(ReplaceStatus::OutOfSpace {
            pivot_applied: true
        }
        .is_applied());
    }
}
