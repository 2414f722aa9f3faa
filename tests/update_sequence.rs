use etalu::{
    FactorError, FactorSettings, FactorSettingsBuilder, Factorization, IndexedVector,
    ReplaceStatus, SparseColumns,
};

// L =
//[ 1.0    ⋅     ⋅     ⋅ ]
//[ 0.5   1.0    ⋅     ⋅ ]
//[  ⋅    2.0   1.0    ⋅ ]
//[-1.0    ⋅    0.25  1.0]
//
// U =
//[ 4.0   1.0    ⋅    2.0]
//[  ⋅    2.0  -1.0    ⋅ ]
//[  ⋅     ⋅    0.5   0.5]
//[  ⋅     ⋅     ⋅    1.0]
fn factors_4x4() -> (SparseColumns, SparseColumns, Vec<f64>) {
    let lower = SparseColumns::from_columns(&[
        vec![(1, 0.5), (3, -1.0)],
        vec![(2, 2.0)],
        vec![(3, 0.25)],
        vec![],
    ]);
    let upper = SparseColumns::from_columns(&[
        vec![],
        vec![(0, 1.0)],
        vec![(1, -1.0)],
        vec![(0, 2.0), (2, 0.5)],
    ]);
    (lower, upper, vec![4.0, 2.0, 0.5, 1.0])
}

const ROW_PERM: [usize; 4] = [3, 1, 0, 2];
const COL_PERM: [usize; 4] = [2, 0, 3, 1];

fn factorization(settings: FactorSettings) -> Factorization {
    let (lower, upper, diag) = factors_4x4();
    Factorization::from_factors(settings, &lower, &upper, &diag, &ROW_PERM, &COL_PERM).unwrap()
}

// dense basis matching the factors: B[i][k] = (L*U)[ROW_PERM[i]][COL_PERM[k]]
fn basis() -> Vec<Vec<f64>> {
    let (lower, upper, diag) = factors_4x4();
    let n = diag.len();
    let mut l = vec![vec![0.0; n]; n];
    let mut u = vec![vec![0.0; n]; n];
    for j in 0..n {
        l[j][j] = 1.0;
        u[j][j] = diag[j];
        let (rows, values) = lower.column(j);
        for (&i, &x) in rows.iter().zip(values) {
            l[i][j] = x;
        }
        let (rows, values) = upper.column(j);
        for (&i, &x) in rows.iter().zip(values) {
            u[i][j] = x;
        }
    }
    (0..n)
        .map(|i| {
            (0..n)
                .map(|k| (0..n).map(|m| l[ROW_PERM[i]][m] * u[m][COL_PERM[k]]).sum())
                .collect()
        })
        .collect()
}

fn column(b: &[Vec<f64>], k: usize) -> Vec<f64> {
    b.iter().map(|row| row[k]).collect()
}

fn check_solves(f: &mut Factorization, b: &[Vec<f64>], tol: f64) {
    let n = b.len();
    let mut work = f.new_region();
    for j in 0..n {
        let mut rhs = IndexedVector::from_sparse(n, &[j], &[1.0]).unwrap();
        f.ftran_permuted(&mut work, &mut rhs);
        for (i, row) in b.iter().enumerate() {
            let bx: f64 = (0..n).map(|k| row[k] * rhs.get(k)).sum();
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((bx - expected).abs() < tol, "B x = e_{} fails in row {}", j, i);
        }

        let mut rhs = IndexedVector::from_sparse(n, &[j], &[1.0]).unwrap();
        f.btran_permuted(&mut work, &mut rhs);
        for k in 0..n {
            let bty: f64 = (0..n).map(|i| b[i][k] * rhs.get(i)).sum();
            let expected = if k == j { 1.0 } else { 0.0 };
            assert!((bty - expected).abs() < tol, "B^T y = e_{} fails in column {}", j, k);
        }
    }
    assert!(work.is_clear());
}

// FTRAN alpha of the entering column `a`, then the sparse replacement
fn replace_sparse(f: &mut Factorization, pos: usize, a: &[f64]) -> ReplaceStatus {
    let indices: Vec<usize> = (0..a.len()).filter(|&i| a[i] != 0.0).collect();
    let values: Vec<f64> = indices.iter().map(|&i| a[i]).collect();
    let mut work = f.new_region();
    let mut x = IndexedVector::from_sparse(a.len(), &indices, &values).unwrap();
    f.ftran_permuted(&mut work, &mut x);
    let alpha = x.get(pos);
    f.replace_column_sparse(pos, alpha, &indices, &values).unwrap()
}

#[test]
fn test_diagonal_end_to_end() {
    let mut f = Factorization::from_factors(
        FactorSettings::default(),
        &SparseColumns::new(3),
        &SparseColumns::new(3),
        &[2.0, 3.0, 5.0],
        &[0, 1, 2],
        &[0, 1, 2],
    )
    .unwrap();

    let mut work = f.new_region();
    let mut rhs = IndexedVector::from_dense(&[1.0, 1.0, 1.0]);
    assert_eq!(f.ftran_permuted(&mut work, &mut rhs), 3);
    assert!((rhs.get(0) - 0.5).abs() < 1e-12);
    assert!((rhs.get(1) - 1.0 / 3.0).abs() < 1e-12);
    assert!((rhs.get(2) - 0.2).abs() < 1e-12);

    let status = f
        .replace_column_sparse(1, 4.0 / 3.0, &[1], &[4.0])
        .unwrap();
    assert_eq!(status, ReplaceStatus::Ok);
    assert_eq!(status.code(), 0);
    assert_eq!(f.reciprocal_pivot(1), 0.25);

    let mut rhs = IndexedVector::from_dense(&[1.0, 1.0, 1.0]);
    f.ftran_permuted(&mut work, &mut rhs);
    assert!((rhs.get(1) - 0.25).abs() < 1e-12);
}

#[test]
fn test_sparse_replacements_track_basis() {
    let mut b = basis();
    let mut f = factorization(FactorSettings::default());
    check_solves(&mut f, &b, 1e-12);

    for (pos, other, weight) in [(0, 2, 0.5), (3, 1, -0.25), (1, 0, 2.0), (0, 3, 0.5)] {
        let a: Vec<f64> = b.iter().map(|row| row[pos] + weight * row[other]).collect();
        let status = replace_sparse(&mut f, pos, &a);
        assert_eq!(status, ReplaceStatus::Ok);
        for (row, &x) in b.iter_mut().zip(&a) {
            row[pos] = x;
        }
        assert_eq!(f.u_consistency_errors(), 0);
        check_solves(&mut f, &b, 1e-10);
    }
    assert_eq!(f.number_pivots(), 4);
}

#[test]
fn test_replace_column_sparse_rejects_bad_input() {
    let mut f = factorization(FactorSettings::default());
    assert_eq!(
        f.replace_column_sparse(0, 1.0, &[1, 1], &[1.0, 2.0]),
        Err(FactorError::DuplicateIndex(1))
    );
    assert_eq!(
        f.replace_column_sparse(0, 1.0, &[4], &[1.0]),
        Err(FactorError::IndexOutOfRange { index: 4, len: 4 })
    );
    assert_eq!(
        f.replace_column_sparse(7, 1.0, &[0], &[1.0]),
        Err(FactorError::IndexOutOfRange { index: 7, len: 4 })
    );
    assert_eq!(f.number_pivots(), 0);
}

#[test]
fn test_arena_compaction() {
    let settings = FactorSettingsBuilder::default()
        .u_area(Some(16))
        .r_area(Some(1000))
        .maximum_pivots(30)
        .build()
        .unwrap();
    let mut f = factorization(settings);
    let mut b = basis();

    // Shear pairs of columns back and forth. Each entering column mixes in
    // the column placed by the step before, so the newest U row (still
    // empty and boxed in at the file end) has to be moved every time.
    let mut moved = false;
    for step in 0..30 {
        let partner = [1, 0, 2][step / 10];
        let (pos, other, weight) = if step % 2 == 0 {
            (partner, 3, 0.5)
        } else {
            (3, partner, -0.5)
        };
        let a: Vec<f64> = b.iter().map(|row| row[pos] + weight * row[other]).collect();

        let compressions = f.row_compressions();
        let before: Vec<Option<usize>> = (0..f.rows_extra()).map(|i| f.u_row_start(i)).collect();

        let status = replace_sparse(&mut f, pos, &a);
        assert_eq!(status, ReplaceStatus::Ok, "step {}", step);
        for (row, &x) in b.iter_mut().zip(&a) {
            row[pos] = x;
        }

        if f.row_compressions() > compressions {
            for (i, start) in before.iter().enumerate() {
                if let (Some(old), Some(new)) = (start, f.u_row_start(i)) {
                    moved |= new != *old;
                }
            }
        }
        assert_eq!(f.u_consistency_errors(), 0);
        assert_eq!(f.u_entries_by_row(), f.u_entries_by_column());
    }

    assert_eq!(f.u_area(), 16);
    assert!(f.row_compressions() >= 2);
    assert!(f.column_compressions() > 0);
    assert!(moved);
    check_solves(&mut f, &b, 1e-9);

    // no pivot slot is left
    let status = replace_sparse(&mut f, 0, &column(&b, 0));
    assert_eq!(status, ReplaceStatus::PivotLimitReached);
}

#[test]
fn test_btran_dense_leaves_work_clear() {
    let b = basis();
    let mut f = factorization(FactorSettings::default());
    let mut work = f.new_region();
    let c = [1.0, 0.0, -3.0, 0.25];
    let mut y = c;
    f.btran_dense(&mut work, &mut y);
    assert!(work.is_clear());
    for k in 0..4 {
        let bty: f64 = (0..4).map(|i| b[i][k] * y[i]).sum();
        assert!((bty - c[k]).abs() < 1e-12);
    }
}

#[test]
fn test_concurrent_read_only_solves() {
    let b = basis();
    let mut f = factorization(FactorSettings::default());
    let a: Vec<f64> = b.iter().map(|row| row[3] + 0.5 * row[2]).collect();
    assert_eq!(replace_sparse(&mut f, 3, &a), ReplaceStatus::Ok);
    let f = f;

    let results: Vec<Vec<(usize, f64)>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|j| {
                let f = &f;
                s.spawn(move || {
                    let mut ws = f.new_workspace();
                    let mut region = f.new_region();
                    region.insert(j, 1.0).unwrap();
                    f.ftran_with(&mut region, &mut ws);
                    assert!(ws.is_clear());
                    region.sort_indices();
                    region.iter().collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // the same solves done one after the other
    let mut ws = f.new_workspace();
    for (j, expected) in results.iter().enumerate() {
        let mut region = f.new_region();
        region.insert(j, 1.0).unwrap();
        f.ftran_with(&mut region, &mut ws);
        region.sort_indices();
        assert_eq!(&region.iter().collect::<Vec<_>>(), expected);
    }
}

#[test]
#[should_panic(expected = "out of range")]
fn test_ftran_permuted_rejects_row_beyond_rows() {
    let mut f = Factorization::from_factors(
        FactorSettings::default(),
        &SparseColumns::new(3),
        &SparseColumns::new(3),
        &[2.0, 3.0, 5.0],
        &[0, 1, 2],
        &[0, 1, 2],
    )
    .unwrap();
    let mut work = f.new_region();
    let mut rhs = IndexedVector::from_sparse(6, &[0, 5], &[1.0, 7.0]).unwrap();
    f.ftran_permuted(&mut work, &mut rhs);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_btran_permuted_rejects_position_beyond_rows() {
    let mut f = factorization(FactorSettings::default());
    let mut work = f.new_region();
    let mut rhs = IndexedVector::from_sparse(8, &[1, 4], &[1.0, 2.0]).unwrap();
    f.btran_permuted(&mut work, &mut rhs);
}
