// Tests for the GEMM primitive against a naive column-major product, for the
// two transpose combinations the dense layer uses.

use approx::assert_relative_eq;
use rust_nnp_layer::linalg::{gemm, Transpose};
use rust_nnp_layer::utils::XorShiftRng;

fn random_matrix(len: usize, rng: &mut XorShiftRng) -> Vec<f64> {
    (0..len).map(|_| rng.uniform(-1.0, 1.0)).collect()
}

#[test]
fn test_transposed_times_normal() {
    // C (m x n) = A^T B with A stored k x m and B stored k x n
    let (m, n, k) = (3, 4, 5);
    let mut rng = XorShiftRng::new(1);
    let a = random_matrix(k * m, &mut rng);
    let b = random_matrix(k * n, &mut rng);
    let mut c = vec![0.0; m * n];

    gemm(
        Transpose::Ordinary,
        Transpose::None,
        m,
        n,
        k,
        1.0,
        &a,
        k,
        &b,
        k,
        0.0,
        &mut c,
        m,
    );

    for j in 0..n {
        for i in 0..m {
            let expected: f64 = (0..k).map(|p| a[p + i * k] * b[p + j * k]).sum();
            assert_relative_eq!(c[i + j * m], expected, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_normal_times_normal() {
    // C (m x n) = A B with A stored m x k and B stored k x n
    let (m, n, k) = (4, 2, 3);
    let mut rng = XorShiftRng::new(2);
    let a = random_matrix(m * k, &mut rng);
    let b = random_matrix(k * n, &mut rng);
    let mut c = vec![0.0; m * n];

    gemm(
        Transpose::None,
        Transpose::None,
        m,
        n,
        k,
        1.0,
        &a,
        m,
        &b,
        k,
        0.0,
        &mut c,
        m,
    );

    for j in 0..n {
        for i in 0..m {
            let expected: f64 = (0..k).map(|p| a[i + p * m] * b[p + j * k]).sum();
            assert_relative_eq!(c[i + j * m], expected, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_single_precision_product() {
    let a = [1.0f32, 2.0, 3.0, 4.0];
    let b = [1.0f32, -1.0];
    let mut c = [0.0f32; 2];

    gemm(
        Transpose::None,
        Transpose::None,
        2,
        1,
        2,
        1.0,
        &a,
        2,
        &b,
        2,
        0.0,
        &mut c,
        2,
    );

    // [[1, 3], [2, 4]] * [1, -1]
    assert_eq!(c, [-2.0, -2.0]);
}

#[test]
fn test_empty_product_is_noop() {
    let mut c: Vec<f64> = vec![];
    gemm(
        Transpose::None,
        Transpose::None,
        0,
        0,
        3,
        1.0,
        &[],
        1,
        &[],
        3,
        0.0,
        &mut c,
        1,
    );
    assert!(c.is_empty());
}
