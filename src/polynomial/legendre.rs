//! Legendre polynomial evaluation.
//!
//! Legendre polynomials P_n(x) are orthogonal on [-1, 1] with weight 1:
//! ∫ P_m P_n dx = 2/(2n+1) δ_{mn}. They underpin both quadrature rules
//! and the flux-correction (Radau) functions.

/// Evaluate P_n(x) by the three-term recurrence
/// (n+1) P_{n+1} = (2n+1) x P_n - n P_{n-1}.
pub fn legendre(n: usize, x: f64) -> f64 {
    if n == 0 {
        return 1.0;
    }

    let mut p_prev = 1.0;
    let mut p_curr = x;

    for k in 1..n {
        let p_next = ((2 * k + 1) as f64 * x * p_curr - k as f64 * p_prev) / (k + 1) as f64;
        p_prev = p_curr;
        p_curr = p_next;
    }

    p_curr
}

/// Evaluate P'_n(x).
///
/// Uses P'_n(x) = n (x P_n - P_{n-1}) / (x² - 1) away from the endpoints
/// and the closed endpoint values P'_n(±1) = (±1)^{n+1} n(n+1)/2.
pub fn legendre_derivative(n: usize, x: f64) -> f64 {
    if n == 0 {
        return 0.0;
    }

    if (x - 1.0).abs() < 1e-14 {
        return (n * (n + 1)) as f64 / 2.0;
    }
    if (x + 1.0).abs() < 1e-14 {
        let sign = if n % 2 == 0 { -1.0 } else { 1.0 };
        return sign * (n * (n + 1)) as f64 / 2.0;
    }

    let p_n = legendre(n, x);
    let p_nm1 = legendre(n - 1, x);

    n as f64 * (x * p_n - p_nm1) / (x * x - 1.0)
}

/// Evaluate P_n(x) and P'_n(x) together, running the recurrence once.
pub fn legendre_and_derivative(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (1.0, 0.0);
    }
    if n == 1 {
        return (x, 1.0);
    }

    let mut p_prev = 1.0;
    let mut p_curr = x;

    for k in 1..n {
        let p_next = ((2 * k + 1) as f64 * x * p_curr - k as f64 * p_prev) / (k + 1) as f64;
        p_prev = p_curr;
        p_curr = p_next;
    }

    // p_prev now holds P_{n-1}
    let dp = if (x * x - 1.0).abs() < 1e-14 {
        legendre_derivative(n, x)
    } else {
        n as f64 * (x * p_curr - p_prev) / (x * x - 1.0)
    };

    (p_curr, dp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_orders() {
        // P_2(x) = (3x² - 1)/2, P_3(x) = (5x³ - 3x)/2
        let x = 0.3;
        assert!((legendre(2, x) - (3.0 * x * x - 1.0) / 2.0).abs() < 1e-14);
        assert!((legendre(3, x) - (5.0 * x * x * x - 3.0 * x) / 2.0).abs() < 1e-14);
    }

    #[test]
    fn test_endpoint_values() {
        for n in 0..10 {
            assert!((legendre(n, 1.0) - 1.0).abs() < 1e-14);
            let expected = if n % 2 == 0 { 1.0 } else { -1.0 };
            assert!((legendre(n, -1.0) - expected).abs() < 1e-14);
        }
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let h = 1e-7;
        for n in 1..8 {
            for &x in &[-0.9, -0.4, 0.0, 0.3, 0.75] {
                let fd = (legendre(n, x + h) - legendre(n, x - h)) / (2.0 * h);
                let exact = legendre_derivative(n, x);
                assert!(
                    (fd - exact).abs() < 1e-5,
                    "P'_{n}({x}): fd={fd}, exact={exact}"
                );
            }
        }
    }

    #[test]
    fn test_combined_evaluation() {
        for n in 0..8 {
            for &x in &[-1.0, -0.5, 0.2, 1.0] {
                let (p, dp) = legendre_and_derivative(n, x);
                assert!((p - legendre(n, x)).abs() < 1e-14);
                assert!((dp - legendre_derivative(n, x)).abs() < 1e-12);
            }
        }
    }
}
