//! IMEX Runge-Kutta Butcher tableaux.
//!
//! Paired explicit/implicit tables sharing the abscissae c. The implicit
//! tables are diagonally implicit (DIRK) with a zero first stage, so every
//! implicit solve is a single-γ column problem.
//!
//! Schemes:
//! - ARK2: Giraldo, Kelly and Constantinescu (2013) ARK2(2,3,2)
//! - ARK3: Ascher, Ruth and Spiteri (1997) (3,4,3)
//! - ARK4: Ascher, Ruth and Spiteri (1997) (4,4,3)

/// Time integration scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeScheme {
    /// Strang splitting: half implicit, full explicit (SSP-RK3), half
    /// implicit.
    Strang,
    /// IMEX ARK2(2,3,2), second order.
    Ark2,
    /// IMEX ARS(3,4,3), third order.
    Ark3,
    /// IMEX ARS(4,4,3), third order with four implicit stages.
    Ark4,
}

/// A paired explicit/implicit Butcher tableau.
#[derive(Clone, Debug)]
pub struct ImexTableau {
    /// Number of stages.
    pub stages: usize,
    /// Explicit coefficients (strictly lower triangular).
    pub a_ex: Vec<Vec<f64>>,
    /// Explicit weights.
    pub b_ex: Vec<f64>,
    /// Implicit coefficients (lower triangular, DIRK).
    pub a_im: Vec<Vec<f64>>,
    /// Implicit weights.
    pub b_im: Vec<f64>,
    /// Stage abscissae.
    pub c: Vec<f64>,
}

impl ImexTableau {
    /// The tableau of an ARK scheme; `None` for Strang splitting, which
    /// is not tableau-driven.
    pub fn for_scheme(scheme: TimeScheme) -> Option<ImexTableau> {
        match scheme {
            TimeScheme::Strang => None,
            TimeScheme::Ark2 => Some(Self::ark2()),
            TimeScheme::Ark3 => Some(Self::ars343()),
            TimeScheme::Ark4 => Some(Self::ars443()),
        }
    }

    /// ARK2(2,3,2) of Giraldo, Kelly and Constantinescu (2013).
    fn ark2() -> ImexTableau {
        let gamma = 1.0 - 1.0 / 2.0_f64.sqrt();
        let delta = 1.0 / (2.0 * 2.0_f64.sqrt());
        let a32 = (3.0 + 2.0 * 2.0_f64.sqrt()) / 6.0;

        ImexTableau {
            stages: 3,
            a_ex: vec![
                vec![0.0, 0.0, 0.0],
                vec![2.0 * gamma, 0.0, 0.0],
                vec![1.0 - a32, a32, 0.0],
            ],
            b_ex: vec![delta, delta, gamma],
            a_im: vec![
                vec![0.0, 0.0, 0.0],
                vec![gamma, gamma, 0.0],
                vec![delta, delta, gamma],
            ],
            b_im: vec![delta, delta, gamma],
            c: vec![0.0, 2.0 * gamma, 1.0],
        }
    }

    /// ARS(3,4,3) of Ascher, Ruth and Spiteri (1997).
    fn ars343() -> ImexTableau {
        let gamma = 0.435_866_521_508_459;
        let b1 = -1.5 * gamma * gamma + 4.0 * gamma - 0.25;
        let b2 = 1.5 * gamma * gamma - 5.0 * gamma + 1.25;

        // Explicit coefficients from the original paper
        let a31 = 0.321_278_886_0;
        let a32 = 0.396_654_374_7;
        let a41 = -0.105_858_296;
        let a42 = 0.552_929_147_9;
        let a43 = 0.552_929_148_1;

        ImexTableau {
            stages: 4,
            a_ex: vec![
                vec![0.0, 0.0, 0.0, 0.0],
                vec![gamma, 0.0, 0.0, 0.0],
                vec![a31, a32, 0.0, 0.0],
                vec![a41, a42, a43, 0.0],
            ],
            b_ex: vec![0.0, b1, b2, gamma],
            a_im: vec![
                vec![0.0, 0.0, 0.0, 0.0],
                vec![0.0, gamma, 0.0, 0.0],
                vec![0.0, (1.0 - gamma) / 2.0, gamma, 0.0],
                vec![0.0, b1, b2, gamma],
            ],
            b_im: vec![0.0, b1, b2, gamma],
            c: vec![0.0, gamma, (1.0 + gamma) / 2.0, 1.0],
        }
    }

    /// ARS(4,4,3) of Ascher, Ruth and Spiteri (1997).
    fn ars443() -> ImexTableau {
        ImexTableau {
            stages: 5,
            a_ex: vec![
                vec![0.0, 0.0, 0.0, 0.0, 0.0],
                vec![0.5, 0.0, 0.0, 0.0, 0.0],
                vec![11.0 / 18.0, 1.0 / 18.0, 0.0, 0.0, 0.0],
                vec![5.0 / 6.0, -5.0 / 6.0, 0.5, 0.0, 0.0],
                vec![0.25, 1.75, 0.75, -1.75, 0.0],
            ],
            b_ex: vec![0.25, 1.75, 0.75, -1.75, 0.0],
            a_im: vec![
                vec![0.0, 0.0, 0.0, 0.0, 0.0],
                vec![0.0, 0.5, 0.0, 0.0, 0.0],
                vec![0.0, 1.0 / 6.0, 0.5, 0.0, 0.0],
                vec![0.0, -0.5, 0.5, 0.5, 0.0],
                vec![0.0, 1.5, -1.5, 0.5, 0.5],
            ],
            b_im: vec![0.0, 1.5, -1.5, 0.5, 0.5],
            c: vec![0.0, 0.5, 2.0 / 3.0, 0.5, 1.0],
        }
    }

    /// Whether any stage (or the weights) reference the first implicit
    /// tendency, which must then be evaluated explicitly.
    pub fn needs_first_implicit_tendency(&self) -> bool {
        self.b_im[0] != 0.0 || self.a_im.iter().any(|row| row[0] != 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn check_consistency(tab: &ImexTableau) {
        // Weights integrate a constant exactly
        let sum_ex: f64 = tab.b_ex.iter().sum();
        let sum_im: f64 = tab.b_im.iter().sum();
        assert!((sum_ex - 1.0).abs() < TOL, "b_ex sums to {sum_ex}");
        assert!((sum_im - 1.0).abs() < TOL, "b_im sums to {sum_im}");

        // Row sums match the abscissae
        for i in 0..tab.stages {
            let row_ex: f64 = tab.a_ex[i].iter().sum();
            let row_im: f64 = tab.a_im[i].iter().sum();
            assert!(
                (row_ex - tab.c[i]).abs() < TOL,
                "explicit row {i} sums to {row_ex}, c = {}",
                tab.c[i]
            );
            assert!(
                (row_im - tab.c[i]).abs() < TOL,
                "implicit row {i} sums to {row_im}, c = {}",
                tab.c[i]
            );
        }

        // Explicit part strictly lower triangular, implicit DIRK
        for i in 0..tab.stages {
            for j in i..tab.stages {
                assert_eq!(tab.a_ex[i][j], 0.0, "a_ex[{i}][{j}] must vanish");
            }
            for j in (i + 1)..tab.stages {
                assert_eq!(tab.a_im[i][j], 0.0, "a_im[{i}][{j}] must vanish");
            }
        }
    }

    #[test]
    fn test_ark2_consistency() {
        check_consistency(&ImexTableau::for_scheme(TimeScheme::Ark2).unwrap());
    }

    #[test]
    fn test_ars343_consistency() {
        check_consistency(&ImexTableau::for_scheme(TimeScheme::Ark3).unwrap());
    }

    #[test]
    fn test_ars443_consistency() {
        check_consistency(&ImexTableau::for_scheme(TimeScheme::Ark4).unwrap());
    }

    #[test]
    fn test_first_implicit_tendency_usage() {
        // GKC ARK2 references F_im at stage 0; the ARS schemes pad it away
        assert!(ImexTableau::for_scheme(TimeScheme::Ark2)
            .unwrap()
            .needs_first_implicit_tendency());
        assert!(!ImexTableau::for_scheme(TimeScheme::Ark3)
            .unwrap()
            .needs_first_implicit_tendency());
        assert!(!ImexTableau::for_scheme(TimeScheme::Ark4)
            .unwrap()
            .needs_first_implicit_tendency());
    }

    #[test]
    fn test_strang_has_no_tableau() {
        assert!(ImexTableau::for_scheme(TimeScheme::Strang).is_none());
    }
}
