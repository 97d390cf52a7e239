//! Karras noise schedule

/// Noise levels spaced in `sigma^(1/rho)`, from `sigma_max` down to `sigma_min`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KarrasSchedule {
    pub sigma_min: f64,
    pub sigma_max: f64,
    pub rho: f64,
}

impl Default for KarrasSchedule {
    fn default() -> Self {
        // Empirical values the style diffusion was tuned with
        Self {
            sigma_min: 1e-4,
            sigma_max: 3.0,
            rho: 9.0,
        }
    }
}

impl KarrasSchedule {
    /// `num_steps` decreasing noise levels followed by a final 0
    ///
    /// A single step yields `[sigma_max, 0]`; zero steps yields `[0]`.
    pub fn sigmas(&self, num_steps: usize) -> Vec<f64> {
        let mut sigmas = Vec::with_capacity(num_steps + 1);
        match num_steps {
            0 => {}
            1 => sigmas.push(self.sigma_max),
            n => {
                let inv_rho = 1.0 / self.rho;
                let max_inv = self.sigma_max.powf(inv_rho);
                let min_inv = self.sigma_min.powf(inv_rho);
                for i in 0..n {
                    let frac = i as f64 / (n - 1) as f64;
                    sigmas.push((max_inv + frac * (min_inv - max_inv)).powf(self.rho));
                }
            }
        }
        sigmas.push(0.0);
        sigmas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let schedule = KarrasSchedule::default();
        let sigmas = schedule.sigmas(5);
        assert_eq!(sigmas.len(), 6);
        assert!((sigmas[0] - 3.0).abs() < 1e-12);
        assert!((sigmas[4] - 1e-4).abs() < 1e-12);
        assert_eq!(sigmas[5], 0.0);
    }

    #[test]
    fn test_strictly_decreasing() {
        let sigmas = KarrasSchedule::default().sigmas(10);
        for pair in sigmas.windows(2) {
            assert!(pair[0] > pair[1], "{:?}", pair);
        }
    }

    #[test]
    fn test_midpoint_value() {
        // i = 1 of 3: ((3^(1/9) + 0.5 * (1e-4^(1/9) - 3^(1/9)))^9
        let sigmas = KarrasSchedule::default().sigmas(3);
        let a = 3.0f64.powf(1.0 / 9.0);
        let b = 1e-4f64.powf(1.0 / 9.0);
        let expected = (a + 0.5 * (b - a)).powf(9.0);
        assert!((sigmas[1] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_step_counts() {
        let schedule = KarrasSchedule::default();
        assert_eq!(schedule.sigmas(1), vec![3.0, 0.0]);
        assert_eq!(schedule.sigmas(0), vec![0.0]);
    }
}
