//! Bivariate standard normal distribution.
//!
//! Genz's BVND algorithm (Gauss–Legendre quadrature of Plackett's identity
//! with 6, 12 or 20 points depending on |ρ|, plus the Drezner–Wesolowsky
//! asymptotic form for |ρ| ≥ 0.925). Absolute accuracy is about 1e-15.

use super::normal::normal_cdf;
use ol_core::Real;
use std::f64::consts::PI;

const W6: [Real; 3] = [0.171_324_492_379_170_5, 0.360_761_573_048_138_4, 0.467_913_934_572_690_4];
const X6: [Real; 3] = [-0.932_469_514_203_152_2, -0.661_209_386_466_264_7, -0.238_619_186_083_197_0];

const W12: [Real; 6] = [
    0.047_175_336_386_511_77,
    0.106_939_325_995_318_3,
    0.160_078_328_543_346_4,
    0.203_167_426_723_065_9,
    0.233_492_536_538_354_7,
    0.249_147_045_813_402_9,
];
const X12: [Real; 6] = [
    -0.981_560_634_246_719_1,
    -0.904_117_256_370_475_0,
    -0.769_902_674_194_305_0,
    -0.587_317_954_286_617_1,
    -0.367_831_498_998_180_2,
    -0.125_233_408_511_469_2,
];

const W20: [Real; 10] = [
    0.017_614_007_139_152_12,
    0.040_601_429_800_386_94,
    0.062_672_048_334_109_06,
    0.083_276_741_576_704_75,
    0.101_930_119_817_240_4,
    0.118_194_531_961_518_4,
    0.131_688_638_449_176_6,
    0.142_096_109_318_382_1,
    0.149_172_986_472_603_7,
    0.152_753_387_130_725_9,
];
const X20: [Real; 10] = [
    -0.993_128_599_185_094_9,
    -0.963_971_927_277_913_8,
    -0.912_234_428_251_325_9,
    -0.839_116_971_822_218_8,
    -0.746_331_906_460_150_8,
    -0.636_053_680_726_515_0,
    -0.510_867_001_950_827_1,
    -0.373_706_088_715_419_6,
    -0.227_785_851_141_645_1,
    -0.076_526_521_133_497_33,
];

/// `P(X ≤ a, Y ≤ b)` for standard normals `X`, `Y` with correlation `rho`.
///
/// `rho` is clamped to [−1, 1]; the perfectly correlated cases are exact.
pub fn bivariate_normal_cdf(a: Real, b: Real, rho: Real) -> Real {
    upper_orthant(-a, -b, rho.clamp(-1.0, 1.0)).clamp(0.0, 1.0)
}

/// `P(X > h, Y > k)`.
fn upper_orthant(h: Real, k: Real, r: Real) -> Real {
    let (w, x): (&[Real], &[Real]) = if r.abs() < 0.3 {
        (&W6, &X6)
    } else if r.abs() < 0.75 {
        (&W12, &X12)
    } else {
        (&W20, &X20)
    };
    let two_pi = 2.0 * PI;

    if r.abs() < 0.925 {
        let hk = h * k;
        let hs = 0.5 * (h * h + k * k);
        let asr = r.asin();
        let mut sum = 0.0;
        for (wi, xi) in w.iter().zip(x) {
            for sign in [1.0, -1.0] {
                let sn = (0.5 * asr * (sign * xi + 1.0)).sin();
                sum += wi * ((sn * hk - hs) / (1.0 - sn * sn)).exp();
            }
        }
        return sum * asr / (2.0 * two_pi) + normal_cdf(-h) * normal_cdf(-k);
    }

    let mut k = k;
    let mut hk = h * k;
    if r < 0.0 {
        k = -k;
        hk = -hk;
    }
    let mut bvn = 0.0;
    if r.abs() < 1.0 {
        let a_s = (1.0 - r) * (1.0 + r);
        let mut a = a_s.sqrt();
        let b_s = (h - k) * (h - k);
        let c = (4.0 - hk) / 8.0;
        let d = (12.0 - hk) / 16.0;
        bvn = a
            * (-(b_s / a_s + hk) / 2.0).exp()
            * (1.0 - c * (b_s - a_s) * (1.0 - d * b_s / 5.0) / 3.0 + c * d * a_s * a_s / 5.0);
        if hk > -160.0 {
            let b = b_s.sqrt();
            bvn -= (-hk / 2.0).exp()
                * two_pi.sqrt()
                * normal_cdf(-b / a)
                * b
                * (1.0 - c * b_s * (1.0 - d * b_s / 5.0) / 3.0);
        }
        a /= 2.0;
        for (wi, xi) in w.iter().zip(x) {
            for sign in [1.0, -1.0] {
                let xs = (a * (sign * xi + 1.0)).powi(2);
                let rs = (1.0 - xs).sqrt();
                bvn += a
                    * wi
                    * ((-b_s / (2.0 * xs) - hk / (1.0 + rs)).exp() / rs
                        - (-(b_s / xs + hk) / 2.0).exp() * (1.0 + c * xs * (1.0 + d * xs)));
            }
        }
        bvn = -bvn / two_pi;
    }
    if r > 0.0 {
        bvn + normal_cdf(-h.max(k))
    } else {
        let mut v = -bvn;
        if k > h {
            v += normal_cdf(k) - normal_cdf(h);
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn origin_has_closed_form() {
        for rho in [-0.95, -0.5, 0.0, 0.3, 0.8, 0.99] {
            let expected = 0.25 + (rho as Real).asin() / (2.0 * PI);
            assert_abs_diff_eq!(bivariate_normal_cdf(0.0, 0.0, rho), expected, epsilon = 1e-14);
        }
    }

    #[test]
    fn independence_factorises() {
        let v = bivariate_normal_cdf(0.7, -1.2, 0.0);
        assert_abs_diff_eq!(v, normal_cdf(0.7) * normal_cdf(-1.2), epsilon = 1e-15);
    }

    #[test]
    fn perfect_correlation_limits() {
        assert_abs_diff_eq!(bivariate_normal_cdf(0.4, 1.1, 1.0), normal_cdf(0.4), epsilon = 1e-15);
        let v = bivariate_normal_cdf(0.4, 1.1, -1.0);
        assert_abs_diff_eq!(v, normal_cdf(0.4) - normal_cdf(-1.1), epsilon = 1e-15);
        assert_eq!(bivariate_normal_cdf(-1.0, -1.0, -1.0), 0.0);
    }

    proptest! {
        #[test]
        fn marginals_bound_the_joint(a in -4.0f64..4.0, b in -4.0f64..4.0, rho in -0.999f64..0.999) {
            let m = bivariate_normal_cdf(a, b, rho);
            prop_assert!(m <= normal_cdf(a).min(normal_cdf(b)) + 1e-14);
            prop_assert!(m >= (normal_cdf(a) + normal_cdf(b) - 1.0).max(0.0) - 1e-14);
        }

        #[test]
        fn symmetric_in_arguments(a in -3.0f64..3.0, b in -3.0f64..3.0, rho in -0.99f64..0.99) {
            let lhs = bivariate_normal_cdf(a, b, rho);
            let rhs = bivariate_normal_cdf(b, a, rho);
            prop_assert!((lhs - rhs).abs() < 1e-13);
        }
    }
}
