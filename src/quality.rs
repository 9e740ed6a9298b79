//! Linear trend of base quality along a read.
//!
//! Ordinary least squares of Phred quality against 0-based position, with the
//! same conventions as the usual `linregress` routine: population moments, a
//! correlation clamped to [-1, 1], and a two-sided t-test on the slope with
//! `n - 2` degrees of freedom.

use mathru::special::beta::beta_inc_reg;
use mathru::special::error::erfc;
use std::f64::consts::SQRT_2;

pub const PHRED_OFFSET: u8 = 33;

/// Largest degrees of freedom for which the t tail is taken from the
/// regularized incomplete beta function.
pub const EXACT_T_MAX_DF: f64 = 200.0;

const TINY: f64 = 1.0e-20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityTrend {
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
    pub p_value: f64,
    pub std_err: f64,
}

impl QualityTrend {
    /// Reported for reads with fewer than two quality values.
    pub const UNDEFINED: Self = Self {
        slope: f64::NAN,
        intercept: f64::NAN,
        r_value: f64::NAN,
        p_value: f64::NAN,
        std_err: 0.0,
    };

    pub fn is_defined(&self) -> bool {
        !self.slope.is_nan()
    }
}

/// Phred+33 characters to numeric qualities.
pub fn decode_qualities(quality: &str) -> impl Iterator<Item = f64> + '_ {
    quality
        .bytes()
        .map(|b| f64::from(i32::from(b) - i32::from(PHRED_OFFSET)))
}

pub fn fit(quality: &str) -> QualityTrend {
    let ys: Vec<f64> = decode_qualities(quality).collect();
    fit_values(&ys)
}

/// Regress `ys` against their indices.
pub fn fit_values(ys: &[f64]) -> QualityTrend {
    let n = ys.len();
    if n < 2 {
        return QualityTrend::UNDEFINED;
    }
    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = ys.iter().sum::<f64>() / nf;

    let (mut ssxm, mut ssym, mut ssxym) = (0.0, 0.0, 0.0);
    for (i, &y) in ys.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        ssxm += dx * dx;
        ssym += dy * dy;
        ssxym += dx * dy;
    }
    ssxm /= nf;
    ssym /= nf;
    ssxym /= nf;

    let r_value = if ssym == 0.0 {
        0.0
    } else {
        (ssxym / (ssxm * ssym).sqrt()).clamp(-1.0, 1.0)
    };
    let slope = ssxym / ssxm;
    let intercept = y_mean - slope * x_mean;

    let (p_value, std_err) = if n == 2 {
        let p = if ys[0] == ys[1] { 1.0 } else { 0.0 };
        (p, 0.0)
    } else {
        let df = (n - 2) as f64;
        let t = r_value * (df / ((1.0 - r_value + TINY) * (1.0 + r_value + TINY))).sqrt();
        let p = students_t_two_sided(t, df);
        let se = ((1.0 - r_value * r_value) * ssym / ssxm / df).max(0.0).sqrt();
        (p, se)
    };

    QualityTrend {
        slope,
        intercept,
        r_value,
        p_value,
        std_err,
    }
}

/// P(|T| >= |t|) for Student's t with `df` degrees of freedom.
///
/// Above [`EXACT_T_MAX_DF`] the beta function overflows, so the tail comes
/// from a normal approximation with a first-order df correction.
pub fn students_t_two_sided(t: f64, df: f64) -> f64 {
    if t.is_nan() {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    if df > EXACT_T_MAX_DF {
        let z = t * (1.0 - 1.0 / (4.0 * df)) / (1.0 + t * t / (2.0 * df)).sqrt();
        return erfc(z.abs() / SQRT_2).clamp(0.0, 1.0);
    }
    beta_inc_reg(df / (df + t * t), df / 2.0, 0.5).clamp(0.0, 1.0)
}
