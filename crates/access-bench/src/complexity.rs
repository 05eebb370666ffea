//! Asymptotic order fitting
//!
//! Each candidate order `g` gets a least-squares coefficient
//! `c = sum(t * g(n)) / sum(g(n)^2)`; the candidate with the lowest RMS
//! residual, normalized by the mean time, wins.

use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BigO {
    O1,
    OLogN,
    ON,
    ONLogN,
    ONSquared,
    ONCubed,
}

impl BigO {
    pub const CANDIDATES: [BigO; 6] = [
        BigO::O1,
        BigO::OLogN,
        BigO::ON,
        BigO::ONLogN,
        BigO::ONSquared,
        BigO::ONCubed,
    ];

    pub fn eval(self, n: f64) -> f64 {
        match self {
            BigO::O1 => 1.0,
            BigO::OLogN => n.log2(),
            BigO::ON => n,
            BigO::ONLogN => n * n.log2(),
            BigO::ONSquared => n * n,
            BigO::ONCubed => n * n * n,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            BigO::O1 => "(1)",
            BigO::OLogN => "lgN",
            BigO::ON => "N",
            BigO::ONLogN => "NlgN",
            BigO::ONSquared => "N^2",
            BigO::ONCubed => "N^3",
        }
    }
}

impl fmt::Display for BigO {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for BigO {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComplexityFit {
    pub big_o: BigO,
    /// Seconds per unit of `big_o(n)`
    pub coefficient: f64,
    /// RMS residual relative to the mean time
    pub rms: f64,
}

/// Fit `(n, seconds)` points against every candidate order
///
/// Needs at least two distinct sizes; returns `None` otherwise.
pub fn fit_complexity(points: &[(usize, f64)]) -> Option<ComplexityFit> {
    let distinct = points.iter().map(|&(n, _)| n).fold(Vec::new(), |mut acc, n| {
        if !acc.contains(&n) {
            acc.push(n);
        }
        acc
    });
    if distinct.len() < 2 {
        return None;
    }

    let mean_time = points.iter().map(|&(_, t)| t).sum::<f64>() / points.len() as f64;

    BigO::CANDIDATES
        .iter()
        .filter_map(|&big_o| fit_one(big_o, points, mean_time))
        .min_by(|a, b| a.rms.total_cmp(&b.rms))
}

fn fit_one(big_o: BigO, points: &[(usize, f64)], mean_time: f64) -> Option<ComplexityFit> {
    let (sum_tg, sum_gg) = points.iter().fold((0.0, 0.0), |(tg, gg), &(n, t)| {
        let g = big_o.eval(n as f64);
        (tg + t * g, gg + g * g)
    });
    if sum_gg == 0.0 || !sum_gg.is_finite() {
        return None;
    }
    let coefficient = sum_tg / sum_gg;

    let residual = points
        .iter()
        .map(|&(n, t)| (t - coefficient * big_o.eval(n as f64)).powi(2))
        .sum::<f64>();
    let rms = (residual / points.len() as f64).sqrt();
    let rms = if mean_time > 0.0 { rms / mean_time } else { rms };

    Some(ComplexityFit {
        big_o,
        coefficient,
        rms,
    })
}
