//! Confidence calibration: expected calibration error plus a coarse
//! table for the report.
//!
//! Records with a confidence of exactly zero carry no calibration signal
//! and are left out entirely.

use serde::{Deserialize, Serialize};

use crate::simulator::ConversationResult;

pub const ECE_BINS: usize = 10;
pub const DISPLAY_BINS: usize = 5;
/// A display bin is "good" when accuracy is this close to its midpoint.
const DISPLAY_TOLERANCE: f64 = 0.20;

/// Bin index of a confidence value among `n_bins` equal-width bins.
pub fn bin_index(confidence: f64, n_bins: usize) -> usize {
    ((confidence * n_bins as f64) as usize).min(n_bins.saturating_sub(1))
}

/// ECE over `(confidence, correct)` pairs. `None` when no pair has a
/// positive confidence.
pub fn expected_calibration_error(samples: &[(f64, bool)], n_bins: usize) -> Option<f64> {
    if n_bins == 0 {
        return None;
    }
    let mut counts = vec![0usize; n_bins];
    let mut correct = vec![0usize; n_bins];
    for &(confidence, ok) in samples {
        if confidence <= 0.0 {
            continue;
        }
        let b = bin_index(confidence, n_bins);
        counts[b] += 1;
        if ok {
            correct[b] += 1;
        }
    }
    let total: usize = counts.iter().sum();
    if total == 0 {
        return None;
    }
    let ece = counts
        .iter()
        .zip(&correct)
        .enumerate()
        .filter(|(_, (n, _))| **n > 0)
        .map(|(i, (&n, &c))| {
            let accuracy = c as f64 / n as f64;
            let midpoint = (i as f64 + 0.5) / n_bins as f64;
            (n as f64 / total as f64) * (accuracy - midpoint).abs()
        })
        .sum();
    Some(ece)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationQuality {
    Well,
    Acceptable,
    Poor,
}

impl CalibrationQuality {
    pub fn from_ece(ece: f64) -> Self {
        if ece < 0.05 {
            CalibrationQuality::Well
        } else if ece < 0.15 {
            CalibrationQuality::Acceptable
        } else {
            CalibrationQuality::Poor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CalibrationQuality::Well => "Well-calibrated",
            CalibrationQuality::Acceptable => "Acceptable calibration",
            CalibrationQuality::Poor => "Poor calibration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BinFit {
    Good,
    Over,
    Under,
}

/// One row of the coarse calibration table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayBin {
    pub label: String,
    pub lower_pct: u32,
    pub count: usize,
    pub accuracy: f64,
    pub avg_confidence: f64,
    pub fit: BinFit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub total: usize,
    pub with_confidence: usize,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub ece: Option<f64>,
    pub quality: Option<CalibrationQuality>,
    pub display: Vec<DisplayBin>,
}

/// Five fixed-width bins labelled by percentage range, compared against
/// the bin centre.
pub fn display_bins(samples: &[(f64, bool)]) -> Vec<DisplayBin> {
    // (count, correct, confidence sum) per bin
    let mut acc = [(0usize, 0usize, 0.0f64); DISPLAY_BINS];
    for &(confidence, ok) in samples {
        if confidence <= 0.0 {
            continue;
        }
        let slot = &mut acc[bin_index(confidence, DISPLAY_BINS)];
        slot.0 += 1;
        slot.1 += usize::from(ok);
        slot.2 += confidence;
    }
    acc.iter()
        .enumerate()
        .filter(|(_, (n, _, _))| *n > 0)
        .map(|(i, &(n, c, sum))| {
            let lower_pct = (i as u32) * 20;
            let accuracy = c as f64 / n as f64;
            let mid = f64::from(lower_pct) / 100.0 + 0.10;
            let fit = if (accuracy - mid).abs() < DISPLAY_TOLERANCE {
                BinFit::Good
            } else if accuracy > mid {
                BinFit::Over
            } else {
                BinFit::Under
            };
            DisplayBin {
                label: format!("{}-{}%", lower_pct, (lower_pct + 20).min(100)),
                lower_pct,
                count: n,
                accuracy,
                avg_confidence: sum / n as f64,
                fit,
            }
        })
        .collect()
}

pub fn summarize(results: &[ConversationResult]) -> CalibrationSummary {
    let samples: Vec<(f64, bool)> = results
        .iter()
        .map(|r| (r.confidence, r.problem.confidence_correct()))
        .collect();
    let positive: Vec<f64> = samples
        .iter()
        .map(|(c, _)| *c)
        .filter(|c| *c > 0.0)
        .collect();
    let ece = expected_calibration_error(&samples, ECE_BINS);
    CalibrationSummary {
        total: results.len(),
        with_confidence: positive.len(),
        average: (!positive.is_empty()).then(|| positive.iter().sum::<f64>() / positive.len() as f64),
        min: positive.iter().copied().reduce(f64::min),
        max: positive.iter().copied().reduce(f64::max),
        ece,
        quality: ece.map(CalibrationQuality::from_ece),
        display: display_bins(&samples),
    }
}
