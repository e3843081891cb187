//! Savitzky-Golay smoothing filter
//!
//! Each output sample is the value at the window centre of a least-squares
//! polynomial fitted to the `window_length` samples around it. The first and
//! last half-windows are evaluated from a single polynomial fitted to the
//! first (last) full window, so low-order trends are reproduced right up to
//! the edges instead of being padded.

use log::debug;
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Errors that can occur while configuring or applying the filter
#[derive(Debug, Error, PartialEq)]
pub enum SmoothingError {
    #[error("Window length must be odd, got {0}")]
    EvenWindow(usize),

    #[error("Window length must be at least 1")]
    EmptyWindow,

    #[error("Polynomial order {polyorder} must be less than the window length {window}")]
    PolyOrderTooLarge { polyorder: usize, window: usize },

    #[error("Window length {window} exceeds the number of samples {samples}")]
    WindowTooLong { window: usize, samples: usize },

    #[error("Least-squares polynomial fit failed: {0}")]
    FitFailed(String),
}

/// Savitzky-Golay filter parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavitzkyGolay {
    window_length: usize,
    polyorder: usize,
}

impl SavitzkyGolay {
    /// Create a filter, validating the window and polynomial order
    pub fn new(window_length: usize, polyorder: usize) -> Result<Self, SmoothingError> {
        if window_length == 0 {
            return Err(SmoothingError::EmptyWindow);
        }
        if window_length % 2 == 0 {
            return Err(SmoothingError::EvenWindow(window_length));
        }
        if polyorder >= window_length {
            return Err(SmoothingError::PolyOrderTooLarge {
                polyorder,
                window: window_length,
            });
        }

        Ok(Self {
            window_length,
            polyorder,
        })
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn polyorder(&self) -> usize {
        self.polyorder
    }

    fn half_window(&self) -> usize {
        self.window_length / 2
    }

    /// Offsets are scaled into [-1, 1] to keep the Vandermonde matrix well conditioned
    fn scale(&self) -> f64 {
        self.half_window().max(1) as f64
    }

    /// Pseudo-inverse of the window's Vandermonde matrix.
    ///
    /// Multiplying it by a window of samples gives the polynomial coefficients
    /// (constant term first) in the scaled offset variable.
    fn fit_matrix(&self) -> Result<DMatrix<f64>, SmoothingError> {
        let h = self.half_window() as f64;
        let scale = self.scale();
        let cols = self.polyorder + 1;

        let vandermonde = DMatrix::from_fn(self.window_length, cols, |row, col| {
            let u = (row as f64 - h) / scale;
            u.powi(col as i32)
        });

        vandermonde
            .pseudo_inverse(1e-12)
            .map_err(|e| SmoothingError::FitFailed(e.to_string()))
    }

    /// Convolution weights that yield the smoothed value at the window centre
    pub fn coefficients(&self) -> Result<Vec<f64>, SmoothingError> {
        Ok(self.fit_matrix()?.row(0).iter().copied().collect())
    }

    /// Smooth a series; the output has the same length as the input
    pub fn apply(&self, samples: &[f64]) -> Result<Vec<f64>, SmoothingError> {
        let n = samples.len();
        if self.window_length > n {
            return Err(SmoothingError::WindowTooLong {
                window: self.window_length,
                samples: n,
            });
        }

        let fit = self.fit_matrix()?;
        let weights: Vec<f64> = fit.row(0).iter().copied().collect();
        let h = self.half_window();
        let w = self.window_length;

        let mut smoothed = vec![0.0; n];
        for (i, out) in smoothed.iter_mut().enumerate().take(n - h).skip(h) {
            *out = weights
                .iter()
                .zip(&samples[i - h..=i + h])
                .map(|(c, y)| c * y)
                .sum();
        }

        // Edges: evaluate the polynomial fitted to the first and last full windows
        let head = &fit * DVector::from_column_slice(&samples[..w]);
        for (i, out) in smoothed.iter_mut().enumerate().take(h) {
            *out = self.evaluate(&head, i);
        }

        let tail = &fit * DVector::from_column_slice(&samples[n - w..]);
        for i in 0..h {
            let offset_in_window = w - h + i;
            smoothed[n - h + i] = self.evaluate(&tail, offset_in_window);
        }

        debug!(
            "Smoothed {} samples (window {}, order {})",
            n, self.window_length, self.polyorder
        );

        Ok(smoothed)
    }

    /// Evaluate fitted coefficients at a sample position within the window
    fn evaluate(&self, coefficients: &DVector<f64>, position: usize) -> f64 {
        let u = (position as f64 - self.half_window() as f64) / self.scale();
        coefficients.iter().rev().fold(0.0, |acc, c| acc * u + c)
    }
}
