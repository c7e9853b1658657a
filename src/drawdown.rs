use thiserror::Error;

/// How far back the running peak (and the running-worst minimum) may look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Trailing window of the last `n` samples, including the current one.
    Bounded(usize),
    /// The peak reflects the entire history seen so far.
    Unbounded,
}

impl Window {
    fn start(&self, i: usize) -> usize {
        match self {
            Window::Bounded(n) => (i + 1).saturating_sub(*n),
            Window::Unbounded => 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum DrawdownError {
    #[error("balance series is empty")]
    EmptyInput,
    #[error("window size must be at least 1")]
    ZeroWindow,
}

/// Drawdown series derived from a balance series, index-aligned with it.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownSeries {
    /// Fractional decline from the trailing-window peak, always <= 0
    /// for non-negative balances.
    pub drawdown: Vec<f64>,
    /// Minimum drawdown seen within the trailing window, i.e. the worst
    /// drawdown so far when the window is unbounded.
    pub running_worst: Vec<f64>,
}

/// Computes the per-sample drawdown of `balances` against its trailing-window
/// peak, plus the running minimum of that drawdown.
///
/// `drawdown[i] = balances[i] / peak[i] - 1` where `peak[i]` is the maximum
/// balance within the window ending at `i`. While the peak is zero the
/// drawdown is defined as `0.0` (a drop from nothing is not a drawdown).
/// Non-finite balances are not rejected; NaN and infinities propagate
/// through the arithmetic as usual.
///
/// The caller is responsible for ordering; the input is taken as-is.
pub fn compute(balances: &[f64], window: Window) -> Result<DrawdownSeries, DrawdownError> {
    if balances.is_empty() {
        return Err(DrawdownError::EmptyInput);
    }
    if let Window::Bounded(0) = window {
        return Err(DrawdownError::ZeroWindow);
    }

    let mut drawdown = Vec::with_capacity(balances.len());
    let mut running_worst = Vec::with_capacity(balances.len());

    for i in 0..balances.len() {
        let lo = window.start(i);
        let peak = balances[lo..=i]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let dd = if peak == 0.0 {
            0.0
        } else {
            balances[i] / peak - 1.0
        };
        drawdown.push(dd);

        let worst = drawdown[lo..=i].iter().copied().fold(f64::INFINITY, f64::min);
        running_worst.push(worst);
    }

    Ok(DrawdownSeries {
        drawdown,
        running_worst,
    })
}
