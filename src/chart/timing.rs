//! Tempo timeline: beat positions and piecewise-constant BPM integration.
//!
//! Beat positions are exact rationals so that two rows can only share an instant
//! when their grid positions actually coincide, independent of measure
//! subdivision. Absolute times are derived, never stored back.

use num::{Zero, rational::Ratio};

use super::ConvertError;

/// Beats per measure. The notation is fixed 4/4; other time signatures are not
/// supported.
pub const BEATS_PER_MEASURE: i64 = 4;

/// An exact beat position on the chart, measured from beat 0 at the start of the
/// first measure.
///
/// Row `i` of `n` rows in measure `m` sits at `m * 4 + i * 4 / n`, which is only
/// representable without drift as a rational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BeatPos(Ratio<i64>);

impl BeatPos {
    /// Beat 0, the start of the chart.
    #[must_use]
    pub fn zero() -> Self {
        Self(Ratio::zero())
    }

    /// A whole-beat position.
    #[must_use]
    pub fn from_beats(beats: i64) -> Self {
        Self(Ratio::from_integer(beats))
    }

    /// The position of `numer / denom` beats.
    ///
    /// # Panics
    ///
    /// Panics if `denom` is 0.
    #[must_use]
    pub fn new(numer: i64, denom: i64) -> Self {
        Self(Ratio::new(numer, denom))
    }

    /// The beat position of row `row` out of `rows_in_measure` rows in measure
    /// `measure` (both 0-indexed).
    ///
    /// # Panics
    ///
    /// Panics if `rows_in_measure` is 0.
    #[must_use]
    pub fn measure_row(measure: usize, row: usize, rows_in_measure: usize) -> Self {
        let base = Ratio::from_integer(measure as i64 * BEATS_PER_MEASURE);
        let offset = Ratio::new(row as i64 * BEATS_PER_MEASURE, rows_in_measure as i64);
        Self(base + offset)
    }

    /// Parses a plain decimal literal (`12`, `8.500`, `-1.25`) into an exact
    /// position. Returns `None` on anything else, including exponents.
    #[must_use]
    pub fn parse_decimal(text: &str) -> Option<Self> {
        let text = text.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return None;
        }
        let mut numer: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().ok()?
        };
        let mut denom: i64 = 1;
        for digit in frac_part.chars() {
            numer = numer
                .checked_mul(10)?
                .checked_add(i64::from(digit as u8 - b'0'))?;
            denom = denom.checked_mul(10)?;
        }
        if negative {
            numer = -numer;
        }
        Some(Self(Ratio::new(numer, denom)))
    }

    /// This position as a floating beat count.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        *self.0.numer() as f64 / *self.0.denom() as f64
    }
}

impl std::ops::Add for BeatPos {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Sub for BeatPos {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl std::fmt::Display for BeatPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "beat {}", self.0)
    }
}

/// A `(beat, bpm)` pair opening a segment of constant tempo.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TempoBreakpoint {
    /// The beat this tempo takes effect at.
    pub beat: BeatPos,
    /// Beats per minute from this beat on.
    pub bpm: f64,
}

/// The piecewise-constant tempo map of a chart.
///
/// Immutable once built; [`TempoTimeline::time_at`] is a pure function, so the
/// timeline can be shared read-only across difficulty passes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TempoTimeline {
    breakpoints: Vec<TempoBreakpoint>,
}

impl TempoTimeline {
    /// Builds a timeline from breakpoints sorted by beat.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::InvalidTempoData`] when the list is empty, the
    /// first breakpoint is not at beat 0, beats do not strictly increase, or a
    /// bpm is not a positive finite number.
    pub fn new(breakpoints: Vec<TempoBreakpoint>) -> Result<Self, ConvertError> {
        let Some(first) = breakpoints.first() else {
            return Err(ConvertError::InvalidTempoData(
                "no tempo breakpoints defined".into(),
            ));
        };
        if first.beat != BeatPos::zero() {
            return Err(ConvertError::InvalidTempoData(format!(
                "first tempo breakpoint must be at beat 0, found {}",
                first.beat
            )));
        }
        for breakpoint in &breakpoints {
            if !breakpoint.bpm.is_finite() || breakpoint.bpm <= 0.0 {
                return Err(ConvertError::InvalidTempoData(format!(
                    "bpm {} at {} is not a positive finite number",
                    breakpoint.bpm, breakpoint.beat
                )));
            }
        }
        for (earlier, later) in breakpoints.iter().zip(breakpoints.iter().skip(1)) {
            if later.beat <= earlier.beat {
                return Err(ConvertError::InvalidTempoData(format!(
                    "tempo breakpoints must strictly increase, {} follows {}",
                    later.beat, earlier.beat
                )));
            }
        }
        Ok(Self { breakpoints })
    }

    /// The absolute time of `beat` in seconds from beat 0, integrating each
    /// constant-tempo segment before it.
    #[must_use]
    pub fn time_at(&self, beat: BeatPos) -> f64 {
        let mut seconds = 0.0;
        for (current, next) in self.breakpoints.iter().zip(self.breakpoints.iter().skip(1)) {
            if beat <= next.beat {
                return seconds + (beat - current.beat).as_f64() / current.bpm * 60.0;
            }
            seconds += (next.beat - current.beat).as_f64() / current.bpm * 60.0;
        }
        let Some(last) = self.breakpoints.last() else {
            return 0.0;
        };
        seconds + (beat - last.beat).as_f64() / last.bpm * 60.0
    }

    /// The tempo in effect at `beat`.
    #[must_use]
    pub fn bpm_at(&self, beat: BeatPos) -> f64 {
        self.breakpoints
            .iter()
            .take_while(|breakpoint| breakpoint.beat <= beat)
            .last()
            .or_else(|| self.breakpoints.first())
            .map_or(0.0, |breakpoint| breakpoint.bpm)
    }

    /// The slowest tempo on the timeline.
    #[must_use]
    pub fn min_bpm(&self) -> f64 {
        self.breakpoints
            .iter()
            .map(|breakpoint| breakpoint.bpm)
            .fold(f64::INFINITY, f64::min)
    }

    /// The fastest tempo on the timeline.
    #[must_use]
    pub fn max_bpm(&self) -> f64 {
        self.breakpoints
            .iter()
            .map(|breakpoint| breakpoint.bpm)
            .fold(0.0, f64::max)
    }

    /// All breakpoints, ordered by beat.
    #[must_use]
    pub fn breakpoints(&self) -> &[TempoBreakpoint] {
        &self.breakpoints
    }
}
