//! Direction of change across recent readings, and summaries over time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::store::TimeRange;
use crate::types::Dimensions;

/// Fewest readings for which a trend is reported.
pub const MIN_TREND_READINGS: usize = 3;

/// How many of the most recent readings a trend looks at.
pub const TREND_WINDOW: usize = 5;

const TREND_NOTE: &str =
    "Trends are patterns, not predictions. Use as reflection prompt, not diagnosis.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    StableOrDecreasing,
}

impl TrendDirection {
    fn between(first: f64, last: f64) -> Self {
        if last > first {
            TrendDirection::Increasing
        } else {
            TrendDirection::StableOrDecreasing
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::StableOrDecreasing => "stable_or_decreasing",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccumulationTrend {
    /// ρ
    pub wisdom: TrendDirection,
    /// q
    pub engagement: TrendDirection,
    /// f
    pub connection: TrendDirection,
    pub sample_size: usize,
    pub note: String,
}

/// Compare the oldest and newest of the last few readings.
///
/// Returns `None` with fewer than three readings.
pub fn accumulation_trend(readings: &[Dimensions]) -> Option<AccumulationTrend> {
    if readings.len() < MIN_TREND_READINGS {
        return None;
    }
    let recent = &readings[readings.len().saturating_sub(TREND_WINDOW)..];
    let (first, last) = (recent.first()?, recent.last()?);

    Some(AccumulationTrend {
        wisdom: TrendDirection::between(first.rho, last.rho),
        engagement: TrendDirection::between(first.q, last.q),
        connection: TrendDirection::between(first.f, last.f),
        sample_size: recent.len(),
        note: TREND_NOTE.to_string(),
    })
}

/// Fewest points in the window for which a timeline narrative is written.
pub const MIN_TIMELINE_POINTS: usize = 5;

/// One translated reflection, as seen at the time it was read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrackingPoint {
    pub timestamp: DateTime<Utc>,
    pub dimensions: Dimensions,

    /// Subject's decayed grief load when the reflection was read
    pub grief_load: f64,

    /// Losses registered alongside the reflection
    pub losses: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PeriodAverages {
    pub psi: f64,
    pub rho: f64,
    pub q: f64,
    pub f: f64,
    pub grief_load: f64,
}

impl PeriodAverages {
    fn of<'a>(points: impl IntoIterator<Item = &'a TrackingPoint>) -> Option<Self> {
        let (count, sum) = points.into_iter().fold(
            (0usize, [0.0f64; 5]),
            |(count, sum), p| {
                let d = &p.dimensions;
                (
                    count + 1,
                    [
                        sum[0] + d.psi,
                        sum[1] + d.rho,
                        sum[2] + d.q,
                        sum[3] + d.f,
                        sum[4] + p.grief_load,
                    ],
                )
            },
        );
        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some(Self {
            psi: sum[0] / n,
            rho: sum[1] / n,
            q: sum[2] / n,
            f: sum[3] / n,
            grief_load: sum[4] / n,
        })
    }
}

/// Averages over the tracking points in a window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PeriodSummary {
    pub range: TimeRange,
    pub data_points: usize,
    pub averages: PeriodAverages,
    pub losses_recorded: usize,
}

/// Summarize the points falling inside `range`. `None` if there are none.
pub fn period_summary(points: &[TrackingPoint], range: TimeRange) -> Option<PeriodSummary> {
    let inside: Vec<&TrackingPoint> = points
        .iter()
        .filter(|p| range.contains(p.timestamp))
        .collect();
    let averages = PeriodAverages::of(inside.iter().copied())?;
    Some(PeriodSummary {
        range,
        data_points: inside.len(),
        averages,
        losses_recorded: inside.iter().map(|p| p.losses).sum(),
    })
}

fn change(early: f64, late: f64) -> &'static str {
    if late > early {
        "increased"
    } else {
        "decreased"
    }
}

/// Narrative comparing the first and last thirds of the past `days` days.
///
/// Points are expected oldest first.
pub fn timeline_summary(points: &[TrackingPoint], as_of: DateTime<Utc>, days: u32) -> String {
    let window = TimeRange::between(as_of - Duration::days(i64::from(days)), as_of);
    let recent: Vec<&TrackingPoint> = points
        .iter()
        .filter(|p| window.contains(p.timestamp))
        .collect();
    if recent.len() < MIN_TIMELINE_POINTS {
        return "Insufficient history for timeline summary.".to_string();
    }

    let third = recent.len() / 3;
    let (early, late) = match (
        PeriodAverages::of(recent[..third].iter().copied()),
        PeriodAverages::of(recent[2 * third..].iter().copied()),
    ) {
        (Some(early), Some(late)) => (early, late),
        _ => return "Insufficient history for timeline summary.".to_string(),
    };

    let load_change = change(early.grief_load, late.grief_load);
    let mut summary = format!(
        "Over the past {} days:\n\n\
         - Connection has {} from ~{:.0}% to ~{:.0}%\n\
         - Grief load has {} from ~{:.2} to ~{:.2}\n\
         - Wisdom accumulation has {} from ~{:.0}% to ~{:.0}%\n\n",
        days,
        change(early.f, late.f),
        early.f * 100.0,
        late.f * 100.0,
        load_change,
        early.grief_load,
        late.grief_load,
        change(early.rho, late.rho),
        early.rho * 100.0,
        late.rho * 100.0,
    );

    summary.push_str(if late.f < 0.3 && load_change == "increased" {
        "Pattern suggests grief accumulation may be outpacing recovery. \
         Consider whether current load matches capacity."
    } else if late.rho > early.rho && late.grief_load < early.grief_load {
        "Positive transformation pattern: grief converting to wisdom, \
         connection holding. Continue supportive practices."
    } else {
        "Mixed pattern. Some dimensions concerning, others stable or improving. \
         See the trend for specifics."
    });
    summary
}
