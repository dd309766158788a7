//! Coverage check for selection rules.
//!
//! Every rule is a half-open rectangle `[load_min, load_max) x
//! [severity_min, severity_max)`. Collecting all bounds (plus 0.0) on each
//! axis partitions the quadrant into cells on which rule membership is
//! constant, so testing the lower corner of every cell decides whether the
//! whole of `[0, inf)^2` is covered.

use super::SelectionRule;

/// Return the lower corner of the first uncovered cell, if any.
pub(crate) fn find_uncovered(rules: &[SelectionRule]) -> Option<(f64, f64)> {
    let loads = breakpoints(rules.iter().flat_map(|r| [Some(r.load_min), r.load_max]));
    let severities = breakpoints(
        rules
            .iter()
            .flat_map(|r| [Some(r.severity_min), r.severity_max]),
    );

    for &load in &loads {
        for &severity in &severities {
            if !rules.iter().any(|rule| rule.matches(load, severity)) {
                return Some((load, severity));
            }
        }
    }
    None
}

fn breakpoints(values: impl Iterator<Item = Option<f64>>) -> Vec<f64> {
    let mut points: Vec<f64> = std::iter::once(0.0).chain(values.flatten()).collect();
    points.sort_by(|a, b| a.total_cmp(b));
    points.dedup();
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(load: (f64, Option<f64>), severity: (f64, Option<f64>)) -> SelectionRule {
        SelectionRule {
            label: None,
            pathway: "presence".to_string(),
            load_min: load.0,
            load_max: load.1,
            severity_min: severity.0,
            severity_max: severity.1,
        }
    }

    #[test]
    fn test_single_unbounded_rule_covers_everything() {
        assert_eq!(find_uncovered(&[rule((0.0, None), (0.0, None))]), None);
    }

    #[test]
    fn test_quadrant_tiling_is_covered() {
        let rules = vec![
            rule((0.0, Some(1.0)), (0.0, Some(0.5))),
            rule((1.0, None), (0.0, Some(0.5))),
            rule((0.0, Some(1.0)), (0.5, None)),
            rule((1.0, None), (0.5, None)),
        ];
        assert_eq!(find_uncovered(&rules), None);
    }

    #[test]
    fn test_missing_corner_is_reported() {
        let rules = vec![
            rule((0.0, Some(1.0)), (0.0, None)),
            rule((1.0, None), (0.0, Some(0.5))),
        ];
        assert_eq!(find_uncovered(&rules), Some((1.0, 0.5)));
    }

    #[test]
    fn test_gap_between_bounded_bands() {
        let rules = vec![
            rule((0.0, Some(1.0)), (0.0, None)),
            rule((1.5, None), (0.0, None)),
        ];
        assert_eq!(find_uncovered(&rules), Some((1.0, 0.0)));
    }

    #[test]
    fn test_rule_not_starting_at_zero() {
        let rules = vec![rule((0.2, None), (0.0, None))];
        assert_eq!(find_uncovered(&rules), Some((0.0, 0.0)));
    }
}
