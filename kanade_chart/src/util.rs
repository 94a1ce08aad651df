use crate::TimingPoint;

/// Sums how long each BPM is active inside `[start, end]` and returns the longest one.
///
/// Notes placed before the first timing point are played at its BPM, so the first region
/// extends backwards without bound.
pub(crate) fn dominant_bpm(timing_points: &[TimingPoint], start: f64, end: f64) -> Option<f64> {
    let first = timing_points.first()?;

    // (bpm, accumulated duration), in order of first appearance.
    let mut durations: Vec<(f64, f64)> = Vec::new();

    for (index, point) in timing_points.iter().enumerate() {
        let region_start = if index == 0 {
            f64::NEG_INFINITY
        } else {
            point.time
        };
        let region_end = timing_points
            .get(index + 1)
            .map_or(f64::INFINITY, |next| next.time);

        let length = (end.min(region_end) - start.max(region_start)).max(0.0);

        match durations
            .iter_mut()
            .find(|(bpm, _)| (*bpm - point.bpm).abs() < 1e-9)
        {
            Some((_, total)) => *total += length,
            None => durations.push((point.bpm, length)),
        }
    }

    let (bpm, longest) = durations
        .iter()
        .copied()
        .fold((first.bpm, 0.0), |best, (bpm, total)| {
            if total > best.1 {
                (bpm, total)
            } else {
                best
            }
        });

    if longest > 0.0 {
        return Some(bpm);
    }

    // Zero-length span, e.g. a single note: use whatever is active at `start`.
    timing_points
        .iter()
        .rev()
        .find(|point| point.time <= start)
        .or(Some(first))
        .map(|point| point.bpm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(time: f64, bpm: f64) -> TimingPoint {
        TimingPoint {
            time,
            bpm,
            signature: "4/4".to_string(),
        }
    }

    #[test]
    fn single_timing_point() {
        assert_eq!(dominant_bpm(&[point(0.0, 150.0)], 100.0, 9000.0), Some(150.0));
    }

    #[test]
    fn empty_timing_points() {
        assert_eq!(dominant_bpm(&[], 0.0, 1000.0), None);
    }

    #[test]
    fn longest_region_wins() {
        let points = [point(0.0, 120.0), point(1000.0, 200.0), point(5000.0, 120.0)];
        // 120: [0, 1000) + [5000, 6000) = 2000, 200: [1000, 5000) = 4000.
        assert_eq!(dominant_bpm(&points, 0.0, 6000.0), Some(200.0));
        // 120: [0, 1000) + [5000, 9000) = 5000.
        assert_eq!(dominant_bpm(&points, 0.0, 9000.0), Some(120.0));
    }

    #[test]
    fn region_before_first_point_counts() {
        let points = [point(2000.0, 100.0), point(3000.0, 240.0)];
        // 100: [500, 3000) = 2500, 240: [3000, 4000) = 1000.
        assert_eq!(dominant_bpm(&points, 500.0, 4000.0), Some(100.0));
    }

    #[test]
    fn zero_length_span_uses_active_point() {
        let points = [point(0.0, 120.0), point(1000.0, 200.0)];
        assert_eq!(dominant_bpm(&points, 1500.0, 1500.0), Some(200.0));
        assert_eq!(dominant_bpm(&points, -10.0, -10.0), Some(120.0));
    }
}
