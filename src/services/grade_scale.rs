use crate::models::grade::LetterGrade;

/// Lower bound of each band, best first. Bounds are inclusive.
const BANDS: [(f64, LetterGrade); 12] = [
    (90.0, LetterGrade::APlus),
    (85.0, LetterGrade::A),
    (80.0, LetterGrade::AMinus),
    (75.0, LetterGrade::BPlus),
    (70.0, LetterGrade::B),
    (65.0, LetterGrade::BMinus),
    (60.0, LetterGrade::CPlus),
    (55.0, LetterGrade::C),
    (50.0, LetterGrade::CMinus),
    (45.0, LetterGrade::DPlus),
    (40.0, LetterGrade::D),
    (35.0, LetterGrade::DMinus),
];

/// Maps a percentage to its letter grade. Input is clamped to [0, 100] and
/// NaN counts as 0.
pub fn grade_for(percentage: f64) -> LetterGrade {
    let p = if percentage.is_nan() {
        0.0
    } else {
        percentage.clamp(0.0, 100.0)
    };
    BANDS
        .iter()
        .find(|(floor, _)| p >= *floor)
        .map(|(_, grade)| *grade)
        .unwrap_or(LetterGrade::F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes() {
        assert_eq!(grade_for(0.0), LetterGrade::F);
        assert_eq!(grade_for(100.0), LetterGrade::APlus);
    }

    #[test]
    fn band_floors_are_inclusive() {
        assert_eq!(grade_for(90.0), LetterGrade::APlus);
        assert_eq!(grade_for(89.99), LetterGrade::A);
        assert_eq!(grade_for(50.0), LetterGrade::CMinus);
        assert_eq!(grade_for(35.0), LetterGrade::DMinus);
        assert_eq!(grade_for(34.9), LetterGrade::F);
    }

    #[test]
    fn strictly_better_at_every_boundary() {
        let mut p = 35.0;
        while p <= 90.0 {
            assert!(
                grade_for(p).rank() > grade_for(p - 5.0).rank(),
                "grade at {} should beat grade at {}",
                p,
                p - 5.0
            );
            p += 5.0;
        }
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(grade_for(-12.0), LetterGrade::F);
        assert_eq!(grade_for(140.0), LetterGrade::APlus);
        assert_eq!(grade_for(f64::NAN), LetterGrade::F);
    }
}
