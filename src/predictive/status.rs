use crate::types::DeviceStatus;

/// Derive device status from health score and RUL.
///
/// Checks run as escalating overrides; a later matching check replaces the
/// earlier result.
pub fn classify_device(health_score: f64, rul_days: Option<i64>) -> DeviceStatus {
    let mut status = DeviceStatus::Healthy;

    if health_score < 50.0 {
        status = DeviceStatus::Warning;
    }
    if rul_days.is_some_and(|d| d < 30) {
        status = DeviceStatus::PredictiveWarning;
    }
    if health_score < 20.0 || rul_days.is_some_and(|d| d < 7) {
        status = DeviceStatus::Critical;
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_rul_overrides_good_score() {
        assert_eq!(classify_device(60.0, Some(5)), DeviceStatus::Critical);
    }

    #[test]
    fn healthy_when_nothing_applies() {
        assert_eq!(classify_device(55.0, Some(45)), DeviceStatus::Healthy);
        assert_eq!(classify_device(50.0, None), DeviceStatus::Healthy);
    }

    #[test]
    fn very_low_score_is_critical_without_rul() {
        assert_eq!(classify_device(15.0, None), DeviceStatus::Critical);
    }

    #[test]
    fn predictive_warning_beats_low_score_warning() {
        assert_eq!(classify_device(40.0, Some(20)), DeviceStatus::PredictiveWarning);
        assert_eq!(classify_device(40.0, None), DeviceStatus::Warning);
        assert_eq!(classify_device(90.0, Some(29)), DeviceStatus::PredictiveWarning);
    }

    #[test]
    fn boundaries_are_exclusive() {
        assert_eq!(classify_device(90.0, Some(30)), DeviceStatus::Healthy);
        assert_eq!(classify_device(90.0, Some(7)), DeviceStatus::PredictiveWarning);
        assert_eq!(classify_device(20.0, None), DeviceStatus::Warning);
        assert_eq!(classify_device(90.0, Some(0)), DeviceStatus::Critical);
    }
}
