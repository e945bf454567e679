mod common;

use common::flight_config;
use cubesat_fsw::config::ConfigUpdate;
use cubesat_fsw::platform::mock::MockPowerMonitor;
use cubesat_fsw::power::{deviations, Deviation, PowerHealth, PowerHealthMonitor, READINGS_PER_CHECK};

fn monitor(bus_voltage: Option<f32>, current: Option<f32>) -> (MockPowerMonitor, PowerHealthMonitor) {
    let mock = MockPowerMonitor::new(bus_voltage, current);
    let health = PowerHealthMonitor::new(Box::new(mock.clone()));
    (mock, health)
}

#[cfg(test)]
mod grading_tests {
    use super::*;

    #[test]
    fn test_healthy_battery_is_nominal() {
        let (_, mut health) = monitor(Some(7.4), Some(0.5));
        let report = health.check(&flight_config());
        assert_eq!(report.health, PowerHealth::Nominal);
        assert_eq!(report.current, Some(0.5));
    }

    #[test]
    fn test_low_voltage_is_degraded() {
        let (_, mut health) = monitor(Some(6.8), Some(0.5));
        assert_eq!(health.check(&flight_config()).health, PowerHealth::Degraded);
    }

    #[test]
    fn test_current_deviation_is_degraded() {
        let (_, mut health) = monitor(Some(7.4), Some(1.2));
        assert_eq!(health.check(&flight_config()).health, PowerHealth::Degraded);

        let (_, mut health) = monitor(Some(7.4), Some(-0.2));
        assert_eq!(health.check(&flight_config()).health, PowerHealth::Degraded);
    }

    #[test]
    fn test_low_battery_is_critical() {
        let (_, mut health) = monitor(Some(6.2), Some(1.5));
        assert_eq!(health.check(&flight_config()).health, PowerHealth::Critical);
    }

    #[test]
    fn test_critical_threshold_is_inclusive() {
        let (_, health) = monitor(Some(6.6), Some(0.5));
        let mut health = health.with_readings(1);
        assert_eq!(health.check(&flight_config()).health, PowerHealth::Critical);
    }

    #[test]
    fn test_thresholds_follow_config_updates() {
        let mut config = flight_config();
        let (_, mut health) = monitor(Some(7.0), Some(0.5));
        assert_eq!(health.check(&config).health, PowerHealth::Nominal);

        config
            .apply(ConfigUpdate::CriticalBatteryVoltage(7.1))
            .unwrap();
        assert_eq!(health.check(&config).health, PowerHealth::Critical);
    }
}

#[cfg(test)]
mod unknown_tests {
    use super::*;

    #[test]
    fn test_missing_voltage_is_unknown() {
        let (mock, mut health) = monitor(None, Some(0.5));
        let report = health.check(&flight_config());

        assert_eq!(report.health, PowerHealth::Unknown);
        assert_eq!(report.bus_voltage, None);
        assert_eq!(report.current, None);
        assert_eq!(mock.reads(), 1);
    }

    #[test]
    fn test_missing_current_is_unknown() {
        let (mock, mut health) = monitor(Some(7.4), None);
        let report = health.check(&flight_config());

        assert_eq!(report.health, PowerHealth::Unknown);
        assert!(report.bus_voltage.is_some());
        assert_eq!(report.current, None);
        assert_eq!(mock.reads(), READINGS_PER_CHECK + 1);
    }

    #[test]
    fn test_dropout_mid_burst_is_unknown() {
        let (mock, health) = monitor(Some(7.4), Some(0.5));
        let mut health = health.with_readings(3);
        assert_eq!(health.check(&flight_config()).health, PowerHealth::Nominal);

        mock.set_current(None);
        assert_eq!(health.check(&flight_config()).health, PowerHealth::Unknown);
        mock.set_current(Some(0.5));
        assert_eq!(health.check(&flight_config()).health, PowerHealth::Nominal);
    }
}

#[cfg(test)]
mod deviation_tests {
    use super::*;

    #[test]
    fn test_no_deviation_at_operating_point() {
        assert!(deviations(7.4, 0.5, &flight_config()).is_empty());
    }

    #[test]
    fn test_current_deviation_bound_is_exclusive() {
        assert!(deviations(7.4, 1.0, &flight_config()).is_empty());
    }

    #[test]
    fn test_degraded_voltage_bound_is_inclusive() {
        let found = deviations(6.9, 0.5, &flight_config());
        assert_eq!(
            found.as_slice(),
            &[Deviation::LowVoltage {
                bus_voltage: 6.9,
                threshold: 6.9
            }]
        );
    }

    #[test]
    fn test_both_deviations_are_reported() {
        let found = deviations(6.8, 2.0, &flight_config());
        assert_eq!(found.len(), 2);
        assert!(matches!(found[0], Deviation::Current { .. }));
        assert!(matches!(found[1], Deviation::LowVoltage { .. }));
    }

    #[test]
    fn test_health_labels() {
        assert_eq!(PowerHealth::Nominal.to_string(), "NOMINAL");
        assert_eq!(PowerHealth::Unknown.to_string(), "UNKNOWN");
    }
}
