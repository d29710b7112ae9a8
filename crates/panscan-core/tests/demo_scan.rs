use panscan_core::config::ScannerConfig;
use panscan_core::demo::DemoDevice;
use panscan_core::protocol::Transport;
use panscan_core::scanner::{AxisRange, ScanRow, Scanner, Sweep, SweepPlan};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("panscan_core=debug")
        .with_test_writer()
        .try_init();
}

#[test]
fn test_homed_demo_scanner_through_trait_object() {
    init_logging();
    let config = ScannerConfig::default();
    let link: Box<dyn Transport> = Box::new(DemoDevice::with_seed(11));
    let scanner = Scanner::homed(link, config.controller_config()).unwrap();
    assert_eq!(scanner.pan_angle(), Some(85));
    assert_eq!(scanner.tilt_angle(), Some(85));
    assert!(scanner.transport().is_open());
}

#[test]
fn test_demo_sweep_sees_object() {
    init_logging();
    let plan = SweepPlan {
        pan: AxisRange::centered(90, 30, 5),
        tilt: AxisRange::centered(82, 30, 5),
        settle_ms: 100,
        start_delay_ms: 1000,
    };
    let mut scanner = Scanner::new(DemoDevice::with_seed(5), ScannerConfig::default().controller_config());
    let readings = Sweep::new(plan).run(&mut scanner, |_| {}).unwrap();
    assert_eq!(readings.len(), plan.total_points());

    let rows: Vec<ScanRow> = readings.into_iter().map(ScanRow::from).collect();
    let at = |pan: f64, tilt: f64| {
        rows.iter()
            .find(|r| r.pan == pan && r.tilt == tilt)
            .map(|r| r.voltage)
            .unwrap()
    };

    // Closer surfaces give a higher voltage
    assert!(at(90.0, 82.0) > at(60.0, 52.0) + 0.5);

    let received = scanner.transport().received();
    assert_eq!(received[0], "DELAY|1000");
    assert_eq!(received.iter().filter(|c| *c == "READSENSOR").count(), rows.len());
}

#[test]
fn test_sweep_outside_range_keeps_reading() {
    let plan = SweepPlan {
        pan: AxisRange::new(168, 174, 2),
        tilt: AxisRange::new(0, 1, 1),
        settle_ms: 0,
        start_delay_ms: 0,
    };
    let mut scanner = Scanner::new(DemoDevice::with_seed(9), ScannerConfig::default().controller_config());
    let readings = Sweep::new(plan).run(&mut scanner, |_| {}).unwrap();

    // 172 is out of range, so the device stays at 170 for that point
    let pans: Vec<f64> = readings.iter().map(|r| r.pan).collect();
    assert_eq!(pans, vec![168.0, 170.0, 170.0]);
    assert!(!scanner
        .transport()
        .received()
        .iter()
        .any(|c| c == "PAN|172"));
}
