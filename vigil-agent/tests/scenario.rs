// Full-loop scenarios: simulated hardware, real core logic.

use vigil_agent::sim::{
    imu_frame, still_frame, RecorderLink, SimGps, SimImu, SimModem, SimRelay, SimTime, SimWifi,
};
use vigil_agent::{AgentConfig, VehicleAgent};
use vigil_core::clock::ClockService;
use vigil_core::link::ConnectivityManager;
use vigil_core::telemetry::TelemetryChannel;
use vigil_core::types::{LinkKind, MotionState};
use vigil_drivers::{GpsUart, Mpu6050};

const RMC_JAKARTA: &str = "$GPRMC,064530,A,0612.528,S,10650.736,E,022.4,084.4,300826,003.1,W*6A";

struct World {
    agent: VehicleAgent<SimImu, SimGps, SimWifi, SimModem, RecorderLink, SimRelay, SimTime>,
    time: SimTime,
    imu: SimImu,
    gps: SimGps,
    wifi: SimWifi,
    modem: SimModem,
    recorder: RecorderLink,
    relay: SimRelay,
}

/// Everything up and healthy; the modem needs two status polls to attach.
fn world() -> World {
    let config = AgentConfig::default();
    let topic = config.topic_sensor;
    let identity = config.modem_identity;
    let time = SimTime::new(1_756_500_000);
    let imu = SimImu::new();
    let gps = SimGps::new();
    let wifi = SimWifi::new(true);
    let modem = SimModem::new(true, 2);
    let recorder = RecorderLink::new();
    let relay = SimRelay::new();

    let agent = VehicleAgent::new(
        config,
        Mpu6050::new(imu.clone()),
        GpsUart::new(gps.clone()),
        ConnectivityManager::new(wifi.clone(), modem.clone()),
        TelemetryChannel::new(recorder.clone(), relay.clone(), topic, identity),
        ClockService::new(time.clone()),
    );

    World {
        agent,
        time,
        imu,
        gps,
        wifi,
        modem,
        recorder,
        relay,
    }
}

fn boot(world: &mut World) {
    let mut delay = world.time.delay();
    world.agent.init_hardware().unwrap();
    assert!(world.agent.connect(&mut delay));
    assert!(world.agent.clock.sync(&mut delay));
    world.agent.arm();
}

#[test]
fn scripted_journey_walks_park_drive_accident_park() {
    let mut world = world();
    world.gps.push_sentence(RMC_JAKARTA);
    world.imu.push_frames(still_frame(), 30);
    world.imu.push_frames(imu_frame([0.0, 0.3, 1.3], [6.0, 2.0, 0.0]), 100);
    world.imu.push_frames(imu_frame([0.4, 1.2, 0.8], [230.0, 40.0, 15.0]), 3);
    world.imu.push_frames(still_frame(), 200);

    boot(&mut world);
    let mut delay = world.time.delay();
    world.agent.run(300, &mut delay);

    assert_eq!(world.agent.monitor.state, MotionState::Park);

    let statuses = world.recorder.statuses();
    assert_eq!(statuses.first().map(String::as_str), Some("park"));
    assert_eq!(statuses.last().map(String::as_str), Some("park"));
    let drive = statuses.iter().position(|s| s == "drive").unwrap();
    let accident = statuses.iter().position(|s| s == "accident").unwrap();
    assert!(drive < accident);

    // Nothing was lost on a healthy transport.
    assert_eq!(world.agent.telemetry.dropped_payloads, 0);
}

#[test]
fn boot_announces_the_primary_uplink() {
    let mut world = world();
    world.gps.push_sentence(RMC_JAKARTA);
    boot(&mut world);
    let mut delay = world.time.delay();
    world.agent.run(3, &mut delay);

    let published = world.recorder.published();
    let (_, first) = &published[0];
    assert_eq!(first["modem"]["operator"], "WiFi");
    assert_eq!(first["modem"]["ip_address"], "192.168.4.21");
    assert_eq!(first["modem"]["IMEI"], "865067022349178");
    assert_eq!(first["modem"]["IMSI"], "510105842599416");
}

#[test]
fn accident_report_carries_the_full_inertial_picture() {
    let mut world = world();
    world.gps.push_sentence(RMC_JAKARTA);
    world.imu.push_frames(imu_frame([0.0, 0.3, 1.3], [6.0, 2.0, 0.0]), 50);
    world.imu.push_frames(imu_frame([0.4, 1.2, 0.8], [230.0, 40.0, 15.0]), 3);
    world.imu.push_frames(still_frame(), 30);

    boot(&mut world);
    let mut delay = world.time.delay();
    world.agent.run(80, &mut delay);

    let published = world.recorder.published();
    let accident = published
        .iter()
        .map(|(_, doc)| doc)
        .find(|doc| doc["state"]["status"] == "accident")
        .unwrap();
    assert!(accident["gyro_magnitude"]["gyro"].as_f64().unwrap() > 200.0);
    assert!(accident["acceleration"]["z"].is_number());
    assert!((accident["location"]["lat"].as_f64().unwrap() + 6.2088).abs() < 1e-3);
}

#[test]
fn relay_commands_reach_the_output() {
    let mut world = world();
    boot(&mut world);
    let mut delay = world.time.delay();

    world.recorder.push_command(b"1");
    world.agent.tick(&mut delay);
    assert!(world.relay.is_energized());

    world.recorder.push_command(b"0");
    world.agent.tick(&mut delay);
    assert!(!world.relay.is_energized());

    // Unknown payloads are skipped, a later good one still lands.
    world.recorder.push_command(b"reboot");
    world.recorder.push_command(b"1");
    world.agent.tick(&mut delay);
    assert!(world.relay.is_energized());
}

#[test]
fn wifi_outage_fails_over_to_the_modem() {
    let mut world = world();
    world.gps.push_sentence(RMC_JAKARTA);
    boot(&mut world);
    let mut delay = world.time.delay();
    world.agent.run(5, &mut delay);
    assert_eq!(world.agent.connectivity.link.kind, LinkKind::Primary);
    assert_eq!(world.modem.connect_attempts(), 0);

    let wifi_attempts = world.wifi.connect_attempts();
    world.wifi.set_available(false);
    world.agent.tick(&mut delay);

    assert_eq!(world.agent.connectivity.link.kind, LinkKind::Fallback);
    assert_eq!(world.wifi.connect_attempts(), wifi_attempts + 3);
    assert_eq!(world.modem.connect_attempts(), 1);

    // The failover is announced on the wire.
    let published = world.recorder.published();
    let (_, last_modem_report) = published
        .iter()
        .rev()
        .find(|(_, doc)| doc.get("modem").is_some())
        .unwrap();
    assert_eq!(last_modem_report["modem"]["operator"], "GSM");
    assert_eq!(last_modem_report["modem"]["ip_address"], "10.64.22.7");
}

#[test]
fn imu_fault_substitutes_a_zeroed_sample() {
    let mut world = world();
    world.gps.push_sentence(RMC_JAKARTA);
    boot(&mut world);
    let mut delay = world.time.delay();

    world.imu.fail_next_reads(50);
    world.agent.run(50, &mut delay);

    // A dead sensor must not look like motion.
    assert_eq!(world.agent.monitor.state, MotionState::Park);
    assert_eq!(world.agent.imu_faults, 50);
    assert!(world.recorder.statuses().iter().all(|s| s == "park"));
}

#[test]
fn nothing_publishes_without_a_valid_fix() {
    let mut world = world();
    boot(&mut world);
    let mut delay = world.time.delay();
    world.agent.run(10, &mut delay);

    // Only the uplink announcement goes out before the first fix.
    assert!(world.recorder.statuses().is_empty());
    assert_eq!(world.recorder.published_count(), 1);

    world.gps.push_sentence(RMC_JAKARTA);
    world.agent.run(10, &mut delay);
    assert!(!world.recorder.statuses().is_empty());
}

#[test]
fn transport_failure_drops_payloads_but_keeps_running() {
    let mut world = world();
    world.gps.push_sentence(RMC_JAKARTA);
    boot(&mut world);
    let mut delay = world.time.delay();

    world.recorder.set_fail(true);
    world.agent.run(20, &mut delay);
    assert!(world.agent.telemetry.dropped_payloads > 0);

    world.recorder.set_fail(false);
    world.agent.run(20, &mut delay);
    assert!(!world.recorder.statuses().is_empty());
}
