// main.rs
//
// Runs the agent against simulated hardware through a scripted journey:
// park, drive, a rollover-grade rotation, then back to rest. Simulated
// time advances through the delay handle, so the run finishes in well
// under a second of host time.

use std::error::Error;

use log::{info, warn};
use vigil_agent::sim::{
    imu_frame, still_frame, RecorderLink, SimGps, SimImu, SimModem, SimRelay, SimTime, SimWifi,
};
use vigil_agent::{AgentConfig, VehicleAgent};
use vigil_core::clock::ClockService;
use vigil_core::link::ConnectivityManager;
use vigil_core::telemetry::TelemetryChannel;
use vigil_drivers::{GpsUart, Mpu6050};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = AgentConfig::default();
    let topic = config.topic_sensor;
    let identity = config.modem_identity;

    let time = SimTime::from_system();
    let mut delay = time.delay();

    let imu_bus = SimImu::new();
    let gps_port = SimGps::new();
    let wifi = SimWifi::new(true);
    let modem = SimModem::new(true, 4);
    let recorder = RecorderLink::new();
    let relay = SimRelay::new();

    script_journey(&imu_bus, &gps_port, &recorder);

    let mut agent = VehicleAgent::new(
        config,
        Mpu6050::new(imu_bus.clone()),
        GpsUart::new(gps_port.clone()),
        ConnectivityManager::new(wifi.clone(), modem.clone()),
        TelemetryChannel::new(recorder.clone(), relay.clone(), topic, identity),
        ClockService::new(time.clone()),
    );

    agent
        .init_hardware()
        .map_err(|e| format!("imu init failed: {e:?}"))?;

    if !agent.connect(&mut delay) {
        warn!("initial connect failed, retrying once");
        if !agent.connect(&mut delay) {
            return Err("no uplink after retry, aborting".into());
        }
    }

    if !agent.clock.sync(&mut delay) {
        warn!("time sync failed, continuing on the local clock");
    }

    agent.arm();
    info!("agent armed, running scripted journey");

    agent.run(400, &mut delay);

    info!(
        "journey done in {} simulated ms: final state {:?}, {} reports published, {} dropped, relay energized: {}",
        time.now_ms(),
        agent.monitor.state,
        recorder.published_count(),
        agent.telemetry.dropped_payloads,
        relay.is_energized(),
    );
    Ok(())
}

/// Three seconds parked, twenty seconds of city driving, a three-sample
/// rotation spike, then at rest until the idle timeout parks the vehicle.
/// One frame is consumed per 100 ms tick.
fn script_journey(imu: &SimImu, gps: &SimGps, link: &RecorderLink) {
    gps.push_sentence("$GPRMC,064530,A,0612.528,S,10650.736,E,022.4,084.4,300826,003.1,W*6A");

    imu.push_frames(still_frame(), 30);
    imu.push_frames(imu_frame([0.0, 0.3, 1.3], [6.0, 2.0, 0.0]), 200);
    imu.push_frames(imu_frame([0.4, 1.2, 0.8], [230.0, 40.0, 15.0]), 3);
    imu.push_frames(still_frame(), 200);

    // Remote switches the relay on at the start of the run.
    link.push_command(b"1");
}
