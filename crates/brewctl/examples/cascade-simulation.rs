use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use anyhow::Result;
use brewctl::core::{
    regulation::{CascadeConfig, Event, Events, Heater, Regulation, SetPoint},
    sensor::SensorReadings,
    sync::StopSignal,
    time::MonotonicClock,
};

const MASH_TUN: &str = "mash_tun";
const HLT: &str = "hlt";
const COIL: &str = "herms_coil";

const MASH_TARGET: f64 = 66.0;
const SIMULATION_STEP: Duration = Duration::from_millis(100);
const SIMULATION_TIME: Duration = Duration::from_secs(30);

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
    log::info!("Starting cascade simulation example");

    let sensors = Arc::new(SensorReadings::new());
    for id in [MASH_TUN, HLT, COIL] {
        sensors.register(id);
    }
    let stop_signal = Arc::new(StopSignal::new());
    let heater_on = Arc::new(AtomicBool::new(false));

    let cfg = CascadeConfig {
        coil_sensor: Some(COIL.into()),
        min_on_seconds: 2.0,
        min_off_seconds: 2.0,
        cycle_seconds: 0.5,
        ..CascadeConfig::new(MASH_TUN, HLT)
    };
    let mut regulation = Regulation::new(
        cfg,
        SetPoint::new(MASH_TARGET),
        Arc::clone(&sensors),
        SimulatedHeater {
            on: Arc::clone(&heater_on),
        },
        MonotonicClock,
    )?;

    let simulation = thread::spawn({
        let sensors = Arc::clone(&sensors);
        let stop_signal = Arc::clone(&stop_signal);
        let heater_on = Arc::clone(&heater_on);
        move || simulate_kettles(&sensors, &stop_signal, &heater_on)
    });

    let timer = thread::spawn({
        let stop_signal = Arc::clone(&stop_signal);
        move || {
            if !stop_signal.wait_for(SIMULATION_TIME) {
                log::info!("Simulation time elapsed");
                stop_signal.raise();
            }
        }
    });

    let mut events = LogEvents::default();
    let result = regulation.run(&stop_signal, &mut events);

    // Regulation might have been aborted before the simulation time elapsed
    stop_signal.raise();
    timer.join().map_err(|_| anyhow::anyhow!("timer thread panicked"))?;
    simulation
        .join()
        .map_err(|_| anyhow::anyhow!("simulation thread panicked"))?;
    result?;

    log::info!(
        "Terminating cascade simulation example after {} heater switches",
        events.switch_count
    );
    Ok(())
}

struct SimulatedHeater {
    on: Arc<AtomicBool>,
}

impl Heater for SimulatedHeater {
    fn switch_on(&mut self, power: u8) -> Result<()> {
        log::debug!("Heater on ({}%)", power);
        self.on.store(true, Ordering::Release);
        Ok(())
    }

    fn switch_off(&mut self) -> Result<()> {
        log::debug!("Heater off");
        self.on.store(false, Ordering::Release);
        Ok(())
    }
}

#[derive(Default)]
struct LogEvents {
    last_heater_on: Option<bool>,
    switch_count: usize,
}

impl Events for LogEvents {
    fn on_event(&mut self, event: Event) {
        match event {
            Event::HeaterCommanded { on } => {
                if self.last_heater_on.replace(on) != Some(on) {
                    self.switch_count += 1;
                }
            }
            Event::TargetReached { .. } => {
                if self.last_heater_on.replace(false) == Some(true) {
                    self.switch_count += 1;
                }
            }
            event => log::debug!("{:?}", event),
        }
    }
}

/// A crude thermal model of a HERMS setup
///
/// The heater warms the HLT, the wort is pumped through a coil
/// within the HLT and warms the mash tun.
fn simulate_kettles(sensors: &SensorReadings, stop_signal: &StopSignal, heater_on: &AtomicBool) {
    let mut hlt = 60.0_f64;
    let mut mash = 58.0_f64;
    while !stop_signal.wait_for(SIMULATION_STEP) {
        if heater_on.load(Ordering::Acquire) {
            hlt += 0.25;
        }
        // Losses to the environment
        hlt -= (hlt - 20.0) * 0.0005;
        let coil = mash + (hlt - mash) * 0.8;
        mash += (coil - mash) * 0.02;
        sensors.update(HLT, hlt);
        sensors.update(COIL, coil);
        sensors.update(MASH_TUN, mash);
        log::trace!("HLT: {:.2}, coil: {:.2}, mash tun: {:.2}", hlt, coil, mash);
    }
}
