use anyhow::Result;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub(crate) const READOUTS: [&str; 4] = [
    "Total Mass",
    "Cabin Temperature",
    "Urine Tank",
    "Gyroscope Momentum",
];
pub(crate) const STATUS: &str = "Status";
pub(crate) const MISSING: &str = "--";

/// Display form of a raw reading.
pub(crate) fn format_reading(name: &str, raw: &str) -> String {
    let Ok(v) = raw.trim().parse::<f64>() else {
        return raw.to_string();
    };
    if !v.is_finite() {
        return raw.to_string();
    }
    if name.to_lowercase().contains("temperature") {
        format!("{v:.1}°")
    } else if (0.0..=100.0).contains(&v) {
        format!("{v:.1}%")
    } else {
        format!("{v:.1}")
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct TelemetrySnapshot {
    values: BTreeMap<String, String>,
}

impl TelemetrySnapshot {
    pub(crate) fn set(&mut self, name: &str, raw: &str) {
        self.values.insert(name.to_string(), format_reading(name, raw));
    }

    /// Formatted value or the placeholder.
    pub(crate) fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or(MISSING)
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Something that yields raw `(name, value)` readings.
pub(crate) trait TelemetrySource: Send {
    fn sample(&mut self) -> Result<Vec<(String, String)>>;
}

/// Offline stand-in for the station feed: readings wander around
/// plausible values.
pub(crate) struct SimulatedStation {
    rng: StdRng,
    mass: f64,
    cabin: f64,
    tank: f64,
    gyro: f64,
}

impl SimulatedStation {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            mass: 419_725.0,
            cabin: 22.4,
            tank: 41.0,
            gyro: 12.5,
        }
    }
}

impl TelemetrySource for SimulatedStation {
    fn sample(&mut self) -> Result<Vec<(String, String)>> {
        self.mass += self.rng.gen_range(-2.0..2.0);
        self.cabin = (self.cabin + self.rng.gen_range(-0.05..0.05)).clamp(18.0, 27.0);
        self.tank = (self.tank + self.rng.gen_range(-0.1..0.3)).clamp(0.0, 100.0);
        self.gyro = (self.gyro + self.rng.gen_range(-0.4..0.4)).clamp(0.0, 100.0);
        Ok(vec![
            (READOUTS[0].to_string(), format!("{:.2}", self.mass)),
            (READOUTS[1].to_string(), format!("{:.2}", self.cabin)),
            (READOUTS[2].to_string(), format!("{:.2}", self.tank)),
            (READOUTS[3].to_string(), format!("{:.2}", self.gyro)),
            (STATUS.to_string(), "Simulated".to_string()),
        ])
    }
}

pub(crate) struct TelemetryFeed {
    rx: Receiver<TelemetrySnapshot>,
    latest: TelemetrySnapshot,
    connected: bool,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl TelemetryFeed {
    pub(crate) fn spawn<S: TelemetrySource + 'static>(mut source: S, period: Duration) -> Self {
        // one slot: while the loop is not draining, extra snapshots are dropped
        let (tx, rx) = mpsc::sync_channel(1);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let worker = thread::spawn(move || {
            info!("telemetry worker started, period {period:?}");
            let mut snap = TelemetrySnapshot::default();
            while !stop_flag.load(Ordering::Relaxed) {
                match source.sample() {
                    Ok(readings) => {
                        for (name, raw) in readings {
                            snap.set(&name, &raw);
                        }
                    }
                    Err(e) => {
                        warn!("telemetry source failed: {e:#}");
                        snap.set(STATUS, "Connection Error");
                    }
                }
                match tx.try_send(snap.clone()) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => break,
                }
                sleep_unless_stopped(&stop_flag, period);
            }
            info!("telemetry worker stopped");
        });

        Self {
            rx,
            latest: TelemetrySnapshot::default(),
            connected: true,
            stop,
            worker: Some(worker),
        }
    }

    #[cfg(test)]
    fn from_receiver(rx: Receiver<TelemetrySnapshot>) -> Self {
        Self {
            rx,
            latest: TelemetrySnapshot::default(),
            connected: true,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Drains pending snapshots and returns the newest one seen so far.
    pub(crate) fn poll(&mut self) -> &TelemetrySnapshot {
        loop {
            match self.rx.try_recv() {
                Ok(snap) => self.latest = snap,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.connected {
                        warn!("telemetry worker disconnected");
                        self.connected = false;
                        self.latest.set(STATUS, "Disconnected");
                    }
                    break;
                }
            }
        }
        &self.latest
    }

    pub(crate) fn latest(&self) -> &TelemetrySnapshot {
        &self.latest
    }
}

impl Drop for TelemetryFeed {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.worker.take() {
            let _ = h.join();
        }
    }
}

fn sleep_unless_stopped(stop: &AtomicBool, period: Duration) {
    let slice = Duration::from_millis(25);
    let mut left = period;
    while !left.is_zero() && !stop.load(Ordering::Relaxed) {
        let d = left.min(slice);
        thread::sleep(d);
        left -= d;
    }
}
