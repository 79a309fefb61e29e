// FallWatch: Scripted Replay Sensor Source
//
// Replays a timed script of motion and ambient readings from its own
// "sensor" thread, stamping each sample with the real delivery instant.
// Stands in for the platform sensor framework on hosts and in tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::drivers::sensor::{SampleSink, SensorSource};
use crate::events::{AmbientReading, Sample, SensorKind};

// Longest single sleep, so unsubscribe is noticed promptly.
const STOP_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayStep {
    Motion {
        offset: Duration,
        source: SensorKind,
        axes: (f64, f64, f64),
    },
    Ambient {
        offset: Duration,
        reading: AmbientReading,
    },
}

impl ReplayStep {
    pub fn offset(&self) -> Duration {
        match self {
            Self::Motion { offset, .. } | Self::Ambient { offset, .. } => *offset,
        }
    }
}

pub struct ReplaySource {
    script: Vec<ReplayStep>,
    accelerometer: bool,
    gyroscope: bool,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ReplaySource {
    pub fn new(mut script: Vec<ReplayStep>) -> Self {
        script.sort_by_key(ReplayStep::offset);
        Self {
            script,
            accelerometer: true,
            gyroscope: true,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Pretend the device lacks a sensor of `kind`.
    pub fn without(mut self, kind: SensorKind) -> Self {
        match kind {
            SensorKind::Accelerometer => self.accelerometer = false,
            SensorKind::Gyroscope => self.gyroscope = false,
        }
        self
    }

    /// A hard fall: impact, rotation 200 ms later, then the wearer lying still.
    pub fn fall_script() -> Vec<ReplayStep> {
        let ms = Duration::from_millis;
        vec![
            ReplayStep::Ambient {
                offset: ms(0),
                reading: AmbientReading::Temperature(22.5),
            },
            ReplayStep::Ambient {
                offset: ms(0),
                reading: AmbientReading::Light(180.0),
            },
            ReplayStep::Motion {
                offset: ms(50),
                source: SensorKind::Accelerometer,
                axes: (0.1, 0.2, 9.8),
            },
            ReplayStep::Motion {
                offset: ms(300),
                source: SensorKind::Accelerometer,
                axes: (8.0, 6.5, 9.0),
            },
            ReplayStep::Motion {
                offset: ms(500),
                source: SensorKind::Gyroscope,
                axes: (1.1, 0.6, 0.4),
            },
            ReplayStep::Motion {
                offset: ms(900),
                source: SensorKind::Accelerometer,
                axes: (0.0, 9.7, 0.3),
            },
            ReplayStep::Motion {
                offset: ms(1000),
                source: SensorKind::Gyroscope,
                axes: (0.02, 0.01, 0.0),
            },
        ]
    }
}

impl SensorSource for ReplaySource {
    fn is_available(&self, kind: SensorKind) -> bool {
        match kind {
            SensorKind::Accelerometer => self.accelerometer,
            SensorKind::Gyroscope => self.gyroscope,
        }
    }

    fn subscribe(&mut self, sink: SampleSink) -> anyhow::Result<()> {
        self.unsubscribe();
        self.stop.store(false, Ordering::SeqCst);

        let script: Vec<ReplayStep> = self
            .script
            .iter()
            .copied()
            .filter(|step| match step {
                ReplayStep::Motion { source, .. } => self.is_available(*source),
                ReplayStep::Ambient { .. } => true,
            })
            .collect();
        let stop = Arc::clone(&self.stop);

        let worker = thread::Builder::new()
            .name("sensor".into())
            .spawn(move || replay_task(script, sink, stop))
            .context("spawning replay sensor thread")?;
        self.worker = Some(worker);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Replay sensor thread panicked");
            }
        }
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

fn replay_task(script: Vec<ReplayStep>, sink: SampleSink, stop: Arc<AtomicBool>) {
    log::info!("Replay sensor started ({} steps)", script.len());
    let start = Instant::now();

    for step in script {
        let due = start + step.offset();
        loop {
            if stop.load(Ordering::SeqCst) {
                return;
            }
            let now = Instant::now();
            if now >= due {
                break;
            }
            thread::sleep((due - now).min(STOP_POLL));
        }

        let delivered = match step {
            ReplayStep::Motion { source, axes, .. } => {
                sink.deliver(Sample::new(source, axes, Instant::now()))
            }
            ReplayStep::Ambient { reading, .. } => sink.deliver_ambient(reading),
        };
        if !delivered {
            log::warn!("Engine channel closed, exiting replay sensor");
            return;
        }
    }
    log::info!("Replay script finished");
}
