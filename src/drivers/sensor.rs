// FallWatch: Motion Sensor Source
//
// Push interface from the platform sensor framework into the engine. No
// backpressure: delivery is a channel send and never blocks the caller.

use std::sync::mpsc::Sender;

use crate::events::{AmbientReading, Command, Sample, SensorKind};

pub trait SensorSource: Send {
    /// Whether the device has a sensor of this kind.
    fn is_available(&self, kind: SensorKind) -> bool;

    /// Begin delivering samples of every available kind into `sink`.
    fn subscribe(&mut self, sink: SampleSink) -> anyhow::Result<()>;

    /// Stop delivering. Must be safe to call when not subscribed.
    fn unsubscribe(&mut self);
}

/// Cloneable delivery handle given to a `SensorSource` on subscribe.
#[derive(Debug, Clone)]
pub struct SampleSink {
    tx: Sender<Command>,
}

impl SampleSink {
    pub(crate) fn new(tx: Sender<Command>) -> Self {
        Self { tx }
    }

    /// Returns false once the engine has stopped; the source should then
    /// stop producing.
    pub fn deliver(&self, sample: Sample) -> bool {
        self.tx.send(Command::SampleArrived(sample)).is_ok()
    }

    pub fn deliver_ambient(&self, reading: AmbientReading) -> bool {
        self.tx.send(Command::Ambient(reading)).is_ok()
    }
}
