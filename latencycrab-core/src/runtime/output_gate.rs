//! OutputGate for sending to downstream channels.
//!
//! Aggregated counts are forwarded to a single downstream; control
//! elements such as `End` are broadcast to every downstream.

use super::channel::LocalChannelSender;
use crate::types::StreamElement;
use anyhow::{bail, Result};

pub struct OutputGate<T> {
    channels: Vec<LocalChannelSender<T>>,
}

impl<T> OutputGate<T> {
    pub fn new(channels: Vec<LocalChannelSender<T>>) -> Self {
        Self { channels }
    }

    /// Broadcast an element to all output channels.
    ///
    /// With no output channels this is a no-op.
    pub fn broadcast(&self, element: StreamElement<T>) -> Result<()>
    where
        T: Clone,
    {
        let Some((last, rest)) = self.channels.split_last() else {
            return Ok(());
        };

        for channel in rest {
            channel.send(element.clone())?;
        }
        last.send(element)
    }

    /// Send to the single output channel (forward partitioning).
    pub fn forward(&self, element: StreamElement<T>) -> Result<()> {
        if self.channels.len() != 1 {
            bail!(
                "Forward requires exactly 1 output channel, found {}",
                self.channels.len()
            );
        }
        self.channels[0].send(element)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }
}
