//! InputGate for reading from multiple input channels.
//!
//! - Fair selection across channels
//! - Tracks channel end markers
//! - Timed polling so the task can observe processing time while idle

use super::channel::LocalChannelReceiver;
use crate::types::StreamElement;
use anyhow::{anyhow, Result};
use crossbeam_channel::Select;
use std::time::Duration;

/// Channel identifier (index in the input gate).
pub type ChannelIndex = usize;

/// InputGate reads from multiple input channels.
///
/// `End` is only surfaced once every channel has ended; `Flush` requests
/// pass through from whichever channel sent them.
pub struct InputGate<T> {
    channels: Vec<LocalChannelReceiver<T>>,
    ended_channels: Vec<bool>,
    ended_count: usize,
}

impl<T> InputGate<T> {
    pub fn new(channels: Vec<LocalChannelReceiver<T>>) -> Self {
        let num_channels = channels.len();
        Self {
            channels,
            ended_channels: vec![false; num_channels],
            ended_count: 0,
        }
    }

    /// Block until the next element from any input channel.
    ///
    /// Returns error when all channels have ended or a channel disconnects
    /// without sending `End`.
    pub fn next(&mut self) -> Result<(ChannelIndex, StreamElement<T>)> {
        match self.select_next(None)? {
            Some(next) => Ok(next),
            None => Err(anyhow!("Input gate woke up without an element")),
        }
    }

    /// Like [`next`](Self::next), but gives up after `timeout`.
    ///
    /// `Ok(None)` means nothing arrived in time.
    pub fn next_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<(ChannelIndex, StreamElement<T>)>> {
        self.select_next(Some(timeout))
    }

    fn select_next(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<Option<(ChannelIndex, StreamElement<T>)>> {
        if self.all_ended() {
            return Err(anyhow!("All input channels have ended"));
        }

        loop {
            let mut select = Select::new();
            let mut active_indices = Vec::new();

            for (idx, receiver) in self.channels.iter().enumerate() {
                if !self.ended_channels[idx] {
                    select.recv(&receiver.receiver);
                    active_indices.push(idx);
                }
            }

            let oper = match timeout {
                Some(timeout) => match select.select_timeout(timeout) {
                    Ok(oper) => oper,
                    Err(_) => return Ok(None),
                },
                None => select.select(),
            };

            let channel_idx = active_indices[oper.index()];
            let element = oper
                .recv(&self.channels[channel_idx].receiver)
                .map_err(|_| anyhow!("Channel {} closed unexpectedly", channel_idx))?;

            if matches!(element, StreamElement::End) {
                self.mark_ended(channel_idx);
                if self.all_ended() {
                    return Ok(Some((channel_idx, element)));
                }
                continue;
            }

            return Ok(Some((channel_idx, element)));
        }
    }

    pub fn mark_ended(&mut self, channel_idx: ChannelIndex) {
        if !self.ended_channels[channel_idx] {
            self.ended_channels[channel_idx] = true;
            self.ended_count += 1;
        }
    }

    pub fn all_ended(&self) -> bool {
        self.ended_count == self.channels.len()
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
#[path = "tests/input_gate_tests.rs"]
mod tests;
