//! A fake bus for exercising the driver without hardware.
//!
//! Enabled with the `testing` feature.

use std::{collections::BTreeSet, io};

use crate::{bus::Bus, error::Error, error::Result};

/// One transfer seen by a [`RecordingBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
	Register { address: u8, register: u8, byte: u8 },
	Block { address: u8, bytes: Vec<u8> },
}

/// A [`Bus`] that records every write and answers probes from a fixed set of addresses.
///
/// Writes to an address with no device fail like a NACK would. Individual writes can also be
/// made to fail by their index with [`fail_on`](RecordingBus::fail_on).
#[derive(Debug, Clone, Default)]
pub struct RecordingBus {
	devices: BTreeSet<u8>,
	failing: BTreeSet<usize>,
	attempts: usize,
	pub transfers: Vec<Transfer>,
}

impl RecordingBus {
	pub fn with_devices(devices: impl IntoIterator<Item = u8>) -> Self {
		Self {
			devices: devices.into_iter().collect(),
			..Default::default()
		}
	}

	/// Make the nth write attempt (0-based, counting both kinds) fail.
	pub fn fail_on(mut self, attempts: impl IntoIterator<Item = usize>) -> Self {
		self.failing.extend(attempts);
		self
	}

	/// Number of write attempts so far, successful or not.
	pub fn attempts(&self) -> usize {
		self.attempts
	}

	/// The command bytes written, in order (register writes to control byte 0x00).
	pub fn commands(&self) -> Vec<u8> {
		self.transfers
			.iter()
			.filter_map(|t| match t {
				Transfer::Register {
					register: 0x00,
					byte,
					..
				} => Some(*byte),
				_ => None,
			})
			.collect()
	}

	/// The block payloads written, in order.
	pub fn blocks(&self) -> Vec<&[u8]> {
		self.transfers
			.iter()
			.filter_map(|t| match t {
				Transfer::Block { bytes, .. } => Some(&bytes[..]),
				_ => None,
			})
			.collect()
	}

	fn attempt(&mut self, address: u8) -> Result<()> {
		let n = self.attempts;
		self.attempts += 1;
		if !self.devices.contains(&address) || self.failing.contains(&n) {
			return Err(Error::Transaction(io::Error::other(format!(
				"no acknowledgement from {address:#04X}"
			))));
		}

		Ok(())
	}
}

impl Bus for RecordingBus {
	fn probe(&mut self, address: u8) -> bool {
		self.devices.contains(&address)
	}

	fn write_register(&mut self, address: u8, register: u8, byte: u8) -> Result<()> {
		self.attempt(address)?;
		self.transfers.push(Transfer::Register {
			address,
			register,
			byte,
		});
		Ok(())
	}

	fn write_block(&mut self, address: u8, bytes: &[u8]) -> Result<()> {
		self.attempt(address)?;
		self.transfers.push(Transfer::Block {
			address,
			bytes: bytes.to_vec(),
		});
		Ok(())
	}
}
