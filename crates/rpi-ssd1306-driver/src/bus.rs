use std::ops::RangeInclusive;

use tracing::{debug, instrument, trace};

use crate::error::Result;

/// Addresses probed by [`scan`], as `i2cdetect` does by default.
///
/// Addresses below 0x03 and above 0x77 are reserved by the I2C specification.
pub const SCAN_RANGE: RangeInclusive<u8> = 0x03..=0x77;

/// A register-style I2C transport.
///
/// This is the only seam between the driver and the hardware: the Linux implementation is
/// [`I2cBus`], and tests drive the same code through a recording bus.
pub trait Bus {
	/// Check whether a device acknowledges at `address`.
	///
	/// This attempts a single-byte read. Any failure, including the address being rejected by
	/// the kernel, counts as "nobody there".
	fn probe(&mut self, address: u8) -> bool;

	/// Write one byte to a register of the device at `address`.
	fn write_register(&mut self, address: u8, register: u8, byte: u8) -> Result<()>;

	/// Write a block of bytes to the device at `address`, in a single transfer.
	fn write_block(&mut self, address: u8, bytes: &[u8]) -> Result<()>;
}

impl<B: Bus + ?Sized> Bus for &mut B {
	fn probe(&mut self, address: u8) -> bool {
		(**self).probe(address)
	}

	fn write_register(&mut self, address: u8, register: u8, byte: u8) -> Result<()> {
		(**self).write_register(address, register, byte)
	}

	fn write_block(&mut self, address: u8, bytes: &[u8]) -> Result<()> {
		(**self).write_block(address, bytes)
	}
}

/// Probe every address in [`SCAN_RANGE`], returning those that answered, in ascending order.
pub fn scan(bus: &mut impl Bus) -> Vec<u8> {
	scan_while(bus, |_| true)
}

/// Like [`scan`], but asks `proceed` before probing each address, and stops early when it says no.
///
/// The addresses found up to that point are returned.
#[instrument(level = "debug", skip(bus, proceed))]
pub fn scan_while(bus: &mut impl Bus, mut proceed: impl FnMut(u8) -> bool) -> Vec<u8> {
	let mut found = Vec::new();
	for address in SCAN_RANGE {
		if !proceed(address) {
			debug!(at = %format!("{address:#04X}"), "scan stopped");
			break;
		}

		let present = bus.probe(address);
		trace!(address = %format!("{address:#04X}"), present, "probed");
		if present {
			found.push(address);
		}
	}

	debug!(count = found.len(), "scan complete");
	found
}

#[cfg(target_os = "linux")]
pub use linux::I2cBus;

#[cfg(target_os = "linux")]
mod linux {
	use std::io::{self, ErrorKind};

	use rppal::i2c::{self, I2c};
	use tracing::{debug, instrument, trace};

	use super::Bus;
	use crate::error::{Error, Result};

	/// A Linux `/dev/i2c-N` bus.
	///
	/// The device node is held open until this is dropped.
	#[derive(Debug)]
	pub struct I2cBus {
		i2c: I2c,
		bus: u8,
		selected: Option<u8>,
	}

	impl I2cBus {
		/// Open `/dev/i2c-{bus}`.
		///
		/// A missing node is [`Error::BusUnavailable`], an unreadable one is
		/// [`Error::PermissionDenied`].
		#[instrument(level = "debug")]
		pub fn open(bus: u8) -> Result<Self> {
			let i2c = I2c::with_bus(bus).map_err(|err| match into_io(err) {
				err if err.kind() == ErrorKind::NotFound => Error::BusUnavailable { bus },
				err if err.kind() == ErrorKind::PermissionDenied => {
					Error::PermissionDenied { bus }
				}
				source => Error::Open { bus, source },
			})?;

			debug!(bus, "opened i2c bus");
			Ok(Self {
				i2c,
				bus,
				selected: None,
			})
		}

		/// Bus number this was opened with.
		pub fn number(&self) -> u8 {
			self.bus
		}

		fn select(&mut self, address: u8) -> Result<()> {
			if self.selected != Some(address) {
				self.selected = None;
				self.i2c
					.set_slave_address(address.into())
					.map_err(|err| Error::Transaction(into_io(err)))?;
				self.selected = Some(address);
			}

			Ok(())
		}
	}

	impl Bus for I2cBus {
		fn probe(&mut self, address: u8) -> bool {
			if self.select(address).is_err() {
				return false;
			}

			self.i2c.smbus_receive_byte().is_ok()
		}

		fn write_register(&mut self, address: u8, register: u8, byte: u8) -> Result<()> {
			self.select(address)?;
			trace!(register = %format!("{register:02X?}"), byte = %format!("{byte:02X?}"), "writing register");
			self.i2c
				.smbus_write_byte(register, byte)
				.map_err(|err| Error::Transaction(into_io(err)))
		}

		fn write_block(&mut self, address: u8, bytes: &[u8]) -> Result<()> {
			self.select(address)?;
			trace!(length = bytes.len(), "writing block");
			let written = self
				.i2c
				.write(bytes)
				.map_err(|err| Error::Transaction(into_io(err)))?;
			if written != bytes.len() {
				return Err(Error::Transaction(io::Error::new(
					ErrorKind::WriteZero,
					format!("short write: {written} of {} bytes", bytes.len()),
				)));
			}

			Ok(())
		}
	}

	impl Drop for I2cBus {
		fn drop(&mut self) {
			debug!(bus = self.bus, "releasing i2c bus");
		}
	}

	fn into_io(err: i2c::Error) -> io::Error {
		match err {
			i2c::Error::Io(err) => err,
			other => io::Error::other(other),
		}
	}
}
