use std::{thread::sleep, time::Duration};

use tracing::{instrument, trace};

use super::{
	bus::Bus,
	commands::*,
	error::{Error, Result},
	helpers::DisplaySize,
};

/// Driver for the OLED display.
///
/// This owns the bus for as long as it lives; use [`into_inner()`](Driver::into_inner) to get it
/// back.
#[derive(Debug)]
pub struct Driver<B> {
	pub(crate) bus: B,
	pub(crate) address: u8,
	pub(crate) size: DisplaySize,
	pub(crate) init_pacing: Duration,
}

impl<B: Bus> Driver<B> {
	/// Wrap a bus to talk to the display at `address`.
	///
	/// This doesn't touch the display. Usually you'll want to call [`init()`](Driver::init) next.
	pub fn new(bus: B, address: u8, size: DisplaySize) -> Self {
		Self {
			bus,
			address,
			size,
			init_pacing: Duration::from_millis(1),
		}
	}

	/// Change the delay between init sequence writes (1 ms by default).
	pub fn with_init_pacing(mut self, pacing: Duration) -> Self {
		self.init_pacing = pacing;
		self
	}

	pub fn address(&self) -> u8 {
		self.address
	}

	pub fn size(&self) -> DisplaySize {
		self.size
	}

	/// Give the bus back.
	pub fn into_inner(self) -> B {
		self.bus
	}

	/// Perform the init sequence.
	///
	/// See [`init_sequence()`] for what's sent. This stops at the first failed write.
	#[instrument(level = "debug", skip(self))]
	pub fn init(&mut self) -> Result<usize> {
		let mut written = 0;
		for step in init_sequence(self.size) {
			for byte in step.bytes() {
				self.command_byte(byte)?;
				written += 1;
				if !self.init_pacing.is_zero() {
					sleep(self.init_pacing);
				}
			}
		}

		Ok(written)
	}

	/// Send a raw command byte.
	#[instrument(level = "trace", skip(self))]
	pub fn command_byte(&mut self, byte: u8) -> Result<()> {
		trace!(byte=%format!("{byte:02X?}"), "writing command byte to I2C");
		self.bus.write_register(self.address, CONTROL_COMMAND, byte)
	}

	/// Send a command.
	pub fn command(&mut self, command: Command) -> Result<()> {
		self.command_byte(command.into())
	}

	/// Send a command followed by its operand.
	pub fn command_with(&mut self, command: Command, operand: u8) -> Result<()> {
		self.command(command)?;
		self.command_byte(operand)
	}

	/// Turn the display on or off.
	#[instrument(level = "trace", skip(self))]
	pub fn display(&mut self, on: bool) -> Result<()> {
		if on {
			self.command(Command::DisplayOn)
		} else {
			self.command(Command::DisplayOff)
		}
	}

	/// Light every pixel regardless of GDDRAM (true), or go back to showing GDDRAM (false).
	#[instrument(level = "trace", skip(self))]
	pub fn entire_display(&mut self, on: bool) -> Result<()> {
		if on {
			self.command(Command::EntireDisplayOn)
		} else {
			self.command(Command::ResumeFromRam)
		}
	}

	/// Switch between inverted and normal display.
	#[instrument(level = "trace", skip(self))]
	pub fn invert(&mut self, inverted: bool) -> Result<()> {
		if inverted {
			self.command(Command::InvertDisplay)
		} else {
			self.command(Command::NormalDisplay)
		}
	}

	/// Set the contrast register.
	#[instrument(level = "trace", skip(self))]
	pub fn contrast(&mut self, level: u8) -> Result<()> {
		self.command_with(Command::SetContrast, level)
	}

	/// Point the write cursor at the first column of a page.
	#[instrument(level = "trace", skip(self))]
	pub fn set_page(&mut self, page: u8) -> Result<()> {
		self.command_byte(u8::from(Command::PageStart) | (page & 0x07))?;
		self.command(Command::LowerColumnStart)?;
		self.command(Command::HigherColumnStart)
	}

	/// Write one full page of GDDRAM.
	///
	/// `data` must be exactly as long as the display is wide.
	#[instrument(level = "trace", skip(self, data))]
	pub fn write_page(&mut self, page: u8, data: &[u8]) -> Result<()> {
		if data.len() != usize::from(self.size.width()) || page >= self.size.pages() {
			return Err(Error::PageLength {
				page,
				len: data.len(),
				width: self.size.width(),
			});
		}

		self.set_page(page)?;

		let mut block = Vec::with_capacity(data.len() + 1);
		block.push(CONTROL_DATA);
		block.extend_from_slice(data);
		trace!(page, length = data.len(), "writing page data to I2C");
		self.bus.write_block(self.address, &block)
	}

	/// Fill GDDRAM with a pattern computed for each (page, column).
	#[instrument(level = "debug", skip(self, pattern))]
	pub fn fill(&mut self, pattern: impl Fn(u8, u16) -> u8) -> Result<()> {
		for page in 0..self.size.pages() {
			let data: Vec<u8> = (0..self.size.width())
				.map(|column| pattern(page, column))
				.collect();
			self.write_page(page, &data)?;
		}

		Ok(())
	}

	/// Blank GDDRAM.
	pub fn clear(&mut self) -> Result<()> {
		self.fill(|_, _| 0x00)
	}
}
