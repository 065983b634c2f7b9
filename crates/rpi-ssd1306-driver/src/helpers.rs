use crate::error::{Error, Result};

/// Number of pixel rows in one GDDRAM page.
pub const PAGE_HEIGHT: u16 = 8;

/// Panel geometry, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplaySize {
	width: u16,
	height: u16,
}

impl DisplaySize {
	/// The common 0.91" panel.
	pub const SIZE_128X32: Self = Self {
		width: 128,
		height: 32,
	};

	/// The common 0.96" and 1.3" panels.
	pub const SIZE_128X64: Self = Self {
		width: 128,
		height: 64,
	};

	/// A custom geometry.
	///
	/// The controller has 128 segments and 64 commons, and addresses rows in pages of 8.
	pub fn new(width: u16, height: u16) -> Result<Self> {
		if width == 0
			|| width > 128
			|| height == 0
			|| height > 64
			|| height % PAGE_HEIGHT != 0
		{
			return Err(Error::Geometry { width, height });
		}

		Ok(Self { width, height })
	}

	pub fn width(&self) -> u16 {
		self.width
	}

	pub fn height(&self) -> u16 {
		self.height
	}

	/// Number of GDDRAM pages covering the panel.
	pub fn pages(&self) -> u8 {
		(self.height / PAGE_HEIGHT) as u8
	}

	/// Operand for [`Command::SetMultiplexRatio`](crate::Command::SetMultiplexRatio).
	pub fn multiplex_ratio(&self) -> u8 {
		(self.height - 1) as u8
	}

	/// Operand for [`Command::SetComPins`](crate::Command::SetComPins).
	///
	/// 32-row panels are wired with sequential COM pins, taller ones with the alternative
	/// configuration.
	pub fn com_pins(&self) -> u8 {
		if self.height <= 32 { 0x02 } else { 0x12 }
	}

	/// Contrast to use after init, and to restore after changing it.
	pub fn default_contrast(&self) -> u8 {
		if self.height <= 32 { 0x8F } else { 0xCF }
	}
}

impl Default for DisplaySize {
	fn default() -> Self {
		Self::SIZE_128X32
	}
}

impl std::fmt::Display for DisplaySize {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}x{}", self.width, self.height)
	}
}
