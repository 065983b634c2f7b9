use crate::helpers::DisplaySize;

/// Control byte announcing a command byte.
pub const CONTROL_COMMAND: u8 = 0x00;

/// Control byte announcing a run of GDDRAM data bytes.
pub const CONTROL_DATA: u8 = 0x40;

/// Operand for [`Command::ChargePump`] that enables the internal DC-DC converter.
pub const CHARGE_PUMP_ENABLE: u8 = 0x14;

/// Operand for [`Command::MemoryAddressingMode`] selecting page addressing.
///
/// This is the mode in which [`Command::PageStart`] and the column nibble commands apply.
pub const ADDRESSING_PAGE: u8 = 0x02;

/// OLED controller commands
///
/// This is a subset of the SSD1306 command set, enough to initialise the panel and run the
/// hardware diagnostics. Descriptions are derived from [the datasheet for the SSD1306 chip][SSD1306].
///
/// Commands that take operands are sent as separate command bytes, each preceded by the
/// [`CONTROL_COMMAND`] byte.
///
/// [SSD1306]: https://cdn-shop.adafruit.com/datasheets/SSD1306.pdf
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
	/// Set lower column start address (page addressing mode).
	///
	/// The low nibble of the opcode is the low nibble of the column.
	LowerColumnStart = 0x00,

	/// Set higher column start address (page addressing mode).
	///
	/// The low nibble of the opcode is the high nibble of the column.
	HigherColumnStart = 0x10,

	/// Set memory addressing mode.
	///
	/// 1 byte:
	/// - 0b00: horizontal
	/// - 0b01: vertical
	/// - 0b10: page (reset default)
	MemoryAddressingMode = 0x20,

	/// Set display start line to 0.
	///
	/// The low 6 bits of the opcode are the start line.
	StartLine = 0x40,

	/// Set contrast control.
	///
	/// 1 byte: contrast, 0x00 to 0xFF. Brightness increases with the value.
	SetContrast = 0x81,

	/// Charge pump setting.
	///
	/// 1 byte: 0x14 to enable, 0x10 to disable. The pump must be enabled before display on when
	/// the panel isn't powered externally.
	ChargePump = 0x8D,

	/// Segment remap: column address 0 is mapped to SEG0.
	SegmentRemapNormal = 0xA0,

	/// Segment remap: column address 127 is mapped to SEG0.
	SegmentRemapReversed = 0xA1,

	/// Resume to RAM content display (the reset default).
	///
	/// Output follows GDDRAM again after [`Command::EntireDisplayOn`].
	ResumeFromRam = 0xA4,

	/// Entire display on.
	///
	/// Lights every pixel regardless of GDDRAM content. This is driven directly by the chip, so
	/// it's the purest test of the panel itself.
	EntireDisplayOn = 0xA5,

	/// Normal display: a 1 in GDDRAM is a lit pixel.
	NormalDisplay = 0xA6,

	/// Inverse display: a 0 in GDDRAM is a lit pixel.
	InvertDisplay = 0xA7,

	/// Set multiplex ratio.
	///
	/// 1 byte: number of active rows minus one, 15 to 63.
	SetMultiplexRatio = 0xA8,

	/// Display off (sleep mode).
	DisplayOff = 0xAE,

	/// Display on (normal mode).
	DisplayOn = 0xAF,

	/// Set page start address (page addressing mode).
	///
	/// The low 3 bits of the opcode are the page number.
	PageStart = 0xB0,

	/// COM output scan direction: COM0 to COM[N-1].
	ComScanIncrement = 0xC0,

	/// COM output scan direction: COM[N-1] to COM0.
	///
	/// Together with [`Command::SegmentRemapReversed`], this rotates the image by 180°.
	ComScanDecrement = 0xC8,

	/// Set display offset.
	///
	/// 1 byte: vertical shift by COM, 0 to 63.
	SetDisplayOffset = 0xD3,

	/// Set display clock divide ratio and oscillator frequency.
	///
	/// 2 nibbles in 1 byte:
	/// - oscillator frequency (high nibble)
	/// - divide ratio minus one (low nibble)
	SetClockDivider = 0xD5,

	/// Set pre-charge period.
	///
	/// 2 nibbles in 1 byte:
	/// - phase 2 period (high nibble)
	/// - phase 1 period (low nibble)
	SetPrecharge = 0xD9,

	/// Set COM pins hardware configuration.
	///
	/// 1 byte: 0b00AB0010 where A selects alternative COM pin configuration and B enables COM
	/// left/right remap. Use [`DisplaySize::com_pins()`] for the value matching the panel.
	SetComPins = 0xDA,

	/// Set VCOMH deselect level.
	///
	/// 1 byte: 0x00 (~0.65 Vcc), 0x20 (~0.77 Vcc), 0x30 (~0.83 Vcc); 0x40 is commonly used.
	SetVcomDeselect = 0xDB,
}

impl From<Command> for u8 {
	fn from(command: Command) -> u8 {
		command as u8
	}
}

/// One step of the initialisation sequence: a command and its operand, if any.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct InitStep {
	pub command: Command,
	pub operand: Option<u8>,
}

impl InitStep {
	const fn bare(command: Command) -> Self {
		Self {
			command,
			operand: None,
		}
	}

	const fn with(command: Command, operand: u8) -> Self {
		Self {
			command,
			operand: Some(operand),
		}
	}

	/// The bytes this step puts on the bus, in order.
	pub fn bytes(&self) -> impl Iterator<Item = u8> + use<> {
		std::iter::once(u8::from(self.command)).chain(self.operand)
	}
}

/// The power-on initialisation sequence for a panel of the given size.
///
/// This follows the datasheet's recommended software initialisation, with the multiplex ratio,
/// COM pin configuration, and contrast chosen for the panel's row count. Getting those wrong
/// gives a garbled or blank display even on a healthy bus.
///
/// Addressing is left in page mode, which is what page-by-page writes need.
pub fn init_sequence(size: DisplaySize) -> Vec<InitStep> {
	use Command::*;

	vec![
		InitStep::bare(DisplayOff),
		InitStep::with(SetClockDivider, 0x80),
		InitStep::with(SetMultiplexRatio, size.multiplex_ratio()),
		InitStep::with(SetDisplayOffset, 0x00),
		InitStep::bare(StartLine),
		InitStep::with(ChargePump, CHARGE_PUMP_ENABLE),
		InitStep::with(MemoryAddressingMode, ADDRESSING_PAGE),
		InitStep::bare(SegmentRemapReversed),
		InitStep::bare(ComScanDecrement),
		InitStep::with(SetComPins, size.com_pins()),
		InitStep::with(SetContrast, size.default_contrast()),
		InitStep::with(SetPrecharge, 0xF1),
		InitStep::with(SetVcomDeselect, 0x40),
		InitStep::bare(ResumeFromRam),
		InitStep::bare(NormalDisplay),
		InitStep::bare(DisplayOn),
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	fn flatten(steps: &[InitStep]) -> Vec<u8> {
		steps.iter().flat_map(InitStep::bytes).collect()
	}

	#[test]
	fn init_128x32() {
		assert_eq!(
			flatten(&init_sequence(DisplaySize::SIZE_128X32)),
			vec![
				0xAE, 0xD5, 0x80, 0xA8, 0x1F, 0xD3, 0x00, 0x40, 0x8D, 0x14, 0x20, 0x02, 0xA1, 0xC8,
				0xDA, 0x02, 0x81, 0x8F, 0xD9, 0xF1, 0xDB, 0x40, 0xA4, 0xA6, 0xAF,
			]
		);
	}

	#[test]
	fn init_128x64_differs_in_rows() {
		let bytes = flatten(&init_sequence(DisplaySize::SIZE_128X64));
		assert_eq!(&bytes[3..5], &[0xA8, 0x3F]);
		assert_eq!(&bytes[14..18], &[0xDA, 0x12, 0x81, 0xCF]);
	}

	#[test]
	fn init_is_deterministic() {
		for size in [DisplaySize::SIZE_128X32, DisplaySize::SIZE_128X64] {
			assert_eq!(init_sequence(size), init_sequence(size));
		}
	}

	#[test]
	fn init_starts_off_and_ends_on() {
		let steps = init_sequence(DisplaySize::SIZE_128X32);
		assert_eq!(steps.first().map(|s| s.command), Some(Command::DisplayOff));
		assert_eq!(steps.last().map(|s| s.command), Some(Command::DisplayOn));
	}
}
