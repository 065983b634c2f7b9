use clap::{Parser, ValueEnum};
use lloggs::{LoggingArgs, PreArgs, WorkerGuard};
use miette::{Result, miette};
use rpi_ssd1306_driver::DisplaySize;
use tracing::debug;

/// SSD1306 OLED diagnostic
///
/// Walks through increasingly specific I2C tests against an SSD1306 OLED display, asking you to
/// confirm what you see on the screen after each visual test. This helps tell apart wiring
/// problems, a missing or mis-addressed device, and a burned-out panel.
///
/// Needs access to /dev/i2c-N: run as root, or as a member of the i2c group.
#[derive(Debug, Clone, Parser)]
#[command(
	author,
	version,
	after_help = "Want more detail? Try the long '--help' flag!",
	after_long_help = "Didn't expect this much output? Use the short '-h' flag to get short help."
)]
pub struct Args {
	#[command(flatten)]
	pub logging: LoggingArgs,

	/// I2C bus number
	///
	/// This is the N in /dev/i2c-N. On a Raspberry Pi, the header pins are bus 1.
	#[arg(long, default_value = "1", value_name = "N")]
	pub bus: u8,

	/// Address of the display on the bus
	///
	/// Either hexadecimal with a '0x' prefix, or decimal. SSD1306 modules answer on 0x3C, or on
	/// 0x3D when their address jumper is bridged.
	#[arg(
		long,
		alias = "address",
		default_value = "0x3C",
		value_parser = parse_address,
		value_name = "ADDR",
	)]
	pub addr: u8,

	/// Panel geometry, in pixels
	///
	/// This selects the multiplex ratio and COM pin wiring sent during init. A wrong value gives
	/// a garbled or partial picture even when everything else is fine.
	#[arg(long, default_value = "128x32", value_name = "SIZE")]
	pub size: PanelSize,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum PanelSize {
	/// 0.91" panels
	#[default]
	#[value(name = "128x32")]
	Size128x32,

	/// 0.96" and 1.3" panels
	#[value(name = "128x64")]
	Size128x64,
}

impl From<PanelSize> for DisplaySize {
	fn from(size: PanelSize) -> Self {
		match size {
			PanelSize::Size128x32 => DisplaySize::SIZE_128X32,
			PanelSize::Size128x64 => DisplaySize::SIZE_128X64,
		}
	}
}

/// Parse a 7-bit I2C address, in hexadecimal (`0x3C`) or decimal (`60`).
pub fn parse_address(input: &str) -> std::result::Result<u8, String> {
	let input = input.trim();
	let value = match input
		.strip_prefix("0x")
		.or_else(|| input.strip_prefix("0X"))
	{
		Some(hex) => u8::from_str_radix(hex, 16),
		None => input.parse::<u8>(),
	}
	.map_err(|err| format!("expected a hexadecimal (0x..) or decimal address: {err}"))?;

	if value > 0x7F {
		return Err(format!("{value:#04X} is not a 7-bit address"));
	}

	Ok(value)
}

pub fn get_args() -> Result<(Args, WorkerGuard)> {
	let log_guard = PreArgs::parse().setup().map_err(|err| miette!("{err}"))?;

	debug!("parsing arguments");
	let args = Args::parse();

	let log_guard = match log_guard {
		Some(g) => g,
		None => args
			.logging
			.setup(|v| match v {
				0 => "info",
				1 => "info,oled_diag=debug,rpi_ssd1306_driver=debug",
				2 => "debug",
				3 => "debug,oled_diag=trace,rpi_ssd1306_driver=trace",
				_ => "trace",
			})
			.map_err(|err| miette!("{err}"))?,
	};

	debug!(?args, "got arguments");
	Ok((args, log_guard))
}

#[test]
fn verify_cli() {
	use clap::CommandFactory;
	Args::command().debug_assert()
}
