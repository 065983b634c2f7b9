//! Step-by-step hardware diagnostic for SSD1306 OLED displays on I2C.
//!
//! The connection tests (bus, scan, basic commands, init) stop the run when they fail; the visual
//! tests that follow always all run, each waiting for the operator to confirm what's on screen.

use miette::Result;
use tracing::info;

pub use crate::args::{Args, get_args as args};
pub use crate::runner::{Outcome, Phase, Runner, Settings};

pub(crate) mod args;
pub mod console;
pub mod failure;
pub mod report;
pub mod runner;
pub mod visual;

/// Run the diagnostic against the real bus.
///
/// Diagnostic failures are reported on the console and don't make this fail; an operator
/// interrupt does.
#[cfg(target_os = "linux")]
pub fn run(args: Args) -> Result<()> {
	use rpi_ssd1306_driver::I2cBus;

	let settings = Settings::from(&args);
	let mut terminal = console::Terminal::new()?;
	let outcome = Runner::new(settings, &mut terminal).run(I2cBus::open)?;
	info!(phase = ?outcome.phase, errors = outcome.errors, "done");
	Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn run(args: Args) -> Result<()> {
	info!(bus = args.bus, "no i2c support on this platform");
	miette::bail!("oled-diag needs Linux's /dev/i2c-N devices")
}
