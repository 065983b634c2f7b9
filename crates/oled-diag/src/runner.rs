use std::time::Duration;

use itertools::Itertools;
use miette::Diagnostic;
use rpi_ssd1306_driver::{
	Bus, Command, DisplaySize, Driver, Result as DriverResult, scan_while,
};
use tracing::{debug, info, instrument, warn};

use crate::{
	console::{Operator, Tone},
	failure::Failure,
	report::summarise,
	visual::VisualTest,
};

/// What to test, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
	pub bus: u8,
	pub address: u8,
	pub size: DisplaySize,
}

impl From<&crate::args::Args> for Settings {
	fn from(args: &crate::args::Args) -> Self {
		Self {
			bus: args.bus,
			address: args.addr,
			size: args.size.into(),
		}
	}
}

/// How far the run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
	Idle,
	BusOpened,
	DeviceFound,
	Initialized,
	VisualTesting,
	Complete,
	Aborted,
}

/// The result of a run that wasn't interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
	pub phase: Phase,
	pub errors: usize,
}

/// Label printed next to well-known addresses found by the scan.
pub fn device_label(address: u8) -> Option<&'static str> {
	match address {
		0x3C | 0x3D => Some("SSD1306 OLED"),
		0x68 => Some("DS1307 RTC"),
		_ => None,
	}
}

/// Drives the diagnostic sequence from start to report.
#[derive(Debug)]
pub struct Runner<'op, O: ?Sized> {
	settings: Settings,
	operator: &'op mut O,
	init_pacing: Duration,
	phase: Phase,
	errors: usize,
}

impl<'op, O: Operator + ?Sized> Runner<'op, O> {
	pub fn new(settings: Settings, operator: &'op mut O) -> Self {
		Self {
			settings,
			operator,
			init_pacing: Duration::from_millis(1),
			phase: Phase::Idle,
			errors: 0,
		}
	}

	/// Change the delay between init sequence writes (1 ms by default).
	pub fn with_init_pacing(mut self, pacing: Duration) -> Self {
		self.init_pacing = pacing;
		self
	}

	/// Run every test, then report.
	///
	/// `open` is given the bus number and opens the bus; it's only called once. Failures are
	/// recorded and reported, and only an operator interrupt makes this return an error. The bus
	/// is released before this returns, either way.
	#[instrument(level = "debug", skip(self, open), fields(settings = ?self.settings))]
	pub fn run<B: Bus>(
		mut self,
		open: impl FnOnce(u8) -> DriverResult<B>,
	) -> Result<Outcome, Failure> {
		let Settings { bus, address, size } = self.settings;
		self.operator.banner(&[
			"OLED Diagnostic Tool".into(),
			format!("Target : I2C bus {bus}, address 0x{address:02X}"),
			format!("Display: SSD1306 {size}"),
		]);

		let Some(mut oled) = self.connect(open)? else {
			self.operator.interrupted()?;
			self.advance(Phase::Aborted);
			self.report();
			return Ok(self.outcome());
		};

		self.operator.status(
			Tone::Notice,
			"The following tests require you to watch the OLED screen.\nAfter each test you will be asked to confirm what you see.",
		);
		self.operator.confirm("Press Enter to begin visual tests...")?;

		self.advance(Phase::VisualTesting);
		for test in VisualTest::ALL {
			self.operator.section(test.title());
			match test.run(&mut oled, self.operator, &self.settings) {
				Ok(()) => {}
				Err(failure) if failure.is_fatal() => return Err(failure),
				Err(failure) => self.record(&failure),
			}
		}

		self.advance(Phase::Complete);
		self.report();
		self.cleanup(&mut oled);
		Ok(self.outcome())
	}

	/// The connection tests: open, scan, basic commands, init.
	///
	/// Returns `None` when one of them failed fatally. An interrupt is checked for between
	/// steps and between scanned addresses.
	fn connect<B: Bus>(
		&mut self,
		open: impl FnOnce(u8) -> DriverResult<B>,
	) -> Result<Option<Driver<B>>, Failure> {
		let Settings { bus, address, size } = self.settings;

		self.operator.section("Test 1: I2C Bus");
		let mut handle = match open(bus) {
			Ok(handle) => handle,
			Err(err) => {
				self.record(&Failure::opening(bus, err));
				return Ok(None);
			}
		};
		self.operator.interrupted()?;
		self.operator
			.status(Tone::Info, &format!("/dev/i2c-{bus} opened successfully"));
		self.advance(Phase::BusOpened);

		self.operator.section("Test 2: I2C Device Scan");
		let mut interrupt = Ok(());
		let found = scan_while(&mut handle, |_| {
			interrupt = self.operator.interrupted();
			interrupt.is_ok()
		});
		interrupt?;

		if found.is_empty() {
			self.record(&Failure::NoDeviceFound);
			return Ok(None);
		}

		self.operator.status(
			Tone::Info,
			&format!(
				"Found {} I2C device(s):\n{}",
				found.len(),
				found
					.iter()
					.map(|&addr| match device_label(addr) {
						Some(label) => format!("0x{addr:02X} <-- {label}"),
						None => format!("0x{addr:02X}"),
					})
					.join("\n")
			),
		);

		if !found.contains(&address) {
			self.record(&Failure::AddressNotPresent { address, bus });
			return Ok(None);
		}
		self.operator.status(
			Tone::Info,
			&format!("Target OLED address 0x{address:02X} detected"),
		);
		self.advance(Phase::DeviceFound);

		let mut oled = Driver::new(handle, address, size).with_init_pacing(self.init_pacing);

		self.operator.section("Test 3: I2C Command Write");
		let basics = [
			(u8::from(Command::DisplayOff), "Display OFF".to_string()),
			(u8::from(Command::SetClockDivider), "Set clock divider".into()),
			(0x80, "clock value".into()),
			(u8::from(Command::SetMultiplexRatio), "Set MUX ratio".into()),
			(
				size.multiplex_ratio(),
				format!("MUX={} ({} rows)", size.multiplex_ratio(), size.height()),
			),
		];

		let mut all_ok = true;
		for (byte, description) in &basics {
			if let Err(err) = oled.command_byte(*byte) {
				self.record(&Failure::transaction(
					format!("Command 0x{byte:02X} ({description})"),
					err,
				));
				all_ok = false;
			}
		}

		self.operator.interrupted()?;
		if !all_ok {
			return Ok(None);
		}
		self.operator.status(
			Tone::Info,
			&format!("All {} basic commands sent without I2C error", basics.len()),
		);

		self.operator
			.section(&format!("Test 4: Full SSD1306 Init ({size})"));
		match oled.init() {
			Ok(written) => self.operator.status(
				Tone::Info,
				&format!("Init sequence sent ({written} commands, no I2C error)"),
			),
			Err(err) => self.record(&Failure::transaction("Init sequence", err)),
		}
		self.operator.interrupted()?;
		self.advance(Phase::Initialized);

		Ok(Some(oled))
	}

	/// Count a failure and tell the operator about it.
	fn record(&mut self, failure: &Failure) {
		self.errors += 1;
		warn!(errors = self.errors, phase = ?self.phase, "{failure}");

		let mut message = failure.to_string();
		if let Some(help) = failure.help() {
			message.push('\n');
			message.push_str(&help.to_string());
		}
		self.operator.status(Tone::Fail, &message);
	}

	fn advance(&mut self, phase: Phase) {
		debug!(from = ?self.phase, to = ?phase, "phase");
		self.phase = phase;
	}

	fn report(&mut self) {
		info!(errors = self.errors, "diagnostic finished");
		self.operator.section("Diagnostic Summary");
		for (tone, line) in summarise(self.errors, self.settings.bus) {
			self.operator.status(tone, &line);
		}
	}

	/// Leave the display blank and off. Failures here aren't counted.
	fn cleanup<B: Bus>(&mut self, oled: &mut Driver<B>) {
		self.operator.status(Tone::Info, "Clearing display...");
		match oled.clear().and_then(|()| oled.display(false)) {
			Ok(()) => self
				.operator
				.status(Tone::Done, "Display cleared and turned off"),
			Err(err) => debug!(%err, "could not clear the display"),
		}
	}

	fn outcome(&self) -> Outcome {
		Outcome {
			phase: self.phase,
			errors: self.errors,
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{cell::Cell, io, rc::Rc};

	use rpi_ssd1306_driver::{Error as DriverError, testing::RecordingBus};

	use super::*;
	use crate::console::scripted::ScriptedOperator;

	fn settings() -> Settings {
		Settings {
			bus: 1,
			address: 0x3C,
			size: DisplaySize::SIZE_128X32,
		}
	}

	fn run_with(bus: RecordingBus, operator: &mut ScriptedOperator) -> Result<Outcome, Failure> {
		Runner::new(settings(), operator)
			.with_init_pacing(Duration::ZERO)
			.run(move |_| Ok(bus))
	}

	#[test]
	fn missing_bus_aborts_with_one_error() {
		let mut operator = ScriptedOperator::default();
		let outcome = Runner::new(settings(), &mut operator)
			.run(|bus| Err::<RecordingBus, _>(DriverError::BusUnavailable { bus }))
			.unwrap();

		assert_eq!(
			outcome,
			Outcome {
				phase: Phase::Aborted,
				errors: 1
			}
		);
		assert_eq!(
			operator.sections,
			vec!["Test 1: I2C Bus", "Diagnostic Summary"]
		);
		assert!(operator.said("/dev/i2c-1 does not exist."));
		assert!(operator.said("raspi-config"));
		assert!(operator.said("1 I2C error(s) detected."));
		assert!(operator.prompts.is_empty());
	}

	#[test]
	fn permission_denied_is_reported() {
		let mut operator = ScriptedOperator::default();
		let outcome = Runner::new(settings(), &mut operator)
			.run(|bus| Err::<RecordingBus, _>(DriverError::PermissionDenied { bus }))
			.unwrap();
		assert_eq!(outcome.errors, 1);
		assert!(operator.said("sudo usermod -aG i2c"));
	}

	#[test]
	fn empty_bus_aborts_at_scan() {
		let mut operator = ScriptedOperator::default();
		let outcome = run_with(RecordingBus::default(), &mut operator).unwrap();
		assert_eq!(outcome.phase, Phase::Aborted);
		assert_eq!(outcome.errors, 1);
		assert!(operator.said("No I2C devices found!"));
		assert_eq!(operator.sections.len(), 3);
	}

	#[test]
	fn missing_target_aborts_at_scan() {
		let mut operator = ScriptedOperator::default();
		let outcome = run_with(RecordingBus::with_devices([0x68]), &mut operator).unwrap();
		assert_eq!(outcome.phase, Phase::Aborted);
		assert_eq!(outcome.errors, 1);
		assert!(operator.said("0x68 <-- DS1307 RTC"));
		assert!(operator.said("Target address 0x3C NOT found!"));
		assert!(operator.said("sudo i2cdetect -y 1"));
	}

	#[test]
	fn found_target_proceeds_to_command_write() {
		let mut operator = ScriptedOperator::default();
		let mut recorded = RecordingBus::with_devices([0x3C, 0x68]);
		let outcome = Runner::new(settings(), &mut operator)
			.with_init_pacing(Duration::ZERO)
			.run(|_| Ok(&mut recorded))
			.unwrap();

		assert_eq!(
			outcome,
			Outcome {
				phase: Phase::Complete,
				errors: 0
			}
		);
		assert!(operator.said("Found 2 I2C device(s):\n0x3C <-- SSD1306 OLED\n0x68 <-- DS1307 RTC"));
		assert!(operator.sections.contains(&"Test 3: I2C Command Write".to_string()));
		assert_eq!(
			&recorded.commands()[..5],
			&[0xAE, 0xD5, 0x80, 0xA8, 0x1F]
		);
		assert!(operator.said("All commands sent successfully"));
		assert!(operator.said("Display cleared and turned off"));
		// begin, then one per visual test
		assert_eq!(operator.prompts.len(), 1 + VisualTest::ALL.len());
		assert_eq!(operator.sections.len(), 4 + VisualTest::ALL.len() + 1);
	}

	#[test]
	fn cleanup_leaves_the_display_off() {
		let mut operator = ScriptedOperator::default();
		let mut recorded = RecordingBus::with_devices([0x3C]);
		Runner::new(settings(), &mut operator)
			.with_init_pacing(Duration::ZERO)
			.run(|_| Ok(&mut recorded))
			.unwrap();
		assert_eq!(recorded.commands().last(), Some(&0xAE));
		let blocks = recorded.blocks();
		assert!(blocks[blocks.len() - 4..].iter().all(|block| block[1..].iter().all(|&b| b == 0)));
	}

	#[test]
	fn basic_command_failures_are_all_counted() {
		let mut operator = ScriptedOperator::default();
		let outcome = run_with(
			RecordingBus::with_devices([0x3C]).fail_on([1, 3]),
			&mut operator,
		)
		.unwrap();
		assert_eq!(
			outcome,
			Outcome {
				phase: Phase::Aborted,
				errors: 2
			}
		);
		assert!(operator.said("Command 0xD5 (Set clock divider) failed"));
		assert!(operator.said("Command 0xA8 (Set MUX ratio) failed"));
		assert!(!operator.sections.iter().any(|s| s.starts_with("Test 4")));
	}

	#[test]
	fn init_failure_is_not_fatal() {
		let mut operator = ScriptedOperator::default();
		// writes 0..5 are the basic commands, 5.. the init sequence
		let outcome = run_with(
			RecordingBus::with_devices([0x3C]).fail_on([7]),
			&mut operator,
		)
		.unwrap();
		assert_eq!(
			outcome,
			Outcome {
				phase: Phase::Complete,
				errors: 1
			}
		);
		assert!(operator.said("Init sequence failed"));
	}

	#[test]
	fn visual_failures_count_once_and_continue() {
		let mut operator = ScriptedOperator::default();
		// 5 basic commands and 25 init bytes come first
		let outcome = run_with(
			RecordingBus::with_devices([0x3C]).fail_on([30]),
			&mut operator,
		)
		.unwrap();
		assert_eq!(
			outcome,
			Outcome {
				phase: Phase::Complete,
				errors: 1
			}
		);
		assert!(operator.said("All-pixels-on failed"));
		// the failed test never asks; every other one does, plus the start prompt
		assert_eq!(operator.prompts.len(), VisualTest::ALL.len());
		assert_eq!(operator.sections.len(), 4 + VisualTest::ALL.len() + 1);
	}

	#[test]
	fn errors_equal_induced_failures() {
		// init stops at 6; all-pixels-on stops at its first write (7); clear writes page 0
		// (8..=11) then stops at page 1 (12)
		let failures = [6, 7, 12];
		let mut operator = ScriptedOperator::default();
		let outcome = run_with(
			RecordingBus::with_devices([0x3C]).fail_on(failures),
			&mut operator,
		)
		.unwrap();
		assert_eq!(
			outcome,
			Outcome {
				phase: Phase::Complete,
				errors: failures.len()
			}
		);
		assert_eq!(operator.count(Tone::Fail), failures.len());
		assert!(operator.said("Init sequence failed"));
		assert!(operator.said("All-pixels-on failed"));
		assert!(operator.said("Clear screen failed"));
	}

	#[test]
	fn interrupt_escapes_the_runner() {
		let mut operator = ScriptedOperator {
			interrupt_at_prompt: Some(2),
			..Default::default()
		};
		let result = run_with(RecordingBus::with_devices([0x3C]), &mut operator);
		assert!(matches!(result, Err(Failure::Interrupted)));
		assert!(!operator.sections.contains(&"Diagnostic Summary".to_string()));
	}

	#[test]
	fn interrupt_before_visual_tests() {
		let mut operator = ScriptedOperator {
			interrupt_at_prompt: Some(0),
			..Default::default()
		};
		let result = run_with(RecordingBus::with_devices([0x3C]), &mut operator);
		assert!(matches!(result, Err(Failure::Interrupted)));
		assert!(!operator.sections.iter().any(|s| s.starts_with("Test 5")));
	}

	#[test]
	fn pending_interrupt_beats_the_abort_report() {
		let mut operator = ScriptedOperator {
			interrupt_at_check: Some(0),
			..Default::default()
		};
		let result = Runner::new(settings(), &mut operator)
			.run(|bus| Err::<RecordingBus, _>(DriverError::BusUnavailable { bus }));
		assert!(matches!(result, Err(Failure::Interrupted)));
		assert!(!operator.sections.contains(&"Diagnostic Summary".to_string()));
	}

	#[test]
	fn interrupt_after_opening_the_bus() {
		let mut operator = ScriptedOperator {
			interrupt_at_check: Some(0),
			..Default::default()
		};
		let result = run_with(RecordingBus::with_devices([0x3C]), &mut operator);
		assert!(matches!(result, Err(Failure::Interrupted)));
		assert_eq!(operator.sections, vec!["Test 1: I2C Bus"]);
		assert_eq!(operator.count(Tone::Fail), 0);
	}

	#[test]
	fn interrupt_stops_the_scan() {
		let mut operator = ScriptedOperator {
			interrupt_at_check: Some(5),
			..Default::default()
		};
		let result = run_with(RecordingBus::default(), &mut operator);
		assert!(matches!(result, Err(Failure::Interrupted)));
		// one check after opening, then one per address until the interrupt
		assert_eq!(operator.checks, 6);
		assert!(!operator.said("No I2C devices found!"));
		assert!(!operator.sections.contains(&"Diagnostic Summary".to_string()));
	}

	#[test]
	fn interrupt_during_init() {
		let mut operator = ScriptedOperator {
			// after opening, 117 scanned addresses, and the basic commands
			interrupt_at_check: Some(1 + 117 + 1),
			..Default::default()
		};
		let result = run_with(RecordingBus::with_devices([0x3C]), &mut operator);
		assert!(matches!(result, Err(Failure::Interrupted)));
		assert!(operator.sections.iter().any(|s| s.starts_with("Test 4")));
		assert!(operator.prompts.is_empty());
	}

	#[test]
	fn bus_is_released_on_interrupt() {
		struct Watched {
			inner: RecordingBus,
			dropped: Rc<Cell<bool>>,
		}

		impl Bus for Watched {
			fn probe(&mut self, address: u8) -> bool {
				self.inner.probe(address)
			}

			fn write_register(&mut self, address: u8, register: u8, byte: u8) -> DriverResult<()> {
				self.inner.write_register(address, register, byte)
			}

			fn write_block(&mut self, address: u8, bytes: &[u8]) -> DriverResult<()> {
				self.inner.write_block(address, bytes)
			}
		}

		impl Drop for Watched {
			fn drop(&mut self) {
				self.dropped.set(true);
			}
		}

		let dropped = Rc::new(Cell::new(false));
		let bus = Watched {
			inner: RecordingBus::with_devices([0x3C]),
			dropped: dropped.clone(),
		};

		let mut operator = ScriptedOperator {
			interrupt_at_prompt: Some(1),
			..Default::default()
		};
		let result = Runner::new(settings(), &mut operator)
			.with_init_pacing(Duration::ZERO)
			.run(move |_| Ok(bus));
		assert!(matches!(result, Err(Failure::Interrupted)));
		assert!(dropped.get());
	}

	#[test]
	fn open_errors_keep_their_cause() {
		let mut operator = ScriptedOperator::default();
		let outcome = Runner::new(settings(), &mut operator)
			.run(|bus| {
				Err::<RecordingBus, _>(DriverError::Open {
					bus,
					source: io::Error::other("device busy"),
				})
			})
			.unwrap();
		assert_eq!(outcome.errors, 1);
		assert!(operator.said("Could not open /dev/i2c-1: device busy"));
	}

	#[test]
	fn labels() {
		assert_eq!(device_label(0x3C), Some("SSD1306 OLED"));
		assert_eq!(device_label(0x3D), Some("SSD1306 OLED"));
		assert_eq!(device_label(0x68), Some("DS1307 RTC"));
		assert_eq!(device_label(0x20), None);
	}
}
