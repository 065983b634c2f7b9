//! The tests that need someone looking at the screen.

use std::time::Duration;

use embedded_graphics::{
	mono_font::{MonoTextStyle, ascii::FONT_6X9},
	pixelcolor::BinaryColor,
	prelude::*,
	primitives::{PrimitiveStyle, Rectangle},
	text::{Baseline, Text},
};
use rpi_ssd1306_driver::{Bus, Driver, Error as DriverError, Framebuffer};

use crate::{
	console::{Operator, Tone},
	failure::Failure,
	runner::Settings,
};

/// One visual test.
///
/// A test stops at its first failed transaction; the runner records it and moves on to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualTest {
	AllPixelsOn,
	Clear,
	Checkerboard,
	ContrastSweep,
	Invert,
	TextRender,
	Blink,
}

impl VisualTest {
	/// Every visual test, in the order they run.
	pub const ALL: [Self; 7] = [
		Self::AllPixelsOn,
		Self::Clear,
		Self::Checkerboard,
		Self::ContrastSweep,
		Self::Invert,
		Self::TextRender,
		Self::Blink,
	];

	pub fn title(self) -> &'static str {
		match self {
			Self::AllPixelsOn => "Test 5: Hardware All-Pixels-On  *** KEY TEST ***",
			Self::Clear => "Test 6: Clear Screen (all black)",
			Self::Checkerboard => "Test 7: Checkerboard Pattern",
			Self::ContrastSweep => "Test 8: Contrast Sweep",
			Self::Invert => "Test 9: Display Invert",
			Self::TextRender => "Test 10: Text Rendering",
			Self::Blink => "Test 11: Display ON / OFF Toggle",
		}
	}

	/// Name used when a transaction fails.
	pub fn step(self) -> &'static str {
		match self {
			Self::AllPixelsOn => "All-pixels-on",
			Self::Clear => "Clear screen",
			Self::Checkerboard => "Checkerboard test",
			Self::ContrastSweep => "Contrast sweep",
			Self::Invert => "Invert test",
			Self::TextRender => "Text render write",
			Self::Blink => "ON/OFF test",
		}
	}

	fn briefing(self) -> &'static [&'static str] {
		match self {
			Self::AllPixelsOn => &[
				"Sends SSD1306 command 0xA5 -- lights every pixel",
				"Does NOT depend on GDDRAM; driven directly by the chip",
				"==> LOOK AT THE SCREEN: should be completely WHITE <==",
			],
			Self::Clear => &[
				"Writing 0x00 to all GDDRAM -- screen should be BLACK",
				"==> LOOK AT THE SCREEN: should be completely BLACK <==",
			],
			Self::Checkerboard => &[
				"Alternating 0xAA / 0x55 -- should show an even grid",
				"==> LOOK AT THE SCREEN: should show a fine checkerboard <==",
			],
			Self::ContrastSweep => &[
				"Sweeping contrast 0 -> 255 -> 0",
				"==> LOOK AT THE SCREEN: brightness should ramp up then down <==",
			],
			Self::Invert => &[
				"Toggling normal / inverted 4 times",
				"==> LOOK AT THE SCREEN: black and white should swap <==",
			],
			Self::TextRender => &["Drawing a border and three lines of text"],
			Self::Blink => &[
				"Toggling display power 3 times",
				"==> LOOK AT THE SCREEN: should blink on and off <==",
			],
		}
	}

	/// Run the test: brief the operator, drive the display, and wait for confirmation.
	pub fn run<B: Bus, O: Operator + ?Sized>(
		self,
		oled: &mut Driver<B>,
		operator: &mut O,
		settings: &Settings,
	) -> Result<(), Failure> {
		for line in self.briefing() {
			operator.status(Tone::Info, line);
		}

		let failed = move |err: DriverError| Failure::transaction(self.step(), err);

		match self {
			Self::AllPixelsOn => {
				oled.display(true).map_err(failed)?;
				operator.hold(Duration::from_millis(10))?;
				oled.entire_display(true).map_err(failed)?;
				operator.status(Tone::Done, "All-pixels-on command sent");
				operator.confirm("Is the screen fully white?  Press Enter...")?;
				oled.entire_display(false).map_err(failed)?;
			}
			Self::Clear => {
				oled.clear().map_err(failed)?;
				operator.status(Tone::Done, "Clear-screen data sent");
				operator.confirm("Is the screen fully black?  Press Enter...")?;
			}
			Self::Checkerboard => {
				oled.fill(checkerboard).map_err(failed)?;
				operator.status(Tone::Done, "Checkerboard data sent");
				operator.confirm("Do you see an even checkerboard?  Press Enter...")?;
			}
			Self::ContrastSweep => {
				oled.entire_display(true).map_err(failed)?;
				operator.hold(Duration::from_millis(300))?;
				for level in contrast_ramp() {
					oled.contrast(level).map_err(failed)?;
					operator.hold(Duration::from_millis(80))?;
				}

				oled.contrast(settings.size.default_contrast())
					.map_err(failed)?;
				oled.entire_display(false).map_err(failed)?;
				operator.status(Tone::Done, "Contrast sweep complete");
				operator.confirm("Did brightness change visibly?  Press Enter...")?;
			}
			Self::Invert => {
				for _ in 0..4 {
					oled.invert(true).map_err(failed)?;
					operator.hold(Duration::from_millis(500))?;
					oled.invert(false).map_err(failed)?;
					operator.hold(Duration::from_millis(500))?;
				}

				operator.status(Tone::Done, "Invert toggle complete");
				operator.confirm("Did colours alternate?  Press Enter...")?;
			}
			Self::TextRender => {
				oled.print(&test_card(settings)).map_err(failed)?;
				operator.status(Tone::Done, "Text rendered and written to display");
				operator.status(Tone::Info, "Expected on screen:");
				for line in expected_screen(settings) {
					operator.status(Tone::Info, &line);
				}
				operator.confirm("Can you read the text clearly?  Press Enter...")?;
			}
			Self::Blink => {
				for _ in 0..3 {
					oled.display(false).map_err(failed)?;
					operator.hold(Duration::from_millis(800))?;
					oled.display(true).map_err(failed)?;
					operator.hold(Duration::from_millis(800))?;
				}

				operator.status(Tone::Done, "ON/OFF toggle complete");
				operator.confirm("Did the screen blink on and off?  Press Enter...")?;
			}
		}

		Ok(())
	}
}

/// Checkerboard byte for a GDDRAM cell.
pub fn checkerboard(page: u8, column: u16) -> u8 {
	if (column + u16::from(page)) % 2 == 0 {
		0xAA
	} else {
		0x55
	}
}

/// Contrast levels for the sweep: up from 0, then down from 255, in steps of 8.
pub fn contrast_ramp() -> impl Iterator<Item = u8> {
	(0..=u8::MAX)
		.step_by(8)
		.chain((0..=u8::MAX).rev().step_by(8))
}

/// The text lines drawn by the text rendering test.
pub fn card_lines(settings: &Settings) -> [String; 3] {
	[
		"OLED TEST OK!".into(),
		format!("{} SSD1306", settings.size),
		format!("addr=0x{:02X} bus={}", settings.address, settings.bus),
	]
}

/// Draw the text rendering test's image: a one-pixel border and [`card_lines`].
pub fn test_card(settings: &Settings) -> Framebuffer {
	let mut image = Framebuffer::new(settings.size);

	let Ok(()) = Rectangle::new(
		Point::zero(),
		Size::new(
			settings.size.width().into(),
			settings.size.height().into(),
		),
	)
	.into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
	.draw(&mut image);

	let style = MonoTextStyle::new(&FONT_6X9, BinaryColor::On);
	for (line, y) in card_lines(settings).iter().zip([2, 12, 22]) {
		let Ok(_) = Text::with_baseline(line, Point::new(4, y), style, Baseline::Top).draw(&mut image);
	}

	image
}

fn expected_screen(settings: &Settings) -> Vec<String> {
	let rule = format!("    +{}+", "-".repeat(22));
	let mut lines = vec![rule.clone()];
	lines.extend(
		card_lines(settings)
			.iter()
			.map(|line| format!("    | {line:<20} |")),
	);
	lines.push(rule);
	lines
}
