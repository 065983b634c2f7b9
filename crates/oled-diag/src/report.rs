use crate::console::Tone;

/// The closing summary, as status lines.
///
/// With no errors this only says so; otherwise it gives the count and a troubleshooting
/// checklist pointing at the likely culprits in order.
pub fn summarise(errors: usize, bus: u8) -> Vec<(Tone, String)> {
	if errors == 0 {
		return vec![
			(
				Tone::Success,
				"All commands sent successfully (no I2C errors).".into(),
			),
			(Tone::Plain, String::new()),
			(
				Tone::Plain,
				"If you saw correct output for every visual test above,\nthe OLED hardware is working fine."
					.into(),
			),
		];
	}

	vec![
		(Tone::Alarm, format!("{errors} I2C error(s) detected.")),
		(Tone::Plain, String::new()),
		(Tone::Plain, "Troubleshooting:".into()),
		(
			Tone::Plain,
			format!("1. Check I2C wiring:  sudo i2cdetect -y {bus}"),
		),
		(Tone::Plain, "2. Check ribbon cable / solder joints".into()),
		(
			Tone::Plain,
			"3. If address is detected but display never responds,\n   the OLED is likely burned out"
				.into(),
		),
		(
			Tone::Plain,
			"4. Try lowering I2C speed:\n   Add to /boot/firmware/config.txt:\n     dtparam=i2c_arm_baudrate=50000"
				.into(),
		),
		(
			Tone::Plain,
			"5. If Test 5 (all-pixels-on) showed nothing\n   -> OLED panel is almost certainly damaged"
				.into(),
		),
	]
}
