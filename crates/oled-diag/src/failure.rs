use miette::Diagnostic;
use rpi_ssd1306_driver::Error as DriverError;
use thiserror::Error;

/// Everything that can go wrong during a diagnostic run.
///
/// Each recorded failure counts once towards the error total. Whether it ends the run depends on
/// the phase it happens in, see [`Failure::is_fatal`].
#[derive(Debug, Error, Diagnostic)]
pub enum Failure {
	#[error("/dev/i2c-{bus} does not exist.")]
	#[diagnostic(help(
		"Enable I2C: sudo raspi-config > Interface > I2C\nOr check /boot/firmware/config.txt has dtparam=i2c_arm=on"
	))]
	BusUnavailable { bus: u8 },

	#[error("Permission denied on /dev/i2c-{bus}.")]
	#[diagnostic(help("Run with sudo, or: sudo usermod -aG i2c $USER"))]
	PermissionDenied { bus: u8 },

	#[error("Could not open /dev/i2c-{bus}: {source}")]
	#[diagnostic(help("Check that the i2c-dev kernel module is loaded: sudo modprobe i2c-dev"))]
	BusOpen {
		bus: u8,
		#[source]
		source: std::io::Error,
	},

	#[error("No I2C devices found!  Check wiring / solder joints.")]
	NoDeviceFound,

	#[error("Target address {address:#04X} NOT found!")]
	#[diagnostic(help(
		"OLED may be disconnected, mis-addressed, or dead.\nTry: sudo i2cdetect -y {bus}"
	))]
	AddressNotPresent { address: u8, bus: u8 },

	#[error("{step} failed: {source}")]
	TransactionFailed {
		step: String,
		#[source]
		source: DriverError,
	},

	#[error("Interrupted by user")]
	Interrupted,
}

impl Failure {
	/// Classify a bus-open error.
	pub fn opening(bus: u8, err: DriverError) -> Self {
		match err {
			DriverError::BusUnavailable { .. } => Self::BusUnavailable { bus },
			DriverError::PermissionDenied { .. } => Self::PermissionDenied { bus },
			DriverError::Open { source, .. } => Self::BusOpen { bus, source },
			other => Self::BusOpen {
				bus,
				source: std::io::Error::other(other),
			},
		}
	}

	/// A rejected transaction during the named step.
	pub fn transaction(step: impl Into<String>, source: DriverError) -> Self {
		Self::TransactionFailed {
			step: step.into(),
			source,
		}
	}

	/// Whether this ends the diagnostic no matter which phase it happens in.
	///
	/// Transaction failures are only fatal during the connection tests, which decide that
	/// themselves.
	pub fn is_fatal(&self) -> bool {
		!matches!(self, Self::TransactionFailed { .. })
	}
}
