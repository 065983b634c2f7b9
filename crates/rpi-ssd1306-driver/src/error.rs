/// Error type for driver operations.
#[derive(Debug, thiserror::Error)]
#[cfg_attr(feature = "miette", derive(miette::Diagnostic))]
pub enum Error {
	/// The bus device node doesn't exist.
	#[error("/dev/i2c-{bus} does not exist")]
	#[cfg_attr(
		feature = "miette",
		diagnostic(help("enable I2C with raspi-config, or set dtparam=i2c_arm=on"))
	)]
	BusUnavailable { bus: u8 },

	/// The bus device node exists but can't be opened by this user.
	#[error("permission denied on /dev/i2c-{bus}")]
	#[cfg_attr(
		feature = "miette",
		diagnostic(help("run with sudo, or add the user to the i2c group"))
	)]
	PermissionDenied { bus: u8 },

	/// The bus device node couldn't be opened for another reason.
	#[error("failed to open /dev/i2c-{bus}")]
	Open {
		bus: u8,
		#[source]
		source: std::io::Error,
	},

	/// A transfer was rejected on the bus (typically a NACK).
	#[error("I2C transaction failed: {0}")]
	#[cfg_attr(
		feature = "miette",
		diagnostic(help("check wiring, or lower the bus speed"))
	)]
	Transaction(#[source] std::io::Error),

	/// A page write didn't match the display width.
	#[error("page {page} is {len} bytes long, but the display is {width} columns wide")]
	PageLength { page: u8, len: usize, width: u16 },

	/// The requested display geometry isn't supported by the controller.
	#[error("unsupported display size {width}x{height}")]
	#[cfg_attr(
		feature = "miette",
		diagnostic(help("height must be a multiple of 8, between 8 and 64"))
	)]
	Geometry { width: u16, height: u16 },
}

/// Convenience type for Results in this crate.
pub type Result<T> = std::result::Result<T, Error>;
