//! A Raspberry Pi driver for SSD1306-based monochrome OLED displays.
//!
//! This crate provides a small, explicit interface for talking to an [SSD1306][datasheet]
//! controller over I2C: named commands, the power-on initialisation sequence, page-by-page GDDRAM
//! writes, and a monochrome [`Framebuffer`] that implements [`embedded_graphics`]' traits and
//! packs itself into the controller's page/column layout.
//!
//! The bus is abstracted behind the [`Bus`] trait. On Linux, [`I2cBus`] talks to `/dev/i2c-N`.
//!
//! [datasheet]: https://cdn-shop.adafruit.com/datasheets/SSD1306.pdf
//!
//! # Example
//!
//! ```no_run
//! # use embedded_graphics::{pixelcolor::BinaryColor, prelude::*, primitives::*};
//! # use rpi_ssd1306_driver::{DisplaySize, Driver, Framebuffer, I2cBus, Result};
//! # fn main() -> Result<()> {
//! let bus = I2cBus::open(1)?;
//! let mut oled = Driver::new(bus, 0x3C, DisplaySize::SIZE_128X32);
//! oled.init()?;
//!
//! let mut image = Framebuffer::new(oled.size());
//! Rectangle::new(Point::zero(), Size::new(128, 32))
//!     .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
//!     .draw(&mut image)
//!     .ok();
//! oled.print(&image)?;
//! # Ok(()) }
//! ```

#[doc(inline)]
pub use buffer::*;

#[doc(inline)]
pub use bus::*;

#[doc(inline)]
pub use commands::{Command, InitStep, init_sequence};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use helpers::*;

#[doc(inline)]
pub use io::*;

mod buffer;
mod bus;
mod commands;
mod error;
mod graphics;
mod helpers;
mod io;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
