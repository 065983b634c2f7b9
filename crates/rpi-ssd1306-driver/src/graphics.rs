use std::convert::Infallible;

use embedded_graphics::{
	Pixel,
	draw_target::DrawTarget,
	geometry::{OriginDimensions, Size},
	pixelcolor::BinaryColor,
};
use tracing::{instrument, trace};

use crate::{
	buffer::Framebuffer,
	bus::Bus,
	error::Result,
	helpers::PAGE_HEIGHT,
	io::Driver,
};

impl OriginDimensions for Framebuffer {
	fn size(&self) -> Size {
		let size = Framebuffer::size(self);
		Size::new(size.width().into(), size.height().into())
	}
}

impl DrawTarget for Framebuffer {
	type Color = BinaryColor;
	type Error = Infallible;

	fn draw_iter<I>(&mut self, pixels: I) -> std::result::Result<(), Self::Error>
	where
		I: IntoIterator<Item = Pixel<Self::Color>>,
	{
		let size = Framebuffer::size(self);
		for Pixel(coord, color) in pixels.into_iter() {
			let Ok(x) = u16::try_from(coord.x) else {
				continue;
			};
			let Ok(y) = u16::try_from(coord.y) else {
				continue;
			};

			if x >= size.width() || y >= size.height() {
				continue;
			}

			self.set(x, y, color.is_on());
		}

		Ok(())
	}

	fn clear(&mut self, color: Self::Color) -> std::result::Result<(), Self::Error> {
		self.fill(color.is_on());
		Ok(())
	}
}

impl<B: Bus> Driver<B> {
	/// Write a whole image to the display, page by page.
	#[instrument(level = "debug", skip(self, image))]
	pub fn print(&mut self, image: &Framebuffer) -> Result<()> {
		let packed = image.pack();
		let width = usize::from(self.size().width());
		trace!(
			bytes = packed.len(),
			pages = packed.len() / width,
			rows_per_page = PAGE_HEIGHT,
			"packed image"
		);

		for (page, data) in packed.chunks(width).enumerate() {
			self.write_page(page as u8, data)?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use embedded_graphics::{
		prelude::*,
		primitives::{PrimitiveStyle, Rectangle},
	};

	use super::*;
	use crate::{helpers::DisplaySize, testing::RecordingBus};

	#[test]
	fn border_rectangle() {
		let mut image = Framebuffer::new(DisplaySize::SIZE_128X32);
		let Ok(()) = Rectangle::new(Point::zero(), Size::new(128, 32))
			.into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
			.draw(&mut image);

		assert!(image.get(0, 0));
		assert!(image.get(127, 31));
		assert!(image.get(64, 0));
		assert!(!image.get(64, 16));
		assert_eq!(image.lit(), 2 * 128 + 2 * 30);

		let packed = image.pack();
		assert_eq!(packed[0], 0xFF); // left edge, page 0
		assert_eq!(packed[1], 0x01); // top edge only
		assert_eq!(packed[3 * 128 + 1], 0x80); // bottom edge only
	}

	#[test]
	fn offscreen_pixels_are_ignored() {
		let mut image = Framebuffer::new(DisplaySize::SIZE_128X32);
		let Ok(()) = image.draw_iter([
			Pixel(Point::new(-1, 0), BinaryColor::On),
			Pixel(Point::new(0, 32), BinaryColor::On),
			Pixel(Point::new(128, 0), BinaryColor::On),
			Pixel(Point::new(3, 3), BinaryColor::On),
		]);
		assert_eq!(image.lit(), 1);
	}

	#[test]
	fn print_writes_every_page() {
		let mut image = Framebuffer::new(DisplaySize::SIZE_128X32);
		let Ok(()) = image.clear(BinaryColor::On);

		let mut driver = Driver::new(
			RecordingBus::with_devices([0x3C]),
			0x3C,
			DisplaySize::SIZE_128X32,
		);
		driver.print(&image).unwrap();

		let bus = driver.into_inner();
		assert_eq!(
			bus.commands(),
			vec![
				0xB0, 0x00, 0x10, 0xB1, 0x00, 0x10, 0xB2, 0x00, 0x10, 0xB3, 0x00, 0x10
			]
		);
		let blocks = bus.blocks();
		assert_eq!(blocks.len(), 4);
		for block in blocks {
			assert_eq!(block.len(), 129);
			assert_eq!(block[0], 0x40);
			assert!(block[1..].iter().all(|&b| b == 0xFF));
		}
	}
}
