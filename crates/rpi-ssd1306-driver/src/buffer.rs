use bitvec::vec::BitVec;
use itertools::iproduct;
use tracing::instrument;

use crate::helpers::{DisplaySize, PAGE_HEIGHT};

/// Where the top row of a page goes within each packed byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BitOrder {
	/// The top row is bit 0.
	///
	/// This is the SSD1306 GDDRAM layout: D0 drives the first COM line of the page.
	#[default]
	LsbTop,

	/// The top row is bit 7.
	MsbTop,
}

impl BitOrder {
	fn mask(self, row: u16) -> u8 {
		match self {
			Self::LsbTop => 1 << row,
			Self::MsbTop => 0x80 >> row,
		}
	}
}

/// Monochrome image buffer, one bit per pixel, row-major.
///
/// Draw into it with [`embedded_graphics`], then [`pack()`](Framebuffer::pack) it into the
/// controller's layout, or hand it straight to [`Driver::print()`](crate::Driver::print).
#[derive(Debug, Clone)]
pub struct Framebuffer {
	size: DisplaySize,
	data: BitVec,
}

impl Framebuffer {
	/// A blank (all off) buffer covering the whole panel.
	pub fn new(size: DisplaySize) -> Self {
		let len = size.width() as usize * size.height() as usize;
		let mut data = BitVec::with_capacity(len);
		data.resize(len, false);
		Self { size, data }
	}

	pub fn size(&self) -> DisplaySize {
		self.size
	}

	fn index(&self, x: u16, y: u16) -> usize {
		y as usize * self.size.width() as usize + x as usize
	}

	/// Set a pixel on (true) or off (false).
	///
	/// # Panics
	///
	/// Panics if the coordinates are out of bounds.
	pub fn set(&mut self, x: u16, y: u16, on: bool) {
		assert!(x < self.size.width() && y < self.size.height(), "pixel out of bounds");
		let idx = self.index(x, y);
		self.data.set(idx, on);
	}

	/// Get a pixel.
	///
	/// # Panics
	///
	/// Panics if the coordinates are out of bounds.
	pub fn get(&self, x: u16, y: u16) -> bool {
		assert!(x < self.size.width() && y < self.size.height(), "pixel out of bounds");
		self.data[self.index(x, y)]
	}

	/// Fill with a single value.
	pub fn fill(&mut self, on: bool) {
		self.data.fill(on);
	}

	/// Number of lit pixels.
	pub fn lit(&self) -> usize {
		self.data.count_ones()
	}

	/// Pack into GDDRAM layout: see [`pack_with()`](Framebuffer::pack_with).
	pub fn pack(&self) -> Vec<u8> {
		self.pack_with(BitOrder::default())
	}

	/// Pack into page/column layout.
	///
	/// For each page of 8 rows, for each column, one byte holds that column's 8 pixels, placed
	/// according to `order`. The result is `pages × width` bytes, page after page, so
	/// `chunks(width)` yields one page each.
	#[instrument(level = "trace", skip(self))]
	pub fn pack_with(&self, order: BitOrder) -> Vec<u8> {
		let width = self.size.width();
		iproduct!(0..self.size.pages() as u16, 0..width)
			.map(|(page, x)| {
				(0..PAGE_HEIGHT)
					.filter(|row| self.get(x, page * PAGE_HEIGHT + row))
					.fold(0_u8, |byte, row| byte | order.mask(row))
			})
			.collect()
	}
}
