#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> miette::Result<()> {
	let (args, _guard) = oled_diag::args()?;
	oled_diag::run(args)
}
