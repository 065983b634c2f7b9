//! Operator-facing console: status lines, section titles, and confirmation prompts.
//!
//! The human report goes to stdout; diagnostic logging goes through `tracing` to stderr.

use std::{
	io::{self, BufRead, IsTerminal, Write},
	sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
	thread,
	time::{Duration, Instant},
};

use crossterm::style::{Color, Stylize};
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing::{debug, trace};

use crate::failure::Failure;

/// Width of section rules.
pub const RULE_WIDTH: usize = 60;

/// Colours used in the report.
pub struct Colors;

impl Colors {
	/// Status tags (DONE, info)
	pub const STATUS: Color = Color::Cyan;

	/// FAIL tags and the error summary
	pub const ERROR: Color = Color::Red;

	/// Notices and prompts
	pub const WARNING: Color = Color::Yellow;

	/// Clean summary
	pub const SUCCESS: Color = Color::Green;
}

/// What kind of line to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
	/// An action completed: `DONE` tag.
	Done,
	/// A failure was recorded: `FAIL` tag.
	Fail,
	/// Information: `info` tag.
	Info,
	/// Something the operator should pay attention to.
	Notice,
	/// Headline of a clean report.
	Success,
	/// Headline of a report with errors.
	Alarm,
	/// Untagged, indented text.
	Plain,
}

/// The human side of the diagnostic.
///
/// The runner only ever talks to the operator through this, so tests can script the operator.
pub trait Operator {
	/// Print the run's opening banner.
	fn banner(&mut self, lines: &[String]);

	/// Start a new section.
	fn section(&mut self, title: &str);

	/// Print a status line. Continuation lines (after `\n`) are indented under the message.
	fn status(&mut self, tone: Tone, message: &str);

	/// Block until the operator confirms.
	///
	/// There is no timeout. Fails only with [`Failure::Interrupted`].
	fn confirm(&mut self, prompt: &str) -> std::result::Result<(), Failure>;

	/// Check, without waiting, whether the operator has interrupted the run.
	///
	/// Fails only with [`Failure::Interrupted`].
	fn interrupted(&mut self) -> std::result::Result<(), Failure>;

	/// Let the hardware (and the operator's eyes) catch up.
	///
	/// Fails only with [`Failure::Interrupted`], as soon as an interrupt arrives.
	fn hold(&mut self, duration: Duration) -> std::result::Result<(), Failure>;
}

fn paint(text: &str, colour: Color, colours: bool) -> String {
	if colours {
		format!("{}", text.with(colour))
	} else {
		text.to_string()
	}
}

fn bold(text: &str, colours: bool) -> String {
	if colours {
		format!("{}", text.bold())
	} else {
		text.to_string()
	}
}

fn paint_bold(text: &str, colour: Color, colours: bool) -> String {
	if colours {
		format!("{}", text.with(colour).bold())
	} else {
		text.to_string()
	}
}

/// Render a status line.
pub fn format_status(tone: Tone, message: &str, colours: bool) -> String {
	if message.is_empty() {
		return String::new();
	}

	let mut lines = message.lines();
	let first = lines.next().unwrap_or_default();

	let (mut out, indent) = match tone {
		Tone::Done => (
			format!("  {}  {first}", paint("  DONE", Colors::STATUS, colours)),
			10,
		),
		Tone::Fail => (
			format!("  {}  {first}", paint("  FAIL", Colors::ERROR, colours)),
			10,
		),
		Tone::Info => (
			format!("  {}  {first}", paint("  info", Colors::STATUS, colours)),
			10,
		),
		Tone::Notice => (format!("  {}", paint(first, Colors::WARNING, colours)), 2),
		Tone::Success => (
			format!("  {}", paint_bold(first, Colors::SUCCESS, colours)),
			2,
		),
		Tone::Alarm => (
			format!("  {}", paint_bold(first, Colors::ERROR, colours)),
			2,
		),
		Tone::Plain => (format!("  {first}"), 2),
	};

	for line in lines {
		out.push('\n');
		out.push_str(&" ".repeat(indent));
		out.push_str(line);
	}

	out
}

/// Render a section title between two rules.
pub fn format_section(title: &str, colours: bool) -> String {
	let rule = bold(&"─".repeat(RULE_WIDTH), colours);
	format!("\n{rule}\n{}\n{rule}", bold(&format!("  {title}"), colours))
}

/// Render the opening banner.
pub fn format_banner(lines: &[String], colours: bool) -> String {
	let rule = bold(&"=".repeat(RULE_WIDTH), colours);
	let mut out = format!("\n{rule}");
	for line in lines {
		out.push('\n');
		out.push_str(&bold(&format!("  {line}"), colours));
	}
	out.push('\n');
	out.push_str(&rule);
	out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
	Line,
	Eof,
	Interrupt,
}

/// The real terminal.
///
/// Ctrl-C and lines typed on stdin arrive on the same channel, so a pending prompt or pause
/// notices an interrupt immediately and the runner can unwind (and release the bus) normally.
#[derive(Debug)]
pub struct Terminal {
	colours: bool,
	signals: Receiver<Signal>,
	sender: Sender<Signal>,
	reading: bool,
	closed: bool,
}

impl Terminal {
	/// Set up the terminal and install the Ctrl-C handler.
	///
	/// This can only be done once per process.
	pub fn new() -> Result<Self> {
		let (sender, signals) = mpsc::channel();

		let interrupt = sender.clone();
		ctrlc::set_handler(move || {
			let _ = interrupt.send(Signal::Interrupt);
		})
		.into_diagnostic()
		.wrap_err("ctrlc: set_handler")?;

		// https://no-color.org/
		let colours = io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
		debug!(colours, "terminal ready");

		Ok(Self::from_channel(sender, signals, colours))
	}

	fn from_channel(sender: Sender<Signal>, signals: Receiver<Signal>, colours: bool) -> Self {
		Self {
			colours,
			signals,
			sender,
			reading: false,
			closed: false,
		}
	}

	fn spawn_reader(&mut self) {
		if self.reading {
			return;
		}

		self.reading = true;
		let lines = self.sender.clone();
		thread::spawn(move || {
			for line in io::stdin().lock().lines() {
				if line.is_err() || lines.send(Signal::Line).is_err() {
					break;
				}
			}

			let _ = lines.send(Signal::Eof);
		});
	}

	fn take(&mut self, signal: Signal) -> std::result::Result<(), Failure> {
		trace!(?signal, "operator signal");
		match signal {
			Signal::Interrupt => Err(Failure::Interrupted),
			Signal::Eof => {
				self.closed = true;
				Ok(())
			}
			Signal::Line => Ok(()),
		}
	}

	fn print(&self, text: &str) {
		println!("{text}");
	}
}

impl Operator for Terminal {
	fn banner(&mut self, lines: &[String]) {
		self.print(&format_banner(lines, self.colours));
	}

	fn section(&mut self, title: &str) {
		self.print(&format_section(title, self.colours));
	}

	fn status(&mut self, tone: Tone, message: &str) {
		self.print(&format_status(tone, message, self.colours));
	}

	fn confirm(&mut self, prompt: &str) -> std::result::Result<(), Failure> {
		// discard anything typed while the previous test was running
		self.interrupted()?;

		print!(
			"\n  {}",
			paint(&format!(">>> {prompt}"), Colors::WARNING, self.colours)
		);
		let _ = io::stdout().flush();

		if self.closed {
			println!();
			return Err(Failure::Interrupted);
		}

		self.spawn_reader();
		match self.signals.recv() {
			Ok(Signal::Line) => Ok(()),
			Ok(Signal::Eof) | Ok(Signal::Interrupt) | Err(_) => {
				println!();
				Err(Failure::Interrupted)
			}
		}
	}

	fn interrupted(&mut self) -> std::result::Result<(), Failure> {
		while let Ok(signal) = self.signals.try_recv() {
			self.take(signal)?;
		}

		Ok(())
	}

	fn hold(&mut self, duration: Duration) -> std::result::Result<(), Failure> {
		let deadline = Instant::now() + duration;
		loop {
			let remaining = deadline.saturating_duration_since(Instant::now());
			match self.signals.recv_timeout(remaining) {
				Ok(signal) => self.take(signal)?,
				Err(RecvTimeoutError::Timeout) => return Ok(()),
				Err(RecvTimeoutError::Disconnected) => {
					thread::sleep(remaining);
					return Ok(());
				}
			}
		}
	}
}

#[cfg(test)]
pub(crate) mod scripted {
	use super::*;

	/// An operator who confirms everything, never waits, and remembers what was shown.
	#[derive(Debug, Default)]
	pub struct ScriptedOperator {
		pub lines: Vec<(Tone, String)>,
		pub sections: Vec<String>,
		pub prompts: Vec<String>,
		pub held: Duration,
		/// Interrupt at this prompt (0-based) instead of confirming.
		pub interrupt_at_prompt: Option<usize>,
		/// Report an interrupt at this check (0-based) of [`Operator::interrupted`].
		pub interrupt_at_check: Option<usize>,
		pub checks: usize,
	}

	impl ScriptedOperator {
		pub fn count(&self, tone: Tone) -> usize {
			self.lines.iter().filter(|(t, _)| *t == tone).count()
		}

		pub fn said(&self, needle: &str) -> bool {
			self.lines.iter().any(|(_, line)| line.contains(needle))
		}
	}

	impl Operator for ScriptedOperator {
		fn banner(&mut self, lines: &[String]) {
			self.lines
				.extend(lines.iter().map(|line| (Tone::Plain, line.clone())));
		}

		fn section(&mut self, title: &str) {
			self.sections.push(title.into());
		}

		fn status(&mut self, tone: Tone, message: &str) {
			self.lines.push((tone, message.into()));
		}

		fn confirm(&mut self, prompt: &str) -> std::result::Result<(), Failure> {
			if self.interrupt_at_prompt == Some(self.prompts.len()) {
				return Err(Failure::Interrupted);
			}

			self.prompts.push(prompt.into());
			Ok(())
		}

		fn interrupted(&mut self) -> std::result::Result<(), Failure> {
			let check = self.checks;
			self.checks += 1;
			if self.interrupt_at_check.is_some_and(|at| check >= at) {
				return Err(Failure::Interrupted);
			}

			Ok(())
		}

		fn hold(&mut self, duration: Duration) -> std::result::Result<(), Failure> {
			self.held += duration;
			Ok(())
		}
	}
}
