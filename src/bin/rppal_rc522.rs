use core::fmt::Arguments;
use rppal_rc522::{error, Rc522Log, RppalRc522Tool};
use std::cell::Cell;
use termion::color;

struct RppalRc522Logger {
    color: Cell<bool>,
}

impl RppalRc522Logger {
    fn new() -> RppalRc522Logger {
        RppalRc522Logger {
            color: Cell::new(termion::is_tty(&std::io::stderr())),
        }
    }
}

impl Rc522Log for RppalRc522Logger {
    fn output(self: &Self, args: Arguments) {
        println!("{}", args);
    }
    fn warning(self: &Self, args: Arguments) {
        if self.color.get() {
            eprintln!(
                "{}warning:{} {}",
                color::Fg(color::Yellow),
                color::Fg(color::Reset),
                args
            );
        } else {
            eprintln!("warning: {}", args);
        }
    }
    fn error(self: &Self, args: Arguments) {
        if self.color.get() {
            eprintln!(
                "{}error:{} {}",
                color::Fg(color::Red),
                color::Fg(color::Reset),
                args
            );
        } else {
            eprintln!("error: {}", args);
        }
    }
    fn use_color(self: &Self, enabled: bool) {
        self.color.set(self.color.get() && enabled);
    }
}

fn main() {
    let logger = RppalRc522Logger::new();

    if let Err(error) = RppalRc522Tool::new(&logger).run(std::env::args_os()) {
        error!(logger, "{}", error);
        std::process::exit(1);
    }
}
