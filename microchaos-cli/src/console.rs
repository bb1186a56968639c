//! Colored console logger

use colored::Colorize;
use microchaos_core::Logger;

/// Terminal implementation of the [`Logger`] collaborator.
///
/// `error` renders the message and terminates the process: by the time
/// the engine reports an error it is a fatal configuration problem.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleLogger {
    verbose: bool,
}

impl ConsoleLogger {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) {
        println!("{message}");
    }

    fn success(&self, message: &str) {
        println!("{}", message.green());
    }

    fn warning(&self, message: &str) {
        eprintln!("{}", message.yellow());
    }

    fn error(&self, message: &str) {
        eprintln!("{}", message.red().bold());
        std::process::exit(1);
    }

    fn debug(&self, message: &str) {
        if self.verbose {
            println!("{}", message.dimmed());
        }
    }
}
