//! Serialized console output.
//!
//! Search worker 0 and the coordinator thread both print while the main
//! thread answers commands, so every line goes through one lock.

use std::fmt::Display;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// Cloneable handle to the process-wide output lock.
#[derive(Clone, Default)]
pub struct Printer {
    lock: Arc<Mutex<()>>,
}

impl Printer {
    /// Print one line and flush, atomically with respect to other
    /// `Printer` users.
    pub fn line(&self, text: impl Display) {
        let _guard = self.lock.lock();
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        let _ = writeln!(handle, "{text}");
        let _ = handle.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printer_is_cloneable_and_shared() {
        let printer = Printer::default();
        let clone = printer.clone();
        assert!(Arc::ptr_eq(&printer.lock, &clone.lock));
    }
}
