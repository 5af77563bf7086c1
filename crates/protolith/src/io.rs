use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{self, BufRead, Write as _},
    rc::Rc,
};

/// Trait for the console the interpreter's built-ins talk to.
///
/// `console.dump` writes through [`Console::write_line`]; `console.readLine`
/// reads through [`Console::read_line`]. Implement this to capture or script
/// console traffic; the default [`StdConsole`] uses the process streams.
pub trait Console {
    /// Writes one line of output (no trailing newline in `line`).
    fn write_line(&mut self, line: &str);

    /// Reads one line of input without its newline. `None` at end of input.
    fn read_line(&mut self) -> Option<String>;
}

/// Default console bound to stdout/stdin.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write_line(&mut self, line: &str) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        let _ = writeln!(handle, "{line}");
        let _ = handle.flush();
    }

    fn read_line(&mut self) -> Option<String> {
        let mut buffer = String::new();
        match io::stdin().lock().read_line(&mut buffer) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                while buffer.ends_with('\n') || buffer.ends_with('\r') {
                    buffer.pop();
                }
                Some(buffer)
            }
        }
    }
}

/// Console that collects output into a string and serves scripted input.
///
/// Uses interior mutability behind a shared handle: clone one instance into
/// the interpreter and keep the original to inspect output afterwards.
/// Useful for testing `console.dump` / `console.readLine` without a
/// terminal.
#[derive(Debug, Default, Clone)]
pub struct CollectConsole {
    inner: Rc<RefCell<CollectInner>>,
}

#[derive(Debug, Default)]
struct CollectInner {
    output: String,
    input: VecDeque<String>,
}

impl CollectConsole {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a console whose `read_line` serves these lines in order.
    pub fn with_input(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let console = Self::default();
        console.inner.borrow_mut().input = lines.into_iter().map(Into::into).collect();
        console
    }

    /// Queues one more scripted input line.
    pub fn push_input(&self, line: impl Into<String>) {
        self.inner.borrow_mut().input.push_back(line.into());
    }

    /// Everything written so far, one `\n`-terminated line per write.
    #[must_use]
    pub fn output(&self) -> String {
        self.inner.borrow().output.clone()
    }
}

impl Console for CollectConsole {
    fn write_line(&mut self, line: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.output.push_str(line);
        inner.output.push('\n');
    }

    fn read_line(&mut self) -> Option<String> {
        self.inner.borrow_mut().input.pop_front()
    }
}
