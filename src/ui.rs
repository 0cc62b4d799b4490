/// Console output for Jenkins logs
///
/// Progress lines carry an "rtm-report: " prefix so they stand out among
/// other build steps. Errors and warnings get a colored label when stdout
/// is a terminal.

use lazy_static::lazy_static;
use std::io::Write;
use std::sync::Mutex;

/// Run `f` while holding the console lock
fn status_lock<F: FnOnce()>(f: F) {
    lazy_static! {
        static ref LOCK: Mutex<()> = Mutex::new(());
    }
    let _guard = LOCK.lock();
    f();
}

/// Print the "rtm-report: " prefix for status messages
fn print_status_header() {
    print!("rtm-report: ");
}

/// Print colored text to terminal, with fallback to plain text
fn print_color(s: &str, fg: term::color::Color) {
    let _ = std::io::stdout().flush();
    if !really_print_color(s, fg) {
        print!("{}", s);
    }

    // No terminfo (Jenkins, pipes) means plain text
    fn really_print_color(s: &str, fg: term::color::Color) -> bool {
        let Some(mut t) = term::stdout() else {
            return false;
        };
        if t.fg(fg).is_err() {
            return false;
        }
        let _ = t.attr(term::Attr::Bold);
        if write!(t, "{}", s).is_err() {
            return false;
        }
        let _ = t.reset();
        let _ = t.flush();

        true
    }
}

/// Print a status message with "rtm-report: " prefix (thread-safe)
pub fn status(s: &str) {
    status_lock(|| {
        print_status_header();
        println!("{}", s);
    });
}

/// Print a warning with a colored "warning" prefix, for conditions the run
/// survives (skipped attachment, best-effort export)
pub fn warning(msg: &str) {
    status_lock(|| {
        print_status_header();
        print_color("warning", term::color::BRIGHT_YELLOW);
        println!(": {}", msg);
    });
}

/// Print an error message with colored "error" prefix
pub fn print_error(msg: &str) {
    println!();
    print_color("error", term::color::BRIGHT_RED);
    println!(": {}", msg);
    println!();
}
