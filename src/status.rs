/// Startup banner
pub const BANNER: &str = "\
╔════════════════════════════════════════════╗
║                                            ║
║             I N S T A T R A C E            ║
║                                            ║
║   Private Profile Image URL Extractor      ║
║                       (POC)                ║
║                                            ║
╚════════════════════════════════════════════╝";

/// Usage notice printed under the banner
pub const NOTICE: &str = "   Use ONLY on accounts you own or have explicit permission
   This vulnerability was FIXED by Instagram/Meta";

pub const PERMISSION_WARNING: &str = "ONLY TEST ACCOUNTS YOU OWN OR HAVE PERMISSION FOR";

pub const EXPOSED_VERDICT: &str = "VULNERABLE – Private timeline data exposed!";

pub const NOT_EXPOSED_VERDICT: &str = "NOT VULNERABLE – No private data exposed";

/// Colour of a console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Info,
    Warning,
    Error,
    Dim,
}

/// Colour `text`; plain text when stdout is not a terminal
pub fn paint(text: &str, tone: Tone) -> String {
    let styled = console::style(text);
    match tone {
        Tone::Success => styled.green().bold(),
        Tone::Info => styled.cyan(),
        Tone::Warning => styled.yellow().bold(),
        Tone::Error => styled.red().bold(),
        Tone::Dim => styled.black().bright(),
    }
    .to_string()
}

/// `➜ message` in the tone's colour
pub fn status_line(message: &str, tone: Tone) -> String {
    paint(&format!("➜ {message}"), tone)
}

pub fn print_status(message: &str, tone: Tone) {
    println!("{}", status_line(message, tone));
}

pub fn print_banner() {
    println!();
    println!("{}", console::style(BANNER).magenta().bold());
    println!();
    println!("{}", paint(NOTICE, Tone::Dim));
    println!();
}
