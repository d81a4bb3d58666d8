use supports_color::Stream;

use crate::core::command::Notice;

pub struct Printer {
    pub use_color: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        let use_color = supports_color::on(Stream::Stdout).is_some();
        Self { use_color }
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }

    pub fn success(&self, message: &str) {
        self.print_prefix("[+]", "green", message);
    }

    pub fn error(&self, message: &str) {
        self.print_prefix("[-]", "red", message);
    }

    pub fn warning(&self, message: &str) {
        self.print_prefix("[!]", "yellow", message);
    }

    pub fn info(&self, message: &str) {
        self.print_prefix("[?]", "cyan", message);
    }

    pub fn header(&self, title: &str) {
        if self.use_color {
            println!("\n\x1b[1;36m{}\x1b[0m", title); // Bold cyan
            println!("\x1b[90m{}\x1b[0m", "─".repeat(title.chars().count()));
        } else {
            println!("\n{}", title);
            println!("{}", "─".repeat(title.chars().count()));
        }
    }

    pub fn emit(&self, notice: &Notice) {
        match notice {
            Notice::Header(title) => self.header(title),
            Notice::Success(text) => self.success(text),
            Notice::Info(text) => self.info(text),
            Notice::Warning(text) => self.warning(text),
            Notice::Error(text) => self.error(text),
            Notice::Plain(text) => println!("{}", text),
        }
    }

    pub fn emit_all(&self, notices: &[Notice]) {
        for notice in notices {
            self.emit(notice);
        }
    }

    pub fn format_prefixed(&self, prefix: &str, color: &str, message: &str) -> String {
        if !self.use_color {
            return format!("{} {}", prefix, message);
        }
        let color_code = match color {
            "green" => "\x1b[32m",
            "red" => "\x1b[31m",
            "yellow" => "\x1b[33m",
            "cyan" => "\x1b[36m",
            _ => "\x1b[0m",
        };
        format!("{}{}\x1b[0m {}", color_code, prefix, message)
    }

    pub fn print_prefix(&self, prefix: &str, color: &str, message: &str) {
        println!("{}", self.format_prefixed(prefix, color, message));
    }
}
