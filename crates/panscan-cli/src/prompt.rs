//! Terminal prompts
//!
//! Operator-facing questions for port selection, baud confirmation and the
//! calibration routine.

use std::io::{self, BufRead, Write};

use panscan_core::protocol::{BaudClass, Confirmation, PortInfo, PortSelector};

/// Parse a yes/no answer
pub fn parse_yes_no(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a list index typed by the operator
pub fn parse_index(input: &str, len: usize) -> Option<usize> {
    input.trim().parse::<usize>().ok().filter(|&i| i < len)
}

/// Line-based question/answer over a reader and writer
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on the process terminal
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print a line
    pub fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }

    /// Ask a question; `None` once input is exhausted
    pub fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{} ", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask until the answer is y or n. End of input counts as no.
    pub fn yes_no(&mut self, question: &str) -> io::Result<bool> {
        loop {
            let Some(answer) = self.ask(&format!("{} (y/n)", question))? else {
                return Ok(false);
            };
            match parse_yes_no(&answer) {
                Some(choice) => return Ok(choice),
                None => self.say("please enter \"y\" or \"n\"")?,
            }
        }
    }
}

/// Port selection by asking the operator
pub struct TerminalSelector<R, W> {
    prompter: Prompter<R, W>,
}

impl TerminalSelector<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(Prompter::stdio())
    }
}

impl<R: BufRead, W: Write> TerminalSelector<R, W> {
    pub fn new(prompter: Prompter<R, W>) -> Self {
        Self { prompter }
    }

    fn print_port(&mut self, port: &PortInfo) -> io::Result<()> {
        self.prompter.say(&format!("\tname: {}", port.name))?;
        self.prompter.say(&format!("\tdevice: {}", port.device_path))?;
        self.prompter.say(&format!(
            "\tdescription: {}",
            port.description.as_deref().unwrap_or("n/a")
        ))?;
        if let (Some(vid), Some(pid)) = (port.vendor_id, port.product_id) {
            self.prompter.say(&format!("\tusb id: {:04x}:{:04x}", vid, pid))?;
        }
        Ok(())
    }

    fn try_choose(&mut self, candidates: &[PortInfo]) -> io::Result<Option<usize>> {
        if candidates.is_empty() {
            self.prompter.say("no serial ports found")?;
            return Ok(None);
        }

        self.prompter.say("found ports:")?;
        for (id, port) in candidates.iter().enumerate() {
            self.prompter.say(&format!("{}:", id))?;
            self.print_port(port)?;
        }

        loop {
            let Some(answer) = self.prompter.ask("select a port:")? else {
                return Ok(None);
            };
            match parse_index(&answer, candidates.len()) {
                Some(i) => return Ok(Some(i)),
                None => self.prompter.say("invalid selection!")?,
            }
        }
    }

    fn try_confirm(&mut self, question: &Confirmation<'_>) -> io::Result<bool> {
        match question {
            Confirmation::Connect { port, baud_rate } => {
                self.prompter.say("possible scanner port detected:")?;
                self.print_port(port)?;
                self.prompter
                    .yes_no(&format!("connect with baud rate {}?", baud_rate))
            }
            Confirmation::Baud { baud_rate, class } => {
                let note = match class {
                    BaudClass::Extended => "is not standard, but may still be supported on some machines",
                    _ => "is not standard, and is likely not supported",
                };
                self.prompter.say(&format!("baud rate {} {}.", baud_rate, note))?;
                self.prompter
                    .yes_no(&format!("are you sure you want to use baud rate {}?", baud_rate))
            }
        }
    }
}

impl<R: BufRead, W: Write> PortSelector for TerminalSelector<R, W> {
    fn choose(&mut self, candidates: &[PortInfo]) -> Option<usize> {
        self.try_choose(candidates).unwrap_or_else(|e| {
            tracing::warn!("port selection aborted: {}", e);
            None
        })
    }

    fn confirm(&mut self, question: &Confirmation<'_>) -> bool {
        self.try_confirm(question).unwrap_or_else(|e| {
            tracing::warn!("confirmation aborted: {}", e);
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(input: &str) -> TerminalSelector<&[u8], Vec<u8>> {
        TerminalSelector::new(Prompter::new(input.as_bytes(), Vec::new()))
    }

    #[test]
    fn test_parse_yes_no() {
        assert_eq!(parse_yes_no(" Y\n"), Some(true));
        assert_eq!(parse_yes_no("no"), Some(false));
        assert_eq!(parse_yes_no("maybe"), None);
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("1", 2), Some(1));
        assert_eq!(parse_index("2", 2), None);
        assert_eq!(parse_index("-1", 2), None);
        assert_eq!(parse_index("abc", 2), None);
    }

    #[test]
    fn test_yes_no_retries() {
        let mut p = Prompter::new("what\nn\n".as_bytes(), Vec::new());
        assert!(!p.yes_no("ok?").unwrap());
        let out = String::from_utf8(p.output).unwrap();
        assert!(out.contains("please enter"));
    }

    #[test]
    fn test_yes_no_eof_is_no() {
        let mut p = Prompter::new("".as_bytes(), Vec::new());
        assert!(!p.yes_no("ok?").unwrap());
    }

    #[test]
    fn test_choose_retries_until_valid() {
        let ports = vec![
            PortInfo::from_path("/dev/ttyACM0"),
            PortInfo::from_path("/dev/ttyUSB0"),
        ];
        let mut s = selector("7\nx\n1\n");
        assert_eq!(s.choose(&ports), Some(1));
    }

    #[test]
    fn test_choose_nothing_available() {
        let mut s = selector("0\n");
        assert_eq!(s.choose(&[]), None);
    }

    #[test]
    fn test_confirm_connect() {
        let port = PortInfo::from_path("/dev/ttyACM0");
        let mut s = selector("y\n");
        assert!(s.confirm(&Confirmation::Connect {
            port: &port,
            baud_rate: 115200,
        }));
    }

    #[test]
    fn test_confirm_baud_declined() {
        let mut s = selector("n\n");
        assert!(!s.confirm(&Confirmation::Baud {
            baud_rate: 921600,
            class: BaudClass::Extended,
        }));
    }
}
