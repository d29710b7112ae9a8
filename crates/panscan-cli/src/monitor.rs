//! Raw device console
//!
//! Prints every line the device sends and forwards typed commands, one at a
//! time: a new command is only accepted after the device reports `ready`.

use anyhow::Result;
use std::io::{BufRead, Write};

use panscan_core::protocol::{TelemetryLine, Transport};

/// Run the console until `exit` or end of input
pub fn run<R: BufRead, W: Write>(link: &mut dyn Transport, input: R, mut output: W) -> Result<()> {
    let mut commands = input.lines();
    let mut busy = false;

    writeln!(output, "type a command (e.g. PAN|90, READSENSOR), or \"exit\" to quit")?;
    loop {
        while link.has_pending_input()? {
            let line = link.read_line()?;
            echo(&line, &mut busy, &mut output)?;
        }

        if busy {
            // Bounded by the link's read timeout
            let line = link.read_line()?;
            echo(&line, &mut busy, &mut output)?;
            continue;
        }

        write!(output, "enter command: ")?;
        output.flush()?;
        let Some(command) = commands.next() else {
            break;
        };
        let command = command?;
        let command = command.trim();
        if command.eq_ignore_ascii_case("exit") {
            break;
        }
        if command.is_empty() {
            continue;
        }

        link.write_line(command)?;
        busy = true;
    }

    Ok(())
}

fn echo<W: Write>(line: &str, busy: &mut bool, output: &mut W) -> Result<()> {
    match TelemetryLine::classify(line) {
        TelemetryLine::Empty => return Ok(()),
        TelemetryLine::Ready => *busy = false,
        TelemetryLine::Data(_) => {}
    }
    writeln!(output, "{}", line)?;
    Ok(())
}
