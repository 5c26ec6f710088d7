//! Interactive collection session.
//!
//! Asks for an image path and its known concentration until the user types
//! `done` (or input ends), recording one observation per readable image.
//!
//! The loop is generic over its streams and decoder so it can be driven from
//! tests with in-memory input.

use std::io::{BufRead, Write};
use std::path::Path;

use crate::app::pipeline::{analyze_image, parse_concentration};
use crate::calibration::Calibration;
use crate::domain::{CONCENTRATION_UNIT, ExtractionSettings};
use crate::error::{AppError, EXIT_INTERNAL};
use crate::extract::ImageDecoder;

pub const PATH_PROMPT: &str = "Enter the path of the image file (or type 'done' to finish): ";
pub const CONCENTRATION_PROMPT: &str =
    "Enter the known concentration for this image (e.g., in µg/mL): ";

/// Counts for the end-of-session log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub added: usize,
    pub rejected: usize,
}

/// Run the prompt loop, appending to `calibration`.
///
/// Bad input never ends the loop: an invalid concentration or an unusable
/// image is reported and the user is asked for the next path. Only stream
/// failures are returned as errors.
pub fn run_session<R, W, D>(
    input: &mut R,
    output: &mut W,
    decoder: &D,
    settings: &ExtractionSettings,
    calibration: &mut Calibration,
) -> Result<SessionSummary, AppError>
where
    R: BufRead,
    W: Write,
    D: ImageDecoder,
{
    let mut summary = SessionSummary::default();

    loop {
        let Some(path) = prompt(input, output, PATH_PROMPT)? else {
            // End of input counts as `done`.
            writeln!(output).map_err(write_error)?;
            break;
        };
        if path.eq_ignore_ascii_case("done") {
            break;
        }
        if path.is_empty() {
            continue;
        }

        let Some(raw) = prompt(input, output, CONCENTRATION_PROMPT)? else {
            writeln!(output).map_err(write_error)?;
            break;
        };
        let concentration = match parse_concentration(&raw) {
            Ok(v) => v,
            Err(err) => {
                log::debug!("rejected concentration input {raw:?}");
                writeln!(output, "{err}").map_err(write_error)?;
                summary.rejected += 1;
                continue;
            }
        };

        match analyze_image(decoder, Path::new(&path), concentration, settings, calibration) {
            Ok(obs) => {
                writeln!(
                    output,
                    "Image analyzed. Mean Intensity: {:.2} for concentration {} {CONCENTRATION_UNIT}",
                    obs.intensity,
                    fmt_concentration(obs.concentration)
                )
                .map_err(write_error)?;
                summary.added += 1;
            }
            Err(err) => {
                writeln!(output, "{err}").map_err(write_error)?;
                summary.rejected += 1;
            }
        }
    }

    log::info!(
        "session ended: {} added, {} rejected, {} total observations",
        summary.added,
        summary.rejected,
        calibration.len()
    );
    Ok(summary)
}

/// Print `text` and read one trimmed line; `None` at end of input.
fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    text: &str,
) -> Result<Option<String>, AppError> {
    write!(output, "{text}").map_err(write_error)?;
    output.flush().map_err(write_error)?;

    let mut line = String::new();
    let bytes = input
        .read_line(&mut line)
        .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Failed to read input: {e}")))?;
    if bytes == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Shortest round-trip form with a decimal point (`1.0`, `2.5`), and exponents
/// written signed with at least two digits (`1e-05`, `2.5e+20`).
fn fmt_concentration(v: f64) -> String {
    let s = format!("{v:?}");
    let Some((mantissa, exp)) = s.split_once('e') else {
        return s;
    };
    let (sign, digits) = match exp.strip_prefix('-') {
        Some(d) => ('-', d),
        None => ('+', exp),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

fn write_error(e: std::io::Error) -> AppError {
    AppError::new(EXIT_INTERNAL, format!("Failed to write prompt: {e}"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::app::pipeline::test_support::FakeDecoder;

    fn run(script: &str, decoder: &FakeDecoder) -> (Calibration, SessionSummary, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();
        let mut cal = Calibration::new();
        let summary = run_session(
            &mut input,
            &mut output,
            decoder,
            &ExtractionSettings::default(),
            &mut cal,
        )
        .unwrap();
        (cal, summary, String::from_utf8(output).unwrap())
    }

    #[test]
    fn records_observations_until_done() {
        let decoder = FakeDecoder::default()
            .with_blue("a.png", 100)
            .with_blue("b.png", 200);
        let (cal, summary, out) = run("a.png\n1\nb.png\n2.5\nDONE\n", &decoder);

        assert_eq!(cal.len(), 2);
        assert_eq!(summary, SessionSummary { added: 2, rejected: 0 });
        assert!(out.contains("Image analyzed. Mean Intensity: 100.00 for concentration 1.0 µg/mL"));
        assert!(out.contains("Image analyzed. Mean Intensity: 200.00 for concentration 2.5 µg/mL"));
        assert_eq!(out.matches(PATH_PROMPT).count(), 3);
    }

    #[test]
    fn invalid_concentration_adds_nothing_and_keeps_going() {
        let decoder = FakeDecoder::default().with_blue("a.png", 100);
        let (cal, summary, out) = run("a.png\nabc\na.png\n3\ndone\n", &decoder);

        assert_eq!(cal.len(), 1);
        assert_eq!(summary.rejected, 1);
        assert!(out.contains("Invalid concentration value 'abc'. Please enter a numerical value."));
        assert_eq!(cal.observations()[0].concentration, 3.0);
    }

    #[test]
    fn unreadable_image_is_reported_and_skipped() {
        let decoder = FakeDecoder::default();
        let (cal, summary, out) = run("missing.png\n1\ndone\n", &decoder);

        assert!(cal.is_empty());
        assert_eq!(summary.rejected, 1);
        assert!(out.contains("Error loading image 'missing.png'. Please check the file path."));
    }

    #[test]
    fn end_of_input_ends_the_session() {
        let decoder = FakeDecoder::default().with_blue("a.png", 10);
        let (cal, _, _) = run("a.png\n4\n", &decoder);
        assert_eq!(cal.len(), 1);

        // EOF while waiting for a concentration drops the pending path.
        let (cal, _, _) = run("a.png\n", &decoder);
        assert!(cal.is_empty());
    }

    #[test]
    fn concentration_echo_uses_two_digit_exponents() {
        assert_eq!(fmt_concentration(1.0), "1.0");
        assert_eq!(fmt_concentration(0.0001), "0.0001");
        assert_eq!(fmt_concentration(1e-5), "1e-05");
        assert_eq!(fmt_concentration(-1.5e-7), "-1.5e-07");
        assert_eq!(fmt_concentration(2.5e20), "2.5e+20");
        assert_eq!(fmt_concentration(1e-100), "1e-100");

        let decoder = FakeDecoder::default().with_blue("a.png", 10);
        let (_, _, out) = run("a.png\n0.00001\ndone\n", &decoder);
        assert!(out.contains("for concentration 1e-05 µg/mL"));
    }

    #[test]
    fn blank_path_prompts_again() {
        let decoder = FakeDecoder::default().with_blue("a.png", 10);
        let (cal, summary, out) = run("\n  \na.png\n1\ndone\n", &decoder);
        assert_eq!(cal.len(), 1);
        assert_eq!(summary.rejected, 0);
        assert!(!out.contains(CONCENTRATION_PROMPT.repeat(2).as_str()));
        assert_eq!(out.matches(PATH_PROMPT).count(), 4);
    }
}
