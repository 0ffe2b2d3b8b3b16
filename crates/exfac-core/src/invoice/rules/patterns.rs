//! Common regex patterns for spreadsheet field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Print header/footer control codes: &L &C &R &P &N &D &T &"Font,Style" &14
    pub static ref PRINT_CONTROL_CODE: Regex = Regex::new(
        r#"&(?:"[^"]*"|\d+|[A-Za-z&])"#
    ).unwrap();

    // "CONTADO - FOB" style composite values
    pub static ref DASH_SEPARATOR: Regex = Regex::new(
        r"\s*[-–—]\s*"
    ).unwrap();

    // "CLIENTE: ACME LTDA" written inside the label cell itself
    pub static ref INLINE_VALUE: Regex = Regex::new(
        r"^[^:]{1,60}:\s*(\S.*)$"
    ).unwrap();

    // Footer lines that end a free-text block (matched on normalized text)
    pub static ref FOOTER_MARKER: Regex = Regex::new(
        r"(?:\bTOTAL\b|\bSUBTOTAL\b|\bPAGE\b|\bPAGINA\b|\bFIRMA\b|\bSIGNATURE\b|\bSON:|\bTIMBRE\b)"
    ).unwrap();

    // Anything that cannot be part of a number
    pub static ref NON_NUMERIC: Regex = Regex::new(
        r"[^0-9.,\-]"
    ).unwrap();
}
