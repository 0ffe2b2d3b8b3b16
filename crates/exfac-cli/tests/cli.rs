use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

enum Cell {
    Text(&'static str),
    Number(f64),
    Blank,
}

use Cell::{Blank, Number, Text};

fn write_workbook(path: &Path, rows: &[&[Cell]]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Factura").unwrap();
    for (row, cells) in rows.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            match cell {
                Text(s) => {
                    sheet.write_string(row as u32, col as u16, *s).unwrap();
                }
                Number(n) => {
                    sheet.write_number(row as u32, col as u16, *n).unwrap();
                }
                Blank => {}
            }
        }
    }
    workbook.save(path).unwrap();
}

fn write_invoice(path: &Path) {
    write_workbook(
        path,
        &[
            &[Text("FACTURA DE EXPORTACION")],
            &[Text("CLIENTE"), Text("EXP N°")],
            &[Text("Frutas del Pacífico Ltd."), Text("1234")],
            &[Text("DIA"), Text("MES"), Text("AÑO")],
            &[Text("5"), Text("MARZO"), Text("2024")],
            &[Text("CONDICIÓN DE VENTA"), Text("MONEDA")],
            &[Text("Venta firme - FOB"), Text("Dólar")],
            &[],
            &[
                Text("CANTIDAD"),
                Text("DESCRIPCIÓN"),
                Text("PRECIO UNITARIO"),
                Text("TOTAL"),
            ],
            &[Number(4.0), Text("Widget B"), Number(12.5), Blank],
            &[Number(2.0), Text("Widget C"), Number(3.0), Number(6.0)],
            &[Blank, Text("TOTAL GENERAL"), Blank, Number(56.0)],
        ],
    );
}

/// Command with the user config directory pointed at an empty tempdir.
fn exfac(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("exfac").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path())
        .env("HOME", home.path());
    cmd
}

#[test]
fn process_prints_json_records() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("factura.xlsx");
    write_invoice(&input);

    exfac(&dir)
        .arg("process")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"date\": \"05/03/2024\""))
        .stdout(predicate::str::contains("\"incoterm\": \"FOB\""))
        .stdout(predicate::str::contains("\"currency\": \"USD\""))
        .stdout(predicate::str::contains("Widget C"));
}

#[test]
fn process_writes_csv_by_extension() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("factura.xlsx");
    let output = dir.path().join("out").join("records.csv");
    write_invoice(&input);

    exfac(&dir)
        .arg("process")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 records written"));

    let csv = std::fs::read_to_string(&output).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("file,client,expedient,date"));
    assert_eq!(lines.count(), 2);
}

#[test]
fn process_rejects_xlsx_on_stdout() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("factura.xlsx");
    write_invoice(&input);

    exfac(&dir)
        .args(["process", "-f", "xlsx"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--output"));
}

#[test]
fn process_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    exfac(&dir)
        .arg("process")
        .arg(dir.path().join("nope.xlsx"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn batch_reports_failures_without_aborting() {
    let dir = TempDir::new().unwrap();
    write_invoice(&dir.path().join("a.xlsx"));
    std::fs::write(dir.path().join("b.xlsx"), b"not a workbook").unwrap();
    let output = dir.path().join("all.json");

    exfac(&dir)
        .arg("batch")
        .arg(format!("{}/*.xlsx", dir.path().display()))
        .arg("-o")
        .arg(&output)
        .arg("--summary")
        .assert()
        .success()
        .stderr(predicate::str::contains("Failed files:"))
        .stderr(predicate::str::contains("b.xlsx"));

    let records: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["file"], "a.xlsx");

    let summary = std::fs::read_to_string(dir.path().join("summary.csv")).unwrap();
    assert!(summary.contains("a.xlsx,success,2,2"));
    assert!(summary.contains("b.xlsx,error"));
}

#[test]
fn batch_without_matches_fails() {
    let dir = TempDir::new().unwrap();

    exfac(&dir)
        .arg("batch")
        .arg(format!("{}/*.xlsx", dir.path().display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn config_init_set_get() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("exfac.json");
    let config = config.to_str().unwrap();

    exfac(&dir)
        .args(["-c", config, "config", "init"])
        .assert()
        .success();

    exfac(&dir)
        .args(["-c", config, "config", "set", "table.blank_patience", "3"])
        .assert()
        .success();

    exfac(&dir)
        .args(["-c", config, "config", "get", "table.blank_patience"])
        .assert()
        .success()
        .stdout("3\n");

    exfac(&dir)
        .args(["-c", config, "config", "set", "table.unknown", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}
