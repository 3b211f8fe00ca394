//! Conversion orchestration against a fake converter script

#![cfg(unix)]

mod common;

use std::fs;
use std::sync::Mutex;

use pretty_assertions::assert_eq;
use signflow_core::{Converter, SignflowError, TargetFormat};
use tempfile::TempDir;

// Writing and executing scripts from parallel threads can fail with ETXTBSY.
static SERIAL: Mutex<()> = Mutex::new(());

#[test]
fn test_html_output_falls_back_to_htm() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let soffice = common::write_script(dir.path(), "soffice", common::FAKE_SOFFICE);
    let input = dir.path().join("contract.pdf");
    fs::write(&input, common::create_test_pdf(1, "Contract")).unwrap();

    let out_dir = dir.path().join("out").join("nested");
    let html = Converter::new(&soffice).to_html(&input, &out_dir).unwrap();

    assert_eq!(html, out_dir.join("contract.htm"));
    assert!(fs::read_to_string(&html).unwrap().contains("<p>contract</p>"));
}

#[test]
fn test_pdf_output_path() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let soffice = common::write_script(dir.path(), "soffice", common::FAKE_SOFFICE);
    let input = dir.path().join("letter.docx");
    fs::write(&input, b"docx bytes").unwrap();

    let pdf = Converter::new(&soffice)
        .convert(&input, dir.path(), TargetFormat::Pdf)
        .unwrap();
    assert_eq!(pdf, dir.path().join("letter.pdf"));
    assert_eq!(fs::read(pdf).unwrap(), b"docx bytes");
    // The output directory itself is left alone.
    assert!(dir.path().join("soffice").exists());
}

#[test]
fn test_exact_arguments_reach_the_converter() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let record = dir.path().join("args.txt");
    let soffice = common::write_script(
        dir.path(),
        "soffice",
        &format!("printf '%s\\n' \"$@\" > '{}'\n", record.display()),
    );
    let input = dir.path().join("scan.pdf");
    fs::write(&input, b"%PDF").unwrap();
    let out_dir = dir.path().join("out");

    // The script writes no output file, so resolution fails afterwards.
    let err = Converter::new(&soffice).to_docx(&input, &out_dir).unwrap_err();
    assert!(matches!(err, SignflowError::OutputNotFound { .. }));

    let recorded = fs::read_to_string(&record).unwrap();
    let args: Vec<&str> = recorded.lines().collect();
    assert_eq!(
        args,
        vec![
            "--headless".to_string(),
            "--nologo".to_string(),
            "--nolockcheck".to_string(),
            "--infilter=writer_pdf_import".to_string(),
            "--convert-to".to_string(),
            "docx".to_string(),
            "--outdir".to_string(),
            out_dir.display().to_string(),
            input.display().to_string(),
        ]
    );
}

#[test]
fn test_non_zero_exit_carries_output() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let soffice = common::write_script(dir.path(), "soffice", common::FAILING_SOFFICE);
    let input = dir.path().join("broken.docx");
    fs::write(&input, b"x").unwrap();

    match Converter::new(&soffice).to_pdf(&input, dir.path()).unwrap_err() {
        SignflowError::ConversionFailed { status, output } => {
            assert_eq!(status.code(), Some(3));
            assert_eq!(
                output,
                "source file could not be loaded\ngeneral error\ngiving up\n"
            );
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_missing_output_lists_candidates() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let soffice = common::write_script(dir.path(), "soffice", common::SILENT_SOFFICE);
    let input = dir.path().join("memo.pdf");
    fs::write(&input, b"%PDF").unwrap();

    match Converter::new(&soffice).to_html(&input, dir.path()).unwrap_err() {
        SignflowError::OutputNotFound { candidates } => {
            assert_eq!(
                candidates,
                vec![dir.path().join("memo.html"), dir.path().join("memo.htm")]
            );
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
