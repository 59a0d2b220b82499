//! Standard test: single run, compare output against expected files.
//!
//! `<example>.expected` holds the semihosting output. `<example>.uart` holds the
//! bytes the driver sent. An example without a `.uart` file must send nothing.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::build::testsuite_dir;
use crate::qemu::run_qemu;
use crate::runner::RunOptions;

/// Run a standard test.
pub fn run_standard(example: &str, elf_path: &Path, opts: &RunOptions) -> Result<bool> {
    println!("Running in QEMU...");
    let output = run_qemu(elf_path)?;

    if opts.verbose {
        print!("{}", output.semihosting);
        println!("--- QEMU run end ---");
        if !output.uart.is_empty() {
            println!("--- uart ---");
            println!("{}", escape(&output.uart));
        }
        return Ok(true);
    }

    let expected_dir = testsuite_dir()?.join("expected");
    let expected_path = expected_dir.join(format!("{example}.expected"));
    let uart_path = expected_dir.join(format!("{example}.uart"));

    if opts.bless {
        fs::create_dir_all(&expected_dir)?;
        bless(&expected_path, output.semihosting.as_bytes())?;
        if output.uart.is_empty() {
            if uart_path.exists() {
                fs::remove_file(&uart_path)?;
                println!("  {}: Removed", file_name(&uart_path));
            }
        } else {
            bless(&uart_path, &output.uart)?;
        }
        return Ok(true);
    }

    if !expected_path.exists() {
        println!("  No expected output file, run with --bless to create");
        println!("--- output ---");
        print!("{}", output.semihosting);
        return Ok(false);
    }

    let expected = fs::read_to_string(&expected_path)
        .with_context(|| format!("Failed to read {}", expected_path.display()))?;
    let expected_uart = if uart_path.exists() {
        fs::read(&uart_path).with_context(|| format!("Failed to read {}", uart_path.display()))?
    } else {
        Vec::new()
    };

    let semihosting_ok = output.semihosting == expected;
    let uart_ok = output.uart == expected_uart;
    if semihosting_ok && uart_ok {
        println!("  PASS");
        return Ok(true);
    }

    println!("  FAIL: output differs from expected");
    if !semihosting_ok {
        println!("--- expected ---");
        print!("{expected}");
        println!("--- semihosting ---");
        print!("{}", output.semihosting);
    }
    if !uart_ok {
        println!("--- expected uart ---");
        println!("{}", escape(&expected_uart));
        println!("--- uart ---");
        println!("{}", escape(&output.uart));
    }
    Ok(false)
}

/// Write `content` to `path` unless it already holds exactly that.
fn bless(path: &PathBuf, content: &[u8]) -> Result<()> {
    let status = match fs::read(path) {
        Ok(existing) if existing == content => "No change",
        Ok(_) => {
            fs::write(path, content)?;
            "Updated"
        }
        Err(_) => {
            fs::write(path, content)?;
            "Created"
        }
    };
    println!("  {}: {status}", file_name(path));
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// UART bytes with control characters made visible.
fn escape(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}
