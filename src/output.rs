use std::io::{self, Write};

use serde::Serialize;

use crate::app::{DiffResult, MigrateResult};

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_migrate(result: &MigrateResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_diff(result: &DiffResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct HumanOutput;

impl HumanOutput {
    pub fn print_migrate(result: &MigrateResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{CYAN}source{RESET}   {}", result.source)?;
        writeln!(out, "{CYAN}template{RESET} {}", result.template)?;
        writeln!(out, "{CYAN}output{RESET}   {}", result.output)?;
        writeln!(
            out,
            "{GREEN}matched {} of {} rows{RESET}",
            result.matched, result.rows
        )?;
        if !result.unmatched_template.is_empty() {
            writeln!(
                out,
                "{YELLOW}{} TEMPLATE rows without SOURCE tags{RESET}",
                result.unmatched_template.len()
            )?;
        }

        let width = result
            .tags
            .iter()
            .map(|tag| tag.name.len())
            .max()
            .unwrap_or(0)
            .max("Name".len());
        writeln!(out)?;
        writeln!(out, "{BOLD}Migrated Curator Tags{RESET}")?;
        writeln!(out, "{:<width$}  {:>9}  {:>6}", "Name", "#migrated", "#TRUE")?;
        for tag in &result.tags {
            writeln!(
                out,
                "{:<width$}  {:>9}  {GREEN}{:>6}{RESET}",
                tag.name, tag.migrated, tag.truthy
            )?;
        }

        for rename in &result.renamed_sites {
            writeln!(
                out,
                "{CYAN}Renamed {} alias{RESET} {} --> {} ({} rows)",
                rename.family, rename.from, rename.to, rename.rows
            )?;
        }
        Ok(())
    }

    pub fn print_diff(result: &DiffResult) -> io::Result<()> {
        let report = &result.report;
        let mut columns = vec!["Code".to_string(), "Long code".to_string()];
        columns.extend(report.tags.iter().cloned());

        let table: Vec<Vec<String>> = report
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![row.code.clone(), row.long_code.clone()];
                cells.extend(report.tags.iter().map(|tag| {
                    row.tags
                        .get(tag)
                        .map(|side| side.as_str().to_string())
                        .unwrap_or_default()
                }));
                cells
            })
            .collect();

        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(index, name)| {
                table
                    .iter()
                    .map(|cells| cells[index].len())
                    .max()
                    .unwrap_or(0)
                    .max(name.len())
            })
            .collect();

        let mut out = io::stdout().lock();
        writeln!(out, "{CYAN}a{RESET} = {}", result.a)?;
        writeln!(out, "{YELLOW}b{RESET} = {}", result.b)?;
        let header: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(name, &width)| format!("{name:^width$}"))
            .collect();
        writeln!(out, "{BOLD}{}{RESET}", header.join("  "))?;
        for cells in &table {
            let line: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| {
                    let padded = format!("{cell:^width$}");
                    match cell.as_str() {
                        "a" => format!("{CYAN}{padded}{RESET}"),
                        "b" => format!("{YELLOW}{padded}{RESET}"),
                        _ => padded,
                    }
                })
                .collect();
            writeln!(out, "{}", line.join("  "))?;
        }
        Ok(())
    }
}
