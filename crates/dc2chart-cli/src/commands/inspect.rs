//! Inspect command - show how documents would be dispatched

use console::style;
use dc2chart_convert::{Classifier, FsSource, SourceStore, WarningSeverity};
use std::path::Path;

use crate::error::Result;

pub fn run(input: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let source = FsSource::new(input)?;
    let classifier = Classifier::new(&config);

    let mut documents = 0;
    let mut failed = 0;

    let listing = source.list()?;
    for failure in &listing.failures {
        failed += 1;
        println!("{}", style(failure.path.display()).bold());
        println!("  {} {}", style("✗").red().bold(), failure.message);
        println!();
    }

    for path in listing.files {
        let rel_path = path.strip_prefix(input).unwrap_or(&path);
        let display = if rel_path.as_os_str().is_empty() {
            path.display()
        } else {
            rel_path.display()
        };
        println!("{}", style(display).bold());

        let classification = source
            .read(&path)
            .and_then(|file| classifier.classify(&file));
        let classification = match classification {
            Ok(classification) => classification,
            Err(e) => {
                failed += 1;
                println!("  {} {}", style("✗").red().bold(), e);
                println!();
                continue;
            }
        };

        for doc in &classification.documents {
            documents += 1;
            println!(
                "  {:22} {:28} {} {:16} {} {}",
                doc.kind.as_str(),
                if doc.name.is_empty() { "-" } else { doc.name.as_str() },
                style("app").dim(),
                if doc.application.is_empty() { "-" } else { doc.application.as_str() },
                style("rule").dim(),
                style(doc.rule.name()).cyan()
            );
        }
        if !classification.parameters.is_empty() {
            let names: Vec<_> = classification.parameters.iter().map(|p| p.name.as_str()).collect();
            println!("  {} {}", style("parameters:").dim(), names.join(", "));
        }
        for warning in classification.diagnostics.iter() {
            let icon = match warning.severity {
                WarningSeverity::Info => style("ℹ").cyan(),
                WarningSeverity::Warning => style("⚠").yellow(),
                WarningSeverity::Error => style("✗").red().bold(),
            };
            println!("  {} {}", icon, warning.message);
        }
        println!();
    }

    println!(
        "{} {} document{}",
        style("Total:").bold(),
        documents,
        if documents == 1 { "" } else { "s" }
    );
    if failed > 0 {
        println!(
            "{} {} file{} could not be read",
            style("Failed:").bold().red(),
            failed,
            if failed == 1 { "" } else { "s" }
        );
    }

    Ok(())
}
