//! Convert command - OpenShift manifests to Helm charts
//!
//! Reads a manifest file or directory, groups its resources by application
//! and writes one chart per application below the output directory.

use console::style;
use dc2chart_convert::{
    ConversionResult, ConversionWarning, ConvertConfig, Converter, WarningCategory, WarningSeverity,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

/// Command-line settings layered over the loaded configuration
#[derive(Debug, Default)]
pub struct Overrides {
    pub registry: Option<String>,
    pub output: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub no_source_namespace: bool,
    pub chart_version: Option<String>,
    pub app_version: Option<String>,
    pub description: Option<String>,
    pub force: bool,
    pub dry_run: bool,
}

impl Overrides {
    /// Flags only ever switch options on; unset options keep the file's value
    pub fn apply(self, mut config: ConvertConfig) -> ConvertConfig {
        if let Some(registry) = self.registry {
            config.registry_host = Some(registry);
        }
        if let Some(output) = self.output {
            config.output_root = output;
        }
        if let Some(work_dir) = self.work_dir {
            config.working_root = Some(work_dir);
        }
        if self.no_source_namespace {
            config.include_source_namespace = false;
        }
        if let Some(version) = self.chart_version {
            config.chart_version = version;
        }
        if let Some(version) = self.app_version {
            config.app_version = version;
        }
        if let Some(description) = self.description {
            config.description = description;
        }
        config.force |= self.force;
        config.dry_run |= self.dry_run;
        config
    }
}

pub fn run(input: &Path, config_path: Option<&Path>, overrides: Overrides, verbose: bool) -> Result<()> {
    let config = overrides.apply(super::load_config(config_path)?);
    config.validate()?;

    print_header(input, &config);

    let converter = Converter::new(config);
    let result = converter.convert(input)?;
    let config = converter.config();

    print_bundles(&result, &config.output_root);
    print_skipped(&result, input);
    print_warnings(&result, input, verbose);
    print_summary(&result);
    print_next_steps(&result, config.dry_run);

    let errors = result.count(WarningSeverity::Error);
    if errors > 0 {
        return Err(CliError::CompletedWithErrors { errors });
    }
    Ok(())
}

fn print_header(input: &Path, config: &ConvertConfig) {
    println!();
    println!(
        "  {} {} {}",
        style("dc2chart convert").bold().cyan(),
        style("─").dim(),
        style("OpenShift → Helm").dim()
    );
    println!();
    println!(
        "  {} {} {}",
        style("Source:").dim(),
        style(input.display()).cyan(),
        style("(OpenShift manifests)").dim()
    );
    println!(
        "  {} {} {}",
        style("Target:").dim(),
        style(config.output_root.display()).green(),
        style("(Helm charts)").dim()
    );
    if let Some(registry) = config.registry() {
        println!("  {} {}", style("Registry:").dim(), registry);
    }
    if let Some(work) = &config.working_root {
        println!("  {} {}", style("Work dir:").dim(), work.display());
    }
    println!();
}

fn print_bundles(result: &ConversionResult, output_root: &Path) {
    println!("  {}", style("Charts").bold());
    println!("  {}", style("──────").dim());

    if result.bundles.is_empty() {
        println!("  {}", style("no charts produced").dim());
    }

    for bundle in &result.bundles {
        println!(
            "  {} {} {}",
            style("✓").green().bold(),
            style(&bundle.name).bold(),
            style(format!(
                "({} template{})",
                bundle.templates,
                if bundle.templates == 1 { "" } else { "s" }
            ))
            .dim()
        );
        for file in &bundle.files {
            let rel_path = file.strip_prefix(output_root).unwrap_or(file);
            println!("      {}", style(rel_path.display()).dim());
        }
    }
    println!();
}

fn print_skipped(result: &ConversionResult, input: &Path) {
    if result.skipped_files.is_empty() {
        return;
    }

    println!("  {}", style("Skipped Files").bold().yellow());
    println!("  {}", style("─────────────").dim());
    for file in &result.skipped_files {
        println!("  {} {}", style("○").yellow(), relative_to_input(file, input).display());
    }
    println!();
}

fn print_warnings(result: &ConversionResult, input: &Path, verbose: bool) {
    let shown: Vec<_> = result
        .warnings
        .iter()
        .filter(|w| verbose || w.severity != WarningSeverity::Info)
        .collect();

    if shown.is_empty() {
        let info_count = result.count(WarningSeverity::Info);
        if info_count > 0 {
            println!(
                "  {} {} {} {}",
                style("ℹ").cyan(),
                info_count,
                style("adjustments applied").dim(),
                style("(use --verbose to see details)").dim()
            );
            println!();
        }
        return;
    }

    let mut by_category: BTreeMap<WarningCategory, Vec<&ConversionWarning>> = BTreeMap::new();
    for warning in shown {
        by_category.entry(warning.category).or_default().push(warning);
    }

    println!("  {}", style("Conversion Notes").bold());
    println!("  {}", style("────────────────").dim());
    println!();

    for (category, warnings) in by_category {
        println!(
            "  {} {}",
            style(category_label(category)).yellow().bold(),
            style(format!("─ {}", category_hint(category))).dim()
        );
        for warning in warnings {
            print_warning(warning, input);
        }
        println!();
    }
}

fn category_label(category: WarningCategory) -> &'static str {
    match category {
        WarningCategory::Structure => "Structure",
        WarningCategory::UnknownKind => "Unknown kinds",
        WarningCategory::Parse => "Parse",
        WarningCategory::Values => "Values",
        WarningCategory::Parameters => "Parameters",
        WarningCategory::Output => "Output",
    }
}

fn category_hint(category: WarningCategory) -> &'static str {
    match category {
        WarningCategory::Structure => "fields that could not be migrated",
        WarningCategory::UnknownKind => "documents left out",
        WarningCategory::Parse => "files that could not be read",
        WarningCategory::Values => "review values.yaml",
        WarningCategory::Parameters => "template parameters to set",
        WarningCategory::Output => "charts not written",
    }
}

fn print_warning(warning: &ConversionWarning, input: &Path) {
    let icon = match warning.severity {
        WarningSeverity::Info => style("ℹ").cyan(),
        WarningSeverity::Warning => style("⚠").yellow(),
        WarningSeverity::Error => style("✗").red().bold(),
    };

    let mut location = relative_to_input(&warning.file, input).display().to_string();
    if let Some(resource) = &warning.resource {
        if location.is_empty() {
            location = resource.clone();
        } else {
            location = format!("{} ({})", location, resource);
        }
    }

    println!("    {} {}", icon, warning.message);
    if !location.is_empty() {
        let field = warning
            .field
            .as_ref()
            .map(|f| format!(" at {}", f))
            .unwrap_or_default();
        println!("      {}", style(format!("in {}{}", location, field)).dim());
    }
    if let Some(suggestion) = &warning.suggestion {
        println!("      {} {}", style("→").green(), suggestion);
    }
}

fn relative_to_input<'a>(file: &'a Path, input: &Path) -> &'a Path {
    if input.is_dir() {
        file.strip_prefix(input).unwrap_or(file)
    } else {
        file
    }
}

fn print_summary(result: &ConversionResult) {
    let charts = result.bundles.len();
    let processed = result.processed_files.len();
    let skipped = result.skipped_files.len();
    let errors = result.count(WarningSeverity::Error);
    let warnings = result.count(WarningSeverity::Warning);

    println!("  {}", style("Summary").bold());
    println!("  {}", style("───────").dim());

    println!(
        "  {} {} read",
        style(format!("{:>3}", processed)).green().bold(),
        style(if processed == 1 { "file" } else { "files" }).dim()
    );
    println!(
        "  {} {} assembled",
        style(format!("{:>3}", charts)).green().bold(),
        style(if charts == 1 { "chart" } else { "charts" }).dim()
    );
    if !result.intermediate_files.is_empty() {
        println!(
            "  {} {} kept in the work dir",
            style(format!("{:>3}", result.intermediate_files.len())).blue().bold(),
            style("documents").dim()
        );
    }
    if skipped > 0 {
        println!(
            "  {} {} skipped",
            style(format!("{:>3}", skipped)).yellow().bold(),
            style(if skipped == 1 { "file" } else { "files" }).dim()
        );
    }
    if errors > 0 {
        println!(
            "  {} error{}",
            style(format!("{:>3}", errors)).red().bold(),
            if errors == 1 { "" } else { "s" }
        );
    }
    if warnings > 0 {
        println!(
            "  {} warning{} {}",
            style(format!("{:>3}", warnings)).yellow().bold(),
            if warnings == 1 { "" } else { "s" },
            style("(review recommended)").dim()
        );
    }
    println!();
}

fn print_next_steps(result: &ConversionResult, dry_run: bool) {
    if dry_run {
        println!(
            "  {} {}",
            style("ℹ").cyan(),
            style("Dry run mode - no files were written").dim()
        );
        println!();
        return;
    }

    let Some(first) = result.bundles.first() else {
        return;
    };
    let chart_dir = first
        .files
        .first()
        .and_then(|chart_file| chart_file.parent())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&first.name));

    println!("  {}", style("Next Steps").bold());
    println!("  {}", style("──────────").dim());
    println!(
        "  {} {}",
        style("1.").dim(),
        style(format!("helm lint {}", chart_dir.display())).cyan()
    );
    println!("     {}", style("Validate the generated chart").dim());
    println!();
    println!(
        "  {} {}",
        style("2.").dim(),
        style(format!("helm template {} {}", first.name, chart_dir.display())).cyan()
    );
    println!("     {}", style("Render it with the extracted values").dim());
    println!();
}
