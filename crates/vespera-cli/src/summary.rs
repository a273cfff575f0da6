use std::path::Path;

use console::Style;
use vespera_core::config::Configuration;
use vespera_core::io::fits::IntegrationEstimate;
use vespera_core::layout::InputLayout;
use vespera_core::pipeline::{RunSummary, Severity};
use vespera_core::registry::Registry;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    success: Style,
    warning: Style,
    error: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red().bold(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!(
        "  {}",
        s.title.apply_to("\u{2550}".repeat(title.chars().count()))
    );
    println!();
}

fn on_off(s: &Styles, enabled: bool) -> String {
    if enabled {
        s.method.apply_to("on").to_string()
    } else {
        s.disabled.apply_to("off").to_string()
    }
}

/// One run-log line, styled by severity.
pub fn format_log(message: &str, severity: Severity) -> String {
    let s = Styles::new();
    match severity {
        Severity::Info => format!("  {}", s.label.apply_to(message)),
        Severity::Success => format!("  {}", s.success.apply_to(message)),
        Severity::Warning => format!("  {}", s.warning.apply_to(message)),
        Severity::Error => format!("  {}", s.error.apply_to(message)),
    }
}

pub fn format_finished(summary: &str, success: bool) -> String {
    let s = Styles::new();
    if success {
        format!("  {}", s.success.apply_to(summary).bold())
    } else {
        format!("  {}", s.error.apply_to(summary))
    }
}

pub fn print_run_summary(workdir: &Path, config: &Configuration, engine_name: &str) {
    let s = Styles::new();
    print_title(&s, "Vespera Preprocessing");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Directory"),
        s.path.apply_to(workdir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Engine"),
        s.method.apply_to(engine_name)
    );
    println!();

    println!("  {}", s.header.apply_to("Presets"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Filter"),
        s.value.apply_to(&config.filter)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Sky"),
        s.value.apply_to(&config.sky_quality)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Stacking"),
        s.value.apply_to(&config.stacking)
    );
    println!();

    println!("  {}", s.header.apply_to("Options"));
    if config.feather > 0 {
        println!(
            "    {:<12}{} px",
            s.label.apply_to("Feather"),
            s.value.apply_to(config.feather)
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Feather"),
            s.disabled.apply_to("off")
        );
    }
    println!("    {:<12}{}", s.label.apply_to("Two-pass"), on_off(&s, config.two_pass));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Background"),
        on_off(&s, config.auto_background_extraction)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("PCC"),
        on_off(&s, config.auto_color_calibration)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Keep temp"),
        on_off(&s, config.keep_temp_files)
    );
    println!();
}

pub fn print_outputs(summary: &RunSummary) {
    let s = Styles::new();
    println!();
    println!("  {}", s.header.apply_to("Outputs"));
    for artifact in &summary.artifacts {
        println!("    {}", s.path.apply_to(artifact.path.display()));
    }
    if summary.cleanup.removed > 0 || summary.cleanup.failed > 0 {
        println!(
            "    {:<12}{} removed, {} failed",
            s.label.apply_to("Cleanup"),
            summary.cleanup.removed,
            summary.cleanup.failed
        );
    }
    if !summary.warnings.is_empty() {
        println!("  {}", s.header.apply_to("Warnings"));
        for warning in &summary.warnings {
            println!("    {}", s.warning.apply_to(warning));
        }
    }
}

pub fn format_integration(estimate: &IntegrationEstimate) -> String {
    let total = estimate.total_seconds.round() as u64;
    let (h, m, sec) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut text = format!(
        "{h}h {m:02}m {sec:02}s over {} frame(s)",
        estimate.frames_with_exposure
    );
    if estimate.frames_without_exposure > 0 {
        text.push_str(&format!(
            ", {} without exposure",
            estimate.frames_without_exposure
        ));
    }
    text
}

pub fn print_layout(
    workdir: &Path,
    layout: &InputLayout,
    integration: Option<&IntegrationEstimate>,
) {
    let s = Styles::new();
    print_title(&s, "Input Layout");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Directory"),
        s.path.apply_to(workdir.display())
    );
    let structure = if layout.is_resolved() {
        s.method.apply_to(layout.to_string())
    } else {
        s.error.apply_to(layout.to_string())
    };
    println!("  {:<14}{}", s.label.apply_to("Structure"), structure);
    println!(
        "  {:<14}{}",
        s.label.apply_to("Darks"),
        s.value.apply_to(layout.dark_count())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Lights"),
        s.value.apply_to(layout.light_count())
    );
    if let InputLayout::Native {
        reference_images, ..
    } = layout
    {
        println!(
            "  {:<14}{}",
            s.label.apply_to("References"),
            s.value.apply_to(reference_images.len())
        );
    }
    if let Some(estimate) = integration {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Integration"),
            s.value.apply_to(format_integration(estimate))
        );
    }
    if let Some(missing) = layout.missing() {
        println!();
        println!("  {}", s.error.apply_to(format!("No {missing} found")));
    }
    println!();
}

pub fn print_presets(registry: &Registry) {
    let s = Styles::new();
    print_title(&s, "Vespera Presets");

    let sensor = &registry.sensor;
    println!("  {}", s.header.apply_to("Sensor"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Name"),
        s.value.apply_to(&sensor.name)
    );
    println!(
        "    {:<12}{} ({}x{}, {:.1} um, {}-bit)",
        s.label.apply_to("Bayer"),
        s.value.apply_to(&sensor.bayer_pattern),
        sensor.resolution.0,
        sensor.resolution.1,
        sensor.pixel_size_um,
        sensor.bit_depth
    );
    println!();

    println!("  {}", s.header.apply_to("Filters"));
    for filter in &registry.filters {
        println!(
            "    {:<36}{}",
            s.value.apply_to(&filter.name),
            s.method.apply_to(&filter.kind)
        );
        if !filter.description.is_empty() {
            println!("      {}", s.label.apply_to(&filter.description));
        }
    }
    println!();

    println!("  {}", s.header.apply_to("Sky Quality"));
    for sky in &registry.skies {
        println!(
            "    {:<36}sigma {}/{}, {} samples, tolerance {}",
            s.value.apply_to(&sky.name),
            sky.sigma_low,
            sky.sigma_high,
            sky.background_samples,
            sky.background_tolerance
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Stacking"));
    for method in &registry.stacking {
        let detail = match &method.drizzle {
            Some(d) => s.method.apply_to(format!(
                "drizzle x{}, pixfrac {}, {} / {}",
                d.scale, d.pixel_fraction, d.kernel, d.interpolation
            )),
            None => s.disabled.apply_to("debayer + register".to_string()),
        };
        println!("    {:<36}{}", s.value.apply_to(&method.name), detail);
    }
    println!();
}
