mod export;
mod options;
mod progress;
mod render;

use anyhow::{anyhow, Error as AnyError};
use clap::Parser;
use options::{Cli, Command as CliCmd};
use serde::Serialize;
use std::io::Write;
use suitability::{CatalogSource, Composite, ConstraintCounts, CropParams, SuitabilityModel};

fn main() -> Result<(), AnyError> {
    let Cli {
        catalog_dir,
        crop,
        mode,
        cmd,
    } = Cli::parse();

    env_logger::init();

    let crop = match crop {
        Some(path) => CropParams::from_file(path)?,
        None => CropParams::sweet_corn(),
    };
    let source = CatalogSource::new(catalog_dir, mode.into())?;
    let model = SuitabilityModel::builder().crop(crop).build(&source)?;

    match cmd {
        CliCmd::Render { out_dir, width } => {
            let composites = evaluate(&model)?;
            for path in render::render_all(&out_dir, width, model.scenarios(), &composites)? {
                eprintln!("wrote {}", path.display());
            }
            print_text(&composites)
        }
        CliCmd::Summary { json } => {
            let composites = evaluate(&model)?;
            if json {
                print_json(&composites)
            } else {
                print_text(&composites)
            }
        }
        CliCmd::Export {
            scenario,
            out,
            scale,
            region,
        } => {
            let scenario = model.scenario(&scenario).ok_or_else(|| {
                let ids: Vec<&str> = model.scenarios().iter().map(|s| s.id.as_str()).collect();
                anyhow!("unknown scenario '{scenario}', expected one of {}", ids.join(", "))
            })?;
            let composite = model.evaluate(scenario)?;
            export::export(composite.layer(), region.0, scale, &out)?;
            eprintln!("wrote {}", out.display());
            Ok(())
        }
    }
}

/// Evaluates every scenario in parallel with a progress bar.
fn evaluate(model: &SuitabilityModel<'_>) -> Result<Vec<Composite>, AnyError> {
    let pb = progress::bar(
        "Evaluating scenarios".to_string(),
        model.scenarios().len() as u64,
    );
    let composites = model.evaluate_all_with(|_| pb.inc(1))?;
    pb.finish_and_clear();
    Ok(composites)
}

fn print_text(composites: &[Composite]) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    for composite in composites {
        let ConstraintCounts {
            cells,
            ph,
            temperature,
            precipitation,
            suitable,
        } = composite.counts();
        writeln!(
            stdout,
            "{:<24} {suitable:>10} / {cells} suitable (pH {ph}, temperature {temperature}, precipitation {precipitation})",
            composite.label()
        )?;
    }
    Ok(())
}

fn print_json(composites: &[Composite]) -> Result<(), AnyError> {
    println!("{}", summary_json(composites)?);
    Ok(())
}

/// One object per composite: its label and flattened counts.
fn summary_json(composites: &[Composite]) -> Result<String, AnyError> {
    #[derive(Serialize)]
    struct JsonEntry<'a> {
        label: &'a str,
        #[serde(flatten)]
        counts: ConstraintCounts,
    }

    let reshaped: Vec<JsonEntry<'_>> = composites
        .iter()
        .map(|composite| JsonEntry {
            label: composite.label(),
            counts: composite.counts(),
        })
        .collect();
    Ok(serde_json::to_string(&reshaped)?)
}
