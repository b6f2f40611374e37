use std::path::PathBuf;
use std::process::ExitCode;

use ::server::config::Config;
use ::server::domain::UploadedImage;
use ::server::{pipeline, upload, AppState};
use comfy_table::{presets::UTF8_HORIZONTAL_ONLY, Attribute, Cell, ContentArrangement, Table};
use kernel::Analysis;

/// Labels a local image in place, without copying it to the upload directory.
pub async fn run(file: &str, json: bool) -> ExitCode {
    ::server::init_tracing();

    let path = PathBuf::from(file);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_owned();
    if let Err(e) = upload::validate(&file_name) {
        eprintln!("{file}: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = tokio::fs::create_dir_all(&config.results_dir).await {
        eprintln!("{}: {e}", config.results_dir.display());
        return ExitCode::FAILURE;
    }
    let state = match AppState::from_config(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let image = UploadedImage { path, file_name };
    match pipeline::process_image(&state, &image).await {
        Ok(analysis) => {
            if json {
                match serde_json::to_string_pretty(&analysis) {
                    Ok(s) => println!("{s}"),
                    Err(e) => {
                        eprintln!("{e}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                print_table(&analysis);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            e.log();
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn print_table(analysis: &Analysis) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Label").add_attribute(Attribute::Bold),
        ]);

    for (i, label) in analysis.labels.iter().enumerate() {
        table.add_row(vec![Cell::new(i + 1), Cell::new(label)]);
    }
    println!("{table}");
    println!("Results saved to {}", analysis.output_path);
}
