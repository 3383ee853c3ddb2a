use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use aether_filters::filters::{build_command, build_preview_filter, FilterSet};
use aether_filters::preview::default_cache_dir;
use aether_filters::render::{timestamped_output_path, RenderEngine};

/// One-shot full-resolution apply: render a wallpaper through the filter
/// pipeline without the preview scheduler. Used for scripting and for
/// checking filter presets outside the app.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: aether-filters <source-image> [filters.json]");
        process::exit(2);
    }

    let source = PathBuf::from(&args[1]);

    let filters = match args.get(2) {
        Some(path) => {
            let json = fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("⚠️  Could not read {}: {}", path, e);
                process::exit(1);
            });
            FilterSet::from_json(&json).unwrap_or_else(|e| {
                eprintln!("⚠️  Could not parse {}: {}", path, e);
                process::exit(1);
            })
        }
        None => FilterSet::default(),
    };

    if !filters.has_active_filters() {
        println!("ℹ️  No active filters; output will match the source");
    }
    println!("🎛️  Preview expression: {}", build_preview_filter(&filters));

    let cache_dir = default_cache_dir();
    if let Err(e) = fs::create_dir_all(&cache_dir) {
        eprintln!("⚠️  Could not create cache directory: {}", e);
        process::exit(1);
    }

    let output = timestamped_output_path(&cache_dir, &source);
    let command = build_command(&source, &output, &filters);

    match RenderEngine::default().render(&command, &output).await {
        Ok(()) => println!("✅ Processed wallpaper written to {}", output.display()),
        Err(e) => {
            eprintln!("⚠️  {}", e);
            process::exit(1);
        }
    }
}
