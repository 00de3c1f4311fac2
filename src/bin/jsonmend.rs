use std::env;
use std::fs::File;
use std::io::{self, Read};

use memmap2::Mmap;

use jsonmend::{process, SanitizerConfig, TargetSchema};

fn parse_usize(arg: &str, name: &str) -> usize {
    arg.parse::<usize>()
        .unwrap_or_else(|_| panic!("invalid {name}: {arg}"))
}

fn parse_f64(arg: &str, name: &str) -> f64 {
    arg.parse::<f64>()
        .unwrap_or_else(|_| panic!("invalid {name}: {arg}"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut input_path: Option<String> = None;
    let mut schema_path: Option<String> = None;
    let mut lookback_window: Option<usize> = None;
    let mut max_diagnostics: Option<usize> = None;
    let mut min_confidence: Option<f64> = None;
    let mut compact = false;

    let args = env::args().skip(1).collect::<Vec<_>>();
    let mut i = 0;
    while i < args.len() {
        let a = &args[i];
        match a.as_str() {
            "--input" | "-i" => {
                i += 1;
                input_path = Some(args.get(i).expect("missing --input value").to_string());
            }
            "--schema" | "-s" => {
                i += 1;
                schema_path = Some(args.get(i).expect("missing --schema value").to_string());
            }
            "--lookback-window" => {
                i += 1;
                lookback_window = Some(parse_usize(
                    args.get(i).expect("missing --lookback-window value"),
                    "lookback_window",
                ));
            }
            "--max-diagnostics" => {
                i += 1;
                max_diagnostics = Some(parse_usize(
                    args.get(i).expect("missing --max-diagnostics value"),
                    "max_diagnostics",
                ));
            }
            "--min-confidence" => {
                i += 1;
                min_confidence = Some(parse_f64(
                    args.get(i).expect("missing --min-confidence value"),
                    "min_confidence",
                ));
            }
            "--compact" => compact = true,
            "--help" | "-h" => {
                eprintln!(
                    "Usage: jsonmend [--input FILE|-] [--schema FILE] \
                     [--lookback-window N] [--max-diagnostics N] [--min-confidence F] [--compact]\n\
                     Reads a raw model completion from stdin if no --input.\n\
                     Prints a JSON report with status, data and mutation steps."
                );
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown arg: {a}");
                std::process::exit(2);
            }
        }
        i += 1;
    }

    let mut buf: Vec<u8> = Vec::new();
    match input_path.as_deref() {
        Some(p) if p != "-" => {
            // Model response dumps can be large; map instead of reading.
            let file = File::open(p).unwrap_or_else(|e| panic!("failed to open {p}: {e}"));
            let mmap = unsafe { Mmap::map(&file) }.unwrap_or_else(|e| panic!("failed to map {p}: {e}"));
            buf.extend_from_slice(&mmap);
        }
        _ => {
            io::stdin()
                .read_to_end(&mut buf)
                .expect("stdin read failed");
        }
    }
    let raw = String::from_utf8_lossy(&buf);

    let schema = match schema_path.as_deref() {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .unwrap_or_else(|e| panic!("failed to read {p}: {e}"));
            let value = serde_json::from_str(&text)
                .unwrap_or_else(|e| panic!("invalid schema in {p}: {e}"));
            TargetSchema::new(value)
        }
        None => TargetSchema::new(serde_json::Value::Null),
    };

    let mut config = SanitizerConfig::for_schema(&schema);
    if let Some(w) = lookback_window {
        config.lookback_window = w;
    }
    if let Some(m) = max_diagnostics {
        config.max_diagnostics_per_strategy = m;
    }
    if let Some(c) = min_confidence {
        config.min_match_confidence = c;
    }

    let result = process(&raw, &config, &schema);
    let report = if compact {
        serde_json::to_string(&result)
    } else {
        serde_json::to_string_pretty(&result)
    };
    println!("{}", report.expect("report serialization failed"));
    std::process::exit(if result.is_success() { 0 } else { 2 });
}
