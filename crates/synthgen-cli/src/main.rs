use std::{env, path::PathBuf, process::ExitCode, time::Instant};

use synthgen::{Interpreter, ResourceLimits, Scope};

struct Args {
    source_path: String,
    out_file: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    dict_dir: Option<PathBuf>,
    seed: Option<u64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(env::args().skip(1).collect()) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {err}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let source = match std::fs::read_to_string(&args.source_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error reading {}: {err}", args.source_path);
            return ExitCode::FAILURE;
        }
    };

    let mut interpreter = match args.seed {
        Some(seed) => Interpreter::with_seed(seed),
        None => Interpreter::new(),
    };
    interpreter = interpreter.with_limits(ResourceLimits::default());
    if let Some(dir) = &args.dict_dir {
        interpreter = interpreter.with_dictionary_dir(dir.clone());
    }

    let scope = Scope::root();
    let start = Instant::now();
    if let Err(err) = interpreter.interpret(&source, &args.source_path, &scope) {
        eprintln!("error after {:?}: {err}", start.elapsed());
        return ExitCode::FAILURE;
    }

    let write_result = match (&args.out_file, &args.out_dir) {
        (Some(file), _) => interpreter.write_to_file(file),
        (None, Some(dir)) => interpreter.write_file_per_key(dir),
        (None, None) => interpreter.write_to_file(&PathBuf::from("out.jsonl")),
    };
    if let Err(err) = write_result {
        eprintln!("error writing output: {err}");
        return ExitCode::FAILURE;
    }

    eprintln!(
        "generated {} records across {} entities in {:?}",
        interpreter.output().total_records(),
        interpreter.output().keys().count(),
        start.elapsed()
    );
    ExitCode::SUCCESS
}

fn parse_args(raw: Vec<String>) -> Result<Args, String> {
    let mut source_path = None;
    let mut out_file = None;
    let mut out_dir = None;
    let mut dict_dir = None;
    let mut seed = None;

    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out" => out_file = Some(PathBuf::from(iter.next().ok_or("--out requires a path")?)),
            "--out-dir" => out_dir = Some(PathBuf::from(iter.next().ok_or("--out-dir requires a path")?)),
            "--dict-dir" => dict_dir = Some(PathBuf::from(iter.next().ok_or("--dict-dir requires a path")?)),
            "--seed" => {
                let raw = iter.next().ok_or("--seed requires a number")?;
                seed = Some(raw.parse::<u64>().map_err(|_| format!("invalid --seed value {raw}"))?);
            }
            other if source_path.is_none() => source_path = Some(other.to_owned()),
            other => return Err(format!("unexpected argument {other}")),
        }
    }

    Ok(Args {
        source_path: source_path.ok_or("missing source file argument")?,
        out_file,
        out_dir,
        dict_dir,
        seed,
    })
}

fn print_usage() {
    eprintln!("usage: synthgen <source.lang> [--out <file>] [--out-dir <dir>] [--dict-dir <dir>] [--seed <n>]");
}
