/**
 * kt-features
 * Copyright (C) 2019 The kt-features authors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::env;
use std::path::PathBuf;
use std::process;

use getopts::{Matches, Options};
use tracing::error;

use kt_features::utils;
use kt_features::{PipelineConfig, Stage};

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("c", "config", "JSON configuration file (optional). Settings missing from the \
        file fall back to the Assist09 defaults.", "PATH");
    opts.optopt("d", "dataset", "Dataset preset to use when no configuration file is given, \
        either Assist09 (multiple skills per problem) or Assist12 (one skill per problem). \
        Defaults to Assist09.", "NAME");
    opts.optopt("s", "stage", "Run a single stage (clean, ids, relations, difficulty, mastery, \
        similarity or correlation) instead of the whole feature pipeline.", "STAGE");
    opts.optopt("i", "data-dir", "Directory holding the raw log and all derived artifacts \
        (optional, defaults to <dataset>/Data).", "PATH");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None);
    }

    let config = match configure(&matches) {
        Ok(config) => config,
        Err(hint) => return print_usage_and_exit(&program, opts, Some(&hint)),
    };

    let stage = match matches.opt_str("s") {
        Some(name) => match name.parse::<Stage>() {
            Ok(stage) => Some(stage),
            Err(hint) => return print_usage_and_exit(&program, opts, Some(&hint)),
        },
        None => None,
    };

    utils::init_logging();

    let result = match stage {
        Some(stage) => kt_features::run(stage, &config),
        None => kt_features::run_features(&config),
    };

    if let Err(failure) = result {
        error!("{}", failure);
        process::exit(1);
    }
}

fn configure(matches: &Matches) -> Result<PipelineConfig, String> {

    let mut config = match (matches.opt_str("c"), matches.opt_str("d")) {
        (Some(path), _) => PipelineConfig::from_file(&path)
            .map_err(|failure| format!("Cannot read configuration {}: {}", path, failure))?,
        (None, Some(name)) => PipelineConfig::preset(&name)
            .ok_or_else(|| format!("Unknown dataset '{}', use Assist09 or Assist12.", name))?,
        (None, None) => PipelineConfig::default(),
    };

    if let Some(data_dir) = matches.opt_str("i") {
        config.data_dir = Some(PathBuf::from(data_dir));
    }

    Ok(config)
}

fn print_usage_and_exit(
    program: &str,
    opts: Options,
    hint: Option<&str>
) -> ! {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));

    process::exit(if hint.is_some() { 2 } else { 0 })
}
