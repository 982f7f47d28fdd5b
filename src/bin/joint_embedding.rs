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

use getopts::Options;
use tracing::error;

use kt_features::utils;
use kt_features::{PipelineConfig, Stage};

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("c", "config", "JSON configuration file (optional).", "PATH");
    opts.optopt("d", "dataset", "Dataset preset, Assist09 or Assist12 (optional, defaults to \
        Assist09).", "NAME");
    opts.optopt("i", "data-dir", "Directory holding stu_pro_skill_corr.json (optional, \
        defaults to <dataset>/Data).", "PATH");
    opts.optopt("m", "model-dir", "Directory holding the final_stu_embed, final_pro_embed and \
        final_skill_embed archives. Joint embeddings and labels are written there as well \
        (optional, defaults to <dataset>/Model).", "PATH");
    opts.optopt("e", "embed-dim", "Dimension of the entity embeddings (optional, defaults to \
        128).", "NUMBER");
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

    let mut config = match (matches.opt_str("c"), matches.opt_str("d")) {
        (Some(path), _) => match PipelineConfig::from_file(&path) {
            Ok(config) => config,
            Err(failure) => {
                let hint = format!("Cannot read configuration {}: {}", path, failure);
                return print_usage_and_exit(&program, opts, Some(&hint))
            },
        },
        (None, Some(name)) => match PipelineConfig::preset(&name) {
            Some(config) => config,
            None => {
                let hint = format!("Unknown dataset '{}', use Assist09 or Assist12.", name);
                return print_usage_and_exit(&program, opts, Some(&hint))
            },
        },
        (None, None) => PipelineConfig::default(),
    };

    if let Some(data_dir) = matches.opt_str("i") {
        config.data_dir = Some(PathBuf::from(data_dir));
    }

    if let Some(model_dir) = matches.opt_str("m") {
        config.model_dir = Some(PathBuf::from(model_dir));
    }

    config.embed_dim = match matches.opt_get_default("e", config.embed_dim) {
        Ok(embed_dim) => embed_dim,
        Err(failure) => {
            let hint = format!("Problem with option 'e': {}", failure);
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    utils::init_logging();

    if let Err(failure) = kt_features::run(Stage::Joint, &config) {
        error!("{}", failure);
        process::exit(1);
    }
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
