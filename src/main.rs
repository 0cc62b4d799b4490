// Copyright 2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod cli;
mod config;
mod delivery;
mod endpoints;
mod error;
mod exporter;
mod http;
mod jira;
mod locator;
mod render;
mod runner;
mod summary;
mod ui;

fn main() {
    env_logger::init();

    // Parse CLI arguments
    let args = match cli::CliArgs::parse_args() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            let _ = e.print();
            std::process::exit(0);
        }
        Err(e) => {
            let rendered = e.to_string();
            ui::print_error(rendered.trim_start_matches("error: ").trim_end());
            std::process::exit(1);
        }
    };

    // Validate arguments
    if let Err(e) = args.validate() {
        ui::print_error(&e);
        std::process::exit(1);
    }

    if let Err(e) = runner::run_command(&args) {
        ui::print_error(&e.to_string());
        std::process::exit(1);
    }
}
