//! Command implementations.

use crate::libfile;
use silica_config::SynthConfig;
use silica_cuts::CutExtractorConfig;
use silica_diagnostics::DiagnosticSink;
use silica_library::{SCLibrary, WireLoadSelection};
use silica_map::{premap, Basis, CostVector, Criterion, Dimension, MapperConfig, PBoolMatcher, TechMapper};
use silica_opt::rewriter::cost_cells;
use silica_opt::{MmSynthesizer, Rewriter, RewriterConfig, SubnetTransformer};
use silica_subnet::{Subnet, SubnetBuilder};

const OK: i32 = 0;
const BAD_INPUT: i32 = 1;
const SYNTH_FAILED: i32 = 2;

/// Prints entry counts and depth of a subnet.
pub fn stats(path: &str) -> i32 {
    let Some(subnet) = load_subnet(path) else {
        return BAD_INPUT;
    };
    let builder = SubnetBuilder::from_subnet(&subnet);
    let depth = builder
        .output_ids()
        .iter()
        .map(|&out| builder.depth(out))
        .max()
        .unwrap_or(0);
    println!("inputs:  {}", subnet.in_num());
    println!("outputs: {}", subnet.out_num());
    println!("cells:   {}", subnet.inner_num());
    println!("depth:   {depth}");
    OK
}

/// Runs the SOP rewriter over a subnet.
pub fn rewrite(path: &str, output: &str, config_path: &str) -> i32 {
    let Some(subnet) = load_subnet(path) else {
        return BAD_INPUT;
    };
    let config = match SynthConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return BAD_INPUT;
        }
    };

    let mut builder = SubnetBuilder::from_subnet(&subnet);
    if let Err(e) = builder.validate() {
        eprintln!("error: malformed input subnet: {e}");
        return BAD_INPUT;
    }

    let sink = DiagnosticSink::new();
    let synthesizer = MmSynthesizer;
    let rewriter = Rewriter::new(
        "sop-rewrite",
        &synthesizer,
        RewriterConfig {
            k: config.rewrite.cut_size,
            max_cuts: config.rewrite.max_cuts,
            max_arity: config.rewrite.max_arity,
            zero_cost: config.rewrite.zero_cost,
        },
        cost_cells,
    );
    rewriter.transform(&mut builder, &sink);
    flush_diagnostics(&sink);

    if save_subnet(&builder.make(), output) {
        OK
    } else {
        BAD_INPUT
    }
}

/// Maps a subnet onto a library.
pub fn map(
    subnet_path: &str,
    library_path: &str,
    output: &str,
    report: bool,
    config_path: &str,
) -> i32 {
    let Some(subnet) = load_subnet(subnet_path) else {
        return BAD_INPUT;
    };
    let config = match SynthConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return BAD_INPUT;
        }
    };
    let library_text = match std::fs::read_to_string(library_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: cannot read library {library_path}: {e}");
            return BAD_INPUT;
        }
    };
    let records = match libfile::parse(&library_text) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("error: bad library {library_path}: {e}");
            return BAD_INPUT;
        }
    };

    let sink = DiagnosticSink::new();
    let library = match SCLibrary::build(
        records,
        vec![],
        WireLoadSelection::default(),
        None,
        &sink,
    ) {
        Ok(library) => library,
        Err(e) => {
            flush_diagnostics(&sink);
            eprintln!("error: {e}");
            return BAD_INPUT;
        }
    };

    let premapped = premap(&subnet, Basis::Aig);
    let matcher = PBoolMatcher::new(&library);
    let mapper = TechMapper::new(
        "techmap",
        &library,
        &matcher,
        criterion_from(&config),
        MapperConfig {
            cut: CutExtractorConfig {
                k: config.map.cut_size,
                max_cuts: config.map.max_cuts,
            },
            max_tries: config.map.max_tries,
            enable_recovery: config.map.recovery,
        },
    );

    match mapper.map(&premapped, &sink) {
        Ok(outcome) => {
            flush_diagnostics(&sink);
            if report {
                let json = serde_json::json!({
                    "cells": outcome.mapped.inner_num(),
                    "area": outcome.vector.area,
                    "delay": outcome.vector.delay,
                    "power": outcome.vector.power,
                    "feasible": outcome.feasible,
                });
                println!("{json}");
            }
            if save_subnet(&outcome.mapped, output) {
                OK
            } else {
                BAD_INPUT
            }
        }
        Err(e) => {
            flush_diagnostics(&sink);
            eprintln!("error: {e}");
            SYNTH_FAILED
        }
    }
}

fn criterion_from(config: &SynthConfig) -> Criterion {
    let bounds = CostVector::new(
        config.map.max_area.unwrap_or(f32::MAX),
        config.map.max_delay.unwrap_or(f32::MAX),
        config.map.max_power.unwrap_or(f32::MAX),
    );
    let priority = match config.map.primary.as_str() {
        "delay" => [Dimension::Delay, Dimension::Area, Dimension::Power],
        "power" => [Dimension::Power, Dimension::Area, Dimension::Delay],
        _ => [Dimension::Area, Dimension::Delay, Dimension::Power],
    };
    Criterion { bounds, priority }
}

fn load_subnet(path: &str) -> Option<Subnet> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: cannot read subnet {path}: {e}");
            return None;
        }
    };
    match bincode::serde::decode_from_slice(&bytes, bincode::config::standard()) {
        Ok((subnet, _)) => Some(subnet),
        Err(e) => {
            eprintln!("error: {path} is not a subnet file: {e}");
            None
        }
    }
}

fn save_subnet(subnet: &Subnet, path: &str) -> bool {
    let bytes = match bincode::serde::encode_to_vec(subnet, bincode::config::standard()) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: cannot serialize subnet: {e}");
            return false;
        }
    };
    if let Err(e) = std::fs::write(path, bytes) {
        eprintln!("error: cannot write {path}: {e}");
        return false;
    }
    true
}

fn flush_diagnostics(sink: &DiagnosticSink) {
    let events = sink.take_events();
    let mut stderr = std::io::stderr();
    let _ = silica_diagnostics::render(&events, &mut stderr);
}
