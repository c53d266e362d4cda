//! Command-line interface for sectionizer
//! This binary detects sections in clinical note files and prints the result.
//!
//! Usage:
//!   sectionizer segment `<path>` [--patterns `<file>`] [--format `<format>`]  - Segment a note file
//!   sectionizer list-titles [--patterns `<file>`]                         - List known section titles

use clap::{Arg, ArgAction, Command};
use serde::Serialize;
use std::path::PathBuf;

use sectionizer::section::lexing;
use sectionizer::section::sectionizer::{
    PatternSource, PruneStrategy, Sectionizer, SectionizerConfig,
};
use sectionizer::section::token::Document;
use sectionizer::section::viz;
use sectionizer::Segmentation;

fn main() {
    env_logger::init();

    let matches = Command::new("sectionizer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for detecting sections in clinical notes")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("segment")
                .about("Detect sections in a note file")
                .arg(
                    Arg::new("path")
                        .help("Path to the note file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("patterns")
                        .long("patterns")
                        .short('p')
                        .help("Path to a JSONL rule file (defaults to the bundled rules)"),
                )
                .arg(
                    Arg::new("max-scope")
                        .long("max-scope")
                        .value_parser(clap::value_parser!(usize))
                        .help("Maximum number of body tokens after a header"),
                )
                .arg(
                    Arg::new("require-start-line")
                        .long("require-start-line")
                        .action(ArgAction::SetTrue)
                        .help("Only accept headers at the start of a line"),
                )
                .arg(
                    Arg::new("require-end-line")
                        .long("require-end-line")
                        .action(ArgAction::SetTrue)
                        .help("Only accept headers at the end of a line"),
                )
                .arg(
                    Arg::new("strategy")
                        .long("strategy")
                        .default_value("longest")
                        .help("Overlap resolution strategy"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .default_value("text")
                        .help("Output format ('text', 'json', or 'html')"),
                ),
        )
        .subcommand(
            Command::new("list-titles")
                .about("List all section titles the rule set can detect")
                .arg(
                    Arg::new("patterns")
                        .long("patterns")
                        .short('p')
                        .help("Path to a JSONL rule file (defaults to the bundled rules)"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("segment", segment_matches)) => {
            let path = segment_matches.get_one::<String>("path").unwrap();
            let format = segment_matches.get_one::<String>("format").unwrap();
            let config = SectionizerConfig {
                patterns: pattern_source(segment_matches.get_one::<String>("patterns")),
                max_scope: segment_matches.get_one::<usize>("max-scope").copied(),
                require_start_line: segment_matches.get_flag("require-start-line"),
                require_end_line: segment_matches.get_flag("require-end-line"),
                strategy: parse_strategy(segment_matches.get_one::<String>("strategy").unwrap()),
                ..SectionizerConfig::default()
            };
            handle_segment_command(path, config, format);
        }
        Some(("list-titles", list_matches)) => {
            let source = pattern_source(list_matches.get_one::<String>("patterns"));
            handle_list_titles_command(source);
        }
        _ => unreachable!(),
    }
}

fn pattern_source(path: Option<&String>) -> PatternSource {
    match path {
        Some(path) => PatternSource::File(PathBuf::from(path)),
        None => PatternSource::Default,
    }
}

fn parse_strategy(name: &str) -> PruneStrategy {
    name.parse().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    })
}

/// One section of the JSON report, with text slices resolved
#[derive(Serialize)]
struct SectionReport<'a> {
    title: Option<&'a str>,
    parent: Option<&'a str>,
    header: Option<&'a str>,
    body: &'a str,
}

/// Handle the segment command
fn handle_segment_command(path: &str, config: SectionizerConfig, format: &str) {
    let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file: {}", e);
        std::process::exit(1);
    });

    let sectionizer = Sectionizer::new(config).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let doc = lexing::document(&source);
    let segmentation = sectionizer.segment(&doc);

    match format {
        "text" => print!("{}", viz::render_text(&doc, &segmentation)),
        "html" => println!("{}", viz::render_html(&doc, &segmentation, &[])),
        "json" => {
            let report = json_report(&doc, &segmentation);
            let output = serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
                eprintln!("Serialization error: {}", e);
                std::process::exit(1);
            });
            println!("{}", output);
        }
        other => {
            eprintln!("Error: unknown format '{}'", other);
            std::process::exit(1);
        }
    }
}

fn json_report<'a>(doc: &'a Document, segmentation: &'a Segmentation) -> Vec<SectionReport<'a>> {
    segmentation
        .sections()
        .iter()
        .map(|section| SectionReport {
            title: section.title.as_deref(),
            parent: section.parent_title.as_deref(),
            header: section.header.as_ref().map(|h| doc.slice(h)),
            body: doc.slice(&section.body),
        })
        .collect()
}

/// Handle the list-titles command
fn handle_list_titles_command(source: PatternSource) {
    let sectionizer = Sectionizer::new(SectionizerConfig {
        patterns: source,
        ..SectionizerConfig::default()
    })
    .unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    for title in sectionizer.titles() {
        println!("{}", title);
    }
}
