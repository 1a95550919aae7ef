use anyhow::bail;
use clap::{command, Arg, ArgAction};
use std::path::PathBuf;

mod frontmatter;
mod gitlog;
mod infer;
mod processor;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = command!()
        .about("Normalize or strip YAML front matter across a markdown document tree")
        .args(&[
            Arg::new("root")
                .help("Directory tree to process")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value("."),
            Arg::new("strip")
                .long("strip")
                .action(ArgAction::SetTrue)
                .help("Remove headers instead of upserting them"),
            Arg::new("no_repair")
                .long("no-repair")
                .action(ArgAction::SetTrue)
                .help("Keep duplicate header blocks as they are"),
            Arg::new("max_tags")
                .long("max-tags")
                .value_parser(clap::value_parser!(usize))
                .default_value("5")
                .help("Truncate existing tag lists longer than this"),
            Arg::new("no_tag_cap")
                .long("no-tag-cap")
                .action(ArgAction::SetTrue)
                .help("Leave existing tag lists untouched"),
        ])
        .get_matches();

    let root: &PathBuf = matches.get_one("root").unwrap();
    if !root.exists() || !root.is_dir() {
        bail!("root must be a directory.");
    }

    let strip = matches.get_flag("strip");
    let summary = if strip {
        processor::run_strip(root)?
    } else {
        let options = processor::Options {
            repair_duplicates: !matches.get_flag("no_repair"),
            max_tags: if matches.get_flag("no_tag_cap") {
                None
            } else {
                matches.get_one::<usize>("max_tags").copied()
            },
        };
        let dates = gitlog::GitDateSource::new(root.clone());
        processor::run_upsert(root, &options, &dates)?
    };

    println!("\nSummary:");
    println!("  Total files discovered: {}", summary.discovered);
    println!("  Successfully processed: {}", summary.processed);
    println!("  Files updated: {}", summary.updated);
    println!("  Failed: {}", summary.failed);

    if strip && summary.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
