//! CLI entrypoint for the incremental history rewriter.
//!
//! Parses flags and the three positionals, assembles a run configuration,
//! and executes the pipeline. All failures exit 1 with a one-line
//! explanation on stderr; an unmappable tag is a warning, not a failure.

use std::env;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::ExitCode;

use refilter_rs::{run, FilterSpec, RefMatcher, RunConfig, TagPlan};

/// Print usage and flag summary to stderr.
fn print_usage(exe: &OsStr) {
    eprintln!(
        "usage: {} [OPTIONS] <source> <filter-spec> <destination>

Incrementally rewrite the history of <source> with the given filter spec
and publish the result to <destination>.

OPTIONS:
    --workdir <path>                Working-area root (default: ./temp)
    --branch-whitelist <names>      Append to branch whitelist (repeatable)
    --branch-blacklist <names>      Append to branch blacklist (repeatable)
    --tag-whitelist <names>         Append to tag whitelist (repeatable)
    --tag-blacklist <names>         Append to tag blacklist (repeatable)
    --tags-plan visited|all|none    Tag handling (default: visited)
    --tags-max-history-lookup <n>   Ancestor budget for tag remapping (default: 50)
    --prune-branches                Delete destination branches outside the included set
    --prune-tags                    Delete destination tags outside the filtered view
    --no-hardlinks                  Disallow hardlinks when cloning the mirror
    --no-atomic                     Push destination refs non-atomically
    --no-lock                       Skip the exclusive-run guard
    --                              End of options
    --help, -h                      Show this help message

Options must precede the positional arguments. List values are split on
whitespace; a name is matched literally unless it carries the rx: prefix,
which anchors the remainder as a regular expression.",
        exe.to_string_lossy()
    );
}

fn usage_error(exe: &OsStr, msg: &str) -> ExitCode {
    eprintln!("refilter: UsageError: {msg}");
    print_usage(exe);
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let mut args = env::args_os();
    let exe = args.next().unwrap_or_else(|| "refilter".into());

    let mut workdir: Option<PathBuf> = None;
    let mut branch_whitelist: Vec<String> = Vec::new();
    let mut branch_blacklist: Vec<String> = Vec::new();
    let mut tag_whitelist: Vec<String> = Vec::new();
    let mut tag_blacklist: Vec<String> = Vec::new();
    let mut tag_plan = TagPlan::Visited;
    let mut tag_history_lookup: Option<u32> = None;
    let mut prune_branches = false;
    let mut prune_tags = false;
    let mut allow_hardlinks = true;
    let mut atomic_push = true;
    let mut locking = true;
    let mut positionals: Vec<String> = Vec::new();
    let mut options_done = false;

    while let Some(arg) = args.next() {
        let Some(arg) = arg.to_str().map(str::to_string) else {
            return usage_error(&exe, "arguments must be valid UTF-8");
        };
        // Options precede positionals. The first non-option argument (the
        // source) ends option parsing, so the filter-spec positional may
        // itself start with `--`.
        if options_done || !arg.starts_with('-') || arg == "-" {
            positionals.push(arg);
            options_done = true;
            continue;
        }
        match arg.as_str() {
            "--" => options_done = true,
            "--help" | "-h" => {
                print_usage(&exe);
                return ExitCode::SUCCESS;
            }
            "--workdir" => match args.next().and_then(|v| v.to_str().map(PathBuf::from)) {
                Some(value) => workdir = Some(value),
                None => return usage_error(&exe, "--workdir needs a path"),
            },
            "--branch-whitelist" | "--branch-blacklist" | "--tag-whitelist" | "--tag-blacklist" => {
                let Some(value) = args.next().and_then(|v| v.to_str().map(str::to_string)) else {
                    return usage_error(&exe, &format!("{arg} needs a value"));
                };
                let list = match arg.as_str() {
                    "--branch-whitelist" => &mut branch_whitelist,
                    "--branch-blacklist" => &mut branch_blacklist,
                    "--tag-whitelist" => &mut tag_whitelist,
                    _ => &mut tag_blacklist,
                };
                list.extend(value.split_whitespace().map(str::to_string));
            }
            "--tags-plan" => {
                let Some(value) = args.next().and_then(|v| v.to_str().map(str::to_string)) else {
                    return usage_error(&exe, "--tags-plan needs a value");
                };
                match TagPlan::parse(&value) {
                    Some(plan) => tag_plan = plan,
                    None => {
                        return usage_error(
                            &exe,
                            &format!("invalid --tags-plan value: {value}"),
                        );
                    }
                }
            }
            "--tags-max-history-lookup" => {
                let Some(value) = args.next().and_then(|v| v.to_str().map(str::to_string)) else {
                    return usage_error(&exe, "--tags-max-history-lookup needs a value");
                };
                match value.parse::<u32>() {
                    Ok(depth) if depth >= 1 => tag_history_lookup = Some(depth),
                    _ => {
                        return usage_error(
                            &exe,
                            &format!("invalid --tags-max-history-lookup value: {value}"),
                        );
                    }
                }
            }
            "--prune-branches" => prune_branches = true,
            "--prune-tags" => prune_tags = true,
            "--no-hardlinks" => allow_hardlinks = false,
            "--no-atomic" => atomic_push = false,
            "--no-lock" => locking = false,
            _ => return usage_error(&exe, &format!("unknown flag: {arg}")),
        }
    }

    let [source, filter_spec, destination] = positionals.as_slice() else {
        return usage_error(
            &exe,
            &format!("expected 3 arguments, got {}", positionals.len()),
        );
    };

    let filter = match FilterSpec::parse(filter_spec) {
        Ok(filter) => filter,
        Err(err) => {
            eprintln!("refilter: InvalidFilter: {err}");
            return ExitCode::FAILURE;
        }
    };
    let branches = match RefMatcher::from_entries(&branch_whitelist, &branch_blacklist) {
        Ok(m) => m,
        Err(err) => return usage_error(&exe, &err.to_string()),
    };
    let tags = match RefMatcher::from_entries(&tag_whitelist, &tag_blacklist) {
        Ok(m) => m,
        Err(err) => return usage_error(&exe, &err.to_string()),
    };

    let mut cfg = RunConfig::new(source.clone(), filter, destination.clone());
    if let Some(dir) = workdir {
        cfg.workdir = dir;
    }
    cfg.branches = branches;
    cfg.tags = tags;
    cfg.tag_plan = tag_plan;
    if let Some(depth) = tag_history_lookup {
        cfg.tag_history_lookup = depth;
    }
    cfg.prune_branches = prune_branches;
    cfg.prune_tags = prune_tags;
    cfg.allow_hardlinks = allow_hardlinks;
    cfg.atomic_push = atomic_push;
    cfg.locking = locking;

    match run(&cfg) {
        Ok(report) => {
            println!(
                "branches={} rewritten={} tags={} pruned={}",
                report.pushed_branches,
                report.rewritten(),
                report.pushed_tags,
                report.pruned
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("refilter: {err}");
            ExitCode::FAILURE
        }
    }
}
