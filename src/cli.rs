use clap::ValueHint;
use std::path::PathBuf;

static LONG_ABT: &str = r#"
deepcrawl - a bounded-depth web crawler

• deepcrawl starts from a seed URL and expands outward by depth-first or
  breadth-first traversal, following same-host links, until it hits a
  depth limit or an optional termination phrase is found.
• Each crawl runs as a background job; this binary drives one job to
  completion and prints the emitted page nodes as they arrive.
"#;

#[derive(clap::Parser)]
#[command(
    author,
    version,
    about = "A bounded-depth BFS/DFS web crawler",
    long_about = LONG_ABT
)]
pub struct Args {
    #[arg(required = true, value_hint = ValueHint::Url)]
    pub url: String,

    #[arg(short, long, value_enum, default_value = "bfs")]
    pub strategy: Strategy,

    #[arg(short, long, default_value_t = 3)]
    pub max_depth: u32,

    #[arg(short, long)]
    pub end_phrase: Option<String>,

    #[arg(short, long, value_hint = ValueHint::FilePath, global = true)]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    Bfs,
    Dfs,
}

impl From<Strategy> for deepcrawl::store::Strategy {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::Bfs => deepcrawl::store::Strategy::Bfs,
            Strategy::Dfs => deepcrawl::store::Strategy::Dfs,
        }
    }
}
