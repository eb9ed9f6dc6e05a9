/*!
**A bounded-depth web crawler**

## Usage

- Basic BFS crawl:
```sh
deepcrawl https://example.com
```

- DFS with a depth limit:
```sh
deepcrawl --strategy dfs --max-depth 5 https://example.com
```

- Stop early once a phrase is found:
```sh
deepcrawl --end-phrase "not found" https://example.com
```

---

## How It Works

1. The seed URL is fetched and parsed into the root page node (id `0`).
2. A job record is created and the crawl is scheduled on a background
   task; this binary then polls that same job to completion, printing
   each newly emitted node as NDJSON on stdout.
3. BFS fetches an entire depth level concurrently before advancing; DFS
   follows one random link at a time, backtracking on dead ends.
4. Favicons are resolved per host and cached under `./favicons` on disk.

---

## Logging

#### Log Levels

- **INFO** (verbose mode only): per-job lifecycle events
- **WARN** (always): recoverable per-page failures (404, network errors)

#### Log Format

```text
2026-01-24 02:37:40.351 [INFO]:
job 0 finished with 6 nodes

2026-01-24 02:37:41.123 [WARN]:
page unreachable: http://example.com/broken-link (status 404)
```

---

## License

deepcrawl is licensed under the **MIT** license.
*/

use std::sync::Arc;

use clap::Parser;
use owo_colors::OwoColorize;

mod cli;

use deepcrawl::blobstore::{default_favicon_root, FsBlobStore};
use deepcrawl::config::CrawlerConfig;
use deepcrawl::error::{self, Log};
use deepcrawl::favicon::{self, FaviconResolver};
use deepcrawl::http_client::ReqwestHttpClient;
use deepcrawl::job::JobManager;
use deepcrawl::store::InMemoryResultStore;
use deepcrawl::task::TokioTaskRunner;

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::Args::parse();
    error::set_log_file(args.log_file.clone()).await;

    let config = CrawlerConfig::default();
    let client = Arc::new(ReqwestHttpClient::new(config.fetch_timeout)?);
    let blobs = Arc::new(FsBlobStore::new(default_favicon_root())?);
    let favicons = Arc::new(
        FaviconResolver::load(
            Arc::clone(&client),
            Arc::clone(&blobs),
            config.favicon_checkpoint_interval,
            config.favicon_recursion_cap,
            favicon::FAVICON_BASE,
        )
        .await,
    );
    let store = Arc::new(InMemoryResultStore::new());
    let tasks = Arc::new(TokioTaskRunner);

    let manager = JobManager::new(client, favicons, store, tasks, config);

    let Some((root, job_id)) = manager
        .start_crawl(
            &args.url,
            args.strategy.into(),
            args.max_depth,
            args.end_phrase.clone(),
        )
        .await
    else {
        eprintln!("{} could not fetch seed URL {}", "FATAL:".red().bold(), args.url);
        return Err("seed unreachable".into());
    };

    if args.verbose {
        format!("job {} started at {}", job_id, root.url)
            .log("[INFO]")
            .await;
    }

    println!("{}", serde_json::to_string(&root.to_json())?);

    loop {
        let poll = manager.poll_job(job_id).await?;
        for node in &poll.new_nodes {
            println!("{}", serde_json::to_string(node)?);
        }
        if poll.finished {
            if args.verbose {
                format!("job {} finished", job_id).log("[INFO]").await;
            }
            break;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "FATAL:".red().bold(), e);
            std::process::ExitCode::FAILURE
        }
    }
}
