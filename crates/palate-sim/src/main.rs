use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use palate_model::{FeedLocation, StatusFilter};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod corpus;
mod session;

use corpus::CorpusSpec;
use session::Script;

fn cli() -> Command {
    Command::new("palate-sim")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Friends' activity feed simulator")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON (level via RUST_LOG)"),
        )
        .subcommand(
            Command::new("browse")
                .about("Browse a generated corpus page by page")
                .arg(
                    Arg::new("friends")
                        .long("friends")
                        .default_value("6")
                        .value_parser(value_parser!(usize))
                        .help("Number of friends in the roster"),
                )
                .arg(
                    Arg::new("items")
                        .long("items")
                        .default_value("25")
                        .value_parser(value_parser!(usize))
                        .help("Records per friend"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("wishlist-ratio")
                        .long("wishlist-ratio")
                        .default_value("0.2")
                        .value_parser(value_parser!(f64))
                        .help("Share of records saved to the wishlist"),
                )
                .arg(
                    Arg::new("page-size")
                        .long("page-size")
                        .default_value("18")
                        .value_parser(value_parser!(usize))
                        .help("Items per page"),
                )
                .arg(
                    Arg::new("status")
                        .long("status")
                        .value_parser(["all", "rated", "wishlist"])
                        .help("Status filter to apply after mounting"),
                )
                .arg(
                    Arg::new("search")
                        .long("search")
                        .help("Search text to submit after mounting"),
                )
                .arg(
                    Arg::new("pages")
                        .long("pages")
                        .default_value("3")
                        .value_parser(value_parser!(usize))
                        .help("Pages to walk forward before walking back"),
                )
                .arg(
                    Arg::new("latency-ms")
                        .long("latency-ms")
                        .default_value("0")
                        .value_parser(value_parser!(u64))
                        .help("Simulated remote latency per call"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("link")
                .about("Decode a feed deep link and print its canonical form")
                .arg(
                    Arg::new("query")
                        .required(true)
                        .help("Query string, with or without the leading '?'"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = installed {
        eprintln!("tracing already initialised: {e}");
    }
}

fn script_from(args: &ArgMatches) -> Result<Script> {
    let status = args
        .get_one::<String>("status")
        .map(|s| s.parse::<StatusFilter>())
        .transpose()
        .map_err(|bad| anyhow::anyhow!("unknown status '{bad}'"))?;

    Ok(Script {
        corpus: CorpusSpec {
            friends: *args.get_one::<usize>("friends").context("--friends")?,
            items_per_friend: *args.get_one::<usize>("items").context("--items")?,
            wishlist_ratio: *args.get_one::<f64>("wishlist-ratio").context("--wishlist-ratio")?,
            seed: *args.get_one::<u64>("seed").context("--seed")?,
        },
        page_size: *args.get_one::<usize>("page-size").context("--page-size")?,
        status,
        search: args.get_one::<String>("search").cloned(),
        pages: *args.get_one::<usize>("pages").context("--pages")?,
        latency: Duration::from_millis(*args.get_one::<u64>("latency-ms").context("--latency-ms")?),
    })
}

fn print_location(location: &FeedLocation) {
    let f = &location.filter;
    println!("Feed location");
    println!("  search:     {}", if f.search_text.is_empty() { "-" } else { &f.search_text });
    println!("  sort:       {}", f.sort_key);
    println!("  status:     {}", f.status);
    println!("  categories: {}", f.categories.iter().cloned().collect::<Vec<_>>().join(", "));
    println!("  cities:     {}", f.cities.iter().cloned().collect::<Vec<_>>().join(", "));
    println!("  owners:     {}", f.owners.len());
    println!("  page:       {}", location.page);
    println!("  signature:  {}", f.signature().short());
    println!();
    println!("?{location}");
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("browse", args)) => {
            let script = script_from(args)?;
            let report = session::run(script).await?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
        }
        Some(("link", args)) => {
            let query = args.get_one::<String>("query").context("missing query")?;
            let location: FeedLocation = query
                .parse()
                .with_context(|| format!("decoding '{query}'"))?;
            print_location(&location);
        }
        _ => unreachable!("subcommand_required is set"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browse_arguments_parse() {
        let matches = cli()
            .try_get_matches_from([
                "palate-sim", "browse", "--friends", "3", "--items", "10", "--status", "rated",
                "--search", "olive",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let script = script_from(args).unwrap();
        assert_eq!(script.corpus.friends, 3);
        assert_eq!(script.status, Some(StatusFilter::Rated));
        assert_eq!(script.search.as_deref(), Some("olive"));
        assert_eq!(script.page_size, 18);
    }

    #[test]
    fn unknown_status_is_rejected_by_the_parser() {
        let result = cli().try_get_matches_from(["palate-sim", "browse", "--status", "spicy"]);
        assert!(result.is_err());
    }
}
