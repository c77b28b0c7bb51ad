use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::json;

use iptrends::insight::competitor_insights;
use iptrends::logging::{log, obj, v_str, Domain, Level};
use iptrends::model::TrendFilter;
use iptrends::report::{build_report, build_trademark_report};
use iptrends::{ApiClient, Config};

const USAGE: &str = "usage: iptrends <report|trademarks|classes|competitors|compare NAME...> \
[--start YEAR] [--end YEAR] [--country CODE] [--technology CODE] [--limit N] [--help]";

fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
        || args.first().map(String::as_str) == Some("help")
}

/// Split positional arguments from `--flag value` pairs.
fn parse_args(args: &[String]) -> Result<(Vec<String>, TrendFilter)> {
    let mut positional = Vec::new();
    let mut filter = TrendFilter::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let Some(flag) = arg.strip_prefix("--") else {
            positional.push(arg.clone());
            continue;
        };
        let value = iter
            .next()
            .ok_or_else(|| anyhow!("--{} needs a value", flag))?;
        match flag {
            "start" => filter.start_year = Some(value.parse()?),
            "end" => filter.end_year = Some(value.parse()?),
            "country" => filter.country = Some(value.clone()),
            "technology" => filter.technology = Some(value.clone()),
            "limit" => filter.limit = Some(value.parse()?),
            other => return Err(anyhow!("unknown flag --{}", other)),
        }
    }
    Ok((positional, filter))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if wants_help(&args) {
        println!("{}", USAGE);
        return Ok(());
    }
    let (positional, filter) = parse_args(&args)?;
    let Some(command) = positional.first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let cfg = Config::from_env()?;
    let client = ApiClient::new(&cfg)?;
    log(
        Level::Info,
        Domain::System,
        "command",
        obj(&[("command", v_str(command))]),
    );

    match command.as_str() {
        "report" => print_json(&build_report(&client, &filter).await),
        "trademarks" => print_json(&build_trademark_report(&client, &filter).await),
        "classes" => print_json(&client.trademark_classes(&filter).await?),
        "competitors" => {
            let competitors = client.competitors(filter.limit).await?;
            let insights = competitor_insights(&competitors);
            print_json(&json!({ "competitors": competitors, "insights": insights }))
        }
        "compare" => {
            let names = &positional[1..];
            if names.is_empty() {
                return Err(anyhow!("compare needs at least one competitor name"));
            }
            let competitors = client.compare_competitors(names).await?;
            let insights = competitor_insights(&competitors);
            print_json(&json!({ "competitors": competitors, "insights": insights }))
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let (pos, filter) =
            parse_args(&strings(&["report", "--start", "2019", "--country", "US", "--limit", "5"])).unwrap();
        assert_eq!(pos, vec!["report".to_string()]);
        assert_eq!(filter.start_year, Some(2019));
        assert_eq!(filter.country.as_deref(), Some("US"));
        assert_eq!(filter.limit, Some(5));
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse_args(&strings(&["report", "--start"])).is_err());
        assert!(parse_args(&strings(&["report", "--start", "soon"])).is_err());
        assert!(parse_args(&strings(&["report", "--color", "red"])).is_err());
    }

    #[test]
    fn test_help_flags() {
        assert!(wants_help(&strings(&["--help"])));
        assert!(wants_help(&strings(&["-h"])));
        assert!(wants_help(&strings(&["help"])));
        assert!(wants_help(&strings(&["report", "--start", "2020", "--help"])));
        assert!(!wants_help(&strings(&["report", "--start", "2020"])));
        assert!(!wants_help(&strings(&["compare", "help"])));
        assert!(!wants_help(&[]));
    }
}
