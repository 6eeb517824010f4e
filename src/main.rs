use std::path::PathBuf;

use clap::Parser;
use tracing::Level;
use trim_planner::config::Settings;
use trim_planner::mills::MillTable;
use trim_planner::render;
use trim_planner::report::SuggestionReport;
use trim_planner::solver::{PenaltyWeights, Solver};
use trim_planner::types::{DeckleRange, ProductionParams, RollRequirement};

#[derive(Parser)]
#[command(
    name = "trim_planner",
    about = "Paper machine trim-set planner: cutting patterns and run counts for required roll tonnage"
)]
struct Cli {
    /// Mill name, used to look up the deckle range (e.g. NPI-IWAKUNI)
    #[arg(long, required_unless_present = "deckle")]
    mill: Option<String>,

    /// Deckle range in mm as MIN-MAX (overrides --mill)
    #[arg(long, value_parser = parse_deckle)]
    deckle: Option<DeckleRange>,

    /// Substance (basis weight) in g/m2
    #[arg(long)]
    substance: f64,

    /// Roll length in meters
    #[arg(long)]
    length: f64,

    /// Required rolls as [ID=]WIDTH:TONS (e.g. 1500:10 r2=1000:5)
    #[arg(long = "rolls", num_args = 1.., required = true)]
    rolls: Vec<String>,

    /// Settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of sets in the plan
    #[arg(long)]
    max_patterns: Option<usize>,

    /// Maximum runs of one set
    #[arg(long)]
    max_multiplier: Option<u32>,

    /// Distinct widths per set before the search widens
    #[arg(long)]
    max_widths: Option<usize>,

    /// Candidate pattern budget
    #[arg(long)]
    budget: Option<usize>,

    /// Penalty per ton under the requirement
    #[arg(long)]
    under_weight: Option<f64>,

    /// Penalty per ton over the requirement
    #[arg(long)]
    over_weight: Option<f64>,

    /// Show a strip layout of each set
    #[arg(long)]
    layout: bool,

    /// Print the suggestion as JSON
    #[arg(long)]
    json: bool,

    /// Log solver progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_deckle(s: &str) -> Result<DeckleRange, String> {
    let (min, max) = s
        .split_once('-')
        .ok_or_else(|| format!("invalid deckle '{}', expected MIN-MAX", s))?;
    let min = min
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid deckle minimum in '{}'", s))?;
    let max = max
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid deckle maximum in '{}'", s))?;
    DeckleRange::new(min, max).map_err(|e| e.to_string())
}

/// Parse `[ID=]WIDTH:TONS`. Rows with zero width or tons come back as `None`.
fn parse_roll(s: &str, index: usize) -> Result<Option<RollRequirement>, String> {
    let (id, spec) = match s.split_once('=') {
        Some((id, spec)) => (id.trim().to_string(), spec),
        None => (format!("r{}", index + 1), s),
    };
    if id.is_empty() {
        return Err(format!("empty roll id in '{}'", s));
    }
    let (width, tons) = spec
        .split_once(':')
        .ok_or_else(|| format!("invalid roll '{}', expected [ID=]WIDTH:TONS", s))?;
    let width = width
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    let tons = tons
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid tons in '{}'", s))?;
    if !tons.is_finite() || tons < 0.0 {
        return Err(format!("tons must be a non-negative number in '{}'", s));
    }
    if width == 0 || tons == 0.0 {
        return Ok(None);
    }
    Ok(Some(RollRequirement::new(id, width, tons)))
}

fn unknown_mill_message(err: &trim_planner::Error, mills: &MillTable) -> String {
    let known: Vec<&str> = mills.names().collect();
    format!("{} (known mills: {})", err, known.join(", "))
}

fn run(cli: Cli) -> Result<(), String> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path).map_err(|e| e.to_string())?,
        None => Settings::default(),
    };

    let deckle = match (cli.deckle, &cli.mill) {
        (Some(deckle), _) => deckle,
        (None, Some(mill)) => {
            let mills = settings.mill_table();
            mills.resolve(mill).map_err(|e| unknown_mill_message(&e, &mills))?
        }
        (None, None) => return Err("either --mill or --deckle is required".to_string()),
    };
    let production = ProductionParams::new(cli.substance, cli.length).map_err(|e| e.to_string())?;

    let mut requirements = Vec::new();
    for (i, roll) in cli.rolls.iter().enumerate() {
        match parse_roll(roll, i)? {
            Some(r) => requirements.push(r),
            None => tracing::info!(roll = %roll, "skipping roll with zero width or tons"),
        }
    }

    let solver_config = &mut settings.solver;
    if let Some(n) = cli.max_patterns {
        solver_config.max_patterns = n;
    }
    if let Some(n) = cli.max_multiplier {
        solver_config.max_multiplier = n;
    }
    if let Some(n) = cli.max_widths {
        solver_config.generator.max_widths_per_pattern = n;
    }
    if let Some(n) = cli.budget {
        solver_config.generator.candidate_budget = n;
    }
    if cli.under_weight.is_some() || cli.over_weight.is_some() {
        solver_config.penalty = PenaltyWeights::new(
            cli.under_weight.unwrap_or(solver_config.penalty.under),
            cli.over_weight.unwrap_or(solver_config.penalty.over),
        );
    }

    let solver = Solver::new(settings.solver);
    let solution = solver
        .solve(&requirements, deckle, production)
        .map_err(|e| e.to_string())?;

    if cli.json {
        let report = SuggestionReport::new(&solution, &production);
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{json}");
        return Ok(());
    }

    println!(
        "Deckle {}, {} g/m2, {} m",
        deckle, production.substance_gsm, production.length_m
    );
    println!();
    for (i, entry) in solution.plan.entries().iter().enumerate() {
        println!(
            "Set {} (x{}): {}  [{:.3} t]",
            i + 1,
            entry.multiplier,
            entry.pattern,
            entry.tons(&production)
        );
        if cli.layout {
            print!("{}", render::render_pattern(deckle, &entry.pattern));
        }
    }
    if solution.plan.is_empty() {
        println!("No set improves on producing nothing.");
    }
    println!();
    print!("{}", render::render_totals(&solution.totals));

    if !solution.uncovered.is_empty() {
        println!();
        println!(
            "Not coverable within {}: {}",
            deckle,
            solution.uncovered.join(", ")
        );
    }

    println!();
    println!(
        "Summary: {} set{} from {} candidate{}, weighted deviation {:.3}",
        solution.plan.len(),
        if solution.plan.len() == 1 { "" } else { "s" },
        solution.candidates,
        if solution.candidates == 1 { "" } else { "s" },
        solution.objective,
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deckle() {
        let deckle = parse_deckle("4560-4960").unwrap();
        assert_eq!((deckle.min_mm(), deckle.max_mm()), (4560, 4960));
        assert!(parse_deckle("4960-4560").is_err());
        assert!(parse_deckle("4560").is_err());
        assert!(parse_deckle("abc-4960").is_err());
    }

    #[test]
    fn test_parse_roll() {
        let r = parse_roll("1500:10", 0).unwrap().unwrap();
        assert_eq!(r.id, "r1");
        assert_eq!(r.width_mm, 1500);
        assert_eq!(r.required_tons, 10.0);

        let r = parse_roll("liner=1000:2.5", 3).unwrap().unwrap();
        assert_eq!(r.id, "liner");
        assert_eq!(r.required_tons, 2.5);
    }

    #[test]
    fn test_parse_roll_filters_empty_rows() {
        assert!(parse_roll("0:10", 0).unwrap().is_none());
        assert!(parse_roll("1500:0", 0).unwrap().is_none());
    }

    #[test]
    fn test_parse_roll_errors() {
        assert!(parse_roll("1500", 0).is_err());
        assert!(parse_roll("x:10", 0).is_err());
        assert!(parse_roll("1500:-2", 0).is_err());
        assert!(parse_roll("=1500:2", 0).is_err());
    }

    #[test]
    fn test_unknown_mill_lists_known_names() {
        let mills = MillTable::builtin();
        let err = mills.resolve("nowhere").unwrap_err();
        let message = unknown_mill_message(&err, &mills);
        assert!(message.starts_with("unknown mill 'nowhere'"));
        assert!(message.contains("APP-A, APP-B, HANSOL"));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
