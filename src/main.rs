// Command line front end for the land price engine.
//
// Each subcommand loads the dataset, builds a filter from the config file
// and flags, and renders one view of the aggregation:
// - `metadata` prints the selectable facets,
// - `report` prints KPI/series/ranking tables and writes the result JSON,
// - `export` writes the filtered records as CSV,
// - `map` writes the choropleth cells for the boundary file,
// - `interactive` keeps the data in memory behind a small menu.
use clap::{Args, Parser, Subcommand};
use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use terra_prices::choropleth::{build_choropleth, ColorScale, MapMetric};
use terra_prices::config::{load_config, Config};
use terra_prices::filter::available_territories;
use terra_prices::loader::{load_dataset, Dataset};
use terra_prices::output::{export_file_name, export_records_to_path, preview_table, write_json};
use terra_prices::report;
use terra_prices::util::{format_compact, format_int};
use terra_prices::{aggregate, filter_records, FilterSpec};

#[derive(Debug, Parser)]
#[command(name = "terra-prices", about = "Farmland price statistics from published price tables")]
struct Cli {
    /// TOML config with [data], [filter] and [output] tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Row-level records (.json or compiled .csv)
    #[arg(long, global = true)]
    detailed: Option<PathBuf>,

    /// Pre-aggregated metadata JSON
    #[arg(long, global = true)]
    aggregated: Option<PathBuf>,

    /// Territorial boundaries GeoJSON
    #[arg(long, global = true)]
    boundaries: Option<PathBuf>,

    /// Directory for generated files
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the facets available for filtering
    Metadata,
    /// Print summary tables and write the aggregation as JSON
    Report(FilterArgs),
    /// Write the filtered records as CSV
    Export(FilterArgs),
    /// Write choropleth values for each boundary feature
    Map {
        #[command(flatten)]
        filter: FilterArgs,
        /// media, mediana, max or min
        #[arg(long, default_value = "media")]
        metric: MapMetric,
    },
    /// Menu driven session that loads the data once
    Interactive(FilterArgs),
}

#[derive(Debug, Clone, Default, Args)]
struct FilterArgs {
    /// First year (inclusive)
    #[arg(long)]
    from: Option<i32>,
    /// Last year (inclusive)
    #[arg(long)]
    to: Option<i32>,
    /// Territorial level, e.g. Municipio
    #[arg(long)]
    level: Option<String>,
    #[arg(long = "territory")]
    territories: Vec<String>,
    #[arg(long = "category")]
    categories: Vec<String>,
    #[arg(long = "subcategory")]
    subcategories: Vec<String>,
    #[arg(long = "class")]
    classes: Vec<String>,
    #[arg(long = "region")]
    regions: Vec<String>,
    #[arg(long = "mesoregion")]
    mesoregions: Vec<String>,
    /// Start from an empty selection, ignoring the dataset defaults and
    /// the config file's [filter]
    #[arg(long)]
    all: bool,
}

impl FilterArgs {
    /// Base selection, then flags on top. The base is empty with `--all`,
    /// otherwise the config file's filter when it sets anything, otherwise
    /// the dataset defaults.
    fn resolve(&self, config: &FilterSpec, dataset: &Dataset) -> FilterSpec {
        let mut spec = if self.all {
            FilterSpec::default()
        } else if *config != FilterSpec::default() {
            config.clone()
        } else {
            FilterSpec::initial(&dataset.metadata)
        };
        if let Some(from) = self.from {
            spec.year_range.min = Some(from);
        }
        if let Some(to) = self.to {
            spec.year_range.max = Some(to);
        }
        if let Some(level) = &self.level {
            spec.level = level.clone();
        }
        let merge = |target: &mut BTreeSet<String>, values: &[String]| {
            if !values.is_empty() {
                *target = values.iter().cloned().collect();
            }
        };
        merge(&mut spec.territories, &self.territories);
        merge(&mut spec.categories, &self.categories);
        merge(&mut spec.subcategories, &self.subcategories);
        merge(&mut spec.classes, &self.classes);
        merge(&mut spec.regions, &self.regions);
        merge(&mut spec.mesoregions, &self.mesoregions);
        spec
    }
}

const REPORT_FILE: &str = "agregacao.json";
const MAP_FILE: &str = "mapa.json";

// Data loaded in interactive mode so reports can be regenerated without
// reading the files again.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<Dataset>,
}

fn build_config(cli: &Cli) -> Result<Config, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(p) = &cli.detailed {
        config.data.detailed = p.clone();
    }
    if let Some(p) = &cli.aggregated {
        config.data.aggregated = Some(p.clone());
    }
    if let Some(p) = &cli.boundaries {
        config.data.boundaries = Some(p.clone());
    }
    if let Some(p) = &cli.out_dir {
        config.output.dir = p.clone();
    }
    Ok(config)
}

fn print_metadata(dataset: &Dataset) {
    let m = &dataset.metadata;
    println!(
        "Anos: {}-{} ({} anos)",
        m.year_min,
        m.year_max,
        m.years.len()
    );
    println!("Niveis: {}", m.levels.join(", "));
    println!("Categorias: {}", m.categories.join(", "));
    println!("Subcategorias: {}", m.subcategories.join(", "));
    if !m.classes.is_empty() {
        println!("Classes: {}", m.classes.join(", "));
    }
    for level in &m.levels {
        println!(
            "Territorios ({}): {}",
            level,
            format_int(available_territories(m, level).len() as u64)
        );
    }
    println!();
}

fn run_report(dataset: &Dataset, spec: &FilterSpec, config: &Config) -> Result<(), Box<dyn Error>> {
    let filtered = filter_records(&dataset.records, spec);
    let result = aggregate(&filtered, &spec.level);
    let rows = config.output.preview_rows;

    println!(
        "{} de {} registros selecionados\n",
        format_int(filtered.len() as u64),
        format_int(dataset.records.len() as u64)
    );
    if filtered.is_empty() {
        println!("Sem dados para o conjunto de filtros selecionado.\n");
    }
    preview_table("Indicadores", &report::kpi_rows(&result), usize::MAX);
    preview_table("Serie historica", &report::year_rows(&result), usize::MAX);
    preview_table("Por categoria", &report::category_rows(&result), rows);
    preview_table("Por classe", &report::subcategory_rows(&result), rows);
    preview_table("Ranking territorial", &report::territory_rows(&result), rows);

    let path = config.output.dir.join(REPORT_FILE);
    write_json(&path, &result)?;
    println!("(Resultado completo em {})\n", path.display());
    Ok(())
}

fn run_export(dataset: &Dataset, spec: &FilterSpec, config: &Config) -> Result<(), Box<dyn Error>> {
    let filtered = filter_records(&dataset.records, spec);
    let name = export_file_name(chrono::Local::now().date_naive());
    let path = config.output.dir.join(name);
    let written = export_records_to_path(&path, &filtered)?;
    if written == 0 {
        println!("Nenhum registro para exportar.");
    } else {
        println!("{} registros exportados para {}", format_int(written as u64), path.display());
    }
    Ok(())
}

fn run_map(
    dataset: &Dataset,
    spec: &FilterSpec,
    metric: MapMetric,
    config: &Config,
) -> Result<(), Box<dyn Error>> {
    let Some(boundaries) = &dataset.boundaries else {
        println!("GeoJSON nao encontrado.");
        return Ok(());
    };
    let filtered = filter_records(&dataset.records, spec);
    let result = aggregate(&filtered, &spec.level);
    let cells = build_choropleth(&result, boundaries, &spec.level, metric);
    let matched = cells.iter().filter(|c| c.value != 0.0).count();
    let scale = ColorScale::from_rankings(&result.by_territory, metric);
    let path = config.output.dir.join(MAP_FILE);
    write_json(&path, &cells)?;
    println!(
        "{} areas, {} com valor, escala R$ {} a R$ {} ({})",
        format_int(cells.len() as u64),
        format_int(matched as u64),
        format_compact(scale.min),
        format_compact(scale.max),
        path.display()
    );
    Ok(())
}

/// Print the menu prompt and read one trimmed line. `None` once stdin is
/// closed or unreadable.
fn read_choice<R: BufRead>(input: &mut R) -> Option<String> {
    print!("Opcao: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) => None,
        Ok(_) => Some(buf.trim().to_string()),
        Err(e) => {
            log::warn!("failed to read menu choice: {}", e);
            None
        }
    }
}

fn handle_load(config: &Config) {
    match load_dataset(&config.data) {
        Ok(dataset) => {
            println!(
                "Dados carregados: {} registros, {} anos\n",
                format_int(dataset.records.len() as u64),
                dataset.metadata.years.len()
            );
            let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
            state.data = Some(dataset);
        }
        Err(e) => {
            eprintln!("Erro ao carregar dados: {}\n", e);
        }
    }
}

fn handle_generate_reports(args: &FilterArgs, config: &Config) {
    let data = {
        let state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
        state.data.clone()
    };
    let Some(dataset) = data else {
        println!("Nenhum dado carregado. Use a opcao 1 primeiro.\n");
        return;
    };
    let spec = args.resolve(&config.filter, &dataset);
    if let Err(e) = run_report(&dataset, &spec, config) {
        eprintln!("Erro ao gerar relatorio: {}", e);
    }
}

fn run_interactive(args: &FilterArgs, config: &Config) {
    let stdin = io::stdin();
    run_menu(&mut stdin.lock(), args, config);
}

fn run_menu<R: BufRead>(input: &mut R, args: &FilterArgs, config: &Config) {
    loop {
        println!("[1] Carregar dados");
        println!("[2] Gerar relatorios");
        println!("[3] Sair\n");
        let Some(choice) = read_choice(input) else {
            println!();
            break;
        };
        match choice.as_str() {
            "1" => handle_load(config),
            "2" => {
                println!();
                handle_generate_reports(args, config);
            }
            "3" => break,
            _ => println!("Opcao invalida. Digite 1, 2 ou 3.\n"),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    if let Command::Interactive(args) = &cli.command {
        run_interactive(args, &config);
        return Ok(());
    }

    let dataset = load_dataset(&config.data)?;
    match &cli.command {
        Command::Metadata => print_metadata(&dataset),
        Command::Report(args) => {
            let spec = args.resolve(&config.filter, &dataset);
            run_report(&dataset, &spec, &config)?;
        }
        Command::Export(args) => {
            let spec = args.resolve(&config.filter, &dataset);
            run_export(&dataset, &spec, &config)?;
        }
        Command::Map { filter, metric } => {
            let spec = filter.resolve(&config.filter, &dataset);
            run_map(&dataset, &spec, *metric, &config)?;
        }
        Command::Interactive(_) => {}
    }
    Ok(())
}
