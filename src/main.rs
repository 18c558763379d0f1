use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use log::{debug, info};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use migration_matrix::{
    calendar::DEFAULT_YEAR_RANK, node_numbers::insert_node_numbers, AttributeTable, MigrationMatrix,
    MigrationRun, Settings, Tree,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = Command::new("MigrationMatrix")
        .version("0.1.0")
        .about("Lineage migrations between locations per calendar year on an annotated phylogeny")
        .subcommand_required(true)
        .subcommand(Command::new("matrix")
            .about("Count location-to-location lineages per year")
            .arg(Arg::new("tree")
                .short('t')
                .long("tree")
                .value_name("TREE_FILE")
                .help("Input newick tree with named internal nodes")
                .required(true))
            .arg(Arg::new("table")
                .short('i')
                .long("input")
                .value_name("TABLE_FILE")
                .help("Node attribute table: name,height,length,location,countryprob,isolate")
                .required(true))
            .arg(Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_FILE")
                .help("Output file for the migration matrix (CSV)")
                .required(true))
            .arg(Arg::new("transposed")
                .long("transposed")
                .value_name("FILE")
                .help("Also write the matrix with one row per year (tab-delimited)"))
            .arg(Arg::new("year_rank")
                .long("year-rank")
                .value_name("N")
                .help("Take the most current year from the N-th last sorted isolate")
                .value_parser(value_parser!(usize))
                .default_value("2"))
            .arg(Arg::new("locations")
                .long("locations")
                .value_name("LOC,LOC,...")
                .help("Explicit, ordered location set; defaults to the locations of the table")
                .value_delimiter(','))
            .arg(Arg::new("delimiter")
                .short('d')
                .long("delimiter")
                .value_name("CHAR")
                .help("Delimiter of the attribute table")
                .value_parser(value_parser!(char))
                .default_value(","))
            .arg(Arg::new("threads")
                .long("threads")
                .value_name("N")
                .help("Number of threads used to accumulate counts")
                .value_parser(value_parser!(usize))))
        .subcommand(Command::new("number-nodes")
            .about("Append sequential numbers to the internal nodes of an annotated tree")
            .arg(Arg::new("input")
                .short('i')
                .long("input")
                .value_name("TREE_FILE")
                .required(true))
            .arg(Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_FILE")
                .required(true)))
        .get_matches();

    match matches.subcommand() {
        Some(("matrix", sub)) => run_matrix(sub),
        Some(("number-nodes", sub)) => run_number_nodes(sub),
        _ => unreachable!("a subcommand is required"),
    }
}

fn run_matrix(matches: &ArgMatches) -> Result<()> {
    let tree_file = matches.get_one::<String>("tree").context("missing --tree")?;
    let table_file = matches.get_one::<String>("table").context("missing --input")?;
    let output_file = matches.get_one::<String>("output").context("missing --output")?;

    let delimiter = *matches.get_one::<char>("delimiter").unwrap_or(&',');
    if !delimiter.is_ascii() {
        bail!("Delimiter must be a single ASCII character, got '{}'", delimiter);
    }
    let settings = Settings {
        year_rank: *matches.get_one::<usize>("year_rank").unwrap_or(&DEFAULT_YEAR_RANK),
        locations: matches.get_many::<String>("locations").map(|v| v.cloned().collect()),
        delimiter: delimiter as u8,
    };
    debug!("{:?}", settings);

    // Read the tree and the attribute table
    let tree = Tree::from_file(Path::new(tree_file))
        .with_context(|| format!("Failed to read tree {}", tree_file))?;
    info!("Read tree with {} nodes from {}", tree.len(), tree_file);
    let table_reader = File::open(table_file).with_context(|| format!("Failed to open {}", table_file))?;
    let table = AttributeTable::from_reader(table_reader, settings.delimiter)
        .with_context(|| format!("Failed to read attribute table {}", table_file))?;
    info!("Read {} attribute rows from {}", table.len(), table_file);

    let run = MigrationRun::new(&tree, &table, &settings)?;
    let (matrix, _) = match matches.get_one::<usize>("threads") {
        Some(&n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .context("Failed to build thread pool")?
            .install(|| run.execute())?,
        None => run.execute()?,
    };
    debug!("\n{}", matrix.describe());

    // Nothing is written unless the whole matrix was built
    write_output(output_file, &matrix, |m, w| m.write_csv(w))?;
    info!("Wrote migration matrix to {}", output_file);
    if let Some(transposed_file) = matches.get_one::<String>("transposed") {
        write_output(transposed_file, &matrix, |m, w| m.write_transposed(w))?;
        info!("Wrote transposed matrix to {}", transposed_file);
    }
    Ok(())
}

fn write_output<F>(path: &str, matrix: &MigrationMatrix, write: F) -> Result<()>
where
    F: FnOnce(&MigrationMatrix, &mut BufWriter<File>) -> migration_matrix::Result<()>,
{
    let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
    let mut writer = BufWriter::new(file);
    write(matrix, &mut writer).with_context(|| format!("Failed to write {}", path))?;
    writer.flush()?;
    Ok(())
}

fn run_number_nodes(matches: &ArgMatches) -> Result<()> {
    let input = matches.get_one::<String>("input").context("missing --input")?;
    let output = matches.get_one::<String>("output").context("missing --output")?;
    let text = std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))?;
    let numbered = insert_node_numbers(&text).with_context(|| format!("Failed to number nodes of {}", input))?;
    std::fs::write(output, numbered).with_context(|| format!("Failed to write {}", output))?;
    info!("Wrote numbered tree to {}", output);
    Ok(())
}
