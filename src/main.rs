use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use molpic::batch::BatchOptions;
use molpic::commands::{self, collect_panel_items, draw_panel, CommandError};
use molpic::config::Config;
use molpic::render::{GridOptions, OutputFormat, RenderOptions};
use molpic::resolve::PubChem;
use molpic::{GridSpec, InputKind, OrderBy};

/// Render 2D depictions of molecules from SMILES strings or compound names.
#[derive(Parser)]
#[command(name = "molpic", version)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Draw a single molecule.
    Generate(GenerateArgs),
    /// Draw several molecules as one panel.
    Grid(GridArgs),
    /// Draw every row of a CSV file, with a report and optional panels.
    Batch(BatchArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Compound name or SMILES.
    query: String,

    /// Output file, ending in .png or .svg.
    #[arg(short, long, default_value = "molecule.svg")]
    out: PathBuf,

    #[arg(long, default_value_t = 900)]
    width: u32,

    #[arg(long, default_value_t = 700)]
    height: u32,

    /// Legend under the structure. Defaults to the query.
    #[arg(long, default_value = "")]
    name: String,

    /// Remove explicit hydrogens.
    #[arg(long)]
    no_h: bool,

    /// Leave the background transparent. This is the default.
    #[arg(long, overrides_with = "no_transparent")]
    transparent: bool,

    /// Paint a white background.
    #[arg(long, overrides_with = "transparent")]
    no_transparent: bool,

    #[arg(long, default_value_t = 300)]
    png_dpi: u32,

    /// How to read the query. `auto` guesses from the characters used.
    #[arg(long = "as", value_enum, default_value_t = InputKind::Auto)]
    input_kind: InputKind,
}

#[derive(Args)]
struct GridArgs {
    /// Compound names or SMILES.
    #[arg(required = true)]
    queries: Vec<String>,

    #[arg(short, long, default_value = "panel.svg")]
    out: PathBuf,

    /// Rows and columns, like 2x3. Extra molecules get extra rows.
    #[arg(long, default_value = "2x3")]
    grid: GridSpec,

    /// Cell width. Defaults to the configured panel size.
    #[arg(long)]
    sub_width: Option<u32>,

    /// Cell height. Defaults to the configured panel size.
    #[arg(long)]
    sub_height: Option<u32>,

    /// Legend for the query in the same position. Repeatable.
    #[arg(long = "name")]
    names: Vec<String>,

    #[arg(long)]
    no_h: bool,

    #[arg(long, default_value_t = 300)]
    png_dpi: u32,

    /// Figure title, drawn above SVG panels.
    #[arg(long, default_value = "")]
    title: String,

    /// Also write a caption listing the compounds.
    #[arg(long)]
    caption_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OrderBy::Input)]
    order_by: OrderBy,

    #[arg(long = "as", value_enum, default_value_t = InputKind::Auto)]
    input_kind: InputKind,
}

#[derive(Args)]
struct BatchArgs {
    /// CSV file with a SMILES column, a name column, or both.
    input_file: PathBuf,

    #[arg(long, default_value = "smiles")]
    smiles_col: String,

    #[arg(long, default_value = "name")]
    name_col: String,

    #[arg(long, default_value = "molpic_out")]
    out_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Svg)]
    fmt: OutputFormat,

    #[arg(long)]
    no_h: bool,

    /// Also draw the rendered molecules as panels.
    #[arg(long)]
    make_panels: bool,

    #[arg(long, default_value = "2x3")]
    panel_grid: GridSpec,

    #[arg(long, default_value = "Panel")]
    panel_title_prefix: String,

    /// Write a caption file next to each panel.
    #[arg(long)]
    captions: bool,

    #[arg(long, value_enum, default_value_t = OrderBy::Input)]
    order_by: OrderBy,
}

impl GenerateArgs {
    fn transparent(&self) -> bool {
        self.transparent || !self.no_transparent
    }
}

fn exit_with(e: CommandError) -> ExitCode {
    eprintln!("{e}");
    ExitCode::from(e.exit_code())
}

async fn generate(args: GenerateArgs, pubchem: &PubChem) -> ExitCode {
    let options = RenderOptions {
        size: (args.width, args.height),
        legend: args.name.clone(),
        transparent: args.transparent(),
        remove_hs: args.no_h,
        png_dpi: args.png_dpi,
    };
    let done = match commands::generate(
        pubchem,
        &args.query,
        args.input_kind,
        &args.out,
        options,
    )
    .await
    {
        Ok(done) => done,
        Err(e) => return exit_with(e),
    };

    let structure = done.structure;
    println!("Saved: {}", args.out.display());
    println!("Label: {}", done.legend);
    println!("SMILES: {}", structure.smiles);
    match structure.cid {
        Some(cid) => println!("Source: {} (CID {cid})", structure.source),
        None => println!("Source: {}", structure.source),
    }
    if done.kept_hydrogens {
        println!("Note: explicit hydrogens could not be removed");
    }
    ExitCode::SUCCESS
}

async fn grid(args: GridArgs, pubchem: &PubChem, config: &Config) -> ExitCode {
    let (items, skipped) =
        collect_panel_items(pubchem, &args.queries, &args.names, args.input_kind)
            .await;
    for skip in &skipped {
        eprintln!("Skip: {} ({})", skip.query, skip.message);
    }

    let options = GridOptions {
        grid: args.grid,
        sub_size: (
            args.sub_width.unwrap_or(config.panel.sub_width),
            args.sub_height.unwrap_or(config.panel.sub_height),
        ),
        remove_hs: args.no_h,
        png_dpi: args.png_dpi,
        title: args.title,
        ..Default::default()
    };
    let count = match draw_panel(
        items,
        args.order_by,
        &args.out,
        options,
        args.caption_file.as_deref(),
    ) {
        Ok(count) => count,
        Err(e) => return exit_with(e),
    };

    println!("Saved panel: {}", args.out.display());
    println!("Grid: {}", args.grid);
    println!("Count: {count}");
    ExitCode::SUCCESS
}

async fn batch(args: BatchArgs, pubchem: &PubChem, config: &Config) -> ExitCode {
    let options = BatchOptions {
        input: args.input_file,
        smiles_col: args.smiles_col,
        name_col: args.name_col,
        out_dir: args.out_dir,
        fmt: args.fmt,
        remove_hs: args.no_h,
        make_panels: args.make_panels,
        panel_grid: args.panel_grid,
        panel_title_prefix: args.panel_title_prefix,
        panel_size: (config.panel.sub_width, config.panel.sub_height),
        captions: args.captions,
        order_by: args.order_by,
    };
    match commands::batch(pubchem, &options).await {
        Ok(report) => {
            println!("Done. Output dir: {}", options.out_dir.display());
            println!("Report: {}", report.report_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => exit_with(e),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    let config = match Config::load_or_default(cli.config.as_ref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let pubchem = match PubChem::new(&config.pubchem) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Generate(args) => generate(args, &pubchem).await,
        Command::Grid(args) => grid(args, &pubchem, &config).await,
        Command::Batch(args) => batch(args, &pubchem, &config).await,
    }
}
