use anyhow::Context as _;
use cfgtab::{grammar::Grammar, ll1, lr0, slr, syntax};
use clap::{Parser, ValueEnum};
use std::{fs, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of grammar definition file.
    input: PathBuf,

    /// Which analyses to print.
    #[arg(long, value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// A whitespace-separated token stream to parse with the LL(1) table.
    #[arg(long)]
    tokens: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Derives-to-empty, FIRST, FOLLOW and predict sets.
    Sets,
    /// The LL(1) parse table.
    Ll1,
    /// The LR(0) automaton and the SLR(1) action table.
    Slr,
    All,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let grammar = Grammar::from_file(&args.input)
        .with_context(|| format!("failed to load the grammar from {}", args.input.display()))?;

    let empty_nonterminals: Vec<_> = grammar
        .nonterminals()
        .filter(|n| grammar.productions_of(n).next().is_none())
        .map(|n| n.label().to_owned())
        .collect();
    if !empty_nonterminals.is_empty() {
        println!(
            "[warning] The following nonterminals have no associated production rule: {:?}",
            empty_nonterminals
        );
    }

    println!("{}", grammar);

    if matches!(args.mode, Mode::Sets | Mode::All) {
        println!("{}", grammar.display_sets());
    }

    let ll1_table = if matches!(args.mode, Mode::Ll1 | Mode::All) || args.tokens.is_some() {
        match ll1::generate(&grammar) {
            Ok(table) => {
                println!("### LL(1) table\n{}", table.display(&grammar));
                Some(table)
            }
            Err(err) => {
                println!("[warning] {}", err);
                None
            }
        }
    } else {
        None
    };

    if matches!(args.mode, Mode::Slr | Mode::All) {
        let automaton = lr0::lr0(&grammar);
        println!("### LR(0) automaton\n{}", automaton.display(&grammar));
        match slr::generate(&grammar, &automaton) {
            Ok(table) => println!("### SLR(1) table\n{}", table.display(&grammar)),
            Err(err) => println!("[warning] {}", err),
        }
    }

    if let Some(path) = &args.tokens {
        let table = ll1_table.context("the token stream requires an LL(1) grammar")?;
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read the token stream from {}", path.display()))?;
        let tokens = syntax::parse_tokens(&source)?;
        let tree = ll1::driver::LL1Driver::new(&grammar, &table)
            .parse(tokens)
            .context("the token stream was rejected")?;
        println!("### Parse tree\n{}", tree.display());
    }

    Ok(())
}
