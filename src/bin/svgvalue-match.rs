use anyhow::{anyhow, Result};
use simple_logger::SimpleLogger;
use std::process::exit;
use svgvalue::css3::Tokenizer;
use svgvalue::grammar::{Capture, Context, GrammarParser, Matcher, MatcherConfig, ParserConfig, Term};
use svgvalue::shared::byte_stream::{ByteStream, Location};
use svgvalue::shared::errors::GrammarError;

fn main() -> Result<()> {
    let matches = clap::Command::new("svgvalue grammar matcher")
        .version("0.1.0")
        .arg(
            clap::Arg::new("grammar")
                .help("The value definition grammar, like '[ <length> | auto ]{1,4}'")
                .required(true)
                .index(1),
        )
        .arg(
            clap::Arg::new("value")
                .help("The value to match against the grammar")
                .required(true)
                .index(2),
        )
        .arg(
            clap::Arg::new("define")
                .help("Defines a non-terminal as name=grammar")
                .long("define")
                .action(clap::ArgAction::Append),
        )
        .arg(
            clap::Arg::new("property")
                .help("Defines a property as name=grammar")
                .long("property")
                .action(clap::ArgAction::Append),
        )
        .arg(
            clap::Arg::new("strict")
                .help("Require the whole value to be matched")
                .long("strict")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("ranges")
                .help("Check numeric values against their ranges")
                .long("ranges")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("tokens")
                .help("Just print the value tokens")
                .long("tokens")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("tree")
                .help("Just print the compiled grammar")
                .long("tree")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("debug")
                .help("Enable debug logging")
                .short('d')
                .long("debug")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("debug") {
        SimpleLogger::new().init()?;
    }

    let grammar = matches
        .get_one::<String>("grammar")
        .ok_or_else(|| anyhow!("grammar is required"))?;
    let value = matches
        .get_one::<String>("value")
        .ok_or_else(|| anyhow!("value is required"))?;

    if matches.get_flag("tokens") {
        print_tokens(value);
        return Ok(());
    }

    let term = compile("grammar", grammar)?;
    if matches.get_flag("tree") {
        println!("{term}");
        println!("{term:#?}");
        return Ok(());
    }

    let mut context = Context::new();
    for definition in matches.get_many::<String>("define").unwrap_or_default() {
        let (name, grammar) = split_definition(definition)?;
        context.add_non_terminal(name, compile(name, grammar)?);
    }
    for definition in matches.get_many::<String>("property").unwrap_or_default() {
        let (name, grammar) = split_definition(definition)?;
        context.add_property(name, compile(name, grammar)?);
    }

    let config = MatcherConfig {
        enforce_ranges: matches.get_flag("ranges"),
        require_full_input: matches.get_flag("strict"),
        ..MatcherConfig::default()
    };

    let stream = ByteStream::new_from_str(value);
    let tokenizer = Tokenizer::new(&stream, Location::default());

    match Matcher::with_config(&context, tokenizer, config).run(&term)? {
        Some(captures) => {
            for capture in captures {
                print_capture(&capture);
            }
        }
        None => {
            println!("no match");
            exit(1);
        }
    }

    Ok(())
}

/// Splits a `name=grammar` definition
fn split_definition(definition: &str) -> Result<(&str, &str)> {
    definition
        .split_once('=')
        .map(|(name, grammar)| (name.trim(), grammar))
        .ok_or_else(|| anyhow!("expected name=grammar, got '{definition}'"))
}

fn compile(name: &str, grammar: &str) -> Result<Term> {
    let stream = ByteStream::new_from_str(grammar);
    let config = ParserConfig {
        source: Some(name.to_string()),
        ..Default::default()
    };

    GrammarParser::new(&stream, config).parse().map_err(|err| {
        display_snippet(name, grammar, &err);
        anyhow!("{name}: {err}")
    })
}

fn display_snippet(name: &str, grammar: &str, err: &GrammarError) {
    let Some(location) = &err.location else {
        return;
    };

    let lines: Vec<&str> = grammar.split('\n').collect();
    let Some(line) = lines.get(location.line - 1) else {
        return;
    };

    println!("{name}:");
    println!("{:<5}|{}", location.line, line);
    println!("   ---{}^", "-".repeat(location.column.saturating_sub(1)));
}

fn print_capture(capture: &Capture) {
    let tokens: Vec<String> = capture.tokens.iter().map(|t| t.to_string()).collect();
    let name = capture.name.as_deref().unwrap_or("<whole>");

    println!("{name}: {}", tokens.join(" "));
}

fn print_tokens(value: &str) {
    let stream = ByteStream::new_from_str(value);
    let mut tokenizer = Tokenizer::new(&stream, Location::default());

    loop {
        let token = tokenizer.consume();
        println!("{:?}", token);

        if token.is_eof() {
            break;
        }
    }
}
