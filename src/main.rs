mod log_init;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{LevelFilter, debug, warn};
use scss::{CompilationOptions, CompilationResult, OutputStyle, ScssError};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(
    name = "scssc",
    about = "Compile SCSS or indented Sass stylesheets to CSS",
    disable_version_flag = true
)]
struct Args {
    /// Stylesheet to compile; standard input is read when omitted
    input: Option<PathBuf>,

    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// nested, expanded, compact or compressed
    #[arg(short = 't', long = "style", default_value_t = OutputStyle::Nested)]
    style: OutputStyle,

    /// Decimal digits kept in numbers
    #[arg(long = "precision", default_value_t = 5)]
    precision: usize,

    /// Emit `/* line N, file */` before each rule
    #[arg(short = 'l', long = "source-comments")]
    source_comments: bool,

    /// Write a source map next to the output
    #[arg(short = 'm', long = "source-map")]
    source_map: bool,

    /// Inline the source map as a data URL
    #[arg(long = "embed-source-map")]
    embed_source_map: bool,

    /// Include the original sources in the source map
    #[arg(long = "source-map-contents")]
    source_map_contents: bool,

    /// Leave out the sourceMappingURL comment
    #[arg(long = "omit-map-comment")]
    omit_map_comment: bool,

    #[arg(long = "source-map-root")]
    source_map_root: Option<String>,

    /// Treat the input as indented Sass
    #[arg(short = 'a', long = "sass")]
    sass: bool,

    #[arg(long = "indent", default_value = "  ")]
    indent: String,

    /// Line separator; accepts `\n`, `\r` and `\t` escapes
    #[arg(long = "linefeed", default_value = "\\n")]
    linefeed: String,

    /// Directory searched for imports, in the order given
    #[arg(short = 'I', long = "include-path", action = clap::ArgAction::Append)]
    include_paths: Vec<PathBuf>,

    /// Read the stylesheet from standard input
    #[arg(short = 's', long = "stdin")]
    stdin: bool,

    #[arg(short = 'v', long = "verbose", conflicts_with = "quiet")]
    verbose: bool,

    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Print the compiler and language versions
    #[arg(short = 'V', long = "version")]
    version: bool,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    Compile(#[from] ScssError),

    #[error("could not read standard input: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn options(args: &Args) -> CompilationOptions {
    let mut options = CompilationOptions::new()
        .with_output_style(args.style)
        .with_precision(args.precision)
        .with_source_comments(args.source_comments)
        .with_source_map(args.source_map || args.embed_source_map)
        .with_source_map_embed(args.embed_source_map)
        .with_source_map_contents(args.source_map_contents)
        .with_omit_source_map_url(args.omit_map_comment)
        .with_indented_syntax(args.sass)
        .with_indent(unescape(&args.indent))
        .with_linefeed(unescape(&args.linefeed));
    for path in &args.include_paths {
        options = options.with_include_path(path.clone());
    }
    if let Some(output) = &args.output {
        options = options.with_output_file(output.clone());
    }
    if let Some(root) = &args.source_map_root {
        options = options.with_source_map_root(root.clone());
    }
    options
}

fn compile(args: &Args) -> Result<CompilationResult, CliError> {
    let mut options = options(args);
    match &args.input {
        Some(input) if !args.stdin => {
            debug!("compiling {}", input.display());
            Ok(scss::compile_file(input, &options)?)
        }
        input => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .map_err(CliError::Stdin)?;
            if let Some(input) = input {
                options = options.with_input_file(input.clone());
            }
            Ok(scss::compile(&source, &options)?)
        }
    }
}

fn write(path: &PathBuf, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|source| CliError::Write {
        path: path.clone(),
        source,
    })
}

fn run(args: &Args) -> Result<(), CliError> {
    let result = compile(args)?;
    match &args.output {
        Some(output) => {
            write(output, &result.css)?;
            if let (Some(map), false) = (&result.source_map, args.embed_source_map) {
                let map_path = PathBuf::from(format!("{}.map", output.display()));
                write(&map_path, map)?;
            }
        }
        None => {
            print!("{}", result.css);
            if !result.css.ends_with('\n') {
                println!();
            }
            if result.source_map.is_some() && !args.embed_source_map {
                warn!("source map not written: no output file given");
            }
        }
    }
    if let Some(files) = &result.included_files {
        for file in files {
            debug!("included {file}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if args.version {
        println!(
            "scssc {} (Sass {})",
            scss::version(),
            scss::language_version()
        );
        return ExitCode::SUCCESS;
    }

    let level = if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Warn
    };
    log_init::init_logger(level);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    #[test]
    fn linefeed_escapes() {
        assert_eq!(unescape("\\r\\n"), "\r\n");
        assert_eq!(unescape("\\t"), "\t");
        assert_eq!(unescape("\\x"), "\\x");
        assert_eq!(unescape("  "), "  ");
    }

    #[test]
    fn flags_map_to_options() {
        let args = Args::parse_from([
            "scssc",
            "--style",
            "compressed",
            "-I",
            "a",
            "-I",
            "b",
            "--embed-source-map",
            "in.scss",
        ]);
        let options = options(&args);
        assert_eq!(options.output_style, OutputStyle::Compressed);
        assert_eq!(options.include_paths, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert!(options.generate_source_map);
        assert!(options.source_map_embed);
        assert_eq!(options.linefeed, "\n");
    }

    #[test]
    fn output_file_gets_css_and_map() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.scss");
        let output = dir.path().join("out.css");
        std::fs::write(&input, "a { b: c; }").unwrap();

        let args = Args::parse_from([
            OsStr::new("scssc"),
            OsStr::new("-t"),
            OsStr::new("compressed"),
            OsStr::new("--source-map"),
            OsStr::new("-o"),
            output.as_os_str(),
            input.as_os_str(),
        ]);
        run(&args).unwrap();

        let css = std::fs::read_to_string(&output).unwrap();
        assert_eq!(css, "a{b:c}\n/*# sourceMappingURL=out.css.map */");
        let map = std::fs::read_to_string(dir.path().join("out.css.map")).unwrap();
        assert!(map.contains("\"file\": \"out.css\""));
        assert!(map.contains("\"sources\": [\n    \"in.scss\"\n  ]"));
    }
}
