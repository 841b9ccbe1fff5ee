use scss::{CompilationOptions, OutputStyle, compile};

const SAMPLE: &str = "\
.card {
  padding: 4px + 6px;
  .title { font-weight: bold; }
}
@media print {
  .card { display: none; }
}
";

fn render(style: OutputStyle) -> String {
    let options = CompilationOptions::default().with_output_style(style);
    compile(SAMPLE, &options).unwrap().css
}

#[test]
fn nested() {
    insta::assert_snapshot!(render(OutputStyle::Nested), @r"
.card {
  padding: 10px; }
  .card .title {
    font-weight: bold; }

@media print {
  .card {
    display: none; } }
");
}

#[test]
fn expanded() {
    insta::assert_snapshot!(render(OutputStyle::Expanded), @r"
.card {
  padding: 10px;
}

.card .title {
  font-weight: bold;
}

@media print {
  .card {
    display: none;
  }
}
");
}

#[test]
fn compact() {
    insta::assert_snapshot!(render(OutputStyle::Compact), @r"
.card { padding: 10px; }
.card .title { font-weight: bold; }

@media print {
  .card { display: none; } }
");
}

#[test]
fn compressed() {
    assert_eq!(
        render(OutputStyle::Compressed),
        ".card{padding:10px}.card .title{font-weight:bold}@media print{.card{display:none}}"
    );
}

#[test]
fn inspect_and_sass_render_expanded() {
    let expanded = render(OutputStyle::Expanded);
    assert_eq!(render(OutputStyle::Inspect), expanded);
    assert_eq!(render(OutputStyle::Sass), expanded);
}

#[test]
fn custom_indent_and_linefeed() {
    let options = CompilationOptions::default()
        .with_output_style(OutputStyle::Expanded)
        .with_indent("\t")
        .with_linefeed("\r\n");
    let css = compile(".a { b: c; }", &options).unwrap().css;
    assert_eq!(css, ".a {\r\n\tb: c;\r\n}\r\n");
}

#[test]
fn precision_limits_decimals() {
    let options = CompilationOptions::default()
        .with_output_style(OutputStyle::Expanded)
        .with_precision(3);
    let css = compile("a { w: (1/3); }", &options).unwrap().css;
    assert_eq!(css, "a {\n  w: 0.333;\n}\n");
}

#[test]
fn source_comments_precede_rules() {
    let options = CompilationOptions::default().with_source_comments(true);
    let css = compile("\n.a { b: c; }", &options).unwrap().css;
    assert_eq!(css, "/* line 2, stdin */\n.a {\n  b: c; }\n");
}

#[test]
fn comments_survive_except_when_compressed() {
    let source = "/* plain */\n/*! loud */\na { b: c; }";
    let nested = compile(source, &CompilationOptions::default()).unwrap().css;
    assert_eq!(nested, "/* plain */\n/*! loud */\na {\n  b: c; }\n");

    let options = CompilationOptions::default().with_output_style(OutputStyle::Compressed);
    let compressed = compile(source, &options).unwrap().css;
    assert_eq!(compressed, "/*! loud */a{b:c}");
}

#[test]
fn non_ascii_output_declares_its_charset() {
    let options = CompilationOptions::default().with_output_style(OutputStyle::Expanded);
    let css = compile("a { content: \"é\"; }", &options).unwrap().css;
    assert_eq!(css, "@charset \"UTF-8\";\na {\n  content: \"é\";\n}\n");
}
