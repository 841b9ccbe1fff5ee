use scss::{CompilationOptions, OutputStyle, ScssError, compile, compile_file};

fn nested(source: &str) -> String {
    compile(source, &CompilationOptions::default()).unwrap().css
}

fn compressed(source: &str) -> String {
    let options = CompilationOptions::default().with_output_style(OutputStyle::Compressed);
    compile(source, &options).unwrap().css
}

#[test]
fn flat_stylesheet_has_no_map_or_includes() {
    let result = compile("div {color: #FFF;}", &CompilationOptions::default()).unwrap();
    assert_eq!(result.css, "div {\n  color: #FFF; }\n");
    assert_eq!(result.source_map, None);
    assert_eq!(result.included_files, None);

    let stripped: String = result.css.split_whitespace().collect();
    assert_eq!(stripped, "div{color:#FFF;}");
}

#[test]
fn compressed_drops_the_last_semicolon() {
    assert_eq!(compressed("div {color: #FFF;}"), "div{color:#FFF}");
}

#[test]
fn unterminated_block_is_a_syntax_error() {
    let err = compile("div {", &CompilationOptions::default()).unwrap_err();
    let ScssError::Syntax(details) = &err else {
        panic!("expected a syntax error, got {err:?}");
    };
    assert_eq!((details.line, details.column), (1, 5));
    assert!(details.message.contains("expected"));
    assert_eq!(details.file, "stdin");
}

#[test]
fn evaluation_errors_name_the_input_file() {
    let options = CompilationOptions::default().with_input_file("/styles/main.scss");
    let err = compile("a { b: 1px + 1em; }", &options).unwrap_err();
    let ScssError::Evaluation(details) = &err else {
        panic!("expected an evaluation error, got {err:?}");
    };
    assert_eq!(details.file, "/styles/main.scss");
    assert_eq!(details.line, 1);
    assert!(details.error_text.contains("Incompatible units"));
}

#[test]
fn missing_entry_file_is_reported_before_compiling() {
    let err = compile_file("/no/such/dir/main.scss", &CompilationOptions::default()).unwrap_err();
    assert!(matches!(err, ScssError::FileNotFound(_)));
    assert!(err.details().is_none());
}

#[test]
fn compilation_is_idempotent() {
    let source = "$w: 10px;\n.a { width: $w * 2; .b { height: $w; } }\n";
    let options = CompilationOptions::default()
        .with_source_map(true)
        .with_input_file("in.scss")
        .with_output_file("out.css");
    let first = compile(source, &options).unwrap();
    let second = compile(source, &options).unwrap();
    assert_eq!(first, second);
}

#[test]
fn variables_and_arithmetic() {
    let css = compressed(
        "$base: 4px;\n\
         $scale: 1.5;\n\
         .box { padding: $base * 2; margin: $base * $scale; width: (100% / 3); }",
    );
    assert_eq!(css, ".box{padding:8px;margin:6px;width:33.33333%}");
}

#[test]
fn default_and_global_flags() {
    let css = compressed(
        "$a: 1 !default;\n\
         $a: 2 !default;\n\
         .x { a: $a; }",
    );
    assert_eq!(css, ".x{a:1}");
}

#[test]
fn mixins_with_arguments_and_content() {
    let css = compressed(
        "@mixin bordered($width: 1px, $style: solid) {\n\
           border: $width $style;\n\
           @content;\n\
         }\n\
         .card { @include bordered(2px) { color: blue; } }",
    );
    assert_eq!(css, ".card{border:2px solid;color:blue}");
}

#[test]
fn functions_and_control_directives() {
    let css = compressed(
        "@function step($i) { @if $i > 2 { @return big; } @else { @return small; } }\n\
         $i: 1;\n\
         @while $i <= 3 { .s-#{$i} { size: step($i); } $i: $i + 1; }",
    );
    assert_eq!(css, ".s-1{size:small}.s-2{size:small}.s-3{size:big}");
}

#[test]
fn for_counts_down_when_bounds_are_reversed() {
    assert_eq!(
        compressed("@for $i from 3 to 1 { .x-#{$i} { a: b; } }"),
        ".x-3{a:b}.x-2{a:b}"
    );
    assert_eq!(compressed("@for $i from 2 through 2 { .y-#{$i} { a: b; } }"), ".y-2{a:b}");
    assert_eq!(compressed("@for $i from 2 to 2 { .z { a: b; } } .w { c: d; }"), ".w{c:d}");
}

#[test]
fn for_with_huge_bound_iterates_lazily() {
    let source = "@function first() {\n  @for $i from 5 through 10000000000000000000000 { @return $i; }\n}\na { b: first(); }";
    assert_eq!(compressed(source), "a{b:5}");
}

#[test]
fn literal_operand_errors_point_at_their_statement() {
    let err = compile(
        "a {\n  b: c;\n}\n@for $i from 1.5 through 2 { }",
        &CompilationOptions::default(),
    )
    .unwrap_err();
    let details = err.details().unwrap();
    assert_eq!(details.line, 4);
    assert_eq!(details.error_text, "1.5 is not an integer.");
}

#[test]
fn each_over_lists() {
    let css = compressed("@each $name in home, about { .#{$name}-icon { x: $name; } }");
    assert_eq!(css, ".home-icon{x:home}.about-icon{x:about}");
}

#[test]
fn parent_selector_suffixes() {
    let css = compressed(".btn { &-primary { a: b; } &:hover { c: d; } .x & { e: f; } }");
    assert_eq!(css, ".btn-primary{a:b}.btn:hover{c:d}.x .btn{e:f}");
}

#[test]
fn nested_properties() {
    let css = compressed("a { font: { family: serif; size: 12px; } }");
    assert_eq!(css, "a{font-family:serif;font-size:12px}");
}

#[test]
fn placeholder_only_rules_are_hidden() {
    let css = compressed("%hidden { a: b; } .shown { c: d; }");
    assert_eq!(css, ".shown{c:d}");
}

#[test]
fn error_directive_aborts() {
    let err = compile("@if true { @error \"stop here\"; }", &CompilationOptions::default()).unwrap_err();
    assert!(matches!(err, ScssError::Evaluation(_)));
    assert_eq!(err.error_text(), "stop here");
}

#[test]
fn warnings_do_not_abort() {
    assert_eq!(compressed("@warn \"careful\"; a { b: c; }"), "a{b:c}");
}

#[test]
fn indented_syntax() {
    let options = CompilationOptions::default().with_indented_syntax(true);
    let result = compile("$c: red\na\n  color: $c\n", &options).unwrap();
    assert_eq!(result.css, "a {\n  color: red; }\n");
}

#[test]
fn unsupported_directives_fail_loudly() {
    let err = compile("@use \"sass:math\";", &CompilationOptions::default()).unwrap_err();
    assert_eq!(err.error_text(), "@use is not supported");
}

#[test]
fn nested_output_keeps_source_indentation() {
    insta::assert_snapshot!(nested(".a { x: 1; .b { y: 2; } }\n.c { z: 3; }"), @r"
.a {
  x: 1; }
  .a .b {
    y: 2; }

.c {
  z: 3; }
");
}
