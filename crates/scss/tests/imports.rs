use std::fs;
use std::sync::{Arc, Mutex};

use scss::{
    CompilationOptions, ImportHook, ImportResult, OutputStyle, ScssError, compile, compile_file,
};

fn compressed() -> CompilationOptions {
    CompilationOptions::default().with_output_style(OutputStyle::Compressed)
}

fn path_string(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn unresolved_import_points_at_the_reference() {
    let err = compile("@import \"foo\";", &CompilationOptions::default()).unwrap_err();
    let ScssError::Import(details) = &err else {
        panic!("expected an import error, got {err:?}");
    };
    assert!(details.error_text.starts_with("Unable to find include file for @import"));
    assert_eq!((details.line, details.column), (1, 9));
}

#[test]
fn hook_supplies_the_stylesheet() {
    let hook = ImportHook::new(|reference, _| {
        if reference == "foo" {
            ImportResult::accepted("foo", "div {color: #FFF;}")
        } else {
            ImportResult::Declined
        }
    });
    let options = compressed().with_import_hook(hook);
    let result = compile("@import \"foo\";", &options).unwrap();
    assert_eq!(result.included_files, Some(vec!["foo".to_string()]));

    let inline = compile("div {color: #FFF;}", &compressed()).unwrap();
    assert_eq!(result.css, inline.css);
}

#[test]
fn transitive_imports_pass_the_previous_path() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let seen = calls.clone();
    let hook = ImportHook::new(move |reference, previous| {
        seen.lock().unwrap().push(previous.to_string());
        match reference {
            "foo" => ImportResult::accepted(
                "/this/is/a/sub/folder/foo.scss",
                "@import \"local/bar\";",
            ),
            "local/bar" => ImportResult::accepted(
                "/this/is/a/sub/folder/local/bar.scss",
                ".foo { color: red; }",
            ),
            _ => ImportResult::Declined,
        }
    });
    let options = compressed()
        .with_input_file("/test.scss")
        .with_import_hook(hook);
    let result = compile("@import \"foo\";", &options).unwrap();

    assert_eq!(result.css, ".foo{color:red}");
    assert_eq!(
        result.included_files,
        Some(vec![
            "/this/is/a/sub/folder/foo.scss".to_string(),
            "/this/is/a/sub/folder/local/bar.scss".to_string(),
        ])
    );
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["/test.scss".to_string(), "/this/is/a/sub/folder/foo.scss".to_string()]
    );
}

#[test]
fn hook_failure_without_position_uses_the_import_site() {
    let hook = ImportHook::new(|_, _| ImportResult::Failed {
        line: 0,
        column: 0,
        message: "access denied".into(),
    });
    let options = CompilationOptions::default().with_import_hook(hook);
    let err = compile("a { b: c; }\n@import \"secret\";", &options).unwrap_err();
    let ScssError::Import(details) = &err else {
        panic!("expected an import error, got {err:?}");
    };
    assert_eq!(details.error_text, "access denied");
    assert_eq!((details.line, details.column), (2, 9));
}

#[test]
fn repeated_imports_are_evaluated_each_time() {
    let hook = ImportHook::new(|_, _| ImportResult::accepted("/shared.scss", ".s { a: b; }"));
    let options = compressed().with_import_hook(hook);
    let result = compile("@import \"shared\";\n@import \"shared\";", &options).unwrap();
    assert_eq!(result.css, ".s{a:b}.s{a:b}");
    assert_eq!(result.included_files.map(|files| files.len()), Some(2));
}

#[test]
fn imports_inside_rules_are_nested() {
    let hook = ImportHook::new(|_, _| ImportResult::accepted("/inner.scss", "b { c: d; }"));
    let options = compressed().with_import_hook(hook);
    let result = compile(".wrap { @import \"inner\"; }", &options).unwrap();
    assert_eq!(result.css, ".wrap b{c:d}");
}

#[test]
fn css_imports_are_kept_verbatim() {
    let result = compile(
        "@import \"theme.css\";\n@import url(print.css);\na { b: c; }",
        &compressed(),
    )
    .unwrap();
    assert!(result.css.starts_with("@import \"theme.css\";@import url(print.css);"));
    assert_eq!(result.included_files, None);
}

#[test]
fn variables_flow_through_imports() {
    let hook = ImportHook::new(|reference, _| match reference {
        "colors" => ImportResult::accepted("/colors.scss", "$brand: #336699;"),
        _ => ImportResult::Declined,
    });
    let options = compressed().with_import_hook(hook);
    let result = compile("@import \"colors\";\na { color: $brand; }", &options).unwrap();
    assert_eq!(result.css, "a{color:#369}");
}

#[test]
fn declined_hook_falls_back_to_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("_vars.scss"), "$size: 3px;").unwrap();
    let main = dir.path().join("main.scss");
    fs::write(&main, "@import \"vars\";\na { width: $size; }").unwrap();

    let hook = ImportHook::new(|_, _| ImportResult::Declined);
    let result = compile_file(&main, &compressed().with_import_hook(hook)).unwrap();
    assert_eq!(result.css, "a{width:3px}");
}

#[test]
fn compile_file_lists_the_entry_first() {
    let dir = tempfile::tempdir().unwrap();
    let partial = dir.path().join("_partial.scss");
    fs::write(&partial, ".p { q: r; }").unwrap();
    let main = dir.path().join("main.scss");
    fs::write(&main, "@import \"partial\";").unwrap();

    let result = compile_file(&main, &compressed()).unwrap();
    assert_eq!(result.css, ".p{q:r}");
    assert_eq!(
        result.included_files,
        Some(vec![path_string(&main), path_string(&partial)])
    );
}

#[test]
fn include_paths_are_searched_in_order() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    fs::write(second.path().join("theme.scss"), "a { from: second; }").unwrap();
    fs::create_dir(first.path().join("theme")).unwrap();
    fs::write(first.path().join("theme").join("_index.scss"), "a { from: first; }").unwrap();

    let options = compressed()
        .with_include_path(first.path())
        .with_include_path(second.path());
    let result = compile("@import \"theme\";", &options).unwrap();
    assert_eq!(result.css, "a{from:first}");

    let options = compressed().with_include_path(second.path());
    let result = compile("@import \"theme\";", &options).unwrap();
    assert_eq!(result.css, "a{from:second}");
}

#[test]
fn sass_partials_use_the_indented_syntax() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("_mixins.sass"), "=pad($n)\n  padding: $n\n").unwrap();
    let main = dir.path().join("main.scss");
    fs::write(&main, "@import \"mixins\";\na { @include pad(2px); }").unwrap();

    let result = compile_file(&main, &compressed()).unwrap();
    assert_eq!(result.css, "a{padding:2px}");
}

#[test]
fn import_cycles_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.scss");
    let b = dir.path().join("b.scss");
    fs::write(&a, "@import \"b\";").unwrap();
    fs::write(&b, "@import \"a\";").unwrap();

    let err = compile_file(&a, &CompilationOptions::default()).unwrap_err();
    let ScssError::Import(details) = &err else {
        panic!("expected an import error, got {err:?}");
    };
    let expected = format!(
        "An @import loop has been found:\n    {a} imports {b}\n    {b} imports {a}",
        a = path_string(&a),
        b = path_string(&b),
    );
    assert_eq!(details.error_text, expected);
    assert_eq!(details.file, path_string(&b));
}

#[test]
fn cycles_through_parent_directory_are_detected() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let a = dir.path().join("sub").join("a.scss");
    fs::write(&a, "@import \"../sub/a\";").unwrap();

    let err = compile_file(&a, &CompilationOptions::default()).unwrap_err();
    let ScssError::Import(details) = &err else {
        panic!("expected an import error, got {err:?}");
    };
    let a = path_string(&a);
    assert_eq!(
        details.error_text,
        format!("An @import loop has been found:\n    {a} imports {a}")
    );
}

#[test]
fn dot_relative_self_import_names_the_entry_file() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.scss");
    fs::write(&a, "@import \"./a\";").unwrap();

    let err = compile_file(&a, &CompilationOptions::default()).unwrap_err();
    let ScssError::Import(details) = &err else {
        panic!("expected an import error, got {err:?}");
    };
    let a = path_string(&a);
    assert_eq!(
        details.error_text,
        format!("An @import loop has been found:\n    {a} imports {a}")
    );
    assert_eq!(details.file, a);
}
